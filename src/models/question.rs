// src/models/question.rs

use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};

/// Discriminant for question variants.
///
/// `Standard` questions are plain multiple choice. `Match` questions show two
/// columns to pair up; their `options` list holds the four left-hand display
/// entries and may carry the correct answer as a fifth entry when
/// `correct_answer` is not set independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum QuestionType {
    Standard,
    Match,
}

/// Represents the 'questions' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,

    pub test_id: i64,

    pub question_type: QuestionType,

    /// The text content of the question. May contain literal `\n` escape
    /// sequences that the client renders as line breaks.
    pub content: String,

    /// List of options (e.g., ["Option A", "Option B"]).
    /// Stored as a JSON array in the database.
    pub options: Json<Vec<String>>,

    /// The correct answer text. May be absent for 'match' questions that
    /// encode the answer as `options[4]` instead.
    pub correct_answer: Option<String>,

    /// Two-column display data, present only for 'match' questions.
    /// Never consulted by scoring.
    pub left_column: Option<Json<Vec<String>>>,
    pub right_column: Option<Json<Vec<String>>>,

    pub position: i64,
}

impl Question {
    /// Resolves the single correct-answer string used for scoring.
    ///
    /// Resolution order: `correct_answer` (trimmed, non-empty), then
    /// `options[4]` for 'match' questions, then `None`. A question that
    /// resolves to `None` is never correct; it does not abort scoring of
    /// the rest of the attempt.
    pub fn resolved_answer(&self) -> Option<&str> {
        if let Some(answer) = self.correct_answer.as_deref() {
            let trimmed = answer.trim();
            if !trimmed.is_empty() {
                return Some(trimmed);
            }
        }
        if self.question_type == QuestionType::Match {
            if let Some(fifth) = self.options.get(4) {
                let trimmed = fifth.trim();
                if !trimmed.is_empty() {
                    return Some(trimmed);
                }
            }
        }
        None
    }
}

/// DTO for sending a question to a candidate (excludes the answer key).
///
/// For 'match' questions only the four display options are exposed, since a
/// fifth entry may encode the correct answer.
#[derive(Debug, Serialize)]
pub struct PublicQuestion {
    pub id: i64,
    pub question_type: QuestionType,
    pub content: String,
    pub options: Vec<String>,
    pub left_column: Option<Vec<String>>,
    pub right_column: Option<Vec<String>>,
}

impl From<&Question> for PublicQuestion {
    fn from(q: &Question) -> Self {
        let mut options = q.options.0.clone();
        if q.question_type == QuestionType::Match {
            options.truncate(4);
        }
        PublicQuestion {
            id: q.id,
            question_type: q.question_type,
            content: q.content.clone(),
            options,
            left_column: q.left_column.as_ref().map(|c| c.0.clone()),
            right_column: q.right_column.as_ref().map(|c| c.0.clone()),
        }
    }
}
