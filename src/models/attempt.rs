// src/models/attempt.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use validator::Validate;

use crate::engine::score::AttemptResult;
use crate::engine::session::SessionSnapshot;
use crate::models::question::PublicQuestion;

/// Candidate identity carried explicitly in the start request.
/// Authentication is handled elsewhere; the attempt engine never reads
/// ambient user state.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct CandidateInfo {
    #[validate(length(min = 1, max = 64))]
    pub user_id: String,
    #[validate(length(min = 1, max = 100))]
    pub user_name: String,
    pub user_image: Option<String>,
}

/// DTO for starting (or resuming) an attempt session.
#[derive(Debug, Deserialize, Validate)]
pub struct StartAttemptRequest {
    pub series_id: i64,
    pub test_id: i64,
    #[validate(nested)]
    pub candidate: CandidateInfo,

    /// Pre-shuffled question ids handed off from an earlier series fetch.
    /// When present, this ordering is used verbatim and the timer starts
    /// fresh; it must contain exactly the test's question ids.
    pub question_order: Option<Vec<i64>>,
}

/// DTO for recording an answer selection on the current question.
#[derive(Debug, Deserialize, Validate)]
pub struct AnswerRequest {
    #[validate(length(min = 1, max = 500))]
    pub option: String,
}

/// DTO for free navigation to an arbitrary question index.
#[derive(Debug, Deserialize)]
pub struct JumpRequest {
    pub index: usize,
}

/// Client-facing view of a running session. Questions are exposed through
/// the answer-free DTO; the stored answer for the current position rides
/// along so navigation can preload the active selection.
#[derive(Debug, Serialize)]
pub struct SessionView {
    pub series_id: i64,
    pub test_id: i64,
    pub test_name: String,
    pub current_question_index: usize,
    pub time_left_seconds: u32,
    pub total_questions: usize,
    pub current_question: Option<PublicQuestion>,
    pub current_answer: String,
    pub answered_flags: Vec<bool>,
    pub skipped_question_indices: Vec<usize>,
}

impl SessionView {
    pub fn from_snapshot(snap: &SessionSnapshot) -> Self {
        let current = snap.current_question_index;
        SessionView {
            series_id: snap.series_id,
            test_id: snap.test_id,
            test_name: snap.test_name.clone(),
            current_question_index: current,
            time_left_seconds: snap.time_left_seconds,
            total_questions: snap.questions.len(),
            current_question: snap.questions.get(current).map(PublicQuestion::from),
            current_answer: snap.user_answers.get(current).cloned().unwrap_or_default(),
            answered_flags: snap.answered_flags.clone(),
            skipped_question_indices: snap.skipped_question_indices.clone(),
        }
    }
}

/// Response for every session transition: either the updated view, or the
/// terminal result once the attempt has been submitted.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AttemptResponse {
    Active {
        session: SessionView,
    },
    Submitted {
        result: AttemptResult,
        time_taken_seconds: u32,
    },
}

/// A completed attempt ready to be written to the 'attempts' table.
#[derive(Debug, Clone)]
pub struct NewAttempt {
    pub series_id: i64,
    pub test_name: String,
    pub user_id: String,
    pub user_name: String,
    pub user_image: Option<String>,
    pub score: f64,
    pub total_questions: i64,
    pub time_taken_secs: i64,
    pub incorrect_count: i64,
    pub attempted_at: DateTime<Utc>,
}

/// Denormalized attempt row as read back for ranking. One row per completed
/// attempt; the aggregator keeps only the latest per (user, test).
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct AttemptRow {
    pub test_name: String,
    pub user_id: String,
    pub user_name: String,
    pub user_image: Option<String>,
    pub score: f64,
    pub attempted_at: DateTime<Utc>,
}

/// One leaderboard row. Ranks are 1-based, RANK-with-gaps within the
/// test-name partition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankingEntry {
    pub rank: i64,
    pub test_name: String,
    pub user_id: String,
    pub user_name: String,
    pub user_image: Option<String>,
    pub score: f64,
    pub attempt_date: DateTime<Utc>,
}

/// Sink for completed attempts. The submit path invokes this fire-and-forget:
/// recording failure is logged, never awaited by the response carrying the
/// result.
#[async_trait]
pub trait AttemptRecorder: Send + Sync + 'static {
    async fn record(&self, attempt: NewAttempt) -> Result<(), sqlx::Error>;
}

/// sqlx-backed recorder writing to the 'attempts' table.
#[derive(Clone)]
pub struct SqliteAttemptRecorder {
    pool: SqlitePool,
}

impl SqliteAttemptRecorder {
    pub fn new(pool: SqlitePool) -> Self {
        SqliteAttemptRecorder { pool }
    }
}

#[async_trait]
impl AttemptRecorder for SqliteAttemptRecorder {
    async fn record(&self, attempt: NewAttempt) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO attempts
                (series_id, test_name, user_id, user_name, user_image,
                 score, total_questions, time_taken_secs, incorrect_count, attempted_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(attempt.series_id)
        .bind(&attempt.test_name)
        .bind(&attempt.user_id)
        .bind(&attempt.user_name)
        .bind(&attempt.user_image)
        .bind(attempt.score)
        .bind(attempt.total_questions)
        .bind(attempt.time_taken_secs)
        .bind(attempt.incorrect_count)
        .bind(attempt.attempted_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

/// Spawns the recorder as a detached task. The submit response never waits
/// on it; a failure costs the leaderboard row, not the candidate's result.
pub fn record_detached<R: AttemptRecorder>(recorder: R, attempt: NewAttempt) {
    let test_name = attempt.test_name.clone();
    let user_id = attempt.user_id.clone();
    tokio::spawn(async move {
        if let Err(e) = recorder.record(attempt).await {
            tracing::warn!(
                "Failed to record attempt for user '{}' on test '{}': {:?}",
                user_id,
                test_name,
                e
            );
        }
    });
}
