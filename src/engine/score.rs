// src/engine/score.rs

use serde::{Deserialize, Serialize};

use crate::models::question::Question;

/// Per-question classification detail for the result view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerDetail {
    pub question_index: usize,
    pub user_answer: String,
    pub correct_answer: String,
}

/// The outcome of scoring one attempt. Derived entirely from
/// `(questions, user_answers, negative)`; recomputing with the same inputs
/// yields an identical value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptResult {
    /// +1 per correct answer, -|negative| per wrong answer. May be negative.
    pub score: f64,
    pub correct: Vec<AnswerDetail>,
    pub incorrect: Vec<AnswerDetail>,
    pub incorrect_count: usize,
}

/// Scores an attempt.
///
/// For each question the correct answer is resolved through
/// [`Question::resolved_answer`]; both sides are compared after trimming
/// surrounding whitespace. An empty (trimmed) user answer is neutral: it
/// contributes nothing and lands in neither detail list. A question with no
/// resolvable answer is never correct, so an answered one counts as wrong
/// rather than aborting the pass.
///
/// The deduction rate is coerced to `abs(negative)` (non-finite values to 0)
/// so a misconfigured rate can never award points for wrong answers.
/// Pure function: no I/O, no clock, no randomness.
pub fn compute(questions: &[Question], user_answers: &[String], negative: f64) -> AttemptResult {
    let deduction = if negative.is_finite() { negative.abs() } else { 0.0 };

    let mut score = 0.0;
    let mut correct = Vec::new();
    let mut incorrect = Vec::new();

    for (i, question) in questions.iter().enumerate() {
        let literal = user_answers.get(i).map(String::as_str).unwrap_or("");
        let user = literal.trim();
        if user.is_empty() {
            continue;
        }

        let resolved = question.resolved_answer().unwrap_or("");
        if !resolved.is_empty() && user == resolved {
            score += 1.0;
            correct.push(AnswerDetail {
                question_index: i,
                user_answer: literal.to_string(),
                correct_answer: resolved.to_string(),
            });
        } else {
            score -= deduction;
            incorrect.push(AnswerDetail {
                question_index: i,
                user_answer: literal.to_string(),
                correct_answer: resolved.to_string(),
            });
        }
    }

    let incorrect_count = incorrect.len();
    AttemptResult {
        score,
        correct,
        incorrect,
        incorrect_count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::question::QuestionType;
    use sqlx::types::Json;

    fn standard(id: i64, answer: &str) -> Question {
        Question {
            id,
            test_id: 1,
            question_type: QuestionType::Standard,
            content: format!("question {}", id),
            options: Json(vec!["A".into(), "B".into(), "C".into(), "D".into(), "X".into()]),
            correct_answer: Some(answer.to_string()),
            left_column: None,
            right_column: None,
            position: id,
        }
    }

    fn answers(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn worked_example_with_negative_marking() {
        // 4 questions, negative = 0.25, answers ["A","","C","D"] against
        // keys ["A","B","C","X"]: two correct, one wrong, one unanswered.
        let questions = vec![standard(0, "A"), standard(1, "B"), standard(2, "C"), standard(3, "X")];
        let user = answers(&["A", "", "C", "D"]);

        let result = compute(&questions, &user, 0.25);
        assert_eq!(result.score, 1.75);
        assert_eq!(
            result.correct.iter().map(|d| d.question_index).collect::<Vec<_>>(),
            vec![0, 2]
        );
        assert_eq!(result.incorrect.len(), 1);
        assert_eq!(result.incorrect[0].question_index, 3);
        assert_eq!(result.incorrect[0].user_answer, "D");
        assert_eq!(result.incorrect[0].correct_answer, "X");
        assert_eq!(result.incorrect_count, 1);
    }

    #[test]
    fn unanswered_questions_are_neutral() {
        let questions = vec![standard(0, "A"), standard(1, "B")];
        let user = answers(&["", "   "]);

        let result = compute(&questions, &user, 0.5);
        assert_eq!(result.score, 0.0);
        assert!(result.correct.is_empty());
        assert!(result.incorrect.is_empty());
    }

    #[test]
    fn negative_rate_sign_is_coerced() {
        let questions = vec![standard(0, "A")];
        let user = answers(&["B"]);

        let result = compute(&questions, &user, -0.25);
        assert_eq!(result.score, -0.25);

        let result = compute(&questions, &user, f64::NAN);
        assert_eq!(result.score, 0.0);
        assert_eq!(result.incorrect_count, 1);
    }

    #[test]
    fn whitespace_is_trimmed_for_comparison_only() {
        let questions = vec![standard(0, "A")];
        let user = answers(&["  A "]);
        let result = compute(&questions, &user, 0.25);
        assert_eq!(result.score, 1.0);
        // The detail keeps the literal answer as given.
        assert_eq!(result.correct[0].user_answer, "  A ");
    }

    #[test]
    fn match_question_scores_against_fifth_option() {
        let question = Question {
            id: 0,
            test_id: 1,
            question_type: QuestionType::Match,
            content: "pair them".to_string(),
            options: Json(vec!["a".into(), "b".into(), "c".into(), "d".into(), "b".into()]),
            correct_answer: None,
            left_column: Some(Json(vec!["1".into(), "2".into()])),
            right_column: Some(Json(vec!["x".into(), "y".into()])),
            position: 0,
        };
        let result = compute(&[question], &answers(&["b"]), 0.25);
        assert_eq!(result.score, 1.0);
    }

    #[test]
    fn unresolvable_question_is_never_correct() {
        let mut question = standard(0, "A");
        question.correct_answer = None;
        question.question_type = QuestionType::Standard;

        let result = compute(&[question.clone()], &answers(&["A"]), 0.25);
        assert_eq!(result.score, -0.25);
        assert_eq!(result.incorrect[0].correct_answer, "");

        // Unanswered stays neutral even for a malformed question.
        let result = compute(&[question], &answers(&[""]), 0.25);
        assert_eq!(result.score, 0.0);
    }

    #[test]
    fn recomputation_is_idempotent() {
        let questions = vec![standard(0, "A"), standard(1, "B"), standard(2, "C")];
        let user = answers(&["A", "X", ""]);

        let first = compute(&questions, &user, 0.33);
        let second = compute(&questions, &user, 0.33);
        assert_eq!(first, second);
    }

    #[test]
    fn overall_score_may_be_negative() {
        let questions = vec![standard(0, "A"), standard(1, "B")];
        let user = answers(&["X", "Y"]);
        let result = compute(&questions, &user, 1.0);
        assert_eq!(result.score, -2.0);
    }
}
