// src/engine/session.rs

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::engine::score::{self, AttemptResult};
use crate::engine::store::{SessionKey, SessionStore};
use crate::models::attempt::CandidateInfo;
use crate::models::question::Question;

/// Everything needed to freeze and later resume an in-progress attempt.
///
/// The question list is the shuffled snapshot taken at session start, stored
/// in full so a resumed session sees the identical order. Decoding is
/// deliberately lenient: unknown fields are ignored and missing ones
/// default, so old snapshots survive schema evolution.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSnapshot {
    pub series_id: i64,
    pub test_id: i64,
    pub test_name: String,
    pub candidate: CandidateInfo,
    pub questions: Vec<Question>,
    pub current_question_index: usize,
    pub time_left_seconds: u32,
    /// Same length as `questions`; empty string means unanswered.
    pub user_answers: Vec<String>,
    pub answered_flags: Vec<bool>,
    /// Mutually exclusive with a non-empty answer at the same index.
    pub skipped_question_indices: Vec<usize>,
    pub negative: f64,
    pub duration_seconds: u32,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("attempt has already been submitted")]
    AlreadySubmitted,
    #[error("question index {0} is out of bounds")]
    OutOfBounds(usize),
}

/// The timed, navigable attempt session.
///
/// Transitions are synchronous and driven one at a time by the owning
/// handler; every mutation is persisted to the session store before the
/// transition returns, and a store failure only costs resumability, never
/// the transition itself. Submission is terminal: it computes the result,
/// clears the store entry, and caches the result so duplicate submits (and
/// late ticks) are harmless.
///
/// The session never invokes the attempt recorder itself; the caller ships
/// the result off as a detached task so nothing here blocks on the network.
pub struct AttemptSession {
    snap: SessionSnapshot,
    store: Arc<SessionStore>,
    result: Option<AttemptResult>,
}

impl AttemptSession {
    /// Starts a fresh session: full timer, no answers, no skips.
    /// `questions` is the already-shuffled order frozen for this attempt.
    pub fn start(
        key: SessionKey,
        test_name: String,
        duration_minutes: i64,
        negative: f64,
        questions: Vec<Question>,
        candidate: CandidateInfo,
        store: Arc<SessionStore>,
    ) -> Self {
        let count = questions.len();
        let duration_seconds = u32::try_from(duration_minutes.max(0))
            .unwrap_or(u32::MAX)
            .saturating_mul(60);
        let snap = SessionSnapshot {
            series_id: key.series_id,
            test_id: key.test_id,
            test_name,
            candidate,
            questions,
            current_question_index: 0,
            time_left_seconds: duration_seconds,
            user_answers: vec![String::new(); count],
            answered_flags: vec![false; count],
            skipped_question_indices: Vec::new(),
            negative: if negative.is_finite() { negative.abs() } else { 0.0 },
            duration_seconds,
        };
        let session = AttemptSession { snap, store, result: None };
        session.persist();
        session
    }

    /// Resumes from a stored snapshot, restoring timer, answers, position
    /// and skip set verbatim. Lengths and indices are clamped defensively
    /// since the snapshot went through lenient decoding.
    pub fn resume(mut snap: SessionSnapshot, store: Arc<SessionStore>) -> Self {
        let count = snap.questions.len();
        snap.user_answers.resize(count, String::new());
        snap.answered_flags.resize(count, false);
        snap.skipped_question_indices.retain(|&i| i < count);
        if count > 0 && snap.current_question_index >= count {
            snap.current_question_index = count - 1;
        }
        if !snap.negative.is_finite() {
            snap.negative = 0.0;
        } else {
            snap.negative = snap.negative.abs();
        }
        AttemptSession { snap, store, result: None }
    }

    pub fn key(&self) -> SessionKey {
        SessionKey {
            series_id: self.snap.series_id,
            test_id: self.snap.test_id,
        }
    }

    pub fn snapshot(&self) -> &SessionSnapshot {
        &self.snap
    }

    pub fn is_submitted(&self) -> bool {
        self.result.is_some()
    }

    pub fn result(&self) -> Option<&AttemptResult> {
        self.result.as_ref()
    }

    /// Seconds spent in the attempt so far (or total, once submitted).
    pub fn time_taken_seconds(&self) -> u32 {
        self.snap.duration_seconds.saturating_sub(self.snap.time_left_seconds)
    }

    fn persist(&self) {
        self.store.save(self.key(), &self.snap);
    }

    fn ensure_active(&self) -> Result<(), SessionError> {
        if self.is_submitted() {
            Err(SessionError::AlreadySubmitted)
        } else {
            Ok(())
        }
    }

    /// Records an answer for the current question. Clears any skip mark at
    /// this position (skipping and answering are mutually exclusive). Does
    /// not advance.
    pub fn select_answer(&mut self, option: String) -> Result<(), SessionError> {
        self.ensure_active()?;
        let current = self.snap.current_question_index;
        let slot = self
            .snap
            .user_answers
            .get_mut(current)
            .ok_or(SessionError::OutOfBounds(current))?;
        *slot = option;
        self.snap.answered_flags[current] = true;
        self.snap.skipped_question_indices.retain(|&i| i != current);
        self.persist();
        Ok(())
    }

    /// Advances to the next question, or submits when already on the last
    /// one. The stored answer at the new position stays in place so the
    /// client can preload it as the active selection.
    pub fn next(&mut self) -> Result<Option<AttemptResult>, SessionError> {
        self.ensure_active()?;
        if self.snap.current_question_index + 1 < self.snap.questions.len() {
            self.snap.current_question_index += 1;
            self.persist();
            Ok(None)
        } else {
            Ok(Some(self.submit()))
        }
    }

    /// Retreats one question; no-op at the first question.
    pub fn previous(&mut self) -> Result<(), SessionError> {
        self.ensure_active()?;
        if self.snap.current_question_index > 0 {
            self.snap.current_question_index -= 1;
            self.persist();
        }
        Ok(())
    }

    /// Marks the current question skipped (idempotent), clears any answer
    /// at this position, then behaves like `next`.
    pub fn skip(&mut self) -> Result<Option<AttemptResult>, SessionError> {
        self.ensure_active()?;
        let current = self.snap.current_question_index;
        if current < self.snap.questions.len() {
            if !self.snap.skipped_question_indices.contains(&current) {
                self.snap.skipped_question_indices.push(current);
            }
            self.snap.user_answers[current].clear();
            self.snap.answered_flags[current] = false;
        }
        self.next()
    }

    /// Free navigation: any valid index is always legal, answered or not.
    pub fn jump_to(&mut self, index: usize) -> Result<(), SessionError> {
        self.ensure_active()?;
        if index >= self.snap.questions.len() {
            return Err(SessionError::OutOfBounds(index));
        }
        self.snap.current_question_index = index;
        self.persist();
        Ok(())
    }

    /// One countdown step. At zero the session force-submits exactly once;
    /// further ticks on a submitted session are ignored, and the timer never
    /// goes negative.
    pub fn tick(&mut self) -> Option<AttemptResult> {
        if self.is_submitted() {
            return None;
        }
        if self.snap.time_left_seconds > 0 {
            self.snap.time_left_seconds -= 1;
        }
        if self.snap.time_left_seconds == 0 {
            Some(self.submit())
        } else {
            self.persist();
            None
        }
    }

    /// Terminal transition: scores the frozen questions and answers with
    /// the attempt's negative-marking rate and clears the store entry.
    /// Idempotent; a second call returns the cached result.
    pub fn submit(&mut self) -> AttemptResult {
        if let Some(result) = &self.result {
            return result.clone();
        }
        let result = score::compute(&self.snap.questions, &self.snap.user_answers, self.snap.negative);
        self.store.clear(self.key());
        self.result = Some(result.clone());
        result
    }

    /// Explicit navigate-away: destroys resumability. A plain reload never
    /// calls this, which is what makes the snapshot recoverable.
    pub fn abandon(&self) {
        self.store.clear(self.key());
    }
}
