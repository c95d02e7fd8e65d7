// src/handlers/attempts.rs

use std::collections::HashMap;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    engine::{
        score::AttemptResult,
        session::{AttemptSession, SessionError},
        shuffle,
        store::SessionKey,
    },
    error::AppError,
    handlers::series::fetch_questions,
    models::{
        attempt::{
            AnswerRequest, AttemptResponse, JumpRequest, NewAttempt, SessionView,
            SqliteAttemptRecorder, StartAttemptRequest, record_detached,
        },
        question::Question,
        test::Test,
    },
    state::AppState,
};

/// Starts an attempt session, or resumes one that is still live.
///
/// Initialization priority, first match wins:
/// 1. a caller-supplied pre-shuffled `question_order` (fresh timer),
/// 2. a durable snapshot whose stored test id matches the request
///    (timer, answers, position and skip set restored verbatim),
/// 3. a fresh fetch with a new shuffle (fresh timer).
///
/// A session already live in this process is returned as-is, which is what a
/// page reload looks like from here.
pub async fn start_attempt(
    State(state): State<AppState>,
    Json(req): Json<StartAttemptRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;
    let StartAttemptRequest {
        series_id,
        test_id,
        candidate,
        question_order,
    } = req;
    let key = SessionKey { series_id, test_id };

    {
        let sessions = state.lock_sessions()?;
        if let Some(session) = sessions.get(&key) {
            return Ok(Json(AttemptResponse::Active {
                session: SessionView::from_snapshot(session.snapshot()),
            }));
        }
    }

    let session = if let Some(order) = question_order {
        let (test, questions) = fetch_published_test(&state.pool, key).await?;
        let questions = order_questions(questions, &order)?;
        let negative = test.effective_negative();
        AttemptSession::start(
            key,
            test.test_name,
            test.duration_minutes,
            negative,
            questions,
            candidate,
            state.store.clone(),
        )
    } else if let Some(snap) = state
        .store
        .load(key)
        .filter(|s| s.test_id == test_id && !s.questions.is_empty())
    {
        tracing::info!(
            "Resuming attempt on test {} for user '{}' with {}s left",
            key.test_id,
            snap.candidate.user_id,
            snap.time_left_seconds
        );
        AttemptSession::resume(snap, state.store.clone())
    } else {
        let (test, questions) = fetch_published_test(&state.pool, key).await?;
        let questions = shuffle::shuffle(&mut rand::thread_rng(), &questions);
        let negative = test.effective_negative();
        AttemptSession::start(
            key,
            test.test_name,
            test.duration_minutes,
            negative,
            questions,
            candidate,
            state.store.clone(),
        )
    };

    let mut sessions = state.lock_sessions()?;
    // If two starts raced, the first insert wins; this is last-reader-wins
    // territory the same way two tabs on one test are.
    let session = sessions.entry(key).or_insert(session);
    Ok(Json(AttemptResponse::Active {
        session: SessionView::from_snapshot(session.snapshot()),
    }))
}

/// Returns the current view of a live session.
pub async fn get_attempt(
    State(state): State<AppState>,
    Path((series_id, test_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, AppError> {
    let sessions = state.lock_sessions()?;
    let session = sessions
        .get(&SessionKey { series_id, test_id })
        .ok_or_else(no_active_attempt)?;
    Ok(Json(AttemptResponse::Active {
        session: SessionView::from_snapshot(session.snapshot()),
    }))
}

/// Records an answer for the current question.
pub async fn answer(
    State(state): State<AppState>,
    Path((series_id, test_id)): Path<(i64, i64)>,
    Json(req): Json<AnswerRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;
    apply_transition(&state, SessionKey { series_id, test_id }, |s| {
        s.select_answer(req.option).map(|_| None)
    })
}

/// Advances to the next question; on the last question this submits.
pub async fn next(
    State(state): State<AppState>,
    Path((series_id, test_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, AppError> {
    apply_transition(&state, SessionKey { series_id, test_id }, |s| s.next())
}

/// Steps back one question.
pub async fn previous(
    State(state): State<AppState>,
    Path((series_id, test_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, AppError> {
    apply_transition(&state, SessionKey { series_id, test_id }, |s| {
        s.previous().map(|_| None)
    })
}

/// Marks the current question skipped and advances.
pub async fn skip(
    State(state): State<AppState>,
    Path((series_id, test_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, AppError> {
    apply_transition(&state, SessionKey { series_id, test_id }, |s| s.skip())
}

/// Free navigation to any question index.
pub async fn jump(
    State(state): State<AppState>,
    Path((series_id, test_id)): Path<(i64, i64)>,
    Json(req): Json<JumpRequest>,
) -> Result<impl IntoResponse, AppError> {
    apply_transition(&state, SessionKey { series_id, test_id }, |s| {
        s.jump_to(req.index).map(|_| None)
    })
}

/// One countdown second. The API client calls this once per second; when the
/// timer hits zero the attempt force-submits and the result comes back here.
pub async fn tick(
    State(state): State<AppState>,
    Path((series_id, test_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, AppError> {
    apply_transition(&state, SessionKey { series_id, test_id }, |s| Ok(s.tick()))
}

/// Manual submission.
pub async fn submit(
    State(state): State<AppState>,
    Path((series_id, test_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, AppError> {
    apply_transition(&state, SessionKey { series_id, test_id }, |s| {
        Ok(Some(s.submit()))
    })
}

/// Explicit navigate-away: drops the live session and destroys the durable
/// snapshot. Without this call the snapshot stays resumable, which is the
/// reload path.
pub async fn abandon(
    State(state): State<AppState>,
    Path((series_id, test_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, AppError> {
    let key = SessionKey { series_id, test_id };
    let removed = {
        let mut sessions = state.lock_sessions()?;
        sessions.remove(&key)
    };
    match removed {
        Some(session) => session.abandon(),
        // No live session (e.g. the process restarted): still drop the
        // snapshot so the next start is fresh.
        None => state.store.clear(key),
    }
    Ok(StatusCode::NO_CONTENT)
}

fn no_active_attempt() -> AppError {
    AppError::NotFound("No active attempt for this test".to_string())
}

/// Applies one synchronous transition under the session-table lock. When the
/// transition turns out to be terminal, the session is dropped from the
/// table and the completed attempt is handed to the recorder as a detached
/// task; the response carries the result without waiting for it.
fn apply_transition<F>(
    state: &AppState,
    key: SessionKey,
    transition: F,
) -> Result<Json<AttemptResponse>, AppError>
where
    F: FnOnce(&mut AttemptSession) -> Result<Option<AttemptResult>, SessionError>,
{
    let mut sessions = state.lock_sessions()?;
    let session = sessions.get_mut(&key).ok_or_else(no_active_attempt)?;

    match transition(session)? {
        None => Ok(Json(AttemptResponse::Active {
            session: SessionView::from_snapshot(session.snapshot()),
        })),
        Some(result) => {
            let time_taken_seconds = session.time_taken_seconds();
            let snap = session.snapshot();
            let attempt = NewAttempt {
                series_id: snap.series_id,
                test_name: snap.test_name.clone(),
                user_id: snap.candidate.user_id.clone(),
                user_name: snap.candidate.user_name.clone(),
                user_image: snap.candidate.user_image.clone(),
                score: result.score,
                total_questions: snap.questions.len() as i64,
                time_taken_secs: time_taken_seconds as i64,
                incorrect_count: result.incorrect_count as i64,
                attempted_at: Utc::now(),
            };
            sessions.remove(&key);
            drop(sessions);

            record_detached(SqliteAttemptRecorder::new(state.pool.clone()), attempt);
            Ok(Json(AttemptResponse::Submitted {
                result,
                time_taken_seconds,
            }))
        }
    }
}

/// Fetches a published test and its questions; draft or missing tests are a
/// cold-start fetch failure surfaced as 404.
async fn fetch_published_test(
    pool: &SqlitePool,
    key: SessionKey,
) -> Result<(Test, Vec<Question>), AppError> {
    let test = sqlx::query_as::<_, Test>(
        r#"
        SELECT id, series_id, test_name, duration_minutes, negative, status, position
        FROM tests
        WHERE id = ? AND series_id = ? AND status = 'published'
        "#,
    )
    .bind(key.test_id)
    .bind(key.series_id)
    .fetch_optional(pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch test {}: {:?}", key.test_id, e);
        AppError::InternalServerError(e.to_string())
    })?
    .ok_or_else(|| {
        AppError::NotFound(format!(
            "Test {} in series {} not found or not published",
            key.test_id, key.series_id
        ))
    })?;

    let questions = fetch_questions(pool, test.id).await?;
    Ok((test, questions))
}

/// Reorders fetched questions to a caller-supplied id sequence. The sequence
/// must be a permutation of the test's question ids.
fn order_questions(questions: Vec<Question>, order: &[i64]) -> Result<Vec<Question>, AppError> {
    if order.len() != questions.len() {
        return Err(AppError::BadRequest(
            "question_order does not match the test's question set".to_string(),
        ));
    }
    let mut by_id: HashMap<i64, Question> = questions.into_iter().map(|q| (q.id, q)).collect();
    let mut ordered = Vec::with_capacity(order.len());
    for id in order {
        let question = by_id.remove(id).ok_or_else(|| {
            AppError::BadRequest(
                "question_order does not match the test's question set".to_string(),
            )
        })?;
        ordered.push(question);
    }
    Ok(ordered)
}
