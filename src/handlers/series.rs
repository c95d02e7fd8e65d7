// src/handlers/series.rs

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use sqlx::SqlitePool;

use crate::{
    error::AppError,
    models::{
        question::{PublicQuestion, Question},
        test::{PublicTest, SeriesDetail, Test, TestSeries},
    },
};

/// Lists all test series.
pub async fn list_series(State(pool): State<SqlitePool>) -> Result<impl IntoResponse, AppError> {
    let series = sqlx::query_as::<_, TestSeries>(
        "SELECT id, title, created_at FROM test_series ORDER BY id",
    )
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch test series: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(series))
}

/// Returns one series with its published tests and their questions, in
/// stored order. Answer keys never leave the server: questions go out
/// through the public DTO, and draft tests are not included at all.
pub async fn get_series(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let series = sqlx::query_as::<_, TestSeries>(
        "SELECT id, title, created_at FROM test_series WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch test series {}: {:?}", id, e);
        AppError::InternalServerError(e.to_string())
    })?
    .ok_or_else(|| AppError::NotFound(format!("Test series {} not found", id)))?;

    let tests = sqlx::query_as::<_, Test>(
        r#"
        SELECT id, series_id, test_name, duration_minutes, negative, status, position
        FROM tests
        WHERE series_id = ? AND status = 'published'
        ORDER BY position, id
        "#,
    )
    .bind(id)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch tests for series {}: {:?}", id, e);
        AppError::InternalServerError(e.to_string())
    })?;

    let mut public_tests = Vec::with_capacity(tests.len());
    for test in tests {
        let questions = fetch_questions(&pool, test.id).await?;
        for q in &questions {
            if q.resolved_answer().is_none() {
                // Served anyway; scoring treats it as never correct.
                tracing::warn!(
                    "Question {} on test '{}' has no resolvable answer",
                    q.id,
                    test.test_name
                );
            }
        }
        let negative = test.effective_negative();
        public_tests.push(PublicTest {
            id: test.id,
            test_name: test.test_name,
            duration_minutes: test.duration_minutes,
            negative,
            questions: questions.iter().map(PublicQuestion::from).collect(),
        });
    }

    Ok(Json(SeriesDetail {
        id: series.id,
        title: series.title,
        tests: public_tests,
    }))
}

/// Fetches a test's questions in stored order.
pub async fn fetch_questions(pool: &SqlitePool, test_id: i64) -> Result<Vec<Question>, AppError> {
    sqlx::query_as::<_, Question>(
        r#"
        SELECT id, test_id, question_type, content, options,
               correct_answer, left_column, right_column, position
        FROM questions
        WHERE test_id = ?
        ORDER BY position, id
        "#,
    )
    .bind(test_id)
    .fetch_all(pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch questions for test {}: {:?}", test_id, e);
        AppError::InternalServerError(e.to_string())
    })
}
