// src/handlers/rankings.rs

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use sqlx::SqlitePool;

use crate::{engine::ranking::rank_attempts, error::AppError, models::attempt::AttemptRow};

/// Full leaderboard across all tests: each user's latest attempt per test,
/// ranked within the test partition, ordered by test name then rank.
pub async fn get_rankings(State(pool): State<SqlitePool>) -> Result<impl IntoResponse, AppError> {
    let rows = sqlx::query_as::<_, AttemptRow>(
        "SELECT test_name, user_id, user_name, user_image, score, attempted_at FROM attempts",
    )
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch attempts for ranking: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(rank_attempts(rows)))
}

/// Leaderboard for a single test name.
pub async fn get_test_rankings(
    State(pool): State<SqlitePool>,
    Path(test_name): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let rows = sqlx::query_as::<_, AttemptRow>(
        r#"
        SELECT test_name, user_id, user_name, user_image, score, attempted_at
        FROM attempts
        WHERE test_name = ?
        "#,
    )
    .bind(&test_name)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch attempts for test '{}': {:?}", test_name, e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(rank_attempts(rows)))
}
