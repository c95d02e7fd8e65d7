// tests/ranking_tests.rs

use chrono::{Duration, TimeZone, Utc};
use examhall::{config::Config, routes, state::AppState};
use serde_json::Value;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::str::FromStr;
use tempfile::TempDir;

struct TestApp {
    address: String,
    pool: SqlitePool,
    _dir: TempDir,
}

async fn spawn_app() -> TestApp {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let db_path = dir.path().join("examhall-test.db");
    let database_url = format!("sqlite://{}", db_path.display());

    let options = SqliteConnectOptions::from_str(&database_url)
        .expect("Invalid test database URL")
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .expect("Failed to open test database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate test database");

    let config = Config {
        database_url,
        session_dir: dir.path().join("sessions").display().to_string(),
        rust_log: "error".to_string(),
        port: 0,
    };
    let state = AppState::new(pool.clone(), config);
    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp {
        address,
        pool,
        _dir: dir,
    }
}

async fn seed_attempt(
    pool: &SqlitePool,
    test_name: &str,
    user_id: &str,
    score: f64,
    minutes_ago: i64,
) {
    let attempted_at =
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap() - Duration::minutes(minutes_ago);
    sqlx::query(
        "INSERT INTO attempts
             (series_id, test_name, user_id, user_name, user_image,
              score, total_questions, time_taken_secs, incorrect_count, attempted_at)
         VALUES (1, ?, ?, ?, NULL, ?, 10, 300, 2, ?)",
    )
    .bind(test_name)
    .bind(user_id)
    .bind(user_id.to_uppercase())
    .bind(score)
    .bind(attempted_at)
    .execute(pool)
    .await
    .expect("Failed to seed attempt");
}

#[tokio::test]
async fn tied_scores_share_a_rank_with_gaps() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    seed_attempt(&app.pool, "mock-a", "u1", 10.0, 1).await;
    seed_attempt(&app.pool, "mock-a", "u2", 10.0, 2).await;
    seed_attempt(&app.pool, "mock-a", "u3", 5.0, 3).await;

    let board: Vec<Value> = client
        .get(format!("{}/api/rankings/mock-a", app.address))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let ranks: Vec<i64> = board.iter().map(|e| e["rank"].as_i64().unwrap()).collect();
    assert_eq!(ranks, vec![1, 1, 3]);
    assert_eq!(board[2]["user_id"], "u3");
}

#[tokio::test]
async fn only_the_latest_attempt_per_user_is_ranked() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    // u1 scored better an hour ago, then worse just now: the recent one counts.
    seed_attempt(&app.pool, "mock-a", "u1", 9.0, 60).await;
    seed_attempt(&app.pool, "mock-a", "u1", 4.0, 1).await;
    seed_attempt(&app.pool, "mock-a", "u2", 6.0, 30).await;

    let board: Vec<Value> = client
        .get(format!("{}/api/rankings/mock-a", app.address))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(board.len(), 2);
    assert_eq!(board[0]["user_id"], "u2");
    assert_eq!(board[0]["rank"], 1);
    assert_eq!(board[1]["user_id"], "u1");
    assert_eq!(board[1]["score"], 4.0);
    assert_eq!(board[1]["rank"], 2);
}

#[tokio::test]
async fn full_leaderboard_orders_by_test_then_rank() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    seed_attempt(&app.pool, "mock-b", "u1", 3.0, 1).await;
    seed_attempt(&app.pool, "mock-a", "u1", 7.0, 2).await;
    seed_attempt(&app.pool, "mock-a", "u2", 9.0, 3).await;

    let board: Vec<Value> = client
        .get(format!("{}/api/rankings", app.address))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let keys: Vec<(String, i64)> = board
        .iter()
        .map(|e| {
            (
                e["test_name"].as_str().unwrap().to_string(),
                e["rank"].as_i64().unwrap(),
            )
        })
        .collect();
    assert_eq!(
        keys,
        vec![
            ("mock-a".to_string(), 1),
            ("mock-a".to_string(), 2),
            ("mock-b".to_string(), 1),
        ]
    );
    assert_eq!(board[0]["user_id"], "u2");
    assert_eq!(board[0]["user_name"], "U2");
}

#[tokio::test]
async fn empty_leaderboard_is_an_empty_list() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let board: Vec<Value> = client
        .get(format!("{}/api/rankings", app.address))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(board.is_empty());
}
