use crate::config::Config;
use crate::engine::session::AttemptSession;
use crate::engine::store::{SessionKey, SessionStore};
use crate::error::AppError;
use axum::extract::FromRef;
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// In-memory table of live attempt sessions, one per session key.
///
/// Transitions lock the table, mutate synchronously and unlock; the guard is
/// never held across an await, so client-driven ticks stay strictly
/// serialized per session.
pub type Sessions = Arc<Mutex<HashMap<SessionKey, AttemptSession>>>;

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub config: Config,
    pub store: Arc<SessionStore>,
    pub sessions: Sessions,
}

impl AppState {
    pub fn new(pool: SqlitePool, config: Config) -> Self {
        let store = Arc::new(SessionStore::new(config.session_dir.clone()));
        AppState {
            pool,
            config,
            store,
            sessions: Sessions::default(),
        }
    }

    pub fn lock_sessions(&self) -> Result<MutexGuard<'_, HashMap<SessionKey, AttemptSession>>, AppError> {
        self.sessions
            .lock()
            .map_err(|_| AppError::InternalServerError("session table lock poisoned".to_string()))
    }
}

impl FromRef<AppState> for SqlitePool {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}
