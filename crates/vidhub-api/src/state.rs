use std::sync::Arc;

use anyhow::anyhow;
use tracing::error;

use vidhub_auth::TokenService;
use vidhub_db::Database;

use crate::error::ApiError;
use crate::session::{SessionPolicy, SessionService};
use crate::views::Views;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub tokens: TokenService,
    pub session_policy: SessionPolicy,
}

impl AppStateInner {
    pub fn new(db: Database, tokens: TokenService, session_policy: SessionPolicy) -> AppState {
        Arc::new(Self {
            db,
            tokens,
            session_policy,
        })
    }

    pub fn sessions(&self) -> SessionService<'_> {
        SessionService::new(&self.db, &self.tokens, self.session_policy)
    }

    pub fn views(&self) -> Views<'_> {
        Views::new(&self.db)
    }
}

/// Run blocking store work off the async runtime.
pub async fn run_blocking<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&AppStateInner) -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Storage(anyhow!("blocking task failed: {}", e))
        })?
}
