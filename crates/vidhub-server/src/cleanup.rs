use std::time::Duration;

use chrono::Utc;
use tracing::{info, warn};

use vidhub_api::state::{AppState, run_blocking};

/// Background task that drops refresh-token sessions past their expiry.
///
/// Expired sessions can never be rotated anyway; this only keeps the table
/// from growing without bound.
pub async fn run_session_purge_loop(state: AppState, interval_secs: u64) {
    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));

    loop {
        interval.tick().await;

        match run_blocking(&state, |s| Ok(s.db.purge_expired_sessions(Utc::now())?)).await {
            Ok(count) => {
                if count > 0 {
                    info!("Cleanup: purged {} expired sessions", count);
                }
            }
            Err(e) => {
                warn!("Cleanup error: {}", e);
            }
        }
    }
}
