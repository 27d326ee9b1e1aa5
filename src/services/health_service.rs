use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Report the degraded flag, logging a failing lock backend along the way.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    match state.require_lock_store().await {
        Ok(lock) => {
            if let Err(err) = lock.health_check().await {
                warn!(error = %err, "game lock health check failed");
            }
        }
        Err(_) => warn!("game lock backend unavailable (degraded mode)"),
    }

    HealthResponse::from_degraded(state.is_degraded().await)
}
