use axum::Router;

use crate::state::SharedState;

pub mod docs;
pub mod health;
pub mod turn;

/// Compose all route trees, wiring in shared state and documentation routes.
pub fn router(state: SharedState) -> Router<()> {
    health::router()
        .merge(turn::router())
        .merge(docs::router())
        .with_state(state)
}
