use axum::{
    Json, Router,
    extract::{Path, State},
    routing::post,
};
use axum_valid::Valid;

use crate::{
    dto::turn::{TurnRequest, TurnResponse},
    error::AppError,
    services::dialog_service,
    state::SharedState,
};

/// Routes carrying conversation turns.
pub fn router() -> Router<SharedState> {
    Router::new().route("/conversations/{id}/turns", post(handle_turn))
}

/// Answer one utterance of a conversation.
#[utoipa::path(
    post,
    path = "/conversations/{id}/turns",
    tag = "dialog",
    params(("id" = String, Path, description = "Conversation identifier assigned by the voice platform")),
    request_body = TurnRequest,
    responses(
        (status = 200, description = "Spoken response for the turn", body = TurnResponse),
        (status = 400, description = "Invalid conversation identifier or request body")
    )
)]
pub async fn handle_turn(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Valid(Json(payload)): Valid<Json<TurnRequest>>,
) -> Result<Json<TurnResponse>, AppError> {
    let response = dialog_service::handle_turn(&state, &id, payload).await?;
    Ok(Json(response))
}
