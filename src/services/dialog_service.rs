use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    dto::{
        turn::{TurnRequest, TurnResponse},
        validation::validate_conversation_id,
    },
    error::ServiceError,
    state::{SharedState, session::GameStatus, speech::SpeechResponse},
};

/// Run one turn for a conversation and persist the session it continues with.
///
/// Session store failures are answered like lock failures: a spoken apology
/// with the conversation left where it was.
pub async fn handle_turn(
    state: &SharedState,
    conversation_id: &str,
    request: TurnRequest,
) -> Result<TurnResponse, ServiceError> {
    validate_conversation_id(conversation_id).map_err(|err| {
        let message = err.message.unwrap_or(err.code);
        ServiceError::InvalidInput(message.into_owned())
    })?;

    let turn_id = Uuid::new_v4();
    info!(%turn_id, conversation_id, intent = %request.intent, "handling turn");

    let session = match state.sessions().load(conversation_id).await {
        Ok(session) => session,
        Err(err) => {
            warn!(%turn_id, conversation_id, error = %err, "failed to load session");
            return Ok(apology(GameStatus::default()));
        }
    };
    let previous_status = session
        .as_ref()
        .map(|session| session.status)
        .unwrap_or_default();

    let lock = state.lock_store().await;
    let turn = state
        .engine()
        .handle_intent(lock.as_deref(), &request.intent, &request.slots, session)
        .await;

    let persisted = if turn.response.keep_session_open {
        state
            .sessions()
            .store(conversation_id, turn.session.clone())
            .await
    } else {
        state.sessions().discard(conversation_id).await
    };
    if let Err(err) = persisted {
        warn!(%turn_id, conversation_id, error = %err, "failed to persist session");
        return Ok(apology(previous_status));
    }

    debug!(%turn_id, status = ?turn.session.status, "turn complete");
    Ok(turn.into())
}

fn apology(status: GameStatus) -> TurnResponse {
    let response = SpeechResponse::backend_failure();
    TurnResponse {
        speech: response.speech,
        reprompt: response.reprompt,
        keep_session_open: response.keep_session_open,
        status,
    }
}
