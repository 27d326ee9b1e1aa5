use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use utoipa::ToSchema;
use validator::Validate;

use crate::state::{dialog::Turn, session::GameStatus, state_machine::Slots};

/// One user utterance, already resolved to an intent by the voice platform.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct TurnRequest {
    /// Intent name, canonical (`StartGame`) or platform style (`StartJeopardyIntent`).
    #[validate(length(min = 1, max = 100))]
    pub intent: String,
    /// Slot values extracted from the utterance.
    #[serde(default)]
    #[validate(nested)]
    pub slots: Slots,
}

/// What to say back, plus the game status the conversation is now in.
#[skip_serializing_none]
#[derive(Debug, Serialize, ToSchema)]
pub struct TurnResponse {
    /// Text to speak.
    pub speech: String,
    /// Text to speak if the user stays silent.
    pub reprompt: Option<String>,
    /// Whether the platform should keep listening.
    pub keep_session_open: bool,
    /// Game status after the turn.
    pub status: GameStatus,
}

impl From<Turn> for TurnResponse {
    fn from(turn: Turn) -> Self {
        Self {
            speech: turn.response.speech,
            reprompt: turn.response.reprompt,
            keep_session_open: turn.response.keep_session_open,
            status: turn.session.status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_accepts_platform_slot_names() {
        let request: TurnRequest = serde_json::from_value(serde_json::json!({
            "intent": "SelectCategoryIntent",
            "slots": { "category": "science", "score": "400", "teamName": "red" }
        }))
        .unwrap();

        assert!(request.validate().is_ok());
        assert_eq!(request.slots.value(), Some("400"));
        assert_eq!(request.slots.team_name(), Some("red"));
    }

    #[test]
    fn oversized_slot_fails_validation() {
        let request: TurnRequest = serde_json::from_value(serde_json::json!({
            "intent": "AnswerOnly",
            "slots": { "answer": "x".repeat(201) }
        }))
        .unwrap();

        assert!(request.validate().is_err());
    }

    #[test]
    fn empty_intent_fails_validation() {
        let request: TurnRequest =
            serde_json::from_value(serde_json::json!({ "intent": "" })).unwrap();

        assert!(request.validate().is_err());
    }
}
