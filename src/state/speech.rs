//! Spoken response directives produced by every turn.

use serde::Serialize;
use utoipa::ToSchema;

use crate::state::session::CategoryBoard;

/// What the voice front end should say and whether it keeps listening.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct SpeechResponse {
    /// Text spoken immediately.
    pub speech: String,
    /// Text spoken when the user stays silent.
    pub reprompt: Option<String>,
    /// Whether the conversation stays open for another turn.
    pub keep_session_open: bool,
}

impl SpeechResponse {
    /// Speak and end the conversation.
    pub fn tell(speech: impl Into<String>) -> Self {
        Self {
            speech: speech.into(),
            reprompt: None,
            keep_session_open: false,
        }
    }

    /// Speak and keep the conversation open without a re-prompt.
    pub fn tell_keep_session(speech: impl Into<String>) -> Self {
        Self {
            speech: speech.into(),
            reprompt: None,
            keep_session_open: true,
        }
    }

    /// Speak, then re-prompt if the user stays silent.
    pub fn ask(speech: impl Into<String>, reprompt: impl Into<String>) -> Self {
        Self {
            speech: speech.into(),
            reprompt: Some(reprompt.into()),
            keep_session_open: true,
        }
    }

    /// Generic utterance used when the lock backend cannot be reached.
    pub fn backend_failure() -> Self {
        Self::ask(
            "Sorry, something went wrong. Please try again.",
            "Please try that again.",
        )
    }
}

/// Render the open categories as "northern for 200, 400 and 600, science for 800".
pub fn render_board(board: &CategoryBoard) -> String {
    board
        .open_categories()
        .map(|(category, values)| format!("{category} for {}", spoken_list(values)))
        .collect::<Vec<_>>()
        .join(", ")
}

fn spoken_list(values: &[u32]) -> String {
    match values {
        [] => String::new(),
        [only] => only.to_string(),
        [head @ .., last] => {
            let head = head
                .iter()
                .map(u32::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            format!("{head} and {last}")
        }
    }
}

#[cfg(test)]
mod tests {
    use indexmap::IndexMap;

    use super::*;

    #[test]
    fn builders_set_session_flags() {
        assert!(!SpeechResponse::tell("bye").keep_session_open);
        assert!(SpeechResponse::tell_keep_session("ok").keep_session_open);

        let ask = SpeechResponse::ask("question?", "again?");
        assert!(ask.keep_session_open);
        assert_eq!(ask.reprompt.as_deref(), Some("again?"));
    }

    #[test]
    fn board_rendering_lists_values_and_skips_empty_categories() {
        let mut categories = IndexMap::new();
        categories.insert("northern".to_owned(), vec![200, 400, 600]);
        categories.insert("history".to_owned(), Vec::new());
        categories.insert("science".to_owned(), vec![800]);
        let board = CategoryBoard::from(categories);

        let rendered = render_board(&board);
        assert_eq!(rendered, "northern for 200, 400 and 600, science for 800");
        assert!(!rendered.contains("undefined"));
        assert!(!rendered.contains("history"));
    }
}
