use std::{collections::HashMap, str::FromStr};

use serde::Deserialize;
use thiserror::Error;
use tracing::error;
use utoipa::ToSchema;
use validator::Validate;

use crate::state::{
    question_bank::QuestionBank,
    session::{GameStatus, PendingQuestion, SessionState, TakeError},
    speech::{SpeechResponse, render_board},
};

/// Intents the dialog engine understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Intent {
    /// Conversation opened without a specific request.
    Launch,
    /// Start a new game.
    StartGame,
    /// Read out the remaining categories and values.
    ListCategories,
    /// Pick a category and value; the clue is read out.
    SelectCategory,
    /// Answer the clue currently open.
    AnswerOnly,
    /// Ask for a team's score.
    QueryScore,
    /// Confirm a pending cancellation or restart.
    Yes,
    /// Decline a pending cancellation or restart.
    No,
    /// Cancel the game.
    Cancel,
    /// Ask for help.
    Help,
    /// The platform closed the conversation.
    SessionEnded,
}

/// Error returned when an intent name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown intent `{0}`")]
pub struct UnknownIntent(pub String);

impl FromStr for Intent {
    type Err = UnknownIntent;

    /// Accept both the canonical names and the names used by the voice skill.
    fn from_str(name: &str) -> Result<Self, Self::Err> {
        let intent = match name.trim() {
            "LaunchRequest" | "Launch" => Intent::Launch,
            "StartJeopardyIntent" | "StartGame" => Intent::StartGame,
            "ListCategoryIntent" | "ListCategories" => Intent::ListCategories,
            "SelectCategoryIntent" | "SelectCategory" => Intent::SelectCategory,
            "AnswerOnlyIntent" | "AnswerOnly" => Intent::AnswerOnly,
            "AlexaJeopardyScore" | "QueryScore" => Intent::QueryScore,
            "AMAZON.YesIntent" | "Yes" => Intent::Yes,
            "AMAZON.NoIntent" | "No" => Intent::No,
            "AMAZON.CancelIntent" | "AMAZON.StopIntent" | "Cancel" => Intent::Cancel,
            "AMAZON.HelpIntent" | "Help" => Intent::Help,
            "SessionEndedRequest" | "SessionEnded" => Intent::SessionEnded,
            other => return Err(UnknownIntent(other.to_owned())),
        };
        Ok(intent)
    }
}

impl Intent {
    /// Whether the handler needs the game lock status before it can run.
    pub fn reads_lock(self, status: GameStatus) -> bool {
        match self {
            Intent::StartGame | Intent::Help => true,
            Intent::Yes => status == GameStatus::StartPending,
            _ => false,
        }
    }
}

/// Slot values extracted upstream. Blank slots count as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, ToSchema, Validate)]
pub struct Slots {
    /// Category name as spoken.
    #[serde(default)]
    #[validate(length(max = 200))]
    pub category: Option<String>,
    /// Point value as spoken, e.g. `"400"`.
    #[serde(default, alias = "score")]
    #[validate(length(max = 200))]
    pub value: Option<String>,
    /// Team the request refers to.
    #[serde(default, rename = "teamName")]
    #[validate(length(max = 200))]
    pub team_name: Option<String>,
    /// Free-form answer text.
    #[serde(default)]
    #[validate(length(max = 200))]
    pub answer: Option<String>,
}

fn present(slot: &Option<String>) -> Option<&str> {
    slot.as_deref().map(str::trim).filter(|value| !value.is_empty())
}

impl Slots {
    /// Category slot, if given.
    pub fn category(&self) -> Option<&str> {
        present(&self.category)
    }

    /// Value slot (`score` or `value`), if given.
    pub fn value(&self) -> Option<&str> {
        present(&self.value)
    }

    /// Team name slot, if given.
    pub fn team_name(&self) -> Option<&str> {
        present(&self.team_name)
    }

    /// Answer slot, if given.
    pub fn answer(&self) -> Option<&str> {
        present(&self.answer)
    }
}

impl<K, V> FromIterator<(K, V)> for Slots
where
    K: AsRef<str>,
    V: Into<String>,
{
    /// Build slots from raw `name -> value` pairs; unknown names are ignored.
    fn from_iter<I: IntoIterator<Item = (K, V)>>(pairs: I) -> Self {
        let mut slots = Slots::default();
        for (name, value) in pairs {
            match name.as_ref() {
                "category" => slots.category = Some(value.into()),
                "score" | "value" => slots.value = Some(value.into()),
                "teamName" => slots.team_name = Some(value.into()),
                "answer" => slots.answer = Some(value.into()),
                _ => {}
            }
        }
        slots
    }
}

/// Game lock status as observed before the handler ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockStatus {
    /// The lock was not consulted for this turn.
    Unknown,
    /// No game holds the lock.
    Free,
    /// A game holds the lock.
    Held,
}

/// Write the engine must perform on the game lock after a handler ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockEffect {
    /// Mark the game as running (compare-and-set).
    Acquire,
    /// Clear the running flag.
    Release,
}

/// Read-only inputs shared by every handler of a turn.
#[derive(Debug, Clone, Copy)]
pub struct TurnContext<'a> {
    /// Clue inventory.
    pub bank: &'a QuestionBank,
    /// Observed lock status.
    pub lock: LockStatus,
    /// Team credited when an answer names no team.
    pub default_team: &'a str,
}

/// Result of a handler: next state, what to say, and an optional lock write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    /// Session state after the turn.
    pub session: SessionState,
    /// Spoken response.
    pub response: SpeechResponse,
    /// Lock write requested by the transition.
    pub lock_effect: Option<LockEffect>,
}

impl Outcome {
    fn new(session: SessionState, response: SpeechResponse) -> Self {
        Self {
            session,
            response,
            lock_effect: None,
        }
    }

    fn with_lock_effect(mut self, effect: LockEffect) -> Self {
        self.lock_effect = Some(effect);
        self
    }
}

/// Pure transition for one intent.
pub type Handler = fn(&Slots, SessionState, &TurnContext<'_>) -> Outcome;

/// Dispatch table mapping each intent to its handler.
#[derive(Debug, Clone)]
pub struct DialogStateMachine {
    handlers: HashMap<Intent, Handler>,
}

impl Default for DialogStateMachine {
    fn default() -> Self {
        let mut machine = Self {
            handlers: HashMap::new(),
        };
        machine.register(Intent::Launch, launch);
        machine.register(Intent::StartGame, start_game);
        machine.register(Intent::ListCategories, list_categories);
        machine.register(Intent::SelectCategory, select_category);
        machine.register(Intent::AnswerOnly, answer_only);
        machine.register(Intent::QueryScore, query_score);
        machine.register(Intent::Yes, confirm);
        machine.register(Intent::No, decline);
        machine.register(Intent::Cancel, cancel);
        machine.register(Intent::Help, help);
        machine.register(Intent::SessionEnded, session_ended);
        machine
    }
}

impl DialogStateMachine {
    /// Create the state machine with every built-in handler registered.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the handler for an intent.
    pub fn register(&mut self, intent: Intent, handler: Handler) {
        self.handlers.insert(intent, handler);
    }

    /// Run the handler for `intent`; unknown intents get a clarifying re-prompt.
    pub fn transition(
        &self,
        intent: Option<Intent>,
        slots: &Slots,
        session: SessionState,
        context: &TurnContext<'_>,
    ) -> Outcome {
        match intent.and_then(|intent| self.handlers.get(&intent)) {
            Some(handler) => handler(slots, session, context),
            None => Outcome::new(session, clarify()),
        }
    }
}

fn clarify() -> SpeechResponse {
    SpeechResponse::ask(
        "Sorry, I didn't understand that. You can start a new game, list categories, or pick a category and a value.",
        "What would you like to do?",
    )
}

fn nothing_to_confirm() -> SpeechResponse {
    SpeechResponse::ask(
        "Sorry, there is nothing to confirm right now.",
        "You can say start a new game, or list categories.",
    )
}

fn already_running(mut session: SessionState) -> Outcome {
    session.status = GameStatus::CancelPending;
    Outcome::new(
        session,
        SpeechResponse::ask(
            "Sorry, a game is already running. Want to cancel?",
            "Do you want me to cancel the game of trivia that is running?",
        ),
    )
}

fn begin_game(mut session: SessionState, context: &TurnContext<'_>) -> Outcome {
    session.reset();
    session.board = Some(context.bank.initial_board());
    session.status = GameStatus::Running;
    Outcome::new(
        session,
        SpeechResponse::tell_keep_session(
            "New game of trivia started. Say list categories to hear what is on the board.",
        ),
    )
    .with_lock_effect(LockEffect::Acquire)
}

fn launch(_: &Slots, session: SessionState, _: &TurnContext<'_>) -> Outcome {
    Outcome::new(
        session,
        SpeechResponse::ask(
            "Welcome to trivia. You can say start a new game, or list categories.",
            "Say start a new game to begin.",
        ),
    )
}

fn start_game(_: &Slots, session: SessionState, context: &TurnContext<'_>) -> Outcome {
    if session.status == GameStatus::Running || context.lock == LockStatus::Held {
        already_running(session)
    } else {
        begin_game(session, context)
    }
}

fn list_categories(_: &Slots, mut session: SessionState, context: &TurnContext<'_>) -> Outcome {
    // Listing before any game exists starts one implicitly, without taking the lock.
    let board = session.board_or_start(context.bank);
    let response = if board.is_exhausted() {
        SpeechResponse::tell_keep_session(
            "Every category has been played. Say start a new game to play again.",
        )
    } else {
        SpeechResponse::tell_keep_session(format!(
            "The available categories are: {}.",
            render_board(board)
        ))
    };
    Outcome::new(session, response)
}

fn category_unavailable() -> SpeechResponse {
    SpeechResponse::tell_keep_session("Sorry that category is unavailable.")
}

fn invalid_option(raw_value: &str) -> SpeechResponse {
    SpeechResponse::tell_keep_session(format!(
        "Sorry {raw_value} is not a valid option for that category."
    ))
}

fn select_category(slots: &Slots, mut session: SessionState, context: &TurnContext<'_>) -> Outcome {
    let (Some(category), Some(raw_value)) = (slots.category(), slots.value()) else {
        return Outcome::new(
            session,
            SpeechResponse::tell_keep_session("Sorry that category failed."),
        );
    };

    let board = session.board_or_start(context.bank);
    let Some(remaining) = board.remaining(category) else {
        return Outcome::new(session, category_unavailable());
    };
    let value = match raw_value.parse::<u32>() {
        Ok(value) if remaining.contains(&value) => value,
        _ => return Outcome::new(session, invalid_option(raw_value)),
    };

    let entry = context.bank.lookup(category, value);
    debug_assert!(entry.is_some(), "board out of sync with question bank");
    let Some(entry) = entry else {
        error!(
            category,
            value, "board references a clue missing from the question bank"
        );
        return Outcome::new(session, category_unavailable());
    };

    match board.take(category, value) {
        Ok(()) => {}
        Err(TakeError::UnknownCategory) => return Outcome::new(session, category_unavailable()),
        Err(TakeError::UnavailableValue) => {
            return Outcome::new(session, invalid_option(raw_value));
        }
    }

    session.pending_question = Some(PendingQuestion {
        answers: entry.answers.clone(),
        value,
    });
    Outcome::new(
        session,
        SpeechResponse::ask(
            format!(
                "Selected category: {category} for {value}. Your question is: {}",
                entry.question
            ),
            entry.question.clone(),
        ),
    )
}

fn answer_only(slots: &Slots, mut session: SessionState, context: &TurnContext<'_>) -> Outcome {
    let Some(answer) = slots.answer() else {
        return Outcome::new(
            session,
            SpeechResponse::ask(
                "Sorry I couldn't quite catch that. Please repeat your answer.",
                "Please repeat your answer.",
            ),
        );
    };

    let Some(pending) = session.pending_question.take() else {
        return Outcome::new(
            session,
            SpeechResponse::ask(
                "There is no open question right now. Pick a category and a value first.",
                "Which category and value would you like?",
            ),
        );
    };

    let team = slots.team_name().unwrap_or(context.default_team);
    let response = match pending.matching_answer(answer) {
        Some(accepted) => {
            let total = session.award(team, pending.value);
            SpeechResponse::tell_keep_session(format!(
                "You correctly answered: {accepted}. Team {team} now has {total} points."
            ))
        }
        None => SpeechResponse::tell_keep_session("Sorry you didn't answer correctly!"),
    };
    Outcome::new(session, response)
}

fn query_score(slots: &Slots, mut session: SessionState, _: &TurnContext<'_>) -> Outcome {
    let Some(team) = slots.team_name() else {
        return Outcome::new(
            session,
            SpeechResponse::tell_keep_session("Sorry I didn't catch that team name."),
        );
    };

    let score = session.score_for(team);
    Outcome::new(
        session,
        SpeechResponse::tell_keep_session(format!(
            "The score for team {team} is currently {score}."
        )),
    )
}

fn confirm(_: &Slots, mut session: SessionState, context: &TurnContext<'_>) -> Outcome {
    match session.status {
        GameStatus::CancelPending => {
            session.reset();
            session.status = GameStatus::StartPending;
            Outcome::new(
                session,
                SpeechResponse::ask(
                    "Your game has been cancelled. Start again?",
                    "Do you want me to start a new game of trivia?",
                ),
            )
            .with_lock_effect(LockEffect::Release)
        }
        GameStatus::StartPending if context.lock == LockStatus::Held => already_running(session),
        GameStatus::StartPending => begin_game(session, context),
        GameStatus::NotStarted | GameStatus::Running => Outcome::new(session, nothing_to_confirm()),
    }
}

fn decline(_: &Slots, mut session: SessionState, _: &TurnContext<'_>) -> Outcome {
    match session.status {
        GameStatus::CancelPending => {
            session.status = GameStatus::Running;
            Outcome::new(session, SpeechResponse::tell_keep_session("Cancel aborted."))
        }
        GameStatus::StartPending => {
            session.status = GameStatus::NotStarted;
            Outcome::new(session, SpeechResponse::tell_keep_session("Ok."))
        }
        GameStatus::NotStarted | GameStatus::Running => Outcome::new(session, nothing_to_confirm()),
    }
}

fn cancel(_: &Slots, mut session: SessionState, _: &TurnContext<'_>) -> Outcome {
    session.reset();
    Outcome::new(session, SpeechResponse::tell("Game cancelled!"))
        .with_lock_effect(LockEffect::Release)
}

fn help(_: &Slots, session: SessionState, context: &TurnContext<'_>) -> Outcome {
    let speech = match context.lock {
        LockStatus::Held => {
            "A game is currently running. You can list categories, pick a category and a value, answer the open question, or ask for a team's score."
        }
        LockStatus::Free | LockStatus::Unknown => {
            "No game is running right now. Say start a new game to begin."
        }
    };
    Outcome::new(
        session,
        SpeechResponse::ask(speech, "What would you like to do?"),
    )
}

fn session_ended(_: &Slots, mut session: SessionState, _: &TurnContext<'_>) -> Outcome {
    session.reset();
    Outcome::new(session, SpeechResponse::tell(""))
}
