//! Per-conversation game state carried from one turn to the next.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::state::question_bank::{QuestionBank, normalize_spoken};

/// Lifecycle of the game as seen by one conversation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    /// No game has been started in this conversation.
    #[default]
    NotStarted,
    /// A game is in progress.
    Running,
    /// Waiting for a yes/no on cancelling the running game.
    CancelPending,
    /// Waiting for a yes/no on starting a fresh game after a cancellation.
    StartPending,
}

/// Why a `(category, value)` pair could not be taken from the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TakeError {
    /// The category is not on the board.
    UnknownCategory,
    /// The category exists but the value is not (or no longer) on its ladder.
    UnavailableValue,
}

/// Remaining point values per category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryBoard {
    categories: IndexMap<String, Vec<u32>>,
}

impl From<IndexMap<String, Vec<u32>>> for CategoryBoard {
    fn from(categories: IndexMap<String, Vec<u32>>) -> Self {
        Self { categories }
    }
}

impl CategoryBoard {
    /// Remaining values for a category, matched case-insensitively.
    pub fn remaining(&self, category: &str) -> Option<&[u32]> {
        self.categories
            .get(&normalize_spoken(category))
            .map(Vec::as_slice)
    }

    /// Remove `value` from `category`. A value can only be taken once.
    pub fn take(&mut self, category: &str, value: u32) -> Result<(), TakeError> {
        let values = self
            .categories
            .get_mut(&normalize_spoken(category))
            .ok_or(TakeError::UnknownCategory)?;
        let position = values
            .iter()
            .position(|candidate| *candidate == value)
            .ok_or(TakeError::UnavailableValue)?;
        values.remove(position);
        Ok(())
    }

    /// Categories that still hold at least one value, in board order.
    pub fn open_categories(&self) -> impl Iterator<Item = (&str, &[u32])> {
        self.categories
            .iter()
            .filter(|(_, values)| !values.is_empty())
            .map(|(name, values)| (name.as_str(), values.as_slice()))
    }

    /// Whether every clue has been asked.
    pub fn is_exhausted(&self) -> bool {
        self.open_categories().next().is_none()
    }
}

/// The clue currently waiting for an answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingQuestion {
    /// Accepted phrasings, in the order they are checked.
    pub answers: Vec<String>,
    /// Points awarded on a correct answer.
    pub value: u32,
}

impl PendingQuestion {
    /// First accepted phrasing matching `submitted`, ignoring case and spacing.
    pub fn matching_answer(&self, submitted: &str) -> Option<&str> {
        let submitted = normalize_spoken(submitted);
        self.answers
            .iter()
            .find(|accepted| normalize_spoken(accepted) == submitted)
            .map(String::as_str)
    }
}

/// Mutable record owned by one conversation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    /// Current lifecycle status.
    pub status: GameStatus,
    /// Remaining clues, created lazily on first use.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub board: Option<CategoryBoard>,
    /// Clue awaiting an answer, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_question: Option<PendingQuestion>,
    /// Score ledger keyed by normalised team name.
    #[serde(default)]
    pub scores: IndexMap<String, u32>,
}

impl SessionState {
    /// Ensure a board exists, starting an implicit game when it does not.
    ///
    /// Returns `true` when a board had to be created.
    pub fn ensure_board(&mut self, bank: &QuestionBank) -> bool {
        let created = self.board.is_none();
        self.board_or_start(bank);
        created
    }

    /// Mutable access to the board, creating it (and marking the game running) if absent.
    pub fn board_or_start(&mut self, bank: &QuestionBank) -> &mut CategoryBoard {
        if self.board.is_none() {
            self.status = GameStatus::Running;
        }
        self.board.get_or_insert_with(|| bank.initial_board())
    }

    /// Drop every piece of game data and return to [`GameStatus::NotStarted`].
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Score of a team, registering it at zero when unseen.
    pub fn score_for(&mut self, team: &str) -> u32 {
        *self.scores.entry(normalize_spoken(team)).or_insert(0)
    }

    /// Credit `points` to a team and return its new total.
    pub fn award(&mut self, team: &str, points: u32) -> u32 {
        let score = self.scores.entry(normalize_spoken(team)).or_insert(0);
        *score = score.saturating_add(points);
        *score
    }
}
