use serde::{Deserialize, Serialize};

/// Value stored in the lock record while a game instance is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LockState {
    /// A game is currently running.
    Running,
}

/// Backend-agnostic shape of the persisted game lock: `{ id, state: "running" | absent }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockRecord {
    /// Fixed identifier of the game instance.
    pub id: String,
    /// Present only while a game holds the lock.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<LockState>,
}

impl LockRecord {
    /// Whether the record marks the game as running.
    pub fn is_running(&self) -> bool {
        self.state == Some(LockState::Running)
    }
}
