use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

use crate::dao::models::LockState;

const LOCK_PREFIX: &str = "lock::";

/// Lock document as stored in CouchDB.
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouchLockDocument {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_rev")]
    pub rev: Option<String>,
    #[serde(default)]
    pub state: Option<LockState>,
    #[serde(default)]
    pub acquired_at: Option<String>,
}

impl CouchLockDocument {
    /// Fresh document for a game that has never been locked.
    pub fn new(doc_id: &str) -> Self {
        Self {
            id: doc_id.to_owned(),
            rev: None,
            state: None,
            acquired_at: None,
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, Some(LockState::Running))
    }
}

pub fn lock_doc_id(game_id: &str) -> String {
    format!("{LOCK_PREFIX}{game_id}")
}
