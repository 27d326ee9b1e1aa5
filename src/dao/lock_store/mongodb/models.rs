use mongodb::bson::{DateTime, Document, doc};
use serde::{Deserialize, Serialize};

use crate::dao::models::{LockRecord, LockState};

/// Lock record as stored in the `game_locks` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoLockDocument {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<LockState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime>,
}

impl From<MongoLockDocument> for LockRecord {
    fn from(value: MongoLockDocument) -> Self {
        Self {
            id: value.id,
            state: value.state,
        }
    }
}

/// Filter matching the lock record of a game instance.
pub fn lock_id(id: &str) -> Document {
    doc! { "_id": id }
}

/// Filter matching the lock record only while it is free.
pub fn free_lock(id: &str) -> Document {
    doc! { "_id": id, "state": { "$ne": "running" } }
}
