use std::sync::Arc;

use dashmap::DashMap;
use futures::future::{self, BoxFuture};

use crate::{dao::storage::StorageResult, state::session::SessionState};

/// Keeps each conversation's [`SessionState`] between turns.
pub trait SessionStore: Send + Sync {
    /// State saved for a conversation, `None` on its first turn.
    fn load(&self, conversation_id: &str) -> BoxFuture<'static, StorageResult<Option<SessionState>>>;
    /// Save the state a conversation continues with.
    fn store(
        &self,
        conversation_id: &str,
        session: SessionState,
    ) -> BoxFuture<'static, StorageResult<()>>;
    /// Forget a conversation once it has ended.
    fn discard(&self, conversation_id: &str) -> BoxFuture<'static, StorageResult<()>>;
}

/// Session store kept in process memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySessionStore {
    sessions: Arc<DashMap<String, SessionState>>,
}

impl MemorySessionStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of open conversations.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether no conversation is open.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self, conversation_id: &str) -> BoxFuture<'static, StorageResult<Option<SessionState>>> {
        let session = self
            .sessions
            .get(conversation_id)
            .map(|entry| entry.value().clone());
        Box::pin(future::ready(Ok(session)))
    }

    fn store(
        &self,
        conversation_id: &str,
        session: SessionState,
    ) -> BoxFuture<'static, StorageResult<()>> {
        self.sessions.insert(conversation_id.to_owned(), session);
        Box::pin(future::ready(Ok(())))
    }

    fn discard(&self, conversation_id: &str) -> BoxFuture<'static, StorageResult<()>> {
        self.sessions.remove(conversation_id);
        Box::pin(future::ready(Ok(())))
    }
}
