pub mod dialog;
pub mod question_bank;
pub mod session;
pub mod speech;
pub mod state_machine;

use std::sync::Arc;

use tokio::sync::{RwLock, watch};

use crate::{
    dao::{lock_store::GameLock, session_store::SessionStore},
    error::ServiceError,
};

use self::dialog::DialogEngine;

/// Shared handle passed to every route and background task.
pub type SharedState = Arc<AppState>;

/// Central application state: the dialog engine plus the backends it talks to.
pub struct AppState {
    lock_store: RwLock<Option<Arc<dyn GameLock>>>,
    sessions: Arc<dyn SessionStore>,
    engine: DialogEngine,
    degraded: watch::Sender<bool>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a lock backend is installed.
    pub fn new(engine: DialogEngine, sessions: Arc<dyn SessionStore>) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        Arc::new(Self {
            lock_store: RwLock::new(None),
            sessions,
            engine,
            degraded: degraded_tx,
        })
    }

    /// Handle to the installed lock backend, or `None` while degraded.
    pub async fn lock_store(&self) -> Option<Arc<dyn GameLock>> {
        if self.is_degraded().await {
            return None;
        }
        let guard = self.lock_store.read().await;
        guard.as_ref().cloned()
    }

    /// Installed lock backend even when it is currently marked unhealthy.
    pub async fn require_lock_store(&self) -> Result<Arc<dyn GameLock>, ServiceError> {
        let guard = self.lock_store.read().await;
        guard.as_ref().cloned().ok_or(ServiceError::Degraded)
    }

    /// Install a lock backend and leave degraded mode.
    pub async fn install_lock_store(&self, lock: Arc<dyn GameLock>) {
        self.set_lock_store(lock).await;
        self.update_degraded(false).await;
    }

    /// Replace the lock backend without touching the degraded flag.
    pub async fn set_lock_store(&self, lock: Arc<dyn GameLock>) {
        let mut guard = self.lock_store.write().await;
        *guard = Some(lock);
    }

    /// Remove the current lock backend and enter degraded mode.
    pub async fn clear_lock_store(&self) {
        {
            let mut guard = self.lock_store.write().await;
            guard.take();
        }
        self.update_degraded(true).await;
    }

    /// Current degraded flag.
    pub async fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Update and broadcast the degraded flag when the value changes.
    pub async fn update_degraded(&self, value: bool) {
        self.degraded.send_if_modified(|current| {
            if *current == value {
                return false;
            }
            *current = value;
            true
        });
    }

    /// Per-conversation session persistence.
    pub fn sessions(&self) -> &Arc<dyn SessionStore> {
        &self.sessions
    }

    /// Engine answering every turn.
    pub fn engine(&self) -> &DialogEngine {
        &self.engine
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{
        dao::{lock_store::MemoryGameLock, session_store::MemorySessionStore},
        state::question_bank::QuestionBank,
    };

    fn state() -> SharedState {
        let engine = DialogEngine::new(
            Arc::new(QuestionBank::builtin()),
            "blue",
            Duration::from_secs(1),
        );
        AppState::new(engine, Arc::new(MemorySessionStore::new()))
    }

    #[tokio::test]
    async fn starts_degraded_until_a_lock_is_installed() {
        let state = state();
        let mut watcher = state.degraded_watcher();

        assert!(state.is_degraded().await);
        assert!(state.lock_store().await.is_none());

        state.install_lock_store(Arc::new(MemoryGameLock::new())).await;
        assert!(watcher.has_changed().unwrap());
        assert!(!*watcher.borrow_and_update());
        assert!(state.lock_store().await.is_some());

        state.clear_lock_store().await;
        assert!(state.is_degraded().await);
        assert!(state.require_lock_store().await.is_err());
    }

    #[tokio::test]
    async fn unhealthy_backend_is_hidden_from_turns() {
        let state = state();
        state.install_lock_store(Arc::new(MemoryGameLock::new())).await;

        state.update_degraded(true).await;
        assert!(state.lock_store().await.is_none());
        assert!(state.require_lock_store().await.is_ok());
    }
}
