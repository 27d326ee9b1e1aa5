use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use futures::future::{self, BoxFuture};

use crate::dao::{lock_store::GameLock, storage::StorageResult};

/// Lock held in process memory, for single-instance deployments and tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryGameLock {
    running: Arc<AtomicBool>,
}

impl MemoryGameLock {
    /// Create a free lock.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the lock is held, without going through the async interface.
    pub fn is_held(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

impl GameLock for MemoryGameLock {
    fn is_running(&self) -> BoxFuture<'static, StorageResult<bool>> {
        Box::pin(future::ready(Ok(self.is_held())))
    }

    fn try_acquire(&self) -> BoxFuture<'static, StorageResult<bool>> {
        let acquired = self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok();
        Box::pin(future::ready(Ok(acquired)))
    }

    fn release(&self) -> BoxFuture<'static, StorageResult<()>> {
        self.running.store(false, Ordering::SeqCst);
        Box::pin(future::ready(Ok(())))
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(future::ready(Ok(())))
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(future::ready(Ok(())))
    }
}
