#[cfg(feature = "couch-store")]
pub mod couchdb;
pub mod memory;
#[cfg(feature = "mongo-store")]
pub mod mongodb;

use futures::future::BoxFuture;

use crate::dao::storage::StorageResult;

pub use memory::MemoryGameLock;

/// Process-wide "is a game currently running" flag shared by every conversation.
///
/// `try_acquire` is a compare-and-set: it only succeeds when no game holds the
/// lock, so two conversations starting a game at the same time cannot both win.
pub trait GameLock: Send + Sync {
    /// Whether a game currently holds the lock.
    fn is_running(&self) -> BoxFuture<'static, StorageResult<bool>>;
    /// Mark the game as running. Returns `false` when the lock was already held.
    fn try_acquire(&self) -> BoxFuture<'static, StorageResult<bool>>;
    /// Clear the running flag. Releasing a free lock is not an error.
    fn release(&self) -> BoxFuture<'static, StorageResult<()>>;
    /// Check that the backend is reachable.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    /// Re-establish the backend connection after a failed health check.
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
