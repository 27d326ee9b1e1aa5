/// Game lock capability and its backends.
pub mod lock_store;
/// Persisted record shapes shared by the backends.
pub mod models;
/// Per-conversation session persistence between turns.
pub mod session_store;
/// Storage abstraction layer for database operations.
pub mod storage;
