/// Conversation turn handling and session persistence.
pub mod dialog_service;
/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Lock backend connection supervisor with backoff and health polling.
pub mod lock_supervisor;
