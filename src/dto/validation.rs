//! Validation helpers for DTOs.

use validator::ValidationError;

const MAX_CONVERSATION_ID_LEN: usize = 128;

/// Validates a conversation identifier taken from the request path.
///
/// Identifiers are 1 to 128 ASCII characters drawn from letters, digits and `-_.:`,
/// which covers voice-platform session ids such as `amzn1.echo-api.session.1234`.
pub fn validate_conversation_id(id: &str) -> Result<(), ValidationError> {
    if id.is_empty() || id.len() > MAX_CONVERSATION_ID_LEN {
        let mut err = ValidationError::new("conversation_id_length");
        err.message = Some(
            format!(
                "Conversation ID must be 1 to {MAX_CONVERSATION_ID_LEN} characters (got {})",
                id.len()
            )
            .into(),
        );
        return Err(err);
    }

    if !id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ':'))
    {
        let mut err = ValidationError::new("conversation_id_format");
        err.message = Some("Conversation ID contains unsupported characters".into());
        return Err(err);
    }

    Ok(())
}
