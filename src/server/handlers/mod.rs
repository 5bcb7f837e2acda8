pub mod agents;
pub mod chat;
pub mod health;
pub mod rag;

use uuid::Uuid;

use crate::errors::ApiError;

/// Agent ids travel as path/form strings; reject anything that is not a
/// UUID before touching storage.
pub(crate) fn parse_agent_id(agent_id: &str) -> Result<(), ApiError> {
    Uuid::parse_str(agent_id)
        .map(|_| ())
        .map_err(|_| ApiError::validation("INVALID_UUID", "invalid agent id format"))
}
