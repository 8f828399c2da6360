//! Request/response DTOs for the HTTP façade.

pub mod directory;
pub mod share;

use serde::Serialize;
use utoipa::ToSchema;

/// Generic `{message}` response body.
#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}
