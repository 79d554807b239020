pub mod appointments;
pub mod auth;
pub mod doctors;
pub mod health;
pub mod memberships;
pub mod pharma;
pub mod reference;
pub mod roles;
pub mod users;

use serde::Serialize;
use utoipa::ToSchema;

/// Body of actions that only report an outcome.
#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

impl MessageResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}
