//! Request/response types for the reset endpoints.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct SendResetRequest {
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_to: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct SendResetResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SendResetResponse {
    /// The single success body both endpoints return, independent of whether
    /// the email address exists.
    #[must_use]
    pub fn accepted() -> Self {
        Self {
            success: true,
            message: Some(
                "Se o e-mail estiver cadastrado, um link de recupera\u{e7}\u{e3}o foi enviado."
                    .to_string(),
            ),
            error: None,
        }
    }

    #[must_use]
    pub fn error(error: &str) -> Self {
        Self {
            success: false,
            message: None,
            error: Some(error.to_string()),
        }
    }
}
