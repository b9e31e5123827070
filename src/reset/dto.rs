use serde::Deserialize;

/// Request body for starting a password reset.
#[derive(Debug, Deserialize)]
pub struct RequestResetRequest {
    #[serde(default)]
    pub email: String,
}

/// Request body for completing a password reset.
#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub password: String,
}
