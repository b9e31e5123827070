use serde::{Deserialize, Serialize};

use crate::auth::dto::PublicUser;

/// Request body for starting the phone challenge.
#[derive(Debug, Deserialize)]
pub struct RequestOtpRequest {
    #[serde(default)]
    pub phone: String,
}

/// Request body for answering the phone challenge.
#[derive(Debug, Deserialize)]
pub struct VerifyOtpRequest {
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub otp: String,
}

/// OTP login response. Carries the session token in-body as well as in the
/// cookie so non-cookie clients can use it as a bearer token.
#[derive(Debug, Serialize)]
pub struct VerifiedOtpResponse {
    pub user: PublicUser,
    pub token: String,
}
