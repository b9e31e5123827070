use serde::{Deserialize, Serialize};
use time::Date;
use uuid::Uuid;

use crate::users::User;

/// Request body for user registration. Fields default to empty so a missing
/// field reads as a validation failure rather than a deserialization error.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub date_of_birth: String,
}

/// Request body for password login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Response returned whenever a session is established.
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub user: PublicUser,
}

/// Public part of the user returned to the client. Never carries the
/// password hash or any live secret.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub phone: Option<String>,
    pub date_of_birth: Date,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            username: user.username.clone(),
            phone: user.credentials.phone().map(str::to_string),
            date_of_birth: user.date_of_birth,
        }
    }
}
