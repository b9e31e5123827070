use axum::{extract::State, http::header, response::IntoResponse, Json};
use time::OffsetDateTime;
use tracing::{error, info, instrument, warn};

use crate::{
    auth::dto::PublicUser,
    delivery::normalize_sms_number,
    error::AuthError,
    otp::dto::{RequestOtpRequest, VerifiedOtpResponse, VerifyOtpRequest},
    secrets,
    session::establish_session,
    state::AppState,
};

#[instrument(skip(state, payload))]
pub async fn request_otp(
    State(state): State<AppState>,
    Json(payload): Json<RequestOtpRequest>,
) -> Result<Json<serde_json::Value>, AuthError> {
    if payload.phone.is_empty() {
        return Err(AuthError::Validation("Phone number is required.".into()));
    }

    // unknown phone is a plain 404: phone numbers are not treated as
    // enumeration-sensitive here, unlike login emails
    let mut user = state
        .store
        .find_by_phone(&payload.phone)
        .await?
        .ok_or_else(|| AuthError::NotFound("No user found with that phone number.".into()))?;

    let code = secrets::issue_otp(state.store.as_ref(), &mut user).await?;

    let destination = normalize_sms_number(user.credentials.phone().unwrap_or(&payload.phone));
    // the issued code stays live when dispatch fails; only delivery is lost
    if let Err(e) = state.sms.send_otp(&destination, &code).await {
        error!(error = %e, user_id = %user.id, "otp sms dispatch failed");
        return Err(AuthError::Delivery("Failed to send OTP SMS.".into()));
    }

    info!(user_id = %user.id, "otp challenge issued");
    Ok(Json(serde_json::json!({
        "message": "OTP sent to your phone number."
    })))
}

#[instrument(skip(state, payload))]
pub async fn verify_otp(
    State(state): State<AppState>,
    Json(payload): Json<VerifyOtpRequest>,
) -> Result<impl IntoResponse, AuthError> {
    if payload.phone.is_empty() || payload.otp.is_empty() {
        return Err(AuthError::Validation(
            "Phone number and OTP are required.".into(),
        ));
    }

    let invalid = || AuthError::InvalidOrExpired("Invalid or expired OTP.".into());

    // phone + code + liveness must all hold; any miss looks the same
    let mut user = state
        .store
        .find_by_phone(&payload.phone)
        .await?
        .ok_or_else(invalid)?;

    let now = OffsetDateTime::now_utc();
    match &user.otp_secret {
        Some(secret) if secret.value == payload.otp && secret.is_live(now) => {}
        _ => {
            warn!(user_id = %user.id, "otp verification failed");
            return Err(invalid());
        }
    }

    // consuming save: the code is gone before the session exists
    user.otp_secret = None;
    state.store.save(&user).await?;

    let (token, cookie) = establish_session(&state, user.id)?;

    info!(user_id = %user.id, "otp login succeeded");
    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(VerifiedOtpResponse {
            user: PublicUser::from(&user),
            token,
        }),
    ))
}
