use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use time::{macros::format_description, Date};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{LoginRequest, PublicUser, SessionResponse, SignupRequest},
        password::{hash_password, is_valid_email, verify_password},
    },
    error::AuthError,
    session::{clear_session_cookie, establish_session, CurrentUser},
    state::AppState,
    users::{AccountCredentials, NewUser},
};

#[instrument(skip(state, payload))]
pub async fn signup(
    State(state): State<AppState>,
    Json(mut payload): Json<SignupRequest>,
) -> Result<impl IntoResponse, AuthError> {
    payload.email = payload.email.trim().to_lowercase();

    if payload.email.is_empty()
        || payload.password.is_empty()
        || payload.username.is_empty()
        || payload.phone.is_empty()
        || payload.date_of_birth.is_empty()
    {
        return Err(AuthError::Validation("All fields are required.".into()));
    }

    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(AuthError::Validation("Invalid email.".into()));
    }

    if payload.password.len() < 8 {
        warn!("password too short");
        return Err(AuthError::Validation("Password too short.".into()));
    }

    let date_of_birth = Date::parse(
        &payload.date_of_birth,
        &format_description!("[year]-[month]-[day]"),
    )
    .map_err(|_| AuthError::Validation("Invalid date of birth.".into()))?;

    // Pre-check for a friendly answer; the store's uniqueness constraint
    // still decides races.
    if state.store.find_by_email(&payload.email).await?.is_some() {
        warn!(email = %payload.email, "email already registered");
        return Err(AuthError::Conflict("Email already in use.".into()));
    }

    let hash = hash_password(&payload.password)?;
    let user = state
        .store
        .create(NewUser {
            email: payload.email,
            username: payload.username,
            date_of_birth,
            credentials: AccountCredentials::Local {
                password_hash: hash,
                phone: payload.phone,
            },
        })
        .await?;

    let (_, cookie) = establish_session(&state, user.id)?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok((
        StatusCode::CREATED,
        [(header::SET_COOKIE, cookie)],
        Json(SessionResponse {
            user: PublicUser::from(&user),
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AuthError> {
    payload.email = payload.email.trim().to_lowercase();

    if payload.email.is_empty() || payload.password.is_empty() {
        return Err(AuthError::Validation(
            "Email and password are required.".into(),
        ));
    }

    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(AuthError::Validation("Invalid email.".into()));
    }

    let user = match state.store.find_by_email(&payload.email).await? {
        Some(u) => u,
        None => {
            warn!(email = %payload.email, "login unknown email");
            return Err(AuthError::InvalidCredentials);
        }
    };

    // Federation-only accounts have no hash; same merged outcome.
    let hash = match user.credentials.password_hash() {
        Some(h) => h,
        None => {
            warn!(user_id = %user.id, "password login for federation-only account");
            return Err(AuthError::InvalidCredentials);
        }
    };

    if !verify_password(&payload.password, hash)? {
        warn!(email = %payload.email, user_id = %user.id, "login invalid password");
        return Err(AuthError::InvalidCredentials);
    }

    let (_, cookie) = establish_session(&state, user.id)?;

    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(SessionResponse {
            user: PublicUser::from(&user),
        }),
    ))
}

#[instrument(skip(state))]
pub async fn logout(State(state): State<AppState>) -> impl IntoResponse {
    // stateless bearer session: nothing to revoke server-side
    let cookie = clear_session_cookie(state.config.secure_cookies);
    (
        [(header::SET_COOKIE, cookie)],
        Json(serde_json::json!({ "message": "Logged out" })),
    )
}

#[instrument(skip(state))]
pub async fn me(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> Result<Json<SessionResponse>, AuthError> {
    let user = state
        .store
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| AuthError::Unauthenticated("User not found.".into()))?;

    Ok(Json(SessionResponse {
        user: PublicUser::from(&user),
    }))
}
