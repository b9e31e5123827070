use axum::{extract::State, Json};
use time::OffsetDateTime;
use tracing::{error, info, instrument, warn};

use crate::{
    auth::password::hash_password,
    error::AuthError,
    reset::dto::{RequestResetRequest, ResetPasswordRequest},
    secrets,
    state::AppState,
};

#[instrument(skip(state, payload))]
pub async fn request_reset(
    State(state): State<AppState>,
    Json(mut payload): Json<RequestResetRequest>,
) -> Result<Json<serde_json::Value>, AuthError> {
    payload.email = payload.email.trim().to_lowercase();
    if payload.email.is_empty() {
        return Err(AuthError::Validation("Email is required.".into()));
    }

    let mut user = state
        .store
        .find_by_email(&payload.email)
        .await?
        .ok_or_else(|| AuthError::NotFound("No user found with that email.".into()))?;

    let token = secrets::issue_reset(state.store.as_ref(), &mut user).await?;

    let reset_url = format!(
        "{}/reset-password?token={token}",
        state.config.frontend_url.trim_end_matches('/')
    );
    // the secret stays issued even when dispatch fails
    if let Err(e) = state.mailer.send_password_reset(&user.email, &reset_url).await {
        error!(error = %e, user_id = %user.id, "password reset email dispatch failed");
        return Err(AuthError::Delivery(
            "Failed to send password reset email.".into(),
        ));
    }

    info!(user_id = %user.id, "password reset requested");
    Ok(Json(serde_json::json!({
        "message": "Password reset email sent."
    })))
}

#[instrument(skip(state, payload))]
pub async fn reset_password(
    State(state): State<AppState>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<Json<serde_json::Value>, AuthError> {
    if payload.token.is_empty() || payload.password.is_empty() {
        return Err(AuthError::Validation(
            "Token and new password are required.".into(),
        ));
    }
    if payload.password.len() < 8 {
        return Err(AuthError::Validation("Password too short.".into()));
    }

    let invalid = || AuthError::InvalidOrExpired("Invalid or expired token.".into());

    let mut user = state
        .store
        .find_by_reset_token(&payload.token)
        .await?
        .ok_or_else(invalid)?;

    let now = OffsetDateTime::now_utc();
    match &user.reset_secret {
        Some(secret) if secret.value == payload.token && secret.is_live(now) => {}
        _ => {
            warn!(user_id = %user.id, "reset attempted with dead token");
            return Err(invalid());
        }
    }

    // the secret is cleared by the same save that installs the new hash,
    // so the token cannot be replayed
    let hash = hash_password(&payload.password)?;
    user.credentials.set_password_hash(hash);
    user.reset_secret = None;
    state.store.save(&user).await?;

    info!(user_id = %user.id, "password reset completed");
    Ok(Json(serde_json::json!({
        "message": "Password has been reset successfully."
    })))
}

#[cfg(test)]
mod tests {
    use crate::state::AppState;
    use crate::testing::{body_json, post_json};
    use crate::users::TimedSecret;
    use axum::http::StatusCode;
    use time::OffsetDateTime;
    use tower::ServiceExt;

    fn signup_body() -> serde_json::Value {
        serde_json::json!({
            "email": "a@x.com",
            "password": "pw123456",
            "username": "alice",
            "phone": "+15551234567",
            "dateOfBirth": "2000-01-01",
        })
    }

    async fn signed_up_state() -> (AppState, axum::Router) {
        let state = AppState::fake();
        let app = crate::app::build_app(state.clone());
        let res = app
            .clone()
            .oneshot(post_json("/auth/signup", signup_body()))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);
        (state, app)
    }

    #[tokio::test]
    async fn request_reset_validates_and_reports_unknown_email() {
        let (_, app) = signed_up_state().await;

        let res = app
            .clone()
            .oneshot(post_json("/auth/request-reset", serde_json::json!({})))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);

        let res = app
            .oneshot(post_json(
                "/auth/request-reset",
                serde_json::json!({ "email": "ghost@x.com" }),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn full_reset_flow_consumes_the_token_exactly_once() {
        let (state, app) = signed_up_state().await;

        let res = app
            .clone()
            .oneshot(post_json(
                "/auth/request-reset",
                serde_json::json!({ "email": "a@x.com" }),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);

        let user = state.store.find_by_email("a@x.com").await.unwrap().unwrap();
        let token = user.reset_secret.expect("reset secret issued").value;
        assert_eq!(token.len(), 64);

        let res = app
            .clone()
            .oneshot(post_json(
                "/auth/reset-password",
                serde_json::json!({ "token": token, "password": "brand-new-pw" }),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);

        // old password dead, new one works
        let res = app
            .clone()
            .oneshot(post_json(
                "/auth/login",
                serde_json::json!({ "email": "a@x.com", "password": "pw123456" }),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        let res = app
            .clone()
            .oneshot(post_json(
                "/auth/login",
                serde_json::json!({ "email": "a@x.com", "password": "brand-new-pw" }),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);

        // second attempt with the same token fails and mutates nothing
        let res = app
            .clone()
            .oneshot(post_json(
                "/auth/reset-password",
                serde_json::json!({ "token": token, "password": "yet-another-pw" }),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let body = body_json(res).await;
        assert_eq!(body["error"]["code"], "INVALID_OR_EXPIRED");
        let res = app
            .oneshot(post_json(
                "/auth/login",
                serde_json::json!({ "email": "a@x.com", "password": "brand-new-pw" }),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn expired_token_is_rejected() {
        let (state, app) = signed_up_state().await;

        let mut user = state.store.find_by_email("a@x.com").await.unwrap().unwrap();
        user.reset_secret = Some(TimedSecret {
            value: "feedfacefeedfacefeedfacefeedfacefeedfacefeedfacefeedfacefeedface".into(),
            expires_at: OffsetDateTime::now_utc() - time::Duration::seconds(1),
        });
        state.store.save(&user).await.unwrap();

        let res = app
            .oneshot(post_json(
                "/auth/reset-password",
                serde_json::json!({
                    "token": "feedfacefeedfacefeedfacefeedfacefeedfacefeedfacefeedfacefeedface",
                    "password": "brand-new-pw",
                }),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn reissuing_invalidates_the_previous_token() {
        let (state, app) = signed_up_state().await;

        for _ in 0..2 {
            let res = app
                .clone()
                .oneshot(post_json(
                    "/auth/request-reset",
                    serde_json::json!({ "email": "a@x.com" }),
                ))
                .await
                .unwrap();
            assert_eq!(res.status(), StatusCode::OK);
        }
        let user = state.store.find_by_email("a@x.com").await.unwrap().unwrap();
        // only the latest token is findable; any older one was overwritten
        let live = user.reset_secret.expect("live secret").value;
        let found = state.store.find_by_reset_token(&live).await.unwrap();
        assert!(found.is_some());
    }
}
