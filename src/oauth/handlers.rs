use axum::{
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tracing::{error, info, instrument, warn};

use crate::{error::AuthError, session::establish_session, state::AppState};

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    #[serde(default)]
    pub code: String,
}

#[instrument(skip(state))]
pub async fn start(State(state): State<AppState>) -> Redirect {
    Redirect::temporary(&state.linker.authorize_url())
}

/// Provider callback. Unlike the JSON endpoints this one answers with
/// redirects either way; failures land on the login page with an `error`
/// query param.
#[instrument(skip(state, query))]
pub async fn callback(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
) -> Response {
    let frontend = state.config.frontend_url.trim_end_matches('/').to_string();

    if query.code.is_empty() {
        return login_error_redirect(&frontend, "Bad Request");
    }

    let user = match state.linker.sign_in(state.store.as_ref(), &query.code).await {
        Ok(user) => user,
        Err(e) => {
            warn!(error = %e, "federated sign-in failed");
            let message = match e {
                AuthError::Internal(_) => "Authentication failed.".to_string(),
                other => other.to_string(),
            };
            return login_error_redirect(&frontend, &message);
        }
    };

    match establish_session(&state, user.id) {
        Ok((_, cookie)) => {
            info!(user_id = %user.id, "federated login succeeded");
            ([(header::SET_COOKIE, cookie)], Redirect::temporary(&frontend)).into_response()
        }
        Err(e) => {
            error!(error = %e, "session issuance failed");
            login_error_redirect(&frontend, "Authentication failed.")
        }
    }
}

fn login_error_redirect(frontend: &str, message: &str) -> Response {
    let query: String = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("error", message)
        .finish();
    Redirect::temporary(&format!("{frontend}/login?{query}")).into_response()
}

#[cfg(test)]
mod tests {
    use crate::oauth::linker::FederatedLinker;
    use crate::oauth::provider::{IdentityProvider, VerifiedIdentity};
    use crate::state::AppState;
    use crate::testing::{get_with_cookie, post_json, session_cookie_from};
    use async_trait::async_trait;
    use axum::http::{header, StatusCode};
    use std::sync::Arc;
    use tower::ServiceExt;

    struct StubProvider {
        identity: VerifiedIdentity,
    }

    #[async_trait]
    impl IdentityProvider for StubProvider {
        fn authorize_url(&self) -> String {
            "https://provider.test/authorize?client_id=test-client".into()
        }
        async fn verify_code(&self, code: &str) -> anyhow::Result<VerifiedIdentity> {
            if code == "good-code" {
                Ok(self.identity.clone())
            } else {
                anyhow::bail!("code rejected by provider")
            }
        }
    }

    fn state_with_identity(identity: VerifiedIdentity) -> (AppState, axum::Router) {
        let base = AppState::fake();
        let state = AppState::from_parts(
            base.store,
            base.config,
            base.mailer,
            base.sms,
            Arc::new(FederatedLinker::new(Arc::new(StubProvider { identity }))),
        );
        let app = crate::app::build_app(state.clone());
        (state, app)
    }

    fn google_alice() -> VerifiedIdentity {
        VerifiedIdentity {
            provider_id: "google-1".into(),
            email: Some("a@x.com".into()),
            display_name: Some("Alice Doe".into()),
        }
    }

    fn location(res: &axum::http::Response<axum::body::Body>) -> String {
        res.headers()
            .get(header::LOCATION)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string()
    }

    #[tokio::test]
    async fn start_redirects_to_the_provider() {
        let (_, app) = state_with_identity(google_alice());
        let res = app
            .oneshot(get_with_cookie("/auth/oauth/start", None))
            .await
            .unwrap();
        assert!(res.status().is_redirection());
        assert!(location(&res).starts_with("https://provider.test/authorize"));
    }

    #[tokio::test]
    async fn callback_without_code_redirects_with_error() {
        let (_, app) = state_with_identity(google_alice());
        let res = app
            .oneshot(get_with_cookie("/auth/oauth/callback", None))
            .await
            .unwrap();
        assert!(res.status().is_redirection());
        assert!(location(&res).contains("/login?error="));
    }

    #[tokio::test]
    async fn callback_creates_a_federation_only_account_and_session() {
        let (state, app) = state_with_identity(google_alice());

        let res = app
            .clone()
            .oneshot(get_with_cookie("/auth/oauth/callback?code=good-code", None))
            .await
            .unwrap();
        assert!(res.status().is_redirection());
        assert_eq!(location(&res), "http://frontend.local");
        let cookie = session_cookie_from(&res).expect("session cookie");

        let res = app
            .oneshot(get_with_cookie("/auth/me", Some(&cookie)))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);

        let user = state.store.find_by_provider_id("google-1").await.unwrap().unwrap();
        assert_eq!(user.email, "a@x.com");
        assert_eq!(user.username, "Alice Doe");
        assert_eq!(user.credentials.password_hash(), None);
    }

    #[tokio::test]
    async fn callback_merges_with_an_existing_password_account() {
        let (state, app) = state_with_identity(google_alice());

        let res = app
            .clone()
            .oneshot(post_json(
                "/auth/signup",
                serde_json::json!({
                    "email": "a@x.com",
                    "password": "pw123456",
                    "username": "alice",
                    "phone": "+15551234567",
                    "dateOfBirth": "2000-01-01",
                }),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);

        let res = app
            .clone()
            .oneshot(get_with_cookie("/auth/oauth/callback?code=good-code", None))
            .await
            .unwrap();
        assert!(res.status().is_redirection());

        // linked, not duplicated: the same account now carries the provider
        let by_provider = state.store.find_by_provider_id("google-1").await.unwrap().unwrap();
        let by_email = state.store.find_by_email("a@x.com").await.unwrap().unwrap();
        assert_eq!(by_provider.id, by_email.id);
        assert!(by_provider.credentials.password_hash().is_some());

        // and a repeat federated login resolves to the same user
        let res = app
            .oneshot(get_with_cookie("/auth/oauth/callback?code=good-code", None))
            .await
            .unwrap();
        assert!(res.status().is_redirection());
        assert_eq!(
            state.store.find_by_email("a@x.com").await.unwrap().unwrap().id,
            by_email.id
        );
    }

    #[tokio::test]
    async fn provider_without_email_is_rejected() {
        let (state, app) = state_with_identity(VerifiedIdentity {
            provider_id: "google-1".into(),
            email: None,
            display_name: Some("Ghost".into()),
        });

        let res = app
            .oneshot(get_with_cookie("/auth/oauth/callback?code=good-code", None))
            .await
            .unwrap();
        assert!(res.status().is_redirection());
        assert!(location(&res).contains("/login?error="));
        assert!(session_cookie_from(&res).is_none());
        assert!(state.store.find_by_provider_id("google-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn rejected_code_redirects_with_error() {
        let (_, app) = state_with_identity(google_alice());
        let res = app
            .oneshot(get_with_cookie("/auth/oauth/callback?code=bad-code", None))
            .await
            .unwrap();
        assert!(res.status().is_redirection());
        assert!(location(&res).contains("error=Authentication"));
    }
}
