use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;

use crate::config::GoogleConfig;

const AUTHORIZE_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v2/userinfo";

/// An identity asserted by an external trusted provider, already verified.
#[derive(Debug, Clone)]
pub struct VerifiedIdentity {
    pub provider_id: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
}

/// External identity provider seam. `verify_code` turns a callback code into
/// a verified identity or an error; the linker consumes the result directly.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    fn authorize_url(&self) -> String;
    async fn verify_code(&self, code: &str) -> anyhow::Result<VerifiedIdentity>;
}

/// Google OAuth 2.0 authorization-code client.
pub struct GoogleProvider {
    client_id: String,
    client_secret: String,
    callback_url: String,
    http: reqwest::Client,
}

impl GoogleProvider {
    pub fn new(config: &GoogleConfig) -> Self {
        Self {
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            callback_url: config.callback_url.clone(),
            http: reqwest::Client::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct UserInfo {
    id: String,
    email: Option<String>,
    name: Option<String>,
}

#[async_trait]
impl IdentityProvider for GoogleProvider {
    fn authorize_url(&self) -> String {
        let query: String = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs([
                ("client_id", self.client_id.as_str()),
                ("redirect_uri", self.callback_url.as_str()),
                ("response_type", "code"),
                ("scope", "profile email"),
            ])
            .finish();
        format!("{AUTHORIZE_URL}?{query}")
    }

    async fn verify_code(&self, code: &str) -> anyhow::Result<VerifiedIdentity> {
        let response = self
            .http
            .post(TOKEN_URL)
            .form(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("redirect_uri", self.callback_url.as_str()),
            ])
            .send()
            .await
            .context("send token exchange request")?;

        if !response.status().is_success() {
            anyhow::bail!("token exchange failed (HTTP {})", response.status());
        }

        let token: TokenResponse = response.json().await.context("parse token response")?;

        let response = self
            .http
            .get(USERINFO_URL)
            .bearer_auth(&token.access_token)
            .send()
            .await
            .context("fetch userinfo")?;

        if !response.status().is_success() {
            anyhow::bail!("userinfo fetch failed (HTTP {})", response.status());
        }

        let info: UserInfo = response.json().await.context("parse userinfo")?;
        Ok(VerifiedIdentity {
            provider_id: info.id,
            email: info.email,
            display_name: info.name,
        })
    }
}
