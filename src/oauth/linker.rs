use std::sync::Arc;

use time::macros::date;
use tracing::{info, warn};

use super::provider::{IdentityProvider, VerifiedIdentity};
use crate::error::AuthError;
use crate::store::UserStore;
use crate::users::{AccountCredentials, NewUser, User};

/// Reconciles a verified external identity with the local user table. An
/// explicitly constructed instance holding its provider; no process-wide
/// registry.
pub struct FederatedLinker {
    provider: Arc<dyn IdentityProvider>,
}

impl FederatedLinker {
    pub fn new(provider: Arc<dyn IdentityProvider>) -> Self {
        Self { provider }
    }

    pub fn authorize_url(&self) -> String {
        self.provider.authorize_url()
    }

    /// Full callback leg: verify the authorization code with the provider,
    /// then link the resulting identity.
    pub async fn sign_in(&self, store: &dyn UserStore, code: &str) -> Result<User, AuthError> {
        let identity = self.provider.verify_code(code).await.map_err(|e| {
            warn!(error = %e, "provider verification failed");
            AuthError::Unauthenticated("Authentication failed.".into())
        })?;
        self.link(store, identity).await
    }

    /// Resolution order: existing provider link wins (idempotent repeat
    /// login), then merge onto an existing account with the same email,
    /// then create a federation-only account.
    pub async fn link(
        &self,
        store: &dyn UserStore,
        identity: VerifiedIdentity,
    ) -> Result<User, AuthError> {
        if let Some(user) = store.find_by_provider_id(&identity.provider_id).await? {
            return Ok(user);
        }

        let email = identity
            .email
            .as_deref()
            .map(|e| e.trim().to_lowercase())
            .filter(|e| !e.is_empty())
            .ok_or_else(|| {
                AuthError::Validation("Identity provider did not supply an email address.".into())
            })?;

        if let Some(mut user) = store.find_by_email(&email).await? {
            // unique index on provider_id means any link it carries belongs
            // to a different provider identity
            if user.credentials.provider_id().is_some() {
                return Err(AuthError::Conflict(
                    "Account is already linked to another identity.".into(),
                ));
            }
            user.credentials.link_provider(identity.provider_id);
            store.save(&user).await?;
            info!(user_id = %user.id, "provider identity linked to existing account");
            return Ok(user);
        }

        let username = identity
            .display_name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| email.split('@').next().unwrap_or_default().to_string());

        let user = store
            .create(NewUser {
                email,
                username,
                // provider profiles carry no date of birth
                date_of_birth: date!(1970 - 01 - 01),
                credentials: AccountCredentials::Federated {
                    provider_id: identity.provider_id,
                },
            })
            .await?;
        info!(user_id = %user.id, "federation-only account created");
        Ok(user)
    }
}
