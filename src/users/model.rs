use time::{Date, OffsetDateTime};
use uuid::Uuid;

/// A short-lived secret bound to a user: a password-reset token or an OTP
/// code. At most one live secret of each kind exists per user; issuing a new
/// one overwrites the old.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimedSecret {
    pub value: String,
    pub expires_at: OffsetDateTime,
}

impl TimedSecret {
    /// A secret is usable strictly before its expiry instant.
    pub fn is_live(&self, now: OffsetDateTime) -> bool {
        now < self.expires_at
    }
}

/// How an account can authenticate. Every user carries at least one path;
/// a record with neither a password hash nor a provider link cannot be built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountCredentials {
    /// Password signup: hash and phone are both required at registration.
    Local { password_hash: String, phone: String },
    /// Created by federated sign-in only; no password, no phone.
    Federated { provider_id: String },
    /// A password account that later linked a provider identity, or a
    /// federated account that later set a password (phone stays absent then).
    Linked {
        password_hash: String,
        phone: Option<String>,
        provider_id: String,
    },
}

impl AccountCredentials {
    pub fn password_hash(&self) -> Option<&str> {
        match self {
            Self::Local { password_hash, .. } | Self::Linked { password_hash, .. } => {
                Some(password_hash)
            }
            Self::Federated { .. } => None,
        }
    }

    pub fn phone(&self) -> Option<&str> {
        match self {
            Self::Local { phone, .. } => Some(phone),
            Self::Linked { phone, .. } => phone.as_deref(),
            Self::Federated { .. } => None,
        }
    }

    pub fn provider_id(&self) -> Option<&str> {
        match self {
            Self::Federated { provider_id } | Self::Linked { provider_id, .. } => {
                Some(provider_id)
            }
            Self::Local { .. } => None,
        }
    }

    /// Replaces the password hash, promoting a federation-only account to a
    /// linked one (it gains a password but still has no phone).
    pub fn set_password_hash(&mut self, hash: String) {
        *self = match std::mem::replace(self, Self::Federated { provider_id: String::new() }) {
            Self::Local { phone, .. } => Self::Local {
                password_hash: hash,
                phone,
            },
            Self::Linked {
                phone, provider_id, ..
            } => Self::Linked {
                password_hash: hash,
                phone,
                provider_id,
            },
            Self::Federated { provider_id } => Self::Linked {
                password_hash: hash,
                phone: None,
                provider_id,
            },
        };
    }

    /// One-time provider linkage for a password account. Accounts that
    /// already carry a provider id are left untouched.
    pub fn link_provider(&mut self, provider_id: String) {
        let current = std::mem::replace(self, Self::Federated { provider_id: String::new() });
        *self = match current {
            Self::Local {
                password_hash,
                phone,
            } => Self::Linked {
                password_hash,
                phone: Some(phone),
                provider_id,
            },
            other => other,
        };
    }
}

/// The single identity record all four authentication flows converge on.
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub date_of_birth: Date,
    pub credentials: AccountCredentials,
    pub reset_secret: Option<TimedSecret>,
    pub otp_secret: Option<TimedSecret>,
    pub created_at: OffsetDateTime,
}

/// Fields the caller supplies at creation; id and created_at come from the
/// store.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub username: String,
    pub date_of_birth: Date,
    pub credentials: AccountCredentials,
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    fn local() -> AccountCredentials {
        AccountCredentials::Local {
            password_hash: "$argon2id$fake".into(),
            phone: "+15551234567".into(),
        }
    }

    #[test]
    fn secret_is_live_strictly_before_expiry() {
        let now = OffsetDateTime::now_utc();
        let secret = TimedSecret {
            value: "abc".into(),
            expires_at: now,
        };
        assert!(!secret.is_live(now));
        assert!(secret.is_live(now - time::Duration::seconds(1)));
        assert!(!secret.is_live(now + time::Duration::seconds(1)));
    }

    #[test]
    fn linking_a_provider_keeps_password_and_phone() {
        let mut creds = local();
        creds.link_provider("google-1".into());
        assert_eq!(creds.provider_id(), Some("google-1"));
        assert_eq!(creds.phone(), Some("+15551234567"));
        assert!(creds.password_hash().is_some());
    }

    #[test]
    fn linking_is_one_time_only() {
        let mut creds = AccountCredentials::Linked {
            password_hash: "h".into(),
            phone: None,
            provider_id: "google-1".into(),
        };
        creds.link_provider("google-9".into());
        assert_eq!(creds.provider_id(), Some("google-1"));
    }

    #[test]
    fn setting_a_password_on_federated_account_links_it() {
        let mut creds = AccountCredentials::Federated {
            provider_id: "google-2".into(),
        };
        creds.set_password_hash("$argon2id$new".into());
        assert_eq!(creds.password_hash(), Some("$argon2id$new"));
        assert_eq!(creds.provider_id(), Some("google-2"));
        assert_eq!(creds.phone(), None);
    }

    #[test]
    fn every_variant_has_an_authentication_path() {
        let variants = [
            local(),
            AccountCredentials::Federated {
                provider_id: "p".into(),
            },
            AccountCredentials::Linked {
                password_hash: "h".into(),
                phone: None,
                provider_id: "p".into(),
            },
        ];
        for creds in variants {
            assert!(
                creds.password_hash().is_some() || creds.provider_id().is_some(),
                "variant {creds:?} has no way to authenticate"
            );
        }
    }

    #[test]
    fn date_of_birth_round_trips_through_model() {
        let user = User {
            id: Uuid::new_v4(),
            email: "a@x.com".into(),
            username: "alice".into(),
            date_of_birth: date!(2000 - 01 - 01),
            credentials: local(),
            reset_secret: None,
            otp_secret: None,
            created_at: OffsetDateTime::now_utc(),
        };
        assert_eq!(user.date_of_birth, date!(2000 - 01 - 01));
    }
}
