use std::collections::HashMap;
use std::sync::RwLock;

use anyhow::anyhow;
use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use super::{StoreError, UserStore};
use crate::users::{NewUser, User};

/// In-memory user store. Serves local development when no `DATABASE_URL` is
/// configured and backs every test. Enforces the same uniqueness rules as the
/// Postgres schema: one user per email, one per non-null provider id.
#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<Uuid, User>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> anyhow::Result<std::sync::RwLockReadGuard<'_, HashMap<Uuid, User>>> {
        self.users.read().map_err(|_| anyhow!("user table lock poisoned"))
    }

    fn find<F>(&self, pred: F) -> anyhow::Result<Option<User>>
    where
        F: Fn(&User) -> bool,
    {
        Ok(self.read()?.values().find(|u| pred(u)).cloned())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        self.find(|u| u.email == email)
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        Ok(self.read()?.get(&id).cloned())
    }

    async fn find_by_phone(&self, phone: &str) -> anyhow::Result<Option<User>> {
        self.find(|u| u.credentials.phone() == Some(phone))
    }

    async fn find_by_provider_id(&self, provider_id: &str) -> anyhow::Result<Option<User>> {
        self.find(|u| u.credentials.provider_id() == Some(provider_id))
    }

    async fn find_by_reset_token(&self, token: &str) -> anyhow::Result<Option<User>> {
        self.find(|u| u.reset_secret.as_ref().map(|s| s.value.as_str()) == Some(token))
    }

    async fn create(&self, new: NewUser) -> Result<User, StoreError> {
        let mut users = self
            .users
            .write()
            .map_err(|_| StoreError::Backend(anyhow!("user table lock poisoned")))?;

        if users.values().any(|u| u.email == new.email) {
            return Err(StoreError::Duplicate("email"));
        }
        if let Some(pid) = new.credentials.provider_id() {
            if users.values().any(|u| u.credentials.provider_id() == Some(pid)) {
                return Err(StoreError::Duplicate("provider_id"));
            }
        }

        let user = User {
            id: Uuid::new_v4(),
            email: new.email,
            username: new.username,
            date_of_birth: new.date_of_birth,
            credentials: new.credentials,
            reset_secret: None,
            otp_secret: None,
            created_at: OffsetDateTime::now_utc(),
        };
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn save(&self, user: &User) -> anyhow::Result<()> {
        let mut users = self
            .users
            .write()
            .map_err(|_| anyhow!("user table lock poisoned"))?;
        users.insert(user.id, user.clone());
        Ok(())
    }
}
