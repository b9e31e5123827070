use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::users::{NewUser, User};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Failure modes of the identity store. Uniqueness rejection at `create` is
/// the only concurrency-safety mechanism in the system: when two callers race
/// on the same email or provider id, the loser gets `Duplicate`.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("duplicate {0}")]
    Duplicate(&'static str),
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// The durable keyed store that owns the user records. Lookups report an
/// absent row as `Ok(None)`, never as an error; `save` is last-writer-wins.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>>;
    async fn find_by_phone(&self, phone: &str) -> anyhow::Result<Option<User>>;
    async fn find_by_provider_id(&self, provider_id: &str) -> anyhow::Result<Option<User>>;
    /// Lookup by the reset secret value itself; the reset flow holds no other
    /// key for the user.
    async fn find_by_reset_token(&self, token: &str) -> anyhow::Result<Option<User>>;
    async fn create(&self, new: NewUser) -> Result<User, StoreError>;
    async fn save(&self, user: &User) -> anyhow::Result<()>;
}
