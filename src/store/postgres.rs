use anyhow::{bail, Context};
use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, FromRow, PgPool};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use super::{StoreError, UserStore};
use crate::users::{AccountCredentials, NewUser, TimedSecret, User};

const USER_COLUMNS: &str = "id, email, username, date_of_birth, password_hash, phone, \
     provider_id, reset_token, reset_expires, otp_code, otp_expires, created_at";

/// Postgres-backed user store.
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .context("connect to database")?;

        if let Err(e) = sqlx::migrate!("./migrations").run(&pool).await {
            tracing::warn!(error = %e, "migration failed; continuing");
        }

        Ok(Self { pool })
    }

    async fn fetch_one_by(&self, clause: &str, bind: &str) -> anyhow::Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {clause}");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(bind)
            .fetch_optional(&self.pool)
            .await?;
        row.map(UserRow::into_user).transpose()
    }
}

/// Flat row shape; folded into the tagged credential model after the fetch.
#[derive(Debug, FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    username: String,
    date_of_birth: Date,
    password_hash: Option<String>,
    phone: Option<String>,
    provider_id: Option<String>,
    reset_token: Option<String>,
    reset_expires: Option<OffsetDateTime>,
    otp_code: Option<String>,
    otp_expires: Option<OffsetDateTime>,
    created_at: OffsetDateTime,
}

impl UserRow {
    fn into_user(self) -> anyhow::Result<User> {
        let credentials = match (self.password_hash, self.provider_id) {
            (Some(password_hash), None) => AccountCredentials::Local {
                password_hash,
                phone: self.phone.unwrap_or_default(),
            },
            (None, Some(provider_id)) => AccountCredentials::Federated { provider_id },
            (Some(password_hash), Some(provider_id)) => AccountCredentials::Linked {
                password_hash,
                phone: self.phone,
                provider_id,
            },
            (None, None) => bail!("user {} has no authentication path", self.id),
        };
        Ok(User {
            id: self.id,
            email: self.email,
            username: self.username,
            date_of_birth: self.date_of_birth,
            credentials,
            reset_secret: zip_secret(self.reset_token, self.reset_expires),
            otp_secret: zip_secret(self.otp_code, self.otp_expires),
            created_at: self.created_at,
        })
    }
}

fn zip_secret(value: Option<String>, expires_at: Option<OffsetDateTime>) -> Option<TimedSecret> {
    match (value, expires_at) {
        (Some(value), Some(expires_at)) => Some(TimedSecret { value, expires_at }),
        _ => None,
    }
}

fn secret_parts(secret: &Option<TimedSecret>) -> (Option<&str>, Option<OffsetDateTime>) {
    match secret {
        Some(s) => (Some(s.value.as_str()), Some(s.expires_at)),
        None => (None, None),
    }
}

fn map_create_err(e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &e {
        if db.code().as_deref() == Some("23505") {
            let constraint = db.constraint().unwrap_or_default();
            if constraint.contains("provider") {
                return StoreError::Duplicate("provider_id");
            }
            return StoreError::Duplicate("email");
        }
    }
    StoreError::Backend(e.into())
}

#[async_trait]
impl UserStore for PgStore {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        self.fetch_one_by("email = $1", email).await
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(UserRow::into_user).transpose()
    }

    async fn find_by_phone(&self, phone: &str) -> anyhow::Result<Option<User>> {
        self.fetch_one_by("phone = $1", phone).await
    }

    async fn find_by_provider_id(&self, provider_id: &str) -> anyhow::Result<Option<User>> {
        self.fetch_one_by("provider_id = $1", provider_id).await
    }

    async fn find_by_reset_token(&self, token: &str) -> anyhow::Result<Option<User>> {
        self.fetch_one_by("reset_token = $1", token).await
    }

    async fn create(&self, new: NewUser) -> Result<User, StoreError> {
        let sql = format!(
            "INSERT INTO users (email, username, date_of_birth, password_hash, phone, provider_id) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {USER_COLUMNS}"
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(&new.email)
            .bind(&new.username)
            .bind(new.date_of_birth)
            .bind(new.credentials.password_hash())
            .bind(new.credentials.phone())
            .bind(new.credentials.provider_id())
            .fetch_one(&self.pool)
            .await
            .map_err(map_create_err)?;
        row.into_user().map_err(StoreError::Backend)
    }

    async fn save(&self, user: &User) -> anyhow::Result<()> {
        let (reset_token, reset_expires) = secret_parts(&user.reset_secret);
        let (otp_code, otp_expires) = secret_parts(&user.otp_secret);
        sqlx::query(
            "UPDATE users SET email = $2, username = $3, date_of_birth = $4, \
             password_hash = $5, phone = $6, provider_id = $7, \
             reset_token = $8, reset_expires = $9, otp_code = $10, otp_expires = $11 \
             WHERE id = $1",
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.username)
        .bind(user.date_of_birth)
        .bind(user.credentials.password_hash())
        .bind(user.credentials.phone())
        .bind(user.credentials.provider_id())
        .bind(reset_token)
        .bind(reset_expires)
        .bind(otp_code)
        .bind(otp_expires)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
