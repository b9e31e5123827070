use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_days: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GoogleConfig {
    pub client_id: String,
    pub client_secret: String,
    pub callback_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Unset means the in-memory store; set means Postgres.
    pub database_url: Option<String>,
    pub frontend_url: String,
    /// `Secure` cookie flag, tied to the deployment environment.
    pub secure_cookies: bool,
    pub session: SessionConfig,
    pub google: GoogleConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let session = SessionConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "gatehouse".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "gatehouse-users".into()),
            ttl_days: std::env::var("SESSION_TTL_DAYS")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(7),
        };
        let google = GoogleConfig {
            client_id: std::env::var("GOOGLE_CLIENT_ID").unwrap_or_default(),
            client_secret: std::env::var("GOOGLE_CLIENT_SECRET").unwrap_or_default(),
            callback_url: std::env::var("GOOGLE_CALLBACK_URL").unwrap_or_default(),
        };
        Ok(Self {
            database_url: std::env::var("DATABASE_URL").ok(),
            frontend_url: std::env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".into()),
            secure_cookies: std::env::var("APP_ENV")
                .map(|v| v == "production")
                .unwrap_or(false),
            session,
            google,
        })
    }
}
