use std::sync::Arc;

use tracing::info;

use crate::config::AppConfig;
use crate::delivery::{LogMailer, LogSms, Mailer, SmsSender};
use crate::oauth::linker::FederatedLinker;
use crate::oauth::provider::GoogleProvider;
use crate::store::{MemoryStore, PgStore, UserStore};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn UserStore>,
    pub config: Arc<AppConfig>,
    pub mailer: Arc<dyn Mailer>,
    pub sms: Arc<dyn SmsSender>,
    pub linker: Arc<FederatedLinker>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let store: Arc<dyn UserStore> = match &config.database_url {
            Some(url) => Arc::new(PgStore::connect(url).await?),
            None => {
                info!("DATABASE_URL not set; using the in-memory user store");
                Arc::new(MemoryStore::new())
            }
        };

        let linker = Arc::new(FederatedLinker::new(Arc::new(GoogleProvider::new(
            &config.google,
        ))));

        Ok(Self {
            store,
            config,
            mailer: Arc::new(LogMailer),
            sms: Arc::new(LogSms),
            linker,
        })
    }

    pub fn from_parts(
        store: Arc<dyn UserStore>,
        config: Arc<AppConfig>,
        mailer: Arc<dyn Mailer>,
        sms: Arc<dyn SmsSender>,
        linker: Arc<FederatedLinker>,
    ) -> Self {
        Self {
            store,
            config,
            mailer,
            sms,
            linker,
        }
    }

    pub fn fake() -> Self {
        use crate::config::{GoogleConfig, SessionConfig};

        let config = Arc::new(AppConfig {
            database_url: None,
            frontend_url: "http://frontend.local".into(),
            secure_cookies: false,
            session: SessionConfig {
                secret: "test-secret".into(),
                issuer: "test-issuer".into(),
                audience: "test-aud".into(),
                ttl_days: 7,
            },
            google: GoogleConfig {
                client_id: "test-client".into(),
                client_secret: "test-client-secret".into(),
                callback_url: "http://localhost:8080/auth/oauth/callback".into(),
            },
        });

        let linker = Arc::new(FederatedLinker::new(Arc::new(GoogleProvider::new(
            &config.google,
        ))));

        Self {
            store: Arc::new(MemoryStore::new()),
            config,
            mailer: Arc::new(LogMailer),
            sms: Arc::new(LogSms),
            linker,
        }
    }
}
