//! Service wiring: directory selection and the authenticator.

use std::sync::Arc;

use autohub_auth::{Authenticator, Hs256TokenCodec, StoreError, TokenError, TokenSecret};
use autohub_infra::{AppConfig, Directory, InMemoryDirectory, PostgresDirectory};

pub struct AppServices {
    pub app_name: String,
    pub directory: Arc<dyn Directory>,
    pub authenticator: Authenticator<dyn Directory>,
}

impl AppServices {
    pub fn new(config: &AppConfig, directory: Arc<dyn Directory>) -> Result<Self, TokenError> {
        let secret = TokenSecret::new(config.jwt_secret.clone())?;
        let codec = Arc::new(Hs256TokenCodec::new(&secret));
        let authenticator = Authenticator::new(Arc::clone(&directory), codec, config.token_ttl);

        Ok(Self {
            app_name: config.app_name.clone(),
            directory,
            authenticator,
        })
    }
}

/// Postgres when `DATABASE_URL` is configured, in-memory otherwise.
pub async fn build_directory(config: &AppConfig) -> Result<Arc<dyn Directory>, StoreError> {
    match config.database_url.as_deref() {
        Some(url) => {
            tracing::info!("using postgres directory");
            Ok(Arc::new(PostgresDirectory::connect(url).await?))
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using in-memory directory (data is lost on restart)");
            Ok(Arc::new(InMemoryDirectory::new()))
        }
    }
}
