use std::sync::Arc;

use clinic_auth::{AuthSession, Authenticator, User};
use clinic_config::AppConfig;
use clinic_mailer::Mailer;
use sqlx::SqlitePool;

use crate::services::{access::Caller, files::FileStore};
use crate::ApiError;

#[derive(Clone)]
pub struct AppState {
    pool: SqlitePool,
    authenticator: Authenticator,
    mailer: Arc<dyn Mailer>,
    files: Arc<dyn FileStore>,
    config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(
        pool: SqlitePool,
        authenticator: Authenticator,
        mailer: Arc<dyn Mailer>,
        files: Arc<dyn FileStore>,
        config: AppConfig,
    ) -> Self {
        Self {
            pool,
            authenticator,
            mailer,
            files,
            config: Arc::new(config),
        }
    }

    pub fn db_pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn authenticator(&self) -> &Authenticator {
        &self.authenticator
    }

    pub fn mailer(&self) -> &dyn Mailer {
        self.mailer.as_ref()
    }

    pub fn files(&self) -> &dyn FileStore {
        self.files.as_ref()
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub async fn authenticate(&self, token: &str) -> Result<(User, AuthSession), ApiError> {
        self.authenticator
            .authenticate_token(token)
            .await
            .map_err(ApiError::from)
    }

    /// Authenticate `token` and load the caller's roles and permissions.
    pub async fn caller(&self, token: &str) -> Result<Caller, ApiError> {
        let (user, _) = self.authenticate(token).await?;
        Caller::load(&self.pool, user.id)
            .await
            .map_err(ApiError::from)
    }
}
