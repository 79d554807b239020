use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clinic_auth::Authenticator;
use clinic_backend_api::{AppState, FileStore, LocalFileStore};
use clinic_config::AppConfig;
use clinic_database::initialize_database;
use clinic_mailer::{build_mailer, Mailer};
use sqlx::SqlitePool;
use tokio::task::JoinHandle;
use tracing::{info, warn};

pub mod telemetry {
    use anyhow::Result;
    use tracing::Level;
    use tracing_subscriber::{fmt::SubscriberBuilder, EnvFilter};

    pub fn init_tracing() -> Result<()> {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        let subscriber = SubscriberBuilder::default()
            .with_max_level(Level::DEBUG)
            .with_env_filter(env_filter)
            .finish();

        tracing::subscriber::set_global_default(subscriber)
            .map_err(|error| anyhow::anyhow!("failed to set tracing subscriber: {error}"))
    }
}

/// Everything the HTTP layer and the CLI commands share.
#[derive(Clone)]
pub struct BackendServices {
    pub db_pool: SqlitePool,
    pub authenticator: Authenticator,
    pub mailer: Arc<dyn Mailer>,
    pub files: Arc<dyn FileStore>,
}

impl BackendServices {
    pub async fn initialise(config: &AppConfig) -> Result<Self> {
        let db_pool = initialize_database(&config.database)
            .await
            .context("failed to initialise database")?;

        let authenticator = Authenticator::new(db_pool.clone(), config.auth.clone());
        let mailer = build_mailer(&config.mail).context("failed to build mailer")?;

        let uploads = LocalFileStore::new(&config.uploads.directory);
        info!(directory = %uploads.root().display(), "upload store ready");
        let files: Arc<dyn FileStore> = Arc::new(uploads);

        Ok(Self {
            db_pool,
            authenticator,
            mailer,
            files,
        })
    }

    pub fn app_state(&self, config: &AppConfig) -> AppState {
        AppState::new(
            self.db_pool.clone(),
            self.authenticator.clone(),
            self.mailer.clone(),
            self.files.clone(),
            config.clone(),
        )
    }
}

impl BackendServices {
    /// Delete expired sessions and tokens now and then every `period`,
    /// until the returned task is aborted.
    pub fn spawn_expiry_purge(&self, period: Duration) -> JoinHandle<()> {
        let authenticator = self.authenticator.clone();
        let period = period.max(Duration::from_secs(1));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                match authenticator.purge_expired().await {
                    Ok(0) => {}
                    Ok(removed) => info!(removed, "purged expired sessions and tokens"),
                    Err(error) => warn!(?error, "failed to purge expired sessions and tokens"),
                }
            }
        })
    }
}

pub async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::warn!(?error, "failed to listen for shutdown signal");
    }
    info!("shutdown signal received");
}
