use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;

const DEFAULT_CONFIG_FILES: &[&str] = &[
    "clinic.toml",
    "config/clinic.toml",
    "crates/config/clinic.toml",
    "../clinic.toml",
    "../config/clinic.toml",
    "../crates/config/clinic.toml",
];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub http: HttpConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub appointments: AppointmentConfig,
    #[serde(default)]
    pub mail: MailConfig,
    #[serde(default)]
    pub uploads: UploadConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    pub address: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1".to_string(),
            port: 7070,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://clinic.db".to_string(),
            max_connections: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "AuthConfig::default_session_ttl")]
    pub session_ttl_seconds: u64,
    /// Lifetime of email-verification and password-reset tokens.
    #[serde(default = "AuthConfig::default_token_ttl")]
    pub token_ttl_seconds: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_ttl_seconds: Self::default_session_ttl(),
            token_ttl_seconds: Self::default_token_ttl(),
        }
    }
}

impl AuthConfig {
    fn default_session_ttl() -> u64 {
        86_400
    }

    fn default_token_ttl() -> u64 {
        3_600
    }
}

/// Appointment scheduling rules.
///
/// An appointment can change status only while its slot instant lies in the
/// future and strictly before `now + expires_at_seconds`.
///
/// ```
/// use clinic_config::AppointmentConfig;
///
/// let appointments = AppointmentConfig::default();
/// assert_eq!(appointments.expires_at_seconds, 30 * 24 * 60 * 60);
/// assert_eq!(appointments.utc_offset_minutes, 0);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentConfig {
    #[serde(default = "AppointmentConfig::default_expires_at")]
    pub expires_at_seconds: i64,
    /// Fixed offset of the clinic's wall clock, used to turn a date and a
    /// slot time into an instant.
    #[serde(default)]
    pub utc_offset_minutes: i32,
}

impl AppointmentConfig {
    const fn default_expires_at() -> i64 {
        30 * 24 * 60 * 60
    }
}

impl Default for AppointmentConfig {
    fn default() -> Self {
        Self {
            expires_at_seconds: Self::default_expires_at(),
            utc_offset_minutes: 0,
        }
    }
}

/// Outbound mail settings. Without a `relay_url` messages are only logged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailConfig {
    #[serde(default = "MailConfig::default_from_address")]
    pub from_address: String,
    /// Base URL used to build verification and reset links.
    #[serde(default = "MailConfig::default_app_url")]
    pub app_url: String,
    #[serde(default)]
    pub relay_url: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "MailConfig::default_request_timeout")]
    pub request_timeout_seconds: u64,
}

impl MailConfig {
    fn default_from_address() -> String {
        "Clinic Portal <no-reply@clinic.local>".to_string()
    }

    fn default_app_url() -> String {
        "http://localhost:3000".to_string()
    }

    const fn default_request_timeout() -> u64 {
        10
    }
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            from_address: Self::default_from_address(),
            app_url: Self::default_app_url(),
            relay_url: None,
            api_key: None,
            request_timeout_seconds: Self::default_request_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    #[serde(default = "UploadConfig::default_directory")]
    pub directory: String,
    #[serde(default = "UploadConfig::default_max_file_bytes")]
    pub max_file_bytes: u64,
}

impl UploadConfig {
    fn default_directory() -> String {
        "uploads".to_string()
    }

    const fn default_max_file_bytes() -> u64 {
        5 * 1024 * 1024
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            directory: Self::default_directory(),
            max_file_bytes: Self::default_max_file_bytes(),
        }
    }
}

fn clamp_to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// Load the application configuration by combining defaults, files, and environment overrides.
///
/// ```
/// use clinic_config::load;
///
/// std::env::remove_var("CLINIC_CONFIG");
///
/// let config = load().expect("configuration should load with defaults");
/// assert!(!config.http.address.is_empty());
/// ```
pub fn load() -> anyhow::Result<AppConfig> {
    let defaults = AppConfig::default();

    let builder = config::Config::builder()
        .set_default("http.address", defaults.http.address.clone())?
        .set_default("http.port", i64::from(defaults.http.port))?
        .set_default("database.url", defaults.database.url.clone())?
        .set_default(
            "database.max_connections",
            i64::from(defaults.database.max_connections),
        )?
        .set_default(
            "auth.session_ttl_seconds",
            clamp_to_i64(defaults.auth.session_ttl_seconds),
        )?
        .set_default(
            "auth.token_ttl_seconds",
            clamp_to_i64(defaults.auth.token_ttl_seconds),
        )?
        .set_default(
            "appointments.expires_at_seconds",
            defaults.appointments.expires_at_seconds,
        )?
        .set_default(
            "appointments.utc_offset_minutes",
            i64::from(defaults.appointments.utc_offset_minutes),
        )?
        .set_default("mail.from_address", defaults.mail.from_address.clone())?
        .set_default("mail.app_url", defaults.mail.app_url.clone())?
        .set_default(
            "mail.request_timeout_seconds",
            clamp_to_i64(defaults.mail.request_timeout_seconds),
        )?
        .set_default("uploads.directory", defaults.uploads.directory.clone())?
        .set_default(
            "uploads.max_file_bytes",
            clamp_to_i64(defaults.uploads.max_file_bytes),
        )?;

    let environment_overrides = config::Environment::with_prefix("CLINIC").separator("__");

    let mut builder = builder;
    let mut config_file_attached = false;

    if let Ok(path) = std::env::var("CLINIC_CONFIG") {
        builder = builder.add_source(config::File::from(PathBuf::from(&path)));
        config_file_attached = true;
        debug!(path, "loading configuration via CLINIC_CONFIG");
    } else if let Ok(cwd) = std::env::current_dir() {
        let fallback = DEFAULT_CONFIG_FILES
            .iter()
            .map(|candidate| cwd.join(candidate))
            .find(|path| path.exists());

        if let Some(path) = fallback {
            debug!(path = %path.display(), "loading configuration file");
            builder = builder.add_source(config::File::from(path));
            config_file_attached = true;
        }
    }

    if !config_file_attached {
        debug!("no configuration file found, relying on defaults and environment overrides");
    }

    builder = builder.add_source(environment_overrides);

    let cfg = builder.build().context("unable to build configuration")?;

    let mut config = cfg
        .try_deserialize::<AppConfig>()
        .context("invalid configuration")?;

    if config.auth.session_ttl_seconds > i64::MAX as u64 {
        config.auth.session_ttl_seconds = i64::MAX as u64;
    }
    if config.auth.token_ttl_seconds > i64::MAX as u64 {
        config.auth.token_ttl_seconds = i64::MAX as u64;
    }

    debug!(?config, "loaded backend configuration");
    Ok(config)
}
