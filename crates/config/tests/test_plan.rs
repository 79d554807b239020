//! Test plan for the `clinic-config` crate.
//!
//! These tests exercise the configuration loader across default handling,
//! file discovery, environment overrides, and validation behaviour.

use std::fs;
use std::path::{Path, PathBuf};

use serial_test::serial;
use tempfile::TempDir;

use clinic_config::{
    load, AppConfig, AppointmentConfig, AuthConfig, HttpConfig, MailConfig, UploadConfig,
};

const ENV_VARS_TO_RESET: &[&str] = &[
    "CLINIC_CONFIG",
    "CLINIC__APPOINTMENTS__EXPIRES_AT_SECONDS",
    "CLINIC__APPOINTMENTS__UTC_OFFSET_MINUTES",
    "CLINIC__AUTH__SESSION_TTL_SECONDS",
    "CLINIC__AUTH__TOKEN_TTL_SECONDS",
    "CLINIC__DATABASE__MAX_CONNECTIONS",
    "CLINIC__DATABASE__URL",
    "CLINIC__HTTP__ADDRESS",
    "CLINIC__HTTP__PORT",
    "CLINIC__MAIL__API_KEY",
    "CLINIC__MAIL__APP_URL",
    "CLINIC__MAIL__FROM_ADDRESS",
    "CLINIC__MAIL__RELAY_URL",
    "CLINIC__UPLOADS__DIRECTORY",
    "CLINIC__UPLOADS__MAX_FILE_BYTES",
];

struct TestContext {
    vars: Vec<(String, Option<String>)>,
    original_dir: Option<PathBuf>,
}

impl TestContext {
    fn new() -> Self {
        Self {
            vars: Vec::new(),
            original_dir: None,
        }
    }

    fn reset_environment(&mut self) {
        for key in ENV_VARS_TO_RESET {
            self.remove_var(key);
        }
    }

    fn set_var(&mut self, key: &str, value: impl AsRef<str>) {
        let previous = std::env::var(key).ok();
        std::env::set_var(key, value.as_ref());
        self.vars.push((key.to_string(), previous));
    }

    fn remove_var(&mut self, key: &str) {
        let previous = std::env::var(key).ok();
        std::env::remove_var(key);
        self.vars.push((key.to_string(), previous));
    }

    fn set_current_dir(&mut self, dir: &Path) {
        if self.original_dir.is_none() {
            self.original_dir =
                Some(std::env::current_dir().expect("failed to capture current directory"));
        }
        std::env::set_current_dir(dir).expect("failed to set current directory");
    }
}

impl Drop for TestContext {
    fn drop(&mut self) {
        if let Some(original) = self.original_dir.take() {
            let _ = std::env::set_current_dir(original);
        }

        while let Some((key, value)) = self.vars.pop() {
            match value {
                Some(val) => std::env::set_var(&key, val),
                None => std::env::remove_var(&key),
            }
        }
    }
}

fn write_config_file(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("failed to create config directories");
    }
    fs::write(path, contents).expect("failed to write config file");
}

#[test]
#[serial]
fn load_uses_default_values_when_no_files_found() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let mut ctx = TestContext::new();
    ctx.reset_environment();
    ctx.set_current_dir(temp_dir.path());

    let config = load().expect("configuration load should succeed without files");
    let defaults = AppConfig::default();

    assert_eq!(config.http.address, defaults.http.address);
    assert_eq!(config.http.port, defaults.http.port);
    assert_eq!(config.database.url, defaults.database.url);
    assert_eq!(
        config.database.max_connections,
        defaults.database.max_connections
    );
    assert_eq!(config.auth.session_ttl_seconds, defaults.auth.session_ttl_seconds);
    assert_eq!(config.auth.token_ttl_seconds, defaults.auth.token_ttl_seconds);
    assert_eq!(
        config.appointments.expires_at_seconds,
        defaults.appointments.expires_at_seconds
    );
    assert_eq!(config.mail.app_url, defaults.mail.app_url);
    assert!(config.mail.relay_url.is_none());
    assert_eq!(config.uploads.directory, defaults.uploads.directory);
}

#[test]
#[serial]
fn load_picks_first_available_file_in_search_order() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let mut ctx = TestContext::new();
    ctx.reset_environment();
    ctx.set_current_dir(temp_dir.path());

    write_config_file(
        temp_dir.path(),
        "clinic.toml",
        r#"
        [http]
        port = 4242
        "#,
    );
    write_config_file(
        temp_dir.path(),
        "config/clinic.toml",
        r#"
        [http]
        port = 5151
        "#,
    );

    let config = load().expect("configuration load should pick the first file");
    assert_eq!(config.http.port, 4242);
}

#[test]
#[serial]
fn load_merges_partial_file_with_defaults() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let mut ctx = TestContext::new();
    ctx.reset_environment();
    ctx.set_current_dir(temp_dir.path());

    write_config_file(
        temp_dir.path(),
        "clinic.toml",
        r#"
        [appointments]
        expires_at_seconds = 7200

        [database]
        max_connections = 50
        "#,
    );

    let config = load().expect("configuration load should succeed");
    let defaults = AppConfig::default();

    assert_eq!(config.appointments.expires_at_seconds, 7200);
    assert_eq!(
        config.appointments.utc_offset_minutes,
        defaults.appointments.utc_offset_minutes
    );
    assert_eq!(config.database.max_connections, 50);
    assert_eq!(config.database.url, defaults.database.url);
    assert_eq!(config.http.port, defaults.http.port);
}

#[test]
#[serial]
fn load_reads_explicit_config_path() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let mut ctx = TestContext::new();
    ctx.reset_environment();
    ctx.set_current_dir(temp_dir.path());

    write_config_file(
        temp_dir.path(),
        "elsewhere/custom.toml",
        r#"
        [uploads]
        directory = "/var/lib/clinic/uploads"
        "#,
    );
    let path = temp_dir.path().join("elsewhere/custom.toml");
    ctx.set_var("CLINIC_CONFIG", path.display().to_string());

    let config = load().expect("configuration load should use CLINIC_CONFIG");
    assert_eq!(config.uploads.directory, "/var/lib/clinic/uploads");
}

#[test]
#[serial]
fn load_applies_environment_overrides() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let mut ctx = TestContext::new();
    ctx.reset_environment();
    ctx.set_current_dir(temp_dir.path());

    write_config_file(
        temp_dir.path(),
        "clinic.toml",
        r#"
        [http]
        port = 3030
        "#,
    );

    ctx.set_var("CLINIC__HTTP__PORT", "8080");
    ctx.set_var("CLINIC__MAIL__RELAY_URL", "https://relay.example.com/send");

    let config = load().expect("configuration load should honour env overrides");
    assert_eq!(config.http.port, 8080);
    assert_eq!(
        config.mail.relay_url.as_deref(),
        Some("https://relay.example.com/send")
    );
}

#[test]
#[serial]
fn load_supports_database_url_environment_variable() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let mut ctx = TestContext::new();
    ctx.reset_environment();
    ctx.set_current_dir(temp_dir.path());

    let url = "sqlite:///var/lib/clinic/clinic.db";
    ctx.set_var("CLINIC__DATABASE__URL", url);

    let config = load().expect("configuration load should read database env override");
    assert_eq!(config.database.url, url);
}

#[test]
#[serial]
fn load_errors_on_invalid_toml_contents() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let mut ctx = TestContext::new();
    ctx.reset_environment();
    ctx.set_current_dir(temp_dir.path());

    write_config_file(
        temp_dir.path(),
        "clinic.toml",
        r#"
        [http]
        port = "not-a-number
        "#,
    );

    let error = load().expect_err("invalid TOML should cause load to fail");
    let message = error.to_string();
    assert!(
        message.contains("invalid configuration") || message.contains("unable to build configuration"),
        "unexpected error message: {message}"
    );
}

#[test]
fn auth_config_defaults_cover_sessions_and_tokens() {
    let defaults = AuthConfig::default();
    assert_eq!(defaults.session_ttl_seconds, 86_400);
    assert_eq!(defaults.token_ttl_seconds, 3_600);
}

#[test]
fn appointment_config_defaults_to_thirty_day_window() {
    let defaults = AppointmentConfig::default();
    assert_eq!(defaults.expires_at_seconds, 2_592_000);
}

#[test]
fn mail_and_upload_defaults_are_local() {
    let mail = MailConfig::default();
    assert!(mail.relay_url.is_none());
    assert!(mail.api_key.is_none());
    assert_eq!(mail.request_timeout_seconds, 10);

    let uploads = UploadConfig::default();
    assert_eq!(uploads.directory, "uploads");
    assert_eq!(uploads.max_file_bytes, 5 * 1024 * 1024);
}

#[test]
fn http_config_defaults_match_expected_host_and_port() {
    let defaults = HttpConfig::default();
    assert_eq!(defaults.address, "127.0.0.1");
    assert_eq!(defaults.port, 7070);
}
