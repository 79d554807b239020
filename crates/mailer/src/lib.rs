use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use clinic_config::MailConfig;

pub mod templates;
pub mod test_support;

pub use templates::AppointmentNotice;

#[derive(Debug, Error)]
pub enum MailerError {
    #[error("mail relay request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid mail configuration: {0}")]
    InvalidConfig(String),
    #[error("mail transport unavailable: {0}")]
    Unavailable(String),
}

/// A rendered plain-text message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub text: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: Email) -> Result<(), MailerError>;

    fn transport(&self) -> &'static str;
}

/// Writes messages to the log instead of delivering them.
#[derive(Debug, Clone)]
pub struct LogMailer {
    from: String,
}

impl LogMailer {
    pub fn new(from: impl Into<String>) -> Self {
        Self { from: from.into() }
    }
}

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: Email) -> Result<(), MailerError> {
        info!(
            from = %self.from,
            to = %email.to,
            subject = %email.subject,
            body = %email.text,
            "email logged"
        );
        Ok(())
    }

    fn transport(&self) -> &'static str {
        "log"
    }
}

#[derive(Debug, Serialize)]
struct RelayMessage<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    text: &'a str,
}

/// Posts messages as JSON to an HTTP mail relay.
#[derive(Debug, Clone)]
pub struct HttpMailer {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    from: String,
}

impl HttpMailer {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: Option<String>,
        from: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, MailerError> {
        let endpoint = endpoint.into();
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            return Err(MailerError::InvalidConfig(format!(
                "relay url must be http(s): {endpoint}"
            )));
        }

        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            endpoint,
            api_key,
            from: from.into(),
        })
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, email: Email) -> Result<(), MailerError> {
        let message = RelayMessage {
            from: &self.from,
            to: &email.to,
            subject: &email.subject,
            text: &email.text,
        };

        let mut request = self.client.post(&self.endpoint).json(&message);
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        request.send().await?.error_for_status()?;
        debug!(to = %email.to, subject = %email.subject, "email relayed");
        Ok(())
    }

    fn transport(&self) -> &'static str {
        "http"
    }
}

/// Pick the transport the configuration asks for.
pub fn build_mailer(config: &MailConfig) -> Result<Arc<dyn Mailer>, MailerError> {
    let mailer: Arc<dyn Mailer> = match &config.relay_url {
        Some(url) => Arc::new(HttpMailer::new(
            url.clone(),
            config.api_key.clone(),
            config.from_address.clone(),
            Duration::from_secs(config.request_timeout_seconds),
        )?),
        None => Arc::new(LogMailer::new(config.from_address.clone())),
    };

    info!(transport = mailer.transport(), "mailer initialised");
    Ok(mailer)
}
