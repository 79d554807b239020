//! Integration tests for the mailer crate.

use std::time::Duration;

use clinic_config::MailConfig;
use clinic_mailer::{
    build_mailer, test_support::RecordingMailer, Email, HttpMailer, Mailer, MailerError,
};
use httpmock::prelude::*;
use serde_json::json;

fn email() -> Email {
    Email {
        to: "ada@example.com".into(),
        subject: "Appointment confirmed".into(),
        text: "See you soon".into(),
    }
}

#[tokio::test]
async fn http_mailer_posts_json_with_bearer_key() {
    let server = MockServer::start_async().await;

    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/messages")
                .header("authorization", "Bearer relay-key")
                .json_body(json!({
                    "from": "Clinic <no-reply@clinic.test>",
                    "to": "ada@example.com",
                    "subject": "Appointment confirmed",
                    "text": "See you soon"
                }));
            then.status(202);
        })
        .await;

    let mailer = HttpMailer::new(
        server.url("/messages"),
        Some("relay-key".into()),
        "Clinic <no-reply@clinic.test>",
        Duration::from_secs(2),
    )
    .expect("mailer builds");

    mailer.send(email()).await.expect("relay accepts message");
    mock.assert_async().await;
}

#[tokio::test]
async fn http_mailer_surfaces_relay_errors() {
    let server = MockServer::start_async().await;

    let _mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/messages");
            then.status(503);
        })
        .await;

    let mailer = HttpMailer::new(
        server.url("/messages"),
        None,
        "Clinic <no-reply@clinic.test>",
        Duration::from_secs(2),
    )
    .expect("mailer builds");

    let err = mailer.send(email()).await.expect_err("relay failure expected");
    assert!(matches!(err, MailerError::Http(_)));
}

#[test]
fn http_mailer_rejects_non_http_urls() {
    let err = HttpMailer::new("smtp://mail.test", None, "x", Duration::from_secs(1))
        .expect_err("invalid url expected");
    assert!(matches!(err, MailerError::InvalidConfig(_)));
}

#[test]
fn build_mailer_picks_transport_from_config() {
    let config = MailConfig::default();
    assert_eq!(build_mailer(&config).unwrap().transport(), "log");

    let config = MailConfig {
        relay_url: Some("https://relay.test/send".into()),
        ..MailConfig::default()
    };
    assert_eq!(build_mailer(&config).unwrap().transport(), "http");
}

#[tokio::test]
async fn recording_mailer_records_and_fails_on_demand() {
    let mailer = RecordingMailer::new();

    mailer.send(email()).await.unwrap();
    assert_eq!(mailer.sent_to("ada@example.com").len(), 1);

    mailer.set_failing(true);
    assert!(mailer.send(email()).await.is_err());
    assert_eq!(mailer.sent().len(), 1);

    mailer.clear();
    assert!(mailer.sent().is_empty());
}
