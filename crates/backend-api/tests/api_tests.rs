use std::io;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{
        header::{
            ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_REQUEST_HEADERS,
            ACCESS_CONTROL_REQUEST_METHOD, AUTHORIZATION, CONTENT_TYPE, ORIGIN,
        },
        Method, Request, StatusCode,
    },
    Router,
};
use chrono::{Duration, Utc};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};
use tempfile::TempDir;
use tower::ServiceExt;

use clinic_auth::{hash_password, Authenticator};
use clinic_backend_api::{build_router, AppState, FileStore, LocalFileStore};
use clinic_config::AppConfig;
use clinic_database::{NewUser, UserRepository};
use clinic_mailer::test_support::RecordingMailer;

type TestResult<T = ()> = anyhow::Result<T>;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations");

const PASSWORD: &str = "secret123";

/// Local store that also remembers every removal it performed.
struct RecordingFileStore {
    inner: LocalFileStore,
    removed: Mutex<Vec<String>>,
}

impl RecordingFileStore {
    fn removed(&self) -> Vec<String> {
        self.removed
            .lock()
            .map(|removed| removed.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl FileStore for RecordingFileStore {
    async fn save(&self, folder: &str, extension: &str, bytes: &[u8]) -> io::Result<String> {
        self.inner.save(folder, extension, bytes).await
    }

    async fn remove(&self, path: &str) -> io::Result<()> {
        self.removed.lock().unwrap().push(path.to_string());
        self.inner.remove(path).await
    }
}

struct TestContext {
    temp_dir: TempDir,
    pool: SqlitePool,
    state: AppState,
    mailer: Arc<RecordingMailer>,
    files: Arc<RecordingFileStore>,
}

impl TestContext {
    async fn new() -> TestResult<Self> {
        Self::with_config(AppConfig::default()).await
    }

    async fn with_config(mut config: AppConfig) -> TestResult<Self> {
        let temp_dir = TempDir::new()?;
        let db_path = temp_dir.path().join("backend_api.sqlite");
        let db_url = format!("sqlite://{}", db_path.display());

        let options = SqliteConnectOptions::from_str(&db_url)?
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;
        MIGRATOR.run(&pool).await?;

        let uploads = temp_dir.path().join("uploads");
        config.uploads.directory = uploads.display().to_string();
        config.uploads.max_file_bytes = 1024;

        let mailer = Arc::new(RecordingMailer::new());
        let files = Arc::new(RecordingFileStore {
            inner: LocalFileStore::new(uploads),
            removed: Mutex::new(Vec::new()),
        });
        let authenticator = Authenticator::new(pool.clone(), config.auth.clone());
        let state = AppState::new(
            pool.clone(),
            authenticator,
            mailer.clone(),
            files.clone(),
            config,
        );

        Ok(Self {
            temp_dir,
            pool,
            state,
            mailer,
            files,
        })
    }

    fn router(&self) -> Router {
        build_router(self.state.clone())
    }

    /// Insert a verified account and return its public id.
    async fn create_user(&self, name: &str, email: &str, roles: &[&str]) -> TestResult<String> {
        let user = UserRepository::new(self.pool.clone())
            .create(
                &NewUser {
                    name: name.to_string(),
                    email: email.to_string(),
                    password_hash: Some(hash_password(PASSWORD)?),
                    phone: None,
                    verified: true,
                },
                roles,
            )
            .await?;
        Ok(user.public_id)
    }

    async fn login(&self, email: &str) -> TestResult<String> {
        let (status, body) = self
            .send(
                Method::POST,
                "/api/auth/login",
                None,
                Some(json!({ "email": email, "password": PASSWORD })),
            )
            .await?;
        assert_eq!(status, StatusCode::OK, "login failed: {body}");
        Ok(body["session"]["token"]
            .as_str()
            .unwrap_or_default()
            .to_string())
    }

    async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResult<(StatusCode, Value)> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&body)?))?,
            None => builder.body(Body::empty())?,
        };
        self.dispatch(request).await
    }

    async fn upload(
        &self,
        uri: &str,
        token: &str,
        content_type: &str,
        bytes: &[u8],
    ) -> TestResult<(StatusCode, Value)> {
        let boundary = "clinic-test-boundary";
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"image\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .header(
                CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))?;
        self.dispatch(request).await
    }

    async fn dispatch(&self, request: Request<Body>) -> TestResult<(StatusCode, Value)> {
        let response = self.router().oneshot(request).await?;
        let status = response.status();
        let bytes = response.into_body().collect().await?.to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)?
        };
        Ok((status, body))
    }

    /// A doctor offering one 09:00 slot, and a patient. Returns their tokens and ids.
    async fn doctor_and_patient(&self) -> TestResult<Booking> {
        let doctor_id = self
            .create_user("Gregory House", "house@example.com", &["doctor"])
            .await?;
        self.create_user("Pat Patient", "pat@example.com", &["patient"])
            .await?;
        let doctor = self.login("house@example.com").await?;
        let patient = self.login("pat@example.com").await?;

        let (status, body) = self
            .send(
                Method::PUT,
                &format!("/api/doctors/{doctor_id}/time-slots"),
                Some(&doctor),
                Some(json!({ "slots": [{ "time": "09:00", "duration_minutes": 30 }] })),
            )
            .await?;
        assert_eq!(status, StatusCode::OK, "slots not stored: {body}");
        let slot_id = body["time_slots"][0]["public_id"]
            .as_str()
            .unwrap_or_default()
            .to_string();

        Ok(Booking {
            doctor,
            patient,
            doctor_id,
            slot_id,
        })
    }
}

struct Booking {
    doctor: String,
    patient: String,
    doctor_id: String,
    slot_id: String,
}

impl Booking {
    fn request(&self, days_ahead: i64) -> Value {
        let date = (Utc::now() + Duration::days(days_ahead))
            .format("%Y-%m-%d")
            .to_string();
        json!({
            "doctor_id": self.doctor_id,
            "date": date,
            "time_slot_id": self.slot_id,
            "note": "Recurring headaches"
        })
    }
}

fn token_from(text: &str) -> String {
    text.split("token=")
        .nth(1)
        .and_then(|rest| rest.split_whitespace().next())
        .unwrap_or_default()
        .to_string()
}

mod router_tests {
    use super::*;

    #[tokio::test]
    async fn health_reports_database_status() -> TestResult {
        let ctx = TestContext::new().await?;
        let (status, body) = ctx.send(Method::GET, "/health", None, None).await?;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["database"], "ok");
        Ok(())
    }

    #[tokio::test]
    async fn openapi_document_lists_booking_routes() -> TestResult {
        let ctx = TestContext::new().await?;
        let (status, body) = ctx
            .send(Method::GET, "/api-docs/openapi.json", None, None)
            .await?;

        assert_eq!(status, StatusCode::OK);
        assert!(body["paths"]["/api/appointments"].is_object());
        assert!(body["paths"]["/api/appointments/{appointment_id}/confirm"].is_object());
        assert!(body["components"]["securitySchemes"]["bearerAuth"].is_object());
        Ok(())
    }

    #[tokio::test]
    async fn cors_preflight_is_answered() -> TestResult {
        let ctx = TestContext::new().await?;
        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri("/api/doctors")
            .header(ORIGIN, "https://portal.example.com")
            .header(ACCESS_CONTROL_REQUEST_METHOD, "GET")
            .header(ACCESS_CONTROL_REQUEST_HEADERS, "authorization")
            .body(Body::empty())?;

        let response = ctx.router().oneshot(request).await?;
        assert!(response.status().is_success());
        assert_eq!(
            response
                .headers()
                .get(ACCESS_CONTROL_ALLOW_ORIGIN)
                .and_then(|value| value.to_str().ok()),
            Some("*")
        );
        Ok(())
    }

    #[tokio::test]
    async fn protected_routes_require_a_bearer_token() -> TestResult {
        let ctx = TestContext::new().await?;
        let (status, body) = ctx.send(Method::GET, "/api/auth/me", None, None).await?;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Authentication required");
        Ok(())
    }
}

mod auth_tests {
    use super::*;

    #[tokio::test]
    async fn register_verify_and_login() -> TestResult {
        let ctx = TestContext::new().await?;
        let (status, body) = ctx
            .send(
                Method::POST,
                "/api/auth/register",
                None,
                Some(json!({ "name": "Ann", "email": "Ann@Example.com", "password": PASSWORD })),
            )
            .await?;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["message"], "Confirmation email sent!");

        // Unverified accounts get a fresh link instead of a session.
        let (status, body) = ctx
            .send(
                Method::POST,
                "/api/auth/login",
                None,
                Some(json!({ "email": "ann@example.com", "password": PASSWORD })),
            )
            .await?;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["message"], "Confirmation email sent");

        let sent = ctx.mailer.sent_to("ann@example.com");
        assert_eq!(sent.len(), 2);
        let stale = token_from(&sent[0].text);
        let token = token_from(&sent[1].text);

        let (status, body) = ctx
            .send(
                Method::POST,
                "/api/auth/verify-email",
                None,
                Some(json!({ "token": stale })),
            )
            .await?;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Token does not exist");

        let (status, _) = ctx
            .send(
                Method::POST,
                "/api/auth/verify-email",
                None,
                Some(json!({ "token": token })),
            )
            .await?;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = ctx
            .send(
                Method::POST,
                "/api/auth/verify-email",
                None,
                Some(json!({ "token": token })),
            )
            .await?;
        assert_eq!(status, StatusCode::NOT_FOUND, "token consumed twice: {body}");

        let session = ctx.login("ann@example.com").await?;
        let (status, body) = ctx
            .send(Method::GET, "/api/auth/me", Some(&session), None)
            .await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["profile"]["user"]["email"], "ann@example.com");
        assert_eq!(body["profile"]["roles"], json!(["patient"]));
        Ok(())
    }

    #[tokio::test]
    async fn duplicate_email_and_bad_fields_are_rejected() -> TestResult {
        let ctx = TestContext::new().await?;
        ctx.create_user("Ann", "ann@example.com", &["patient"]).await?;

        let (status, body) = ctx
            .send(
                Method::POST,
                "/api/auth/register",
                None,
                Some(json!({ "name": "Other Ann", "email": "ann@example.com", "password": PASSWORD })),
            )
            .await?;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["message"], "Email already in use");

        let (status, body) = ctx
            .send(
                Method::POST,
                "/api/auth/register",
                None,
                Some(json!({ "name": "", "email": "not-an-email", "password": "123" })),
            )
            .await?;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["message"], "Invalid fields");
        assert!(body["errors"]["name"].is_array());
        assert!(body["errors"]["email"].is_array());
        assert_eq!(body["errors"]["password"][0], "Minimum 6 characters required");
        Ok(())
    }

    #[tokio::test]
    async fn password_reset_signs_out_everywhere() -> TestResult {
        let ctx = TestContext::new().await?;
        ctx.create_user("Ann", "ann@example.com", &["patient"]).await?;
        let session = ctx.login("ann@example.com").await?;

        let (status, _) = ctx
            .send(
                Method::POST,
                "/api/auth/password-reset",
                None,
                Some(json!({ "email": "ann@example.com" })),
            )
            .await?;
        assert_eq!(status, StatusCode::OK);
        let token = token_from(&ctx.mailer.sent_to("ann@example.com")[0].text);

        let (status, _) = ctx
            .send(
                Method::POST,
                "/api/auth/new-password",
                None,
                Some(json!({ "token": token, "password": "another-secret" })),
            )
            .await?;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = ctx
            .send(Method::GET, "/api/auth/me", Some(&session), None)
            .await?;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, body) = ctx
            .send(
                Method::POST,
                "/api/auth/password-reset",
                None,
                Some(json!({ "email": "nobody@example.com" })),
            )
            .await?;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Email not found");
        Ok(())
    }
}

mod user_tests {
    use super::*;

    const PNG: &[u8] = b"\x89PNG\r\n\x1a\nnot-really-a-png";

    #[tokio::test]
    async fn patients_cannot_reach_admin_routes() -> TestResult {
        let ctx = TestContext::new().await?;
        ctx.create_user("Pat", "pat@example.com", &["patient"]).await?;
        let token = ctx.login("pat@example.com").await?;

        let (status, body) = ctx.send(Method::GET, "/api/users", Some(&token), None).await?;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["message"], "Permission denied");

        let (status, _) = ctx
            .send(
                Method::POST,
                "/api/hospitals",
                Some(&token),
                Some(json!({ "name": "General" })),
            )
            .await?;
        assert_eq!(status, StatusCode::FORBIDDEN);
        Ok(())
    }

    #[tokio::test]
    async fn doctor_department_follows_hospital() -> TestResult {
        let ctx = TestContext::new().await?;
        ctx.create_user("Root", "root@example.com", &["admin"]).await?;
        let admin = ctx.login("root@example.com").await?;
        let doctor_id = ctx
            .create_user("Gregory House", "house@example.com", &["doctor"])
            .await?;
        let doctor = ctx.login("house@example.com").await?;

        let mut hospitals = Vec::new();
        for name in ["North", "South"] {
            let (_, body) = ctx
                .send(
                    Method::POST,
                    "/api/hospitals",
                    Some(&admin),
                    Some(json!({ "name": name })),
                )
                .await?;
            hospitals.push(body["hospital"]["public_id"].clone());
        }
        let (status, body) = ctx
            .send(
                Method::POST,
                "/api/departments",
                Some(&admin),
                Some(json!({ "hospital_id": hospitals[0], "name": "Diagnostics" })),
            )
            .await?;
        assert_eq!(status, StatusCode::OK, "{body}");
        let department = body["unit"]["public_id"].clone();

        let profile = format!("/api/doctors/{doctor_id}/profile");
        let (status, body) = ctx
            .send(
                Method::PUT,
                &profile,
                Some(&doctor),
                Some(json!({ "department_id": department, "bio": "Diagnostician" })),
            )
            .await?;
        assert_eq!(status, StatusCode::OK, "{body}");
        let user = &body["doctor"]["user"];
        assert_eq!(user["hospital_public_id"], hospitals[0]);
        assert_eq!(user["hospital_name"], "North");
        assert_eq!(user["department_public_id"], department);
        assert_eq!(user["department_name"], "Diagnostics");
        assert_eq!(user["bio"], "Diagnostician");

        let (status, body) = ctx
            .send(
                Method::PUT,
                &profile,
                Some(&doctor),
                Some(json!({ "hospital_id": hospitals[1], "bio": "" })),
            )
            .await?;
        assert_eq!(status, StatusCode::OK, "{body}");
        let user = &body["doctor"]["user"];
        assert_eq!(user["hospital_public_id"], hospitals[1]);
        assert_eq!(user["department_public_id"], Value::Null);
        assert_eq!(user["bio"], Value::Null);

        let (status, body) = ctx
            .send(
                Method::PUT,
                &profile,
                Some(&doctor),
                Some(json!({ "department_id": department })),
            )
            .await?;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            body["errors"]["department_id"][0],
            "Department belongs to another hospital"
        );

        let (_, body) = ctx.send(Method::GET, "/api/doctors", None, None).await?;
        assert_eq!(body["doctors"][0]["user"]["hospital_name"], "South");
        assert_eq!(body["doctors"][0]["user"]["department_name"], Value::Null);
        Ok(())
    }

    #[tokio::test]
    async fn blank_phone_clears_it() -> TestResult {
        let ctx = TestContext::new().await?;
        ctx.create_user("Pat", "pat@example.com", &["patient"]).await?;
        let token = ctx.login("pat@example.com").await?;

        let (status, body) = ctx
            .send(
                Method::PUT,
                "/api/profile",
                Some(&token),
                Some(json!({ "phone": " 555-0100 " })),
            )
            .await?;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["user"]["phone"], "555-0100");

        let (_, body) = ctx
            .send(Method::PUT, "/api/profile", Some(&token), Some(json!({ "name": "Patricia" })))
            .await?;
        assert_eq!(body["user"]["phone"], "555-0100");

        let (_, body) = ctx
            .send(Method::PUT, "/api/profile", Some(&token), Some(json!({ "phone": "" })))
            .await?;
        assert_eq!(body["user"]["phone"], Value::Null);
        Ok(())
    }

    #[tokio::test]
    async fn admin_creates_pre_verified_users() -> TestResult {
        let ctx = TestContext::new().await?;
        ctx.create_user("Root", "root@example.com", &["admin"]).await?;
        let admin = ctx.login("root@example.com").await?;

        let (status, body) = ctx
            .send(
                Method::POST,
                "/api/users",
                Some(&admin),
                Some(json!({ "name": "Dr Who", "email": "who@example.com", "password": PASSWORD, "roles": ["doctor"] })),
            )
            .await?;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["user"]["roles"], json!(["doctor"]));
        assert!(body["user"]["user"]["email_verified_at"].is_string());

        ctx.login("who@example.com").await?;

        let (status, body) = ctx
            .send(
                Method::POST,
                "/api/users",
                Some(&admin),
                Some(json!({ "name": "Ghost", "email": "ghost@example.com", "roles": ["wizard"] })),
            )
            .await?;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["errors"]["roles"][0], "Unknown role");
        Ok(())
    }

    #[tokio::test]
    async fn replaced_and_deleted_images_are_removed_once() -> TestResult {
        let ctx = TestContext::new().await?;
        ctx.create_user("Root", "root@example.com", &["admin"]).await?;
        let pat_id = ctx.create_user("Pat", "pat@example.com", &["patient"]).await?;
        let admin = ctx.login("root@example.com").await?;
        let pat = ctx.login("pat@example.com").await?;

        let (status, first) = ctx
            .upload("/api/profile/avatar", &pat, "image/png", PNG)
            .await?;
        assert_eq!(status, StatusCode::OK, "{first}");
        let first = first["user"]["image"].as_str().unwrap_or_default().to_string();
        assert!(first.starts_with("avatars/"));
        assert!(ctx.temp_dir.path().join("uploads").join(&first).exists());

        let (_, second) = ctx
            .upload("/api/profile/avatar", &pat, "image/png", PNG)
            .await?;
        let second = second["user"]["image"].as_str().unwrap_or_default().to_string();
        let (_, cover) = ctx
            .upload("/api/profile/cover", &pat, "image/jpeg", PNG)
            .await?;
        let cover = cover["user"]["cover"].as_str().unwrap_or_default().to_string();
        assert_eq!(ctx.files.removed(), vec![first.clone()]);

        let (status, _) = ctx
            .send(
                Method::DELETE,
                &format!("/api/users/{pat_id}"),
                Some(&admin),
                None,
            )
            .await?;
        assert_eq!(status, StatusCode::OK);

        let mut removed = ctx.files.removed();
        removed.sort();
        let mut expected = vec![first, second, cover];
        expected.sort();
        assert_eq!(removed, expected);
        Ok(())
    }

    #[tokio::test]
    async fn uploads_reject_other_types_and_large_files() -> TestResult {
        let ctx = TestContext::new().await?;
        ctx.create_user("Pat", "pat@example.com", &["patient"]).await?;
        let pat = ctx.login("pat@example.com").await?;

        let (status, body) = ctx
            .upload("/api/profile/avatar", &pat, "application/pdf", PNG)
            .await?;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["errors"]["file"].is_array());

        let large = vec![0u8; 2048];
        let (status, _) = ctx
            .upload("/api/profile/avatar", &pat, "image/png", &large)
            .await?;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(ctx.files.removed().is_empty());
        Ok(())
    }
}

mod appointment_tests {
    use super::*;

    #[tokio::test]
    async fn booking_lifecycle() -> TestResult {
        let ctx = TestContext::new().await?;
        let booking = ctx.doctor_and_patient().await?;

        let (status, body) = ctx
            .send(
                Method::POST,
                "/api/appointments",
                Some(&booking.patient),
                Some(booking.request(2)),
            )
            .await?;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["appointment"]["status"], "pending");
        let id = body["appointment"]["public_id"]
            .as_str()
            .unwrap_or_default()
            .to_string();
        assert_eq!(ctx.mailer.sent_to("pat@example.com").len(), 1);
        assert_eq!(ctx.mailer.sent_to("house@example.com").len(), 1);

        let (status, body) = ctx
            .send(
                Method::POST,
                "/api/appointments",
                Some(&booking.patient),
                Some(booking.request(2)),
            )
            .await?;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["message"], "Appointment already booked");

        let (status, body) = ctx
            .send(
                Method::POST,
                &format!("/api/appointments/{id}/confirm"),
                Some(&booking.patient),
                None,
            )
            .await?;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["message"], "Permission denied");

        let (status, body) = ctx
            .send(
                Method::POST,
                &format!("/api/appointments/{id}/confirm"),
                Some(&booking.doctor),
                None,
            )
            .await?;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["appointment"]["status"], "confirmed");

        let (status, body) = ctx
            .send(
                Method::POST,
                &format!("/api/appointments/{id}/cancel"),
                Some(&booking.patient),
                None,
            )
            .await?;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["appointment"]["status"], "cancelled");

        let (status, _) = ctx
            .send(
                Method::POST,
                &format!("/api/appointments/{id}/confirm"),
                Some(&booking.doctor),
                None,
            )
            .await?;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, body) = ctx
            .send(
                Method::GET,
                "/api/appointments?status=cancelled",
                Some(&booking.doctor),
                None,
            )
            .await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["appointments"].as_array().map(Vec::len), Some(1));
        Ok(())
    }

    #[tokio::test]
    async fn doctors_list_appointments_they_booked_as_patients() -> TestResult {
        let ctx = TestContext::new().await?;
        let booking = ctx.doctor_and_patient().await?;
        ctx.create_user("Lisa Cuddy", "cuddy@example.com", &["doctor"])
            .await?;
        let colleague = ctx.login("cuddy@example.com").await?;

        let (status, body) = ctx
            .send(
                Method::POST,
                "/api/appointments",
                Some(&colleague),
                Some(booking.request(2)),
            )
            .await?;
        assert_eq!(status, StatusCode::OK, "{body}");
        let id = body["appointment"]["public_id"].clone();

        let (status, body) = ctx
            .send(Method::GET, "/api/appointments", Some(&colleague), None)
            .await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["appointments"].as_array().map(Vec::len), Some(1));
        assert_eq!(body["appointments"][0]["public_id"], id);

        let (_, body) = ctx
            .send(Method::GET, "/api/appointments", Some(&booking.doctor), None)
            .await?;
        assert_eq!(body["appointments"].as_array().map(Vec::len), Some(1));

        let (_, body) = ctx
            .send(
                Method::GET,
                &format!("/api/appointments?doctor={}", booking.doctor_id),
                Some(&colleague),
                None,
            )
            .await?;
        assert_eq!(body["appointments"].as_array().map(Vec::len), Some(1));

        let (_, body) = ctx
            .send(Method::GET, "/api/appointments", Some(&booking.patient), None)
            .await?;
        assert_eq!(body["appointments"].as_array().map(Vec::len), Some(0));
        Ok(())
    }

    #[tokio::test]
    async fn slots_beyond_the_window_cannot_change_status() -> TestResult {
        let mut config = AppConfig::default();
        config.appointments.expires_at_seconds = 3600;
        let ctx = TestContext::with_config(config).await?;
        let booking = ctx.doctor_and_patient().await?;

        let (status, body) = ctx
            .send(
                Method::POST,
                "/api/appointments",
                Some(&booking.patient),
                Some(booking.request(3)),
            )
            .await?;
        assert_eq!(status, StatusCode::OK, "{body}");
        let id = body["appointment"]["public_id"]
            .as_str()
            .unwrap_or_default()
            .to_string();

        let (status, body) = ctx
            .send(
                Method::POST,
                &format!("/api/appointments/{id}/confirm"),
                Some(&booking.doctor),
                None,
            )
            .await?;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["message"], "Action restricted");
        Ok(())
    }

    #[tokio::test]
    async fn mail_failures_do_not_undo_status_changes() -> TestResult {
        let ctx = TestContext::new().await?;
        let booking = ctx.doctor_and_patient().await?;
        let (_, body) = ctx
            .send(
                Method::POST,
                "/api/appointments",
                Some(&booking.patient),
                Some(booking.request(1)),
            )
            .await?;
        let id = body["appointment"]["public_id"]
            .as_str()
            .unwrap_or_default()
            .to_string();

        ctx.mailer.set_failing(true);
        let (status, body) = ctx
            .send(
                Method::POST,
                &format!("/api/appointments/{id}/confirm"),
                Some(&booking.doctor),
                None,
            )
            .await?;
        assert_eq!(status, StatusCode::OK, "{body}");

        let (_, body) = ctx
            .send(
                Method::GET,
                &format!("/api/appointments/{id}"),
                Some(&booking.patient),
                None,
            )
            .await?;
        assert_eq!(body["appointment"]["status"], "confirmed");
        Ok(())
    }

    #[tokio::test]
    async fn past_dates_are_rejected() -> TestResult {
        let ctx = TestContext::new().await?;
        let booking = ctx.doctor_and_patient().await?;

        let (status, body) = ctx
            .send(
                Method::POST,
                "/api/appointments",
                Some(&booking.patient),
                Some(booking.request(-1)),
            )
            .await?;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["errors"]["date"].is_array());
        Ok(())
    }

    #[tokio::test]
    async fn duplicate_slot_times_are_reported_per_slot() -> TestResult {
        let ctx = TestContext::new().await?;
        let doctor_id = ctx
            .create_user("Gregory House", "house@example.com", &["doctor"])
            .await?;
        let doctor = ctx.login("house@example.com").await?;

        let (status, body) = ctx
            .send(
                Method::PUT,
                &format!("/api/doctors/{doctor_id}/time-slots"),
                Some(&doctor),
                Some(json!({ "slots": [
                    { "time": "09:00", "duration_minutes": 30 },
                    { "time": "09:00", "duration_minutes": 15 }
                ] })),
            )
            .await?;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["errors"]["slots.1.time"][0], "Duplicate time");
        Ok(())
    }
}

mod reference_tests {
    use super::*;

    #[tokio::test]
    async fn hospitals_can_be_reordered() -> TestResult {
        let ctx = TestContext::new().await?;
        ctx.create_user("Root", "root@example.com", &["admin"]).await?;
        let admin = ctx.login("root@example.com").await?;

        let mut ids = Vec::new();
        for name in ["North", "South"] {
            let (status, body) = ctx
                .send(
                    Method::POST,
                    "/api/hospitals",
                    Some(&admin),
                    Some(json!({ "name": name })),
                )
                .await?;
            assert_eq!(status, StatusCode::OK, "{body}");
            ids.push(
                body["hospital"]["public_id"]
                    .as_str()
                    .unwrap_or_default()
                    .to_string(),
            );
        }

        let (status, body) = ctx
            .send(
                Method::POST,
                "/api/hospitals",
                Some(&admin),
                Some(json!({ "name": "North" })),
            )
            .await?;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["message"], "Hospital already exists");

        let (status, _) = ctx
            .send(
                Method::PUT,
                "/api/hospitals/reorder",
                Some(&admin),
                Some(json!({ "ids": [ids[1], ids[0]] })),
            )
            .await?;
        assert_eq!(status, StatusCode::OK);

        let (_, body) = ctx.send(Method::GET, "/api/hospitals", None, None).await?;
        assert_eq!(body["hospitals"][0]["name"], "South");
        assert_eq!(body["hospitals"][1]["name"], "North");

        let (status, _) = ctx
            .send(
                Method::PUT,
                "/api/hospitals/reorder",
                Some(&admin),
                Some(json!({ "ids": ["missing"] })),
            )
            .await?;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        Ok(())
    }

    #[tokio::test]
    async fn deleting_a_hospital_removes_its_logo() -> TestResult {
        let ctx = TestContext::new().await?;
        ctx.create_user("Root", "root@example.com", &["admin"]).await?;
        let admin = ctx.login("root@example.com").await?;

        let (_, body) = ctx
            .send(
                Method::POST,
                "/api/hospitals",
                Some(&admin),
                Some(json!({ "name": "North" })),
            )
            .await?;
        let id = body["hospital"]["public_id"]
            .as_str()
            .unwrap_or_default()
            .to_string();
        sqlx::query("UPDATE hospitals SET logo = 'logos/north.png' WHERE public_id = ?")
            .bind(&id)
            .execute(&ctx.pool)
            .await?;

        let (status, body) = ctx
            .send(Method::DELETE, &format!("/api/hospitals/{id}"), Some(&admin), None)
            .await?;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(ctx.files.removed(), vec!["logos/north.png".to_string()]);
        Ok(())
    }

    #[tokio::test]
    async fn departments_need_an_existing_hospital() -> TestResult {
        let ctx = TestContext::new().await?;
        ctx.create_user("Root", "root@example.com", &["admin"]).await?;
        let admin = ctx.login("root@example.com").await?;

        let (status, body) = ctx
            .send(
                Method::POST,
                "/api/departments",
                Some(&admin),
                Some(json!({ "hospital_id": "nope", "name": "Cardiology" })),
            )
            .await?;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["errors"]["hospital_id"][0], "Hospital not found");
        Ok(())
    }
}

mod membership_tests {
    use super::*;

    #[tokio::test]
    async fn one_active_subscription_per_membership() -> TestResult {
        let ctx = TestContext::new().await?;
        ctx.create_user("Root", "root@example.com", &["admin"]).await?;
        ctx.create_user("Pat", "pat@example.com", &["patient"]).await?;
        let admin = ctx.login("root@example.com").await?;
        let pat = ctx.login("pat@example.com").await?;

        let (_, body) = ctx
            .send(
                Method::POST,
                "/api/memberships",
                Some(&admin),
                Some(json!({ "name": "Gold" })),
            )
            .await?;
        let membership_id = body["membership"]["public_id"]
            .as_str()
            .unwrap_or_default()
            .to_string();
        let (status, body) = ctx
            .send(
                Method::POST,
                &format!("/api/memberships/{membership_id}/fees"),
                Some(&admin),
                Some(json!({ "label": "Monthly", "amount": 2500, "period": "monthly" })),
            )
            .await?;
        assert_eq!(status, StatusCode::OK, "{body}");
        let fee_id = body["fee"]["public_id"].as_str().unwrap_or_default().to_string();

        let subscribe = json!({ "membership_id": membership_id, "fee_id": fee_id });
        let (status, body) = ctx
            .send(
                Method::POST,
                "/api/subscriptions",
                Some(&pat),
                Some(subscribe.clone()),
            )
            .await?;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["subscription"]["status"], "active");
        let subscription_id = body["subscription"]["public_id"]
            .as_str()
            .unwrap_or_default()
            .to_string();

        let (status, body) = ctx
            .send(Method::POST, "/api/subscriptions", Some(&pat), Some(subscribe))
            .await?;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["message"], "Already subscribed to this membership");

        let (status, body) = ctx
            .send(
                Method::POST,
                &format!("/api/subscriptions/{subscription_id}/cancel"),
                Some(&pat),
                None,
            )
            .await?;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["subscription"]["status"], "cancelled");

        let (status, _) = ctx
            .send(Method::GET, "/api/subscriptions?all=true", Some(&pat), None)
            .await?;
        assert_eq!(status, StatusCode::FORBIDDEN);
        Ok(())
    }
}

mod pharma_tests {
    use super::*;

    #[tokio::test]
    async fn codes_report_every_missing_reference() -> TestResult {
        let ctx = TestContext::new().await?;
        ctx.create_user("Root", "root@example.com", &["admin"]).await?;
        let admin = ctx.login("root@example.com").await?;

        let (status, body) = ctx
            .send(
                Method::POST,
                "/api/pharma/codes",
                Some(&admin),
                Some(json!({
                    "code": "PX-100",
                    "brand_id": "missing",
                    "manufacturer_id": "missing",
                    "medication_form_id": "missing"
                })),
            )
            .await?;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["errors"]["brand_id"][0], "Brand not found");
        assert_eq!(body["errors"]["manufacturer_id"][0], "Manufacturer not found");
        assert_eq!(
            body["errors"]["medication_form_id"][0],
            "Medication form not found"
        );
        Ok(())
    }
}
