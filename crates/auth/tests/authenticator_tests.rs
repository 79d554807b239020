use chrono::{Duration, Utc};
use clinic_auth::{AuthError, Authenticator, TokenPurpose};
use clinic_config::AuthConfig;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Row, SqlitePool,
};
use std::str::FromStr;
use tempfile::TempDir;

type TestResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations");

fn default_auth_config() -> AuthConfig {
    AuthConfig {
        session_ttl_seconds: 3_600,
        token_ttl_seconds: 600,
    }
}

struct TestContext {
    pool: SqlitePool,
    authenticator: Authenticator,
    _temp_dir: TempDir,
}

impl TestContext {
    async fn new(config: AuthConfig) -> TestResult<Self> {
        let temp_dir = TempDir::new()?;
        let db_path = temp_dir.path().join("auth.sqlite");
        let db_url = format!("sqlite://{}", db_path.display());

        let mut options = SqliteConnectOptions::from_str(&db_url)?;
        options = options.create_if_missing(true);
        options = options.foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        MIGRATOR.run(&pool).await?;

        let authenticator = Authenticator::new(pool.clone(), config);

        Ok(Self {
            pool,
            authenticator,
            _temp_dir: temp_dir,
        })
    }

    async fn new_default() -> TestResult<Self> {
        Self::new(default_auth_config()).await
    }

    fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    fn authenticator(&self) -> &Authenticator {
        &self.authenticator
    }

    /// Register and verify an account so it can log in.
    async fn verified_user(&self, email: &str, password: &str) -> TestResult<i64> {
        let user = self
            .authenticator()
            .register_with_password("Test User", email, password)
            .await?;
        let issued = self
            .authenticator()
            .issue_token(user.id, TokenPurpose::EmailVerification)
            .await?;
        self.authenticator().verify_email(&issued.token).await?;
        Ok(user.id)
    }
}

#[tokio::test]
async fn register_with_password_persists_user_with_patient_role() -> TestResult {
    let ctx = TestContext::new_default().await?;

    let user = ctx
        .authenticator()
        .register_with_password("Ada", " Ada@Example.com ", "secret-password")
        .await?;

    assert_eq!(user.email, "ada@example.com");
    assert!(!user.email_verified);

    let row = sqlx::query("SELECT password_hash, email_verified_at FROM users WHERE id = ?")
        .bind(user.id)
        .fetch_one(ctx.pool())
        .await?;
    let hash: String = row.try_get("password_hash")?;
    assert!(hash.starts_with("$argon2"));
    let verified_at: Option<String> = row.try_get("email_verified_at")?;
    assert!(verified_at.is_none());

    let role: String = sqlx::query_scalar(
        "SELECT r.name FROM roles r JOIN user_roles ur ON ur.role_id = r.id WHERE ur.user_id = ?",
    )
    .bind(user.id)
    .fetch_one(ctx.pool())
    .await?;
    assert_eq!(role, "patient");

    Ok(())
}

#[tokio::test]
async fn register_with_password_rejects_duplicate_email() -> TestResult {
    let ctx = TestContext::new_default().await?;

    ctx.authenticator()
        .register_with_password("Ada", "ada@example.com", "secret-password")
        .await?;
    let err = ctx
        .authenticator()
        .register_with_password("Other", "ADA@example.com", "another-password")
        .await
        .unwrap_err();

    assert!(matches!(err, AuthError::UserExists));
    Ok(())
}

#[tokio::test]
async fn concurrent_registrations_with_same_email_yield_one_account() -> TestResult {
    let ctx = TestContext::new_default().await?;
    let auth = ctx.authenticator();

    let (first, second) = tokio::join!(
        auth.register_with_password("Ada", "ada@example.com", "secret-password"),
        auth.register_with_password("Ada", "ada@example.com", "secret-password"),
    );

    let results = [first, second];
    assert_eq!(results.iter().filter(|result| result.is_ok()).count(), 1);
    assert!(results
        .iter()
        .any(|result| matches!(result, Err(AuthError::UserExists))));

    let accounts: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE email = ?")
        .bind("ada@example.com")
        .fetch_one(ctx.pool())
        .await?;
    assert_eq!(accounts, 1);
    Ok(())
}

#[tokio::test]
async fn login_with_password_refuses_unverified_accounts() -> TestResult {
    let ctx = TestContext::new_default().await?;

    ctx.authenticator()
        .register_with_password("Ada", "ada@example.com", "secret-password")
        .await?;

    let err = ctx
        .authenticator()
        .login_with_password("ada@example.com", "secret-password")
        .await
        .unwrap_err();
    match err {
        AuthError::EmailNotVerified(user) => assert_eq!(user.email, "ada@example.com"),
        other => panic!("unexpected error: {other:?}"),
    }

    let sessions: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sessions")
        .fetch_one(ctx.pool())
        .await?;
    assert_eq!(sessions, 0);
    Ok(())
}

#[tokio::test]
async fn login_with_password_returns_session_for_valid_credentials() -> TestResult {
    let ctx = TestContext::new_default().await?;
    let user_id = ctx.verified_user("ada@example.com", "secret-password").await?;

    let before = Utc::now();
    let session = ctx
        .authenticator()
        .login_with_password("ada@example.com", "secret-password")
        .await?;

    assert_eq!(session.user_id, user_id);
    assert!(session.expires_at >= before + Duration::seconds(3_600));

    let (user, _) = ctx.authenticator().authenticate_token(&session.token).await?;
    assert!(user.email_verified);
    Ok(())
}

#[tokio::test]
async fn login_with_password_rejects_incorrect_secret_and_unknown_email() -> TestResult {
    let ctx = TestContext::new_default().await?;
    ctx.verified_user("ada@example.com", "secret-password").await?;

    let err = ctx
        .authenticator()
        .login_with_password("ada@example.com", "wrong-password")
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::InvalidCredentials));

    let err = ctx
        .authenticator()
        .login_with_password("nobody@example.com", "secret-password")
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::InvalidCredentials));
    Ok(())
}

#[tokio::test]
async fn authenticate_token_deletes_expired_sessions() -> TestResult {
    let ctx = TestContext::new_default().await?;
    let user_id = ctx.verified_user("ada@example.com", "secret-password").await?;

    let expired = (Utc::now() - Duration::minutes(1)).to_rfc3339();
    sqlx::query("INSERT INTO sessions (user_id, token, created_at, expires_at) VALUES (?, 'stale', ?, ?)")
        .bind(user_id)
        .bind(&expired)
        .bind(&expired)
        .execute(ctx.pool())
        .await?;

    let err = ctx.authenticator().authenticate_token("stale").await.unwrap_err();
    assert!(matches!(err, AuthError::SessionExpired));

    let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sessions WHERE token = 'stale'")
        .fetch_one(ctx.pool())
        .await?;
    assert_eq!(remaining, 0);

    let err = ctx.authenticator().authenticate_token("unknown").await.unwrap_err();
    assert!(matches!(err, AuthError::SessionNotFound));
    Ok(())
}

#[tokio::test]
async fn logout_removes_session() -> TestResult {
    let ctx = TestContext::new_default().await?;
    ctx.verified_user("ada@example.com", "secret-password").await?;

    let session = ctx
        .authenticator()
        .login_with_password("ada@example.com", "secret-password")
        .await?;
    ctx.authenticator().logout(&session.token).await?;

    let err = ctx
        .authenticator()
        .authenticate_token(&session.token)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::SessionNotFound));
    assert!(matches!(
        ctx.authenticator().logout(&session.token).await.unwrap_err(),
        AuthError::SessionNotFound
    ));
    Ok(())
}

#[tokio::test]
async fn issue_token_replaces_existing_token() -> TestResult {
    let ctx = TestContext::new_default().await?;
    let user = ctx
        .authenticator()
        .register_with_password("Ada", "ada@example.com", "secret-password")
        .await?;

    let first = ctx
        .authenticator()
        .issue_token(user.id, TokenPurpose::EmailVerification)
        .await?;
    let second = ctx
        .authenticator()
        .issue_token(user.id, TokenPurpose::EmailVerification)
        .await?;
    assert_ne!(first.token, second.token);

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tokens WHERE user_id = ?")
        .bind(user.id)
        .fetch_one(ctx.pool())
        .await?;
    assert_eq!(count, 1);

    let err = ctx.authenticator().verify_email(&first.token).await.unwrap_err();
    assert!(matches!(err, AuthError::TokenNotFound));
    Ok(())
}

#[tokio::test]
async fn verify_email_consumes_token_once() -> TestResult {
    let ctx = TestContext::new_default().await?;
    let user = ctx
        .authenticator()
        .register_with_password("Ada", "ada@example.com", "secret-password")
        .await?;
    let issued = ctx
        .authenticator()
        .issue_token(user.id, TokenPurpose::EmailVerification)
        .await?;

    let verified = ctx.authenticator().verify_email(&issued.token).await?;
    assert!(verified.email_verified);

    let err = ctx.authenticator().verify_email(&issued.token).await.unwrap_err();
    assert!(matches!(err, AuthError::TokenNotFound));
    Ok(())
}

#[tokio::test]
async fn verify_email_rejects_expired_token() -> TestResult {
    let ctx = TestContext::new_default().await?;
    let user = ctx
        .authenticator()
        .register_with_password("Ada", "ada@example.com", "secret-password")
        .await?;

    let past = (Utc::now() - Duration::seconds(5)).to_rfc3339();
    sqlx::query(
        "INSERT INTO tokens (user_id, token, purpose, expires_at, created_at) VALUES (?, 'old', 'email_verification', ?, ?)",
    )
    .bind(user.id)
    .bind(&past)
    .bind(&past)
    .execute(ctx.pool())
    .await?;

    let err = ctx.authenticator().verify_email("old").await.unwrap_err();
    assert!(matches!(err, AuthError::TokenExpired));

    let verified_at: Option<String> =
        sqlx::query_scalar("SELECT email_verified_at FROM users WHERE id = ?")
            .bind(user.id)
            .fetch_one(ctx.pool())
            .await?;
    assert!(verified_at.is_none());
    Ok(())
}

#[tokio::test]
async fn verification_token_cannot_reset_password() -> TestResult {
    let ctx = TestContext::new_default().await?;
    let user = ctx
        .authenticator()
        .register_with_password("Ada", "ada@example.com", "secret-password")
        .await?;
    let issued = ctx
        .authenticator()
        .issue_token(user.id, TokenPurpose::EmailVerification)
        .await?;

    let err = ctx
        .authenticator()
        .reset_password(&issued.token, "new-password")
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::TokenNotFound));
    Ok(())
}

#[tokio::test]
async fn reset_password_updates_hash_and_revokes_sessions() -> TestResult {
    let ctx = TestContext::new_default().await?;
    ctx.verified_user("ada@example.com", "secret-password").await?;
    let session = ctx
        .authenticator()
        .login_with_password("ada@example.com", "secret-password")
        .await?;

    let (user, issued) = ctx
        .authenticator()
        .request_password_reset("ada@example.com")
        .await?;
    assert_eq!(issued.purpose, TokenPurpose::PasswordReset);
    assert_eq!(user.email, "ada@example.com");

    ctx.authenticator()
        .reset_password(&issued.token, "brand-new-password")
        .await?;

    assert!(matches!(
        ctx.authenticator()
            .authenticate_token(&session.token)
            .await
            .unwrap_err(),
        AuthError::SessionNotFound
    ));
    assert!(ctx
        .authenticator()
        .login_with_password("ada@example.com", "secret-password")
        .await
        .is_err());
    ctx.authenticator()
        .login_with_password("ada@example.com", "brand-new-password")
        .await?;
    Ok(())
}

#[tokio::test]
async fn request_password_reset_rejects_unknown_email() -> TestResult {
    let ctx = TestContext::new_default().await?;

    let err = ctx
        .authenticator()
        .request_password_reset("nobody@example.com")
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::EmailNotFound));
    Ok(())
}

#[tokio::test]
async fn change_password_requires_current_password() -> TestResult {
    let ctx = TestContext::new_default().await?;
    let user_id = ctx.verified_user("ada@example.com", "secret-password").await?;

    let err = ctx
        .authenticator()
        .change_password(user_id, "not-it", "next-password")
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::InvalidCredentials));

    ctx.authenticator()
        .change_password(user_id, "secret-password", "next-password")
        .await?;
    ctx.authenticator()
        .login_with_password("ada@example.com", "next-password")
        .await?;
    Ok(())
}

#[tokio::test]
async fn purge_expired_removes_stale_rows() -> TestResult {
    let ctx = TestContext::new_default().await?;
    let user_id = ctx.verified_user("ada@example.com", "secret-password").await?;
    ctx.authenticator()
        .login_with_password("ada@example.com", "secret-password")
        .await?;

    let past = (Utc::now() - Duration::hours(1)).to_rfc3339();
    sqlx::query("INSERT INTO sessions (user_id, token, created_at, expires_at) VALUES (?, 'old', ?, ?)")
        .bind(user_id)
        .bind(&past)
        .bind(&past)
        .execute(ctx.pool())
        .await?;

    assert_eq!(ctx.authenticator().purge_expired().await?, 1);
    let sessions: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sessions")
        .fetch_one(ctx.pool())
        .await?;
    assert_eq!(sessions, 1);
    Ok(())
}
