use argon2::password_hash::{
    rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
};
use argon2::Argon2;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{DateTime, Duration, Utc};
use clinic_config::AuthConfig;
use cuid2::CuidConstructor;
use once_cell::sync::Lazy;
use rand::RngCore;
use serde::Serialize;
use sqlx::{Row, Sqlite, SqlitePool, Transaction};
use thiserror::Error;
use tracing::{debug, info};

static CUID: Lazy<CuidConstructor> = Lazy::new(CuidConstructor::new);

#[derive(Clone)]
pub struct Authenticator {
    pool: SqlitePool,
    session_ttl: Duration,
    token_ttl: Duration,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("user already exists")]
    UserExists,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("email address has not been verified")]
    EmailNotVerified(User),
    #[error("email not found")]
    EmailNotFound,
    #[error("token does not exist")]
    TokenNotFound,
    #[error("token has expired")]
    TokenExpired,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("password hashing failed: {0}")]
    PasswordHash(#[from] argon2::password_hash::Error),
    #[error("session not found")]
    SessionNotFound,
    #[error("session expired")]
    SessionExpired,
    #[error("invalid session token")]
    InvalidSession,
}

/// The account fields authentication needs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct User {
    #[serde(skip_serializing)]
    pub id: i64,
    pub public_id: String,
    pub name: String,
    pub email: String,
    pub email_verified: bool,
}

#[derive(Debug, Clone)]
pub struct AuthSession {
    pub token: String,
    pub user_id: i64,
    pub expires_at: DateTime<Utc>,
}

/// What a single-use token may be redeemed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenPurpose {
    EmailVerification,
    PasswordReset,
}

impl TokenPurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenPurpose::EmailVerification => "email_verification",
            TokenPurpose::PasswordReset => "password_reset",
        }
    }
}

#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub purpose: TokenPurpose,
    pub expires_at: DateTime<Utc>,
}

impl Authenticator {
    pub fn new(pool: SqlitePool, config: AuthConfig) -> Self {
        let session_ttl = Duration::seconds(clamp_seconds(config.session_ttl_seconds));
        let token_ttl = Duration::seconds(clamp_seconds(config.token_ttl_seconds));

        Self {
            pool,
            session_ttl,
            token_ttl,
        }
    }

    pub fn pool(&self) -> SqlitePool {
        self.pool.clone()
    }

    /// Create an unverified account holding the `patient` role.
    pub async fn register_with_password(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<User, AuthError> {
        let email = normalize_email(email);
        let password_hash = hash_password(password)?;
        let now = Utc::now().to_rfc3339();
        let public_id = new_public_id();

        // The unique email index decides duplicates, concurrent ones included.
        let mut tx = self.pool.begin().await?;
        let result = sqlx::query(
            "INSERT INTO users (public_id, name, email, password_hash, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&public_id)
        .bind(name)
        .bind(&email)
        .bind(&password_hash)
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await
        .map_err(|err| match err {
            sqlx::Error::Database(db) if db.is_unique_violation() => AuthError::UserExists,
            other => AuthError::Database(other),
        })?;
        let user_id = result.last_insert_rowid();

        sqlx::query(
            "INSERT INTO user_roles (user_id, role_id) SELECT ?, id FROM roles WHERE name = 'patient'",
        )
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(user = %public_id, "registered user");
        Ok(User {
            id: user_id,
            public_id,
            name: name.to_owned(),
            email,
            email_verified: false,
        })
    }

    /// Check the password and open a session.
    ///
    /// Accounts whose email is unverified are refused with
    /// [`AuthError::EmailNotVerified`] after the password matched.
    pub async fn login_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, AuthError> {
        let row = sqlx::query("SELECT id, password_hash FROM users WHERE email = ?")
            .bind(normalize_email(email))
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Err(AuthError::InvalidCredentials);
        };

        let secret: Option<String> = row.try_get("password_hash")?;
        let secret = secret.ok_or(AuthError::InvalidCredentials)?;
        verify_password(password, &secret)?;

        let user_id: i64 = row.try_get("id")?;
        let user = self.fetch_user(user_id).await?;
        if !user.email_verified {
            return Err(AuthError::EmailNotVerified(user));
        }

        self.issue_session(user_id).await
    }

    pub async fn authenticate_token(&self, token: &str) -> Result<(User, AuthSession), AuthError> {
        let row = sqlx::query("SELECT user_id, expires_at FROM sessions WHERE token = ?")
            .bind(token)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Err(AuthError::SessionNotFound);
        };

        let user_id: i64 = row.try_get("user_id")?;
        let expires_at: String = row.try_get("expires_at")?;

        let expires_at = DateTime::parse_from_rfc3339(&expires_at)
            .map_err(|_| AuthError::InvalidSession)?
            .with_timezone(&Utc);

        if expires_at <= Utc::now() {
            sqlx::query("DELETE FROM sessions WHERE token = ?")
                .bind(token)
                .execute(&self.pool)
                .await?;
            return Err(AuthError::SessionExpired);
        }

        let user = self.fetch_user(user_id).await?;
        let session = AuthSession {
            token: token.to_owned(),
            user_id,
            expires_at,
        };

        Ok((user, session))
    }

    pub async fn logout(&self, token: &str) -> Result<(), AuthError> {
        let result = sqlx::query("DELETE FROM sessions WHERE token = ?")
            .bind(token)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AuthError::SessionNotFound);
        }
        Ok(())
    }

    pub async fn change_password(
        &self,
        user_id: i64,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        let secret: Option<Option<String>> =
            sqlx::query_scalar("SELECT password_hash FROM users WHERE id = ?")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;
        let secret = secret.flatten().ok_or(AuthError::InvalidCredentials)?;
        verify_password(current_password, &secret)?;

        let password_hash = hash_password(new_password)?;
        sqlx::query("UPDATE users SET password_hash = ?, updated_at = ? WHERE id = ?")
            .bind(password_hash)
            .bind(Utc::now().to_rfc3339())
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        info!(user_id, "password changed");
        Ok(())
    }

    /// Issue a single-use token, replacing any token the user already holds.
    pub async fn issue_token(
        &self,
        user_id: i64,
        purpose: TokenPurpose,
    ) -> Result<IssuedToken, AuthError> {
        let token = generate_token();
        let now = Utc::now();
        let expires_at = now + self.token_ttl;

        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM tokens WHERE user_id = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            "INSERT INTO tokens (user_id, token, purpose, expires_at, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(user_id)
        .bind(&token)
        .bind(purpose.as_str())
        .bind(expires_at.to_rfc3339())
        .bind(now.to_rfc3339())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        debug!(user_id, purpose = purpose.as_str(), "issued token");
        Ok(IssuedToken {
            token,
            purpose,
            expires_at,
        })
    }

    /// Start a password reset for the account registered under `email`.
    pub async fn request_password_reset(
        &self,
        email: &str,
    ) -> Result<(User, IssuedToken), AuthError> {
        let user_id: Option<i64> = sqlx::query_scalar("SELECT id FROM users WHERE email = ?")
            .bind(normalize_email(email))
            .fetch_optional(&self.pool)
            .await?;
        let user_id = user_id.ok_or(AuthError::EmailNotFound)?;

        let user = self.fetch_user(user_id).await?;
        let token = self.issue_token(user_id, TokenPurpose::PasswordReset).await?;
        Ok((user, token))
    }

    /// Redeem an email-verification token. A token can only be redeemed once.
    pub async fn verify_email(&self, token: &str) -> Result<User, AuthError> {
        let mut tx = self.pool.begin().await?;
        let user_id = consume_token(&mut tx, token, TokenPurpose::EmailVerification).await?;

        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "UPDATE users SET email_verified_at = COALESCE(email_verified_at, ?), updated_at = ? WHERE id = ?",
        )
        .bind(&now)
        .bind(&now)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(user_id, "email verified");
        self.fetch_user(user_id).await
    }

    /// Redeem a password-reset token, store the new password and end every
    /// open session of the account.
    pub async fn reset_password(&self, token: &str, new_password: &str) -> Result<User, AuthError> {
        let password_hash = hash_password(new_password)?;

        let mut tx = self.pool.begin().await?;
        let user_id = consume_token(&mut tx, token, TokenPurpose::PasswordReset).await?;

        sqlx::query("UPDATE users SET password_hash = ?, updated_at = ? WHERE id = ?")
            .bind(&password_hash)
            .bind(Utc::now().to_rfc3339())
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM sessions WHERE user_id = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(user_id, "password reset");
        self.fetch_user(user_id).await
    }

    /// Drop sessions and tokens that are past their expiry.
    pub async fn purge_expired(&self) -> Result<u64, AuthError> {
        let now = Utc::now().to_rfc3339();
        let sessions = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
            .bind(&now)
            .execute(&self.pool)
            .await?;
        let tokens = sqlx::query("DELETE FROM tokens WHERE expires_at <= ?")
            .bind(&now)
            .execute(&self.pool)
            .await?;
        Ok(sessions.rows_affected() + tokens.rows_affected())
    }

    async fn fetch_user(&self, id: i64) -> Result<User, AuthError> {
        let row = sqlx::query(
            "SELECT id, public_id, name, email, email_verified_at IS NOT NULL AS email_verified FROM users WHERE id = ?",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        Ok(User {
            id,
            public_id: row.try_get("public_id")?,
            name: row.try_get("name")?,
            email: row.try_get("email")?,
            email_verified: row.try_get("email_verified")?,
        })
    }

    async fn issue_session(&self, user_id: i64) -> Result<AuthSession, AuthError> {
        let token = generate_token();
        let now = Utc::now();
        let expires_at = now + self.session_ttl;

        sqlx::query(
            "INSERT INTO sessions (user_id, token, created_at, expires_at) VALUES (?, ?, ?, ?)",
        )
        .bind(user_id)
        .bind(&token)
        .bind(now.to_rfc3339())
        .bind(expires_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(AuthSession {
            token,
            user_id,
            expires_at,
        })
    }
}

/// Look up and delete a token inside `tx`, returning its owner.
async fn consume_token(
    tx: &mut Transaction<'_, Sqlite>,
    token: &str,
    purpose: TokenPurpose,
) -> Result<i64, AuthError> {
    let row = sqlx::query("SELECT id, user_id, expires_at FROM tokens WHERE token = ? AND purpose = ?")
        .bind(token)
        .bind(purpose.as_str())
        .fetch_optional(&mut **tx)
        .await?;

    let Some(row) = row else {
        return Err(AuthError::TokenNotFound);
    };

    let expires_at: String = row.try_get("expires_at")?;
    let expires_at = DateTime::parse_from_rfc3339(&expires_at)
        .map_err(|_| AuthError::TokenNotFound)?
        .with_timezone(&Utc);
    if expires_at <= Utc::now() {
        return Err(AuthError::TokenExpired);
    }

    let id: i64 = row.try_get("id")?;
    let deleted = sqlx::query("DELETE FROM tokens WHERE id = ?")
        .bind(id)
        .execute(&mut **tx)
        .await?;
    if deleted.rows_affected() != 1 {
        return Err(AuthError::TokenNotFound);
    }

    let user_id: i64 = row.try_get("user_id")?;
    Ok(user_id)
}

/// Hash a password with Argon2 and a fresh salt.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

fn verify_password(password: &str, stored: &str) -> Result<(), AuthError> {
    let stored_hash = PasswordHash::new(stored)?;
    Argon2::default()
        .verify_password(password.as_bytes(), &stored_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

/// Emails are matched case-insensitively by storing them lowercased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

fn new_public_id() -> String {
    CUID.create_id()
}

/// Lifetimes are capped at roughly a century.
const MAX_TTL_SECONDS: i64 = 100 * 365 * 24 * 60 * 60;

fn clamp_seconds(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX).min(MAX_TTL_SECONDS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_tokens_are_urlsafe() {
        let token = generate_token();
        assert_eq!(token.len(), 43);
        assert!(token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
        assert_ne!(token, generate_token());
    }

    #[test]
    fn test_password_round_trip() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2"));
        verify_password("correct horse", &hash).unwrap();
        assert!(matches!(
            verify_password("wrong", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Ada@Example.COM "), "ada@example.com");
    }
}
