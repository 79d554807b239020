use clinic_auth::{AuthError, TokenPurpose};
use clinic_database::User;
use clinic_mailer::templates;
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;

use super::{access::Caller, notify, ServiceError};
use crate::validation::{FieldErrors, MAX_NAME_LENGTH};
use crate::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct TokenRequest {
    pub token: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PasswordResetRequest {
    pub email: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct NewPasswordRequest {
    pub token: String,
    pub password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Session {
    pub token: String,
    pub expires_at: String,
}

/// The signed-in user with everything the portal needs to gate screens.
#[derive(Debug, Serialize, ToSchema)]
pub struct Profile {
    pub user: User,
    pub roles: Vec<String>,
    pub permissions: Vec<String>,
}

impl From<Caller> for Profile {
    fn from(caller: Caller) -> Self {
        Self {
            user: caller.user,
            roles: caller.roles,
            permissions: caller.permissions,
        }
    }
}

/// Create a patient account and email a verification link.
pub async fn register(state: &AppState, req: RegisterRequest) -> Result<(), ServiceError> {
    let mut errors = FieldErrors::new();
    errors.required("name", "Name", &req.name, MAX_NAME_LENGTH);
    errors.email("email", &req.email);
    errors.password("password", &req.password);
    errors.finish()?;

    let user = state
        .authenticator()
        .register_with_password(req.name.trim(), &req.email, &req.password)
        .await
        .map_err(|err| match err {
            AuthError::UserExists => ServiceError::conflict("Email already in use"),
            other => other.into(),
        })?;

    send_verification(state, user.id, &user.email, &user.name).await
}

pub async fn login(state: &AppState, req: LoginRequest) -> Result<Session, ServiceError> {
    let mut errors = FieldErrors::new();
    errors.email("email", &req.email);
    if req.password.is_empty() {
        errors.add("password", "Password is required");
    }
    errors.finish()?;

    match state
        .authenticator()
        .login_with_password(&req.email, &req.password)
        .await
    {
        Ok(session) => {
            info!(user_id = session.user_id, "user signed in");
            Ok(Session {
                token: session.token,
                expires_at: session.expires_at.to_rfc3339(),
            })
        }
        Err(AuthError::EmailNotVerified(user)) => {
            send_verification(state, user.id, &user.email, &user.name).await?;
            Err(ServiceError::restricted("Confirmation email sent"))
        }
        Err(err) => Err(err.into()),
    }
}

pub async fn logout(state: &AppState, token: &str) -> Result<(), ServiceError> {
    state.authenticator().logout(token).await?;
    Ok(())
}

/// Redeem a verification token. Each token works exactly once.
pub async fn verify_email(state: &AppState, req: TokenRequest) -> Result<(), ServiceError> {
    let user = state
        .authenticator()
        .verify_email(req.token.trim())
        .await
        .map_err(token_error)?;
    info!(user = %user.public_id, "email verified");
    Ok(())
}

pub async fn request_password_reset(
    state: &AppState,
    req: PasswordResetRequest,
) -> Result<(), ServiceError> {
    let mut errors = FieldErrors::new();
    errors.email("email", &req.email);
    errors.finish()?;

    let (user, token) = state
        .authenticator()
        .request_password_reset(&req.email)
        .await
        .map_err(|err| match err {
            AuthError::EmailNotFound => ServiceError::not_found("Email not found"),
            other => other.into(),
        })?;

    let email = templates::password_reset(
        &state.config().mail.app_url,
        &user.email,
        &user.name,
        &token.token,
    );
    notify::deliver(state.mailer(), email).await;
    Ok(())
}

/// Store a new password for the holder of a reset token and sign them out everywhere.
pub async fn reset_password(state: &AppState, req: NewPasswordRequest) -> Result<(), ServiceError> {
    let mut errors = FieldErrors::new();
    errors.password("password", &req.password);
    errors.finish()?;

    let user = state
        .authenticator()
        .reset_password(req.token.trim(), &req.password)
        .await
        .map_err(token_error)?;
    info!(user = %user.public_id, "password reset");
    Ok(())
}

pub async fn change_password(
    state: &AppState,
    caller: &Caller,
    req: ChangePasswordRequest,
) -> Result<(), ServiceError> {
    let mut errors = FieldErrors::new();
    if req.current_password.is_empty() {
        errors.add("current_password", "Password is required");
    }
    errors.password("new_password", &req.new_password);
    errors.finish()?;

    state
        .authenticator()
        .change_password(caller.id(), &req.current_password, &req.new_password)
        .await
        .map_err(|err| match err {
            AuthError::InvalidCredentials => {
                ServiceError::invalid("current_password", "Incorrect password")
            }
            other => other.into(),
        })
}

async fn send_verification(
    state: &AppState,
    user_id: i64,
    to: &str,
    name: &str,
) -> Result<(), ServiceError> {
    let token = state
        .authenticator()
        .issue_token(user_id, TokenPurpose::EmailVerification)
        .await?;

    let email = templates::verification(&state.config().mail.app_url, to, name, &token.token);
    notify::deliver(state.mailer(), email).await;
    Ok(())
}

fn token_error(err: AuthError) -> ServiceError {
    match err {
        AuthError::TokenNotFound => ServiceError::not_found("Token does not exist"),
        AuthError::TokenExpired => ServiceError::Expired("Token has expired".to_string()),
        other => other.into(),
    }
}
