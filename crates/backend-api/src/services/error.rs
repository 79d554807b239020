use clinic_auth::AuthError;
use clinic_database::DatabaseError;
use thiserror::Error;

use crate::validation::FieldErrors;
use crate::ApiError;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("invalid fields: {0:?}")]
    Validation(FieldErrors),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    /// The caller may not perform the action, or not at this time.
    #[error("{0}")]
    Restricted(String),
    #[error("{0}")]
    Expired(String),
    #[error(transparent)]
    Database(#[from] DatabaseError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("file storage failed: {0}")]
    Storage(#[from] std::io::Error),
    #[error("{0}")]
    Internal(String),
}

impl ServiceError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn restricted(msg: impl Into<String>) -> Self {
        Self::Restricted(msg.into())
    }

    pub fn invalid(field: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Validation(FieldErrors::single(field, msg))
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Validation(errors) => ApiError::validation(errors),
            ServiceError::NotFound(msg) => ApiError::not_found(msg),
            ServiceError::Conflict(msg) => ApiError::conflict(msg),
            ServiceError::Restricted(msg) => ApiError::forbidden(msg),
            ServiceError::Expired(msg) => ApiError::gone(msg),
            ServiceError::Database(db_err) => match db_err {
                DatabaseError::NotFound(what) => ApiError::not_found(format!("{what} not found")),
                DatabaseError::Duplicate(_) => ApiError::conflict("Record already exists"),
                DatabaseError::Constraint(_) => ApiError::conflict("Record is still in use"),
                other => ApiError::internal_server_error(other),
            },
            ServiceError::Auth(auth_err) => ApiError::from(auth_err),
            ServiceError::Storage(io_err) => ApiError::internal_server_error(io_err),
            ServiceError::Internal(msg) => ApiError::internal_server_error(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn database_errors_map_to_client_statuses() {
        let err: ApiError = ServiceError::from(DatabaseError::not_found("hospital")).into();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
        assert_eq!(err.message, "hospital not found");

        let err: ApiError =
            ServiceError::from(DatabaseError::Constraint("FOREIGN KEY".into())).into();
        assert_eq!(err.status, StatusCode::CONFLICT);

        let err: ApiError =
            ServiceError::from(DatabaseError::QueryError("syntax error".into())).into();
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message, crate::error::GENERIC_ERROR);
    }

    #[test]
    fn restricted_actions_are_forbidden() {
        let err: ApiError = ServiceError::restricted("Action restricted").into();
        assert_eq!(err.status, StatusCode::FORBIDDEN);
        assert_eq!(err.message, "Action restricted");
    }
}
