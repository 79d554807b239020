//! Error types for the database layer

use thiserror::Error;

/// General database error
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Database connection error: {0}")]
    ConnectionError(String),

    #[error("Database query error: {0}")]
    QueryError(String),

    #[error("Database migration error: {0}")]
    MigrationError(String),

    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Duplicate entity: {0}")]
    Duplicate(String),

    /// A foreign key or check constraint rejected the write.
    #[error("Constraint violated: {0}")]
    Constraint(String),

    #[error("Invalid stored value: {0}")]
    InvalidValue(String),
}

impl DatabaseError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::Duplicate(_))
    }
}

impl From<sqlx::Error> for DatabaseError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DatabaseError::NotFound("row not found".to_string()),
            sqlx::Error::Database(db_err) => {
                let message = db_err.message().to_string();
                if message.contains("UNIQUE constraint failed") {
                    DatabaseError::Duplicate(message)
                } else if message.contains("FOREIGN KEY constraint failed")
                    || message.contains("CHECK constraint failed")
                {
                    DatabaseError::Constraint(message)
                } else {
                    DatabaseError::QueryError(message)
                }
            }
            other => DatabaseError::QueryError(other.to_string()),
        }
    }
}

/// Raised when a stored enum column holds an unexpected value.
#[derive(Debug, Error)]
#[error("unknown {kind} value: {value}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = DatabaseError::not_found("hospital");
        assert_eq!(err.to_string(), "Entity not found: hospital");
        assert!(!err.is_duplicate());

        let err = DatabaseError::from(sqlx::Error::RowNotFound);
        assert!(matches!(err, DatabaseError::NotFound(_)));
    }
}
