//! Clinic Database Crate
//!
//! Connection management, migrations, entities and repositories for the
//! clinic backend.

use chrono::Utc;
use clinic_config::DatabaseConfig;
use sqlx::SqlitePool;

pub mod connection;
pub mod entities;
pub mod migrations;
pub mod repos;
pub mod types;

pub use connection::{prepare_database, DatabaseConnection};
pub use migrations::{run_migrations, MIGRATOR};

pub use repos::{
    AppointmentRepository, MembershipRepository, NamedTable, PharmaRepository,
    ReferenceRepository, RoleRepository, SortableTable, TimeSlotRepository, UnitKind,
    UserRepository,
};

pub use entities::*;

pub use types::{DatabaseError, DatabaseResult, UnknownVariant};

/// Initialize the database with migrations
pub async fn initialize_database(config: &DatabaseConfig) -> DatabaseResult<SqlitePool> {
    let pool = prepare_database(config)
        .await
        .map_err(|e| DatabaseError::ConnectionError(format!("{e:#}")))?;

    run_migrations(&pool)
        .await
        .map_err(|e| DatabaseError::MigrationError(format!("{e:#}")))?;

    Ok(pool)
}

/// New collision-resistant identifier exposed to clients instead of row ids.
pub fn new_public_id() -> String {
    cuid2::cuid()
}

/// Current instant in the RFC 3339 form stored in timestamp columns.
pub fn timestamp() -> String {
    Utc::now().to_rfc3339()
}
