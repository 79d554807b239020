//! Role entity definitions

use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Serialize, FromRow, ToSchema)]
pub struct Role {
    #[serde(skip_serializing)]
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
}

/// A role together with the permission strings granted through it.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct RoleWithPermissions {
    #[serde(flatten)]
    pub role: Role,
    pub permissions: Vec<String>,
}
