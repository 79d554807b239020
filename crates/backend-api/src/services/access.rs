//! Who is calling and what they may do.

use clinic_database::{RoleRepository, User, UserRepository};
use sqlx::SqlitePool;

use super::ServiceError;

pub const USERS_MANAGE: &str = "users.manage";
pub const ROLES_MANAGE: &str = "roles.manage";
pub const REFERENCE_MANAGE: &str = "reference.manage";
pub const MEMBERSHIPS_MANAGE: &str = "memberships.manage";
pub const PHARMA_MANAGE: &str = "pharma.manage";
pub const APPOINTMENTS_MANAGE: &str = "appointments.manage";

pub const DOCTOR_ROLE: &str = "doctor";
pub const PATIENT_ROLE: &str = "patient";

/// The authenticated user together with their roles and permissions.
#[derive(Debug, Clone)]
pub struct Caller {
    pub user: User,
    pub roles: Vec<String>,
    pub permissions: Vec<String>,
}

impl Caller {
    pub async fn load(pool: &SqlitePool, user_id: i64) -> Result<Self, ServiceError> {
        let user = UserRepository::new(pool.clone())
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("User not found"))?;

        let roles = RoleRepository::new(pool.clone());
        let role_names = roles.role_names(user_id).await?;
        let permissions = roles.permissions(user_id).await?;

        Ok(Self {
            user,
            roles: role_names,
            permissions,
        })
    }

    pub fn id(&self) -> i64 {
        self.user.id
    }

    pub fn can(&self, permission: &str) -> bool {
        self.permissions.iter().any(|p| p == permission)
    }

    pub fn require(&self, permission: &str) -> Result<(), ServiceError> {
        if self.can(permission) {
            Ok(())
        } else {
            Err(ServiceError::restricted("Permission denied"))
        }
    }

    /// Allow the user themselves, or anyone holding `permission`.
    pub fn require_self_or(&self, user_id: i64, permission: &str) -> Result<(), ServiceError> {
        if self.user.id == user_id {
            Ok(())
        } else {
            self.require(permission)
        }
    }
}
