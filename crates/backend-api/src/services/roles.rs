use clinic_database::{RoleRepository, RoleWithPermissions};
use sqlx::SqlitePool;

use super::access::{Caller, ROLES_MANAGE, USERS_MANAGE};
use super::ServiceError;

pub async fn list_roles(
    pool: &SqlitePool,
    caller: &Caller,
) -> Result<Vec<RoleWithPermissions>, ServiceError> {
    if !caller.can(USERS_MANAGE) {
        caller.require(ROLES_MANAGE)?;
    }
    Ok(RoleRepository::new(pool.clone())
        .list_with_permissions()
        .await?)
}
