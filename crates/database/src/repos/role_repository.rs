//! Roles and the permissions they grant.

use crate::entities::{Role, RoleWithPermissions};
use crate::types::{DatabaseError, DatabaseResult};
use crate::timestamp;
use sqlx::SqlitePool;

#[derive(Clone)]
pub struct RoleRepository {
    pool: SqlitePool,
}

impl RoleRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn list_with_permissions(&self) -> DatabaseResult<Vec<RoleWithPermissions>> {
        let roles = sqlx::query_as::<_, Role>("SELECT id, name, description FROM roles ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        let mut result = Vec::with_capacity(roles.len());
        for role in roles {
            let permissions = sqlx::query_scalar::<_, String>(
                "SELECT permission FROM role_permissions WHERE role_id = ? ORDER BY permission",
            )
            .bind(role.id)
            .fetch_all(&self.pool)
            .await?;
            result.push(RoleWithPermissions { role, permissions });
        }
        Ok(result)
    }

    /// Names of the roles held by a user.
    pub async fn role_names(&self, user_id: i64) -> DatabaseResult<Vec<String>> {
        let names = sqlx::query_scalar::<_, String>(
            "SELECT r.name FROM roles r JOIN user_roles ur ON ur.role_id = r.id
             WHERE ur.user_id = ? ORDER BY r.id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(names)
    }

    /// Every permission granted to a user through any of its roles.
    pub async fn permissions(&self, user_id: i64) -> DatabaseResult<Vec<String>> {
        let permissions = sqlx::query_scalar::<_, String>(
            "SELECT DISTINCT rp.permission FROM role_permissions rp
             JOIN user_roles ur ON ur.role_id = rp.role_id
             WHERE ur.user_id = ? ORDER BY rp.permission",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(permissions)
    }

    pub async fn has_role(&self, user_id: i64, role: &str) -> DatabaseResult<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM user_roles ur JOIN roles r ON r.id = ur.role_id
             WHERE ur.user_id = ? AND r.name = ?",
        )
        .bind(user_id)
        .bind(role)
        .fetch_one(&self.pool)
        .await?;
        Ok(count > 0)
    }

    /// Replace the roles of a user. Unknown role names abort the whole change.
    pub async fn set_user_roles(&self, user_id: i64, roles: &[String]) -> DatabaseResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM user_roles WHERE user_id = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        for role in roles {
            let inserted = sqlx::query(
                "INSERT OR IGNORE INTO user_roles (user_id, role_id) SELECT ?, id FROM roles WHERE name = ?",
            )
            .bind(user_id)
            .bind(role)
            .execute(&mut *tx)
            .await?;
            if inserted.rows_affected() == 0 {
                let known: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM roles WHERE name = ?")
                    .bind(role)
                    .fetch_one(&mut *tx)
                    .await?;
                if known == 0 {
                    return Err(DatabaseError::not_found(format!("role {role}")));
                }
            }
        }

        sqlx::query("UPDATE users SET updated_at = ? WHERE id = ?")
            .bind(timestamp())
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::NewUser;
    use crate::repos::UserRepository;
    use crate::test_support::test_pool;

    #[tokio::test]
    async fn test_builtin_roles_and_permissions() {
        let (pool, _dir) = test_pool().await;
        let repo = RoleRepository::new(pool);

        let roles = repo.list_with_permissions().await.unwrap();
        let names: Vec<_> = roles.iter().map(|r| r.role.name.as_str()).collect();
        assert_eq!(names, vec!["admin", "doctor", "patient"]);
        assert!(roles[0].permissions.contains(&"users.manage".to_string()));
        assert!(roles[2].permissions.is_empty());
    }

    #[tokio::test]
    async fn test_set_user_roles() {
        let (pool, _dir) = test_pool().await;
        let users = UserRepository::new(pool.clone());
        let roles = RoleRepository::new(pool);

        let user = users
            .create(
                &NewUser {
                    name: "Role Tester".into(),
                    email: "roles@example.com".into(),
                    password_hash: None,
                    phone: None,
                    verified: true,
                },
                &["patient"],
            )
            .await
            .unwrap();

        roles
            .set_user_roles(user.id, &["admin".to_string(), "doctor".to_string()])
            .await
            .unwrap();
        assert_eq!(roles.role_names(user.id).await.unwrap(), vec!["admin", "doctor"]);
        assert!(roles.has_role(user.id, "doctor").await.unwrap());
        assert!(roles
            .permissions(user.id)
            .await
            .unwrap()
            .contains(&"appointments.manage".to_string()));

        let err = roles
            .set_user_roles(user.id, &["nurse".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound(_)));
        // The failed change left the previous roles in place.
        assert_eq!(roles.role_names(user.id).await.unwrap(), vec!["admin", "doctor"]);
    }
}
