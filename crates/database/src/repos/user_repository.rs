//! User repository for database operations.

use crate::entities::{
    DoctorProfileChanges, ImageKind, NewUser, Speciality, User, UserChanges, UserFilter,
};
use crate::types::{DatabaseError, DatabaseResult};
use crate::{new_public_id, timestamp};
use sqlx::SqlitePool;

const USER_SELECT: &str = "SELECT u.id, u.public_id, u.name, u.email, u.email_verified_at, \
     u.password_hash, u.phone, u.image, u.cover, u.title, u.bio, u.experience_years, \
     u.consultation_fee, u.hospital_id, h.public_id AS hospital_public_id, h.name AS hospital_name, \
     u.department_id, dep.public_id AS department_public_id, dep.name AS department_name, \
     u.created_at, u.updated_at
     FROM users u
     LEFT JOIN hospitals h ON h.id = u.hospital_id
     LEFT JOIN departments dep ON dep.id = u.department_id";

/// Repository for user database operations
#[derive(Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    /// Create a new user repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: i64) -> DatabaseResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "{USER_SELECT} WHERE u.id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    pub async fn find_by_public_id(&self, public_id: &str) -> DatabaseResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "{USER_SELECT} WHERE u.public_id = ?"
        ))
        .bind(public_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    pub async fn find_by_email(&self, email: &str) -> DatabaseResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "{USER_SELECT} WHERE u.email = ? COLLATE NOCASE"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    /// List users, optionally restricted to a role and a name/email search term.
    pub async fn list(&self, filter: &UserFilter) -> DatabaseResult<Vec<User>> {
        let pattern = filter.search.as_ref().map(|term| format!("%{}%", term.trim()));
        let users = sqlx::query_as::<_, User>(&format!(
            "{USER_SELECT}
             WHERE (?1 IS NULL OR EXISTS (
                    SELECT 1 FROM user_roles ur JOIN roles r ON r.id = ur.role_id
                    WHERE ur.user_id = u.id AND r.name = ?1))
               AND (?2 IS NULL OR u.name LIKE ?2 OR u.email LIKE ?2)
             ORDER BY u.created_at DESC, u.id DESC"
        ))
        .bind(filter.role.as_deref())
        .bind(pattern)
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    /// Insert a user and grant it the named roles in one transaction.
    pub async fn create(&self, new_user: &NewUser, roles: &[&str]) -> DatabaseResult<User> {
        let mut tx = self.pool.begin().await?;
        let now = timestamp();
        let public_id = new_public_id();
        let verified_at = new_user.verified.then(|| now.clone());

        let result = sqlx::query(
            "INSERT INTO users (public_id, name, email, email_verified_at, password_hash, phone, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&public_id)
        .bind(&new_user.name)
        .bind(&new_user.email)
        .bind(&verified_at)
        .bind(&new_user.password_hash)
        .bind(&new_user.phone)
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await?;
        let user_id = result.last_insert_rowid();

        for role in roles {
            let inserted = sqlx::query(
                "INSERT INTO user_roles (user_id, role_id) SELECT ?, id FROM roles WHERE name = ?",
            )
            .bind(user_id)
            .bind(role)
            .execute(&mut *tx)
            .await?;
            if inserted.rows_affected() == 0 {
                return Err(DatabaseError::not_found(format!("role {role}")));
            }
        }

        tx.commit().await?;

        self.find_by_id(user_id)
            .await?
            .ok_or_else(|| DatabaseError::QueryError("failed to retrieve created user".into()))
    }

    pub async fn update(&self, id: i64, changes: &UserChanges) -> DatabaseResult<User> {
        let result = sqlx::query(
            "UPDATE users SET name = COALESCE(?1, name), email = COALESCE(?2, email),
                phone = CASE WHEN ?3 IS NULL THEN phone ELSE NULLIF(?3, '') END,
                updated_at = ?4
             WHERE id = ?5",
        )
        .bind(&changes.name)
        .bind(&changes.email)
        .bind(&changes.phone)
        .bind(timestamp())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found("user"));
        }
        self.find_by_id(id)
            .await?
            .ok_or_else(|| DatabaseError::not_found("user"))
    }

    pub async fn update_doctor_profile(
        &self,
        id: i64,
        changes: &DoctorProfileChanges,
    ) -> DatabaseResult<User> {
        let result = sqlx::query(
            "UPDATE users SET
                title = CASE WHEN ?1 IS NULL THEN title ELSE NULLIF(?1, '') END,
                bio = CASE WHEN ?2 IS NULL THEN bio ELSE NULLIF(?2, '') END,
                experience_years = COALESCE(?3, experience_years),
                consultation_fee = COALESCE(?4, consultation_fee),
                hospital_id = COALESCE(?5, hospital_id),
                department_id = CASE WHEN ?6 IS NOT NULL THEN ?6
                                     WHEN ?7 THEN NULL
                                     ELSE department_id END,
                updated_at = ?8
             WHERE id = ?9",
        )
        .bind(&changes.title)
        .bind(&changes.bio)
        .bind(changes.experience_years)
        .bind(changes.consultation_fee)
        .bind(changes.hospital_id)
        .bind(changes.department_id)
        .bind(changes.clear_department)
        .bind(timestamp())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found("user"));
        }
        self.find_by_id(id)
            .await?
            .ok_or_else(|| DatabaseError::not_found("user"))
    }

    /// Point the avatar or cover at `path`, returning the previously stored file.
    pub async fn replace_image(
        &self,
        id: i64,
        kind: ImageKind,
        path: &str,
    ) -> DatabaseResult<Option<String>> {
        let column = kind.column();
        let mut tx = self.pool.begin().await?;

        let previous: Option<Option<String>> =
            sqlx::query_scalar(&format!("SELECT {column} FROM users WHERE id = ?"))
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        let Some(previous) = previous else {
            return Err(DatabaseError::not_found("user"));
        };

        sqlx::query(&format!(
            "UPDATE users SET {column} = ?, updated_at = ? WHERE id = ?"
        ))
        .bind(path)
        .bind(timestamp())
        .bind(id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(previous)
    }

    /// Delete a user and return the removed row so callers can clean up files.
    pub async fn delete(&self, id: i64) -> DatabaseResult<User> {
        let mut tx = self.pool.begin().await?;

        let user = sqlx::query_as::<_, User>(&format!(
            "{USER_SELECT} WHERE u.id = ?"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| DatabaseError::not_found("user"))?;

        sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(user)
    }

    /// Users holding the `doctor` role, ordered by name.
    pub async fn list_doctors(&self, speciality_id: Option<i64>) -> DatabaseResult<Vec<User>> {
        let doctors = sqlx::query_as::<_, User>(&format!(
            "{USER_SELECT}
             JOIN user_roles ur ON ur.user_id = u.id
             JOIN roles r ON r.id = ur.role_id AND r.name = 'doctor'
             WHERE (?1 IS NULL OR EXISTS (
                    SELECT 1 FROM user_specialities us
                    WHERE us.user_id = u.id AND us.speciality_id = ?1))
             ORDER BY u.name, u.id"
        ))
        .bind(speciality_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(doctors)
    }

    pub async fn specialities_of(&self, user_id: i64) -> DatabaseResult<Vec<Speciality>> {
        let specialities = sqlx::query_as::<_, Speciality>(
            "SELECT s.id, s.public_id, s.name, s.description, s.sort_order, s.created_at, s.updated_at
             FROM specialities s
             JOIN user_specialities us ON us.speciality_id = s.id
             WHERE us.user_id = ?
             ORDER BY s.sort_order, s.name",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(specialities)
    }

    /// Replace every speciality of a user atomically.
    pub async fn replace_specialities(
        &self,
        user_id: i64,
        speciality_ids: &[i64],
    ) -> DatabaseResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM user_specialities WHERE user_id = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        for speciality_id in speciality_ids {
            sqlx::query(
                "INSERT OR IGNORE INTO user_specialities (user_id, speciality_id) VALUES (?, ?)",
            )
            .bind(user_id)
            .bind(speciality_id)
            .execute(&mut *tx)
            .await?;
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
