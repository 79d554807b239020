use clinic_database::{
    DatabaseError, DoctorProfileChanges, ImageKind, NewUser, ReferenceRepository, RoleRepository,
    Speciality, UnitKind, User, UserChanges, UserFilter, UserRepository,
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::info;
use utoipa::{IntoParams, ToSchema};

use super::access::{Caller, DOCTOR_ROLE, PATIENT_ROLE, ROLES_MANAGE, USERS_MANAGE};
use super::{files, ServiceError};
use crate::validation::{clean, trimmed, FieldErrors, MAX_NAME_LENGTH, MAX_TEXT_LENGTH};
use crate::AppState;

#[derive(Debug, Deserialize, IntoParams)]
pub struct UserQuery {
    /// Only users holding this role.
    pub role: Option<String>,
    /// Case-insensitive match on name or email.
    pub search: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
    pub password: Option<String>,
    pub phone: Option<String>,
    /// Defaults to `patient`.
    #[serde(default)]
    pub roles: Vec<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SetRolesRequest {
    pub roles: Vec<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct DoctorQuery {
    /// Speciality public id.
    pub speciality: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct DoctorProfileRequest {
    pub title: Option<String>,
    pub bio: Option<String>,
    pub experience_years: Option<i64>,
    /// Minor currency units.
    pub consultation_fee: Option<i64>,
    pub hospital_id: Option<String>,
    pub department_id: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SetSpecialitiesRequest {
    pub speciality_ids: Vec<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserDetail {
    pub user: User,
    pub roles: Vec<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Doctor {
    pub user: User,
    pub specialities: Vec<Speciality>,
}

pub async fn list_users(
    pool: &SqlitePool,
    caller: &Caller,
    query: UserQuery,
) -> Result<Vec<User>, ServiceError> {
    caller.require(USERS_MANAGE)?;
    let filter = UserFilter {
        role: clean(query.role.as_deref()),
        search: clean(query.search.as_deref()),
    };
    Ok(UserRepository::new(pool.clone()).list(&filter).await?)
}

pub async fn get_user(
    pool: &SqlitePool,
    caller: &Caller,
    public_id: &str,
) -> Result<UserDetail, ServiceError> {
    let user = find_user(pool, public_id).await?;
    caller.require_self_or(user.id, USERS_MANAGE)?;
    detail(pool, user).await
}

/// Accounts created by an administrator skip email verification.
pub async fn create_user(
    pool: &SqlitePool,
    caller: &Caller,
    req: CreateUserRequest,
) -> Result<UserDetail, ServiceError> {
    caller.require(USERS_MANAGE)?;

    let mut errors = FieldErrors::new();
    errors.required("name", "Name", &req.name, MAX_NAME_LENGTH);
    errors.email("email", &req.email);
    if let Some(password) = &req.password {
        errors.password("password", password);
    }
    errors.optional_text("phone", req.phone.as_deref(), 40);
    errors.finish()?;

    let users = UserRepository::new(pool.clone());
    let email = clinic_auth::normalize_email(&req.email);
    if users.find_by_email(&email).await?.is_some() {
        return Err(ServiceError::conflict("Email already in use"));
    }

    let password_hash = match &req.password {
        Some(password) => Some(clinic_auth::hash_password(password)?),
        None => None,
    };

    let roles: Vec<&str> = if req.roles.is_empty() {
        vec![PATIENT_ROLE]
    } else {
        req.roles.iter().map(String::as_str).collect()
    };

    let new_user = NewUser {
        name: req.name.trim().to_string(),
        email,
        password_hash,
        phone: clean(req.phone.as_deref()),
        verified: true,
    };

    let user = users.create(&new_user, &roles).await.map_err(|err| match err {
        DatabaseError::NotFound(_) => ServiceError::invalid("roles", "Unknown role"),
        DatabaseError::Duplicate(_) => ServiceError::conflict("Email already in use"),
        other => other.into(),
    })?;

    info!(user = %user.public_id, by = %caller.user.public_id, "user created");
    detail(pool, user).await
}

pub async fn update_user(
    pool: &SqlitePool,
    caller: &Caller,
    public_id: &str,
    req: UpdateUserRequest,
) -> Result<UserDetail, ServiceError> {
    caller.require(USERS_MANAGE)?;
    let user = find_user(pool, public_id).await?;

    let mut errors = FieldErrors::new();
    if let Some(name) = &req.name {
        errors.required("name", "Name", name, MAX_NAME_LENGTH);
    }
    if let Some(email) = &req.email {
        errors.email("email", email);
    }
    errors.optional_text("phone", req.phone.as_deref(), 40);
    errors.finish()?;

    let users = UserRepository::new(pool.clone());
    let email = req.email.as_deref().map(clinic_auth::normalize_email);
    if let Some(email) = &email {
        if let Some(other) = users.find_by_email(email).await? {
            if other.id != user.id {
                return Err(ServiceError::conflict("Email already in use"));
            }
        }
    }

    let changes = UserChanges {
        name: req.name.map(|name| name.trim().to_string()),
        email,
        phone: trimmed(req.phone.as_deref()),
    };
    let user = users.update(user.id, &changes).await?;
    detail(pool, user).await
}

/// Delete a user, then remove their stored avatar and cover.
pub async fn delete_user(
    state: &AppState,
    caller: &Caller,
    public_id: &str,
) -> Result<(), ServiceError> {
    caller.require(USERS_MANAGE)?;
    let user = find_user(state.db_pool(), public_id).await?;
    if user.id == caller.id() {
        return Err(ServiceError::restricted("You cannot delete your own account"));
    }

    let deleted = UserRepository::new(state.db_pool().clone())
        .delete(user.id)
        .await?;
    files::remove_all(state.files(), &deleted.stored_files()).await;

    info!(user = %deleted.public_id, by = %caller.user.public_id, "user deleted");
    Ok(())
}

pub async fn update_profile(
    pool: &SqlitePool,
    caller: &Caller,
    req: UpdateProfileRequest,
) -> Result<User, ServiceError> {
    let mut errors = FieldErrors::new();
    if let Some(name) = &req.name {
        errors.required("name", "Name", name, MAX_NAME_LENGTH);
    }
    errors.optional_text("phone", req.phone.as_deref(), 40);
    errors.finish()?;

    let changes = UserChanges {
        name: req.name.map(|name| name.trim().to_string()),
        email: None,
        phone: trimmed(req.phone.as_deref()),
    };
    Ok(UserRepository::new(pool.clone())
        .update(caller.id(), &changes)
        .await?)
}

/// Store a new avatar or cover for the caller and drop the one it replaces.
pub async fn upload_image(
    state: &AppState,
    caller: &Caller,
    kind: ImageKind,
    content_type: Option<&str>,
    bytes: &[u8],
) -> Result<User, ServiceError> {
    let extension = content_type
        .and_then(files::image_extension)
        .ok_or_else(|| ServiceError::invalid("file", "Only PNG, JPEG, WEBP or GIF images are allowed"))?;

    let limit = state.config().uploads.max_file_bytes;
    if bytes.is_empty() {
        return Err(ServiceError::invalid("file", "File is empty"));
    }
    if bytes.len() as u64 > limit {
        return Err(ServiceError::invalid(
            "file",
            format!("File must be at most {limit} bytes"),
        ));
    }

    let folder = match kind {
        ImageKind::Avatar => "avatars",
        ImageKind::Cover => "covers",
    };
    let stored = state.files().save(folder, extension, bytes).await?;

    let users = UserRepository::new(state.db_pool().clone());
    let previous = match users.replace_image(caller.id(), kind, &stored).await {
        Ok(previous) => previous,
        Err(err) => {
            files::remove_all(state.files(), &[stored]).await;
            return Err(err.into());
        }
    };
    if let Some(previous) = previous {
        files::remove_all(state.files(), &[previous]).await;
    }

    users
        .find_by_id(caller.id())
        .await?
        .ok_or_else(|| ServiceError::not_found("User not found"))
}

pub async fn set_roles(
    pool: &SqlitePool,
    caller: &Caller,
    public_id: &str,
    req: SetRolesRequest,
) -> Result<UserDetail, ServiceError> {
    caller.require(ROLES_MANAGE)?;
    let user = find_user(pool, public_id).await?;

    RoleRepository::new(pool.clone())
        .set_user_roles(user.id, &req.roles)
        .await
        .map_err(|err| match err {
            DatabaseError::NotFound(_) => ServiceError::invalid("roles", "Unknown role"),
            other => other.into(),
        })?;

    info!(user = %user.public_id, roles = ?req.roles, "roles updated");
    detail(pool, user).await
}

pub async fn list_doctors(pool: &SqlitePool, query: DoctorQuery) -> Result<Vec<Doctor>, ServiceError> {
    let speciality_id = match clean(query.speciality.as_deref()) {
        Some(public_id) => Some(
            ReferenceRepository::new(pool.clone())
                .find_speciality(&public_id)
                .await?
                .ok_or_else(|| ServiceError::not_found("Speciality not found"))?
                .id,
        ),
        None => None,
    };

    let users = UserRepository::new(pool.clone());
    let mut doctors = Vec::new();
    for user in users.list_doctors(speciality_id).await? {
        let specialities = users.specialities_of(user.id).await?;
        doctors.push(Doctor { user, specialities });
    }
    Ok(doctors)
}

pub async fn update_doctor_profile(
    pool: &SqlitePool,
    caller: &Caller,
    public_id: &str,
    req: DoctorProfileRequest,
) -> Result<Doctor, ServiceError> {
    let doctor = find_doctor(pool, public_id).await?;
    caller.require_self_or(doctor.id, USERS_MANAGE)?;

    let mut errors = FieldErrors::new();
    errors.optional_text("title", req.title.as_deref(), MAX_NAME_LENGTH);
    errors.optional_text("bio", req.bio.as_deref(), MAX_TEXT_LENGTH);
    errors.non_negative("experience_years", req.experience_years);
    errors.non_negative("consultation_fee", req.consultation_fee);
    errors.finish()?;

    let reference = ReferenceRepository::new(pool.clone());
    let hospital_id = match clean(req.hospital_id.as_deref()) {
        Some(id) => Some(
            reference
                .find_hospital(&id)
                .await?
                .ok_or_else(|| ServiceError::invalid("hospital_id", "Hospital not found"))?
                .id,
        ),
        None => None,
    };

    // A department always sits in the doctor's hospital: choosing one fills
    // in its hospital, moving hospitals drops the old department.
    let mut hospital_id = hospital_id;
    let department_id = match clean(req.department_id.as_deref()) {
        Some(id) => {
            let department = reference
                .find_unit(UnitKind::Department, &id)
                .await?
                .ok_or_else(|| ServiceError::invalid("department_id", "Department not found"))?;
            let hospital = hospital_id.or(doctor.hospital_id);
            if hospital.is_some_and(|hospital| hospital != department.hospital_id) {
                return Err(ServiceError::invalid(
                    "department_id",
                    "Department belongs to another hospital",
                ));
            }
            hospital_id = Some(department.hospital_id);
            Some(department.id)
        }
        None => None,
    };
    let clear_department = department_id.is_none()
        && doctor.department_id.is_some()
        && hospital_id.is_some_and(|hospital| Some(hospital) != doctor.hospital_id);

    let changes = DoctorProfileChanges {
        title: trimmed(req.title.as_deref()),
        bio: trimmed(req.bio.as_deref()),
        experience_years: req.experience_years,
        consultation_fee: req.consultation_fee,
        hospital_id,
        department_id,
        clear_department,
    };

    let users = UserRepository::new(pool.clone());
    let user = users.update_doctor_profile(doctor.id, &changes).await?;
    let specialities = users.specialities_of(user.id).await?;
    Ok(Doctor { user, specialities })
}

/// Replace every speciality of a doctor in one transaction.
pub async fn set_specialities(
    pool: &SqlitePool,
    caller: &Caller,
    public_id: &str,
    req: SetSpecialitiesRequest,
) -> Result<Doctor, ServiceError> {
    let doctor = find_doctor(pool, public_id).await?;
    caller.require_self_or(doctor.id, USERS_MANAGE)?;

    let ids = ReferenceRepository::new(pool.clone())
        .resolve_speciality_ids(&req.speciality_ids)
        .await
        .map_err(|err| match err {
            DatabaseError::NotFound(_) => {
                ServiceError::invalid("speciality_ids", "Unknown speciality")
            }
            other => other.into(),
        })?;

    let users = UserRepository::new(pool.clone());
    users.replace_specialities(doctor.id, &ids).await?;
    let specialities = users.specialities_of(doctor.id).await?;
    Ok(Doctor {
        user: doctor,
        specialities,
    })
}

pub(crate) async fn find_user(pool: &SqlitePool, public_id: &str) -> Result<User, ServiceError> {
    UserRepository::new(pool.clone())
        .find_by_public_id(public_id)
        .await?
        .ok_or_else(|| ServiceError::not_found("User not found"))
}

/// A user holding the doctor role.
pub(crate) async fn find_doctor(pool: &SqlitePool, public_id: &str) -> Result<User, ServiceError> {
    let user = UserRepository::new(pool.clone())
        .find_by_public_id(public_id)
        .await?;
    match user {
        Some(user) if RoleRepository::new(pool.clone()).has_role(user.id, DOCTOR_ROLE).await? => {
            Ok(user)
        }
        _ => Err(ServiceError::not_found("Doctor not found")),
    }
}

async fn detail(pool: &SqlitePool, user: User) -> Result<UserDetail, ServiceError> {
    let roles = RoleRepository::new(pool.clone()).role_names(user.id).await?;
    Ok(UserDetail { user, roles })
}
