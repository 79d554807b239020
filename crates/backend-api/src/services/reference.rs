//! Hospitals, departments, facilities and specialities.
//!
//! Reads are public; writes require `reference.manage`.

use clinic_database::{
    DatabaseError, Hospital, HospitalFields, HospitalUnit, HospitalUnitFields,
    ReferenceRepository, SortableTable, Speciality, SpecialityFields, UnitKind,
};
use serde::Deserialize;
use sqlx::SqlitePool;
use tracing::info;
use utoipa::{IntoParams, ToSchema};

use super::access::{Caller, REFERENCE_MANAGE};
use super::{files, ServiceError};
use crate::validation::{clean, is_email, FieldErrors, MAX_NAME_LENGTH, MAX_TEXT_LENGTH};
use crate::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct HospitalRequest {
    pub name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UnitRequest {
    pub hospital_id: String,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SpecialityRequest {
    pub name: String,
    pub description: Option<String>,
}

/// Public ids in their new display order.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ReorderRequest {
    pub ids: Vec<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct UnitQuery {
    /// Hospital public id.
    pub hospital: Option<String>,
}

fn repo(pool: &SqlitePool) -> ReferenceRepository {
    ReferenceRepository::new(pool.clone())
}

fn duplicate(what: &'static str) -> impl Fn(DatabaseError) -> ServiceError {
    move |err| match err {
        DatabaseError::Duplicate(_) => ServiceError::conflict(format!("{what} already exists")),
        other => other.into(),
    }
}

fn in_use(what: &'static str) -> impl Fn(DatabaseError) -> ServiceError {
    move |err| match err {
        DatabaseError::Constraint(_) => ServiceError::conflict(format!("{what} is still in use")),
        other => other.into(),
    }
}

pub async fn reorder(
    pool: &SqlitePool,
    caller: &Caller,
    table: SortableTable,
    req: ReorderRequest,
) -> Result<(), ServiceError> {
    caller.require(REFERENCE_MANAGE)?;
    repo(pool)
        .reorder(table, &req.ids)
        .await
        .map_err(|err| match err {
            DatabaseError::NotFound(_) => ServiceError::invalid("ids", "Unknown id in order"),
            other => other.into(),
        })?;
    info!(table = table.table(), count = req.ids.len(), "reordered");
    Ok(())
}

// Hospitals

pub async fn list_hospitals(pool: &SqlitePool) -> Result<Vec<Hospital>, ServiceError> {
    Ok(repo(pool).list_hospitals().await?)
}

pub async fn get_hospital(pool: &SqlitePool, public_id: &str) -> Result<Hospital, ServiceError> {
    repo(pool)
        .find_hospital(public_id)
        .await?
        .ok_or_else(|| ServiceError::not_found("Hospital not found"))
}

fn hospital_fields(req: HospitalRequest) -> Result<HospitalFields, ServiceError> {
    let mut errors = FieldErrors::new();
    errors.required("name", "Name", &req.name, MAX_NAME_LENGTH);
    errors.optional_text("address", req.address.as_deref(), MAX_TEXT_LENGTH);
    errors.optional_text("phone", req.phone.as_deref(), 40);
    errors.optional_text("description", req.description.as_deref(), MAX_TEXT_LENGTH);
    let email = clean(req.email.as_deref());
    if email.as_deref().is_some_and(|email| !is_email(email)) {
        errors.add("email", "Invalid email address");
    }
    errors.finish()?;

    Ok(HospitalFields {
        name: req.name.trim().to_string(),
        address: clean(req.address.as_deref()),
        phone: clean(req.phone.as_deref()),
        email,
        description: clean(req.description.as_deref()),
    })
}

pub async fn create_hospital(
    pool: &SqlitePool,
    caller: &Caller,
    req: HospitalRequest,
) -> Result<Hospital, ServiceError> {
    caller.require(REFERENCE_MANAGE)?;
    let fields = hospital_fields(req)?;
    repo(pool)
        .create_hospital(&fields)
        .await
        .map_err(duplicate("Hospital"))
}

pub async fn update_hospital(
    pool: &SqlitePool,
    caller: &Caller,
    public_id: &str,
    req: HospitalRequest,
) -> Result<Hospital, ServiceError> {
    caller.require(REFERENCE_MANAGE)?;
    let hospital = get_hospital(pool, public_id).await?;
    let fields = hospital_fields(req)?;
    repo(pool)
        .update_hospital(hospital.id, &fields)
        .await
        .map_err(duplicate("Hospital"))
}

/// Delete a hospital and its stored logo, if one was recorded outside the API.
pub async fn delete_hospital(
    state: &AppState,
    caller: &Caller,
    public_id: &str,
) -> Result<(), ServiceError> {
    caller.require(REFERENCE_MANAGE)?;
    let hospital = get_hospital(state.db_pool(), public_id).await?;
    repo(state.db_pool())
        .delete_hospital(hospital.id)
        .await
        .map_err(in_use("Hospital"))?;

    if let Some(logo) = hospital.logo {
        files::remove_all(state.files(), &[logo]).await;
    }
    info!(hospital = %hospital.public_id, "hospital deleted");
    Ok(())
}

// Departments and facilities

pub async fn list_units(
    pool: &SqlitePool,
    kind: UnitKind,
    query: UnitQuery,
) -> Result<Vec<HospitalUnit>, ServiceError> {
    let hospital_id = match clean(query.hospital.as_deref()) {
        Some(id) => Some(get_hospital(pool, &id).await?.id),
        None => None,
    };
    Ok(repo(pool).list_units(kind, hospital_id).await?)
}

pub async fn get_unit(
    pool: &SqlitePool,
    kind: UnitKind,
    public_id: &str,
) -> Result<HospitalUnit, ServiceError> {
    repo(pool)
        .find_unit(kind, public_id)
        .await?
        .ok_or_else(|| ServiceError::not_found(format!("{} not found", capitalized(kind))))
}

async fn unit_fields(pool: &SqlitePool, req: UnitRequest) -> Result<HospitalUnitFields, ServiceError> {
    let mut errors = FieldErrors::new();
    errors.required("name", "Name", &req.name, MAX_NAME_LENGTH);
    errors.optional_text("description", req.description.as_deref(), MAX_TEXT_LENGTH);
    if req.hospital_id.trim().is_empty() {
        errors.add("hospital_id", "Hospital is required");
    }
    errors.finish()?;

    let hospital = repo(pool)
        .find_hospital(req.hospital_id.trim())
        .await?
        .ok_or_else(|| ServiceError::invalid("hospital_id", "Hospital not found"))?;

    Ok(HospitalUnitFields {
        hospital_id: hospital.id,
        name: req.name.trim().to_string(),
        description: clean(req.description.as_deref()),
    })
}

pub async fn create_unit(
    pool: &SqlitePool,
    caller: &Caller,
    kind: UnitKind,
    req: UnitRequest,
) -> Result<HospitalUnit, ServiceError> {
    caller.require(REFERENCE_MANAGE)?;
    let fields = unit_fields(pool, req).await?;
    repo(pool)
        .create_unit(kind, &fields)
        .await
        .map_err(duplicate(capitalized(kind)))
}

pub async fn update_unit(
    pool: &SqlitePool,
    caller: &Caller,
    kind: UnitKind,
    public_id: &str,
    req: UnitRequest,
) -> Result<HospitalUnit, ServiceError> {
    caller.require(REFERENCE_MANAGE)?;
    let unit = get_unit(pool, kind, public_id).await?;
    let fields = unit_fields(pool, req).await?;
    repo(pool)
        .update_unit(kind, unit.id, &fields)
        .await
        .map_err(duplicate(capitalized(kind)))
}

pub async fn delete_unit(
    pool: &SqlitePool,
    caller: &Caller,
    kind: UnitKind,
    public_id: &str,
) -> Result<(), ServiceError> {
    caller.require(REFERENCE_MANAGE)?;
    let unit = get_unit(pool, kind, public_id).await?;
    repo(pool)
        .delete_unit(kind, unit.id)
        .await
        .map_err(in_use(capitalized(kind)))
}

fn capitalized(kind: UnitKind) -> &'static str {
    match kind {
        UnitKind::Department => "Department",
        UnitKind::Facility => "Facility",
    }
}

// Specialities

pub async fn list_specialities(pool: &SqlitePool) -> Result<Vec<Speciality>, ServiceError> {
    Ok(repo(pool).list_specialities().await?)
}

pub async fn get_speciality(pool: &SqlitePool, public_id: &str) -> Result<Speciality, ServiceError> {
    repo(pool)
        .find_speciality(public_id)
        .await?
        .ok_or_else(|| ServiceError::not_found("Speciality not found"))
}

fn speciality_fields(req: SpecialityRequest) -> Result<SpecialityFields, ServiceError> {
    let mut errors = FieldErrors::new();
    errors.required("name", "Name", &req.name, MAX_NAME_LENGTH);
    errors.optional_text("description", req.description.as_deref(), MAX_TEXT_LENGTH);
    errors.finish()?;

    Ok(SpecialityFields {
        name: req.name.trim().to_string(),
        description: clean(req.description.as_deref()),
    })
}

pub async fn create_speciality(
    pool: &SqlitePool,
    caller: &Caller,
    req: SpecialityRequest,
) -> Result<Speciality, ServiceError> {
    caller.require(REFERENCE_MANAGE)?;
    let fields = speciality_fields(req)?;
    repo(pool)
        .create_speciality(&fields)
        .await
        .map_err(duplicate("Speciality"))
}

pub async fn update_speciality(
    pool: &SqlitePool,
    caller: &Caller,
    public_id: &str,
    req: SpecialityRequest,
) -> Result<Speciality, ServiceError> {
    caller.require(REFERENCE_MANAGE)?;
    let speciality = get_speciality(pool, public_id).await?;
    let fields = speciality_fields(req)?;
    repo(pool)
        .update_speciality(speciality.id, &fields)
        .await
        .map_err(duplicate("Speciality"))
}

pub async fn delete_speciality(
    pool: &SqlitePool,
    caller: &Caller,
    public_id: &str,
) -> Result<(), ServiceError> {
    caller.require(REFERENCE_MANAGE)?;
    let speciality = get_speciality(pool, public_id).await?;
    repo(pool)
        .delete_speciality(speciality.id)
        .await
        .map_err(in_use("Speciality"))
}
