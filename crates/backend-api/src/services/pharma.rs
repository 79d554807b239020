use clinic_database::{
    DatabaseError, Manufacturer, NamedItem, NamedTable, PharmaCode, PharmaCodeFields,
    PharmaRepository,
};
use serde::Deserialize;
use sqlx::SqlitePool;
use utoipa::{IntoParams, ToSchema};

use super::access::{Caller, PHARMA_MANAGE};
use super::ServiceError;
use crate::validation::{clean, FieldErrors, MAX_NAME_LENGTH};

#[derive(Debug, Deserialize, ToSchema)]
pub struct NameRequest {
    pub name: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ManufacturerRequest {
    pub name: String,
    pub country: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CodeRequest {
    pub code: String,
    pub brand_id: String,
    pub manufacturer_id: String,
    pub medication_form_id: String,
    pub strength: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct CodeQuery {
    /// Brand public id.
    pub brand: Option<String>,
}

fn repo(pool: &SqlitePool) -> PharmaRepository {
    PharmaRepository::new(pool.clone())
}

fn duplicate(what: &'static str) -> impl Fn(DatabaseError) -> ServiceError {
    move |err| match err {
        DatabaseError::Duplicate(_) => ServiceError::conflict(format!("{what} already exists")),
        other => other.into(),
    }
}

fn checked_name(name: &str) -> Result<String, ServiceError> {
    let mut errors = FieldErrors::new();
    errors.required("name", "Name", name, MAX_NAME_LENGTH);
    errors.finish()?;
    Ok(name.trim().to_string())
}

fn title(table: NamedTable) -> &'static str {
    match table {
        NamedTable::Brands => "Brand",
        NamedTable::MedicationForms => "Medication form",
    }
}

// Brands and medication forms

pub async fn list_named(pool: &SqlitePool, table: NamedTable) -> Result<Vec<NamedItem>, ServiceError> {
    Ok(repo(pool).list_named(table).await?)
}

async fn find_named(
    pool: &SqlitePool,
    table: NamedTable,
    public_id: &str,
) -> Result<NamedItem, ServiceError> {
    repo(pool)
        .find_named(table, public_id)
        .await?
        .ok_or_else(|| ServiceError::not_found(format!("{} not found", title(table))))
}

pub async fn create_named(
    pool: &SqlitePool,
    caller: &Caller,
    table: NamedTable,
    req: NameRequest,
) -> Result<NamedItem, ServiceError> {
    caller.require(PHARMA_MANAGE)?;
    let name = checked_name(&req.name)?;
    repo(pool)
        .create_named(table, &name)
        .await
        .map_err(duplicate(title(table)))
}

pub async fn rename_named(
    pool: &SqlitePool,
    caller: &Caller,
    table: NamedTable,
    public_id: &str,
    req: NameRequest,
) -> Result<NamedItem, ServiceError> {
    caller.require(PHARMA_MANAGE)?;
    let item = find_named(pool, table, public_id).await?;
    let name = checked_name(&req.name)?;
    repo(pool)
        .rename_named(table, item.id, &name)
        .await
        .map_err(duplicate(title(table)))
}

pub async fn delete_named(
    pool: &SqlitePool,
    caller: &Caller,
    table: NamedTable,
    public_id: &str,
) -> Result<(), ServiceError> {
    caller.require(PHARMA_MANAGE)?;
    let item = find_named(pool, table, public_id).await?;
    Ok(repo(pool).delete_named(table, item.id).await?)
}

// Manufacturers

pub async fn list_manufacturers(pool: &SqlitePool) -> Result<Vec<Manufacturer>, ServiceError> {
    Ok(repo(pool).list_manufacturers().await?)
}

async fn find_manufacturer(pool: &SqlitePool, public_id: &str) -> Result<Manufacturer, ServiceError> {
    repo(pool)
        .find_manufacturer(public_id)
        .await?
        .ok_or_else(|| ServiceError::not_found("Manufacturer not found"))
}

pub async fn create_manufacturer(
    pool: &SqlitePool,
    caller: &Caller,
    req: ManufacturerRequest,
) -> Result<Manufacturer, ServiceError> {
    caller.require(PHARMA_MANAGE)?;
    let name = checked_name(&req.name)?;
    let country = clean(req.country.as_deref());
    repo(pool)
        .create_manufacturer(&name, country.as_deref())
        .await
        .map_err(duplicate("Manufacturer"))
}

pub async fn update_manufacturer(
    pool: &SqlitePool,
    caller: &Caller,
    public_id: &str,
    req: ManufacturerRequest,
) -> Result<Manufacturer, ServiceError> {
    caller.require(PHARMA_MANAGE)?;
    let manufacturer = find_manufacturer(pool, public_id).await?;
    let name = checked_name(&req.name)?;
    let country = clean(req.country.as_deref());
    repo(pool)
        .update_manufacturer(manufacturer.id, &name, country.as_deref())
        .await
        .map_err(duplicate("Manufacturer"))
}

pub async fn delete_manufacturer(
    pool: &SqlitePool,
    caller: &Caller,
    public_id: &str,
) -> Result<(), ServiceError> {
    caller.require(PHARMA_MANAGE)?;
    let manufacturer = find_manufacturer(pool, public_id).await?;
    Ok(repo(pool).delete_manufacturer(manufacturer.id).await?)
}

// Codes

pub async fn list_codes(pool: &SqlitePool, query: CodeQuery) -> Result<Vec<PharmaCode>, ServiceError> {
    let brand_id = match clean(query.brand.as_deref()) {
        Some(id) => Some(find_named(pool, NamedTable::Brands, &id).await?.id),
        None => None,
    };
    Ok(repo(pool).list_codes(brand_id).await?)
}

async fn find_code(pool: &SqlitePool, public_id: &str) -> Result<PharmaCode, ServiceError> {
    repo(pool)
        .find_code(public_id)
        .await?
        .ok_or_else(|| ServiceError::not_found("Code not found"))
}

/// Check the code and resolve every reference, reporting all missing ones.
async fn code_fields(pool: &SqlitePool, req: CodeRequest) -> Result<PharmaCodeFields, ServiceError> {
    let mut errors = FieldErrors::new();
    errors.required("code", "Code", &req.code, 64);
    errors.optional_text("strength", req.strength.as_deref(), 64);

    let pharma = repo(pool);
    let brand = pharma
        .find_named(NamedTable::Brands, req.brand_id.trim())
        .await?;
    if brand.is_none() {
        errors.add("brand_id", "Brand not found");
    }
    let form = pharma
        .find_named(NamedTable::MedicationForms, req.medication_form_id.trim())
        .await?;
    if form.is_none() {
        errors.add("medication_form_id", "Medication form not found");
    }
    let manufacturer = pharma.find_manufacturer(req.manufacturer_id.trim()).await?;
    if manufacturer.is_none() {
        errors.add("manufacturer_id", "Manufacturer not found");
    }
    errors.finish()?;

    match (brand, manufacturer, form) {
        (Some(brand), Some(manufacturer), Some(form)) => Ok(PharmaCodeFields {
            code: req.code.trim().to_string(),
            brand_id: brand.id,
            manufacturer_id: manufacturer.id,
            medication_form_id: form.id,
            strength: clean(req.strength.as_deref()),
        }),
        _ => Err(ServiceError::internal("pharma references vanished during validation")),
    }
}

pub async fn create_code(
    pool: &SqlitePool,
    caller: &Caller,
    req: CodeRequest,
) -> Result<PharmaCode, ServiceError> {
    caller.require(PHARMA_MANAGE)?;
    let fields = code_fields(pool, req).await?;
    repo(pool)
        .create_code(&fields)
        .await
        .map_err(duplicate("Code"))
}

pub async fn update_code(
    pool: &SqlitePool,
    caller: &Caller,
    public_id: &str,
    req: CodeRequest,
) -> Result<PharmaCode, ServiceError> {
    caller.require(PHARMA_MANAGE)?;
    let code = find_code(pool, public_id).await?;
    let fields = code_fields(pool, req).await?;
    repo(pool)
        .update_code(code.id, &fields)
        .await
        .map_err(duplicate("Code"))
}

pub async fn delete_code(pool: &SqlitePool, caller: &Caller, public_id: &str) -> Result<(), ServiceError> {
    caller.require(PHARMA_MANAGE)?;
    let code = find_code(pool, public_id).await?;
    Ok(repo(pool).delete_code(code.id).await?)
}
