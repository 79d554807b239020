//! Pharmacy catalogue: brands, medication forms, manufacturers and codes.

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Json,
};
use clinic_database::{Manufacturer, NamedItem, NamedTable, PharmaCode};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    routes::MessageResponse,
    services::pharma::{
        self as pharma_service, CodeQuery, CodeRequest, ManufacturerRequest, NameRequest,
    },
    util::require_bearer,
    ApiError, AppState,
};

#[derive(Debug, Serialize, ToSchema)]
pub struct NamedItemsResponse {
    pub success: bool,
    pub items: Vec<NamedItem>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct NamedItemResponse {
    pub success: bool,
    pub item: NamedItem,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ManufacturersResponse {
    pub success: bool,
    pub manufacturers: Vec<Manufacturer>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ManufacturerResponse {
    pub success: bool,
    pub manufacturer: Manufacturer,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CodesResponse {
    pub success: bool,
    pub codes: Vec<PharmaCode>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CodeResponse {
    pub success: bool,
    pub code: PharmaCode,
}

async fn list_named(
    state: &AppState,
    table: NamedTable,
) -> Result<Json<NamedItemsResponse>, ApiError> {
    let items = pharma_service::list_named(state.db_pool(), table).await?;
    Ok(Json(NamedItemsResponse {
        success: true,
        items,
    }))
}

async fn create_named(
    state: &AppState,
    headers: &HeaderMap,
    table: NamedTable,
    req: NameRequest,
) -> Result<Json<NamedItemResponse>, ApiError> {
    let token = require_bearer(headers)?;
    let caller = state.caller(&token).await?;

    let item = pharma_service::create_named(state.db_pool(), &caller, table, req).await?;
    Ok(Json(NamedItemResponse {
        success: true,
        item,
    }))
}

async fn rename_named(
    state: &AppState,
    headers: &HeaderMap,
    table: NamedTable,
    id: &str,
    req: NameRequest,
) -> Result<Json<NamedItemResponse>, ApiError> {
    let token = require_bearer(headers)?;
    let caller = state.caller(&token).await?;

    let item = pharma_service::rename_named(state.db_pool(), &caller, table, id, req).await?;
    Ok(Json(NamedItemResponse {
        success: true,
        item,
    }))
}

async fn delete_named(
    state: &AppState,
    headers: &HeaderMap,
    table: NamedTable,
    id: &str,
) -> Result<Json<MessageResponse>, ApiError> {
    let token = require_bearer(headers)?;
    let caller = state.caller(&token).await?;

    pharma_service::delete_named(state.db_pool(), &caller, table, id).await?;
    Ok(Json(MessageResponse::ok("Deleted")))
}

// Brands

#[utoipa::path(
    get,
    path = "/api/pharma/brands",
    tag = "Pharma",
    responses((status = 200, description = "Brands", body = NamedItemsResponse))
)]
pub async fn list_brands(
    State(state): State<AppState>,
) -> Result<Json<NamedItemsResponse>, ApiError> {
    list_named(&state, NamedTable::Brands).await
}

#[utoipa::path(
    post,
    path = "/api/pharma/brands",
    tag = "Pharma",
    security(("bearerAuth" = [])),
    request_body = NameRequest,
    responses(
        (status = 200, description = "Brand created", body = NamedItemResponse),
        (status = 403, description = "Permission denied", body = crate::error::ErrorResponse),
        (status = 409, description = "Brand already exists", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_brand(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<NameRequest>,
) -> Result<Json<NamedItemResponse>, ApiError> {
    create_named(&state, &headers, NamedTable::Brands, req).await
}

#[utoipa::path(
    put,
    path = "/api/pharma/brands/{brand_id}",
    tag = "Pharma",
    security(("bearerAuth" = [])),
    params(("brand_id" = String, Path, description = "Brand public identifier")),
    request_body = NameRequest,
    responses(
        (status = 200, description = "Brand renamed", body = NamedItemResponse),
        (status = 404, description = "Brand not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_brand(
    State(state): State<AppState>,
    Path(brand_id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<NameRequest>,
) -> Result<Json<NamedItemResponse>, ApiError> {
    rename_named(&state, &headers, NamedTable::Brands, &brand_id, req).await
}

#[utoipa::path(
    delete,
    path = "/api/pharma/brands/{brand_id}",
    tag = "Pharma",
    security(("bearerAuth" = [])),
    params(("brand_id" = String, Path, description = "Brand public identifier")),
    responses(
        (status = 200, description = "Brand deleted", body = MessageResponse),
        (status = 409, description = "Record is still in use", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_brand(
    State(state): State<AppState>,
    Path(brand_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<MessageResponse>, ApiError> {
    delete_named(&state, &headers, NamedTable::Brands, &brand_id).await
}

// Medication forms

#[utoipa::path(
    get,
    path = "/api/pharma/medication-forms",
    tag = "Pharma",
    responses((status = 200, description = "Medication forms", body = NamedItemsResponse))
)]
pub async fn list_medication_forms(
    State(state): State<AppState>,
) -> Result<Json<NamedItemsResponse>, ApiError> {
    list_named(&state, NamedTable::MedicationForms).await
}

#[utoipa::path(
    post,
    path = "/api/pharma/medication-forms",
    tag = "Pharma",
    security(("bearerAuth" = [])),
    request_body = NameRequest,
    responses(
        (status = 200, description = "Medication form created", body = NamedItemResponse),
        (status = 403, description = "Permission denied", body = crate::error::ErrorResponse),
        (status = 409, description = "Medication form already exists", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_medication_form(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<NameRequest>,
) -> Result<Json<NamedItemResponse>, ApiError> {
    create_named(&state, &headers, NamedTable::MedicationForms, req).await
}

#[utoipa::path(
    put,
    path = "/api/pharma/medication-forms/{form_id}",
    tag = "Pharma",
    security(("bearerAuth" = [])),
    params(("form_id" = String, Path, description = "Medication form public identifier")),
    request_body = NameRequest,
    responses(
        (status = 200, description = "Medication form renamed", body = NamedItemResponse),
        (status = 404, description = "Medication form not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_medication_form(
    State(state): State<AppState>,
    Path(form_id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<NameRequest>,
) -> Result<Json<NamedItemResponse>, ApiError> {
    rename_named(&state, &headers, NamedTable::MedicationForms, &form_id, req).await
}

#[utoipa::path(
    delete,
    path = "/api/pharma/medication-forms/{form_id}",
    tag = "Pharma",
    security(("bearerAuth" = [])),
    params(("form_id" = String, Path, description = "Medication form public identifier")),
    responses(
        (status = 200, description = "Medication form deleted", body = MessageResponse),
        (status = 409, description = "Record is still in use", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_medication_form(
    State(state): State<AppState>,
    Path(form_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<MessageResponse>, ApiError> {
    delete_named(&state, &headers, NamedTable::MedicationForms, &form_id).await
}

// Manufacturers

#[utoipa::path(
    get,
    path = "/api/pharma/manufacturers",
    tag = "Pharma",
    responses((status = 200, description = "Manufacturers", body = ManufacturersResponse))
)]
pub async fn list_manufacturers(
    State(state): State<AppState>,
) -> Result<Json<ManufacturersResponse>, ApiError> {
    let manufacturers = pharma_service::list_manufacturers(state.db_pool()).await?;
    Ok(Json(ManufacturersResponse {
        success: true,
        manufacturers,
    }))
}

#[utoipa::path(
    post,
    path = "/api/pharma/manufacturers",
    tag = "Pharma",
    security(("bearerAuth" = [])),
    request_body = ManufacturerRequest,
    responses(
        (status = 200, description = "Manufacturer created", body = ManufacturerResponse),
        (status = 403, description = "Permission denied", body = crate::error::ErrorResponse),
        (status = 409, description = "Manufacturer already exists", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_manufacturer(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<ManufacturerRequest>,
) -> Result<Json<ManufacturerResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let caller = state.caller(&token).await?;

    let manufacturer = pharma_service::create_manufacturer(state.db_pool(), &caller, req).await?;
    Ok(Json(ManufacturerResponse {
        success: true,
        manufacturer,
    }))
}

#[utoipa::path(
    put,
    path = "/api/pharma/manufacturers/{manufacturer_id}",
    tag = "Pharma",
    security(("bearerAuth" = [])),
    params(("manufacturer_id" = String, Path, description = "Manufacturer public identifier")),
    request_body = ManufacturerRequest,
    responses(
        (status = 200, description = "Manufacturer updated", body = ManufacturerResponse),
        (status = 404, description = "Manufacturer not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_manufacturer(
    State(state): State<AppState>,
    Path(manufacturer_id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<ManufacturerRequest>,
) -> Result<Json<ManufacturerResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let caller = state.caller(&token).await?;

    let manufacturer =
        pharma_service::update_manufacturer(state.db_pool(), &caller, &manufacturer_id, req)
            .await?;
    Ok(Json(ManufacturerResponse {
        success: true,
        manufacturer,
    }))
}

#[utoipa::path(
    delete,
    path = "/api/pharma/manufacturers/{manufacturer_id}",
    tag = "Pharma",
    security(("bearerAuth" = [])),
    params(("manufacturer_id" = String, Path, description = "Manufacturer public identifier")),
    responses(
        (status = 200, description = "Manufacturer deleted", body = MessageResponse),
        (status = 409, description = "Record is still in use", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_manufacturer(
    State(state): State<AppState>,
    Path(manufacturer_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<MessageResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let caller = state.caller(&token).await?;

    pharma_service::delete_manufacturer(state.db_pool(), &caller, &manufacturer_id).await?;
    Ok(Json(MessageResponse::ok("Manufacturer deleted")))
}

// Codes

#[utoipa::path(
    get,
    path = "/api/pharma/codes",
    tag = "Pharma",
    params(CodeQuery),
    responses(
        (status = 200, description = "Codes, optionally for one brand", body = CodesResponse),
        (status = 404, description = "Brand not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_codes(
    State(state): State<AppState>,
    Query(query): Query<CodeQuery>,
) -> Result<Json<CodesResponse>, ApiError> {
    let codes = pharma_service::list_codes(state.db_pool(), query).await?;
    Ok(Json(CodesResponse {
        success: true,
        codes,
    }))
}

#[utoipa::path(
    post,
    path = "/api/pharma/codes",
    tag = "Pharma",
    security(("bearerAuth" = [])),
    request_body = CodeRequest,
    responses(
        (status = 200, description = "Code created", body = CodeResponse),
        (status = 409, description = "Code already exists", body = crate::error::ErrorResponse),
        (status = 422, description = "Invalid fields or unknown references", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_code(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CodeRequest>,
) -> Result<Json<CodeResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let caller = state.caller(&token).await?;

    let code = pharma_service::create_code(state.db_pool(), &caller, req).await?;
    Ok(Json(CodeResponse {
        success: true,
        code,
    }))
}

#[utoipa::path(
    put,
    path = "/api/pharma/codes/{code_id}",
    tag = "Pharma",
    security(("bearerAuth" = [])),
    params(("code_id" = String, Path, description = "Code public identifier")),
    request_body = CodeRequest,
    responses(
        (status = 200, description = "Code updated", body = CodeResponse),
        (status = 404, description = "Code not found", body = crate::error::ErrorResponse),
        (status = 422, description = "Invalid fields or unknown references", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_code(
    State(state): State<AppState>,
    Path(code_id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<CodeRequest>,
) -> Result<Json<CodeResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let caller = state.caller(&token).await?;

    let code = pharma_service::update_code(state.db_pool(), &caller, &code_id, req).await?;
    Ok(Json(CodeResponse {
        success: true,
        code,
    }))
}

#[utoipa::path(
    delete,
    path = "/api/pharma/codes/{code_id}",
    tag = "Pharma",
    security(("bearerAuth" = [])),
    params(("code_id" = String, Path, description = "Code public identifier")),
    responses(
        (status = 200, description = "Code deleted", body = MessageResponse),
        (status = 404, description = "Code not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_code(
    State(state): State<AppState>,
    Path(code_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<MessageResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let caller = state.caller(&token).await?;

    pharma_service::delete_code(state.db_pool(), &caller, &code_id).await?;
    Ok(Json(MessageResponse::ok("Code deleted")))
}
