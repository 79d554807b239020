//! Hospitals, departments, facilities and specialities.

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Json,
};
use clinic_database::{Hospital, HospitalUnit, SortableTable, Speciality, UnitKind};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    routes::MessageResponse,
    services::reference::{
        self as reference_service, HospitalRequest, ReorderRequest, SpecialityRequest,
        UnitQuery, UnitRequest,
    },
    util::require_bearer,
    ApiError, AppState,
};

#[derive(Debug, Serialize, ToSchema)]
pub struct HospitalsResponse {
    pub success: bool,
    pub hospitals: Vec<Hospital>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HospitalResponse {
    pub success: bool,
    pub hospital: Hospital,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UnitsResponse {
    pub success: bool,
    pub units: Vec<HospitalUnit>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UnitResponse {
    pub success: bool,
    pub unit: HospitalUnit,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SpecialitiesResponse {
    pub success: bool,
    pub specialities: Vec<Speciality>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SpecialityResponse {
    pub success: bool,
    pub speciality: Speciality,
}

async fn reorder(
    state: &AppState,
    headers: &HeaderMap,
    table: SortableTable,
    req: ReorderRequest,
) -> Result<Json<MessageResponse>, ApiError> {
    let token = require_bearer(headers)?;
    let caller = state.caller(&token).await?;

    reference_service::reorder(state.db_pool(), &caller, table, req).await?;
    Ok(Json(MessageResponse::ok("Order saved")))
}

// Hospitals

#[utoipa::path(
    get,
    path = "/api/hospitals",
    tag = "Reference",
    responses((status = 200, description = "Hospitals in display order", body = HospitalsResponse))
)]
pub async fn list_hospitals(
    State(state): State<AppState>,
) -> Result<Json<HospitalsResponse>, ApiError> {
    let hospitals = reference_service::list_hospitals(state.db_pool()).await?;
    Ok(Json(HospitalsResponse {
        success: true,
        hospitals,
    }))
}

#[utoipa::path(
    get,
    path = "/api/hospitals/{hospital_id}",
    tag = "Reference",
    params(("hospital_id" = String, Path, description = "Hospital public identifier")),
    responses(
        (status = 200, description = "Hospital", body = HospitalResponse),
        (status = 404, description = "Hospital not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_hospital(
    State(state): State<AppState>,
    Path(hospital_id): Path<String>,
) -> Result<Json<HospitalResponse>, ApiError> {
    let hospital = reference_service::get_hospital(state.db_pool(), &hospital_id).await?;
    Ok(Json(HospitalResponse {
        success: true,
        hospital,
    }))
}

#[utoipa::path(
    post,
    path = "/api/hospitals",
    tag = "Reference",
    security(("bearerAuth" = [])),
    request_body = HospitalRequest,
    responses(
        (status = 200, description = "Hospital created", body = HospitalResponse),
        (status = 403, description = "Permission denied", body = crate::error::ErrorResponse),
        (status = 409, description = "Hospital already exists", body = crate::error::ErrorResponse),
        (status = 422, description = "Invalid fields", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_hospital(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<HospitalRequest>,
) -> Result<Json<HospitalResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let caller = state.caller(&token).await?;

    let hospital = reference_service::create_hospital(state.db_pool(), &caller, req).await?;
    Ok(Json(HospitalResponse {
        success: true,
        hospital,
    }))
}

#[utoipa::path(
    put,
    path = "/api/hospitals/{hospital_id}",
    tag = "Reference",
    security(("bearerAuth" = [])),
    params(("hospital_id" = String, Path, description = "Hospital public identifier")),
    request_body = HospitalRequest,
    responses(
        (status = 200, description = "Hospital updated", body = HospitalResponse),
        (status = 403, description = "Permission denied", body = crate::error::ErrorResponse),
        (status = 404, description = "Hospital not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Hospital already exists", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_hospital(
    State(state): State<AppState>,
    Path(hospital_id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<HospitalRequest>,
) -> Result<Json<HospitalResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let caller = state.caller(&token).await?;

    let hospital =
        reference_service::update_hospital(state.db_pool(), &caller, &hospital_id, req).await?;
    Ok(Json(HospitalResponse {
        success: true,
        hospital,
    }))
}

#[utoipa::path(
    delete,
    path = "/api/hospitals/{hospital_id}",
    tag = "Reference",
    security(("bearerAuth" = [])),
    params(("hospital_id" = String, Path, description = "Hospital public identifier")),
    responses(
        (status = 200, description = "Hospital deleted", body = MessageResponse),
        (status = 403, description = "Permission denied", body = crate::error::ErrorResponse),
        (status = 409, description = "Hospital is still in use", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_hospital(
    State(state): State<AppState>,
    Path(hospital_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<MessageResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let caller = state.caller(&token).await?;

    reference_service::delete_hospital(&state, &caller, &hospital_id).await?;
    Ok(Json(MessageResponse::ok("Hospital deleted")))
}

#[utoipa::path(
    put,
    path = "/api/hospitals/reorder",
    tag = "Reference",
    security(("bearerAuth" = [])),
    request_body = ReorderRequest,
    responses(
        (status = 200, description = "Order saved", body = MessageResponse),
        (status = 403, description = "Permission denied", body = crate::error::ErrorResponse),
        (status = 422, description = "Unknown id in order", body = crate::error::ErrorResponse)
    )
)]
pub async fn reorder_hospitals(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<ReorderRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    reorder(&state, &headers, SortableTable::Hospitals, req).await
}

// Departments and facilities share one shape.

async fn list_units(
    state: &AppState,
    kind: UnitKind,
    query: UnitQuery,
) -> Result<Json<UnitsResponse>, ApiError> {
    let units = reference_service::list_units(state.db_pool(), kind, query).await?;
    Ok(Json(UnitsResponse {
        success: true,
        units,
    }))
}

async fn get_unit(
    state: &AppState,
    kind: UnitKind,
    unit_id: &str,
) -> Result<Json<UnitResponse>, ApiError> {
    let unit = reference_service::get_unit(state.db_pool(), kind, unit_id).await?;
    Ok(Json(UnitResponse {
        success: true,
        unit,
    }))
}

async fn create_unit(
    state: &AppState,
    headers: &HeaderMap,
    kind: UnitKind,
    req: UnitRequest,
) -> Result<Json<UnitResponse>, ApiError> {
    let token = require_bearer(headers)?;
    let caller = state.caller(&token).await?;

    let unit = reference_service::create_unit(state.db_pool(), &caller, kind, req).await?;
    Ok(Json(UnitResponse {
        success: true,
        unit,
    }))
}

async fn update_unit(
    state: &AppState,
    headers: &HeaderMap,
    kind: UnitKind,
    unit_id: &str,
    req: UnitRequest,
) -> Result<Json<UnitResponse>, ApiError> {
    let token = require_bearer(headers)?;
    let caller = state.caller(&token).await?;

    let unit =
        reference_service::update_unit(state.db_pool(), &caller, kind, unit_id, req).await?;
    Ok(Json(UnitResponse {
        success: true,
        unit,
    }))
}

async fn delete_unit(
    state: &AppState,
    headers: &HeaderMap,
    kind: UnitKind,
    unit_id: &str,
) -> Result<Json<MessageResponse>, ApiError> {
    let token = require_bearer(headers)?;
    let caller = state.caller(&token).await?;

    reference_service::delete_unit(state.db_pool(), &caller, kind, unit_id).await?;
    Ok(Json(MessageResponse::ok("Deleted")))
}

#[utoipa::path(
    get,
    path = "/api/departments",
    tag = "Reference",
    params(UnitQuery),
    responses(
        (status = 200, description = "Departments in display order", body = UnitsResponse),
        (status = 404, description = "Hospital not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_departments(
    State(state): State<AppState>,
    Query(query): Query<UnitQuery>,
) -> Result<Json<UnitsResponse>, ApiError> {
    list_units(&state, UnitKind::Department, query).await
}

#[utoipa::path(
    get,
    path = "/api/departments/{department_id}",
    tag = "Reference",
    params(("department_id" = String, Path, description = "Department public identifier")),
    responses(
        (status = 200, description = "Department", body = UnitResponse),
        (status = 404, description = "Department not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_department(
    State(state): State<AppState>,
    Path(department_id): Path<String>,
) -> Result<Json<UnitResponse>, ApiError> {
    get_unit(&state, UnitKind::Department, &department_id).await
}

#[utoipa::path(
    post,
    path = "/api/departments",
    tag = "Reference",
    security(("bearerAuth" = [])),
    request_body = UnitRequest,
    responses(
        (status = 200, description = "Department created", body = UnitResponse),
        (status = 403, description = "Permission denied", body = crate::error::ErrorResponse),
        (status = 409, description = "Department already exists", body = crate::error::ErrorResponse),
        (status = 422, description = "Invalid fields", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_department(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<UnitRequest>,
) -> Result<Json<UnitResponse>, ApiError> {
    create_unit(&state, &headers, UnitKind::Department, req).await
}

#[utoipa::path(
    put,
    path = "/api/departments/{department_id}",
    tag = "Reference",
    security(("bearerAuth" = [])),
    params(("department_id" = String, Path, description = "Department public identifier")),
    request_body = UnitRequest,
    responses(
        (status = 200, description = "Department updated", body = UnitResponse),
        (status = 403, description = "Permission denied", body = crate::error::ErrorResponse),
        (status = 404, description = "Department not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_department(
    State(state): State<AppState>,
    Path(department_id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<UnitRequest>,
) -> Result<Json<UnitResponse>, ApiError> {
    update_unit(&state, &headers, UnitKind::Department, &department_id, req).await
}

#[utoipa::path(
    delete,
    path = "/api/departments/{department_id}",
    tag = "Reference",
    security(("bearerAuth" = [])),
    params(("department_id" = String, Path, description = "Department public identifier")),
    responses(
        (status = 200, description = "Department deleted", body = MessageResponse),
        (status = 409, description = "Department is still in use", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_department(
    State(state): State<AppState>,
    Path(department_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<MessageResponse>, ApiError> {
    delete_unit(&state, &headers, UnitKind::Department, &department_id).await
}

#[utoipa::path(
    put,
    path = "/api/departments/reorder",
    tag = "Reference",
    security(("bearerAuth" = [])),
    request_body = ReorderRequest,
    responses(
        (status = 200, description = "Order saved", body = MessageResponse),
        (status = 422, description = "Unknown id in order", body = crate::error::ErrorResponse)
    )
)]
pub async fn reorder_departments(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<ReorderRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    reorder(&state, &headers, SortableTable::Departments, req).await
}

#[utoipa::path(
    get,
    path = "/api/facilities",
    tag = "Reference",
    params(UnitQuery),
    responses(
        (status = 200, description = "Facilities in display order", body = UnitsResponse),
        (status = 404, description = "Hospital not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_facilities(
    State(state): State<AppState>,
    Query(query): Query<UnitQuery>,
) -> Result<Json<UnitsResponse>, ApiError> {
    list_units(&state, UnitKind::Facility, query).await
}

#[utoipa::path(
    get,
    path = "/api/facilities/{facility_id}",
    tag = "Reference",
    params(("facility_id" = String, Path, description = "Facility public identifier")),
    responses(
        (status = 200, description = "Facility", body = UnitResponse),
        (status = 404, description = "Facility not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_facility(
    State(state): State<AppState>,
    Path(facility_id): Path<String>,
) -> Result<Json<UnitResponse>, ApiError> {
    get_unit(&state, UnitKind::Facility, &facility_id).await
}

#[utoipa::path(
    post,
    path = "/api/facilities",
    tag = "Reference",
    security(("bearerAuth" = [])),
    request_body = UnitRequest,
    responses(
        (status = 200, description = "Facility created", body = UnitResponse),
        (status = 403, description = "Permission denied", body = crate::error::ErrorResponse),
        (status = 409, description = "Facility already exists", body = crate::error::ErrorResponse),
        (status = 422, description = "Invalid fields", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_facility(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<UnitRequest>,
) -> Result<Json<UnitResponse>, ApiError> {
    create_unit(&state, &headers, UnitKind::Facility, req).await
}

#[utoipa::path(
    put,
    path = "/api/facilities/{facility_id}",
    tag = "Reference",
    security(("bearerAuth" = [])),
    params(("facility_id" = String, Path, description = "Facility public identifier")),
    request_body = UnitRequest,
    responses(
        (status = 200, description = "Facility updated", body = UnitResponse),
        (status = 403, description = "Permission denied", body = crate::error::ErrorResponse),
        (status = 404, description = "Facility not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_facility(
    State(state): State<AppState>,
    Path(facility_id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<UnitRequest>,
) -> Result<Json<UnitResponse>, ApiError> {
    update_unit(&state, &headers, UnitKind::Facility, &facility_id, req).await
}

#[utoipa::path(
    delete,
    path = "/api/facilities/{facility_id}",
    tag = "Reference",
    security(("bearerAuth" = [])),
    params(("facility_id" = String, Path, description = "Facility public identifier")),
    responses(
        (status = 200, description = "Facility deleted", body = MessageResponse),
        (status = 409, description = "Facility is still in use", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_facility(
    State(state): State<AppState>,
    Path(facility_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<MessageResponse>, ApiError> {
    delete_unit(&state, &headers, UnitKind::Facility, &facility_id).await
}

#[utoipa::path(
    put,
    path = "/api/facilities/reorder",
    tag = "Reference",
    security(("bearerAuth" = [])),
    request_body = ReorderRequest,
    responses(
        (status = 200, description = "Order saved", body = MessageResponse),
        (status = 422, description = "Unknown id in order", body = crate::error::ErrorResponse)
    )
)]
pub async fn reorder_facilities(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<ReorderRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    reorder(&state, &headers, SortableTable::Facilities, req).await
}

// Specialities

#[utoipa::path(
    get,
    path = "/api/specialities",
    tag = "Reference",
    responses((status = 200, description = "Specialities in display order", body = SpecialitiesResponse))
)]
pub async fn list_specialities(
    State(state): State<AppState>,
) -> Result<Json<SpecialitiesResponse>, ApiError> {
    let specialities = reference_service::list_specialities(state.db_pool()).await?;
    Ok(Json(SpecialitiesResponse {
        success: true,
        specialities,
    }))
}

#[utoipa::path(
    get,
    path = "/api/specialities/{speciality_id}",
    tag = "Reference",
    params(("speciality_id" = String, Path, description = "Speciality public identifier")),
    responses(
        (status = 200, description = "Speciality", body = SpecialityResponse),
        (status = 404, description = "Speciality not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_speciality(
    State(state): State<AppState>,
    Path(speciality_id): Path<String>,
) -> Result<Json<SpecialityResponse>, ApiError> {
    let speciality = reference_service::get_speciality(state.db_pool(), &speciality_id).await?;
    Ok(Json(SpecialityResponse {
        success: true,
        speciality,
    }))
}

#[utoipa::path(
    post,
    path = "/api/specialities",
    tag = "Reference",
    security(("bearerAuth" = [])),
    request_body = SpecialityRequest,
    responses(
        (status = 200, description = "Speciality created", body = SpecialityResponse),
        (status = 403, description = "Permission denied", body = crate::error::ErrorResponse),
        (status = 409, description = "Speciality already exists", body = crate::error::ErrorResponse),
        (status = 422, description = "Invalid fields", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_speciality(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<SpecialityRequest>,
) -> Result<Json<SpecialityResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let caller = state.caller(&token).await?;

    let speciality = reference_service::create_speciality(state.db_pool(), &caller, req).await?;
    Ok(Json(SpecialityResponse {
        success: true,
        speciality,
    }))
}

#[utoipa::path(
    put,
    path = "/api/specialities/{speciality_id}",
    tag = "Reference",
    security(("bearerAuth" = [])),
    params(("speciality_id" = String, Path, description = "Speciality public identifier")),
    request_body = SpecialityRequest,
    responses(
        (status = 200, description = "Speciality updated", body = SpecialityResponse),
        (status = 403, description = "Permission denied", body = crate::error::ErrorResponse),
        (status = 404, description = "Speciality not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_speciality(
    State(state): State<AppState>,
    Path(speciality_id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<SpecialityRequest>,
) -> Result<Json<SpecialityResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let caller = state.caller(&token).await?;

    let speciality =
        reference_service::update_speciality(state.db_pool(), &caller, &speciality_id, req)
            .await?;
    Ok(Json(SpecialityResponse {
        success: true,
        speciality,
    }))
}

#[utoipa::path(
    delete,
    path = "/api/specialities/{speciality_id}",
    tag = "Reference",
    security(("bearerAuth" = [])),
    params(("speciality_id" = String, Path, description = "Speciality public identifier")),
    responses(
        (status = 200, description = "Speciality deleted", body = MessageResponse),
        (status = 409, description = "Speciality is still in use", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_speciality(
    State(state): State<AppState>,
    Path(speciality_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<MessageResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let caller = state.caller(&token).await?;

    reference_service::delete_speciality(state.db_pool(), &caller, &speciality_id).await?;
    Ok(Json(MessageResponse::ok("Speciality deleted")))
}

#[utoipa::path(
    put,
    path = "/api/specialities/reorder",
    tag = "Reference",
    security(("bearerAuth" = [])),
    request_body = ReorderRequest,
    responses(
        (status = 200, description = "Order saved", body = MessageResponse),
        (status = 422, description = "Unknown id in order", body = crate::error::ErrorResponse)
    )
)]
pub async fn reorder_specialities(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<ReorderRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    reorder(&state, &headers, SortableTable::Specialities, req).await
}
