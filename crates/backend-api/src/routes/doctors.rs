use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Json,
};
use clinic_database::TimeSlot;
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    services::{
        time_slots::{self as time_slot_service, SetTimeSlotsRequest},
        users::{
            self as user_service, Doctor, DoctorProfileRequest, DoctorQuery,
            SetSpecialitiesRequest,
        },
    },
    util::require_bearer,
    ApiError, AppState,
};

#[derive(Debug, Serialize, ToSchema)]
pub struct DoctorsResponse {
    pub success: bool,
    pub doctors: Vec<Doctor>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DoctorResponse {
    pub success: bool,
    pub doctor: Doctor,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TimeSlotsResponse {
    pub success: bool,
    pub time_slots: Vec<TimeSlot>,
}

#[utoipa::path(
    get,
    path = "/api/doctors",
    tag = "Doctors",
    params(DoctorQuery),
    responses(
        (status = 200, description = "Doctors with their specialities", body = DoctorsResponse),
        (status = 404, description = "Speciality not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_doctors(
    State(state): State<AppState>,
    Query(query): Query<DoctorQuery>,
) -> Result<Json<DoctorsResponse>, ApiError> {
    let doctors = user_service::list_doctors(state.db_pool(), query).await?;
    Ok(Json(DoctorsResponse {
        success: true,
        doctors,
    }))
}

#[utoipa::path(
    put,
    path = "/api/doctors/{doctor_id}/profile",
    tag = "Doctors",
    security(("bearerAuth" = [])),
    params(("doctor_id" = String, Path, description = "Doctor public identifier")),
    request_body = DoctorProfileRequest,
    responses(
        (status = 200, description = "Doctor profile updated", body = DoctorResponse),
        (status = 403, description = "Permission denied", body = crate::error::ErrorResponse),
        (status = 404, description = "Doctor not found", body = crate::error::ErrorResponse),
        (status = 422, description = "Invalid fields", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_profile(
    State(state): State<AppState>,
    Path(doctor_id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<DoctorProfileRequest>,
) -> Result<Json<DoctorResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let caller = state.caller(&token).await?;

    let doctor =
        user_service::update_doctor_profile(state.db_pool(), &caller, &doctor_id, req).await?;
    Ok(Json(DoctorResponse {
        success: true,
        doctor,
    }))
}

#[utoipa::path(
    put,
    path = "/api/doctors/{doctor_id}/specialities",
    tag = "Doctors",
    security(("bearerAuth" = [])),
    params(("doctor_id" = String, Path, description = "Doctor public identifier")),
    request_body = SetSpecialitiesRequest,
    responses(
        (status = 200, description = "Specialities replaced", body = DoctorResponse),
        (status = 403, description = "Permission denied", body = crate::error::ErrorResponse),
        (status = 422, description = "Unknown speciality", body = crate::error::ErrorResponse)
    )
)]
pub async fn set_specialities(
    State(state): State<AppState>,
    Path(doctor_id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<SetSpecialitiesRequest>,
) -> Result<Json<DoctorResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let caller = state.caller(&token).await?;

    let doctor = user_service::set_specialities(state.db_pool(), &caller, &doctor_id, req).await?;
    Ok(Json(DoctorResponse {
        success: true,
        doctor,
    }))
}

#[utoipa::path(
    get,
    path = "/api/doctors/{doctor_id}/time-slots",
    tag = "Doctors",
    params(("doctor_id" = String, Path, description = "Doctor public identifier")),
    responses(
        (status = 200, description = "Bookable time slots", body = TimeSlotsResponse),
        (status = 404, description = "Doctor not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_time_slots(
    State(state): State<AppState>,
    Path(doctor_id): Path<String>,
) -> Result<Json<TimeSlotsResponse>, ApiError> {
    let time_slots = time_slot_service::list_for_doctor(state.db_pool(), &doctor_id).await?;
    Ok(Json(TimeSlotsResponse {
        success: true,
        time_slots,
    }))
}

#[utoipa::path(
    put,
    path = "/api/doctors/{doctor_id}/time-slots",
    tag = "Doctors",
    security(("bearerAuth" = [])),
    params(("doctor_id" = String, Path, description = "Doctor public identifier")),
    request_body = SetTimeSlotsRequest,
    responses(
        (status = 200, description = "Time slots replaced", body = TimeSlotsResponse),
        (status = 403, description = "Permission denied", body = crate::error::ErrorResponse),
        (status = 422, description = "Invalid slots", body = crate::error::ErrorResponse)
    )
)]
pub async fn replace_time_slots(
    State(state): State<AppState>,
    Path(doctor_id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<SetTimeSlotsRequest>,
) -> Result<Json<TimeSlotsResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let caller = state.caller(&token).await?;

    let time_slots =
        time_slot_service::replace_for_doctor(state.db_pool(), &caller, &doctor_id, req).await?;
    Ok(Json(TimeSlotsResponse {
        success: true,
        time_slots,
    }))
}
