use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Json,
};
use chrono::Utc;
use clinic_database::{Appointment, AppointmentStatus};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    services::appointments::{
        self as appointment_service, AppointmentQuery, BookAppointmentRequest,
    },
    util::require_bearer,
    ApiError, AppState,
};

#[derive(Debug, Serialize, ToSchema)]
pub struct AppointmentsResponse {
    pub success: bool,
    pub appointments: Vec<Appointment>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AppointmentResponse {
    pub success: bool,
    pub message: String,
    pub appointment: Appointment,
}

#[utoipa::path(
    get,
    path = "/api/appointments",
    tag = "Appointments",
    security(("bearerAuth" = [])),
    params(AppointmentQuery),
    responses(
        (status = 200, description = "Appointments visible to the caller", body = AppointmentsResponse),
        (status = 401, description = "Authentication required", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_appointments(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<AppointmentQuery>,
) -> Result<Json<AppointmentsResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let caller = state.caller(&token).await?;

    let appointments = appointment_service::list(state.db_pool(), &caller, query).await?;
    Ok(Json(AppointmentsResponse {
        success: true,
        appointments,
    }))
}

#[utoipa::path(
    post,
    path = "/api/appointments",
    tag = "Appointments",
    security(("bearerAuth" = [])),
    request_body = BookAppointmentRequest,
    responses(
        (status = 200, description = "Appointment booked and awaiting confirmation", body = AppointmentResponse),
        (status = 404, description = "Doctor not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Appointment already booked", body = crate::error::ErrorResponse),
        (status = 422, description = "Invalid fields", body = crate::error::ErrorResponse)
    )
)]
pub async fn book_appointment(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<BookAppointmentRequest>,
) -> Result<Json<AppointmentResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let caller = state.caller(&token).await?;

    let appointment = appointment_service::book(&state, &caller, req, Utc::now()).await?;
    Ok(Json(AppointmentResponse {
        success: true,
        message: "Appointment booked".to_string(),
        appointment,
    }))
}

#[utoipa::path(
    get,
    path = "/api/appointments/{appointment_id}",
    tag = "Appointments",
    security(("bearerAuth" = [])),
    params(("appointment_id" = String, Path, description = "Appointment public identifier")),
    responses(
        (status = 200, description = "Appointment", body = AppointmentResponse),
        (status = 404, description = "Appointment not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_appointment(
    State(state): State<AppState>,
    Path(appointment_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<AppointmentResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let caller = state.caller(&token).await?;

    let appointment = appointment_service::get(state.db_pool(), &caller, &appointment_id).await?;
    Ok(Json(AppointmentResponse {
        success: true,
        message: appointment.status.to_string(),
        appointment,
    }))
}

#[utoipa::path(
    post,
    path = "/api/appointments/{appointment_id}/confirm",
    tag = "Appointments",
    security(("bearerAuth" = [])),
    params(("appointment_id" = String, Path, description = "Appointment public identifier")),
    responses(
        (status = 200, description = "Appointment confirmed", body = AppointmentResponse),
        (status = 403, description = "Not allowed, or the slot is outside the actionable window", body = crate::error::ErrorResponse),
        (status = 409, description = "Invalid status transition", body = crate::error::ErrorResponse)
    )
)]
pub async fn confirm_appointment(
    State(state): State<AppState>,
    Path(appointment_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<AppointmentResponse>, ApiError> {
    change_status(state, headers, appointment_id, AppointmentStatus::Confirmed).await
}

#[utoipa::path(
    post,
    path = "/api/appointments/{appointment_id}/cancel",
    tag = "Appointments",
    security(("bearerAuth" = [])),
    params(("appointment_id" = String, Path, description = "Appointment public identifier")),
    responses(
        (status = 200, description = "Appointment cancelled", body = AppointmentResponse),
        (status = 403, description = "Not allowed, or the slot is outside the actionable window", body = crate::error::ErrorResponse),
        (status = 409, description = "Invalid status transition", body = crate::error::ErrorResponse)
    )
)]
pub async fn cancel_appointment(
    State(state): State<AppState>,
    Path(appointment_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<AppointmentResponse>, ApiError> {
    change_status(state, headers, appointment_id, AppointmentStatus::Cancelled).await
}

async fn change_status(
    state: AppState,
    headers: HeaderMap,
    appointment_id: String,
    next: AppointmentStatus,
) -> Result<Json<AppointmentResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let caller = state.caller(&token).await?;

    let appointment =
        appointment_service::change_status(&state, &caller, &appointment_id, next, Utc::now())
            .await
            .map_err(|e| {
                tracing::debug!("Appointment {} not moved to {}: {}", appointment_id, next, e);
                ApiError::from(e)
            })?;

    Ok(Json(AppointmentResponse {
        success: true,
        message: format!("Appointment {next}"),
        appointment,
    }))
}
