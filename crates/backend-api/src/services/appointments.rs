//! Booking appointments and moving them through their statuses.
//!
//! A status change is only allowed while the appointment's slot is
//! actionable: the slot instant (date plus time of day in the clinic's
//! offset) lies after `now` and strictly before `now + expires_at_seconds`.

use chrono::{DateTime, Duration, FixedOffset, NaiveDateTime, TimeZone, Utc};
use clinic_config::AppointmentConfig;
use clinic_database::{
    Appointment, AppointmentFilter, AppointmentRepository, AppointmentStatus, DatabaseError,
    NewAppointment, TimeSlotRepository, User,
};
use clinic_mailer::templates;
use serde::Deserialize;
use sqlx::SqlitePool;
use tracing::info;
use utoipa::{IntoParams, ToSchema};

use super::access::{Caller, APPOINTMENTS_MANAGE};
use super::users::{find_doctor, find_user};
use super::{notify, ServiceError};
use crate::validation::{clean, parse_date, parse_time, FieldErrors, MAX_NOTE_LENGTH};
use crate::AppState;

pub const ALREADY_BOOKED: &str = "Appointment already booked";
pub const ACTION_RESTRICTED: &str = "Action restricted";

#[derive(Debug, Deserialize, ToSchema)]
pub struct BookAppointmentRequest {
    pub doctor_id: String,
    /// `YYYY-MM-DD`.
    pub date: String,
    pub time_slot_id: String,
    pub note: Option<String>,
    /// Book on behalf of another patient. Requires `appointments.manage`.
    pub patient_id: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct AppointmentQuery {
    pub status: Option<AppointmentStatus>,
    /// `YYYY-MM-DD`.
    pub date: Option<String>,
    /// Doctor public id.
    pub doctor: Option<String>,
    /// Patient public id.
    pub patient: Option<String>,
}

/// The instant a slot starts, for a date and `HH:MM` time in a fixed offset.
pub fn slot_instant(date: &str, time: &str, utc_offset_minutes: i32) -> Option<DateTime<Utc>> {
    let local = NaiveDateTime::new(parse_date(date)?, parse_time(time)?);
    let offset = FixedOffset::east_opt(utc_offset_minutes.checked_mul(60)?)?;
    offset
        .from_local_datetime(&local)
        .single()
        .map(|instant| instant.with_timezone(&Utc))
}

pub fn slot_is_actionable(
    slot_at: DateTime<Utc>,
    now: DateTime<Utc>,
    config: &AppointmentConfig,
) -> bool {
    let Some(window) = Duration::try_seconds(config.expires_at_seconds) else {
        return false;
    };
    match now.checked_add_signed(window) {
        Some(limit) => now < slot_at && slot_at < limit,
        None => now < slot_at,
    }
}

pub async fn book(
    state: &AppState,
    caller: &Caller,
    req: BookAppointmentRequest,
    now: DateTime<Utc>,
) -> Result<Appointment, ServiceError> {
    let mut errors = FieldErrors::new();
    if req.doctor_id.trim().is_empty() {
        errors.add("doctor_id", "Doctor is required");
    }
    if req.time_slot_id.trim().is_empty() {
        errors.add("time_slot_id", "Time slot is required");
    }
    errors.date("date", req.date.trim());
    errors.optional_text("note", req.note.as_deref(), MAX_NOTE_LENGTH);
    errors.finish()?;

    let pool = state.db_pool();
    let patient = resolve_patient(pool, caller, req.patient_id.as_deref()).await?;
    let doctor = find_doctor(pool, req.doctor_id.trim()).await?;
    if doctor.id == patient.id {
        return Err(ServiceError::invalid(
            "doctor_id",
            "You cannot book an appointment with yourself",
        ));
    }

    let slot = TimeSlotRepository::new(pool.clone())
        .find_by_public_id(req.time_slot_id.trim())
        .await?
        .filter(|slot| slot.doctor_id == doctor.id && slot.active)
        .ok_or_else(|| {
            ServiceError::invalid("time_slot_id", "Time slot is not offered by this doctor")
        })?;

    let date = req.date.trim().to_string();
    let slot_at = slot_instant(&date, &slot.time, state.config().appointments.utc_offset_minutes)
        .ok_or_else(|| ServiceError::invalid("date", "Invalid appointment date"))?;
    if slot_at <= now {
        return Err(ServiceError::invalid("date", "Appointment must be in the future"));
    }

    let new = NewAppointment {
        patient_id: patient.id,
        doctor_id: doctor.id,
        date,
        time_slot_id: slot.id,
        note: clean(req.note.as_deref()),
    };

    let appointments = AppointmentRepository::new(pool.clone());
    if appointments.exists(&new).await? {
        return Err(ServiceError::conflict(ALREADY_BOOKED));
    }
    let appointment = appointments.create(&new).await.map_err(|err| match err {
        DatabaseError::Duplicate(_) => ServiceError::conflict(ALREADY_BOOKED),
        other => other.into(),
    })?;

    info!(
        appointment = %appointment.public_id,
        doctor = %appointment.doctor_public_id,
        patient = %appointment.patient_public_id,
        "appointment booked"
    );
    notify::appointment_parties(state.mailer(), &appointment, templates::appointment_received)
        .await;

    Ok(appointment)
}

/// Managers see every appointment, everyone else those they book or attend.
pub async fn list(
    pool: &SqlitePool,
    caller: &Caller,
    query: AppointmentQuery,
) -> Result<Vec<Appointment>, ServiceError> {
    let date = clean(query.date.as_deref());
    if let Some(date) = &date {
        let mut errors = FieldErrors::new();
        errors.date("date", date);
        errors.finish()?;
    }

    let doctor_id = match clean(query.doctor.as_deref()) {
        Some(id) => Some(find_user(pool, &id).await?.id),
        None => None,
    };
    let patient_id = match clean(query.patient.as_deref()) {
        Some(id) => Some(find_user(pool, &id).await?.id),
        None => None,
    };

    let mut filter = AppointmentFilter {
        patient_id,
        doctor_id,
        status: query.status,
        date,
        ..AppointmentFilter::default()
    };
    if !caller.can(APPOINTMENTS_MANAGE) {
        filter.participant_id = Some(caller.id());
    }

    Ok(AppointmentRepository::new(pool.clone()).list(&filter).await?)
}

pub async fn get(
    pool: &SqlitePool,
    caller: &Caller,
    public_id: &str,
) -> Result<Appointment, ServiceError> {
    let appointment = find(pool, public_id).await?;
    let involved = appointment.patient_id == caller.id() || appointment.doctor_id == caller.id();
    if !involved && !caller.can(APPOINTMENTS_MANAGE) {
        return Err(ServiceError::not_found("Appointment not found"));
    }
    Ok(appointment)
}

/// Confirm or cancel an appointment and tell both parties.
///
/// Email failures are logged; the new status is kept regardless.
pub async fn change_status(
    state: &AppState,
    caller: &Caller,
    public_id: &str,
    next: AppointmentStatus,
    now: DateTime<Utc>,
) -> Result<Appointment, ServiceError> {
    let pool = state.db_pool();
    let appointment = get(pool, caller, public_id).await?;

    let is_doctor = appointment.doctor_id == caller.id();
    let is_patient = appointment.patient_id == caller.id();
    let allowed = caller.can(APPOINTMENTS_MANAGE)
        || match next {
            AppointmentStatus::Confirmed => is_doctor,
            AppointmentStatus::Cancelled => is_doctor || is_patient,
            AppointmentStatus::Pending => false,
        };
    if !allowed {
        return Err(ServiceError::restricted("Permission denied"));
    }

    let current = appointment.status;
    if !current.can_transition_to(next) {
        return Err(ServiceError::conflict(format!(
            "Cannot change a {current} appointment to {next}"
        )));
    }

    let actionable = slot_instant(
        &appointment.date,
        &appointment.time,
        state.config().appointments.utc_offset_minutes,
    )
    .is_some_and(|slot_at| slot_is_actionable(slot_at, now, &state.config().appointments));
    if !actionable {
        return Err(ServiceError::restricted(ACTION_RESTRICTED));
    }

    let repo = AppointmentRepository::new(pool.clone());
    repo.update_status(appointment.id, current, next)
        .await
        .map_err(|err| match err {
            DatabaseError::Constraint(_) => {
                ServiceError::conflict("Appointment was changed by someone else")
            }
            other => other.into(),
        })?;

    let updated = find(pool, public_id).await?;
    info!(
        appointment = %updated.public_id,
        from = %current,
        to = %next,
        by = %caller.user.public_id,
        "appointment status changed"
    );

    let render = match next {
        AppointmentStatus::Confirmed => templates::appointment_confirmed,
        _ => templates::appointment_cancelled,
    };
    notify::appointment_parties(state.mailer(), &updated, render).await;

    Ok(updated)
}

async fn find(pool: &SqlitePool, public_id: &str) -> Result<Appointment, ServiceError> {
    AppointmentRepository::new(pool.clone())
        .find_by_public_id(public_id)
        .await?
        .ok_or_else(|| ServiceError::not_found("Appointment not found"))
}

async fn resolve_patient(
    pool: &SqlitePool,
    caller: &Caller,
    patient_id: Option<&str>,
) -> Result<User, ServiceError> {
    match clean(patient_id) {
        Some(id) if id != caller.user.public_id => {
            if !caller.can(APPOINTMENTS_MANAGE) {
                return Err(ServiceError::restricted("Permission denied"));
            }
            find_user(pool, &id).await
        }
        _ => Ok(caller.user.clone()),
    }
}
