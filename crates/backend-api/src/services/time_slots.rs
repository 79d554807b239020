use std::collections::HashSet;

use clinic_database::{NewTimeSlot, TimeSlot, TimeSlotRepository};
use serde::Deserialize;
use sqlx::SqlitePool;
use tracing::info;
use utoipa::ToSchema;

use super::access::{Caller, USERS_MANAGE};
use super::{users::find_doctor, ServiceError};
use crate::validation::{FieldErrors, MAX_SLOT_MINUTES, MIN_SLOT_MINUTES};

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct TimeSlotInput {
    /// Time of day, `HH:MM`.
    pub time: String,
    pub duration_minutes: i64,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SetTimeSlotsRequest {
    pub slots: Vec<TimeSlotInput>,
}

pub async fn list_for_doctor(
    pool: &SqlitePool,
    doctor_public_id: &str,
) -> Result<Vec<TimeSlot>, ServiceError> {
    let doctor = find_doctor(pool, doctor_public_id).await?;
    Ok(TimeSlotRepository::new(pool.clone())
        .list_for_doctor(doctor.id)
        .await?)
}

/// Replace the bookable slots of a doctor.
pub async fn replace_for_doctor(
    pool: &SqlitePool,
    caller: &Caller,
    doctor_public_id: &str,
    req: SetTimeSlotsRequest,
) -> Result<Vec<TimeSlot>, ServiceError> {
    let doctor = find_doctor(pool, doctor_public_id).await?;
    caller.require_self_or(doctor.id, USERS_MANAGE)?;

    let slots = validate_slots(&req.slots)?;
    let stored = TimeSlotRepository::new(pool.clone())
        .replace_for_doctor(doctor.id, &slots)
        .await?;

    info!(doctor = %doctor.public_id, slots = stored.len(), "time slots replaced");
    Ok(stored)
}

fn validate_slots(inputs: &[TimeSlotInput]) -> Result<Vec<NewTimeSlot>, ServiceError> {
    let mut errors = FieldErrors::new();
    let mut seen = HashSet::new();

    for (index, slot) in inputs.iter().enumerate() {
        let time = slot.time.trim();
        errors.time_of_day(&format!("slots.{index}.time"), time);
        if !seen.insert(time) {
            errors.add(format!("slots.{index}.time"), "Duplicate time");
        }
        if !(MIN_SLOT_MINUTES..=MAX_SLOT_MINUTES).contains(&slot.duration_minutes) {
            errors.add(
                format!("slots.{index}.duration_minutes"),
                format!("Duration must be between {MIN_SLOT_MINUTES} and {MAX_SLOT_MINUTES} minutes"),
            );
        }
    }
    errors.finish()?;

    Ok(inputs
        .iter()
        .map(|slot| NewTimeSlot {
            time: slot.time.trim().to_string(),
            duration_minutes: slot.duration_minutes,
        })
        .collect())
}
