//! Time slot and appointment entity definitions

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

use crate::types::UnknownVariant;

/// A recurring bookable time of day owned by a doctor.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow, ToSchema)]
pub struct TimeSlot {
    #[serde(skip_serializing)]
    pub id: i64,
    pub public_id: String,
    #[serde(skip_serializing)]
    pub doctor_id: i64,
    /// Time of day as `HH:MM`.
    pub time: String,
    pub duration_minutes: i64,
    #[serde(skip_serializing)]
    pub active: bool,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct NewTimeSlot {
    pub time: String,
    pub duration_minutes: i64,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Cancelled,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "pending",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Cancelled => "cancelled",
        }
    }

    /// Whether moving from `self` to `next` is an allowed transition.
    pub fn can_transition_to(self, next: AppointmentStatus) -> bool {
        matches!(
            (self, next),
            (AppointmentStatus::Pending, AppointmentStatus::Confirmed)
                | (AppointmentStatus::Pending, AppointmentStatus::Cancelled)
                | (AppointmentStatus::Confirmed, AppointmentStatus::Cancelled)
        )
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppointmentStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(AppointmentStatus::Pending),
            "confirmed" => Ok(AppointmentStatus::Confirmed),
            "cancelled" => Ok(AppointmentStatus::Cancelled),
            other => Err(UnknownVariant {
                kind: "appointment status",
                value: other.to_string(),
            }),
        }
    }
}

/// An appointment joined with the people and slot it refers to.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow, ToSchema)]
pub struct Appointment {
    #[serde(skip_serializing)]
    pub id: i64,
    pub public_id: String,
    #[serde(skip_serializing)]
    pub patient_id: i64,
    pub patient_public_id: String,
    pub patient_name: String,
    pub patient_email: String,
    #[serde(skip_serializing)]
    pub doctor_id: i64,
    pub doctor_public_id: String,
    pub doctor_name: String,
    pub doctor_email: String,
    /// Calendar date as `YYYY-MM-DD`.
    pub date: String,
    #[serde(skip_serializing)]
    pub time_slot_id: i64,
    pub time_slot_public_id: String,
    pub time: String,
    pub duration_minutes: i64,
    pub status: AppointmentStatus,
    pub note: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone)]
pub struct NewAppointment {
    pub patient_id: i64,
    pub doctor_id: i64,
    pub date: String,
    pub time_slot_id: i64,
    pub note: Option<String>,
}

/// Restricts an appointment listing. Every set field must match.
#[derive(Debug, Clone, Default)]
pub struct AppointmentFilter {
    pub patient_id: Option<i64>,
    pub doctor_id: Option<i64>,
    /// Either side of the appointment.
    pub participant_id: Option<i64>,
    pub status: Option<AppointmentStatus>,
    pub date: Option<String>,
}
