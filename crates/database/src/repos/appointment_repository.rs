//! Appointment repository.

use crate::entities::{Appointment, AppointmentFilter, AppointmentStatus, NewAppointment};
use crate::types::{DatabaseError, DatabaseResult};
use crate::{new_public_id, timestamp};
use sqlx::SqlitePool;

const APPOINTMENT_SELECT: &str = "SELECT a.id, a.public_id,
        a.patient_id, p.public_id AS patient_public_id, p.name AS patient_name, p.email AS patient_email,
        a.doctor_id, d.public_id AS doctor_public_id, d.name AS doctor_name, d.email AS doctor_email,
        a.date, a.time_slot_id, t.public_id AS time_slot_public_id, t.time, t.duration_minutes,
        a.status, a.note, a.created_at, a.updated_at
     FROM appointments a
     JOIN users p ON p.id = a.patient_id
     JOIN users d ON d.id = a.doctor_id
     JOIN time_slots t ON t.id = a.time_slot_id";

#[derive(Clone)]
pub struct AppointmentRepository {
    pool: SqlitePool,
}

impl AppointmentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn find_by_public_id(&self, public_id: &str) -> DatabaseResult<Option<Appointment>> {
        let appointment =
            sqlx::query_as::<_, Appointment>(&format!("{APPOINTMENT_SELECT} WHERE a.public_id = ?"))
                .bind(public_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(appointment)
    }

    /// Whether the patient already holds this doctor's slot on that date.
    pub async fn exists(&self, new: &NewAppointment) -> DatabaseResult<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM appointments
             WHERE doctor_id = ? AND date = ? AND time_slot_id = ? AND patient_id = ?",
        )
        .bind(new.doctor_id)
        .bind(&new.date)
        .bind(new.time_slot_id)
        .bind(new.patient_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count > 0)
    }

    /// Insert a pending appointment. A second booking of the same
    /// doctor/date/slot/patient fails with [`DatabaseError::Duplicate`].
    pub async fn create(&self, new: &NewAppointment) -> DatabaseResult<Appointment> {
        let now = timestamp();
        let public_id = new_public_id();

        sqlx::query(
            "INSERT INTO appointments (public_id, patient_id, doctor_id, date, time_slot_id, status, note, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&public_id)
        .bind(new.patient_id)
        .bind(new.doctor_id)
        .bind(&new.date)
        .bind(new.time_slot_id)
        .bind(AppointmentStatus::Pending)
        .bind(&new.note)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        self.find_by_public_id(&public_id)
            .await?
            .ok_or_else(|| DatabaseError::QueryError("failed to retrieve created appointment".into()))
    }

    pub async fn list(&self, filter: &AppointmentFilter) -> DatabaseResult<Vec<Appointment>> {
        let appointments = sqlx::query_as::<_, Appointment>(&format!(
            "{APPOINTMENT_SELECT}
             WHERE (?1 IS NULL OR a.patient_id = ?1)
               AND (?2 IS NULL OR a.doctor_id = ?2)
               AND (?3 IS NULL OR a.status = ?3)
               AND (?4 IS NULL OR a.date = ?4)
               AND (?5 IS NULL OR a.patient_id = ?5 OR a.doctor_id = ?5)
             ORDER BY a.date DESC, t.time DESC, a.id DESC"
        ))
        .bind(filter.patient_id)
        .bind(filter.doctor_id)
        .bind(filter.status.map(|status| status.as_str()))
        .bind(filter.date.as_deref())
        .bind(filter.participant_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(appointments)
    }

    /// Move an appointment from `from` to `to`.
    ///
    /// Applies only while the stored status is still `from`, otherwise
    /// returns [`DatabaseError::Constraint`].
    pub async fn update_status(
        &self,
        id: i64,
        from: AppointmentStatus,
        to: AppointmentStatus,
    ) -> DatabaseResult<()> {
        let result = sqlx::query(
            "UPDATE appointments SET status = ?, updated_at = ? WHERE id = ? AND status = ?",
        )
        .bind(to)
        .bind(timestamp())
        .bind(id)
        .bind(from)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::Constraint(format!(
                "appointment is no longer {from}"
            )));
        }
        Ok(())
    }
}
