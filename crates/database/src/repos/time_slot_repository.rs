//! Doctor time slots.

use crate::entities::{NewTimeSlot, TimeSlot};
use crate::types::DatabaseResult;
use crate::{new_public_id, timestamp};
use sqlx::SqlitePool;
use std::collections::HashSet;

const SLOT_COLUMNS: &str = "id, public_id, doctor_id, time, duration_minutes, active, created_at";

#[derive(Clone)]
pub struct TimeSlotRepository {
    pool: SqlitePool,
}

impl TimeSlotRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Bookable slots of a doctor ordered by time of day.
    pub async fn list_for_doctor(&self, doctor_id: i64) -> DatabaseResult<Vec<TimeSlot>> {
        let slots = sqlx::query_as::<_, TimeSlot>(&format!(
            "SELECT {SLOT_COLUMNS} FROM time_slots WHERE doctor_id = ? AND active = 1 ORDER BY time"
        ))
        .bind(doctor_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(slots)
    }

    pub async fn find_by_public_id(&self, public_id: &str) -> DatabaseResult<Option<TimeSlot>> {
        let slot = sqlx::query_as::<_, TimeSlot>(&format!(
            "SELECT {SLOT_COLUMNS} FROM time_slots WHERE public_id = ?"
        ))
        .bind(public_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(slot)
    }

    /// Replace the slots of a doctor in one transaction.
    ///
    /// Times present in `slots` are inserted or updated in place so their
    /// public ids stay stable. Dropped slots are deleted unless an appointment
    /// still references them, in which case they are retired instead.
    pub async fn replace_for_doctor(
        &self,
        doctor_id: i64,
        slots: &[NewTimeSlot],
    ) -> DatabaseResult<Vec<TimeSlot>> {
        let mut tx = self.pool.begin().await?;
        let wanted: HashSet<&str> = slots.iter().map(|slot| slot.time.as_str()).collect();

        let existing: Vec<(i64, String)> =
            sqlx::query_as("SELECT id, time FROM time_slots WHERE doctor_id = ?")
                .bind(doctor_id)
                .fetch_all(&mut *tx)
                .await?;

        for (slot_id, time) in existing {
            if wanted.contains(time.as_str()) {
                continue;
            }

            let referenced: i64 =
                sqlx::query_scalar("SELECT COUNT(*) FROM appointments WHERE time_slot_id = ?")
                    .bind(slot_id)
                    .fetch_one(&mut *tx)
                    .await?;

            if referenced > 0 {
                sqlx::query("UPDATE time_slots SET active = 0 WHERE id = ?")
                    .bind(slot_id)
                    .execute(&mut *tx)
                    .await?;
            } else {
                sqlx::query("DELETE FROM time_slots WHERE id = ?")
                    .bind(slot_id)
                    .execute(&mut *tx)
                    .await?;
            }
        }

        let now = timestamp();
        for slot in slots {
            sqlx::query(
                "INSERT INTO time_slots (public_id, doctor_id, time, duration_minutes, active, created_at)
                 VALUES (?, ?, ?, ?, 1, ?)
                 ON CONFLICT (doctor_id, time)
                 DO UPDATE SET duration_minutes = excluded.duration_minutes, active = 1",
            )
            .bind(new_public_id())
            .bind(doctor_id)
            .bind(&slot.time)
            .bind(slot.duration_minutes)
            .bind(&now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        self.list_for_doctor(doctor_id).await
    }
}
