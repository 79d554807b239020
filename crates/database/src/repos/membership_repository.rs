//! Membership plans, fees and subscriptions.

use crate::entities::{
    Fee, FeeFields, Membership, MembershipFields, Subscription, SubscriptionStatus,
};
use crate::repos::ordering::{next_sort_order, reorder, SortableTable};
use crate::repos::reference_repository::delete_row;
use crate::types::{DatabaseError, DatabaseResult};
use crate::{new_public_id, timestamp};
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

const MEMBERSHIP_COLUMNS: &str =
    "id, public_id, name, description, sort_order, created_at, updated_at";
const FEE_COLUMNS: &str =
    "id, public_id, membership_id, label, amount, period, created_at, updated_at";
const SUBSCRIPTION_SELECT: &str = "SELECT s.id, s.public_id, s.user_id, u.public_id AS user_public_id,
        s.membership_id, m.public_id AS membership_public_id, m.name AS membership_name,
        s.fee_id, f.public_id AS fee_public_id, f.amount, f.period,
        s.status, s.starts_at, s.ends_at, s.created_at, s.updated_at
     FROM subscriptions s
     JOIN users u ON u.id = s.user_id
     JOIN memberships m ON m.id = s.membership_id
     JOIN fees f ON f.id = s.fee_id";

#[derive(Clone)]
pub struct MembershipRepository {
    pool: SqlitePool,
}

impl MembershipRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn list(&self) -> DatabaseResult<Vec<Membership>> {
        let memberships = sqlx::query_as::<_, Membership>(&format!(
            "SELECT {MEMBERSHIP_COLUMNS} FROM memberships ORDER BY sort_order, name"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(memberships)
    }

    pub async fn find(&self, public_id: &str) -> DatabaseResult<Option<Membership>> {
        let membership = sqlx::query_as::<_, Membership>(&format!(
            "SELECT {MEMBERSHIP_COLUMNS} FROM memberships WHERE public_id = ?"
        ))
        .bind(public_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(membership)
    }

    pub async fn create(&self, fields: &MembershipFields) -> DatabaseResult<Membership> {
        let now = timestamp();
        let public_id = new_public_id();
        let sort_order = next_sort_order(&self.pool, SortableTable::Memberships).await?;

        sqlx::query(
            "INSERT INTO memberships (public_id, name, description, sort_order, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&public_id)
        .bind(&fields.name)
        .bind(&fields.description)
        .bind(sort_order)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        self.find(&public_id)
            .await?
            .ok_or_else(|| DatabaseError::not_found("membership"))
    }

    pub async fn update(&self, id: i64, fields: &MembershipFields) -> DatabaseResult<Membership> {
        sqlx::query("UPDATE memberships SET name = ?, description = ?, updated_at = ? WHERE id = ?")
            .bind(&fields.name)
            .bind(&fields.description)
            .bind(timestamp())
            .bind(id)
            .execute(&self.pool)
            .await?;

        let membership = sqlx::query_as::<_, Membership>(&format!(
            "SELECT {MEMBERSHIP_COLUMNS} FROM memberships WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        membership.ok_or_else(|| DatabaseError::not_found("membership"))
    }

    pub async fn delete(&self, id: i64) -> DatabaseResult<()> {
        delete_row(&self.pool, "memberships", id).await
    }

    pub async fn reorder(&self, public_ids: &[String]) -> DatabaseResult<()> {
        reorder(&self.pool, SortableTable::Memberships, public_ids).await
    }

    // Fees

    pub async fn list_fees(&self, membership_id: i64) -> DatabaseResult<Vec<Fee>> {
        let fees = sqlx::query_as::<_, Fee>(&format!(
            "SELECT {FEE_COLUMNS} FROM fees WHERE membership_id = ? ORDER BY amount, id"
        ))
        .bind(membership_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(fees)
    }

    pub async fn find_fee(&self, public_id: &str) -> DatabaseResult<Option<Fee>> {
        let fee = sqlx::query_as::<_, Fee>(&format!(
            "SELECT {FEE_COLUMNS} FROM fees WHERE public_id = ?"
        ))
        .bind(public_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(fee)
    }

    pub async fn create_fee(&self, membership_id: i64, fields: &FeeFields) -> DatabaseResult<Fee> {
        let now = timestamp();
        let public_id = new_public_id();

        sqlx::query(
            "INSERT INTO fees (public_id, membership_id, label, amount, period, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&public_id)
        .bind(membership_id)
        .bind(&fields.label)
        .bind(fields.amount)
        .bind(fields.period)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        self.find_fee(&public_id)
            .await?
            .ok_or_else(|| DatabaseError::not_found("fee"))
    }

    pub async fn update_fee(&self, id: i64, fields: &FeeFields) -> DatabaseResult<Fee> {
        sqlx::query("UPDATE fees SET label = ?, amount = ?, period = ?, updated_at = ? WHERE id = ?")
            .bind(&fields.label)
            .bind(fields.amount)
            .bind(fields.period)
            .bind(timestamp())
            .bind(id)
            .execute(&self.pool)
            .await?;

        let fee = sqlx::query_as::<_, Fee>(&format!("SELECT {FEE_COLUMNS} FROM fees WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        fee.ok_or_else(|| DatabaseError::not_found("fee"))
    }

    /// Fees referenced by a subscription cannot be removed.
    pub async fn delete_fee(&self, id: i64) -> DatabaseResult<()> {
        delete_row(&self.pool, "fees", id).await
    }

    // Subscriptions

    /// Start an active subscription. A second active subscription to the
    /// same membership fails with [`DatabaseError::Duplicate`].
    pub async fn subscribe(
        &self,
        user_id: i64,
        fee: &Fee,
        starts_at: DateTime<Utc>,
    ) -> DatabaseResult<Subscription> {
        let now = timestamp();
        let public_id = new_public_id();
        let ends_at = fee.period.ends_at(starts_at).map(|end| end.to_rfc3339());

        sqlx::query(
            "INSERT INTO subscriptions (public_id, user_id, membership_id, fee_id, status, starts_at, ends_at, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&public_id)
        .bind(user_id)
        .bind(fee.membership_id)
        .bind(fee.id)
        .bind(SubscriptionStatus::Active)
        .bind(starts_at.to_rfc3339())
        .bind(&ends_at)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        self.find_subscription(&public_id)
            .await?
            .ok_or_else(|| DatabaseError::not_found("subscription"))
    }

    pub async fn find_subscription(&self, public_id: &str) -> DatabaseResult<Option<Subscription>> {
        let subscription =
            sqlx::query_as::<_, Subscription>(&format!("{SUBSCRIPTION_SELECT} WHERE s.public_id = ?"))
                .bind(public_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(subscription)
    }

    /// Subscriptions of one user, or of everyone when `user_id` is `None`.
    pub async fn list_subscriptions(&self, user_id: Option<i64>) -> DatabaseResult<Vec<Subscription>> {
        let subscriptions = sqlx::query_as::<_, Subscription>(&format!(
            "{SUBSCRIPTION_SELECT} WHERE (?1 IS NULL OR s.user_id = ?1) ORDER BY s.starts_at DESC, s.id DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(subscriptions)
    }

    /// Cancel an active subscription.
    pub async fn cancel_subscription(&self, id: i64) -> DatabaseResult<()> {
        let result = sqlx::query(
            "UPDATE subscriptions SET status = ?, updated_at = ? WHERE id = ? AND status = ?",
        )
        .bind(SubscriptionStatus::Cancelled)
        .bind(timestamp())
        .bind(id)
        .bind(SubscriptionStatus::Active)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::Constraint("subscription is not active".into()));
        }
        Ok(())
    }

    /// Mark active subscriptions whose end lies before `now` as expired.
    pub async fn expire_lapsed(&self, now: DateTime<Utc>) -> DatabaseResult<u64> {
        let result = sqlx::query(
            "UPDATE subscriptions SET status = ?, updated_at = ?
             WHERE status = ? AND ends_at IS NOT NULL AND ends_at <= ?",
        )
        .bind(SubscriptionStatus::Expired)
        .bind(timestamp())
        .bind(SubscriptionStatus::Active)
        .bind(now.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}
