use chrono::{DateTime, Utc};
use clinic_database::{
    DatabaseError, Fee, FeeFields, FeePeriod, Membership, MembershipFields, MembershipRepository,
    Subscription,
};
use serde::Deserialize;
use sqlx::SqlitePool;
use tracing::{debug, info};
use utoipa::{IntoParams, ToSchema};

use super::access::{Caller, MEMBERSHIPS_MANAGE};
use super::reference::ReorderRequest;
use super::ServiceError;
use crate::validation::{clean, FieldErrors, MAX_NAME_LENGTH, MAX_TEXT_LENGTH};

#[derive(Debug, Deserialize, ToSchema)]
pub struct MembershipRequest {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct FeeRequest {
    pub label: String,
    /// Minor currency units.
    pub amount: i64,
    pub period: FeePeriod,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SubscribeRequest {
    pub membership_id: String,
    pub fee_id: String,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct SubscriptionQuery {
    /// List every subscription instead of the caller's own. Requires `memberships.manage`.
    #[serde(default)]
    pub all: bool,
}

fn repo(pool: &SqlitePool) -> MembershipRepository {
    MembershipRepository::new(pool.clone())
}

pub async fn list(pool: &SqlitePool) -> Result<Vec<Membership>, ServiceError> {
    Ok(repo(pool).list().await?)
}

pub async fn get(pool: &SqlitePool, public_id: &str) -> Result<Membership, ServiceError> {
    repo(pool)
        .find(public_id)
        .await?
        .ok_or_else(|| ServiceError::not_found("Membership not found"))
}

fn membership_fields(req: MembershipRequest) -> Result<MembershipFields, ServiceError> {
    let mut errors = FieldErrors::new();
    errors.required("name", "Name", &req.name, MAX_NAME_LENGTH);
    errors.optional_text("description", req.description.as_deref(), MAX_TEXT_LENGTH);
    errors.finish()?;

    Ok(MembershipFields {
        name: req.name.trim().to_string(),
        description: clean(req.description.as_deref()),
    })
}

fn duplicate_name(err: DatabaseError) -> ServiceError {
    match err {
        DatabaseError::Duplicate(_) => ServiceError::conflict("Membership already exists"),
        other => other.into(),
    }
}

pub async fn create(
    pool: &SqlitePool,
    caller: &Caller,
    req: MembershipRequest,
) -> Result<Membership, ServiceError> {
    caller.require(MEMBERSHIPS_MANAGE)?;
    let fields = membership_fields(req)?;
    repo(pool).create(&fields).await.map_err(duplicate_name)
}

pub async fn update(
    pool: &SqlitePool,
    caller: &Caller,
    public_id: &str,
    req: MembershipRequest,
) -> Result<Membership, ServiceError> {
    caller.require(MEMBERSHIPS_MANAGE)?;
    let membership = get(pool, public_id).await?;
    let fields = membership_fields(req)?;
    repo(pool)
        .update(membership.id, &fields)
        .await
        .map_err(duplicate_name)
}

pub async fn delete(pool: &SqlitePool, caller: &Caller, public_id: &str) -> Result<(), ServiceError> {
    caller.require(MEMBERSHIPS_MANAGE)?;
    let membership = get(pool, public_id).await?;
    repo(pool)
        .delete(membership.id)
        .await
        .map_err(|err| match err {
            DatabaseError::Constraint(_) => {
                ServiceError::conflict("Membership still has subscriptions")
            }
            other => other.into(),
        })?;
    info!(membership = %membership.public_id, "membership deleted");
    Ok(())
}

pub async fn reorder(
    pool: &SqlitePool,
    caller: &Caller,
    req: ReorderRequest,
) -> Result<(), ServiceError> {
    caller.require(MEMBERSHIPS_MANAGE)?;
    repo(pool).reorder(&req.ids).await.map_err(|err| match err {
        DatabaseError::NotFound(_) => ServiceError::invalid("ids", "Unknown id in order"),
        other => other.into(),
    })
}

// Fees

pub async fn list_fees(pool: &SqlitePool, membership_id: &str) -> Result<Vec<Fee>, ServiceError> {
    let membership = get(pool, membership_id).await?;
    Ok(repo(pool).list_fees(membership.id).await?)
}

fn fee_fields(req: FeeRequest) -> Result<FeeFields, ServiceError> {
    let mut errors = FieldErrors::new();
    errors.required("label", "Label", &req.label, MAX_NAME_LENGTH);
    errors.non_negative("amount", Some(req.amount));
    errors.finish()?;

    Ok(FeeFields {
        label: req.label.trim().to_string(),
        amount: req.amount,
        period: req.period,
    })
}

async fn find_fee(pool: &SqlitePool, public_id: &str) -> Result<Fee, ServiceError> {
    repo(pool)
        .find_fee(public_id)
        .await?
        .ok_or_else(|| ServiceError::not_found("Fee not found"))
}

pub async fn create_fee(
    pool: &SqlitePool,
    caller: &Caller,
    membership_id: &str,
    req: FeeRequest,
) -> Result<Fee, ServiceError> {
    caller.require(MEMBERSHIPS_MANAGE)?;
    let membership = get(pool, membership_id).await?;
    let fields = fee_fields(req)?;
    Ok(repo(pool).create_fee(membership.id, &fields).await?)
}

pub async fn update_fee(
    pool: &SqlitePool,
    caller: &Caller,
    fee_id: &str,
    req: FeeRequest,
) -> Result<Fee, ServiceError> {
    caller.require(MEMBERSHIPS_MANAGE)?;
    let fee = find_fee(pool, fee_id).await?;
    let fields = fee_fields(req)?;
    Ok(repo(pool).update_fee(fee.id, &fields).await?)
}

pub async fn delete_fee(pool: &SqlitePool, caller: &Caller, fee_id: &str) -> Result<(), ServiceError> {
    caller.require(MEMBERSHIPS_MANAGE)?;
    let fee = find_fee(pool, fee_id).await?;
    repo(pool).delete_fee(fee.id).await.map_err(|err| match err {
        DatabaseError::Constraint(_) => ServiceError::conflict("Fee still has subscriptions"),
        other => other.into(),
    })
}

// Subscriptions

/// Subscribe the caller. `ends_at` follows from the fee period.
pub async fn subscribe(
    pool: &SqlitePool,
    caller: &Caller,
    req: SubscribeRequest,
    now: DateTime<Utc>,
) -> Result<Subscription, ServiceError> {
    let membership = repo(pool)
        .find(req.membership_id.trim())
        .await?
        .ok_or_else(|| ServiceError::invalid("membership_id", "Membership not found"))?;
    let fee = repo(pool)
        .find_fee(req.fee_id.trim())
        .await?
        .filter(|fee| fee.membership_id == membership.id)
        .ok_or_else(|| ServiceError::invalid("fee_id", "Fee does not belong to this membership"))?;

    expire_lapsed(pool, now).await?;
    let subscription = repo(pool)
        .subscribe(caller.id(), &fee, now)
        .await
        .map_err(|err| match err {
            DatabaseError::Duplicate(_) => {
                ServiceError::conflict("Already subscribed to this membership")
            }
            other => other.into(),
        })?;

    info!(
        subscription = %subscription.public_id,
        user = %caller.user.public_id,
        membership = %membership.public_id,
        "subscribed"
    );
    Ok(subscription)
}

pub async fn list_subscriptions(
    pool: &SqlitePool,
    caller: &Caller,
    query: SubscriptionQuery,
    now: DateTime<Utc>,
) -> Result<Vec<Subscription>, ServiceError> {
    let user_id = if query.all {
        caller.require(MEMBERSHIPS_MANAGE)?;
        None
    } else {
        Some(caller.id())
    };

    expire_lapsed(pool, now).await?;
    Ok(repo(pool).list_subscriptions(user_id).await?)
}

pub async fn cancel_subscription(
    pool: &SqlitePool,
    caller: &Caller,
    public_id: &str,
) -> Result<Subscription, ServiceError> {
    let subscription = repo(pool)
        .find_subscription(public_id)
        .await?
        .filter(|s| s.user_id == caller.id() || caller.can(MEMBERSHIPS_MANAGE))
        .ok_or_else(|| ServiceError::not_found("Subscription not found"))?;

    repo(pool)
        .cancel_subscription(subscription.id)
        .await
        .map_err(|err| match err {
            DatabaseError::Constraint(_) => ServiceError::conflict("Subscription is not active"),
            other => other.into(),
        })?;

    info!(subscription = %subscription.public_id, "subscription cancelled");
    repo(pool)
        .find_subscription(public_id)
        .await?
        .ok_or_else(|| ServiceError::not_found("Subscription not found"))
}

async fn expire_lapsed(pool: &SqlitePool, now: DateTime<Utc>) -> Result<(), ServiceError> {
    let expired = repo(pool).expire_lapsed(now).await?;
    if expired > 0 {
        debug!(expired, "expired lapsed subscriptions");
    }
    Ok(())
}
