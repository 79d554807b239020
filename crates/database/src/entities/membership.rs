//! Membership plans, their fees and user subscriptions

use chrono::{DateTime, Months, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

use crate::types::UnknownVariant;

#[derive(Debug, Clone, PartialEq, Serialize, FromRow, ToSchema)]
pub struct Membership {
    #[serde(skip_serializing)]
    pub id: i64,
    pub public_id: String,
    pub name: String,
    pub description: Option<String>,
    pub sort_order: i64,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone)]
pub struct MembershipFields {
    pub name: String,
    pub description: Option<String>,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum FeePeriod {
    Monthly,
    Yearly,
    OneTime,
}

impl FeePeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeePeriod::Monthly => "monthly",
            FeePeriod::Yearly => "yearly",
            FeePeriod::OneTime => "one_time",
        }
    }

    /// End of a subscription started at `starts_at`; one-time fees never lapse.
    pub fn ends_at(self, starts_at: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            FeePeriod::Monthly => starts_at.checked_add_months(Months::new(1)),
            FeePeriod::Yearly => starts_at.checked_add_months(Months::new(12)),
            FeePeriod::OneTime => None,
        }
    }
}

impl fmt::Display for FeePeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeePeriod {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "monthly" => Ok(FeePeriod::Monthly),
            "yearly" => Ok(FeePeriod::Yearly),
            "one_time" => Ok(FeePeriod::OneTime),
            other => Err(UnknownVariant {
                kind: "fee period",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, FromRow, ToSchema)]
pub struct Fee {
    #[serde(skip_serializing)]
    pub id: i64,
    pub public_id: String,
    #[serde(skip_serializing)]
    pub membership_id: i64,
    pub label: String,
    /// Amount in minor currency units.
    pub amount: i64,
    pub period: FeePeriod,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone)]
pub struct FeeFields {
    pub label: String,
    pub amount: i64,
    pub period: FeePeriod,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    Cancelled,
    Expired,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Cancelled => "cancelled",
            SubscriptionStatus::Expired => "expired",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, FromRow, ToSchema)]
pub struct Subscription {
    #[serde(skip_serializing)]
    pub id: i64,
    pub public_id: String,
    #[serde(skip_serializing)]
    pub user_id: i64,
    pub user_public_id: String,
    #[serde(skip_serializing)]
    pub membership_id: i64,
    pub membership_public_id: String,
    pub membership_name: String,
    #[serde(skip_serializing)]
    pub fee_id: i64,
    pub fee_public_id: String,
    pub amount: i64,
    pub period: FeePeriod,
    pub status: SubscriptionStatus,
    pub starts_at: String,
    pub ends_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}
