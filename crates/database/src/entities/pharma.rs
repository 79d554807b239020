//! Pharmacy reference data

use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;

/// Brands and medication forms only carry a name.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow, ToSchema)]
pub struct NamedItem {
    #[serde(skip_serializing)]
    pub id: i64,
    pub public_id: String,
    pub name: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, FromRow, ToSchema)]
pub struct Manufacturer {
    #[serde(skip_serializing)]
    pub id: i64,
    pub public_id: String,
    pub name: String,
    pub country: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, FromRow, ToSchema)]
pub struct PharmaCode {
    #[serde(skip_serializing)]
    pub id: i64,
    pub public_id: String,
    pub code: String,
    pub strength: Option<String>,
    pub brand_public_id: String,
    pub brand_name: String,
    pub manufacturer_public_id: String,
    pub manufacturer_name: String,
    pub medication_form_public_id: String,
    pub medication_form_name: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone)]
pub struct PharmaCodeFields {
    pub code: String,
    pub brand_id: i64,
    pub manufacturer_id: i64,
    pub medication_form_id: i64,
    pub strength: Option<String>,
}
