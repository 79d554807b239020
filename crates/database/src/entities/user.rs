//! User entity definitions

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// A registered account. Doctors carry the optional profile columns.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow, ToSchema)]
pub struct User {
    #[serde(skip_serializing)]
    pub id: i64,
    pub public_id: String,
    pub name: String,
    pub email: String,
    pub email_verified_at: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    pub phone: Option<String>,
    pub image: Option<String>,
    pub cover: Option<String>,
    pub title: Option<String>,
    pub bio: Option<String>,
    pub experience_years: Option<i64>,
    pub consultation_fee: Option<i64>,
    #[serde(skip_serializing)]
    pub hospital_id: Option<i64>,
    pub hospital_public_id: Option<String>,
    pub hospital_name: Option<String>,
    #[serde(skip_serializing)]
    pub department_id: Option<i64>,
    pub department_public_id: Option<String>,
    pub department_name: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl User {
    pub fn is_verified(&self) -> bool {
        self.email_verified_at.is_some()
    }

    /// Uploaded files referenced by this user.
    pub fn stored_files(&self) -> Vec<String> {
        self.image
            .iter()
            .chain(self.cover.iter())
            .cloned()
            .collect()
    }
}

/// Columns needed to insert a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: Option<String>,
    pub phone: Option<String>,
    pub verified: bool,
}

/// Partial update of the account columns; `None` leaves a column untouched
/// and an empty `phone` clears it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// Partial update of the doctor profile columns.
///
/// An empty `title` or `bio` clears the column.
#[derive(Debug, Clone, Default)]
pub struct DoctorProfileChanges {
    pub title: Option<String>,
    pub bio: Option<String>,
    pub experience_years: Option<i64>,
    pub consultation_fee: Option<i64>,
    pub hospital_id: Option<i64>,
    pub department_id: Option<i64>,
    /// Unset the department; ignored when `department_id` is given.
    pub clear_department: bool,
}

/// Which uploaded image of a user is being replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Avatar,
    Cover,
}

impl ImageKind {
    pub fn column(self) -> &'static str {
        match self {
            ImageKind::Avatar => "image",
            ImageKind::Cover => "cover",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    pub role: Option<String>,
    pub search: Option<String>,
}
