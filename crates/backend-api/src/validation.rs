//! Field-level input checks shared by the services.
//!
//! Every check appends human readable messages to a [`FieldErrors`] map so a
//! request reports all of its problems at once.

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::services::ServiceError;

pub const MIN_PASSWORD_LENGTH: usize = 6;
pub const MAX_NAME_LENGTH: usize = 120;
pub const MAX_TEXT_LENGTH: usize = 2000;
pub const MAX_NOTE_LENGTH: usize = 500;
pub const MIN_SLOT_MINUTES: i64 = 5;
pub const MAX_SLOT_MINUTES: i64 = 240;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern"));

static TIME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([01]\d|2[0-3]):[0-5]\d$").expect("time pattern"));

static DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("date pattern"));

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn into_inner(self) -> BTreeMap<String, Vec<String>> {
        self.0
    }

    /// `Ok(())` when nothing was recorded.
    pub fn finish(self) -> Result<(), ServiceError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(ServiceError::Validation(self))
        }
    }

    pub fn required(&mut self, field: &str, label: &str, value: &str, max: usize) {
        let value = value.trim();
        if value.is_empty() {
            self.add(field, format!("{label} is required"));
        } else if value.chars().count() > max {
            self.add(field, format!("Maximum {max} characters allowed"));
        }
    }

    pub fn optional_text(&mut self, field: &str, value: Option<&str>, max: usize) {
        if let Some(value) = value {
            if value.chars().count() > max {
                self.add(field, format!("Maximum {max} characters allowed"));
            }
        }
    }

    pub fn email(&mut self, field: &str, value: &str) {
        let value = value.trim();
        if value.is_empty() {
            self.add(field, "Email is required");
        } else if !is_email(value) {
            self.add(field, "Invalid email address");
        }
    }

    pub fn password(&mut self, field: &str, value: &str) {
        if value.is_empty() {
            self.add(field, "Password is required");
        } else if value.chars().count() < MIN_PASSWORD_LENGTH {
            self.add(
                field,
                format!("Minimum {MIN_PASSWORD_LENGTH} characters required"),
            );
        }
    }

    pub fn date(&mut self, field: &str, value: &str) {
        if parse_date(value).is_none() {
            self.add(field, "Date must be formatted as YYYY-MM-DD");
        }
    }

    pub fn time_of_day(&mut self, field: &str, value: &str) {
        if parse_time(value).is_none() {
            self.add(field, "Time must be formatted as HH:MM");
        }
    }

    pub fn non_negative(&mut self, field: &str, value: Option<i64>) {
        if matches!(value, Some(v) if v < 0) {
            self.add(field, "Must not be negative");
        }
    }
}

pub fn is_email(value: &str) -> bool {
    EMAIL_RE.is_match(value)
}

pub fn parse_date(value: &str) -> Option<NaiveDate> {
    if !DATE_RE.is_match(value) {
        return None;
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()
}

pub fn parse_time(value: &str) -> Option<NaiveTime> {
    if !TIME_RE.is_match(value) {
        return None;
    }
    NaiveTime::parse_from_str(value, "%H:%M").ok()
}

/// Trimmed copy of an optional input, with blank strings treated as absent.
pub fn clean(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_owned)
}

/// Trimmed value that keeps blanks, so partial updates can clear a column.
pub fn trimmed(value: Option<&str>) -> Option<String> {
    value.map(|value| value.trim().to_owned())
}
