pub mod access;
pub mod appointments;
pub mod auth;
pub mod error;
pub mod files;
pub mod memberships;
pub mod notify;
pub mod pharma;
pub mod reference;
pub mod roles;
pub mod time_slots;
pub mod users;

pub use error::*;
