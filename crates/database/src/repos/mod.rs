//! Database repository implementations

pub mod appointment_repository;
pub mod membership_repository;
pub mod ordering;
pub mod pharma_repository;
pub mod reference_repository;
pub mod role_repository;
pub mod time_slot_repository;
pub mod user_repository;

pub use appointment_repository::AppointmentRepository;
pub use membership_repository::MembershipRepository;
pub use ordering::SortableTable;
pub use pharma_repository::{NamedTable, PharmaRepository};
pub use reference_repository::{ReferenceRepository, UnitKind};
pub use role_repository::RoleRepository;
pub use time_slot_repository::TimeSlotRepository;
pub use user_repository::UserRepository;
