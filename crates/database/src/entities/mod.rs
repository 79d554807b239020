//! Domain entities for the database layer

pub mod membership;
pub mod pharma;
pub mod reference;
pub mod role;
pub mod schedule;
pub mod user;

pub use membership::{
    Fee, FeeFields, FeePeriod, Membership, MembershipFields, Subscription, SubscriptionStatus,
};
pub use pharma::{Manufacturer, NamedItem, PharmaCode, PharmaCodeFields};
pub use reference::{
    Hospital, HospitalFields, HospitalUnit, HospitalUnitFields, Speciality, SpecialityFields,
};
pub use role::{Role, RoleWithPermissions};
pub use schedule::{
    Appointment, AppointmentFilter, AppointmentStatus, NewAppointment, NewTimeSlot, TimeSlot,
};
pub use user::{DoctorProfileChanges, ImageKind, NewUser, User, UserChanges, UserFilter};
