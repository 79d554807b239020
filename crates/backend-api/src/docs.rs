use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::{Modify, OpenApi};

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::health::health_check,
        crate::routes::auth::register,
        crate::routes::auth::login,
        crate::routes::auth::logout,
        crate::routes::auth::me,
        crate::routes::auth::verify_email,
        crate::routes::auth::request_password_reset,
        crate::routes::auth::reset_password,
        crate::routes::auth::change_password,
        crate::routes::users::list_users,
        crate::routes::users::create_user,
        crate::routes::users::get_user,
        crate::routes::users::update_user,
        crate::routes::users::delete_user,
        crate::routes::users::set_roles,
        crate::routes::users::update_profile,
        crate::routes::users::upload_avatar,
        crate::routes::users::upload_cover,
        crate::routes::roles::list_roles,
        crate::routes::doctors::list_doctors,
        crate::routes::doctors::update_profile,
        crate::routes::doctors::set_specialities,
        crate::routes::doctors::list_time_slots,
        crate::routes::doctors::replace_time_slots,
        crate::routes::appointments::list_appointments,
        crate::routes::appointments::book_appointment,
        crate::routes::appointments::get_appointment,
        crate::routes::appointments::confirm_appointment,
        crate::routes::appointments::cancel_appointment,
        crate::routes::reference::list_hospitals,
        crate::routes::reference::get_hospital,
        crate::routes::reference::create_hospital,
        crate::routes::reference::update_hospital,
        crate::routes::reference::delete_hospital,
        crate::routes::reference::reorder_hospitals,
        crate::routes::reference::list_departments,
        crate::routes::reference::get_department,
        crate::routes::reference::create_department,
        crate::routes::reference::update_department,
        crate::routes::reference::delete_department,
        crate::routes::reference::reorder_departments,
        crate::routes::reference::list_facilities,
        crate::routes::reference::get_facility,
        crate::routes::reference::create_facility,
        crate::routes::reference::update_facility,
        crate::routes::reference::delete_facility,
        crate::routes::reference::reorder_facilities,
        crate::routes::reference::list_specialities,
        crate::routes::reference::get_speciality,
        crate::routes::reference::create_speciality,
        crate::routes::reference::update_speciality,
        crate::routes::reference::delete_speciality,
        crate::routes::reference::reorder_specialities,
        crate::routes::memberships::list_memberships,
        crate::routes::memberships::get_membership,
        crate::routes::memberships::create_membership,
        crate::routes::memberships::update_membership,
        crate::routes::memberships::delete_membership,
        crate::routes::memberships::reorder_memberships,
        crate::routes::memberships::list_fees,
        crate::routes::memberships::create_fee,
        crate::routes::memberships::update_fee,
        crate::routes::memberships::delete_fee,
        crate::routes::memberships::list_subscriptions,
        crate::routes::memberships::subscribe,
        crate::routes::memberships::cancel_subscription,
        crate::routes::pharma::list_brands,
        crate::routes::pharma::create_brand,
        crate::routes::pharma::update_brand,
        crate::routes::pharma::delete_brand,
        crate::routes::pharma::list_medication_forms,
        crate::routes::pharma::create_medication_form,
        crate::routes::pharma::update_medication_form,
        crate::routes::pharma::delete_medication_form,
        crate::routes::pharma::list_manufacturers,
        crate::routes::pharma::create_manufacturer,
        crate::routes::pharma::update_manufacturer,
        crate::routes::pharma::delete_manufacturer,
        crate::routes::pharma::list_codes,
        crate::routes::pharma::create_code,
        crate::routes::pharma::update_code,
        crate::routes::pharma::delete_code
    ),
    components(
        schemas(
            crate::error::ErrorResponse,
            crate::routes::MessageResponse,
            crate::routes::health::HealthResponse,
            crate::routes::auth::SessionResponse,
            crate::routes::auth::ProfileResponse,
            crate::services::auth::RegisterRequest,
            crate::services::auth::LoginRequest,
            crate::services::auth::TokenRequest,
            crate::services::auth::PasswordResetRequest,
            crate::services::auth::NewPasswordRequest,
            crate::services::auth::ChangePasswordRequest,
            crate::services::auth::Session,
            crate::services::auth::Profile,
            crate::routes::users::UsersResponse,
            crate::routes::users::UserResponse,
            crate::routes::users::UserDetailResponse,
            crate::routes::users::ImageUploadForm,
            crate::services::users::CreateUserRequest,
            crate::services::users::UpdateUserRequest,
            crate::services::users::UpdateProfileRequest,
            crate::services::users::SetRolesRequest,
            crate::services::users::DoctorProfileRequest,
            crate::services::users::SetSpecialitiesRequest,
            crate::services::users::UserDetail,
            crate::services::users::Doctor,
            crate::routes::roles::RolesResponse,
            crate::routes::doctors::DoctorsResponse,
            crate::routes::doctors::DoctorResponse,
            crate::routes::doctors::TimeSlotsResponse,
            crate::services::time_slots::TimeSlotInput,
            crate::services::time_slots::SetTimeSlotsRequest,
            crate::routes::appointments::AppointmentsResponse,
            crate::routes::appointments::AppointmentResponse,
            crate::services::appointments::BookAppointmentRequest,
            crate::routes::reference::HospitalsResponse,
            crate::routes::reference::HospitalResponse,
            crate::routes::reference::UnitsResponse,
            crate::routes::reference::UnitResponse,
            crate::routes::reference::SpecialitiesResponse,
            crate::routes::reference::SpecialityResponse,
            crate::services::reference::HospitalRequest,
            crate::services::reference::UnitRequest,
            crate::services::reference::SpecialityRequest,
            crate::services::reference::ReorderRequest,
            crate::routes::memberships::MembershipsResponse,
            crate::routes::memberships::MembershipResponse,
            crate::routes::memberships::FeesResponse,
            crate::routes::memberships::FeeResponse,
            crate::routes::memberships::SubscriptionsResponse,
            crate::routes::memberships::SubscriptionResponse,
            crate::services::memberships::MembershipRequest,
            crate::services::memberships::FeeRequest,
            crate::services::memberships::SubscribeRequest,
            crate::routes::pharma::NamedItemsResponse,
            crate::routes::pharma::NamedItemResponse,
            crate::routes::pharma::ManufacturersResponse,
            crate::routes::pharma::ManufacturerResponse,
            crate::routes::pharma::CodesResponse,
            crate::routes::pharma::CodeResponse,
            crate::services::pharma::NameRequest,
            crate::services::pharma::ManufacturerRequest,
            crate::services::pharma::CodeRequest,
            clinic_database::User,
            clinic_database::Role,
            clinic_database::RoleWithPermissions,
            clinic_database::TimeSlot,
            clinic_database::Appointment,
            clinic_database::AppointmentStatus,
            clinic_database::Hospital,
            clinic_database::HospitalUnit,
            clinic_database::Speciality,
            clinic_database::Membership,
            clinic_database::Fee,
            clinic_database::FeePeriod,
            clinic_database::Subscription,
            clinic_database::SubscriptionStatus,
            clinic_database::NamedItem,
            clinic_database::Manufacturer,
            clinic_database::PharmaCode
        )
    ),
    tags(
        (name = "Health", description = "Service health endpoints"),
        (name = "Auth", description = "Registration, sessions, email verification and passwords"),
        (name = "Users", description = "User accounts, profiles, images and roles"),
        (name = "Doctors", description = "Doctor directory, profiles and bookable time slots"),
        (name = "Appointments", description = "Booking and the appointment status lifecycle"),
        (name = "Reference", description = "Hospitals, departments, facilities and specialities"),
        (name = "Memberships", description = "Membership plans, fees and subscriptions"),
        (name = "Pharma", description = "Brands, medication forms, manufacturers and codes")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        let schemes = &mut components.security_schemes;

        let mut scheme = SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer));
        if let SecurityScheme::Http(http) = &mut scheme {
            http.bearer_format = Some("Session token".to_string());
        }

        schemes.insert("bearerAuth".to_string(), scheme);
    }
}
