//! # Clinic Backend API
//!
//! HTTP surface of the clinic backend: accounts and sessions, doctors and
//! their time slots, appointment booking, reference data, memberships and
//! the pharmacy catalogue.
//!
//! Handlers in [`routes`] stay thin. They authenticate the bearer token,
//! delegate to [`services`] and turn [`services::ServiceError`] into an
//! [`ApiError`] body of the form `{ "success": false, "message": ... }`.

mod error;
mod middleware;
mod state;
mod util;

pub mod docs;
pub mod routes;
pub mod services;
pub mod validation;

pub use error::{ApiError, ErrorResponse};
pub use services::files::{FileStore, LocalFileStore};
pub use state::AppState;

use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        Method,
    },
    middleware as axum_middleware,
    routing::{get, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Room for multipart framing on top of the largest accepted file.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub fn build_router(state: AppState) -> Router {
    let body_limit = usize::try_from(state.config().uploads.max_file_bytes)
        .unwrap_or(usize::MAX)
        .saturating_add(MULTIPART_OVERHEAD);

    Router::new()
        .route("/health", get(routes::health::health_check))
        // Auth routes
        .route("/api/auth/register", post(routes::auth::register))
        .route("/api/auth/login", post(routes::auth::login))
        .route("/api/auth/logout", post(routes::auth::logout))
        .route("/api/auth/me", get(routes::auth::me))
        .route("/api/auth/verify-email", post(routes::auth::verify_email))
        .route(
            "/api/auth/password-reset",
            post(routes::auth::request_password_reset),
        )
        .route("/api/auth/new-password", post(routes::auth::reset_password))
        .route(
            "/api/auth/change-password",
            post(routes::auth::change_password),
        )
        // User routes
        .route(
            "/api/users",
            get(routes::users::list_users).post(routes::users::create_user),
        )
        .route(
            "/api/users/:user_id",
            get(routes::users::get_user)
                .put(routes::users::update_user)
                .delete(routes::users::delete_user),
        )
        .route("/api/users/:user_id/roles", put(routes::users::set_roles))
        .route("/api/profile", put(routes::users::update_profile))
        .route("/api/profile/avatar", post(routes::users::upload_avatar))
        .route("/api/profile/cover", post(routes::users::upload_cover))
        .route("/api/roles", get(routes::roles::list_roles))
        // Doctor routes
        .route("/api/doctors", get(routes::doctors::list_doctors))
        .route(
            "/api/doctors/:doctor_id/profile",
            put(routes::doctors::update_profile),
        )
        .route(
            "/api/doctors/:doctor_id/specialities",
            put(routes::doctors::set_specialities),
        )
        .route(
            "/api/doctors/:doctor_id/time-slots",
            get(routes::doctors::list_time_slots).put(routes::doctors::replace_time_slots),
        )
        // Appointment routes
        .route(
            "/api/appointments",
            get(routes::appointments::list_appointments)
                .post(routes::appointments::book_appointment),
        )
        .route(
            "/api/appointments/:appointment_id",
            get(routes::appointments::get_appointment),
        )
        .route(
            "/api/appointments/:appointment_id/confirm",
            post(routes::appointments::confirm_appointment),
        )
        .route(
            "/api/appointments/:appointment_id/cancel",
            post(routes::appointments::cancel_appointment),
        )
        // Reference data routes
        .route(
            "/api/hospitals",
            get(routes::reference::list_hospitals).post(routes::reference::create_hospital),
        )
        .route(
            "/api/hospitals/reorder",
            put(routes::reference::reorder_hospitals),
        )
        .route(
            "/api/hospitals/:hospital_id",
            get(routes::reference::get_hospital)
                .put(routes::reference::update_hospital)
                .delete(routes::reference::delete_hospital),
        )
        .route(
            "/api/departments",
            get(routes::reference::list_departments).post(routes::reference::create_department),
        )
        .route(
            "/api/departments/reorder",
            put(routes::reference::reorder_departments),
        )
        .route(
            "/api/departments/:department_id",
            get(routes::reference::get_department)
                .put(routes::reference::update_department)
                .delete(routes::reference::delete_department),
        )
        .route(
            "/api/facilities",
            get(routes::reference::list_facilities).post(routes::reference::create_facility),
        )
        .route(
            "/api/facilities/reorder",
            put(routes::reference::reorder_facilities),
        )
        .route(
            "/api/facilities/:facility_id",
            get(routes::reference::get_facility)
                .put(routes::reference::update_facility)
                .delete(routes::reference::delete_facility),
        )
        .route(
            "/api/specialities",
            get(routes::reference::list_specialities).post(routes::reference::create_speciality),
        )
        .route(
            "/api/specialities/reorder",
            put(routes::reference::reorder_specialities),
        )
        .route(
            "/api/specialities/:speciality_id",
            get(routes::reference::get_speciality)
                .put(routes::reference::update_speciality)
                .delete(routes::reference::delete_speciality),
        )
        // Membership routes
        .route(
            "/api/memberships",
            get(routes::memberships::list_memberships)
                .post(routes::memberships::create_membership),
        )
        .route(
            "/api/memberships/reorder",
            put(routes::memberships::reorder_memberships),
        )
        .route(
            "/api/memberships/:membership_id",
            get(routes::memberships::get_membership)
                .put(routes::memberships::update_membership)
                .delete(routes::memberships::delete_membership),
        )
        .route(
            "/api/memberships/:membership_id/fees",
            get(routes::memberships::list_fees).post(routes::memberships::create_fee),
        )
        .route(
            "/api/fees/:fee_id",
            put(routes::memberships::update_fee).delete(routes::memberships::delete_fee),
        )
        .route(
            "/api/subscriptions",
            get(routes::memberships::list_subscriptions).post(routes::memberships::subscribe),
        )
        .route(
            "/api/subscriptions/:subscription_id/cancel",
            post(routes::memberships::cancel_subscription),
        )
        // Pharmacy routes
        .route(
            "/api/pharma/brands",
            get(routes::pharma::list_brands).post(routes::pharma::create_brand),
        )
        .route(
            "/api/pharma/brands/:brand_id",
            put(routes::pharma::update_brand).delete(routes::pharma::delete_brand),
        )
        .route(
            "/api/pharma/medication-forms",
            get(routes::pharma::list_medication_forms)
                .post(routes::pharma::create_medication_form),
        )
        .route(
            "/api/pharma/medication-forms/:form_id",
            put(routes::pharma::update_medication_form)
                .delete(routes::pharma::delete_medication_form),
        )
        .route(
            "/api/pharma/manufacturers",
            get(routes::pharma::list_manufacturers).post(routes::pharma::create_manufacturer),
        )
        .route(
            "/api/pharma/manufacturers/:manufacturer_id",
            put(routes::pharma::update_manufacturer).delete(routes::pharma::delete_manufacturer),
        )
        .route(
            "/api/pharma/codes",
            get(routes::pharma::list_codes).post(routes::pharma::create_code),
        )
        .route(
            "/api/pharma/codes/:code_id",
            put(routes::pharma::update_code).delete(routes::pharma::delete_code),
        )
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", docs::ApiDoc::openapi()))
        .layer(axum_middleware::from_fn(middleware::log_requests))
        .layer(cors_layer())
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
}
