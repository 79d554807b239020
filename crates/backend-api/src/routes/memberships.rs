use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Json,
};
use chrono::Utc;
use clinic_database::{Fee, Membership, Subscription};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    routes::MessageResponse,
    services::{
        memberships::{
            self as membership_service, FeeRequest, MembershipRequest, SubscribeRequest,
            SubscriptionQuery,
        },
        reference::ReorderRequest,
    },
    util::require_bearer,
    ApiError, AppState,
};

#[derive(Debug, Serialize, ToSchema)]
pub struct MembershipsResponse {
    pub success: bool,
    pub memberships: Vec<Membership>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MembershipResponse {
    pub success: bool,
    pub membership: Membership,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FeesResponse {
    pub success: bool,
    pub fees: Vec<Fee>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FeeResponse {
    pub success: bool,
    pub fee: Fee,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SubscriptionsResponse {
    pub success: bool,
    pub subscriptions: Vec<Subscription>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SubscriptionResponse {
    pub success: bool,
    pub subscription: Subscription,
}

#[utoipa::path(
    get,
    path = "/api/memberships",
    tag = "Memberships",
    responses((status = 200, description = "Memberships in display order", body = MembershipsResponse))
)]
pub async fn list_memberships(
    State(state): State<AppState>,
) -> Result<Json<MembershipsResponse>, ApiError> {
    let memberships = membership_service::list(state.db_pool()).await?;
    Ok(Json(MembershipsResponse {
        success: true,
        memberships,
    }))
}

#[utoipa::path(
    get,
    path = "/api/memberships/{membership_id}",
    tag = "Memberships",
    params(("membership_id" = String, Path, description = "Membership public identifier")),
    responses(
        (status = 200, description = "Membership", body = MembershipResponse),
        (status = 404, description = "Membership not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_membership(
    State(state): State<AppState>,
    Path(membership_id): Path<String>,
) -> Result<Json<MembershipResponse>, ApiError> {
    let membership = membership_service::get(state.db_pool(), &membership_id).await?;
    Ok(Json(MembershipResponse {
        success: true,
        membership,
    }))
}

#[utoipa::path(
    post,
    path = "/api/memberships",
    tag = "Memberships",
    security(("bearerAuth" = [])),
    request_body = MembershipRequest,
    responses(
        (status = 200, description = "Membership created", body = MembershipResponse),
        (status = 403, description = "Permission denied", body = crate::error::ErrorResponse),
        (status = 409, description = "Membership already exists", body = crate::error::ErrorResponse),
        (status = 422, description = "Invalid fields", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_membership(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<MembershipRequest>,
) -> Result<Json<MembershipResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let caller = state.caller(&token).await?;

    let membership = membership_service::create(state.db_pool(), &caller, req).await?;
    Ok(Json(MembershipResponse {
        success: true,
        membership,
    }))
}

#[utoipa::path(
    put,
    path = "/api/memberships/{membership_id}",
    tag = "Memberships",
    security(("bearerAuth" = [])),
    params(("membership_id" = String, Path, description = "Membership public identifier")),
    request_body = MembershipRequest,
    responses(
        (status = 200, description = "Membership updated", body = MembershipResponse),
        (status = 403, description = "Permission denied", body = crate::error::ErrorResponse),
        (status = 404, description = "Membership not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_membership(
    State(state): State<AppState>,
    Path(membership_id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<MembershipRequest>,
) -> Result<Json<MembershipResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let caller = state.caller(&token).await?;

    let membership =
        membership_service::update(state.db_pool(), &caller, &membership_id, req).await?;
    Ok(Json(MembershipResponse {
        success: true,
        membership,
    }))
}

#[utoipa::path(
    delete,
    path = "/api/memberships/{membership_id}",
    tag = "Memberships",
    security(("bearerAuth" = [])),
    params(("membership_id" = String, Path, description = "Membership public identifier")),
    responses(
        (status = 200, description = "Membership deleted", body = MessageResponse),
        (status = 409, description = "Membership still has subscriptions", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_membership(
    State(state): State<AppState>,
    Path(membership_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<MessageResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let caller = state.caller(&token).await?;

    membership_service::delete(state.db_pool(), &caller, &membership_id).await?;
    Ok(Json(MessageResponse::ok("Membership deleted")))
}

#[utoipa::path(
    put,
    path = "/api/memberships/reorder",
    tag = "Memberships",
    security(("bearerAuth" = [])),
    request_body = ReorderRequest,
    responses(
        (status = 200, description = "Order saved", body = MessageResponse),
        (status = 422, description = "Unknown id in order", body = crate::error::ErrorResponse)
    )
)]
pub async fn reorder_memberships(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<ReorderRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let caller = state.caller(&token).await?;

    membership_service::reorder(state.db_pool(), &caller, req).await?;
    Ok(Json(MessageResponse::ok("Order saved")))
}

// Fees

#[utoipa::path(
    get,
    path = "/api/memberships/{membership_id}/fees",
    tag = "Memberships",
    params(("membership_id" = String, Path, description = "Membership public identifier")),
    responses(
        (status = 200, description = "Fees of the membership", body = FeesResponse),
        (status = 404, description = "Membership not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_fees(
    State(state): State<AppState>,
    Path(membership_id): Path<String>,
) -> Result<Json<FeesResponse>, ApiError> {
    let fees = membership_service::list_fees(state.db_pool(), &membership_id).await?;
    Ok(Json(FeesResponse {
        success: true,
        fees,
    }))
}

#[utoipa::path(
    post,
    path = "/api/memberships/{membership_id}/fees",
    tag = "Memberships",
    security(("bearerAuth" = [])),
    params(("membership_id" = String, Path, description = "Membership public identifier")),
    request_body = FeeRequest,
    responses(
        (status = 200, description = "Fee created", body = FeeResponse),
        (status = 403, description = "Permission denied", body = crate::error::ErrorResponse),
        (status = 422, description = "Invalid fields", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_fee(
    State(state): State<AppState>,
    Path(membership_id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<FeeRequest>,
) -> Result<Json<FeeResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let caller = state.caller(&token).await?;

    let fee = membership_service::create_fee(state.db_pool(), &caller, &membership_id, req).await?;
    Ok(Json(FeeResponse { success: true, fee }))
}

#[utoipa::path(
    put,
    path = "/api/fees/{fee_id}",
    tag = "Memberships",
    security(("bearerAuth" = [])),
    params(("fee_id" = String, Path, description = "Fee public identifier")),
    request_body = FeeRequest,
    responses(
        (status = 200, description = "Fee updated", body = FeeResponse),
        (status = 404, description = "Fee not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_fee(
    State(state): State<AppState>,
    Path(fee_id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<FeeRequest>,
) -> Result<Json<FeeResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let caller = state.caller(&token).await?;

    let fee = membership_service::update_fee(state.db_pool(), &caller, &fee_id, req).await?;
    Ok(Json(FeeResponse { success: true, fee }))
}

#[utoipa::path(
    delete,
    path = "/api/fees/{fee_id}",
    tag = "Memberships",
    security(("bearerAuth" = [])),
    params(("fee_id" = String, Path, description = "Fee public identifier")),
    responses(
        (status = 200, description = "Fee deleted", body = MessageResponse),
        (status = 409, description = "Fee still has subscriptions", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_fee(
    State(state): State<AppState>,
    Path(fee_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<MessageResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let caller = state.caller(&token).await?;

    membership_service::delete_fee(state.db_pool(), &caller, &fee_id).await?;
    Ok(Json(MessageResponse::ok("Fee deleted")))
}

// Subscriptions

#[utoipa::path(
    get,
    path = "/api/subscriptions",
    tag = "Memberships",
    security(("bearerAuth" = [])),
    params(SubscriptionQuery),
    responses(
        (status = 200, description = "Subscriptions", body = SubscriptionsResponse),
        (status = 403, description = "Listing all requires memberships.manage", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_subscriptions(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<SubscriptionQuery>,
) -> Result<Json<SubscriptionsResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let caller = state.caller(&token).await?;

    let subscriptions =
        membership_service::list_subscriptions(state.db_pool(), &caller, query, Utc::now()).await?;
    Ok(Json(SubscriptionsResponse {
        success: true,
        subscriptions,
    }))
}

#[utoipa::path(
    post,
    path = "/api/subscriptions",
    tag = "Memberships",
    security(("bearerAuth" = [])),
    request_body = SubscribeRequest,
    responses(
        (status = 200, description = "Subscribed", body = SubscriptionResponse),
        (status = 409, description = "Already subscribed to this membership", body = crate::error::ErrorResponse),
        (status = 422, description = "Invalid membership or fee", body = crate::error::ErrorResponse)
    )
)]
pub async fn subscribe(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<SubscribeRequest>,
) -> Result<Json<SubscriptionResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let caller = state.caller(&token).await?;

    let subscription =
        membership_service::subscribe(state.db_pool(), &caller, req, Utc::now()).await?;
    Ok(Json(SubscriptionResponse {
        success: true,
        subscription,
    }))
}

#[utoipa::path(
    post,
    path = "/api/subscriptions/{subscription_id}/cancel",
    tag = "Memberships",
    security(("bearerAuth" = [])),
    params(("subscription_id" = String, Path, description = "Subscription public identifier")),
    responses(
        (status = 200, description = "Subscription cancelled", body = SubscriptionResponse),
        (status = 404, description = "Subscription not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Subscription is not active", body = crate::error::ErrorResponse)
    )
)]
pub async fn cancel_subscription(
    State(state): State<AppState>,
    Path(subscription_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<SubscriptionResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let caller = state.caller(&token).await?;

    let subscription =
        membership_service::cancel_subscription(state.db_pool(), &caller, &subscription_id)
            .await?;
    Ok(Json(SubscriptionResponse {
        success: true,
        subscription,
    }))
}
