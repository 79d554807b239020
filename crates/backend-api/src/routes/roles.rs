use axum::{extract::State, http::HeaderMap, Json};
use clinic_database::RoleWithPermissions;
use serde::Serialize;
use utoipa::ToSchema;

use crate::{services::roles as role_service, util::require_bearer, ApiError, AppState};

#[derive(Debug, Serialize, ToSchema)]
pub struct RolesResponse {
    pub success: bool,
    pub roles: Vec<RoleWithPermissions>,
}

#[utoipa::path(
    get,
    path = "/api/roles",
    tag = "Users",
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "Roles with their permissions", body = RolesResponse),
        (status = 403, description = "Permission denied", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_roles(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<RolesResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let caller = state.caller(&token).await?;

    let roles = role_service::list_roles(state.db_pool(), &caller).await?;
    Ok(Json(RolesResponse {
        success: true,
        roles,
    }))
}
