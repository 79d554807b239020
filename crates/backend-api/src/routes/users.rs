use axum::{
    extract::{Multipart, Path, Query, State},
    http::HeaderMap,
    Json,
};
use clinic_database::{ImageKind, User};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    routes::MessageResponse,
    services::users::{
        self as user_service, CreateUserRequest, SetRolesRequest, UpdateProfileRequest,
        UpdateUserRequest, UserDetail, UserQuery,
    },
    util::{read_upload, require_bearer},
    ApiError, AppState,
};

#[derive(Debug, Serialize, ToSchema)]
pub struct UsersResponse {
    pub success: bool,
    pub users: Vec<User>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserResponse {
    pub success: bool,
    pub user: User,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserDetailResponse {
    pub success: bool,
    pub user: UserDetail,
}

#[derive(Debug, ToSchema)]
#[allow(dead_code)]
pub struct ImageUploadForm {
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
}

#[utoipa::path(
    get,
    path = "/api/users",
    tag = "Users",
    security(("bearerAuth" = [])),
    params(UserQuery),
    responses(
        (status = 200, description = "Users matching the filter", body = UsersResponse),
        (status = 401, description = "Authentication required", body = crate::error::ErrorResponse),
        (status = 403, description = "Permission denied", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_users(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<UserQuery>,
) -> Result<Json<UsersResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let caller = state.caller(&token).await?;

    let users = user_service::list_users(state.db_pool(), &caller, query).await?;
    Ok(Json(UsersResponse {
        success: true,
        users,
    }))
}

#[utoipa::path(
    post,
    path = "/api/users",
    tag = "Users",
    security(("bearerAuth" = [])),
    request_body = CreateUserRequest,
    responses(
        (status = 200, description = "User created", body = UserDetailResponse),
        (status = 403, description = "Permission denied", body = crate::error::ErrorResponse),
        (status = 409, description = "Email already in use", body = crate::error::ErrorResponse),
        (status = 422, description = "Invalid fields", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CreateUserRequest>,
) -> Result<Json<UserDetailResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let caller = state.caller(&token).await?;

    let user = user_service::create_user(state.db_pool(), &caller, req).await?;
    Ok(Json(UserDetailResponse {
        success: true,
        user,
    }))
}

#[utoipa::path(
    get,
    path = "/api/users/{user_id}",
    tag = "Users",
    security(("bearerAuth" = [])),
    params(("user_id" = String, Path, description = "User public identifier")),
    responses(
        (status = 200, description = "User with roles", body = UserDetailResponse),
        (status = 403, description = "Permission denied", body = crate::error::ErrorResponse),
        (status = 404, description = "User not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<UserDetailResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let caller = state.caller(&token).await?;

    let user = user_service::get_user(state.db_pool(), &caller, &user_id).await?;
    Ok(Json(UserDetailResponse {
        success: true,
        user,
    }))
}

#[utoipa::path(
    put,
    path = "/api/users/{user_id}",
    tag = "Users",
    security(("bearerAuth" = [])),
    params(("user_id" = String, Path, description = "User public identifier")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated", body = UserDetailResponse),
        (status = 403, description = "Permission denied", body = crate::error::ErrorResponse),
        (status = 404, description = "User not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Email already in use", body = crate::error::ErrorResponse),
        (status = 422, description = "Invalid fields", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<UpdateUserRequest>,
) -> Result<Json<UserDetailResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let caller = state.caller(&token).await?;

    let user = user_service::update_user(state.db_pool(), &caller, &user_id, req).await?;
    Ok(Json(UserDetailResponse {
        success: true,
        user,
    }))
}

#[utoipa::path(
    delete,
    path = "/api/users/{user_id}",
    tag = "Users",
    security(("bearerAuth" = [])),
    params(("user_id" = String, Path, description = "User public identifier")),
    responses(
        (status = 200, description = "User and uploaded files removed", body = MessageResponse),
        (status = 403, description = "Permission denied", body = crate::error::ErrorResponse),
        (status = 404, description = "User not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<MessageResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let caller = state.caller(&token).await?;

    user_service::delete_user(&state, &caller, &user_id)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete user {}: {}", user_id, e);
            ApiError::from(e)
        })?;
    Ok(Json(MessageResponse::ok("User deleted")))
}

#[utoipa::path(
    put,
    path = "/api/users/{user_id}/roles",
    tag = "Users",
    security(("bearerAuth" = [])),
    params(("user_id" = String, Path, description = "User public identifier")),
    request_body = SetRolesRequest,
    responses(
        (status = 200, description = "Roles replaced", body = UserDetailResponse),
        (status = 403, description = "Permission denied", body = crate::error::ErrorResponse),
        (status = 422, description = "Unknown role", body = crate::error::ErrorResponse)
    )
)]
pub async fn set_roles(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<SetRolesRequest>,
) -> Result<Json<UserDetailResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let caller = state.caller(&token).await?;

    let user = user_service::set_roles(state.db_pool(), &caller, &user_id, req).await?;
    Ok(Json(UserDetailResponse {
        success: true,
        user,
    }))
}

#[utoipa::path(
    put,
    path = "/api/profile",
    tag = "Users",
    security(("bearerAuth" = [])),
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated", body = UserResponse),
        (status = 401, description = "Authentication required", body = crate::error::ErrorResponse),
        (status = 422, description = "Invalid fields", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_profile(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let caller = state.caller(&token).await?;

    let user = user_service::update_profile(state.db_pool(), &caller, req).await?;
    Ok(Json(UserResponse {
        success: true,
        user,
    }))
}

#[utoipa::path(
    post,
    path = "/api/profile/avatar",
    tag = "Users",
    security(("bearerAuth" = [])),
    request_body(content = ImageUploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Avatar replaced", body = UserResponse),
        (status = 400, description = "Malformed upload", body = crate::error::ErrorResponse),
        (status = 422, description = "Unsupported or oversized image", body = crate::error::ErrorResponse)
    )
)]
pub async fn upload_avatar(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<Json<UserResponse>, ApiError> {
    upload_image(state, headers, multipart, ImageKind::Avatar).await
}

#[utoipa::path(
    post,
    path = "/api/profile/cover",
    tag = "Users",
    security(("bearerAuth" = [])),
    request_body(content = ImageUploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Cover replaced", body = UserResponse),
        (status = 400, description = "Malformed upload", body = crate::error::ErrorResponse),
        (status = 422, description = "Unsupported or oversized image", body = crate::error::ErrorResponse)
    )
)]
pub async fn upload_cover(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<Json<UserResponse>, ApiError> {
    upload_image(state, headers, multipart, ImageKind::Cover).await
}

async fn upload_image(
    state: AppState,
    headers: HeaderMap,
    multipart: Multipart,
    kind: ImageKind,
) -> Result<Json<UserResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let caller = state.caller(&token).await?;
    let upload = read_upload(multipart).await?;

    let user = user_service::upload_image(
        &state,
        &caller,
        kind,
        upload.content_type.as_deref(),
        &upload.bytes,
    )
    .await?;
    Ok(Json(UserResponse {
        success: true,
        user,
    }))
}
