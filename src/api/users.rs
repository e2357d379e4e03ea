//! User management endpoints (librarian only)

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::{
        borrow::BorrowRecord,
        user::{CreateUser, UpdateUser, User},
    },
    AppState,
};

use super::{parse_user_id, AppJson, AuthenticatedUser, MessageResponse};

/// List every user
#[utoipa::path(
    get,
    path = "/librarian/users",
    tag = "users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "All users", body = Vec<User>),
        (status = 403, description = "Not a librarian", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_users(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<User>>> {
    claims.require_librarian()?;
    Ok(Json(state.services.users.list_users(None).await?))
}

#[utoipa::path(
    get,
    path = "/librarian/users/active",
    tag = "users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Active users", body = Vec<User>)
    )
)]
pub async fn list_active_users(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<User>>> {
    claims.require_librarian()?;
    Ok(Json(state.services.users.list_users(Some(true)).await?))
}

/// Users that were deactivated or never borrowed anything
#[utoipa::path(
    get,
    path = "/librarian/users/deleted",
    tag = "users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Inactive users", body = Vec<User>)
    )
)]
pub async fn list_inactive_users(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<User>>> {
    claims.require_librarian()?;
    Ok(Json(state.services.users.list_users(Some(false)).await?))
}

/// Get member details by ID
#[utoipa::path(
    get,
    path = "/librarian/users/{user_id}",
    tag = "users",
    security(("bearer_auth" = [])),
    params(("user_id" = String, Path, description = "User ID (UUID)")),
    responses(
        (status = 200, description = "User details", body = User),
        (status = 400, description = "Malformed user id", body = crate::error::ErrorResponse),
        (status = 404, description = "User not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_user(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(user_id): Path<String>,
) -> AppResult<Json<User>> {
    claims.require_librarian()?;
    let id = parse_user_id(&user_id)?;
    Ok(Json(state.services.users.get_user(id).await?))
}

/// Create a member account
#[utoipa::path(
    post,
    path = "/librarian/users",
    tag = "users",
    security(("bearer_auth" = [])),
    request_body = CreateUser,
    responses(
        (status = 201, description = "User created", body = User),
        (status = 400, description = "Invalid input", body = crate::error::ErrorResponse),
        (status = 409, description = "Username already exists", body = crate::error::ErrorResponse)
    )
)]
pub async fn add_user(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    AppJson(request): AppJson<CreateUser>,
) -> AppResult<(StatusCode, Json<User>)> {
    claims.require_librarian()?;

    let user = state.services.users.add_user(request).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

#[utoipa::path(
    put,
    path = "/librarian/users/{user_id}",
    tag = "users",
    security(("bearer_auth" = [])),
    params(("user_id" = String, Path, description = "User ID (UUID)")),
    request_body = UpdateUser,
    responses(
        (status = 200, description = "User updated", body = User),
        (status = 404, description = "User not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_user(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(user_id): Path<String>,
    AppJson(request): AppJson<UpdateUser>,
) -> AppResult<Json<User>> {
    claims.require_librarian()?;
    let id = parse_user_id(&user_id)?;
    Ok(Json(state.services.users.update_user(id, request).await?))
}

/// Deactivate a member (soft delete)
#[utoipa::path(
    delete,
    path = "/librarian/users/{user_id}",
    tag = "users",
    security(("bearer_auth" = [])),
    params(("user_id" = String, Path, description = "User ID (UUID)")),
    responses(
        (status = 200, description = "User deactivated", body = MessageResponse),
        (status = 403, description = "Target is a librarian", body = crate::error::ErrorResponse),
        (status = 404, description = "User not found", body = crate::error::ErrorResponse),
        (status = 409, description = "User still holds books", body = crate::error::ErrorResponse)
    )
)]
pub async fn deactivate_user(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(user_id): Path<String>,
) -> AppResult<Json<MessageResponse>> {
    claims.require_librarian()?;
    let id = parse_user_id(&user_id)?;

    state.services.users.deactivate_user(id).await?;
    Ok(Json(MessageResponse::new("user deactivated successfully")))
}

/// Delete a member for good; the borrow ledger keeps its records
#[utoipa::path(
    delete,
    path = "/librarian/users/{user_id}/force",
    tag = "users",
    security(("bearer_auth" = [])),
    params(("user_id" = String, Path, description = "User ID (UUID)")),
    responses(
        (status = 200, description = "User deleted", body = MessageResponse),
        (status = 403, description = "Target is a librarian", body = crate::error::ErrorResponse),
        (status = 404, description = "User not found", body = crate::error::ErrorResponse),
        (status = 409, description = "User still holds books", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_user(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(user_id): Path<String>,
) -> AppResult<Json<MessageResponse>> {
    claims.require_librarian()?;
    let id = parse_user_id(&user_id)?;

    state.services.users.delete_user(id).await?;
    Ok(Json(MessageResponse::new("user deleted successfully")))
}

/// Borrow history of a user, oldest first
#[utoipa::path(
    get,
    path = "/librarian/users/{user_id}/history",
    tag = "users",
    security(("bearer_auth" = [])),
    params(("user_id" = String, Path, description = "User ID (UUID)")),
    responses(
        (status = 200, description = "Borrow records", body = Vec<BorrowRecord>)
    )
)]
pub async fn user_history(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(user_id): Path<String>,
) -> AppResult<Json<Vec<BorrowRecord>>> {
    claims.require_librarian()?;
    let id = parse_user_id(&user_id)?;
    Ok(Json(state.services.users.history(id).await?))
}
