//! Staff account endpoints (teachers and administrators)

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::person::{CreateStaff, CreatedStaff, StaffView},
};

use super::AuthenticatedUser;

/// List staff accounts
#[utoipa::path(
    get,
    path = "/teachers",
    tag = "teachers",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Staff ordered by name", body = Vec<StaffView>),
        (status = 403, description = "Administrator account required")
    )
)]
pub async fn list_staff(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<StaffView>>> {
    claims.require_admin()?;

    Ok(Json(state.services.people.list_staff().await?))
}

/// Create a teacher or administrator
#[utoipa::path(
    post,
    path = "/teachers",
    tag = "teachers",
    security(("bearer_auth" = [])),
    request_body = CreateStaff,
    responses(
        (status = 201, description = "Account created", body = CreatedStaff),
        (status = 409, description = "Username already in use")
    )
)]
pub async fn create_staff(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<CreateStaff>,
) -> AppResult<(StatusCode, Json<CreatedStaff>)> {
    claims.require_admin()?;

    let created = state.services.people.create_staff(request).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Delete a staff account
#[utoipa::path(
    delete,
    path = "/teachers/{id}",
    tag = "teachers",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Staff account ID")),
    responses(
        (status = 204, description = "Account deleted"),
        (status = 404, description = "Account not found"),
        (status = 409, description = "Own account or last administrator")
    )
)]
pub async fn delete_staff(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    claims.require_admin()?;

    state.services.people.delete_staff(&id, &claims.sub).await?;
    Ok(StatusCode::NO_CONTENT)
}
