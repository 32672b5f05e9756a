//! Folder endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::{class::SaveFolder, Folder},
};

use super::AuthenticatedUser;

/// List folders
#[utoipa::path(
    get,
    path = "/folders",
    tag = "folders",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Folders ordered by name", body = Vec<Folder>)
    )
)]
pub async fn list_folders(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
) -> AppResult<Json<Vec<Folder>>> {
    Ok(Json(state.services.catalog.list_folders().await?))
}

/// Create a folder
#[utoipa::path(
    post,
    path = "/folders",
    tag = "folders",
    security(("bearer_auth" = [])),
    request_body = SaveFolder,
    responses(
        (status = 201, description = "Folder created", body = Folder),
        (status = 409, description = "Folder name already in use")
    )
)]
pub async fn create_folder(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<SaveFolder>,
) -> AppResult<(StatusCode, Json<Folder>)> {
    claims.require_admin()?;

    let folder = state.services.catalog.create_folder(request).await?;
    Ok((StatusCode::CREATED, Json(folder)))
}

/// Update a folder
#[utoipa::path(
    put,
    path = "/folders/{id}",
    tag = "folders",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Folder ID")),
    request_body = SaveFolder,
    responses(
        (status = 200, description = "Folder updated", body = Folder),
        (status = 404, description = "Folder not found")
    )
)]
pub async fn update_folder(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<String>,
    Json(request): Json<SaveFolder>,
) -> AppResult<Json<Folder>> {
    claims.require_admin()?;

    Ok(Json(state.services.catalog.update_folder(&id, request).await?))
}

/// Delete a folder; its books keep existing without a folder
#[utoipa::path(
    delete,
    path = "/folders/{id}",
    tag = "folders",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Folder ID")),
    responses(
        (status = 204, description = "Folder deleted"),
        (status = 404, description = "Folder not found")
    )
)]
pub async fn delete_folder(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    claims.require_admin()?;

    state.services.catalog.delete_folder(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
