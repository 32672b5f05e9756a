//! Class endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::{class::CreateClass, Class},
    services::classes::Member,
};

use super::AuthenticatedUser;

/// List classes
#[utoipa::path(
    get,
    path = "/classes",
    tag = "classes",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Classes ordered by name", body = Vec<Class>)
    )
)]
pub async fn list_classes(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<Class>>> {
    claims.require_staff()?;

    Ok(Json(state.services.classes.list().await?))
}

/// Get one class
#[utoipa::path(
    get,
    path = "/classes/{id}",
    tag = "classes",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Class ID")),
    responses(
        (status = 200, description = "Class", body = Class),
        (status = 404, description = "Class not found")
    )
)]
pub async fn get_class(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<String>,
) -> AppResult<Json<Class>> {
    claims.require_staff()?;

    Ok(Json(state.services.classes.get(&id).await?))
}

/// Create a class
#[utoipa::path(
    post,
    path = "/classes",
    tag = "classes",
    security(("bearer_auth" = [])),
    request_body = CreateClass,
    responses(
        (status = 201, description = "Class created", body = Class),
        (status = 409, description = "Class name already in use")
    )
)]
pub async fn create_class(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<CreateClass>,
) -> AppResult<(StatusCode, Json<Class>)> {
    claims.require_admin()?;

    let class = state.services.classes.create(request).await?;
    Ok((StatusCode::CREATED, Json(class)))
}

/// Rename a class
#[utoipa::path(
    put,
    path = "/classes/{id}",
    tag = "classes",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Class ID")),
    request_body = CreateClass,
    responses(
        (status = 200, description = "Class renamed", body = Class),
        (status = 404, description = "Class not found"),
        (status = 409, description = "Class name already in use")
    )
)]
pub async fn rename_class(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<String>,
    Json(request): Json<CreateClass>,
) -> AppResult<Json<Class>> {
    claims.require_admin()?;

    Ok(Json(state.services.classes.rename(&id, request).await?))
}

/// Delete a class and every membership
#[utoipa::path(
    delete,
    path = "/classes/{id}",
    tag = "classes",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Class ID")),
    responses(
        (status = 204, description = "Class deleted"),
        (status = 404, description = "Class not found")
    )
)]
pub async fn delete_class(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    claims.require_admin()?;

    state.services.classes.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Add a student to a class
#[utoipa::path(
    post,
    path = "/classes/{id}/students/{student_id}",
    tag = "classes",
    security(("bearer_auth" = [])),
    params(
        ("id" = String, Path, description = "Class ID"),
        ("student_id" = String, Path, description = "Student ID")
    ),
    responses(
        (status = 200, description = "Updated class", body = Class),
        (status = 404, description = "Class or student not found")
    )
)]
pub async fn add_student(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path((id, student_id)): Path<(String, String)>,
) -> AppResult<Json<Class>> {
    claims.require_staff()?;

    let class = state
        .services
        .classes
        .add_member(&id, Member::Student, &student_id)
        .await?;
    Ok(Json(class))
}

/// Remove a student from a class
#[utoipa::path(
    delete,
    path = "/classes/{id}/students/{student_id}",
    tag = "classes",
    security(("bearer_auth" = [])),
    params(
        ("id" = String, Path, description = "Class ID"),
        ("student_id" = String, Path, description = "Student ID")
    ),
    responses(
        (status = 200, description = "Updated class", body = Class),
        (status = 404, description = "Class or student not found")
    )
)]
pub async fn remove_student(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path((id, student_id)): Path<(String, String)>,
) -> AppResult<Json<Class>> {
    claims.require_staff()?;

    let class = state
        .services
        .classes
        .remove_member(&id, Member::Student, &student_id)
        .await?;
    Ok(Json(class))
}

/// Link a teacher to a class
#[utoipa::path(
    post,
    path = "/classes/{id}/teachers/{teacher_id}",
    tag = "classes",
    security(("bearer_auth" = [])),
    params(
        ("id" = String, Path, description = "Class ID"),
        ("teacher_id" = String, Path, description = "Teacher ID")
    ),
    responses(
        (status = 200, description = "Updated class", body = Class),
        (status = 404, description = "Class or teacher not found")
    )
)]
pub async fn add_teacher(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path((id, teacher_id)): Path<(String, String)>,
) -> AppResult<Json<Class>> {
    claims.require_admin()?;

    let class = state
        .services
        .classes
        .add_member(&id, Member::Teacher, &teacher_id)
        .await?;
    Ok(Json(class))
}

/// Unlink a teacher from a class
#[utoipa::path(
    delete,
    path = "/classes/{id}/teachers/{teacher_id}",
    tag = "classes",
    security(("bearer_auth" = [])),
    params(
        ("id" = String, Path, description = "Class ID"),
        ("teacher_id" = String, Path, description = "Teacher ID")
    ),
    responses(
        (status = 200, description = "Updated class", body = Class),
        (status = 404, description = "Class or teacher not found")
    )
)]
pub async fn remove_teacher(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path((id, teacher_id)): Path<(String, String)>,
) -> AppResult<Json<Class>> {
    claims.require_admin()?;

    let class = state
        .services
        .classes
        .remove_member(&id, Member::Teacher, &teacher_id)
        .await?;
    Ok(Json(class))
}
