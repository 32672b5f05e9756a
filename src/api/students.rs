//! Student account endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use crate::{
    error::AppResult,
    models::{
        person::{CreateStudent, CreatedStudent, StudentDetails, StudentView, UpdateStudent},
        HistoryEntry,
    },
};

use super::AuthenticatedUser;

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StudentListQuery {
    /// Only students of this class
    pub class_id: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct LimitQuery {
    pub limit: Option<usize>,
}

/// List students
#[utoipa::path(
    get,
    path = "/students",
    tag = "students",
    security(("bearer_auth" = [])),
    params(StudentListQuery),
    responses(
        (status = 200, description = "Students ordered by name", body = Vec<StudentView>),
        (status = 403, description = "Staff account required")
    )
)]
pub async fn list_students(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<StudentListQuery>,
) -> AppResult<Json<Vec<StudentView>>> {
    claims.require_staff()?;

    let students = state
        .services
        .people
        .list_students(query.class_id.as_deref())
        .await?;
    Ok(Json(students))
}

/// Get a student with current loans
#[utoipa::path(
    get,
    path = "/students/{id}",
    tag = "students",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Student ID")),
    responses(
        (status = 200, description = "Student details", body = StudentDetails),
        (status = 403, description = "Not allowed to view this student"),
        (status = 404, description = "Student not found")
    )
)]
pub async fn get_student(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<String>,
) -> AppResult<Json<StudentDetails>> {
    claims.require_view_student(&id)?;

    let student = state.services.people.get_student(&id).await?;
    Ok(Json(student))
}

/// Create a student account
#[utoipa::path(
    post,
    path = "/students",
    tag = "students",
    security(("bearer_auth" = [])),
    request_body = CreateStudent,
    responses(
        (status = 201, description = "Student created", body = CreatedStudent),
        (status = 409, description = "Username already in use")
    )
)]
pub async fn create_student(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<CreateStudent>,
) -> AppResult<(StatusCode, Json<CreatedStudent>)> {
    claims.require_staff()?;

    let created = state.services.people.create_student(request).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Update a student account
#[utoipa::path(
    put,
    path = "/students/{id}",
    tag = "students",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Student ID")),
    request_body = UpdateStudent,
    responses(
        (status = 200, description = "Student updated", body = StudentView),
        (status = 404, description = "Student not found"),
        (status = 409, description = "Username already in use")
    )
)]
pub async fn update_student(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<String>,
    Json(request): Json<UpdateStudent>,
) -> AppResult<Json<StudentView>> {
    claims.require_staff()?;

    let student = state.services.people.update_student(&id, request).await?;
    Ok(Json(student))
}

/// Delete a student; borrowed copies go back on the shelf
#[utoipa::path(
    delete,
    path = "/students/{id}",
    tag = "students",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Student ID")),
    responses(
        (status = 204, description = "Student deleted"),
        (status = 404, description = "Student not found")
    )
)]
pub async fn delete_student(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    claims.require_admin()?;

    state.services.people.delete_student(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Lending history of one student
#[utoipa::path(
    get,
    path = "/students/{id}/history",
    tag = "students",
    security(("bearer_auth" = [])),
    params(
        ("id" = String, Path, description = "Student ID"),
        LimitQuery
    ),
    responses(
        (status = 200, description = "Newest first", body = Vec<HistoryEntry>),
        (status = 403, description = "Not allowed to view this student")
    )
)]
pub async fn student_history(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<String>,
    Query(query): Query<LimitQuery>,
) -> AppResult<Json<Vec<HistoryEntry>>> {
    claims.require_view_student(&id)?;

    let entries = state.services.history.for_student(&id, query.limit).await?;
    Ok(Json(entries))
}
