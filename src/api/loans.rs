//! Lending endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use validator::Validate;

use crate::{
    error::AppResult,
    models::{
        loan::{BarcodeLoan, CheckIn, CheckOut, LoanOutcome, OverdueLoan},
        person::StudentLoan,
    },
};

use super::AuthenticatedUser;

/// Lend a copy to a student
#[utoipa::path(
    post,
    path = "/loans/check-out",
    tag = "loans",
    security(("bearer_auth" = [])),
    request_body = CheckOut,
    responses(
        (status = 200, description = "Copy lent", body = LoanOutcome),
        (status = 404, description = "Book or student not found"),
        (status = 409, description = "Copy is not available")
    )
)]
pub async fn check_out(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<CheckOut>,
) -> AppResult<Json<LoanOutcome>> {
    claims.require_staff()?;
    request.validate()?;

    let outcome = state
        .services
        .loans
        .check_out(&request.book_id, &request.student_id, request.due_date)
        .await?;
    Ok(Json(outcome))
}

/// Take a copy back
#[utoipa::path(
    post,
    path = "/loans/check-in",
    tag = "loans",
    security(("bearer_auth" = [])),
    request_body = CheckIn,
    responses(
        (status = 200, description = "Copy returned", body = LoanOutcome),
        (status = 404, description = "Book or student not found"),
        (status = 409, description = "Copy is not lent to this student")
    )
)]
pub async fn check_in(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<CheckIn>,
) -> AppResult<Json<LoanOutcome>> {
    claims.require_staff()?;
    request.validate()?;

    let outcome = state
        .services
        .loans
        .check_in(&request.book_id, &request.student_id)
        .await?;
    Ok(Json(outcome))
}

/// Lend the first available copy under a barcode
#[utoipa::path(
    post,
    path = "/loans/by-barcode/check-out",
    tag = "loans",
    security(("bearer_auth" = [])),
    request_body = BarcodeLoan,
    responses(
        (status = 200, description = "Copy lent", body = LoanOutcome),
        (status = 404, description = "Unknown barcode or student"),
        (status = 409, description = "No copy available, or the barcode needs a title")
    )
)]
pub async fn check_out_by_barcode(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<BarcodeLoan>,
) -> AppResult<Json<LoanOutcome>> {
    claims.require_staff()?;
    request.validate()?;

    let outcome = state
        .services
        .loans
        .check_out_by_barcode(
            &request.barcode,
            request.title.as_deref(),
            &request.student_id,
            request.due_date,
        )
        .await?;
    Ok(Json(outcome))
}

/// Take back the copy a student holds under a barcode
#[utoipa::path(
    post,
    path = "/loans/by-barcode/check-in",
    tag = "loans",
    security(("bearer_auth" = [])),
    request_body = BarcodeLoan,
    responses(
        (status = 200, description = "Copy returned", body = LoanOutcome),
        (status = 404, description = "Unknown barcode or student"),
        (status = 409, description = "Student holds no such copy, or the barcode needs a title")
    )
)]
pub async fn check_in_by_barcode(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<BarcodeLoan>,
) -> AppResult<Json<LoanOutcome>> {
    claims.require_staff()?;
    request.validate()?;

    let outcome = state
        .services
        .loans
        .check_in_by_barcode(&request.barcode, request.title.as_deref(), &request.student_id)
        .await?;
    Ok(Json(outcome))
}

/// Get a student's current loans
#[utoipa::path(
    get,
    path = "/students/{id}/loans",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Student ID")),
    responses(
        (status = 200, description = "Current loans", body = Vec<StudentLoan>),
        (status = 403, description = "Not allowed to view this student"),
        (status = 404, description = "Student not found")
    )
)]
pub async fn student_loans(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(student_id): Path<String>,
) -> AppResult<Json<Vec<StudentLoan>>> {
    claims.require_view_student(&student_id)?;

    let loans = state.services.loans.student_loans(&student_id).await?;
    Ok(Json(loans))
}

/// Copies past their due date
#[utoipa::path(
    get,
    path = "/loans/overdue",
    tag = "loans",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Overdue loans", body = Vec<OverdueLoan>)
    )
)]
pub async fn overdue(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<OverdueLoan>>> {
    claims.require_staff()?;

    Ok(Json(state.services.loans.overdue().await?))
}
