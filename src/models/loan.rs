//! Lending request and result types

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use super::{book::Book, person::StudentView};

/// Check-out request for a known copy
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckOut {
    #[validate(length(min = 1, message = "bookId is required"))]
    pub book_id: String,
    #[validate(length(min = 1, message = "studentId is required"))]
    pub student_id: String,
    pub due_date: Option<NaiveDate>,
}

/// Check-in request for a known copy
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckIn {
    #[validate(length(min = 1, message = "bookId is required"))]
    pub book_id: String,
    #[validate(length(min = 1, message = "studentId is required"))]
    pub student_id: String,
}

/// Lending addressed by barcode, with an optional title to pick among groups
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BarcodeLoan {
    #[validate(length(min = 1, message = "barcode is required"))]
    pub barcode: String,
    pub title: Option<String>,
    #[validate(length(min = 1, message = "studentId is required"))]
    pub student_id: String,
    /// Ignored on check-in
    pub due_date: Option<NaiveDate>,
}

/// State of both sides after a lending transition
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoanOutcome {
    pub book: Book,
    pub student: StudentView,
}

/// A borrowed copy past its due date
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OverdueLoan {
    pub book_id: String,
    pub title: String,
    pub barcode: String,
    pub student_id: String,
    pub student_name: String,
    pub due_date: NaiveDate,
}
