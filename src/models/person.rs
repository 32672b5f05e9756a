//! Student and staff account models

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// Active loan held by a student
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoanRecord {
    pub book_id: String,
    pub borrowed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub grade: String,
    pub username: String,
    #[serde(default)]
    #[schema(write_only)]
    pub password_hash: String,
    #[serde(default)]
    pub must_change_password: bool,
    #[serde(default)]
    pub class_ids: Vec<String>,
    /// Authoritative list of copies currently on loan to this student
    #[serde(default)]
    pub borrowed_books: Vec<LoanRecord>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Student {
    pub fn holds(&self, book_id: &str) -> bool {
        self.borrowed_books.iter().any(|loan| loan.book_id == book_id)
    }
}

/// Staff role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum StaffRole {
    Teacher,
    Admin,
}

impl StaffRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            StaffRole::Teacher => "teacher",
            StaffRole::Admin => "admin",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StaffAccount {
    pub id: String,
    pub role: StaffRole,
    pub name: String,
    pub username: String,
    #[serde(default)]
    #[schema(write_only)]
    pub password_hash: String,
    #[serde(default)]
    pub must_change_password: bool,
    /// Classes taught; always empty for admins
    #[serde(default)]
    pub class_ids: Vec<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Public view of a student (no credentials)
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StudentView {
    pub id: String,
    pub name: String,
    pub grade: String,
    pub username: String,
    pub must_change_password: bool,
    pub class_ids: Vec<String>,
    pub borrowed_books: Vec<LoanRecord>,
}

impl From<&Student> for StudentView {
    fn from(s: &Student) -> Self {
        Self {
            id: s.id.clone(),
            name: s.name.clone(),
            grade: s.grade.clone(),
            username: s.username.clone(),
            must_change_password: s.must_change_password,
            class_ids: s.class_ids.clone(),
            borrowed_books: s.borrowed_books.clone(),
        }
    }
}

/// Public view of a staff account (no credentials)
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StaffView {
    pub id: String,
    pub role: StaffRole,
    pub name: String,
    pub username: String,
    pub must_change_password: bool,
    pub class_ids: Vec<String>,
}

impl From<&StaffAccount> for StaffView {
    fn from(s: &StaffAccount) -> Self {
        Self {
            id: s.id.clone(),
            role: s.role,
            name: s.name.clone(),
            username: s.username.clone(),
            must_change_password: s.must_change_password,
            class_ids: s.class_ids.clone(),
        }
    }
}

/// A loan as shown on a student's page
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StudentLoan {
    pub book_id: String,
    pub title: String,
    pub author: String,
    pub barcode: String,
    pub borrowed_at: DateTime<Utc>,
    pub due_date: Option<NaiveDate>,
    pub overdue: bool,
}

/// Student with resolved loans
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StudentDetails {
    #[serde(flatten)]
    pub student: StudentView,
    pub loans: Vec<StudentLoan>,
}

/// Create student request
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateStudent {
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,
    #[validate(length(min = 1, message = "username is required"))]
    pub username: String,
    pub grade: Option<String>,
    /// Generated when omitted
    pub password: Option<String>,
    #[serde(default)]
    pub class_ids: Vec<String>,
}

/// Update student request
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStudent {
    pub name: Option<String>,
    pub grade: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Create teacher/admin request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateStaff {
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,
    #[validate(length(min = 1, message = "username is required"))]
    pub username: String,
    pub role: StaffRole,
    pub password: Option<String>,
    #[serde(default)]
    pub class_ids: Vec<String>,
}

/// Account creation result; the plaintext password is only returned here
#[derive(Debug, Clone, Serialize, ToSchema)]
#[aliases(CreatedStudent = CreatedAccount<StudentView>, CreatedStaff = CreatedAccount<StaffView>)]
#[serde(rename_all = "camelCase")]
pub struct CreatedAccount<T> {
    pub account: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated_password: Option<String>,
}
