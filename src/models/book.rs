//! Book (physical copy) model and related request types

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

/// Lending state of a single copy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum BookStatus {
    #[default]
    Available,
    Borrowed,
}

impl BookStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookStatus::Available => "available",
            BookStatus::Borrowed => "borrowed",
        }
    }
}

impl std::fmt::Display for BookStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One physical copy. Several copies may share a barcode.
///
/// `status == Available` holds exactly when `borrowed_by` and `due_date` are both `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: String,
    pub barcode: String,
    pub title: String,
    pub author: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub folder_id: Option<String>,
    #[serde(default)]
    pub status: BookStatus,
    #[serde(default)]
    pub borrowed_by: Option<String>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub publisher: String,
    #[serde(default)]
    pub published_year: Option<i32>,
    #[serde(default)]
    pub page_count: Option<u32>,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub cover_url: String,
    #[serde(default)]
    pub cover_color: String,
    #[serde(default)]
    pub suitable_for_exam_list: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Book {
    /// New available copy with empty bibliographic fields
    pub fn new(barcode: &str, title: &str, author: &str) -> Self {
        let now = Utc::now();
        Self {
            id: super::new_id(),
            barcode: barcode.to_string(),
            title: title.trim().to_string(),
            author: author.trim().to_string(),
            description: String::new(),
            folder_id: None,
            status: BookStatus::Available,
            borrowed_by: None,
            due_date: None,
            tags: Vec::new(),
            publisher: String::new(),
            published_year: None,
            page_count: None,
            language: String::new(),
            cover_url: String::new(),
            cover_color: String::new(),
            suitable_for_exam_list: false,
            created_at: Some(now),
            updated_at: Some(now),
        }
    }

    pub fn is_available(&self) -> bool {
        self.status == BookStatus::Available
    }

    /// Put the copy on loan
    pub(crate) fn mark_borrowed(&mut self, student_id: &str, due_date: Option<NaiveDate>) {
        self.status = BookStatus::Borrowed;
        self.borrowed_by = Some(student_id.to_string());
        self.due_date = due_date;
        self.updated_at = Some(Utc::now());
    }

    /// Clear every trace of a loan
    pub(crate) fn mark_available(&mut self) {
        self.status = BookStatus::Available;
        self.borrowed_by = None;
        self.due_date = None;
        self.updated_at = Some(Utc::now());
    }

    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        matches!(self.due_date, Some(due) if self.status == BookStatus::Borrowed && due < today)
    }
}

/// Create book request
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateBook {
    #[validate(length(min = 1, message = "title is required"))]
    pub title: String,
    #[validate(length(min = 1, message = "author is required"))]
    pub author: String,
    #[validate(length(min = 1, message = "barcode is required"))]
    pub barcode: String,
    pub description: Option<String>,
    pub folder_id: Option<String>,
    pub tags: Option<Vec<String>>,
    pub publisher: Option<String>,
    pub published_year: Option<i32>,
    pub page_count: Option<u32>,
    pub language: Option<String>,
    pub cover_url: Option<String>,
    pub cover_color: Option<String>,
    pub suitable_for_exam_list: Option<bool>,
    /// Number of copies to create (default 1)
    #[validate(range(min = 1, max = 200))]
    pub copies: Option<u32>,
    /// Allow adding copies under a barcode that is already in use
    #[serde(default)]
    pub as_copy: bool,
}

/// Update book request; absent fields are left untouched
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBook {
    pub title: Option<String>,
    pub author: Option<String>,
    pub barcode: Option<String>,
    pub description: Option<String>,
    /// An empty string clears the folder
    pub folder_id: Option<String>,
    pub tags: Option<Vec<String>>,
    pub publisher: Option<String>,
    pub published_year: Option<i32>,
    pub page_count: Option<u32>,
    pub language: Option<String>,
    pub cover_url: Option<String>,
    pub cover_color: Option<String>,
    pub suitable_for_exam_list: Option<bool>,
}

/// Book list filters
#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BookQuery {
    pub folder_id: Option<String>,
    pub status: Option<BookStatus>,
    /// Free-text match on title or author
    pub search: Option<String>,
}

/// Aggregated view of the copies sharing one barcode and one title
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BarcodeGroup {
    pub title: String,
    pub author: String,
    pub total_copies: usize,
    pub available_copies: usize,
    pub borrowed: usize,
    /// Copy used for actions: the first available copy, else the first copy
    pub representative_id: String,
    pub copy_ids: Vec<String>,
}

/// Result of a barcode lookup
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BarcodeLookup {
    pub barcode: String,
    pub groups: Vec<BarcodeGroup>,
}
