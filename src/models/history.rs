//! History ledger entries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Kind of recorded event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum HistoryKind {
    CheckOut,
    CheckIn,
    BookCreated,
    BookUpdated,
    BookDeleted,
    StudentCreated,
    StudentUpdated,
    StudentDeleted,
    TeacherCreated,
    TeacherDeleted,
    ClassCreated,
    ClassUpdated,
    ClassDeleted,
    FolderChanged,
    BooksImported,
    StudentsImported,
    TeachersImported,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: HistoryKind,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub book_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub book_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub teacher_id: Option<String>,
    pub message: String,
}

/// Event to record; id and timestamp are assigned on append
#[derive(Debug, Clone)]
pub struct NewHistoryEntry {
    pub kind: HistoryKind,
    pub message: String,
    pub book_id: Option<String>,
    pub book_title: Option<String>,
    pub student_id: Option<String>,
    pub class_id: Option<String>,
    pub teacher_id: Option<String>,
}

impl NewHistoryEntry {
    pub fn new(kind: HistoryKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            book_id: None,
            book_title: None,
            student_id: None,
            class_id: None,
            teacher_id: None,
        }
    }

    pub fn book(mut self, id: &str, title: &str) -> Self {
        self.book_id = Some(id.to_string());
        self.book_title = Some(title.to_string());
        self
    }

    pub fn student(mut self, id: &str) -> Self {
        self.student_id = Some(id.to_string());
        self
    }

    pub fn class(mut self, id: &str) -> Self {
        self.class_id = Some(id.to_string());
        self
    }

    pub fn teacher(mut self, id: &str) -> Self {
        self.teacher_id = Some(id.to_string());
        self
    }
}

/// History query parameters
#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HistoryQuery {
    pub student_id: Option<String>,
    pub class_id: Option<String>,
    pub limit: Option<usize>,
}

/// Anonymized feed item
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PublicHistoryItem {
    pub title: String,
    pub timestamp: DateTime<Utc>,
}
