//! The persisted library document

use serde::{Deserialize, Serialize};

use super::{
    book::Book,
    class::{Class, Folder},
    history::HistoryEntry,
    person::{StaffAccount, Student},
};

/// Everything the library knows, persisted as one JSON document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LibraryDocument {
    pub books: Vec<Book>,
    pub students: Vec<Student>,
    pub staff: Vec<StaffAccount>,
    pub classes: Vec<Class>,
    pub folders: Vec<Folder>,
    /// Newest first, capped at [`crate::repository::history::HISTORY_LIMIT`]
    pub history: Vec<HistoryEntry>,
}
