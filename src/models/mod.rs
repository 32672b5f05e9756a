//! Data models for the school library

pub mod book;
pub mod class;
pub mod document;
pub mod history;
pub mod identity;
pub mod import_report;
pub mod isbn;
pub mod loan;
pub mod person;
pub mod session;

// Re-export commonly used types
pub use book::{BarcodeGroup, BarcodeLookup, Book, BookStatus};
pub use class::{Class, Folder};
pub use document::LibraryDocument;
pub use history::{HistoryEntry, HistoryKind, NewHistoryEntry};
pub use identity::{Identity, Role};
pub use import_report::{BookImportOptions, ImportAction, ImportReport, ImportRowResult, RowMap, SkippedRow};
pub use isbn::IsbnMetadata;
pub use person::{LoanRecord, StaffAccount, StaffRole, Student};
pub use session::SessionClaims;

/// Generate an opaque, globally unique identifier
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
