//! Reconciliation of spreadsheet rows against the library document.
//!
//! Every import follows the same shape: normalize headers, skip rows missing a
//! required field, match on a natural key (barcode or username), merge
//! non-empty values into the match or create a new record, then persist once
//! with a single summary history entry.

mod books;
pub mod columns;
mod people;

use crate::{
    repository::Repository,
    services::{auth::SessionRegistry, isbn::IsbnService},
};

pub use people::PersonKind;

#[derive(Clone)]
pub struct ImportService {
    repository: Repository,
    isbn: IsbnService,
    sessions: SessionRegistry,
    enrich_by_default: bool,
}

impl ImportService {
    pub fn new(
        repository: Repository,
        isbn: IsbnService,
        sessions: SessionRegistry,
        enrich_by_default: bool,
    ) -> Self {
        Self {
            repository,
            isbn,
            sessions,
            enrich_by_default,
        }
    }
}

/// Record a changed field once
fn mark(changed: &mut Vec<String>, field: &str, did_change: bool) {
    if did_change && !changed.iter().any(|f| f == field) {
        changed.push(field.to_string());
    }
}
