//! Import report models for spreadsheet reconciliation.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// One parsed spreadsheet row: column header -> cell value
pub type RowMap = IndexMap<String, serde_json::Value>;

/// What happened to one row.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ImportAction {
    Created,
    Updated,
    Unchanged,
}

/// Per-row outcome for rows that were not skipped.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImportRowResult {
    /// 1-based data row number (header row excluded)
    pub row: usize,
    pub action: ImportAction,
    /// Ids of the records created or touched
    pub ids: Vec<String>,
    pub label: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub changed_fields: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Plaintext password, generated or newly set; only ever returned here
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// A row left untouched, with the reason.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SkippedRow {
    pub row: usize,
    pub reason: String,
}

/// Report returned by every import call.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub skipped: Vec<SkippedRow>,
    pub details: Vec<ImportRowResult>,
}

impl ImportReport {
    pub fn has_changes(&self) -> bool {
        self.created > 0 || self.updated > 0
    }

    pub(crate) fn skip(&mut self, row: usize, reason: impl Into<String>) {
        let reason = reason.into();
        tracing::warn!("Import row {} skipped: {}", row, reason);
        self.skipped.push(SkippedRow { row, reason });
    }

    pub(crate) fn record(&mut self, result: ImportRowResult) {
        match result.action {
            ImportAction::Created => self.created += 1,
            ImportAction::Updated => self.updated += 1,
            ImportAction::Unchanged => self.unchanged += 1,
        }
        self.details.push(result);
    }
}

/// Options for a book import call
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BookImportOptions {
    /// Fill empty bibliographic fields from ISBN metadata; server default when absent
    pub enrich: Option<bool>,
    /// Folder assigned to created books when the row names none
    pub folder_id: Option<String>,
}
