//! Bibliographic metadata resolved from external ISBN sources

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Source marker used when no metadata source produced a result
pub const SOURCE_NONE: &str = "none";
/// Source marker used when metadata lookups are disabled or unconfigured
pub const SOURCE_OFFLINE: &str = "offline";
/// Source marker used when every source failed with an error
pub const SOURCE_UNKNOWN: &str = "unknown";

/// Normalized lookup result, shaped like a book's bibliographic fields
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IsbnMetadata {
    pub isbn: String,
    pub found: bool,
    pub source: String,
    pub title: String,
    pub author: String,
    pub description: String,
    pub publisher: String,
    pub published_year: Option<i32>,
    pub page_count: Option<u32>,
    pub language: String,
    pub cover_url: String,
    pub tags: Vec<String>,
}

impl IsbnMetadata {
    pub fn not_found(isbn: &str, source: &str) -> Self {
        Self {
            isbn: isbn.to_string(),
            found: false,
            source: source.to_string(),
            ..Default::default()
        }
    }

    /// A parse counts as a hit when any descriptive field is present
    pub fn has_content(&self) -> bool {
        !(self.title.is_empty()
            && self.author.is_empty()
            && self.description.is_empty()
            && self.publisher.is_empty())
    }
}
