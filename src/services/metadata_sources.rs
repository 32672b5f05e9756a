//! External bibliographic metadata sources queried by ISBN

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::sync::Arc;

use crate::{
    config::{MetadataConfig, MetadataSourceKind},
    error::{AppError, AppResult},
};

/// What a source answered for one ISBN
#[derive(Debug, Clone, PartialEq)]
pub enum SourcePayload {
    /// Native record of the source, normalized later
    Found(Value),
    NotFound,
}

/// A remote catalogue that can be asked about an ISBN
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MetadataSource: Send + Sync {
    /// Marker stored in the `source` field of results
    fn name(&self) -> &'static str;

    async fn fetch(&self, isbn: &str) -> AppResult<SourcePayload>;
}

async fn get_json(client: &Client, url: &str, source: &str) -> AppResult<Option<Value>> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| AppError::Metadata(format!("{} request failed: {}", source, e)))?;

    if response.status() == StatusCode::NOT_FOUND {
        return Ok(None);
    }
    if !response.status().is_success() {
        return Err(AppError::Metadata(format!(
            "{} answered with HTTP {}",
            source,
            response.status()
        )));
    }

    let body = response
        .json::<Value>()
        .await
        .map_err(|e| AppError::Metadata(format!("{} returned invalid JSON: {}", source, e)))?;
    Ok(Some(body))
}

/// Open Library books API (`jscmd=data`)
pub struct OpenLibrarySource {
    client: Client,
    base_url: String,
}

impl OpenLibrarySource {
    pub fn new(client: Client) -> Self {
        Self::with_base_url(client, "https://openlibrary.org")
    }

    pub fn with_base_url(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl MetadataSource for OpenLibrarySource {
    fn name(&self) -> &'static str {
        "openlibrary"
    }

    async fn fetch(&self, isbn: &str) -> AppResult<SourcePayload> {
        let url = format!(
            "{}/api/books?bibkeys=ISBN:{}&format=json&jscmd=data",
            self.base_url, isbn
        );
        let Some(body) = get_json(&self.client, &url, self.name()).await? else {
            return Ok(SourcePayload::NotFound);
        };

        // { "ISBN:978...": { ... } } or {} when unknown
        match body.get(format!("ISBN:{}", isbn)) {
            Some(record) if record.is_object() => Ok(SourcePayload::Found(record.clone())),
            _ => Ok(SourcePayload::NotFound),
        }
    }
}

/// Google Books volumes API
pub struct GoogleBooksSource {
    client: Client,
    base_url: String,
}

impl GoogleBooksSource {
    pub fn new(client: Client) -> Self {
        Self::with_base_url(client, "https://www.googleapis.com")
    }

    pub fn with_base_url(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl MetadataSource for GoogleBooksSource {
    fn name(&self) -> &'static str {
        "googlebooks"
    }

    async fn fetch(&self, isbn: &str) -> AppResult<SourcePayload> {
        let url = format!("{}/books/v1/volumes?q=isbn:{}", self.base_url, isbn);
        let Some(body) = get_json(&self.client, &url, self.name()).await? else {
            return Ok(SourcePayload::NotFound);
        };

        let volume = body
            .get("items")
            .and_then(Value::as_array)
            .and_then(|items| items.first())
            .and_then(|item| item.get("volumeInfo"));
        match volume {
            Some(info) if info.is_object() => Ok(SourcePayload::Found(info.clone())),
            _ => Ok(SourcePayload::NotFound),
        }
    }
}

/// Build the configured sources in priority order. Empty when lookups are disabled.
pub fn build_sources(config: &MetadataConfig) -> AppResult<Vec<Arc<dyn MetadataSource>>> {
    if !config.enabled {
        tracing::info!("ISBN metadata lookups disabled");
        return Ok(Vec::new());
    }

    let client = Client::builder()
        .timeout(config.source_timeout())
        .user_agent(config.user_agent.clone())
        .build()
        .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

    let sources = config
        .sources
        .iter()
        .map(|kind| -> Arc<dyn MetadataSource> {
            match kind {
                MetadataSourceKind::OpenLibrary => Arc::new(OpenLibrarySource::new(client.clone())),
                MetadataSourceKind::GoogleBooks => Arc::new(GoogleBooksSource::new(client.clone())),
            }
        })
        .collect::<Vec<_>>();

    tracing::info!(
        "ISBN metadata sources: {:?}",
        sources.iter().map(|s| s.name()).collect::<Vec<_>>()
    );
    Ok(sources)
}
