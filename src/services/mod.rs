//! Business logic services

pub mod auth;
pub mod catalog;
pub mod classes;
pub mod history;
pub mod imports;
pub mod isbn;
pub mod loans;
pub mod metadata_sources;
pub mod people;
pub mod spreadsheet;

use std::sync::Arc;

use crate::{config::AppConfig, error::AppResult, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub auth: auth::AuthService,
    pub catalog: catalog::CatalogService,
    pub classes: classes::ClassesService,
    pub history: history::HistoryService,
    pub imports: imports::ImportService,
    pub isbn: isbn::IsbnService,
    pub loans: loans::LoansService,
    pub people: people::PeopleService,
    pub spreadsheets: Arc<dyn spreadsheet::SpreadsheetReader>,
    repository: Repository,
}

impl Services {
    /// Create all services over the given repository
    pub fn new(repository: Repository, config: &AppConfig) -> AppResult<Self> {
        let isbn = isbn::IsbnService::from_config(&config.metadata)?;
        Ok(Self::with_isbn(repository, config, isbn))
    }

    /// Same as [`Services::new`] with a prepared ISBN service
    pub fn with_isbn(repository: Repository, config: &AppConfig, isbn: isbn::IsbnService) -> Self {
        let sessions = auth::SessionRegistry::new(config.auth.session_ttl_hours);
        Self {
            auth: auth::AuthService::new(repository.clone(), sessions.clone()),
            catalog: catalog::CatalogService::new(repository.clone()),
            classes: classes::ClassesService::new(repository.clone()),
            history: history::HistoryService::new(repository.clone()),
            imports: imports::ImportService::new(
                repository.clone(),
                isbn.clone(),
                sessions.clone(),
                config.metadata.enrich_imports_by_default,
            ),
            isbn,
            loans: loans::LoansService::new(repository.clone()),
            people: people::PeopleService::new(repository.clone(), sessions),
            spreadsheets: Arc::new(spreadsheet::CalamineReader),
            repository,
        }
    }

    /// Whether the library document can be loaded
    pub async fn check_storage(&self) -> AppResult<()> {
        self.repository.snapshot().await.map(|_| ())
    }
}

/// Overwrite `slot` when `value` differs. Returns whether it changed.
pub(crate) fn assign<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        false
    } else {
        *slot = value;
        true
    }
}
