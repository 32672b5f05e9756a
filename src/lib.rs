//! School library server
//!
//! Lending with barcode-grouped copies, bulk spreadsheet reconciliation of
//! books and accounts, and ISBN metadata enrichment, served as a REST JSON API
//! over a single JSON library document.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod normalize;
pub mod repository;
pub mod services;

#[cfg(test)]
mod test_support;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}
