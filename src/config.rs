//! Configuration management for the school library server

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::{env, path::PathBuf, time::Duration};

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// Path of the JSON library document
    pub data_file: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub session_ttl_hours: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

/// Which external bibliographic sources to query, in priority order
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MetadataSourceKind {
    OpenLibrary,
    GoogleBooks,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MetadataConfig {
    /// Network lookups allowed at all
    pub enabled: bool,
    pub sources: Vec<MetadataSourceKind>,
    pub cache_ttl_seconds: u64,
    pub source_timeout_seconds: u64,
    /// Default for imports that do not say whether to enrich
    pub enrich_imports_by_default: bool,
    pub user_agent: String,
}

impl MetadataConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_seconds)
    }

    pub fn source_timeout(&self) -> Duration {
        Duration::from_secs(self.source_timeout_seconds.max(1))
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub metadata: MetadataConfig,
}

impl AppConfig {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let config = Config::builder()
            // Start with default configuration
            .add_source(File::with_name("config/default").required(false))
            // Layer on the environment-specific file
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Add environment variables (with prefix LIBRARY_)
            .add_source(
                Environment::with_prefix("LIBRARY")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("metadata.sources")
                    .try_parsing(true),
            )
            // Override the document path from LIBRARY_DATA_FILE if present
            .set_override_option("storage.data_file", env::var("LIBRARY_DATA_FILE").ok())?
            .build()?;

        config.try_deserialize()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_file: PathBuf::from("data/library.json"),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_ttl_hours: 12,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sources: vec![MetadataSourceKind::OpenLibrary, MetadataSourceKind::GoogleBooks],
            cache_ttl_seconds: 300,
            source_timeout_seconds: 8,
            enrich_imports_by_default: true,
            user_agent: format!("school-library-server/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}
