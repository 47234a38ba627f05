//! Configuration management for Folio Server

use serde::Deserialize;
use std::env;
use std::path::PathBuf;

use crate::extract::ContentFormat;

/// Default number of pages extracted per `ensure` call
pub const DEFAULT_BATCH_SIZE: usize = 5;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub extraction: ExtractionConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Maximum accepted upload body in megabytes
    pub max_upload_mb: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Directory holding uploaded source documents
    pub upload_dir: PathBuf,
    /// Directory holding one cache directory per document
    pub cache_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExtractionConfig {
    pub batch_size: usize,
    pub format: ContentFormat,
    pub timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8000,
                max_upload_mb: 200,
            },
            storage: StorageConfig {
                upload_dir: PathBuf::from("./data/uploaded_files"),
                cache_dir: PathBuf::from("./data/extracted"),
            },
            extraction: ExtractionConfig::default(),
        }
    }
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            format: ContentFormat::Html,
            timeout_secs: 30,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let data_dir =
            PathBuf::from(env::var("FOLIO_DATA_DIR").unwrap_or_else(|_| "./data".to_string()));

        let batch_size = parse_var("FOLIO_BATCH_SIZE", DEFAULT_BATCH_SIZE)?;
        if batch_size == 0 {
            return Err(ConfigError::Invalid {
                key: "FOLIO_BATCH_SIZE",
                value: "0".to_string(),
            });
        }

        let format = match env::var("FOLIO_CONTENT_FORMAT") {
            Ok(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
                key: "FOLIO_CONTENT_FORMAT",
                value: raw,
            })?,
            Err(_) => ContentFormat::Html,
        };

        Ok(Config {
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: parse_var("SERVER_PORT", 8000)?,
                max_upload_mb: parse_var("FOLIO_MAX_UPLOAD_MB", 200)?,
            },
            storage: StorageConfig {
                upload_dir: env::var("FOLIO_UPLOAD_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| data_dir.join("uploaded_files")),
                cache_dir: env::var("FOLIO_CACHE_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| data_dir.join("extracted")),
            },
            extraction: ExtractionConfig {
                batch_size,
                format,
                timeout_secs: parse_var("FOLIO_EXTRACT_TIMEOUT_SECS", 30)?,
            },
        })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

fn parse_var<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value: raw }),
        Err(_) => Ok(default),
    }
}
