//! Error Types for Office Tools

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, OfficeError>;

#[derive(Error, Debug)]
pub enum OfficeError {
    #[error("Office index not readable at {path}: {source}")]
    IndexUnreadable {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Office index at {path} is malformed: {source}")]
    IndexMalformed {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Configuration error: {0}")]
    Config(String),
}
