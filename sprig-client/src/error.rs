//! Error types for the client.

use crate::config::ConfigError;
use sprig_core::CacheError;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Cache(#[from] CacheError),
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Invalid header value: {0}")]
    InvalidHeader(String),
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Logging setup failed: {0}")]
    Logging(String),
}

pub type ClientResult<T> = Result<T, ClientError>;
