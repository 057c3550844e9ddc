// Error handling utilities
// Author: Gabriel Demetrios Lafis

use thiserror::Error;

use crate::encode::EncodeError;

/// Errors raised while loading and applying the configuration
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Encode error: {0}")]
    Encode(#[from] EncodeError),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for AppError
pub type AppResult<T> = Result<T, AppError>;
