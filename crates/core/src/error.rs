// Central Error Type for the Application

use thiserror::Error;

/// Application-level error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Domain error: {0}")]
    Domain(#[from] crate::domain::DomainError),

    #[error("Service error: {0}")]
    Service(#[from] crate::port::ServiceError),

    #[error("HTTP error: {0}")]
    Http(#[from] crate::port::HttpError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Unexpected status: expected {expected}, got {actual}")]
    UnexpectedStatus { expected: u16, actual: u16 },

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;
