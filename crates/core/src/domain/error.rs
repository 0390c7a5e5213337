// Domain Error Types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Invalid poll state transition: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("Invalid poll config: {0}")]
    InvalidPollConfig(String),

    #[error("Invalid JSON pointer: {0}")]
    InvalidPointer(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

pub type Result<T> = std::result::Result<T, DomainError>;
