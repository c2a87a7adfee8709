// Domain Error Types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Invalid job state transition: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("Unknown job state: {0}")]
    UnknownJobState(String),

    #[error("Property has no identifier (expected `id` or `propertyId`)")]
    MissingPropertyId,

    #[error("Unsupported property identifier: {0}")]
    InvalidPropertyId(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

pub type Result<T> = std::result::Result<T, DomainError>;
