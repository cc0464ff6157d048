//! Error handling and custom error types
//!
//! Provides unified error handling across the application using thiserror.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("{0}")]
    Validation(String),

    #[error("External service error: {0}")]
    ExternalService(String),

    #[error("Generation rejected (reason: {0})")]
    GenerationRejected(String),

    #[error("The model did not return an image. Try a different request.")]
    MissingImage,

    #[error("Gallery storage unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Authorization required")]
    Unauthorized,

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Environment variable error: {0}")]
    EnvVar(#[from] dotenvy::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Coarse status class surfaced at the HTTP boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Unauthorized,
    BadRequest,
    NotFound,
    UpstreamFailure,
    Unavailable,
    Internal,
}

impl Error {
    pub fn class(&self) -> ErrorClass {
        match self {
            Error::Validation(_) => ErrorClass::BadRequest,
            Error::Unauthorized => ErrorClass::Unauthorized,
            Error::NotFound(_) => ErrorClass::NotFound,
            Error::ExternalService(_) | Error::GenerationRejected(_) | Error::MissingImage => {
                ErrorClass::UpstreamFailure
            }
            Error::StoreUnavailable(_) => ErrorClass::Unavailable,
            Error::Storage(_)
            | Error::Io(_)
            | Error::Serialization(_)
            | Error::EnvVar(_)
            | Error::Config(_) => ErrorClass::Internal,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
