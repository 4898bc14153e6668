//! Failure taxonomy of the contact engine.

use crate::phone::PhoneServiceError;
use crate::store::{InvalidContactId, RepositoryError};

/// Errors surfaced by contact operations and field resolution.
#[derive(Debug, thiserror::Error)]
pub enum ContactError {
    /// Malformed or insufficient input.
    #[error("{0}")]
    Validation(String),

    /// A uniqueness rule would be violated.
    #[error("{0}")]
    Conflict(String),

    /// The target contact does not exist at write time.
    #[error("{0}")]
    NotFound(String),

    /// A required credential is missing.
    #[error("{0}")]
    Configuration(String),

    /// The phone service failed or rejected the request.
    #[error("{0}")]
    ExternalService(String),

    /// The contact store failed.
    #[error("storage error: {0}")]
    Storage(#[from] RepositoryError),
}

impl ContactError {
    /// Machine-readable classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Configuration(_) => ErrorKind::Configuration,
            Self::ExternalService(_) => ErrorKind::ExternalService,
            Self::Storage(_) => ErrorKind::Internal,
        }
    }
}

impl From<InvalidContactId> for ContactError {
    fn from(err: InvalidContactId) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<PhoneServiceError> for ContactError {
    fn from(err: PhoneServiceError) -> Self {
        match err {
            PhoneServiceError::MissingCredential => Self::Configuration(err.to_string()),
            other => Self::ExternalService(other.to_string()),
        }
    }
}

/// Classification of a [`ContactError`] for transport mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// See [`ContactError::Validation`].
    Validation,
    /// See [`ContactError::Conflict`].
    Conflict,
    /// See [`ContactError::NotFound`].
    NotFound,
    /// See [`ContactError::Configuration`].
    Configuration,
    /// See [`ContactError::ExternalService`].
    ExternalService,
    /// Storage or other infrastructure failure.
    Internal,
}

impl ErrorKind {
    /// Stable error code reported to clients.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation => "VALIDATION_ERROR",
            Self::Conflict => "CONFLICT",
            Self::NotFound => "NOT_FOUND",
            Self::Configuration => "CONFIGURATION_ERROR",
            Self::ExternalService => "EXTERNAL_SERVICE_ERROR",
            Self::Internal => "INTERNAL_ERROR",
        }
    }

    /// HTTP status a transport should answer with.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Validation => 400,
            Self::Conflict => 409,
            Self::NotFound => 404,
            Self::Configuration | Self::Internal => 500,
            Self::ExternalService => 502,
        }
    }
}
