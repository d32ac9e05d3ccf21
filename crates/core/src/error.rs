//! Unified error types for the event pipeline.
//!
//! Error codes:
//! - VALID_001-004: Request validation errors
//! - TENANT_001: Tenant resolution errors
//! - STORE_001: Event Store errors
//! - QUEUE_001: Write queue errors

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Validation error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationErrorCode {
    /// VALID_001: Body is not valid JSON or has the wrong shape
    InvalidPayload,
    /// VALID_002: Batch is empty or exceeds the per-call cap
    BatchSize,
    /// VALID_003: event/category/action missing
    MissingRequiredFields,
    /// VALID_004: Query parameter could not be interpreted
    InvalidParameter,
}

impl ValidationErrorCode {
    /// Get the error code string.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidPayload => "VALID_001",
            Self::BatchSize => "VALID_002",
            Self::MissingRequiredFields => "VALID_003",
            Self::InvalidParameter => "VALID_004",
        }
    }

    /// Get the HTTP status code.
    pub fn http_status(&self) -> u16 {
        400
    }
}

/// Store error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreErrorCode {
    /// STORE_001: Event Store operation failed
    OperationFailed,
}

impl StoreErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            Self::OperationFailed => "STORE_001",
        }
    }

    pub fn http_status(&self) -> u16 {
        500
    }
}

/// Unified error type for the event pipeline.
#[derive(Debug, Error)]
pub enum Error {
    /// Validation error with code.
    #[error("[{code}] {message}")]
    ValidationWithCode {
        code: &'static str,
        message: String,
        http_status: u16,
    },

    /// Store error with code.
    #[error("[{code}] {message}")]
    Store {
        code: &'static str,
        message: String,
        http_status: u16,
    },

    #[error("validation error: {0}")]
    Validation(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),

    #[error("invalid tenant: {0}")]
    InvalidTenant(String),

    #[error("write queue closed")]
    QueueClosed,

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a validation error with code.
    pub fn validation_code(code: ValidationErrorCode, msg: impl Into<String>) -> Self {
        Self::ValidationWithCode {
            code: code.code(),
            message: msg.into(),
            http_status: code.http_status(),
        }
    }

    /// Create a store error.
    pub fn store(msg: impl Into<String>) -> Self {
        let code = StoreErrorCode::OperationFailed;
        Self::Store {
            code: code.code(),
            message: msg.into(),
            http_status: code.http_status(),
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_tenant(msg: impl Into<String>) -> Self {
        Self::InvalidTenant(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Get the HTTP status code for this error.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::ValidationWithCode { http_status, .. } => *http_status,
            Self::Store { http_status, .. } => *http_status,
            Self::Validation(_) => 400,
            Self::Serialization(_) => 400,
            Self::MissingFields(_) => 400,
            Self::InvalidTenant(_) => 400,
            Self::QueueClosed => 503,
            Self::Internal(_) => 500,
        }
    }

    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::ValidationWithCode { code, .. } => code,
            Self::Store { code, .. } => code,
            Self::Validation(_) | Self::Serialization(_) => {
                ValidationErrorCode::InvalidPayload.code()
            }
            Self::MissingFields(_) => ValidationErrorCode::MissingRequiredFields.code(),
            Self::InvalidTenant(_) => "TENANT_001",
            Self::QueueClosed => "QUEUE_001",
            Self::Internal(_) => "INTERNAL",
        }
    }
}
