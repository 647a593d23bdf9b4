//! Unified Error Type System
//!
//! Centralized error types for the entire application.
//!
//! ## Error Categories
//!
//! Upstream failures are classified for logging only. Every category is
//! handled the same way by the pipeline: the failing tier is abandoned and
//! the next one takes over.
//!
//! - **Transport**: connection refused, DNS failure, timeout
//! - **UpstreamStatus**: the backend answered with a non-success status
//! - **MalformedPayload**: the backend answered but the body had the wrong shape
//!
//! Extraction failures (unparseable generator text) are a separate
//! [`TaleError::Extraction`] variant because they happen after a successful call.

use std::time::Duration;
use thiserror::Error;

// =============================================================================
// Error Categories
// =============================================================================

/// Classification of an upstream provider failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Network error or timeout before a response arrived
    Transport,
    /// Non-success HTTP status
    UpstreamStatus,
    /// Response body missing expected fields or undecodable
    MalformedPayload,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transport => write!(f, "TRANSPORT"),
            Self::UpstreamStatus => write!(f, "UPSTREAM_STATUS"),
            Self::MalformedPayload => write!(f, "MALFORMED_PAYLOAD"),
        }
    }
}

// =============================================================================
// Provider Error
// =============================================================================

/// A single failed call to a text or image backend
#[derive(Debug, Clone)]
pub struct ProviderError {
    pub category: ErrorCategory,
    pub message: String,
    /// Backend that produced the error ("ollama", "dalle", ...)
    pub provider: Option<String>,
    /// HTTP status, when the backend answered
    pub status: Option<u16>,
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(provider) = &self.provider {
            write!(f, "[{}:{}] {}", provider, self.category, self.message)
        } else {
            write!(f, "[{}] {}", self.category, self.message)
        }
    }
}

impl std::error::Error for ProviderError {}

impl ProviderError {
    pub fn new(category: ErrorCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
            provider: None,
            status: None,
        }
    }

    pub fn with_provider(
        category: ErrorCategory,
        message: impl Into<String>,
        provider: impl Into<String>,
    ) -> Self {
        Self {
            category,
            message: message.into(),
            provider: Some(provider.into()),
            status: None,
        }
    }

    /// Attach the HTTP status code
    pub fn status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn transport(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::with_provider(ErrorCategory::Transport, message, provider)
    }

    pub fn malformed(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::with_provider(ErrorCategory::MalformedPayload, message, provider)
    }
}

// =============================================================================
// Error Classifier
// =============================================================================

/// Maps transport-level failures onto [`ProviderError`]
pub struct ErrorClassifier;

impl ErrorClassifier {
    /// Classify a reqwest error raised while sending or reading a request
    pub fn from_reqwest(err: &reqwest::Error, provider: &str) -> ProviderError {
        if err.is_decode() {
            return ProviderError::malformed(provider, err.to_string());
        }
        if let Some(status) = err.status() {
            return Self::from_status(status.as_u16(), &err.to_string(), provider);
        }
        let message = if err.is_timeout() {
            format!("request timed out: {}", err)
        } else if err.is_connect() {
            format!("connection failed: {}", err)
        } else {
            err.to_string()
        };
        ProviderError::transport(provider, message)
    }

    /// Classify a non-success HTTP status
    pub fn from_status(status: u16, body: &str, provider: &str) -> ProviderError {
        let preview: String = body.chars().take(200).collect();
        ProviderError::with_provider(
            ErrorCategory::UpstreamStatus,
            format!("HTTP {}: {}", status, preview),
            provider,
        )
        .status(status)
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Structured validation error with context
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// What validation failed
    pub kind: ValidationErrorKind,
    /// Field that failed validation
    pub field: Option<String>,
    pub message: String,
    /// Expected value or format
    pub expected: Option<String>,
    /// Actual value received
    pub actual: Option<String>,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(field) = &self.field {
            write!(f, "Validation failed for '{}': {}", field, self.message)?;
        } else {
            write!(f, "Validation failed: {}", self.message)?;
        }
        if let (Some(expected), Some(actual)) = (&self.expected, &self.actual) {
            write!(f, " (expected {}, got {})", expected, actual)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

impl ValidationError {
    pub fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            field: None,
            message: message.into(),
            expected: None,
            actual: None,
        }
    }

    /// Add field context
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    /// Add expected/actual values
    pub fn with_comparison(
        mut self,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        self.expected = Some(expected.into());
        self.actual = Some(actual.into());
        self
    }

    pub fn missing(field: impl Into<String>) -> Self {
        let field = field.into();
        Self::new(
            ValidationErrorKind::MissingField,
            format!("{} must not be empty", field),
        )
        .with_field(field)
    }

    pub fn range(
        field: impl Into<String>,
        expected: impl Into<String>,
        actual: impl ToString,
    ) -> Self {
        Self::new(ValidationErrorKind::Range, "value out of range")
            .with_field(field)
            .with_comparison(expected, actual.to_string())
    }
}

/// Validation error kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// Input could not be decoded into the expected shape
    Schema,
    /// Required field missing or blank
    MissingField,
    /// Value out of range
    Range,
    /// Value not one of the accepted options
    Format,
}

// =============================================================================
// Application Error
// =============================================================================

#[derive(Debug, Error)]
pub enum TaleError {
    // -------------------------------------------------------------------------
    // System Errors (auto From impl)
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    // -------------------------------------------------------------------------
    // Upstream Errors
    // -------------------------------------------------------------------------
    #[error("Provider error: {0}")]
    Provider(ProviderError),

    #[error("Timeout after {duration:?}: {operation}")]
    Timeout {
        operation: String,
        duration: Duration,
    },

    /// Generator text could not be coerced into a story draft
    #[error("Extraction failed: {0}")]
    Extraction(String),

    // -------------------------------------------------------------------------
    // Caller-visible Errors
    // -------------------------------------------------------------------------
    #[error("{0}")]
    InvalidInput(ValidationError),

    #[error("Unknown capability: {0}")]
    UnknownCapability(String),

    #[error("Config error: {0}")]
    Config(String),

    /// Assembled output broke a shape guarantee. Always a bug.
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),
}

impl From<ProviderError> for TaleError {
    fn from(err: ProviderError) -> Self {
        TaleError::Provider(err)
    }
}

impl From<ValidationError> for TaleError {
    fn from(err: ValidationError) -> Self {
        TaleError::InvalidInput(err)
    }
}

pub type Result<T> = std::result::Result<T, TaleError>;

impl TaleError {
    /// Create a timeout error
    pub fn timeout(operation: impl Into<String>, duration: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    /// Category used when logging a demoted upstream failure
    pub fn category(&self) -> Option<ErrorCategory> {
        match self {
            Self::Provider(e) => Some(e.category),
            Self::Timeout { .. } => Some(ErrorCategory::Transport),
            _ => None,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
