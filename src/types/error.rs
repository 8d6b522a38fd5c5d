//! Unified Error Type System
//!
//! Centralized error types for the entire application.
//! Provides category-based classification so remote-call retry decisions
//! are made in one place.
//!
//! ## Error Categories
//!
//! - **RateLimit**: the service asked us to slow down (retry with backoff)
//! - **Network**: connection reset / timeout (retry with backoff)
//! - **Transient**: 5xx-range server trouble (retry with backoff)
//! - **Auth**: credential rejected (fail fast)
//! - **BadRequest**: our request is malformed (fail fast)
//! - **NotFound**: target resource missing (fail fast)
//!
//! ## Design Principles
//!
//! - Single unified error type (BriefError) for the entire application
//! - Category-based routing for retry decisions
//! - No panic/unwrap in non-test code - all errors are recoverable

use thiserror::Error;

use crate::ai::generator::GenerationFailure;

// =============================================================================
// Error Categories
// =============================================================================

/// Unified error categories for retry routing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Rate limited - wait then retry
    RateLimit,
    /// Network/connectivity issues - retry with backoff
    Network,
    /// Temporary server issues (5xx) - retry with backoff
    Transient,
    /// Authentication failed - fail fast, don't retry
    Auth,
    /// Invalid request - don't retry, fix request
    BadRequest,
    /// Resource not found - don't retry
    NotFound,
    /// Unknown error - don't retry
    Unknown,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RateLimit => write!(f, "RATE_LIMIT"),
            Self::Network => write!(f, "NETWORK"),
            Self::Transient => write!(f, "TRANSIENT"),
            Self::Auth => write!(f, "AUTH"),
            Self::BadRequest => write!(f, "BAD_REQUEST"),
            Self::NotFound => write!(f, "NOT_FOUND"),
            Self::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

impl ErrorCategory {
    /// Check if a remote call failing with this category may be retried
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::RateLimit | Self::Network | Self::Transient)
    }
}

// =============================================================================
// Service Error
// =============================================================================

/// Classified error from a remote service (LLM provider or document store)
#[derive(Debug, Clone)]
pub struct ServiceError {
    /// Service that produced the error ("openai", "docs", "drive")
    pub service: &'static str,
    /// Error category for retry routing
    pub category: ErrorCategory,
    /// HTTP status, when the error carries one
    pub status: Option<u16>,
    /// Detailed error message
    pub message: String,
}

impl std::fmt::Display for ServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.status {
            Some(status) => write!(
                f,
                "[{}:{}] {} ({})",
                self.service, self.category, self.message, status
            ),
            None => write!(f, "[{}:{}] {}", self.service, self.category, self.message),
        }
    }
}

impl std::error::Error for ServiceError {}

impl ServiceError {
    /// Create a new service error
    pub fn new(
        service: &'static str,
        category: ErrorCategory,
        message: impl Into<String>,
    ) -> Self {
        Self {
            service,
            category,
            status: None,
            message: message.into(),
        }
    }

    /// Check if the call may be retried with backoff
    pub fn is_transient(&self) -> bool {
        self.category.is_transient()
    }
}

// =============================================================================
// Error Classifier
// =============================================================================

/// Error classifier mapping raw failures to categories
pub struct ErrorClassifier;

impl ErrorClassifier {
    /// Classify an HTTP status code
    pub fn classify_http_status(
        service: &'static str,
        status: u16,
        message: impl Into<String>,
    ) -> ServiceError {
        let category = match status {
            429 => ErrorCategory::RateLimit,
            401 | 403 => ErrorCategory::Auth,
            400 => ErrorCategory::BadRequest,
            404 => ErrorCategory::NotFound,
            500..=599 => ErrorCategory::Transient,
            _ => ErrorCategory::Unknown,
        };
        ServiceError {
            service,
            category,
            status: Some(status),
            message: message.into(),
        }
    }

    /// Classify a reqwest transport error (no HTTP status available)
    pub fn classify_transport(service: &'static str, err: &reqwest::Error) -> ServiceError {
        let category = if err.is_timeout() || err.is_connect() {
            ErrorCategory::Network
        } else if err.is_request() || err.is_builder() {
            ErrorCategory::BadRequest
        } else {
            // Body/decode failures mid-stream behave like connection resets
            ErrorCategory::Network
        };
        ServiceError::new(service, category, err.to_string())
    }
}

// =============================================================================
// Validation Issues
// =============================================================================

/// Severity levels for validation issues
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueSeverity {
    /// Output is unusable as-is
    Error,
    /// Usable but degraded
    Warning,
}

impl std::fmt::Display for IssueSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IssueSeverity::Error => write!(f, "ERROR"),
            IssueSeverity::Warning => write!(f, "WARN"),
        }
    }
}

/// A single validation issue with an optional field location
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    pub severity: IssueSeverity,
    pub message: String,
    pub location: Option<String>,
}

impl ValidationIssue {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            severity: IssueSeverity::Error,
            message: message.into(),
            location: None,
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: IssueSeverity::Warning,
            message: message.into(),
            location: None,
        }
    }

    pub fn at(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.location {
            Some(loc) => write!(f, "[{}] {}: {}", self.severity, loc, self.message),
            None => write!(f, "[{}] {}", self.severity, self.message),
        }
    }
}

/// Render a list of issues as an itemized, human-readable block
pub fn describe_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(|i| format!("- {}", i))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Check whether any issue is an error (warnings do not block)
pub fn has_errors(issues: &[ValidationIssue]) -> bool {
    issues.iter().any(|i| i.severity == IssueSeverity::Error)
}

// =============================================================================
// Application Error
// =============================================================================

#[derive(Debug, Error)]
pub enum BriefError {
    // -------------------------------------------------------------------------
    // System Errors (auto From impl)
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // -------------------------------------------------------------------------
    // Remote Services
    // -------------------------------------------------------------------------
    /// Classified error from the LLM provider or the document store
    #[error("{0}")]
    Service(ServiceError),

    // -------------------------------------------------------------------------
    // Domain Errors
    // -------------------------------------------------------------------------
    /// Structured generation exhausted its attempts or got an empty reply
    #[error("generation failed: {0}")]
    Generation(GenerationFailure),

    /// Cross-field validation failure at finalize - fatal for the file,
    /// never retried
    #[error("lesson pack validation failed:\n{0}")]
    Validation(String),

    #[error("Config error: {0}")]
    Config(String),

    /// Pipeline stage error with stage context
    #[error("pipeline stage '{stage}' failed: {message}")]
    Pipeline {
        stage: &'static str,
        message: String,
    },
}

impl From<ServiceError> for BriefError {
    fn from(err: ServiceError) -> Self {
        BriefError::Service(err)
    }
}

impl From<GenerationFailure> for BriefError {
    fn from(err: GenerationFailure) -> Self {
        BriefError::Generation(err)
    }
}

impl BriefError {
    /// Category for retry routing; non-service errors are never retried
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Service(e) => e.category,
            _ => ErrorCategory::Unknown,
        }
    }

    /// Check if a remote call failing with this error may be retried
    pub fn is_transient(&self) -> bool {
        self.category().is_transient()
    }
}

pub type Result<T> = std::result::Result<T, BriefError>;

// =============================================================================
// Tests
// =============================================================================
