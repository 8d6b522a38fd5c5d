//! Global Constants
//!
//! Centralized constants for configuration and tuning.
//! All magic numbers should be defined here with documentation.

/// Structured generation constants
pub mod generation {
    /// Default attempt ceiling for the self-correction loop.
    /// Every attempt after the first costs a full model call.
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

    /// Hard upper bound on configurable attempts
    pub const MAX_ATTEMPTS_CEILING: u32 = 10;

    /// Default request timeout (seconds)
    pub const DEFAULT_TIMEOUT_SECS: u64 = 300;
}

/// Remote-call retry constants
pub mod retry {
    /// Default maximum retries per remote call (attempts = retries + 1)
    pub const DEFAULT_MAX_RETRIES: u32 = 3;

    /// Base delay for exponential backoff (milliseconds)
    pub const BASE_DELAY_MS: u64 = 500;

    /// Maximum delay between retries (seconds)
    pub const MAX_DELAY_SECS: u64 = 30;
}

/// Input collaborator constants
pub mod input {
    /// Maximum characters of raw note text handed to the pipeline
    pub const MAX_INPUT_CHARS: usize = 60_000;

    /// File extensions treated as plain-text notes
    pub const NOTE_EXTENSIONS: &[&str] = &["txt", "md"];
}

/// Publishing constants
pub mod publish {
    /// Opaque document property carrying the content fingerprint
    pub const FINGERPRINT_PROPERTY: &str = "briefsmith.fingerprint";

    /// Docs API base URL
    pub const DOCS_API_BASE: &str = "https://docs.googleapis.com/v1";

    /// Drive API base URL
    pub const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";
}
