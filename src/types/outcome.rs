//! Per-File Outcomes
//!
//! A batch run reports one outcome per input file. Failures in one file never
//! abort processing of sibling files; the batch's overall exit status is the
//! caller's concern.

use serde::Serialize;
use std::path::PathBuf;

/// Outcome of processing one input file
#[derive(Debug, Clone, Serialize)]
pub struct FileOutcome {
    /// Source path the notes came from
    pub source: PathBuf,
    pub success: bool,
    /// Human-readable error when the file failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// View URL of the published document, when publishing ran
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_url: Option<String>,
}

impl FileOutcome {
    pub fn succeeded(source: PathBuf, published_url: Option<String>) -> Self {
        Self {
            source,
            success: true,
            error: None,
            published_url,
        }
    }

    pub fn failed(source: PathBuf, error: impl Into<String>) -> Self {
        Self {
            source,
            success: false,
            error: Some(error.into()),
            published_url: None,
        }
    }
}
