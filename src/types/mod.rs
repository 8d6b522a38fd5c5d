//! Core Types
//!
//! Error taxonomy, the lesson pack record tree, and per-file outcomes.

pub mod error;
pub mod lesson;
pub mod outcome;

pub use error::{
    BriefError, ErrorCategory, ErrorClassifier, IssueSeverity, Result, ServiceError,
    ValidationIssue, describe_issues, has_errors,
};
pub use lesson::{
    Argument, CounterCase, Example, GlossaryEntry, InputMetadata, LessonPack, NoteKind,
    RebuttalLadder, Source,
};
pub use outcome::FileOutcome;
