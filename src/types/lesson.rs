//! Lesson Pack Data Model
//!
//! The final structured record produced by the pipeline and consumed by the
//! renderer and publisher. Arguments may recursively nest examples; every
//! example nests its sources.
//!
//! Cardinality invariants (checked by [`LessonPack::validate_complete`]):
//! - both argument cases carry at least one argument
//! - the examples bank carries at least three entries, each with a source
//! - the sources list carries at least three entries
//!
//! A record violating these is a data-contract failure, not a transient error.

use serde::{Deserialize, Serialize};

use super::error::ValidationIssue;

// =============================================================================
// Input Metadata
// =============================================================================

/// Detected kind of an input note file (closed set)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NoteKind {
    /// Lecture or seminar notes
    Lecture,
    /// Practice-round flow notes
    Round,
    /// Research dump / reading notes
    Research,
    #[default]
    Other,
}

impl std::fmt::Display for NoteKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Lecture => write!(f, "lecture"),
            Self::Round => write!(f, "round"),
            Self::Research => write!(f, "research"),
            Self::Other => write!(f, "other"),
        }
    }
}

/// Provenance stamped onto the record at finalize.
///
/// Deliberately excluded from the content fingerprint so the same semantic
/// content arriving under a different filename maps to the same fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputMetadata {
    /// Source filename the notes came from
    pub source_file: String,
    /// Detected note kind
    pub kind: NoteKind,
}

// =============================================================================
// Nested Records
// =============================================================================

/// A cited source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub title: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
}

/// A concrete example backed by at least one source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Example {
    pub label: String,
    pub what_happened: String,
    pub why_it_matters: String,
    /// Suggestions for deploying the example in a round
    #[serde(default)]
    pub how_to_use: Vec<String>,
    #[serde(default)]
    pub sources: Vec<Source>,
}

/// One argument within a case
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Argument {
    pub label: String,
    pub reasoning: String,
    #[serde(default)]
    pub stakeholders: Vec<String>,
    /// Comparative claim against the other side, when one exists
    #[serde(default)]
    pub comparative: Option<String>,
    /// Pre-empts against anticipated responses
    #[serde(default)]
    pub preempts: Vec<String>,
    #[serde(default)]
    pub examples: Vec<Example>,
}

/// A short counter-case note targeting an argument of the other side
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CounterCase {
    pub targets: String,
    pub response: String,
}

/// A step-by-step rebuttal against a named line of attack
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RebuttalLadder {
    pub against: String,
    pub steps: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlossaryEntry {
    pub term: String,
    pub definition: String,
}

// =============================================================================
// Lesson Pack
// =============================================================================

/// The complete lesson pack record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LessonPack {
    pub title: String,
    pub motion: String,
    #[serde(default)]
    pub context: String,
    /// First-principles framework points
    #[serde(default)]
    pub framework: Vec<String>,
    pub government_case: Vec<Argument>,
    pub opposition_case: Vec<Argument>,
    #[serde(default)]
    pub counter_cases: Vec<CounterCase>,
    #[serde(default)]
    pub extensions: Vec<String>,
    #[serde(default)]
    pub rebuttal_ladders: Vec<RebuttalLadder>,
    #[serde(default)]
    pub weighing: Vec<String>,
    #[serde(default)]
    pub drills: Vec<String>,
    #[serde(default)]
    pub glossary: Vec<GlossaryEntry>,
    pub examples_bank: Vec<Example>,
    pub sources: Vec<Source>,
    /// Stamped at finalize; absent on the synthesis draft
    #[serde(default)]
    pub metadata: Option<InputMetadata>,
}

impl LessonPack {
    /// Full-schema validation at finalize, stricter than the synthesis
    /// contract: cross-field minimums plus metadata presence.
    pub fn validate_complete(&self) -> Vec<ValidationIssue> {
        let mut issues = self.validate_draft();

        if self.examples_bank.len() < 3 {
            issues.push(
                ValidationIssue::error(format!(
                    "examples bank needs at least 3 entries, got {}",
                    self.examples_bank.len()
                ))
                .at("examples_bank"),
            );
        }
        for (idx, example) in self.examples_bank.iter().enumerate() {
            if example.sources.is_empty() {
                issues.push(
                    ValidationIssue::error("example carries no source")
                        .at(format!("examples_bank[{}]", idx)),
                );
            }
        }

        if self.sources.len() < 3 {
            issues.push(
                ValidationIssue::error(format!(
                    "sources list needs at least 3 entries, got {}",
                    self.sources.len()
                ))
                .at("sources"),
            );
        }

        if self.metadata.is_none() {
            issues.push(ValidationIssue::error("input metadata not stamped").at("metadata"));
        }

        issues
    }

    /// Draft-level validation used by the synthesis generation contract
    /// (basic shape only; cross-field minimums wait for finalize).
    pub fn validate_draft(&self) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();

        if self.title.trim().is_empty() {
            issues.push(ValidationIssue::error("title is empty").at("title"));
        }
        if self.motion.trim().is_empty() {
            issues.push(ValidationIssue::error("motion is empty").at("motion"));
        }
        if self.government_case.is_empty() {
            issues.push(
                ValidationIssue::error("first case carries no arguments").at("government_case"),
            );
        }
        if self.opposition_case.is_empty() {
            issues.push(
                ValidationIssue::error("second case carries no arguments").at("opposition_case"),
            );
        }
        for (side, case) in [
            ("government_case", &self.government_case),
            ("opposition_case", &self.opposition_case),
        ] {
            for (idx, arg) in case.iter().enumerate() {
                if arg.label.trim().is_empty() {
                    issues.push(
                        ValidationIssue::error("argument label is empty")
                            .at(format!("{}[{}]", side, idx)),
                    );
                }
                if arg.reasoning.trim().is_empty() {
                    issues.push(
                        ValidationIssue::warning("argument has no reasoning")
                            .at(format!("{}[{}]", side, idx)),
                    );
                }
            }
        }

        issues
    }
}

// =============================================================================
// Tests
// =============================================================================
