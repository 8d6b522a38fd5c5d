//! Generation Contracts
//!
//! One contract per structured output type: the behavioral instructions, a
//! versioned literal description of the required JSON shape (the format hint
//! embedded in the system prompt), and the validator. Keeping hint and
//! validator side by side means the prompt contract and the validation rules
//! cannot silently drift apart.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::types::{
    Argument, CounterCase, Example, GlossaryEntry, LessonPack, RebuttalLadder, Source,
    ValidationIssue,
};

// =============================================================================
// Contract
// =============================================================================

/// Versioned generation contract for one output type
#[derive(Debug, Clone, Copy)]
pub struct OutputContract {
    pub name: &'static str,
    pub version: u32,
    /// Behavioral instructions placed before the format hint
    pub system_instructions: &'static str,
    /// Literal textual description of the required JSON shape
    pub format_hint: &'static str,
}

/// A type the structured generator can produce
pub trait StructuredOutput: DeserializeOwned {
    fn contract() -> &'static OutputContract;

    /// Itemized issues; error-severity issues trigger a correction turn
    fn validate(&self) -> Vec<ValidationIssue>;
}

// =============================================================================
// Normalize
// =============================================================================

/// Stage 1 output: derived title plus cleaned body text.
/// Serialized back to JSON as the input of both analysis stages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedNotes {
    pub title: String,
    pub body: String,
}

pub const NORMALIZE_V1: OutputContract = OutputContract {
    name: "normalized-notes",
    version: 1,
    system_instructions: "You are a debate coach's assistant. Normalize raw, unstructured \
debate-training notes: fix obvious transcription noise, keep every substantive point, drop \
boilerplate, and derive a short descriptive title.",
    format_hint: r#"{
  "title": "short descriptive title (string, required)",
  "body": "the full normalized note text (string, required)"
}"#,
};

impl StructuredOutput for NormalizedNotes {
    fn contract() -> &'static OutputContract {
        &NORMALIZE_V1
    }

    fn validate(&self) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        if self.title.trim().is_empty() {
            issues.push(ValidationIssue::error("title is empty").at("title"));
        }
        if self.body.trim().is_empty() {
            issues.push(ValidationIssue::error("body is empty").at("body"));
        }
        issues
    }
}

// =============================================================================
// Analyze-A: argument cases
// =============================================================================

/// Stage 2a output: the argumentative skeleton of the lesson
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseAnalysis {
    pub motion: String,
    #[serde(default)]
    pub context: String,
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
}

pub const CASE_ANALYSIS_V1: OutputContract = OutputContract {
    name: "case-analysis",
    version: 1,
    system_instructions: "You are a debate case analyst. From the normalized notes, extract \
the motion, a first-principles framework, and a full argument case for each side. Every \
argument needs a label and reasoning; add stakeholders, a comparative, pre-empts and \
examples where the notes support them.",
    format_hint: r#"{
  "motion": "the motion under debate (string, required)",
  "context": "one-paragraph setting for the lesson (string)",
  "framework": ["first-principles points (strings)"],
  "government_case": [{
    "label": "argument name (string, required)",
    "reasoning": "why the argument stands (string, required)",
    "stakeholders": ["affected groups (strings)"],
    "comparative": "claim against the other side (string or null)",
    "preempts": ["answers to anticipated responses (strings)"],
    "examples": [{
      "label": "string", "what_happened": "string", "why_it_matters": "string",
      "how_to_use": ["strings"], "sources": [{"title": "string", "url": "string or null", "note": "string or null"}]
    }]
  }],
  "opposition_case": [ /* same argument shape, at least one */ ],
  "counter_cases": [{"targets": "string", "response": "string"}],
  "extensions": ["strings"],
  "rebuttal_ladders": [{"against": "string", "steps": ["strings"]}],
  "weighing": ["strings"]
}"#,
};

impl StructuredOutput for CaseAnalysis {
    fn contract() -> &'static OutputContract {
        &CASE_ANALYSIS_V1
    }

    fn validate(&self) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        if self.motion.trim().is_empty() {
            issues.push(ValidationIssue::error("motion is empty").at("motion"));
        }
        if self.government_case.is_empty() {
            issues.push(ValidationIssue::error("no arguments for the first side").at("government_case"));
        }
        if self.opposition_case.is_empty() {
            issues.push(
                ValidationIssue::error("no arguments for the second side").at("opposition_case"),
            );
        }
        if self.framework.is_empty() {
            issues.push(ValidationIssue::warning("no framework points").at("framework"));
        }
        issues
    }
}

// =============================================================================
// Analyze-B: evidence bank
// =============================================================================

/// Stage 2b output: examples, sources, glossary, drills
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceAnalysis {
    pub examples_bank: Vec<Example>,
    pub sources: Vec<Source>,
    #[serde(default)]
    pub glossary: Vec<GlossaryEntry>,
    #[serde(default)]
    pub drills: Vec<String>,
}

pub const EVIDENCE_ANALYSIS_V1: OutputContract = OutputContract {
    name: "evidence-analysis",
    version: 1,
    system_instructions: "You are a debate evidence researcher. From the normalized notes, \
build a bank of at least three concrete examples (each citing at least one source), a \
sources list of at least three entries, a glossary of technical terms, and practice drills.",
    format_hint: r#"{
  "examples_bank": [{
    "label": "string (required)",
    "what_happened": "string (required)",
    "why_it_matters": "string (required)",
    "how_to_use": ["strings"],
    "sources": [{"title": "string (required)", "url": "string or null", "note": "string or null"}]
  }],
  "sources": [{"title": "string (required)", "url": "string or null", "note": "string or null"}],
  "glossary": [{"term": "string", "definition": "string"}],
  "drills": ["strings"]
}"#,
};

impl StructuredOutput for EvidenceAnalysis {
    fn contract() -> &'static OutputContract {
        &EVIDENCE_ANALYSIS_V1
    }

    fn validate(&self) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
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
        issues
    }
}

// =============================================================================
// Synthesize
// =============================================================================

pub const SYNTHESIS_V1: OutputContract = OutputContract {
    name: "lesson-pack",
    version: 1,
    system_instructions: "You are a debate curriculum writer. Merge the normalized notes, the \
case analysis and the evidence analysis into one complete lesson pack. Keep every argument \
and example; attach examples to the arguments they support and keep the full bank.",
    format_hint: r#"{
  "title": "string (required)",
  "motion": "string (required)",
  "context": "string",
  "framework": ["strings"],
  "government_case": [ /* argument objects, at least one */ ],
  "opposition_case": [ /* argument objects, at least one */ ],
  "counter_cases": [{"targets": "string", "response": "string"}],
  "extensions": ["strings"],
  "rebuttal_ladders": [{"against": "string", "steps": ["strings"]}],
  "weighing": ["strings"],
  "drills": ["strings"],
  "glossary": [{"term": "string", "definition": "string"}],
  "examples_bank": [ /* example objects with sources */ ],
  "sources": [{"title": "string", "url": "string or null", "note": "string or null"}]
}
Argument objects: {"label": "string", "reasoning": "string", "stakeholders": ["strings"],
"comparative": "string or null", "preempts": ["strings"], "examples": [example objects]}.
Example objects: {"label": "string", "what_happened": "string", "why_it_matters": "string",
"how_to_use": ["strings"], "sources": [source objects]}."#,
};

impl StructuredOutput for LessonPack {
    fn contract() -> &'static OutputContract {
        &SYNTHESIS_V1
    }

    // Draft-level shape only; cross-field minimums are checked at finalize
    fn validate(&self) -> Vec<ValidationIssue> {
        self.validate_draft()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::has_errors;

    #[test]
    fn test_normalize_contract_rejects_empty_fields() {
        let notes = NormalizedNotes {
            title: " ".to_string(),
            body: "content".to_string(),
        };
        assert!(has_errors(&notes.validate()));

        let ok = NormalizedNotes {
            title: "Plastics".to_string(),
            body: "content".to_string(),
        };
        assert!(!has_errors(&ok.validate()));
    }

    #[test]
    fn test_case_analysis_requires_both_sides() {
        let parsed: CaseAnalysis = serde_json::from_str(
            r#"{
                "motion": "THW ban X",
                "government_case": [{"label": "a", "reasoning": "b"}],
                "opposition_case": []
            }"#,
        )
        .unwrap();
        assert!(has_errors(&parsed.validate()));
    }

    #[test]
    fn test_evidence_analysis_minimums() {
        let parsed: EvidenceAnalysis = serde_json::from_str(
            r#"{
                "examples_bank": [
                    {"label": "e1", "what_happened": "x", "why_it_matters": "y",
                     "sources": [{"title": "s"}]}
                ],
                "sources": [{"title": "s1"}, {"title": "s2"}]
            }"#,
        )
        .unwrap();
        let issues = parsed.validate();
        assert!(has_errors(&issues));
        // Both cardinality violations reported
        assert!(issues.iter().any(|i| i.message.contains("examples bank")));
        assert!(issues.iter().any(|i| i.message.contains("sources list")));
    }

    #[test]
    fn test_contract_metadata() {
        assert_eq!(NormalizedNotes::contract().name, "normalized-notes");
        assert_eq!(LessonPack::contract().version, 1);
        assert!(LessonPack::contract().format_hint.contains("examples_bank"));
    }
}
