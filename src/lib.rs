//! Briefsmith
//!
//! Turns raw debate-training notes into structured, citation-backed lesson
//! packs and publishes each pack as a rich-text document.
//!
//! The flow for one note file:
//! 1. Intake: collect and classify note files ([`input`])
//! 2. Normalize: clean the raw notes through the LLM ([`ai`])
//! 3. Analyze: extract the case and evidence analyses concurrently
//! 4. Synthesize: merge the analyses into one lesson pack
//! 5. Publish: render positional edits and push them to the document
//!    store, reusing any document with the same content fingerprint
//!    ([`render`], [`publish`])
//!
//! Every LLM stage runs through a schema-validated generator with a bounded
//! self-correction loop; malformed model output is fed back for another try
//! rather than failing the file outright.

pub mod ai;
pub mod cli;
pub mod config;
pub mod constants;
pub mod input;
pub mod pipeline;
pub mod publish;
pub mod render;
pub mod types;

pub use config::{Config, ConfigLoader};
pub use pipeline::PipelineOrchestrator;
pub use types::{BriefError, LessonPack, Result};
