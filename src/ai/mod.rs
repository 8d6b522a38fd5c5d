//! Structured Generation
//!
//! Chat provider abstraction, versioned generation contracts, and the
//! schema-validated generator with its bounded self-correction loop.

pub mod contract;
pub mod generator;
pub mod provider;

pub use contract::{
    CaseAnalysis, EvidenceAnalysis, NormalizedNotes, OutputContract, StructuredOutput,
};
pub use generator::{FailureReason, GenerationFailure, GenerationRequest, StructuredGenerator};
pub use provider::{
    ChatMessage, ChatProvider, ChatReply, ChatRequest, MessageContent, OpenAiProvider,
    ReplyMessage, Role, SharedProvider,
};
