//! Chat Provider Abstraction
//!
//! Defines the ChatProvider trait the structured generator drives. The
//! generator needs full conversation control (it appends the model's invalid
//! reply and a correction turn after each failed validation), so the seam is a
//! role-tagged message list rather than a single prompt string.

mod openai;

pub use openai::OpenAiProvider;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::types::Result;

// =============================================================================
// Messages
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One role-tagged turn in a conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// A completion request constrained to return a single JSON object
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    /// Ask the provider for a bare JSON object (no surrounding prose)
    pub json_only: bool,
}

// =============================================================================
// Replies
// =============================================================================

/// Reply content: a plain string or an ordered sequence of parts.
/// Any other shape is treated as empty content.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
    Other(serde_json::Value),
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContentPart {
    #[serde(default)]
    pub text: Option<String>,
}

impl MessageContent {
    /// Extract textual content; parts are concatenated in order
    pub fn as_text(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Parts(parts) => parts
                .iter()
                .filter_map(|p| p.text.as_deref())
                .collect::<Vec<_>>()
                .concat(),
            Self::Other(_) => String::new(),
        }
    }
}

/// The reply message of the single completion choice
#[derive(Debug, Clone)]
pub struct ReplyMessage {
    pub content: Option<MessageContent>,
}

impl ReplyMessage {
    /// Textual content, empty when no recognized shape is present
    pub fn text(&self) -> String {
        self.content.as_ref().map(|c| c.as_text()).unwrap_or_default()
    }
}

/// Provider reply. `message` is absent when the call returned no completion
/// at all - a transport-level problem the generator does not retry.
#[derive(Debug, Clone)]
pub struct ChatReply {
    pub message: Option<ReplyMessage>,
}

// =============================================================================
// Provider Trait
// =============================================================================

/// Shared chat provider handle used across pipeline stages
pub type SharedProvider = Arc<dyn ChatProvider>;

#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Issue one completion call over the given conversation
    async fn complete(&self, request: &ChatRequest) -> Result<ChatReply>;

    /// Provider name for logging
    fn name(&self) -> &str;

    /// Model identifier currently in use (any string is accepted)
    fn model(&self) -> &str;
}
