//! Structured Generator
//!
//! Coerces a non-deterministic chat provider into strictly-typed structured
//! output. On invalid output the model's reply is appended to the conversation
//! together with a correction turn describing the failure, and the call is
//! retried up to a bounded attempt count.
//!
//! The loop is an explicit state machine (awaiting-response → validating →
//! correcting → exhausted) so the attempt-count invariant is independently
//! testable: a mock that always returns invalid JSON sees exactly
//! `max_attempts` calls; a mock that succeeds on attempt 2 sees exactly 2.

use tracing::{debug, warn};

use super::contract::{OutputContract, StructuredOutput};
use super::provider::{ChatMessage, ChatRequest, SharedProvider};
use crate::constants::generation;
use crate::types::{Result, describe_issues, has_errors};

// =============================================================================
// Failure
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    /// Output stayed invalid through the final attempt
    InvalidOutput,
    /// A call returned no message at all - transport-level, not retried
    EmptyResponse,
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidOutput => write!(f, "invalid-output"),
            Self::EmptyResponse => write!(f, "empty-response"),
        }
    }
}

/// Terminal failure of a generation request
#[derive(Debug, Clone)]
pub struct GenerationFailure {
    pub reason: FailureReason,
    pub detail: String,
    /// The model's final raw reply, when one exists
    pub raw_content: Option<String>,
}

impl std::fmt::Display for GenerationFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.reason, self.detail)
    }
}

impl std::error::Error for GenerationFailure {}

impl GenerationFailure {
    fn empty_response() -> Self {
        Self {
            reason: FailureReason::EmptyResponse,
            detail: "provider returned no message".to_string(),
            raw_content: None,
        }
    }

    fn invalid_output(detail: String, raw_content: String) -> Self {
        Self {
            reason: FailureReason::InvalidOutput,
            detail,
            raw_content: Some(raw_content),
        }
    }
}

// =============================================================================
// Request & Conversation
// =============================================================================

/// One generation request; immutable per call. The model identifier lives in
/// the provider, the system instructions and format hint in the contract.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub user_content: String,
    pub max_attempts: u32,
}

impl GenerationRequest {
    pub fn new(user_content: impl Into<String>) -> Self {
        Self {
            user_content: user_content.into(),
            max_attempts: generation::DEFAULT_MAX_ATTEMPTS,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }
}

/// Ordered role-tagged conversation, mutated only by the correction path and
/// discarded after success or exhaustion.
struct ConversationState {
    messages: Vec<ChatMessage>,
}

impl ConversationState {
    fn open(contract: &OutputContract, user_content: &str) -> Self {
        let system = format!(
            "{}\n\nRespond with a single JSON object and nothing else. \
Required shape ({} v{}):\n{}",
            contract.system_instructions, contract.name, contract.version, contract.format_hint
        );
        Self {
            messages: vec![ChatMessage::system(system), ChatMessage::user(user_content)],
        }
    }

    fn push_correction(&mut self, contract: &OutputContract, raw: String, detail: &str) {
        self.messages.push(ChatMessage::assistant(raw));
        self.messages.push(ChatMessage::user(format!(
            "Your previous reply was not a valid {} object. Problems:\n{}\n\n\
Resend the complete object as strictly valid JSON, fixing every problem above. \
Respond with the JSON object only.",
            contract.name, detail
        )));
    }

    fn request(&self) -> ChatRequest {
        ChatRequest {
            messages: self.messages.clone(),
            json_only: true,
        }
    }
}

// =============================================================================
// Generator
// =============================================================================

/// Correction-loop state. Transitions:
/// AwaitingResponse → Validating → (done | Correcting → AwaitingResponse | Exhausted)
enum GenState {
    AwaitingResponse,
    Validating { raw: String },
    Correcting { raw: String, detail: String },
    Exhausted { raw: String, detail: String },
}

/// Schema-validated generation with a bounded self-correction loop
pub struct StructuredGenerator {
    provider: SharedProvider,
}

impl StructuredGenerator {
    pub fn new(provider: SharedProvider) -> Self {
        Self { provider }
    }

    /// Generate a validated `T` or fail with a [`GenerationFailure`].
    /// Transport errors from the provider propagate unchanged.
    pub async fn generate<T: StructuredOutput>(&self, request: GenerationRequest) -> Result<T> {
        let contract = T::contract();
        let max_attempts = request
            .max_attempts
            .clamp(1, generation::MAX_ATTEMPTS_CEILING);

        let mut conversation = ConversationState::open(contract, &request.user_content);
        let mut attempts: u32 = 0;
        let mut state = GenState::AwaitingResponse;

        loop {
            state = match state {
                GenState::AwaitingResponse => {
                    attempts += 1;
                    debug!(
                        contract = contract.name,
                        attempt = attempts,
                        max_attempts,
                        provider = self.provider.name(),
                        "Requesting structured output"
                    );
                    let reply = self.provider.complete(&conversation.request()).await?;
                    match reply.message {
                        None => return Err(GenerationFailure::empty_response().into()),
                        Some(message) => GenState::Validating {
                            raw: message.text(),
                        },
                    }
                }
                GenState::Validating { raw } => match parse_and_validate::<T>(&raw) {
                    Ok(value) => {
                        debug!(contract = contract.name, attempts, "Structured output valid");
                        return Ok(value);
                    }
                    Err(detail) => {
                        warn!(
                            contract = contract.name,
                            attempt = attempts,
                            %detail,
                            "Structured output invalid"
                        );
                        if attempts >= max_attempts {
                            GenState::Exhausted { raw, detail }
                        } else {
                            GenState::Correcting { raw, detail }
                        }
                    }
                },
                GenState::Correcting { raw, detail } => {
                    conversation.push_correction(contract, raw, &detail);
                    GenState::AwaitingResponse
                }
                GenState::Exhausted { raw, detail } => {
                    return Err(GenerationFailure::invalid_output(detail, raw).into());
                }
            };
        }
    }
}

/// Parse raw content as JSON, deserialize into `T`, run the contract
/// validator. Returns a human-readable failure description on any miss:
/// itemized validation issues when available, else the raw error text.
fn parse_and_validate<T: StructuredOutput>(raw: &str) -> std::result::Result<T, String> {
    let value: serde_json::Value =
        serde_json::from_str(raw).map_err(|e| format!("not parseable as JSON: {}", e))?;
    let typed: T = serde_json::from_value(value)
        .map_err(|e| format!("JSON does not match the required shape: {}", e))?;

    let issues = typed.validate();
    if has_errors(&issues) {
        return Err(describe_issues(&issues));
    }
    Ok(typed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::contract::NormalizedNotes;
    use crate::ai::provider::{ChatProvider, ChatReply, ContentPart, MessageContent, ReplyMessage};
    use crate::types::BriefError;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Provider replaying a fixed script of replies
    struct ScriptedProvider {
        replies: Mutex<Vec<ChatReply>>,
        calls: AtomicU32,
        last_request: Mutex<Option<ChatRequest>>,
    }

    impl ScriptedProvider {
        fn new(replies: Vec<ChatReply>) -> Self {
            Self {
                replies: Mutex::new(replies),
                calls: AtomicU32::new(0),
                last_request: Mutex::new(None),
            }
        }

        fn text_reply(text: &str) -> ChatReply {
            ChatReply {
                message: Some(ReplyMessage {
                    content: Some(MessageContent::Text(text.to_string())),
                }),
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ChatProvider for ScriptedProvider {
        async fn complete(&self, request: &ChatRequest) -> Result<ChatReply> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_request.lock().unwrap() = Some(request.clone());
            let mut replies = self.replies.lock().unwrap();
            if replies.is_empty() {
                return Ok(Self::text_reply("not json at all"));
            }
            Ok(replies.remove(0))
        }

        fn name(&self) -> &str {
            "scripted"
        }

        fn model(&self) -> &str {
            "scripted-model"
        }
    }

    fn generator(provider: &std::sync::Arc<ScriptedProvider>) -> StructuredGenerator {
        StructuredGenerator::new(provider.clone())
    }

    #[tokio::test]
    async fn test_valid_on_first_attempt() {
        let provider = std::sync::Arc::new(ScriptedProvider::new(vec![
            ScriptedProvider::text_reply(r#"{"title": "Plastics", "body": "notes"}"#),
        ]));
        let result: NormalizedNotes = generator(&provider)
            .generate(GenerationRequest::new("raw notes").with_max_attempts(3))
            .await
            .unwrap();
        assert_eq!(result.title, "Plastics");
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_always_invalid_makes_exactly_max_attempts_calls() {
        let provider = std::sync::Arc::new(ScriptedProvider::new(vec![]));
        let err = generator(&provider)
            .generate::<NormalizedNotes>(GenerationRequest::new("raw").with_max_attempts(3))
            .await
            .unwrap_err();

        assert_eq!(provider.calls(), 3);
        match err {
            BriefError::Generation(f) => {
                assert_eq!(f.reason, FailureReason::InvalidOutput);
                assert_eq!(f.raw_content.as_deref(), Some("not json at all"));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[tokio::test]
    async fn test_success_on_second_of_three_makes_exactly_two_calls() {
        let provider = std::sync::Arc::new(ScriptedProvider::new(vec![
            ScriptedProvider::text_reply("{broken"),
            ScriptedProvider::text_reply(r#"{"title": "T", "body": "B"}"#),
            ScriptedProvider::text_reply(r#"{"title": "never reached", "body": "x"}"#),
        ]));
        let result: NormalizedNotes = generator(&provider)
            .generate(GenerationRequest::new("raw").with_max_attempts(3))
            .await
            .unwrap();
        assert_eq!(result.title, "T");
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn test_empty_response_fails_without_retry() {
        let provider = std::sync::Arc::new(ScriptedProvider::new(vec![ChatReply {
            message: None,
        }]));
        let err = generator(&provider)
            .generate::<NormalizedNotes>(GenerationRequest::new("raw").with_max_attempts(3))
            .await
            .unwrap_err();

        assert_eq!(provider.calls(), 1);
        match err {
            BriefError::Generation(f) => assert_eq!(f.reason, FailureReason::EmptyResponse),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[tokio::test]
    async fn test_correction_turn_replays_invalid_output_and_issues() {
        let provider = std::sync::Arc::new(ScriptedProvider::new(vec![
            // Parses, but the contract validator rejects the empty title
            ScriptedProvider::text_reply(r#"{"title": "", "body": "B"}"#),
            ScriptedProvider::text_reply(r#"{"title": "Fixed", "body": "B"}"#),
        ]));
        let result: NormalizedNotes = generator(&provider)
            .generate(GenerationRequest::new("raw").with_max_attempts(2))
            .await
            .unwrap();
        assert_eq!(result.title, "Fixed");

        // The second call's conversation carries the invalid reply as an
        // assistant turn plus a correction turn naming the issue
        let last = provider.last_request.lock().unwrap().clone().unwrap();
        assert_eq!(last.messages.len(), 4);
        assert!(last.messages[2].content.contains("\"title\": \"\""));
        assert!(last.messages[3].content.contains("title is empty"));
        assert!(last.json_only);
    }

    #[tokio::test]
    async fn test_parts_content_is_concatenated() {
        let provider = std::sync::Arc::new(ScriptedProvider::new(vec![ChatReply {
            message: Some(ReplyMessage {
                content: Some(MessageContent::Parts(vec![
                    ContentPart {
                        text: Some(r#"{"title": "P","#.to_string()),
                    },
                    ContentPart {
                        text: Some(r#" "body": "B"}"#.to_string()),
                    },
                ])),
            }),
        }]));
        let result: NormalizedNotes = generator(&provider)
            .generate(GenerationRequest::new("raw"))
            .await
            .unwrap();
        assert_eq!(result.title, "P");
    }
}
