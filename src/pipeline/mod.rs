//! Pipeline Orchestrator
//!
//! Drives one note file through the full flow: normalize the raw notes,
//! run the case and evidence analyses concurrently, synthesize the lesson
//! pack, finalize it with provenance metadata and a completeness check, and
//! optionally publish. Batch runs isolate failures per file.

use serde_json::json;
use tracing::{error, info, warn};

use crate::ai::{
    CaseAnalysis, EvidenceAnalysis, GenerationRequest, NormalizedNotes, StructuredGenerator,
};
use crate::config::Config;
use crate::input::InputFile;
use crate::publish::{DocumentService, IdempotentPublisher};
use crate::types::{
    BriefError, FileOutcome, InputMetadata, LessonPack, Result, describe_issues, has_errors,
};

/// Outcome of one file's run, before batch bookkeeping
#[derive(Debug)]
pub struct LessonResult {
    pub pack: LessonPack,
    pub published_url: Option<String>,
}

/// End-to-end coordinator for one configuration
pub struct PipelineOrchestrator<S: DocumentService> {
    generator: StructuredGenerator,
    publisher: Option<IdempotentPublisher<S>>,
    max_attempts: u32,
}

impl<S: DocumentService> PipelineOrchestrator<S> {
    pub fn new(
        generator: StructuredGenerator,
        publisher: Option<IdempotentPublisher<S>>,
        config: &Config,
    ) -> Self {
        Self {
            generator,
            publisher,
            max_attempts: config.llm.max_attempts,
        }
    }

    /// Run every file in order; one file's failure never stops the batch
    pub async fn process_batch(&self, files: &[InputFile]) -> Vec<FileOutcome> {
        let mut outcomes = Vec::with_capacity(files.len());
        for file in files {
            info!(file = %file.path.display(), "Processing note file");
            match self.process_file(file).await {
                Ok(result) => {
                    info!(
                        file = %file.path.display(),
                        title = %result.pack.title,
                        "Lesson pack complete"
                    );
                    outcomes.push(FileOutcome::succeeded(file.path.clone(), result.published_url));
                }
                Err(err) => {
                    error!(file = %file.path.display(), error = %err, "File failed");
                    outcomes.push(FileOutcome::failed(file.path.clone(), err.to_string()));
                }
            }
        }
        outcomes
    }

    /// The five-stage flow for one note file
    pub async fn process_file(&self, file: &InputFile) -> Result<LessonResult> {
        let notes = self.normalize(file).await?;
        let (case, evidence) = self.analyze(&notes).await?;
        let draft = self.synthesize(&notes, &case, &evidence).await?;
        let pack = self.finalize(draft, file)?;
        let published_url = self.maybe_publish(&pack).await?;
        Ok(LessonResult {
            pack,
            published_url,
        })
    }

    async fn normalize(&self, file: &InputFile) -> Result<NormalizedNotes> {
        self.generate::<NormalizedNotes>("normalize", file.content.clone())
            .await
    }

    /// The two analyses read the same normalized notes and do not depend on
    /// each other, so they run concurrently
    async fn analyze(&self, notes: &NormalizedNotes) -> Result<(CaseAnalysis, EvidenceAnalysis)> {
        let notes_json = serde_json::to_string(notes)?;
        futures::try_join!(
            self.generate::<CaseAnalysis>("case-analysis", notes_json.clone()),
            self.generate::<EvidenceAnalysis>("evidence-analysis", notes_json),
        )
    }

    async fn synthesize(
        &self,
        notes: &NormalizedNotes,
        case: &CaseAnalysis,
        evidence: &EvidenceAnalysis,
    ) -> Result<LessonPack> {
        let combined = serde_json::to_string(&json!({
            "notes": notes,
            "case_analysis": case,
            "evidence_analysis": evidence,
        }))?;
        self.generate::<LessonPack>("synthesize", combined).await
    }

    /// Stamp provenance and enforce the cross-field completeness minimums
    /// the per-stage validators cannot see
    fn finalize(&self, mut pack: LessonPack, file: &InputFile) -> Result<LessonPack> {
        pack.metadata = Some(InputMetadata {
            source_file: file.file_name(),
            kind: file.kind,
        });

        let issues = pack.validate_complete();
        if has_errors(&issues) {
            return Err(BriefError::Validation(describe_issues(&issues)));
        }
        for issue in &issues {
            warn!(file = %file.path.display(), "{}", issue.message);
        }
        Ok(pack)
    }

    async fn maybe_publish(&self, pack: &LessonPack) -> Result<Option<String>> {
        match &self.publisher {
            Some(publisher) => {
                let result = publisher.publish(pack).await?;
                info!(document_id = %result.document_id, url = %result.url, "Published");
                Ok(Some(result.url))
            }
            None => Ok(None),
        }
    }

    async fn generate<T: crate::ai::StructuredOutput>(
        &self,
        stage: &'static str,
        user_content: String,
    ) -> Result<T> {
        self.generator
            .generate(GenerationRequest::new(user_content).with_max_attempts(self.max_attempts))
            .await
            .map_err(|err| match err {
                BriefError::Generation(failure) => BriefError::Pipeline {
                    stage,
                    message: failure.to_string(),
                },
                other => other,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::{
        ChatProvider, ChatReply, ChatRequest, MessageContent, ReplyMessage, SharedProvider,
    };
    use crate::config::PublishConfig;
    use crate::publish::{DocStructure, RemoteDoc, TableStructure};
    use crate::render::EditInstruction;
    use crate::types::NoteKind;
    use async_trait::async_trait;
    use serde_json::Value;
    use std::path::PathBuf;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn reply(body: Value) -> ChatReply {
        ChatReply {
            message: Some(ReplyMessage {
                content: Some(MessageContent::Text(body.to_string())),
            }),
        }
    }

    fn sample_file() -> InputFile {
        InputFile {
            path: PathBuf::from("lecture-env.txt"),
            kind: NoteKind::Lecture,
            content: "motion: ban single-use plastics...".to_string(),
        }
    }

    fn argument(label: &str) -> Value {
        json!({
            "label": label,
            "reasoning": "Structural incentives shift",
            "stakeholders": [], "preempts": [], "examples": []
        })
    }

    fn example(label: &str) -> Value {
        json!({
            "label": label,
            "what_happened": "A ban passed",
            "why_it_matters": "Shows feasibility",
            "how_to_use": ["cite in case"],
            "sources": [{ "title": "report" }]
        })
    }

    fn evidence_body() -> Value {
        json!({
            "examples_bank": [example("a"), example("b"), example("c")],
            "sources": [
                { "title": "s1" }, { "title": "s2" }, { "title": "s3" }
            ],
            "glossary": [], "drills": []
        })
    }

    fn pack_body() -> Value {
        json!({
            "title": "Plastics",
            "motion": "THW ban single-use plastics",
            "context": "", "framework": [],
            "government_case": [argument("Harms")],
            "opposition_case": [argument("Costs")],
            "counter_cases": [], "extensions": [], "rebuttal_ladders": [],
            "weighing": [], "drills": [], "glossary": [],
            "examples_bank": [example("a"), example("b"), example("c")],
            "sources": [
                { "title": "s1" }, { "title": "s2" }, { "title": "s3" }
            ]
        })
    }

    /// Answers each stage by matching the contract name embedded in the
    /// system message
    struct RoutingProvider {
        calls: AtomicU32,
        broken_stage: Option<&'static str>,
    }

    impl RoutingProvider {
        fn new() -> Self {
            Self {
                calls: AtomicU32::new(0),
                broken_stage: None,
            }
        }

        fn broken_at(stage: &'static str) -> Self {
            Self {
                calls: AtomicU32::new(0),
                broken_stage: Some(stage),
            }
        }
    }

    #[async_trait]
    impl ChatProvider for RoutingProvider {
        async fn complete(&self, request: &ChatRequest) -> Result<ChatReply> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let system = &request.messages[0].content;
            let stage = if system.contains("normalized-notes") {
                "normalize"
            } else if system.contains("case-analysis") {
                "case"
            } else if system.contains("evidence-analysis") {
                "evidence"
            } else {
                "synthesize"
            };

            if self.broken_stage == Some(stage) {
                return Ok(reply(json!({ "unexpected": true })));
            }

            let body = match stage {
                "normalize" => json!({ "title": "Plastics", "body": "clean notes" }),
                "case" => json!({
                    "motion": "THW ban single-use plastics",
                    "government_case": [argument("Harms")],
                    "opposition_case": [argument("Costs")],
                }),
                "evidence" => evidence_body(),
                _ => pack_body(),
            };
            Ok(reply(body))
        }

        fn name(&self) -> &str {
            "routing-mock"
        }

        fn model(&self) -> &str {
            "mock"
        }
    }

    /// Document store that accepts everything
    #[derive(Default)]
    struct AcceptingService;

    #[async_trait]
    impl DocumentService for AcceptingService {
        async fn find_by_fingerprint(
            &self,
            _fingerprint: &str,
            _folder_id: Option<&str>,
        ) -> Result<Option<RemoteDoc>> {
            Ok(None)
        }

        async fn create_document(
            &self,
            _title: &str,
            _fingerprint: &str,
            _folder_id: Option<&str>,
        ) -> Result<RemoteDoc> {
            Ok(RemoteDoc {
                id: "doc-1".to_string(),
                url: None,
            })
        }

        async fn get_structure(&self, _document_id: &str) -> Result<DocStructure> {
            Ok(DocStructure {
                end_index: 500,
                tables: vec![TableStructure {
                    cells: (0..8).map(|r| (0..3).map(|c| 100 + r * 10 + c).collect()).collect(),
                }],
            })
        }

        async fn delete_range(&self, _document_id: &str, _start: usize, _end: usize) -> Result<()> {
            Ok(())
        }

        async fn apply_edits(&self, _document_id: &str, _edits: &[EditInstruction]) -> Result<()> {
            Ok(())
        }
    }

    fn build_orchestrator(
        provider: RoutingProvider,
        publish: bool,
    ) -> PipelineOrchestrator<AcceptingService> {
        let provider: SharedProvider = Arc::new(provider);
        let generator = StructuredGenerator::new(provider);
        let publisher = publish.then(|| {
            IdempotentPublisher::new(AcceptingService, &PublishConfig {
                enabled: true,
                ..PublishConfig::default()
            })
        });
        PipelineOrchestrator::new(generator, publisher, &Config::default())
    }

    #[tokio::test]
    async fn test_full_flow_stamps_metadata() {
        let orchestrator = build_orchestrator(RoutingProvider::new(), false);
        let result = orchestrator.process_file(&sample_file()).await.unwrap();

        let metadata = result.pack.metadata.unwrap();
        assert_eq!(metadata.source_file, "lecture-env.txt");
        assert_eq!(metadata.kind, NoteKind::Lecture);
        assert!(result.published_url.is_none());
    }

    #[tokio::test]
    async fn test_full_flow_publishes_when_configured() {
        let orchestrator = build_orchestrator(RoutingProvider::new(), true);
        let result = orchestrator.process_file(&sample_file()).await.unwrap();
        assert_eq!(
            result.published_url.as_deref(),
            Some("https://docs.google.com/document/d/doc-1/edit")
        );
    }

    #[tokio::test]
    async fn test_stage_failure_names_the_stage() {
        let orchestrator = build_orchestrator(RoutingProvider::broken_at("normalize"), false);
        let err = orchestrator.process_file(&sample_file()).await.unwrap_err();
        match err {
            BriefError::Pipeline { stage, .. } => assert_eq!(stage, "normalize"),
            other => panic!("expected pipeline error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_batch_isolates_failures() {
        let broken = build_orchestrator(RoutingProvider::broken_at("evidence"), false);
        let good = build_orchestrator(RoutingProvider::new(), false);

        let files = vec![sample_file(), sample_file()];
        let outcomes = broken.process_batch(&files).await;
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(|o| !o.success));
        assert!(outcomes.iter().all(|o| o.error.is_some()));

        let outcomes = good.process_batch(&files).await;
        assert!(outcomes.iter().all(|o| o.success));
    }
}
