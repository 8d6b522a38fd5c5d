//! Idempotent Publishing
//!
//! Publishes a rendered lesson pack to the remote document store. Repeated
//! runs over the same material converge on one document: each pack is
//! fingerprinted over its teaching content, the store is searched for that
//! fingerprint, and a hit is rewritten in place rather than duplicated.
//!
//! The rewrite is destructive (clear body, re-render from scratch); manual
//! edits made to a published document do not survive a republish. The
//! find-then-create sequence is also not atomic, so two concurrent runs over
//! identical notes can both miss and both create.

mod gdocs;
mod retry;
mod service;

pub use gdocs::GoogleDocsClient;
pub use retry::{RetryPolicy, with_backoff, with_backoff_optional};
pub use service::{DocStructure, DocumentService, RemoteDoc, TableStructure};

use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::config::{CaseNaming, PublishConfig};
use crate::render::{self, EditInstruction, Location, RenderStep};
use crate::types::{Argument, BriefError, LessonPack, Result};

/// Outcome of one publish call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishResult {
    pub document_id: String,
    pub url: String,
}

// =============================================================================
// Fingerprint
// =============================================================================

/// The fields that identify a pack's teaching content. Provenance metadata
/// is excluded so re-running over a renamed notes file still converges on
/// the same document.
#[derive(Serialize)]
struct FingerprintView<'a> {
    title: &'a str,
    motion: &'a str,
    context: &'a str,
    government_case: &'a [Argument],
    opposition_case: &'a [Argument],
}

/// Hex SHA-256 over the canonical JSON of the pack's identity fields
pub fn fingerprint(pack: &LessonPack) -> String {
    let view = FingerprintView {
        title: &pack.title,
        motion: &pack.motion,
        context: &pack.context,
        government_case: &pack.government_case,
        opposition_case: &pack.opposition_case,
    };
    // Struct serialization order is fixed, so the bytes are canonical
    let bytes = serde_json::to_vec(&view).expect("fingerprint view serializes");
    let digest = Sha256::digest(&bytes);
    digest.iter().map(|byte| format!("{:02x}", byte)).collect()
}

// =============================================================================
// Publisher
// =============================================================================

/// Fingerprint-keyed publisher over a [`DocumentService`]
pub struct IdempotentPublisher<S: DocumentService> {
    service: S,
    policy: RetryPolicy,
    naming: CaseNaming,
    folder_id: Option<String>,
}

impl<S: DocumentService> IdempotentPublisher<S> {
    pub fn new(service: S, config: &PublishConfig) -> Self {
        Self {
            service,
            policy: RetryPolicy::new(&config.retry),
            naming: config.case_naming,
            folder_id: config.folder_id.clone(),
        }
    }

    /// Publish `pack`, reusing an existing document with the same
    /// fingerprint when one is found
    pub async fn publish(&self, pack: &LessonPack) -> Result<PublishResult> {
        let fingerprint = fingerprint(pack);
        let folder = self.folder_id.as_deref();

        // A failed lookup degrades to a fresh create; duplicate documents
        // are recoverable, a lost publish is not.
        let existing = with_backoff_optional(&self.policy, "drive.find", || {
            self.service.find_by_fingerprint(&fingerprint, folder)
        })
        .await
        .flatten();

        let doc = match existing {
            Some(doc) => {
                info!(document_id = %doc.id, "Reusing existing document");
                self.clear_body(&doc.id).await?;
                doc
            }
            None => {
                let doc = with_backoff(&self.policy, "drive.create", || {
                    self.service
                        .create_document(&pack.title, &fingerprint, folder)
                })
                .await?;
                info!(document_id = %doc.id, "Created document");
                doc
            }
        };

        let plan = render::render(pack, self.naming);
        for step in &plan.steps {
            match step {
                RenderStep::Apply(edits) => {
                    with_backoff(&self.policy, "docs.batch_update", || {
                        self.service.apply_edits(&doc.id, edits)
                    })
                    .await?;
                }
                RenderStep::FillTable {
                    table_ordinal,
                    rows,
                } => {
                    self.fill_table(&doc.id, *table_ordinal, rows).await?;
                }
            }
        }

        let url = doc
            .url
            .clone()
            .unwrap_or_else(|| format!("https://docs.google.com/document/d/{}/edit", doc.id));
        Ok(PublishResult {
            document_id: doc.id,
            url,
        })
    }

    /// Delete everything in the body. Offset 0 is the document start marker
    /// and the body keeps a final newline, so an empty body ends at index 2.
    async fn clear_body(&self, document_id: &str) -> Result<()> {
        let structure = with_backoff(&self.policy, "docs.get", || {
            self.service.get_structure(document_id)
        })
        .await?;
        if structure.end_index > 2 {
            with_backoff(&self.policy, "docs.clear", || {
                self.service
                    .delete_range(document_id, 1, structure.end_index - 1)
            })
            .await?;
        }
        Ok(())
    }

    /// Phase two of table insertion: discover the freshly-created cell
    /// offsets, then fill them back-to-front so earlier offsets stay valid
    async fn fill_table(
        &self,
        document_id: &str,
        table_ordinal: usize,
        rows: &[Vec<String>],
    ) -> Result<()> {
        let structure = with_backoff(&self.policy, "docs.get", || {
            self.service.get_structure(document_id)
        })
        .await?;
        let table = structure.tables.get(table_ordinal).ok_or_else(|| {
            warn!(table_ordinal, found = structure.tables.len(), "Table missing after insert");
            BriefError::Pipeline {
                stage: "publish",
                message: format!("document has no table at ordinal {}", table_ordinal),
            }
        })?;

        let edits = table_fill_edits(table, rows);
        with_backoff(&self.policy, "docs.fill_table", || {
            self.service.apply_edits(document_id, &edits)
        })
        .await
    }
}

/// Build cell-fill insertions in descending offset order, so each insert
/// leaves all not-yet-used offsets untouched. Empty cells are skipped.
fn table_fill_edits(table: &TableStructure, rows: &[Vec<String>]) -> Vec<EditInstruction> {
    let mut fills: Vec<(usize, &str)> = Vec::new();
    for (row, offsets) in rows.iter().zip(&table.cells) {
        for (text, offset) in row.iter().zip(offsets) {
            if !text.is_empty() {
                fills.push((*offset, text));
            }
        }
    }
    fills.sort_by(|a, b| b.0.cmp(&a.0));
    fills
        .into_iter()
        .map(|(offset, text)| EditInstruction::InsertText {
            location: Location::At(offset),
            text: text.to_string(),
        })
        .collect()
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetryConfig;
    use crate::types::lesson::tests::sample_pack;
    use crate::types::{ErrorCategory, ServiceError};
    use async_trait::async_trait;
    use std::sync::Mutex;

    fn test_config() -> PublishConfig {
        PublishConfig {
            enabled: true,
            retry: RetryConfig {
                max_retries: 1,
                base_delay_ms: 1,
                max_delay_secs: 1,
            },
            ..PublishConfig::default()
        }
    }

    /// A table large enough for the sample pack's sources section
    fn sample_table_structure() -> TableStructure {
        TableStructure {
            cells: (0..4)
                .map(|row| (0..3).map(|col| 100 + row * 10 + col * 3).collect())
                .collect(),
        }
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        Find,
        Create,
        GetStructure,
        DeleteRange(usize, usize),
        ApplyEdits(usize),
    }

    #[derive(Default)]
    struct MockState {
        calls: Vec<Call>,
        existing: Option<RemoteDoc>,
        structures: Vec<DocStructure>,
        find_error: bool,
    }

    #[derive(Default)]
    struct MockService {
        state: Mutex<MockState>,
    }

    impl MockService {
        fn calls(&self) -> Vec<Call> {
            self.state.lock().unwrap().calls.clone()
        }

        fn push_structure(&self, structure: DocStructure) {
            self.state.lock().unwrap().structures.push(structure);
        }
    }

    #[async_trait]
    impl DocumentService for MockService {
        async fn find_by_fingerprint(
            &self,
            _fingerprint: &str,
            _folder_id: Option<&str>,
        ) -> Result<Option<RemoteDoc>> {
            let mut state = self.state.lock().unwrap();
            state.calls.push(Call::Find);
            if state.find_error {
                return Err(BriefError::Service(ServiceError::new(
                    "drive",
                    ErrorCategory::Transient,
                    "search backend unavailable",
                )));
            }
            Ok(state.existing.clone())
        }

        async fn create_document(
            &self,
            _title: &str,
            _fingerprint: &str,
            _folder_id: Option<&str>,
        ) -> Result<RemoteDoc> {
            let mut state = self.state.lock().unwrap();
            state.calls.push(Call::Create);
            Ok(RemoteDoc {
                id: "doc-new".to_string(),
                url: None,
            })
        }

        async fn get_structure(&self, _document_id: &str) -> Result<DocStructure> {
            let mut state = self.state.lock().unwrap();
            state.calls.push(Call::GetStructure);
            Ok(if state.structures.is_empty() {
                DocStructure::default()
            } else {
                state.structures.remove(0)
            })
        }

        async fn delete_range(&self, _document_id: &str, start: usize, end: usize) -> Result<()> {
            let mut state = self.state.lock().unwrap();
            state.calls.push(Call::DeleteRange(start, end));
            Ok(())
        }

        async fn apply_edits(&self, _document_id: &str, edits: &[EditInstruction]) -> Result<()> {
            let mut state = self.state.lock().unwrap();
            state.calls.push(Call::ApplyEdits(edits.len()));
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_publish_creates_when_nothing_matches() {
        let service = MockService::default();
        // Structure fetch after the table insert
        service.push_structure(DocStructure {
            end_index: 400,
            tables: vec![sample_table_structure()],
        });

        let publisher = IdempotentPublisher::new(service, &test_config());
        let result = publisher.publish(&sample_pack()).await.unwrap();
        assert_eq!(result.document_id, "doc-new");
        assert_eq!(result.url, "https://docs.google.com/document/d/doc-new/edit");

        let calls = publisher.service.calls();
        assert_eq!(calls[0], Call::Find);
        assert_eq!(calls[1], Call::Create);
        // No body clear on a fresh document
        assert!(!calls.iter().any(|c| matches!(c, Call::DeleteRange(..))));
        // Table fill ran after a structure fetch
        assert!(calls.contains(&Call::GetStructure));
    }

    #[tokio::test]
    async fn test_republish_rewrites_in_place() {
        let service = MockService::default();
        service.state.lock().unwrap().existing = Some(RemoteDoc {
            id: "doc-existing".to_string(),
            url: Some("https://docs.example/view".to_string()),
        });
        // First fetch: stale body to clear. Second: post-insert table offsets.
        service.push_structure(DocStructure {
            end_index: 250,
            tables: vec![],
        });
        service.push_structure(DocStructure {
            end_index: 400,
            tables: vec![sample_table_structure()],
        });

        let publisher = IdempotentPublisher::new(service, &test_config());
        let result = publisher.publish(&sample_pack()).await.unwrap();
        assert_eq!(result.document_id, "doc-existing");
        assert_eq!(result.url, "https://docs.example/view");

        let calls = publisher.service.calls();
        assert!(!calls.contains(&Call::Create));
        assert!(calls.contains(&Call::DeleteRange(1, 249)));
    }

    #[tokio::test]
    async fn test_empty_existing_body_is_not_cleared() {
        let service = MockService::default();
        service.state.lock().unwrap().existing = Some(RemoteDoc {
            id: "doc-empty".to_string(),
            url: None,
        });
        service.push_structure(DocStructure {
            end_index: 2,
            tables: vec![],
        });
        service.push_structure(DocStructure {
            end_index: 400,
            tables: vec![sample_table_structure()],
        });

        let publisher = IdempotentPublisher::new(service, &test_config());
        publisher.publish(&sample_pack()).await.unwrap();
        let calls = publisher.service.calls();
        assert!(!calls.iter().any(|c| matches!(c, Call::DeleteRange(..))));
    }

    #[tokio::test]
    async fn test_failed_lookup_degrades_to_create() {
        let service = MockService::default();
        service.state.lock().unwrap().find_error = true;
        service.push_structure(DocStructure {
            end_index: 400,
            tables: vec![sample_table_structure()],
        });

        let publisher = IdempotentPublisher::new(service, &test_config());
        let result = publisher.publish(&sample_pack()).await.unwrap();
        assert_eq!(result.document_id, "doc-new");

        // Transient search failure was retried, then abandoned
        let finds = publisher
            .service
            .calls()
            .iter()
            .filter(|c| **c == Call::Find)
            .count();
        assert_eq!(finds, 2);
    }

    #[tokio::test]
    async fn test_missing_table_after_insert_is_an_error() {
        let service = MockService::default();
        // Structure fetch reports no tables even though one was inserted
        let publisher = IdempotentPublisher::new(service, &test_config());
        let err = publisher.publish(&sample_pack()).await.unwrap_err();
        assert!(matches!(err, BriefError::Pipeline { stage: "publish", .. }));
    }

    #[test]
    fn test_fill_edits_descend_and_skip_empty_cells() {
        let table = TableStructure {
            cells: vec![vec![10, 20], vec![30, 40]],
        };
        let rows = vec![
            vec!["a".to_string(), String::new()],
            vec!["c".to_string(), "d".to_string()],
        ];
        let edits = table_fill_edits(&table, &rows);
        let offsets: Vec<usize> = edits
            .iter()
            .map(|e| match e {
                EditInstruction::InsertText {
                    location: Location::At(i),
                    ..
                } => *i,
                other => panic!("unexpected edit {:?}", other),
            })
            .collect();
        assert_eq!(offsets, vec![40, 30, 10]);
    }

    #[test]
    fn test_fingerprint_ignores_metadata() {
        let mut a = sample_pack();
        let mut b = sample_pack();
        b.metadata = None;
        b.drills.push("Extra drill".to_string());
        assert_eq!(fingerprint(&a), fingerprint(&b));

        a.motion = "This house regrets the ban".to_string();
        assert_ne!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn test_fingerprint_is_hex_sha256() {
        let hash = fingerprint(&sample_pack());
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
