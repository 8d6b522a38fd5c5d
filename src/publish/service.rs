//! Document Service Abstraction
//!
//! Trait over the remote document store so the publisher can be exercised
//! against an in-memory fake. The real implementation talks to the Docs and
//! Drive HTTP APIs.

use async_trait::async_trait;

use crate::render::EditInstruction;
use crate::types::Result;

/// A document located by its fingerprint property
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteDoc {
    pub id: String,
    /// Browser URL when the store reports one
    pub url: Option<String>,
}

/// Offsets discovered from a structure fetch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocStructure {
    /// Index one past the last body character
    pub end_index: usize,
    /// Tables in document order
    pub tables: Vec<TableStructure>,
}

/// Per-cell insertion offsets for one table, row-major
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableStructure {
    pub cells: Vec<Vec<usize>>,
}

/// Remote document store operations the publisher needs
#[async_trait]
pub trait DocumentService: Send + Sync {
    /// Find a document carrying `fingerprint` in its app properties,
    /// scoped to `folder_id` when given
    async fn find_by_fingerprint(
        &self,
        fingerprint: &str,
        folder_id: Option<&str>,
    ) -> Result<Option<RemoteDoc>>;

    /// Create an empty document with `title`, stamped with `fingerprint`,
    /// inside `folder_id` when given
    async fn create_document(
        &self,
        title: &str,
        fingerprint: &str,
        folder_id: Option<&str>,
    ) -> Result<RemoteDoc>;

    /// Fetch body end index and table cell offsets
    async fn get_structure(&self, document_id: &str) -> Result<DocStructure>;

    /// Delete the body content in `[start, end)`
    async fn delete_range(&self, document_id: &str, start: usize, end: usize) -> Result<()>;

    /// Apply one batch of edits atomically, in order
    async fn apply_edits(&self, document_id: &str, edits: &[EditInstruction]) -> Result<()>;
}
