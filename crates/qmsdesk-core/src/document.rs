//! Uploaded document records exchanged with the document workflow endpoints.

use serde::{Deserialize, Serialize};

use crate::WorkflowStatus;

/// A document stored by the backend.
///
/// The client only ever holds a transient copy per board load. Its effective
/// status is the bucket it was fetched under; `workflow_status` is whatever
/// the server echoed and may be absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadedDocument {
    pub id: i64,
    pub filename: String,
    pub original_filename: String,
    #[serde(default)]
    pub title: Option<String>,
    pub document_type_id: i64,
    #[serde(default)]
    pub document_type_name: Option<String>,
    pub qm_chapter: Option<String>,
    pub version: Option<String>,
    pub file_size_bytes: u64,
    pub file_type: String,
    #[serde(default)]
    pub page_count: Option<u32>,
    /// ISO 8601 timestamp string.
    pub uploaded_at: String,
    #[serde(default)]
    pub workflow_status: Option<WorkflowStatus>,
}

impl UploadedDocument {
    /// Name shown on cards: the title when set, otherwise the original filename.
    pub fn display_name(&self) -> &str {
        self.title
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or(&self.original_filename)
    }
}

/// Body of a status-change request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    pub new_status: WorkflowStatus,
    pub reason: String,
}

/// A document known to the RAG index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedDocument {
    pub document_id: i64,
    pub title: String,
    #[serde(default)]
    pub chunk_count: u32,
    /// ISO 8601 timestamp string.
    pub indexed_at: Option<String>,
}
