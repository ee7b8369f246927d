//! RAG chat records: sessions, messages, citations and structured answer blocks.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatSession {
    pub id: i64,
    pub session_name: String,
    /// ISO 8601 timestamp string.
    pub created_at: String,
    pub last_activity: Option<String>,
    #[serde(default)]
    pub message_count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A message in a chat session.
///
/// Messages appended locally before the server answers carry no `id` and no
/// `created_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    #[serde(default)]
    pub id: Option<i64>,
    pub role: Role,
    pub content: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub source_references: Vec<SourceReference>,
    #[serde(default)]
    pub structured_data: Vec<StructuredData>,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self::local(Role::User, content.into())
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::local(Role::Assistant, content.into())
    }

    fn local(role: Role, content: String) -> Self {
        Self {
            id: None,
            role,
            content,
            created_at: None,
            source_references: Vec::new(),
            structured_data: Vec::new(),
        }
    }
}

/// A document excerpt the answer was grounded on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceReference {
    pub document_id: i64,
    #[serde(default)]
    pub document_title: Option<String>,
    #[serde(default)]
    pub page_number: Option<u32>,
    pub excerpt: String,
    #[serde(default)]
    pub relevance_score: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyValueEntry {
    pub key: String,
    pub value: String,
}

/// Structured data extracted from the retrieved documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StructuredData {
    Table {
        #[serde(default)]
        title: Option<String>,
        headers: Vec<String>,
        rows: Vec<Vec<String>>,
    },
    KeyValue {
        #[serde(default)]
        title: Option<String>,
        entries: Vec<KeyValueEntry>,
    },
    List {
        #[serde(default)]
        title: Option<String>,
        items: Vec<String>,
    },
    #[serde(other)]
    Unknown,
}

/// Side-panel filters restricting which documents a question is answered from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatFilters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_type_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qm_chapter: Option<String>,
    #[serde(default)]
    pub approved_only: bool,
}

impl ChatFilters {
    pub fn is_empty(&self) -> bool {
        *self == ChatFilters::default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AskRequest {
    pub question: String,
    pub session_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filters: Option<ChatFilters>,
}

/// Answer returned by the question endpoint.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AskResponse {
    pub content: String,
    pub role: Role,
    #[serde(default)]
    pub source_references: Vec<SourceReference>,
    #[serde(default)]
    pub structured_data: Vec<StructuredData>,
}

impl From<AskResponse> for ChatMessage {
    fn from(resp: AskResponse) -> Self {
        Self {
            id: None,
            role: resp.role,
            content: resp.content,
            created_at: None,
            source_references: resp.source_references,
            structured_data: resp.structured_data,
        }
    }
}
