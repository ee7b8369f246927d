pub mod catalog;
pub mod chapter;
pub mod chat;
pub mod document;
pub mod error;
pub mod format;
pub mod upload;
pub mod workflow;

pub use catalog::{AiModel, CatalogDraft, DocumentType, InterestGroup, User};
pub use chapter::chapter_sort_key;
pub use chat::{
    AskRequest, AskResponse, ChatFilters, ChatMessage, ChatSession, KeyValueEntry, Role,
    SourceReference, StructuredData,
};
pub use document::{IndexedDocument, StatusChange, UploadedDocument};
pub use error::ValidationError;
pub use upload::{MAX_UPLOAD_BYTES, UploadFile, UploadMetadata};
pub use workflow::{WorkflowStatus, default_transition_reason};
