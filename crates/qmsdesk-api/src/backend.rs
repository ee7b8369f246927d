use async_trait::async_trait;
use qmsdesk_core::{
    AskRequest, AskResponse, CatalogDraft, ChatMessage, ChatSession, DocumentType, InterestGroup,
    StatusChange, UploadFile, UploadMetadata, UploadedDocument, WorkflowStatus,
};

use crate::ApiError;

/// Document workflow and upload endpoints.
#[async_trait]
pub trait DocumentBackend: Send + Sync {
    async fn list_documents_by_status(
        &self,
        status: WorkflowStatus,
    ) -> Result<Vec<UploadedDocument>, ApiError>;

    async fn change_status(&self, document_id: i64, change: &StatusChange) -> Result<(), ApiError>;

    async fn delete_document(&self, document_id: i64) -> Result<(), ApiError>;

    async fn upload_document(
        &self,
        file: &UploadFile,
        metadata: &UploadMetadata,
    ) -> Result<UploadedDocument, ApiError>;

    async fn generate_preview(&self, document_id: i64) -> Result<(), ApiError>;

    async fn assign_interest_groups(
        &self,
        document_id: i64,
        interest_group_ids: &[i64],
    ) -> Result<(), ApiError>;
}

/// RAG chat endpoints.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn list_sessions(&self) -> Result<Vec<ChatSession>, ApiError>;

    async fn create_session(&self, session_name: &str) -> Result<ChatSession, ApiError>;

    async fn delete_session(&self, session_id: i64) -> Result<(), ApiError>;

    /// Messages in server order.
    async fn session_history(&self, session_id: i64) -> Result<Vec<ChatMessage>, ApiError>;

    async fn ask(&self, request: &AskRequest) -> Result<AskResponse, ApiError>;
}

/// Document type and interest group administration.
#[async_trait]
pub trait CatalogBackend: Send + Sync {
    async fn list_document_types(&self) -> Result<Vec<DocumentType>, ApiError>;

    async fn create_document_type(&self, draft: &CatalogDraft) -> Result<DocumentType, ApiError>;

    async fn delete_document_type(&self, id: i64) -> Result<(), ApiError>;

    async fn list_interest_groups(&self) -> Result<Vec<InterestGroup>, ApiError>;

    async fn create_interest_group(&self, draft: &CatalogDraft) -> Result<InterestGroup, ApiError>;

    async fn delete_interest_group(&self, id: i64) -> Result<(), ApiError>;
}
