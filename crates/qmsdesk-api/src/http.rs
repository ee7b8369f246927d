//! HTTP client for the QMS backend's REST endpoints.

use async_trait::async_trait;
use qmsdesk_core::{
    AiModel, AskRequest, AskResponse, CatalogDraft, ChatMessage, ChatSession, DocumentType,
    IndexedDocument, InterestGroup, StatusChange, UploadFile, UploadMetadata, UploadedDocument,
    User, WorkflowStatus,
};
use reqwest::multipart::{Form, Part};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{ApiError, CatalogBackend, ChatBackend, DocumentBackend, extract_error_message};

/// Client for the QMS API.
///
/// Every request carries `Authorization: Bearer <token>` once a token is set.
/// There is no refresh: a 401 surfaces as [`ApiError::Unauthorized`].
#[derive(Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
}

#[derive(Serialize)]
struct SessionCreate<'a> {
    session_name: &'a str,
}

#[derive(Serialize)]
struct GroupAssignment<'a> {
    interest_group_ids: &'a [i64],
}

impl ApiClient {
    /// Create a client for the given backend base URL.
    ///
    /// `base_url` should be like `http://localhost:8000` (a trailing slash is dropped).
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        let token = token.into();
        self.token = (!token.trim().is_empty()).then(|| token.trim().to_string());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = self.url(path);
        debug!(method = %method, url = %url, "api request");
        let req = self.client.request(method, url);
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    async fn send(req: RequestBuilder) -> Result<Response, ApiError> {
        let resp = req.send().await?;
        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED {
            warn!("backend rejected credentials");
            return Err(ApiError::Unauthorized);
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let message = extract_error_message(&body);
            warn!(
                status = status.as_u16(),
                detail = message.as_deref().unwrap_or(""),
                "request failed"
            );
            return Err(ApiError::Server {
                status: status.as_u16(),
                message,
            });
        }
        Ok(resp)
    }

    async fn send_json<T: DeserializeOwned>(req: RequestBuilder) -> Result<T, ApiError> {
        let resp = Self::send(req).await?;
        let body = resp.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn send_empty(req: RequestBuilder) -> Result<(), ApiError> {
        Self::send(req).await?;
        Ok(())
    }

    /// Exchange username and password for a bearer token.
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginResponse, ApiError> {
        info!(username = %username, "logging in");
        let req = self
            .request(Method::POST, "/api/auth/login")
            .form(&[("username", username), ("password", password)]);
        Self::send_json(req).await
    }

    pub async fn current_user(&self) -> Result<User, ApiError> {
        Self::send_json(self.request(Method::GET, "/api/auth/me")).await
    }

    pub async fn list_users(&self) -> Result<Vec<User>, ApiError> {
        Self::send_json(self.request(Method::GET, "/api/users/")).await
    }

    pub async fn list_ai_models(&self) -> Result<Vec<AiModel>, ApiError> {
        Self::send_json(self.request(Method::GET, "/api/ai-models/")).await
    }

    /// Ask the backend to chunk and embed a document for retrieval.
    pub async fn index_document(&self, document_id: i64) -> Result<(), ApiError> {
        info!(document_id, "indexing document");
        Self::send_empty(self.request(Method::POST, &format!("/api/rag/index/{document_id}"))).await
    }

    pub async fn reindex_document(&self, document_id: i64) -> Result<(), ApiError> {
        info!(document_id, "reindexing document");
        Self::send_empty(self.request(Method::POST, &format!("/api/rag/reindex/{document_id}")))
            .await
    }

    pub async fn list_indexed_documents(&self) -> Result<Vec<IndexedDocument>, ApiError> {
        Self::send_json(self.request(Method::GET, "/api/rag/documents")).await
    }
}

fn status_path(status: WorkflowStatus) -> String {
    format!("/api/document-workflow/status/{}", status.as_str())
}

#[async_trait]
impl DocumentBackend for ApiClient {
    async fn list_documents_by_status(
        &self,
        status: WorkflowStatus,
    ) -> Result<Vec<UploadedDocument>, ApiError> {
        let docs: Vec<UploadedDocument> =
            Self::send_json(self.request(Method::GET, &status_path(status))).await?;
        debug!(status = %status, count = docs.len(), "fetched documents");
        Ok(docs)
    }

    async fn change_status(&self, document_id: i64, change: &StatusChange) -> Result<(), ApiError> {
        info!(document_id, new_status = %change.new_status, "changing document status");
        let path = format!("/api/document-workflow/change-status/{document_id}");
        Self::send_empty(self.request(Method::POST, &path).json(change)).await
    }

    async fn delete_document(&self, document_id: i64) -> Result<(), ApiError> {
        info!(document_id, "deleting document");
        Self::send_empty(self.request(Method::DELETE, &format!("/api/documents/{document_id}")))
            .await
    }

    async fn upload_document(
        &self,
        file: &UploadFile,
        metadata: &UploadMetadata,
    ) -> Result<UploadedDocument, ApiError> {
        info!(
            file_name = %file.file_name,
            size = file.size(),
            document_type_id = metadata.document_type_id,
            "uploading document"
        );
        let part = Part::bytes(file.bytes.clone())
            .file_name(file.file_name.clone())
            .mime_str(&file.mime_type)
            .map_err(|e| ApiError::InvalidRequest(e.to_string()))?;
        let form = Form::new()
            .part("file", part)
            .text("document_type_id", metadata.document_type_id.to_string())
            .text("qm_chapter", metadata.qm_chapter.trim().to_string())
            .text("version", metadata.version.trim().to_string());
        Self::send_json(
            self.request(Method::POST, "/api/documents/upload")
                .multipart(form),
        )
        .await
    }

    async fn generate_preview(&self, document_id: i64) -> Result<(), ApiError> {
        let path = format!("/api/documents/{document_id}/generate-preview");
        Self::send_empty(self.request(Method::POST, &path)).await
    }

    async fn assign_interest_groups(
        &self,
        document_id: i64,
        interest_group_ids: &[i64],
    ) -> Result<(), ApiError> {
        let path = format!("/api/documents/{document_id}/interest-groups");
        let body = GroupAssignment { interest_group_ids };
        Self::send_empty(self.request(Method::POST, &path).json(&body)).await
    }
}

#[async_trait]
impl ChatBackend for ApiClient {
    async fn list_sessions(&self) -> Result<Vec<ChatSession>, ApiError> {
        Self::send_json(self.request(Method::GET, "/api/rag/sessions")).await
    }

    async fn create_session(&self, session_name: &str) -> Result<ChatSession, ApiError> {
        info!(session_name = %session_name, "creating chat session");
        let body = SessionCreate { session_name };
        Self::send_json(self.request(Method::POST, "/api/rag/sessions").json(&body)).await
    }

    async fn delete_session(&self, session_id: i64) -> Result<(), ApiError> {
        info!(session_id, "deleting chat session");
        Self::send_empty(self.request(Method::DELETE, &format!("/api/rag/sessions/{session_id}")))
            .await
    }

    async fn session_history(&self, session_id: i64) -> Result<Vec<ChatMessage>, ApiError> {
        let path = format!("/api/rag/sessions/{session_id}/history");
        Self::send_json(self.request(Method::GET, &path)).await
    }

    async fn ask(&self, request: &AskRequest) -> Result<AskResponse, ApiError> {
        info!(session_id = request.session_id, "asking question");
        let resp: AskResponse =
            Self::send_json(self.request(Method::POST, "/api/rag/chat").json(request)).await?;
        debug!(sources = resp.source_references.len(), "answer received");
        Ok(resp)
    }
}

#[async_trait]
impl CatalogBackend for ApiClient {
    async fn list_document_types(&self) -> Result<Vec<DocumentType>, ApiError> {
        Self::send_json(self.request(Method::GET, "/api/document-types/")).await
    }

    async fn create_document_type(&self, draft: &CatalogDraft) -> Result<DocumentType, ApiError> {
        info!(code = %draft.code, "creating document type");
        Self::send_json(self.request(Method::POST, "/api/document-types/").json(draft)).await
    }

    async fn delete_document_type(&self, id: i64) -> Result<(), ApiError> {
        info!(id, "deleting document type");
        Self::send_empty(self.request(Method::DELETE, &format!("/api/document-types/{id}"))).await
    }

    async fn list_interest_groups(&self) -> Result<Vec<InterestGroup>, ApiError> {
        Self::send_json(self.request(Method::GET, "/api/interest-groups/")).await
    }

    async fn create_interest_group(&self, draft: &CatalogDraft) -> Result<InterestGroup, ApiError> {
        info!(code = %draft.code, "creating interest group");
        Self::send_json(self.request(Method::POST, "/api/interest-groups/").json(draft)).await
    }

    async fn delete_interest_group(&self, id: i64) -> Result<(), ApiError> {
        info!(id, "deleting interest group");
        Self::send_empty(self.request(Method::DELETE, &format!("/api/interest-groups/{id}"))).await
    }
}
