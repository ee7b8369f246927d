//! In-memory backend for flow tests.

use std::collections::{HashMap, HashSet};
use std::fmt::Display;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use qmsdesk_api::{ApiError, CatalogBackend, ChatBackend, DocumentBackend};
use qmsdesk_core::{
    AskRequest, AskResponse, CatalogDraft, ChatMessage, ChatSession, DocumentType, InterestGroup,
    StatusChange, UploadFile, UploadMetadata, UploadedDocument, WorkflowStatus,
};

#[derive(Default)]
pub(crate) struct FakeState {
    pub documents: Vec<(WorkflowStatus, UploadedDocument)>,
    pub sessions: Vec<ChatSession>,
    pub history: HashMap<i64, Vec<ChatMessage>>,
    pub answer: Option<AskResponse>,
    pub document_types: Vec<DocumentType>,
    pub interest_groups: Vec<InterestGroup>,

    /// Operation names (`"ask"`) or full call strings (`"list:draft"`) that fail with a 500.
    pub failing: HashSet<&'static str>,
    /// Every call fails with 401.
    pub unauthorized: bool,

    pub calls: Vec<String>,
    pub status_changes: Vec<(i64, StatusChange)>,
    pub asked: Vec<AskRequest>,
    pub assigned: Vec<(i64, Vec<i64>)>,
    pub next_id: i64,
}

#[derive(Default)]
pub(crate) struct FakeBackend {
    state: Mutex<FakeState>,
}

impl FakeBackend {
    pub fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    /// Record a call and decide whether it fails.
    fn enter(
        &self,
        op: &'static str,
        detail: impl Display,
    ) -> Result<MutexGuard<'_, FakeState>, ApiError> {
        let mut state = self.lock();
        let call = format!("{op}:{detail}");
        state.calls.push(call.clone());
        if state.unauthorized {
            return Err(ApiError::Unauthorized);
        }
        if state.failing.contains(op) || state.failing.contains(call.as_str()) {
            return Err(ApiError::Server {
                status: 500,
                message: Some(format!("{op} failed")),
            });
        }
        Ok(state)
    }
}

impl FakeState {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        100 + self.next_id
    }
}

pub(crate) fn doc(id: i64, name: &str, chapter: &str) -> UploadedDocument {
    UploadedDocument {
        id,
        filename: format!("{id}.pdf"),
        original_filename: name.to_string(),
        title: None,
        document_type_id: 1,
        document_type_name: None,
        qm_chapter: Some(chapter.to_string()),
        version: Some("1.0".into()),
        file_size_bytes: 1024,
        file_type: "application/pdf".into(),
        page_count: Some(1),
        uploaded_at: "2026-03-01T09:00:00".into(),
        workflow_status: None,
    }
}

pub(crate) fn session(id: i64, name: &str) -> ChatSession {
    ChatSession {
        id,
        session_name: name.to_string(),
        created_at: "2026-03-01T09:00:00".into(),
        last_activity: None,
        message_count: 0,
    }
}

#[async_trait]
impl DocumentBackend for FakeBackend {
    async fn list_documents_by_status(
        &self,
        status: WorkflowStatus,
    ) -> Result<Vec<UploadedDocument>, ApiError> {
        let state = self.enter("list", status)?;
        Ok(state
            .documents
            .iter()
            .filter(|(s, _)| *s == status)
            .map(|(_, d)| d.clone())
            .collect())
    }

    async fn change_status(&self, document_id: i64, change: &StatusChange) -> Result<(), ApiError> {
        let mut state = self.enter("change_status", document_id)?;
        state.status_changes.push((document_id, change.clone()));
        for (status, d) in state.documents.iter_mut() {
            if d.id == document_id {
                *status = change.new_status;
            }
        }
        Ok(())
    }

    async fn delete_document(&self, document_id: i64) -> Result<(), ApiError> {
        let mut state = self.enter("delete", document_id)?;
        state.documents.retain(|(_, d)| d.id != document_id);
        Ok(())
    }

    async fn upload_document(
        &self,
        file: &UploadFile,
        metadata: &UploadMetadata,
    ) -> Result<UploadedDocument, ApiError> {
        let mut state = self.enter("upload", &file.file_name)?;
        let id = state.next_id();
        let mut uploaded = doc(id, &file.file_name, &metadata.qm_chapter);
        uploaded.document_type_id = metadata.document_type_id;
        uploaded.file_size_bytes = file.size();
        state.documents.push((WorkflowStatus::Draft, uploaded.clone()));
        Ok(uploaded)
    }

    async fn generate_preview(&self, document_id: i64) -> Result<(), ApiError> {
        let _state = self.enter("preview", document_id)?;
        Ok(())
    }

    async fn assign_interest_groups(
        &self,
        document_id: i64,
        interest_group_ids: &[i64],
    ) -> Result<(), ApiError> {
        let mut state = self.enter("assign", document_id)?;
        state.assigned.push((document_id, interest_group_ids.to_vec()));
        Ok(())
    }
}

#[async_trait]
impl ChatBackend for FakeBackend {
    async fn list_sessions(&self) -> Result<Vec<ChatSession>, ApiError> {
        let state = self.enter("list_sessions", "")?;
        Ok(state.sessions.clone())
    }

    async fn create_session(&self, session_name: &str) -> Result<ChatSession, ApiError> {
        let mut state = self.enter("create_session", session_name)?;
        let id = state.next_id();
        let created = session(id, session_name);
        state.sessions.insert(0, created.clone());
        Ok(created)
    }

    async fn delete_session(&self, session_id: i64) -> Result<(), ApiError> {
        let mut state = self.enter("delete_session", session_id)?;
        state.sessions.retain(|s| s.id != session_id);
        Ok(())
    }

    async fn session_history(&self, session_id: i64) -> Result<Vec<ChatMessage>, ApiError> {
        let state = self.enter("history", session_id)?;
        Ok(state.history.get(&session_id).cloned().unwrap_or_default())
    }

    async fn ask(&self, request: &AskRequest) -> Result<AskResponse, ApiError> {
        let mut state = self.enter("ask", request.session_id)?;
        state.asked.push(request.clone());
        state.answer.clone().ok_or(ApiError::Server {
            status: 503,
            message: None,
        })
    }
}

#[async_trait]
impl CatalogBackend for FakeBackend {
    async fn list_document_types(&self) -> Result<Vec<DocumentType>, ApiError> {
        let state = self.enter("list_types", "")?;
        Ok(state.document_types.clone())
    }

    async fn create_document_type(&self, draft: &CatalogDraft) -> Result<DocumentType, ApiError> {
        let mut state = self.enter("create_type", &draft.code)?;
        let created = DocumentType {
            id: state.next_id(),
            name: draft.name.clone(),
            code: draft.code.clone(),
            description: draft.description.clone(),
        };
        state.document_types.push(created.clone());
        Ok(created)
    }

    async fn delete_document_type(&self, id: i64) -> Result<(), ApiError> {
        let mut state = self.enter("delete_type", id)?;
        state.document_types.retain(|t| t.id != id);
        Ok(())
    }

    async fn list_interest_groups(&self) -> Result<Vec<InterestGroup>, ApiError> {
        let state = self.enter("list_groups", "")?;
        Ok(state.interest_groups.clone())
    }

    async fn create_interest_group(&self, draft: &CatalogDraft) -> Result<InterestGroup, ApiError> {
        let mut state = self.enter("create_group", &draft.code)?;
        let created = InterestGroup {
            id: state.next_id(),
            name: draft.name.clone(),
            code: draft.code.clone(),
            description: draft.description.clone(),
            is_active: true,
        };
        state.interest_groups.push(created.clone());
        Ok(created)
    }

    async fn delete_interest_group(&self, id: i64) -> Result<(), ApiError> {
        let mut state = self.enter("delete_group", id)?;
        state.interest_groups.retain(|g| g.id != id);
        Ok(())
    }
}
