//! RAG chat session lifecycle.
//!
//! ```text
//! NoSession -> SessionSelected -> AwaitingResponse -> ResponseRendered
//!                                        |
//!                                        +---------> Error
//! ```
//!
//! The user's message is committed to the transcript before the question
//! is sent and is never rolled back. A failed question appends a fixed
//! assistant message and raises an error notification; retrying is up to
//! the user.

use std::sync::Arc;

use chrono::{Local, NaiveDate};
use qmsdesk_api::ChatBackend;
use qmsdesk_core::format::format_date;
use qmsdesk_core::{AskRequest, ChatFilters, ChatMessage, ChatSession, ValidationError};
use tracing::{info, warn};

use crate::FlowError;

/// Assistant text shown when a question request fails.
pub const CHAT_FALLBACK_MESSAGE: &str =
    "Entschuldigung, es ist ein Fehler aufgetreten. Bitte versuchen Sie es erneut.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatPhase {
    NoSession,
    SessionSelected,
    AwaitingResponse,
    ResponseRendered,
    Error,
}

/// Toast raised for the view to show and dismiss.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    Info(String),
    Error(String),
}

pub struct ChatController<B> {
    backend: Arc<B>,
    sessions: Vec<ChatSession>,
    current: Option<i64>,
    messages: Vec<ChatMessage>,
    phase: ChatPhase,
    input: String,
    filters: ChatFilters,
    notifications: Vec<Notification>,
}

/// Name given to the session created when none exist yet.
pub fn default_session_name(today: NaiveDate) -> String {
    format!("Chat {}", format_date(today))
}

impl<B: ChatBackend> ChatController<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self {
            backend,
            sessions: Vec::new(),
            current: None,
            messages: Vec::new(),
            phase: ChatPhase::NoSession,
            input: String::new(),
            filters: ChatFilters::default(),
            notifications: Vec::new(),
        }
    }

    pub fn sessions(&self) -> &[ChatSession] {
        &self.sessions
    }

    pub fn current_session(&self) -> Option<&ChatSession> {
        let id = self.current?;
        self.sessions.iter().find(|s| s.id == id)
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn phase(&self) -> ChatPhase {
        self.phase
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    pub fn filters(&self) -> &ChatFilters {
        &self.filters
    }

    pub fn set_filters(&mut self, filters: ChatFilters) {
        self.filters = filters;
    }

    /// Drain pending notifications.
    pub fn take_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    /// List sessions, creating a dated default session if there are none,
    /// and select the first one.
    pub async fn initialize(&mut self) -> Result<(), FlowError> {
        self.initialize_on(Local::now().date_naive()).await
    }

    pub async fn initialize_on(&mut self, today: NaiveDate) -> Result<(), FlowError> {
        self.sessions = self.backend.list_sessions().await?;
        if self.sessions.is_empty() {
            let name = default_session_name(today);
            info!(session_name = %name, "no chat sessions, creating default");
            let created = self.backend.create_session(&name).await?;
            self.sessions.push(created);
        }
        let first = self.sessions[0].id;
        self.select_session(first).await
    }

    pub async fn refresh_sessions(&mut self) -> Result<(), FlowError> {
        self.sessions = self.backend.list_sessions().await?;
        Ok(())
    }

    /// Select a session and load its history in server order.
    pub async fn select_session(&mut self, session_id: i64) -> Result<(), FlowError> {
        if !self.sessions.iter().any(|s| s.id == session_id) {
            return Err(FlowError::UnknownSession(session_id));
        }
        self.current = Some(session_id);
        self.messages.clear();
        self.phase = ChatPhase::SessionSelected;

        match self.backend.session_history(session_id).await {
            Ok(history) => {
                self.messages = history;
                Ok(())
            }
            Err(e) => {
                warn!(session_id, error = %e, "failed to load chat history");
                self.notifications.push(Notification::Error(e.user_message()));
                Err(e.into())
            }
        }
    }

    /// Mirrors the enabled state of the create-session control.
    pub fn can_create_session(&self, name: &str) -> bool {
        !name.trim().is_empty()
    }

    pub async fn create_session(&mut self, name: &str) -> Result<&ChatSession, FlowError> {
        let name = name.trim();
        if !self.can_create_session(name) {
            return Err(ValidationError::EmptySessionName.into());
        }
        let created = self.backend.create_session(name).await?;
        let id = created.id;
        self.sessions.insert(0, created);
        self.select_session(id).await?;
        Ok(&self.sessions[0])
    }

    pub async fn delete_session(&mut self, session_id: i64) -> Result<(), FlowError> {
        self.backend.delete_session(session_id).await?;
        self.sessions.retain(|s| s.id != session_id);
        if self.current == Some(session_id) {
            self.current = None;
            self.messages.clear();
            self.phase = ChatPhase::NoSession;
        }
        self.notifications
            .push(Notification::Info("Chat-Sitzung gelöscht.".to_string()));
        Ok(())
    }

    /// Mirrors the enabled state of the send control.
    pub fn can_send(&self) -> bool {
        self.current.is_some()
            && self.phase != ChatPhase::AwaitingResponse
            && !self.input.trim().is_empty()
    }

    /// Send the current input. The input is cleared once the message is
    /// sent; a rejected submit keeps it.
    pub async fn submit(&mut self) -> Result<&ChatMessage, FlowError> {
        self.ready_to_send(&self.input)?;
        let question = std::mem::take(&mut self.input);
        self.send(&question).await
    }

    fn ready_to_send(&self, question: &str) -> Result<i64, FlowError> {
        if question.trim().is_empty() {
            return Err(ValidationError::EmptyField("question").into());
        }
        let session_id = self.current.ok_or(FlowError::NoSessionSelected)?;
        if self.phase == ChatPhase::AwaitingResponse {
            return Err(FlowError::Busy);
        }
        Ok(session_id)
    }

    /// Ask a question in the selected session.
    ///
    /// The user message shows `question` exactly as typed. Returns the
    /// assistant message that was appended. On failure the fallback message
    /// is appended before the error is returned.
    pub async fn send(&mut self, question: &str) -> Result<&ChatMessage, FlowError> {
        let session_id = self.ready_to_send(question)?;

        self.messages.push(ChatMessage::user(question));
        self.phase = ChatPhase::AwaitingResponse;

        let request = AskRequest {
            question: question.trim().to_string(),
            session_id,
            filters: (!self.filters.is_empty()).then(|| self.filters.clone()),
        };

        match self.backend.ask(&request).await {
            Ok(resp) => {
                self.messages.push(resp.into());
                self.phase = ChatPhase::ResponseRendered;
                if let Some(session) = self.sessions.iter_mut().find(|s| s.id == session_id) {
                    session.message_count += 2;
                }
                Ok(&self.messages[self.messages.len() - 1])
            }
            Err(e) => {
                warn!(session_id, error = %e, "question failed");
                self.messages.push(ChatMessage::assistant(CHAT_FALLBACK_MESSAGE));
                self.notifications.push(Notification::Error(e.user_message()));
                self.phase = ChatPhase::Error;
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeBackend, session};
    use qmsdesk_core::{AskResponse, Role, SourceReference};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 18).unwrap()
    }

    fn answer(content: &str) -> AskResponse {
        AskResponse {
            content: content.to_string(),
            role: Role::Assistant,
            source_references: Vec::new(),
            structured_data: Vec::new(),
        }
    }

    async fn ready() -> (Arc<FakeBackend>, ChatController<FakeBackend>) {
        let backend = Arc::new(FakeBackend::default());
        {
            let mut state = backend.lock();
            state.sessions = vec![session(1, "Audit 2026"), session(2, "Lieferanten")];
            state.history.insert(
                1,
                vec![
                    ChatMessage::user("Wer gibt Dokumente frei?"),
                    ChatMessage::assistant("Der QMB."),
                ],
            );
            state.answer = Some(answer("Test response"));
        }
        let mut chat = ChatController::new(Arc::clone(&backend));
        chat.initialize_on(today()).await.unwrap();
        backend.lock().calls.clear();
        (backend, chat)
    }

    #[tokio::test]
    async fn creates_default_session_when_none_exist() {
        let backend = Arc::new(FakeBackend::default());
        let mut chat = ChatController::new(Arc::clone(&backend));
        chat.initialize_on(today()).await.unwrap();

        assert_eq!(chat.sessions().len(), 1);
        assert_eq!(chat.current_session().unwrap().session_name, "Chat 18.10.2026");
        assert_eq!(chat.phase(), ChatPhase::SessionSelected);
        assert_eq!(
            backend.lock().calls,
            vec![
                "list_sessions:",
                "create_session:Chat 18.10.2026",
                "history:101"
            ]
        );
    }

    #[tokio::test]
    async fn selects_first_existing_session_with_history() {
        let (_, chat) = ready().await;
        assert_eq!(chat.current_session().unwrap().id, 1);
        let contents: Vec<&str> = chat.messages().iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["Wer gibt Dokumente frei?", "Der QMB."]);
    }

    #[tokio::test]
    async fn switching_session_replaces_history() {
        let (backend, mut chat) = ready().await;
        chat.select_session(2).await.unwrap();
        assert!(chat.messages().is_empty());
        assert_eq!(backend.lock().calls, vec!["history:2"]);
    }

    #[tokio::test]
    async fn enter_sends_and_clears_input() {
        let (backend, mut chat) = ready().await;
        chat.set_input("Test question");
        assert!(chat.can_send());

        let reply = chat.submit().await.unwrap();
        assert_eq!(reply.content, "Test response");
        assert_eq!(reply.role, Role::Assistant);

        assert_eq!(chat.input(), "");
        assert_eq!(chat.phase(), ChatPhase::ResponseRendered);
        let last_two: Vec<&str> = chat.messages()[2..]
            .iter()
            .map(|m| m.content.as_str())
            .collect();
        assert_eq!(last_two, vec!["Test question", "Test response"]);

        let state = backend.lock();
        let asked = &state.asked;
        assert_eq!(asked.len(), 1);
        assert_eq!(asked[0].question, "Test question");
        assert_eq!(asked[0].session_id, 1);
        assert!(asked[0].filters.is_none());
    }

    #[tokio::test]
    async fn failure_keeps_user_message_and_appends_fallback() {
        let (backend, mut chat) = ready().await;
        backend.lock().failing.insert("ask");

        let err = chat.send("Was steht in Kapitel 7?").await.unwrap_err();
        assert!(matches!(err, FlowError::Api(_)));

        let n = chat.messages().len();
        assert_eq!(chat.messages()[n - 2].content, "Was steht in Kapitel 7?");
        assert_eq!(chat.messages()[n - 2].role, Role::User);
        assert_eq!(chat.messages()[n - 1].content, CHAT_FALLBACK_MESSAGE);
        assert_eq!(chat.messages()[n - 1].role, Role::Assistant);
        assert_eq!(chat.phase(), ChatPhase::Error);

        let toasts = chat.take_notifications();
        assert_eq!(toasts, vec![Notification::Error("ask failed".into())]);
        assert!(chat.take_notifications().is_empty());
    }

    #[tokio::test]
    async fn no_automatic_retry() {
        let (backend, mut chat) = ready().await;
        backend.lock().failing.insert("ask");
        let _ = chat.send("Frage").await;
        assert_eq!(backend.lock().calls, vec!["ask:1"]);

        backend.lock().failing.clear();
        chat.send("Frage").await.unwrap();
        assert_eq!(chat.phase(), ChatPhase::ResponseRendered);
    }

    #[tokio::test]
    async fn blank_input_never_sends() {
        let (backend, mut chat) = ready().await;
        chat.set_input("   ");
        assert!(!chat.can_send());
        assert!(matches!(
            chat.submit().await,
            Err(FlowError::Validation(ValidationError::EmptyField("question")))
        ));
        assert!(backend.lock().calls.is_empty());
    }

    #[tokio::test]
    async fn user_message_keeps_literal_text() {
        let (backend, mut chat) = ready().await;
        chat.send("  Hallo  ").await.unwrap();

        let n = chat.messages().len();
        assert_eq!(chat.messages()[n - 2].content, "  Hallo  ");
        assert_eq!(backend.lock().asked[0].question, "Hallo");
    }

    #[tokio::test]
    async fn rejected_submit_keeps_input() {
        let backend = Arc::new(FakeBackend::default());
        let mut chat = ChatController::new(Arc::clone(&backend));
        chat.set_input("Wer prüft Verfahrensanweisungen?");

        assert!(matches!(
            chat.submit().await,
            Err(FlowError::NoSessionSelected)
        ));
        assert_eq!(chat.input(), "Wer prüft Verfahrensanweisungen?");
        assert!(backend.lock().calls.is_empty());
    }

    #[tokio::test]
    async fn send_requires_session() {
        let backend = Arc::new(FakeBackend::default());
        let mut chat = ChatController::new(backend);
        assert!(matches!(
            chat.send("Hallo").await,
            Err(FlowError::NoSessionSelected)
        ));
        assert!(chat.messages().is_empty());
    }

    #[tokio::test]
    async fn empty_session_name_rejected_without_request() {
        let (backend, mut chat) = ready().await;
        assert!(!chat.can_create_session("  "));
        assert!(matches!(
            chat.create_session("  ").await,
            Err(FlowError::Validation(ValidationError::EmptySessionName))
        ));
        assert!(backend.lock().calls.is_empty());
    }

    #[tokio::test]
    async fn created_session_is_selected() {
        let (_, mut chat) = ready().await;
        let id = chat.create_session(" Normen ").await.unwrap().id;
        assert_eq!(chat.current_session().unwrap().id, id);
        assert_eq!(chat.sessions()[0].session_name, "Normen");
        assert!(chat.messages().is_empty());
    }

    #[tokio::test]
    async fn deleting_selected_session_clears_selection() {
        let (_, mut chat) = ready().await;
        chat.delete_session(1).await.unwrap();
        assert!(chat.current_session().is_none());
        assert!(chat.messages().is_empty());
        assert_eq!(chat.phase(), ChatPhase::NoSession);
        assert_eq!(chat.sessions().len(), 1);
    }

    #[tokio::test]
    async fn deleting_other_session_keeps_selection() {
        let (_, mut chat) = ready().await;
        chat.delete_session(2).await.unwrap();
        assert_eq!(chat.current_session().unwrap().id, 1);
        assert_eq!(chat.messages().len(), 2);
    }

    #[tokio::test]
    async fn filters_sent_with_question() {
        let (backend, mut chat) = ready().await;
        chat.set_filters(ChatFilters {
            qm_chapter: Some("7.4".into()),
            approved_only: true,
            ..Default::default()
        });
        chat.send("Prüfumfang?").await.unwrap();
        let filters = backend.lock().asked[0].filters.clone().unwrap();
        assert_eq!(filters.qm_chapter.as_deref(), Some("7.4"));
        assert!(filters.approved_only);
    }

    #[tokio::test]
    async fn sources_kept_on_assistant_message() {
        let (backend, mut chat) = ready().await;
        backend.lock().answer = Some(AskResponse {
            source_references: vec![SourceReference {
                document_id: 7,
                document_title: Some("AA Wareneingang".into()),
                page_number: Some(2),
                excerpt: "Stichprobenprüfung".into(),
                relevance_score: Some(0.8),
            }],
            ..answer("Siehe AA Wareneingang")
        });
        let reply = chat.send("Stichprobe?").await.unwrap();
        assert_eq!(reply.source_references.len(), 1);
        assert_eq!(reply.source_references[0].document_id, 7);
    }

    #[tokio::test]
    async fn unknown_session_rejected() {
        let (backend, mut chat) = ready().await;
        assert!(matches!(
            chat.select_session(42).await,
            Err(FlowError::UnknownSession(42))
        ));
        assert!(backend.lock().calls.is_empty());
    }
}
