//! Kanban board over the four workflow statuses.
//!
//! The board never mutates a document's status locally. A drop onto another
//! column only records a [`PendingTransition`]; confirming it sends the
//! status-change request and then reloads every column from the server.
//!
//! Drag lifecycle:
//!
//! ```text
//! Idle --start_drag--> Dragging --drop_on(other)--> AwaitingConfirmation
//!  ^                     |   |                          |         |
//!  |      drag_end ------+   +-- drop_on(same) --+      | confirm | cancel
//!  +---------------------------------------------+------+---------+
//! ```

use std::collections::HashSet;
use std::sync::Arc;

use futures::future::join_all;
use qmsdesk_api::DocumentBackend;
use qmsdesk_core::{
    StatusChange, UploadedDocument, WorkflowStatus, chapter_sort_key, default_transition_reason,
};
use tracing::{info, warn};

use crate::FlowError;

/// Page-level message when any column fails to load.
pub const LOAD_ERROR_MESSAGE: &str = "Dokumente konnten nicht geladen werden.";

#[derive(Debug, Clone, PartialEq)]
pub enum DragState {
    Idle,
    Dragging {
        document_id: i64,
        from: WorkflowStatus,
    },
    AwaitingConfirmation(PendingTransition),
}

/// A status change the operator still has to confirm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTransition {
    pub document_id: i64,
    pub document_name: String,
    pub from: WorkflowStatus,
    pub to: WorkflowStatus,
}

impl PendingTransition {
    /// Question shown in the confirmation dialog.
    pub fn prompt(&self) -> String {
        format!(
            "Dokument \"{}\" von \"{}\" nach \"{}\" verschieben?",
            self.document_name,
            self.from.label(),
            self.to.label()
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingDeletion {
    pub document_id: i64,
    pub document_name: String,
    pub status: WorkflowStatus,
}

impl PendingDeletion {
    pub fn prompt(&self) -> String {
        format!(
            "Dokument \"{}\" wirklich löschen? Dies kann nicht rückgängig gemacht werden.",
            self.document_name
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DropOutcome {
    /// Nothing was being dragged.
    NotDragging,
    /// Dropped back onto its own column; no request is made.
    SameBucket,
    ConfirmationRequired(PendingTransition),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BoardOrder {
    /// As returned by the server.
    #[default]
    Server,
    /// By QM chapter, then original filename.
    Chapter,
}

/// Client-side filter over already-loaded documents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoardFilter {
    pub search: String,
    pub document_type_id: Option<i64>,
    pub order: BoardOrder,
}

impl BoardFilter {
    pub fn matches(&self, doc: &UploadedDocument) -> bool {
        if let Some(type_id) = self.document_type_id
            && doc.document_type_id != type_id
        {
            return false;
        }
        let needle = self.search.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        [
            Some(doc.filename.as_str()),
            Some(doc.original_filename.as_str()),
            doc.title.as_deref(),
            doc.qm_chapter.as_deref(),
        ]
        .into_iter()
        .flatten()
        .any(|field| field.to_lowercase().contains(&needle))
    }
}

pub struct WorkflowBoard<B> {
    backend: Arc<B>,
    buckets: [Vec<UploadedDocument>; 4],
    error: Option<String>,
    drag: DragState,
    pending_delete: Option<PendingDeletion>,
}

impl<B: DocumentBackend> WorkflowBoard<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self {
            backend,
            buckets: Default::default(),
            error: None,
            drag: DragState::Idle,
            pending_delete: None,
        }
    }

    /// Fetch all four columns, one request per status.
    ///
    /// Any failing request empties the whole board and sets a single
    /// page-level error. A document returned under more than one status is
    /// kept only in the first column in board order.
    pub async fn load(&mut self) -> Result<(), FlowError> {
        let backend = Arc::clone(&self.backend);
        let results = join_all(
            WorkflowStatus::ALL.map(|status| backend.list_documents_by_status(status)),
        )
        .await;

        let mut fetched = Vec::with_capacity(results.len());
        for (status, result) in WorkflowStatus::ALL.into_iter().zip(results) {
            match result {
                Ok(docs) => fetched.push((status, docs)),
                Err(e) => {
                    warn!(status = %status, error = %e, "failed to load column");
                    self.buckets = Default::default();
                    self.error = Some(if e.is_unauthorized() {
                        e.user_message()
                    } else {
                        LOAD_ERROR_MESSAGE.to_string()
                    });
                    return Err(e.into());
                }
            }
        }

        let mut buckets: [Vec<UploadedDocument>; 4] = Default::default();
        let mut seen = HashSet::new();
        for (status, docs) in fetched {
            for doc in docs {
                if !seen.insert(doc.id) {
                    warn!(document_id = doc.id, status = %status, "document listed under two statuses, skipping");
                    continue;
                }
                buckets[status.index()].push(doc);
            }
        }

        self.buckets = buckets;
        self.error = None;
        info!(total = self.total(), "board loaded");
        Ok(())
    }

    pub fn bucket(&self, status: WorkflowStatus) -> &[UploadedDocument] {
        &self.buckets[status.index()]
    }

    pub fn total(&self) -> usize {
        self.buckets.iter().map(Vec::len).sum()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn drag_state(&self) -> &DragState {
        &self.drag
    }

    pub fn pending_deletion(&self) -> Option<&PendingDeletion> {
        self.pending_delete.as_ref()
    }

    /// Locate a loaded document and the column it sits in.
    pub fn find(&self, document_id: i64) -> Option<(WorkflowStatus, &UploadedDocument)> {
        WorkflowStatus::ALL.into_iter().find_map(|status| {
            self.bucket(status)
                .iter()
                .find(|d| d.id == document_id)
                .map(|d| (status, d))
        })
    }

    /// Documents of one column passing `filter`, in the filter's order.
    pub fn visible(&self, status: WorkflowStatus, filter: &BoardFilter) -> Vec<&UploadedDocument> {
        let mut docs: Vec<&UploadedDocument> =
            self.bucket(status).iter().filter(|d| filter.matches(d)).collect();
        if filter.order == BoardOrder::Chapter {
            docs.sort_by_cached_key(|d| {
                (
                    chapter_sort_key(d.qm_chapter.as_deref().unwrap_or("")),
                    d.original_filename.to_lowercase(),
                )
            });
        }
        docs
    }

    pub fn start_drag(&mut self, document_id: i64) -> Result<(), FlowError> {
        if matches!(self.drag, DragState::AwaitingConfirmation(_)) {
            return Err(FlowError::Busy);
        }
        let (from, _) = self
            .find(document_id)
            .ok_or(FlowError::UnknownDocument(document_id))?;
        self.drag = DragState::Dragging { document_id, from };
        Ok(())
    }

    /// Drag ended without a drop target.
    pub fn drag_end(&mut self) {
        if matches!(self.drag, DragState::Dragging { .. }) {
            self.drag = DragState::Idle;
        }
    }

    pub fn drop_on(&mut self, target: WorkflowStatus) -> DropOutcome {
        let DragState::Dragging { document_id, from } = self.drag else {
            return DropOutcome::NotDragging;
        };
        if from == target {
            self.drag = DragState::Idle;
            return DropOutcome::SameBucket;
        }
        let document_name = self
            .find(document_id)
            .map(|(_, d)| d.display_name().to_string())
            .unwrap_or_else(|| format!("#{document_id}"));
        let pending = PendingTransition {
            document_id,
            document_name,
            from,
            to: target,
        };
        self.drag = DragState::AwaitingConfirmation(pending.clone());
        DropOutcome::ConfirmationRequired(pending)
    }

    /// Explicit status action: drag and drop in one step.
    pub fn request_transition(
        &mut self,
        document_id: i64,
        target: WorkflowStatus,
    ) -> Result<DropOutcome, FlowError> {
        self.start_drag(document_id)?;
        Ok(self.drop_on(target))
    }

    /// Send the pending status change, then reload every column.
    ///
    /// If the status change fails the columns are left as they were. A
    /// failed reload after a committed change still returns the transition;
    /// the page-level [`error`](Self::error) reports the reload.
    pub async fn confirm(&mut self) -> Result<PendingTransition, FlowError> {
        let DragState::AwaitingConfirmation(pending) =
            std::mem::replace(&mut self.drag, DragState::Idle)
        else {
            return Err(FlowError::NothingPending);
        };

        let change = StatusChange {
            new_status: pending.to,
            reason: default_transition_reason(pending.from, pending.to),
        };
        info!(
            document_id = pending.document_id,
            from = %pending.from,
            to = %pending.to,
            "status change confirmed"
        );
        self.backend
            .change_status(pending.document_id, &change)
            .await?;
        self.reload_after_commit().await;
        Ok(pending)
    }

    /// Drop the pending transition without any request.
    pub fn cancel(&mut self) -> Option<PendingTransition> {
        match std::mem::replace(&mut self.drag, DragState::Idle) {
            DragState::AwaitingConfirmation(pending) => Some(pending),
            _ => None,
        }
    }

    pub fn request_delete(&mut self, document_id: i64) -> Result<PendingDeletion, FlowError> {
        if self.pending_delete.is_some() {
            return Err(FlowError::Busy);
        }
        let (status, doc) = self
            .find(document_id)
            .ok_or(FlowError::UnknownDocument(document_id))?;
        let pending = PendingDeletion {
            document_id,
            document_name: doc.display_name().to_string(),
            status,
        };
        self.pending_delete = Some(pending.clone());
        Ok(pending)
    }

    pub async fn confirm_delete(&mut self) -> Result<PendingDeletion, FlowError> {
        let pending = self.pending_delete.take().ok_or(FlowError::NothingPending)?;
        self.backend.delete_document(pending.document_id).await?;
        self.reload_after_commit().await;
        Ok(pending)
    }

    async fn reload_after_commit(&mut self) {
        if let Err(e) = self.load().await {
            warn!(error = %e, "change committed but board reload failed");
        }
    }

    pub fn cancel_delete(&mut self) -> Option<PendingDeletion> {
        self.pending_delete.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeBackend, doc};

    fn seeded() -> Arc<FakeBackend> {
        let backend = FakeBackend::default();
        {
            let mut state = backend.lock();
            state.documents = vec![
                (WorkflowStatus::Draft, doc(7, "VA Lenkung.pdf", "4.2")),
                (WorkflowStatus::Draft, doc(8, "AA Wareneingang.pdf", "7.4")),
                (WorkflowStatus::Reviewed, doc(9, "FB Audit.pdf", "9.2")),
                (WorkflowStatus::Approved, doc(10, "QM-Handbuch.pdf", "10")),
            ];
        }
        Arc::new(backend)
    }

    async fn loaded() -> (Arc<FakeBackend>, WorkflowBoard<FakeBackend>) {
        let backend = seeded();
        let mut board = WorkflowBoard::new(Arc::clone(&backend));
        board.load().await.unwrap();
        backend.lock().calls.clear();
        (backend, board)
    }

    #[tokio::test]
    async fn load_fills_each_column() {
        let (_, board) = loaded().await;
        assert_eq!(board.bucket(WorkflowStatus::Draft).len(), 2);
        assert_eq!(board.bucket(WorkflowStatus::Reviewed).len(), 1);
        assert_eq!(board.bucket(WorkflowStatus::Approved).len(), 1);
        assert!(board.bucket(WorkflowStatus::Rejected).is_empty());
        assert!(board.error().is_none());
    }

    #[tokio::test]
    async fn load_issues_one_request_per_status() {
        let backend = seeded();
        let mut board = WorkflowBoard::new(Arc::clone(&backend));
        board.load().await.unwrap();
        let calls = backend.lock().calls.clone();
        assert_eq!(
            calls,
            vec![
                "list:draft",
                "list:reviewed",
                "list:approved",
                "list:rejected"
            ]
        );
    }

    #[tokio::test]
    async fn duplicate_across_columns_shown_once() {
        let backend = seeded();
        backend
            .lock()
            .documents
            .push((WorkflowStatus::Rejected, doc(8, "AA Wareneingang.pdf", "7.4")));
        let mut board = WorkflowBoard::new(Arc::clone(&backend));
        board.load().await.unwrap();

        assert_eq!(board.total(), 4);
        assert!(board.bucket(WorkflowStatus::Rejected).is_empty());
        assert_eq!(board.find(8).unwrap().0, WorkflowStatus::Draft);
    }

    #[tokio::test]
    async fn failed_column_fails_whole_page() {
        let (backend, mut board) = loaded().await;
        backend.lock().failing.insert("list:approved");

        assert!(board.load().await.is_err());
        assert_eq!(board.total(), 0);
        assert_eq!(board.error(), Some(LOAD_ERROR_MESSAGE));
    }

    #[tokio::test]
    async fn unauthorized_load_reports_session_expiry() {
        let (backend, mut board) = loaded().await;
        backend.lock().unauthorized = true;

        let err = board.load().await.unwrap_err();
        assert!(err.is_unauthorized());
        assert_ne!(board.error(), Some(LOAD_ERROR_MESSAGE));
    }

    #[tokio::test]
    async fn drag_to_other_column_then_confirm() {
        let (backend, mut board) = loaded().await;

        board.start_drag(7).unwrap();
        let outcome = board.drop_on(WorkflowStatus::Approved);
        let DropOutcome::ConfirmationRequired(pending) = outcome else {
            panic!("expected confirmation, got {outcome:?}");
        };
        assert_eq!(pending.from, WorkflowStatus::Draft);
        assert_eq!(pending.to, WorkflowStatus::Approved);
        assert!(pending.prompt().contains("Entwurf"));
        assert!(pending.prompt().contains("Freigegeben"));
        assert!(backend.lock().status_changes.is_empty());

        board.confirm().await.unwrap();

        let state = backend.lock();
        assert_eq!(state.status_changes.len(), 1);
        let (id, change) = &state.status_changes[0];
        assert_eq!(*id, 7);
        assert_eq!(change.new_status, WorkflowStatus::Approved);
        assert!(!change.reason.is_empty());
        assert_eq!(
            state.calls,
            vec![
                "change_status:7",
                "list:draft",
                "list:reviewed",
                "list:approved",
                "list:rejected"
            ]
        );
        drop(state);

        assert_eq!(board.find(7).unwrap().0, WorkflowStatus::Approved);
        assert_eq!(board.drag_state(), &DragState::Idle);
    }

    #[tokio::test]
    async fn committed_change_survives_failed_reload() {
        let (backend, mut board) = loaded().await;
        board
            .request_transition(7, WorkflowStatus::Reviewed)
            .unwrap();
        backend.lock().failing.insert("list:reviewed");

        let done = board.confirm().await.unwrap();
        assert_eq!(done.to, WorkflowStatus::Reviewed);
        assert_eq!(backend.lock().status_changes.len(), 1);
        assert_eq!(board.error(), Some(LOAD_ERROR_MESSAGE));
        assert_eq!(board.total(), 0);
        assert_eq!(board.drag_state(), &DragState::Idle);
    }

    #[tokio::test]
    async fn drop_on_same_column_is_noop() {
        let (backend, mut board) = loaded().await;

        board.start_drag(9).unwrap();
        assert_eq!(board.drop_on(WorkflowStatus::Reviewed), DropOutcome::SameBucket);
        assert_eq!(board.drag_state(), &DragState::Idle);
        assert!(matches!(board.confirm().await, Err(FlowError::NothingPending)));
        assert!(backend.lock().calls.is_empty());
    }

    #[tokio::test]
    async fn cancel_leaves_document_in_place() {
        let (backend, mut board) = loaded().await;

        board.request_transition(8, WorkflowStatus::Rejected).unwrap();
        let cancelled = board.cancel().unwrap();
        assert_eq!(cancelled.document_id, 8);

        assert_eq!(board.find(8).unwrap().0, WorkflowStatus::Draft);
        assert_eq!(board.drag_state(), &DragState::Idle);
        assert!(backend.lock().calls.is_empty());
    }

    #[tokio::test]
    async fn drop_without_drag_is_ignored() {
        let (_, mut board) = loaded().await;
        assert_eq!(board.drop_on(WorkflowStatus::Draft), DropOutcome::NotDragging);
    }

    #[tokio::test]
    async fn drag_end_without_drop_resets() {
        let (_, mut board) = loaded().await;
        board.start_drag(7).unwrap();
        board.drag_end();
        assert_eq!(board.drag_state(), &DragState::Idle);
    }

    #[tokio::test]
    async fn new_drag_blocked_while_confirmation_open() {
        let (_, mut board) = loaded().await;
        board.request_transition(7, WorkflowStatus::Reviewed).unwrap();
        assert!(matches!(board.start_drag(8), Err(FlowError::Busy)));
        board.drag_end();
        assert!(matches!(board.drag_state(), DragState::AwaitingConfirmation(_)));
    }

    #[tokio::test]
    async fn unknown_document_rejected() {
        let (_, mut board) = loaded().await;
        assert!(matches!(board.start_drag(99), Err(FlowError::UnknownDocument(99))));
    }

    #[tokio::test]
    async fn failed_status_change_keeps_columns() {
        let (backend, mut board) = loaded().await;
        backend.lock().failing.insert("change_status");

        board.request_transition(7, WorkflowStatus::Approved).unwrap();
        let err = board.confirm().await.unwrap_err();

        assert_eq!(err.user_message(), "change_status failed");
        assert_eq!(board.find(7).unwrap().0, WorkflowStatus::Draft);
        assert_eq!(board.drag_state(), &DragState::Idle);
        assert_eq!(backend.lock().calls, vec!["change_status:7"]);
    }

    #[tokio::test]
    async fn delete_requires_confirmation() {
        let (backend, mut board) = loaded().await;

        let pending = board.request_delete(9).unwrap();
        assert_eq!(pending.status, WorkflowStatus::Reviewed);
        assert!(backend.lock().calls.is_empty());

        board.confirm_delete().await.unwrap();
        assert!(board.find(9).is_none());
        assert_eq!(backend.lock().calls[0], "delete:9");
    }

    #[tokio::test]
    async fn cancelled_delete_sends_nothing() {
        let (backend, mut board) = loaded().await;
        board.request_delete(9).unwrap();
        assert!(board.cancel_delete().is_some());
        assert!(matches!(
            board.confirm_delete().await,
            Err(FlowError::NothingPending)
        ));
        assert!(backend.lock().calls.is_empty());
        assert!(board.find(9).is_some());
    }

    #[tokio::test]
    async fn filters_do_not_fetch() {
        let (backend, board) = loaded().await;
        let filter = BoardFilter {
            search: "wareneingang".into(),
            ..Default::default()
        };
        let hits = board.visible(WorkflowStatus::Draft, &filter);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, 8);
        assert!(backend.lock().calls.is_empty());
    }

    #[tokio::test]
    async fn filter_by_chapter_and_type() {
        let (_, board) = loaded().await;
        let by_chapter = BoardFilter {
            search: "7.4".into(),
            ..Default::default()
        };
        assert_eq!(board.visible(WorkflowStatus::Draft, &by_chapter).len(), 1);

        let by_type = BoardFilter {
            document_type_id: Some(2),
            ..Default::default()
        };
        assert!(board.visible(WorkflowStatus::Draft, &by_type).is_empty());
    }

    #[tokio::test]
    async fn chapter_order() {
        let backend = seeded();
        backend
            .lock()
            .documents
            .push((WorkflowStatus::Draft, doc(11, "VA Kontext.pdf", "1")));
        let mut board = WorkflowBoard::new(Arc::clone(&backend));
        board.load().await.unwrap();

        let filter = BoardFilter {
            order: BoardOrder::Chapter,
            ..Default::default()
        };
        let ids: Vec<i64> = board
            .visible(WorkflowStatus::Draft, &filter)
            .iter()
            .map(|d| d.id)
            .collect();
        assert_eq!(ids, vec![11, 7, 8]);

        let server: Vec<i64> = board
            .visible(WorkflowStatus::Draft, &BoardFilter::default())
            .iter()
            .map(|d| d.id)
            .collect();
        assert_eq!(server, vec![7, 8, 11]);
    }
}
