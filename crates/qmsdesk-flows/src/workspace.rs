use std::sync::Arc;

use qmsdesk_api::{CatalogBackend, ChatBackend, DocumentBackend};
use qmsdesk_core::User;

use crate::{Catalog, ChatController, UploadFlow, WorkflowBoard};

/// Shared state handed to every view: one backend and the signed-in user.
///
/// Views get what they need from here instead of reaching for globals.
pub struct Workspace<B> {
    backend: Arc<B>,
    current_user: Option<User>,
}

impl<B> Workspace<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self {
            backend,
            current_user: None,
        }
    }

    pub fn with_user(mut self, user: User) -> Self {
        self.current_user = Some(user);
        self
    }

    pub fn current_user(&self) -> Option<&User> {
        self.current_user.as_ref()
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }
}

impl<B: DocumentBackend> Workspace<B> {
    pub fn board(&self) -> WorkflowBoard<B> {
        WorkflowBoard::new(Arc::clone(&self.backend))
    }

    pub fn uploader(&self) -> UploadFlow<B> {
        UploadFlow::new(Arc::clone(&self.backend))
    }
}

impl<B: ChatBackend> Workspace<B> {
    pub fn chat(&self) -> ChatController<B> {
        ChatController::new(Arc::clone(&self.backend))
    }
}

impl<B: CatalogBackend> Workspace<B> {
    pub fn catalog(&self) -> Catalog<B> {
        Catalog::new(Arc::clone(&self.backend))
    }
}
