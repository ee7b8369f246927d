//! Document type and interest group administration.

use std::collections::HashMap;
use std::sync::Arc;

use qmsdesk_api::CatalogBackend;
use qmsdesk_core::{CatalogDraft, DocumentType, InterestGroup};
use tracing::info;

use crate::FlowError;

pub struct Catalog<B> {
    backend: Arc<B>,
}

impl<B: CatalogBackend> Catalog<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self { backend }
    }

    pub async fn document_types(&self) -> Result<Vec<DocumentType>, FlowError> {
        Ok(self.backend.list_document_types().await?)
    }

    /// id -> name, for labelling documents on the board.
    pub async fn document_type_names(&self) -> Result<HashMap<i64, String>, FlowError> {
        Ok(self
            .document_types()
            .await?
            .into_iter()
            .map(|t| (t.id, t.name))
            .collect())
    }

    /// Create a document type after checking its code against the current list.
    pub async fn create_document_type(
        &self,
        draft: &CatalogDraft,
    ) -> Result<DocumentType, FlowError> {
        let existing = self.backend.list_document_types().await?;
        draft.validate(existing.iter().map(|t| t.code.as_str()))?;
        let created = self.backend.create_document_type(draft).await?;
        info!(id = created.id, code = %created.code, "document type created");
        Ok(created)
    }

    pub async fn delete_document_type(&self, id: i64) -> Result<(), FlowError> {
        Ok(self.backend.delete_document_type(id).await?)
    }

    pub async fn interest_groups(&self) -> Result<Vec<InterestGroup>, FlowError> {
        Ok(self.backend.list_interest_groups().await?)
    }

    pub async fn create_interest_group(
        &self,
        draft: &CatalogDraft,
    ) -> Result<InterestGroup, FlowError> {
        let existing = self.backend.list_interest_groups().await?;
        draft.validate(existing.iter().map(|g| g.code.as_str()))?;
        let created = self.backend.create_interest_group(draft).await?;
        info!(id = created.id, code = %created.code, "interest group created");
        Ok(created)
    }

    pub async fn delete_interest_group(&self, id: i64) -> Result<(), FlowError> {
        Ok(self.backend.delete_interest_group(id).await?)
    }
}
