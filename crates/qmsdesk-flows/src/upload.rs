//! Upload sequence: upload -> generate preview -> assign interest groups.
//!
//! Each step runs only after the previous one succeeded. If a later step
//! fails, the document created by the upload step is deleted again so no
//! half-configured document is left on the server.

use std::fmt;
use std::sync::Arc;

use qmsdesk_api::{ApiError, DocumentBackend};
use qmsdesk_core::{UploadFile, UploadMetadata, UploadedDocument};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::FlowError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadStep {
    Upload,
    Preview,
    AssignGroups,
}

impl fmt::Display for UploadStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            UploadStep::Upload => "Hochladen",
            UploadStep::Preview => "Vorschau erzeugen",
            UploadStep::AssignGroups => "Interessengruppen zuordnen",
        })
    }
}

/// What happened to the already uploaded document after a later step failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compensation {
    /// The upload itself failed; nothing exists server-side.
    NotNeeded,
    Deleted { document_id: i64 },
    /// Deleting failed too; the document is left orphaned.
    Failed { document_id: i64 },
}

#[derive(Debug, Error)]
#[error("{step} fehlgeschlagen: {source}")]
pub struct UploadError {
    pub step: UploadStep,
    pub source: ApiError,
    pub compensation: Compensation,
}

pub struct UploadFlow<B> {
    backend: Arc<B>,
}

impl<B: DocumentBackend> UploadFlow<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self { backend }
    }

    /// Validate, then run the three steps in order.
    pub async fn run(
        &self,
        file: &UploadFile,
        metadata: &UploadMetadata,
    ) -> Result<UploadedDocument, FlowError> {
        file.validate()?;
        metadata.validate()?;

        let document = self
            .backend
            .upload_document(file, metadata)
            .await
            .map_err(|source| UploadError {
                step: UploadStep::Upload,
                source,
                compensation: Compensation::NotNeeded,
            })?;
        info!(document_id = document.id, file_name = %file.file_name, "document uploaded");

        if let Err(source) = self.backend.generate_preview(document.id).await {
            return Err(self.abort(UploadStep::Preview, source, document.id).await);
        }

        if let Err(source) = self
            .backend
            .assign_interest_groups(document.id, &metadata.interest_group_ids)
            .await
        {
            return Err(self.abort(UploadStep::AssignGroups, source, document.id).await);
        }

        info!(
            document_id = document.id,
            groups = metadata.interest_group_ids.len(),
            "upload complete"
        );
        Ok(document)
    }

    async fn abort(&self, step: UploadStep, source: ApiError, document_id: i64) -> FlowError {
        warn!(document_id, step = %step, error = %source, "upload step failed, removing document");
        let compensation = match self.backend.delete_document(document_id).await {
            Ok(()) => Compensation::Deleted { document_id },
            Err(e) => {
                error!(document_id, error = %e, "could not remove partially uploaded document");
                Compensation::Failed { document_id }
            }
        };
        UploadError {
            step,
            source,
            compensation,
        }
        .into()
    }
}
