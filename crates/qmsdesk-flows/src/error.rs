use qmsdesk_api::ApiError;
use qmsdesk_core::ValidationError;
use thiserror::Error;

use crate::UploadError;

#[derive(Debug, Error)]
pub enum FlowError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error("no chat session selected")]
    NoSessionSelected,

    #[error("unknown chat session {0}")]
    UnknownSession(i64),

    #[error("unknown document {0}")]
    UnknownDocument(i64),

    #[error("nothing is awaiting confirmation")]
    NothingPending,

    #[error("another action is still pending")]
    Busy,
}

impl FlowError {
    pub fn is_unauthorized(&self) -> bool {
        match self {
            FlowError::Api(e) => e.is_unauthorized(),
            FlowError::Upload(e) => e.source.is_unauthorized(),
            _ => false,
        }
    }

    /// Text for the blocking alert shown to the operator.
    pub fn user_message(&self) -> String {
        match self {
            FlowError::Api(e) => e.user_message(),
            FlowError::Validation(e) => e.to_string(),
            FlowError::Upload(e) => format!("{}: {}", e.step, e.source.user_message()),
            FlowError::NoSessionSelected => "Bitte zuerst eine Chat-Sitzung auswählen.".into(),
            FlowError::UnknownSession(id) => format!("Chat-Sitzung {id} existiert nicht."),
            FlowError::UnknownDocument(id) => format!("Dokument {id} ist nicht geladen."),
            FlowError::NothingPending => "Keine Aktion zu bestätigen.".into(),
            FlowError::Busy => "Bitte zuerst die laufende Aktion abschließen.".into(),
        }
    }
}
