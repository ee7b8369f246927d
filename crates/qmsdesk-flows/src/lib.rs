//! Client-side state machines: the document workflow board, the RAG chat
//! session lifecycle, and the three-step upload sequence.

pub mod board;
pub mod catalog;
pub mod chat;
mod error;
pub mod upload;
mod workspace;

#[cfg(test)]
mod testing;

pub use board::{
    BoardFilter, BoardOrder, DragState, DropOutcome, PendingDeletion, PendingTransition,
    WorkflowBoard,
};
pub use catalog::Catalog;
pub use chat::{CHAT_FALLBACK_MESSAGE, ChatController, ChatPhase, Notification};
pub use error::FlowError;
pub use upload::{Compensation, UploadError, UploadFlow, UploadStep};
pub use workspace::Workspace;
