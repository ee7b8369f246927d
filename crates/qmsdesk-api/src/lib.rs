//! Backend access: async traits the flows are written against, and the
//! reqwest implementation talking to the QMS API.

mod backend;
mod error;

pub use backend::{CatalogBackend, ChatBackend, DocumentBackend};
pub use error::{ApiError, GENERIC_ERROR_MESSAGE, extract_error_message};

#[cfg(feature = "http")]
pub mod http;

#[cfg(feature = "http")]
pub use http::{ApiClient, LoginResponse};
