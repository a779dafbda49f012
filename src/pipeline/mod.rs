//! Document question-answering pipeline.

pub mod service;
pub mod types;

pub use service::{RagService, STORE_SUCCESS_MESSAGE};
pub use types::{Answer, QueryError, StoreError};
