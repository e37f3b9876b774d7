//! Error types for retention operations

use thiserror::Error;

/// Errors that can occur during retention scanning
#[derive(Error, Debug)]
pub enum RetentionError {
    /// Storage layer error while enumerating mailboxes or messages
    #[error("Storage error: {0}")]
    Store(String),

    /// The scanner was started a second time
    #[error("Retention scanner already started")]
    AlreadyStarted,
}
