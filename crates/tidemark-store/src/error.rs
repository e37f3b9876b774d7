//! Error types for storage operations

use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Mailbox not found
    #[error("Mailbox not found: {0}")]
    MailboxNotFound(String),

    /// Message not found
    #[error("Message not found: {0}")]
    MessageNotFound(String),

    /// Invalid mailbox or message name
    #[error("Invalid name: {0}")]
    InvalidName(String),

    /// Failure injected through the memory store's fault hooks
    #[error("Injected failure: {0}")]
    Injected(String),
}
