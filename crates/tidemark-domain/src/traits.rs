//! Trait definitions for external interactions
//!
//! These traits define the boundary between the retention sweeper and
//! whatever actually holds the mail. Implementations live in other crates.

use std::fmt;
use std::time::SystemTime;

/// A store of mailboxes that can be enumerated
///
/// Implemented by the infrastructure layer (tidemark-store).
///
/// The store is shared with a background task, so it must be `Send + Sync`.
/// A single error type flows through the store, its mailboxes and their
/// messages.
pub trait MessageStore: Send + Sync {
    /// Error type for store operations
    type Error: fmt::Display + fmt::Debug + Send + Sync + 'static;

    /// Handle to a single mailbox in this store
    type Mailbox: Mailbox<Error = Self::Error>;

    /// List every mailbox currently in the store
    fn mailboxes(&self) -> Result<Vec<Self::Mailbox>, Self::Error>;
}

/// A mailbox handle returned by [`MessageStore::mailboxes`]
pub trait Mailbox: Send {
    /// Error type for mailbox operations
    type Error: fmt::Display + fmt::Debug;

    /// Handle to a single message in this mailbox
    type Message: StoredMessage<Error = Self::Error>;

    /// Mailbox name, used for logging
    fn name(&self) -> &str;

    /// List the messages currently held in this mailbox
    fn messages(&self) -> Result<Vec<Self::Message>, Self::Error>;
}

/// A message handle returned by [`Mailbox::messages`]
pub trait StoredMessage: Send {
    /// Error type for message operations
    type Error: fmt::Display + fmt::Debug;

    /// Store-assigned identifier
    fn id(&self) -> &str;

    /// The instant used to determine the message's age
    fn date(&self) -> SystemTime;

    /// Remove the message from its mailbox
    ///
    /// Each delete may fail independently of every other message.
    fn delete(&self) -> Result<(), Self::Error>;
}
