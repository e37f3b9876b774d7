//! Tidemark Storage Layer
//!
//! Implements the `MessageStore` trait for two backends:
//!
//! - [`MemoryStore`]: mailboxes held in process memory, with fault injection
//!   hooks for exercising the sweeper's error paths
//! - [`DirectoryStore`]: one directory per mailbox and one file per message,
//!   the file's modification time being the message date
//!
//! # Examples
//!
//! ```
//! use std::time::SystemTime;
//! use tidemark_domain::{Mailbox, MessageStore};
//! use tidemark_store::MemoryStore;
//!
//! let store = MemoryStore::new();
//! store.deliver("alice", "msg-1", SystemTime::now());
//!
//! let mailboxes = store.mailboxes().unwrap();
//! assert_eq!(mailboxes.len(), 1);
//! assert_eq!(mailboxes[0].messages().unwrap().len(), 1);
//! ```

#![warn(missing_docs)]

mod directory;
mod error;
mod memory;

pub use directory::{DirectoryMailbox, DirectoryMessage, DirectoryStore};
pub use error::StoreError;
pub use memory::{MemoryMailbox, MemoryMessage, MemoryStore};
