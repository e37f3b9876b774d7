//! Tidemark Domain Layer
//!
//! Core vocabulary shared by every other Tidemark crate. It has ZERO
//! external dependencies and defines the value objects and trait interfaces
//! that the storage adapters and the retention sweeper meet at.
//!
//! ## Key Concepts
//!
//! - **Mailbox**: A named container of messages, enumerated from a store
//! - **Message**: An opaque stored item with an id, a date and a delete capability
//! - **Cutoff**: The fixed instant below which a message counts as expired
//!
//! ## Architecture
//!
//! - No external crate dependencies
//! - Storage implementations live in `tidemark-store`
//! - The sweeper in `tidemark-retention` only sees the traits defined here

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cutoff;
pub mod traits;

// Re-exports for convenience
pub use cutoff::Cutoff;
pub use traits::{Mailbox, MessageStore, StoredMessage};
