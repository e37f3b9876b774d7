//! In-memory message store
//!
//! Mailboxes live in a shared map guarded by a mutex. Handles returned from
//! the store keep a reference to that map, so a delete through a message
//! handle is visible to every later listing.

use crate::StoreError;
use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::SystemTime;
use tidemark_domain::{Mailbox, MessageStore, StoredMessage};

#[derive(Debug, Clone)]
struct Entry {
    id: String,
    date: SystemTime,
}

#[derive(Debug, Default)]
struct Inner {
    mailboxes: BTreeMap<String, Vec<Entry>>,
    deleted: Vec<String>,
    fail_mailbox_listing: bool,
    failing_listings: HashSet<String>,
    failing_deletes: HashSet<String>,
}

/// Message store held entirely in memory
///
/// Cloning a `MemoryStore` yields another handle onto the same mailboxes.
///
/// The fault hooks ([`fail_mailbox_listing`](Self::fail_mailbox_listing),
/// [`fail_message_listing`](Self::fail_message_listing) and
/// [`fail_delete`](Self::fail_delete)) make the corresponding operation
/// return [`StoreError::Injected`] until cleared.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        lock_inner(&self.inner)
    }

    /// Add a message to a mailbox, creating the mailbox if needed
    pub fn deliver(&self, mailbox: &str, id: &str, date: SystemTime) {
        self.lock()
            .mailboxes
            .entry(mailbox.to_string())
            .or_default()
            .push(Entry {
                id: id.to_string(),
                date,
            });
    }

    /// Create an empty mailbox
    pub fn create_mailbox(&self, mailbox: &str) {
        self.lock().mailboxes.entry(mailbox.to_string()).or_default();
    }

    /// Whether a message is still present in a mailbox
    pub fn contains(&self, mailbox: &str, id: &str) -> bool {
        self.lock()
            .mailboxes
            .get(mailbox)
            .is_some_and(|entries| entries.iter().any(|e| e.id == id))
    }

    /// Number of messages across all mailboxes
    pub fn message_count(&self) -> usize {
        self.lock().mailboxes.values().map(Vec::len).sum()
    }

    /// Ids of every message deleted so far, in deletion order
    pub fn deleted_ids(&self) -> Vec<String> {
        self.lock().deleted.clone()
    }

    /// Make `mailboxes()` fail (or stop failing)
    pub fn fail_mailbox_listing(&self, fail: bool) {
        self.lock().fail_mailbox_listing = fail;
    }

    /// Make `messages()` fail for the named mailbox
    pub fn fail_message_listing(&self, mailbox: &str) {
        self.lock().failing_listings.insert(mailbox.to_string());
    }

    /// Make `delete()` fail for the given message id
    pub fn fail_delete(&self, id: &str) {
        self.lock().failing_deletes.insert(id.to_string());
    }

    /// Clear every injected failure
    pub fn clear_faults(&self) {
        let mut inner = self.lock();
        inner.fail_mailbox_listing = false;
        inner.failing_listings.clear();
        inner.failing_deletes.clear();
    }
}

fn lock_inner(inner: &Mutex<Inner>) -> MutexGuard<'_, Inner> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MessageStore for MemoryStore {
    type Error = StoreError;
    type Mailbox = MemoryMailbox;

    fn mailboxes(&self) -> Result<Vec<MemoryMailbox>, StoreError> {
        let inner = self.lock();
        if inner.fail_mailbox_listing {
            return Err(StoreError::Injected("mailbox listing".to_string()));
        }

        Ok(inner
            .mailboxes
            .keys()
            .map(|name| MemoryMailbox {
                name: name.clone(),
                inner: Arc::clone(&self.inner),
            })
            .collect())
    }
}

/// Mailbox handle from a [`MemoryStore`]
#[derive(Debug, Clone)]
pub struct MemoryMailbox {
    name: String,
    inner: Arc<Mutex<Inner>>,
}

impl Mailbox for MemoryMailbox {
    type Error = StoreError;
    type Message = MemoryMessage;

    fn name(&self) -> &str {
        &self.name
    }

    fn messages(&self) -> Result<Vec<MemoryMessage>, StoreError> {
        let inner = lock_inner(&self.inner);
        if inner.failing_listings.contains(&self.name) {
            return Err(StoreError::Injected(format!(
                "message listing for {}",
                self.name
            )));
        }

        let entries = inner
            .mailboxes
            .get(&self.name)
            .ok_or_else(|| StoreError::MailboxNotFound(self.name.clone()))?;

        Ok(entries
            .iter()
            .map(|entry| MemoryMessage {
                mailbox: self.name.clone(),
                id: entry.id.clone(),
                date: entry.date,
                inner: Arc::clone(&self.inner),
            })
            .collect())
    }
}

/// Message handle from a [`MemoryMailbox`]
#[derive(Debug, Clone)]
pub struct MemoryMessage {
    mailbox: String,
    id: String,
    date: SystemTime,
    inner: Arc<Mutex<Inner>>,
}

impl StoredMessage for MemoryMessage {
    type Error = StoreError;

    fn id(&self) -> &str {
        &self.id
    }

    fn date(&self) -> SystemTime {
        self.date
    }

    fn delete(&self) -> Result<(), StoreError> {
        let mut inner = lock_inner(&self.inner);
        if inner.failing_deletes.contains(&self.id) {
            return Err(StoreError::Injected(format!("delete of {}", self.id)));
        }

        let entries = inner
            .mailboxes
            .get_mut(&self.mailbox)
            .ok_or_else(|| StoreError::MailboxNotFound(self.mailbox.clone()))?;
        let position = entries
            .iter()
            .position(|e| e.id == self.id)
            .ok_or_else(|| StoreError::MessageNotFound(self.id.clone()))?;
        entries.remove(position);
        inner.deleted.push(self.id.clone());

        Ok(())
    }
}
