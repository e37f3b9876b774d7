//! Integration tests for tidemark-store
//!
//! Both backends must behave the same way through the domain traits.

use std::time::{Duration, SystemTime};
use tempfile::TempDir;
use tidemark_domain::{Mailbox, MessageStore, StoredMessage};
use tidemark_store::{DirectoryStore, MemoryStore};

const DAY: Duration = Duration::from_secs(86_400);

/// Delete every message older than `max_age` and return the ids removed
fn purge<S: MessageStore>(store: &S, max_age: Duration) -> Vec<String> {
    let cutoff = SystemTime::now() - max_age;
    let mut removed = Vec::new();
    for mailbox in store.mailboxes().unwrap() {
        for message in mailbox.messages().unwrap() {
            if message.date() < cutoff {
                message.delete().unwrap();
                removed.push(message.id().to_string());
            }
        }
    }
    removed.sort();
    removed
}

#[test]
fn test_memory_store_purge() {
    let store = MemoryStore::new();
    let now = SystemTime::now();
    store.deliver("a", "a-old", now - 40 * DAY);
    store.deliver("a", "a-new", now - DAY);
    store.deliver("b", "b-old", now - 100 * DAY);

    assert_eq!(purge(&store, 30 * DAY), vec!["a-old", "b-old"]);
    assert_eq!(store.message_count(), 1);
    assert!(store.contains("a", "a-new"));
}

#[test]
fn test_directory_store_purge() {
    let dir = TempDir::new().unwrap();
    let store = DirectoryStore::open(dir.path()).unwrap();
    let now = SystemTime::now();
    store.deliver("a", "a-old", b"old", now - 40 * DAY).unwrap();
    store.deliver("a", "a-new", b"new", now - DAY).unwrap();
    store.deliver("b", "b-old", b"older", now - 100 * DAY).unwrap();

    assert_eq!(purge(&store, 30 * DAY), vec!["a-old", "b-old"]);
    assert!(!dir.path().join("a").join("a-old").exists());
    assert!(dir.path().join("a").join("a-new").exists());

    // Emptied mailboxes stay listed
    let mailboxes = store.mailboxes().unwrap();
    assert_eq!(mailboxes.len(), 2);
    assert!(mailboxes[1].messages().unwrap().is_empty());
}

#[test]
fn test_directory_store_reopen() {
    let dir = TempDir::new().unwrap();
    {
        let store = DirectoryStore::open(dir.path()).unwrap();
        store.deliver("alice", "m1", b"x", SystemTime::now()).unwrap();
    }

    let store = DirectoryStore::open(dir.path()).unwrap();
    assert_eq!(store.root(), dir.path());
    let mailboxes = store.mailboxes().unwrap();
    assert_eq!(mailboxes[0].name(), "alice");
    assert_eq!(mailboxes[0].messages().unwrap()[0].id(), "m1");
}

#[test]
fn test_directory_mailbox_removed_after_listing() {
    let dir = TempDir::new().unwrap();
    let store = DirectoryStore::open(dir.path()).unwrap();
    store.deliver("a", "a1", b"x", SystemTime::now()).unwrap();
    store.deliver("b", "b1", b"x", SystemTime::now()).unwrap();

    let mailboxes = store.mailboxes().unwrap();
    std::fs::remove_dir_all(dir.path().join("b")).unwrap();

    assert_eq!(mailboxes[0].messages().unwrap().len(), 1);
    assert!(mailboxes[1].messages().unwrap().is_empty());
}
