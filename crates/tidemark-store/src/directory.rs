//! Directory-backed message store
//!
//! Layout:
//!
//! ```text
//! <root>/
//!   <mailbox>/
//!     <message-id>      file modification time is the message date
//! ```
//!
//! Entries whose names start with `.` are ignored, as are non-directory
//! entries at the root and non-file entries inside a mailbox.

use crate::StoreError;
use std::fs::{self, File};
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tidemark_domain::{Mailbox, MessageStore, StoredMessage};

/// Message store rooted at a directory on disk
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    /// Open a store rooted at `root`, creating the directory if missing
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self, StoreError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Root directory of the store
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write a message file and stamp it with `date`
    ///
    /// Creates the mailbox directory if it does not exist yet.
    pub fn deliver(
        &self,
        mailbox: &str,
        id: &str,
        body: &[u8],
        date: SystemTime,
    ) -> Result<PathBuf, StoreError> {
        validate_name(mailbox)?;
        validate_name(id)?;

        let dir = self.root.join(mailbox);
        fs::create_dir_all(&dir)?;

        let path = dir.join(id);
        let mut file = File::create(&path)?;
        file.write_all(body)?;
        file.set_modified(date)?;

        Ok(path)
    }
}

fn validate_name(name: &str) -> Result<(), StoreError> {
    if name.is_empty()
        || name.starts_with('.')
        || name.contains(['/', '\\'])
    {
        return Err(StoreError::InvalidName(name.to_string()));
    }
    Ok(())
}

fn is_hidden(name: &str) -> bool {
    name.starts_with('.')
}

/// `Ok(None)` for an entry deleted out from under the listing
fn skip_vanished<T>(result: io::Result<T>) -> Result<Option<T>, StoreError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

impl MessageStore for DirectoryStore {
    type Error = StoreError;
    type Mailbox = DirectoryMailbox;

    fn mailboxes(&self) -> Result<Vec<DirectoryMailbox>, StoreError> {
        let mut mailboxes = Vec::new();

        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let Ok(name) = entry.file_name().into_string() else {
                tracing::debug!(path = ?entry.path(), "Skipping non UTF-8 mailbox directory");
                continue;
            };
            if is_hidden(&name) || !entry.file_type()?.is_dir() {
                continue;
            }
            mailboxes.push(DirectoryMailbox {
                name,
                path: entry.path(),
            });
        }

        mailboxes.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(mailboxes)
    }
}

/// Mailbox handle from a [`DirectoryStore`]
#[derive(Debug, Clone)]
pub struct DirectoryMailbox {
    name: String,
    path: PathBuf,
}

impl Mailbox for DirectoryMailbox {
    type Error = StoreError;
    type Message = DirectoryMessage;

    fn name(&self) -> &str {
        &self.name
    }

    fn messages(&self) -> Result<Vec<DirectoryMessage>, StoreError> {
        // A mailbox removed after it was listed simply has nothing left
        let entries = match fs::read_dir(&self.path) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(mailbox = %self.name, "Mailbox vanished before listing");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        let mut messages = Vec::new();
        for entry in entries {
            let entry = entry?;
            let Ok(id) = entry.file_name().into_string() else {
                tracing::debug!(path = ?entry.path(), "Skipping non UTF-8 message file");
                continue;
            };
            if is_hidden(&id) {
                continue;
            }
            let Some(metadata) = skip_vanished(entry.metadata())? else {
                continue;
            };
            if !metadata.is_file() {
                continue;
            }
            let Some(date) = skip_vanished(metadata.modified())? else {
                continue;
            };
            messages.push(DirectoryMessage {
                id,
                date,
                path: entry.path(),
            });
        }

        messages.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.id.cmp(&b.id)));
        Ok(messages)
    }
}

/// Message handle from a [`DirectoryMailbox`]
#[derive(Debug, Clone)]
pub struct DirectoryMessage {
    id: String,
    date: SystemTime,
    path: PathBuf,
}

impl StoredMessage for DirectoryMessage {
    type Error = StoreError;

    fn id(&self) -> &str {
        &self.id
    }

    fn date(&self) -> SystemTime {
        self.date
    }

    fn delete(&self) -> Result<(), StoreError> {
        fs::remove_file(&self.path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => StoreError::MessageNotFound(self.id.clone()),
            _ => StoreError::Io(e),
        })
    }
}
