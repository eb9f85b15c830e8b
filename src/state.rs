//! # Session record
//!
//! The flat JSON record that ties an editing session to its remote resources:
//!
//! ```json
//! {
//!     "assistant_id": "asst_...",
//!     "thread_id": "thread_...",
//!     "vector_store_id": "vs_...",
//!     "doc_dir": "/home/me/notes"
//! }
//! ```
//!
//! An empty string means the resource has not been created yet. The record is
//! written atomically: the new content goes to a temporary file in the same
//! directory, which is then renamed over `config.json`. There is no locking, so
//! two processes doing read-modify-write at once can still lose an update.

use serde::{Deserialize, Serialize};
use std::{
    error::Error,
    fs,
    io::Write,
    path::{Path, PathBuf},
};
use tempfile::NamedTempFile;
use tracing::debug;

/// File name of the record inside the state directory.
pub const STATE_FILE_NAME: &str = "config.json";

/// Identifiers of the remote resources used by one editing session.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct SessionState {
    pub assistant_id: String,
    pub thread_id: String,
    pub vector_store_id: String,
    pub doc_dir: String,
}

impl SessionState {
    pub fn has_assistant(&self) -> bool {
        !self.assistant_id.is_empty()
    }

    pub fn has_thread(&self) -> bool {
        !self.thread_id.is_empty()
    }

    pub fn has_vector_store(&self) -> bool {
        !self.vector_store_id.is_empty()
    }

    /// Whether `path` is the directory currently mirrored into the knowledge base.
    pub fn is_doc_dir(&self, path: &str) -> bool {
        !self.doc_dir.is_empty() && self.doc_dir == path
    }
}

/// Reads and writes the [`SessionState`] file.
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    /// A store for `<dir>/config.json`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        StateStore {
            path: dir.as_ref().join(STATE_FILE_NAME),
        }
    }

    /// A store for an explicit file path.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        StateStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Write an empty record, replacing whatever was there.
    pub fn create(&self) -> Result<SessionState, Box<dyn Error>> {
        let state = SessionState::default();
        self.save(&state)?;
        Ok(state)
    }

    pub fn load(&self) -> Result<SessionState, Box<dyn Error>> {
        let content = fs::read_to_string(&self.path)
            .map_err(|e| format!("Failed to read {}: {e}", self.path.display()))?;
        let state: SessionState = serde_json::from_str(&content)?;
        Ok(state)
    }

    /// Load the record, creating an empty one first if the file does not exist.
    pub fn load_or_create(&self) -> Result<SessionState, Box<dyn Error>> {
        if self.exists() {
            self.load()
        } else {
            debug!("Creating session record at {}", self.path.display());
            self.create()
        }
    }

    /// Atomically replace the record with `state`.
    pub fn save(&self, state: &SessionState) -> Result<(), Box<dyn Error>> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;

        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
        state.serialize(&mut serializer)?;

        let mut temp = NamedTempFile::new_in(&dir)?;
        temp.write_all(&buf)?;
        temp.as_file().sync_all()?;
        temp.persist(&self.path)?;

        debug!("Saved session record {:?} to {}", state, self.path.display());
        Ok(())
    }
}
