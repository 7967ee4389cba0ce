use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

/// One message exchange unit. Serialized as `{"role": "...", "text": "..."}`,
/// the same shape the backend receives in the request history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub text: String,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self { role: Role::User, text: text.into() }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self { role: Role::Model, text: text.into() }
    }
}

/// Session-scoped ordered log of chat turns, persisted as a JSON array.
///
/// The whole sequence is rewritten on every append; the file is small and
/// this keeps the persisted state consistent after any single mutation.
pub struct HistoryStore {
    path: PathBuf,
    turns: Vec<Turn>,
}

impl HistoryStore {
    /// Create a store without touching the filesystem. The persisted
    /// session, if any, is picked up by `reload` when the widget opens.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), turns: Vec::new() }
    }

    /// Replace the in-memory sequence with whatever is persisted.
    /// A missing or malformed file yields an empty sequence; a malformed
    /// file is overwritten by the next append.
    pub fn reload(&mut self) {
        self.turns = Self::read_turns(&self.path);
    }

    fn read_turns(path: &Path) -> Vec<Turn> {
        match fs::read_to_string(path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_default(),
            Err(_) => Vec::new(),
        }
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn append(&mut self, turn: Turn) -> Result<()> {
        self.turns.push(turn);
        self.persist()
    }

    pub fn clear(&mut self) -> Result<()> {
        self.turns.clear();
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn persist(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let raw = serde_json::to_string(&self.turns)?;
        fs::write(&self.path, raw)?;
        Ok(())
    }
}
