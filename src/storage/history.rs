//! Published post history
//!
//! An append-bounded list of post texts persisted to a JSON file.
//! Only the most recent [`MAX_HISTORY`] posts are kept.

use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Maximum number of posts retained in the history file
pub const MAX_HISTORY: usize = 10;

/// Bounded history of published posts backed by a JSON file
#[derive(Debug, Clone)]
pub struct PostHistory {
    path: PathBuf,
}

impl PostHistory {
    /// Create a history backed by the given file
    pub fn new(path: impl Into<PathBuf>) -> Self {
        PostHistory { path: path.into() }
    }

    /// Append a post, trimming the history to the most recent entries
    pub fn append(&self, post_text: &str) -> Result<()> {
        let mut history = self.load();

        history.push(post_text.to_string());
        if history.len() > MAX_HISTORY {
            history = history.split_off(history.len() - MAX_HISTORY);
        }

        std::fs::write(&self.path, serde_json::to_string_pretty(&history)?).map_err(|e| {
            Error::Storage(format!("cannot write {}: {}", self.path.display(), e))
        })?;
        Ok(())
    }

    /// Load the history; a missing or corrupt file reads as empty
    pub fn load(&self) -> Vec<String> {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!("Post history file is corrupt, starting fresh: {}", e);
                Vec::new()
            }),
            Err(_) => Vec::new(),
        }
    }

    /// Path of the history file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let history = PostHistory::new(dir.path().join("posts.json"));

        history.append("первый пост").unwrap();
        history.append("второй пост").unwrap();

        let posts = history.load();
        assert_eq!(posts, vec!["первый пост", "второй пост"]);
    }

    #[test]
    fn history_is_bounded() {
        let dir = tempfile::tempdir().unwrap();
        let history = PostHistory::new(dir.path().join("posts.json"));

        for i in 0..15 {
            history.append(&format!("пост {}", i)).unwrap();
        }

        let posts = history.load();
        assert_eq!(posts.len(), MAX_HISTORY);
        assert_eq!(posts.first().map(String::as_str), Some("пост 5"));
        assert_eq!(posts.last().map(String::as_str), Some("пост 14"));
    }

    #[test]
    fn corrupt_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("posts.json");
        std::fs::write(&path, "{broken").unwrap();

        let history = PostHistory::new(&path);
        assert!(history.load().is_empty());

        // And appending over it recovers
        history.append("новый пост").unwrap();
        assert_eq!(history.load().len(), 1);
    }

    #[test]
    fn unwritable_path_is_a_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        // A directory path cannot be written as a file
        let history = PostHistory::new(dir.path());

        let err = history.append("пост").unwrap_err();
        assert!(matches!(err, Error::Storage(_)));
    }

    #[test]
    fn missing_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let history = PostHistory::new(dir.path().join("absent.json"));
        assert!(history.load().is_empty());
    }
}
