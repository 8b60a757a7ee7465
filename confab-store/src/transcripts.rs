//! Named conversation snapshots for `/save` and `/load`.

use confab_core::ConversationSnapshot;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::StoreError;
use crate::persistence::{default_transcripts_dir, load_json, save_json};

/// A directory of `<name>.json` snapshots.
#[derive(Debug, Clone)]
pub struct TranscriptStore {
    dir: PathBuf,
}

impl TranscriptStore {
    /// Creates a store rooted at `dir`.
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// Creates a store in the default transcripts directory.
    pub fn default_location() -> Self {
        Self::new(default_transcripts_dir())
    }

    /// Directory holding the snapshots.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path a snapshot called `name` is stored at.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Config`] if the name is empty or not a plain file name.
    pub fn path_for(&self, name: &str) -> Result<PathBuf, StoreError> {
        let name = name.trim();
        let name = name.strip_suffix(".json").unwrap_or(name);
        let valid = !name.is_empty()
            && !name.starts_with('.')
            && name
                .chars()
                .all(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '.'));
        if !valid {
            return Err(StoreError::Config(format!(
                "invalid transcript name '{name}': use letters, digits, '-', '_' or '.'"
            )));
        }
        Ok(self.dir.join(format!("{name}.json")))
    }

    /// Saves `snapshot` as `name`, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns error if the name is invalid or the file cannot be written.
    pub async fn save(&self, name: &str, snapshot: &ConversationSnapshot) -> Result<PathBuf, StoreError> {
        let path = self.path_for(name)?;
        save_json(&path, snapshot).await?;
        info!(path = %path.display(), "Transcript saved");
        Ok(path)
    }

    /// Loads the snapshot called `name`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if there is no such snapshot.
    pub async fn load(&self, name: &str) -> Result<ConversationSnapshot, StoreError> {
        let path = self.path_for(name)?;
        match load_json(&path).await {
            Err(e) if e.is_not_found() => Err(StoreError::NotFound(format!("transcript '{}'", name.trim()))),
            other => other,
        }
    }

    /// Lists saved snapshot names, sorted.
    ///
    /// # Errors
    ///
    /// Returns error if the directory exists but cannot be read.
    pub async fn list(&self) -> Result<Vec<String>, StoreError> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    names.push(stem.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use confab_core::{ConversationWindow, Message, UsageTotals};

    fn snapshot() -> ConversationSnapshot {
        let mut window = ConversationWindow::new();
        window.push(Message::assistant("hello"));
        ConversationSnapshot::new(window, UsageTotals::default(), Some("GigaChat".into()))
    }

    #[tokio::test]
    async fn test_save_load_and_list() {
        let dir = tempfile::tempdir().unwrap();
        let store = TranscriptStore::new(dir.path().join("transcripts"));
        let original = snapshot();

        let path = store.save("monday", &original).await.unwrap();
        assert!(path.ends_with("monday.json"));
        store.save("alpha.json", &original).await.unwrap();

        assert_eq!(store.load("monday").await.unwrap(), original);
        assert_eq!(store.list().await.unwrap(), vec!["alpha", "monday"]);
    }

    #[tokio::test]
    async fn test_missing_transcript() {
        let dir = tempfile::tempdir().unwrap();
        let store = TranscriptStore::new(dir.path().to_path_buf());

        let err = store.load("nope").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
        assert!(TranscriptStore::new(dir.path().join("absent")).list().await.unwrap().is_empty());
    }

    #[test]
    fn test_rejects_path_like_names() {
        let store = TranscriptStore::new(PathBuf::from("/tmp/t"));
        assert!(store.path_for("../etc/passwd").is_err());
        assert!(store.path_for("a/b").is_err());
        assert!(store.path_for("").is_err());
        assert!(store.path_for(".hidden").is_err());
        assert!(store.path_for("notes_2024-01").is_ok());
    }
}
