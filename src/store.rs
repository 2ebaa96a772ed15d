use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::backend::NotesBackend;
use crate::embeddings;
use crate::error::BackendError;
use crate::types::Note;

/// Title given to freshly created notes.
pub const NEW_NOTE_TITLE: &str = "New Note";

/// Notes persisted as one JSON file per note (`<dir>/<id>.json`).
#[derive(Debug, Clone)]
pub struct FileNoteStore {
    dir: PathBuf,
}

impl FileNoteStore {
    /// Open (creating if needed) a store rooted at `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, BackendError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// `~/.minimal-notes/notes`, or None if the home directory is unknown.
    pub fn default_dir() -> Option<PathBuf> {
        directories::BaseDirs::new().map(|d| d.home_dir().join(".minimal-notes").join("notes"))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: &str) -> Result<PathBuf, BackendError> {
        if !is_valid_note_id(id) {
            return Err(BackendError::NotFound(id.to_string()));
        }
        Ok(self.dir.join(format!("{id}.json")))
    }

    /// Every readable note, newest id first. Files that fail to read or
    /// parse are skipped.
    fn read_all(&self) -> Result<Vec<Note>, BackendError> {
        let mut notes = Vec::new();
        for entry in std::fs::read_dir(&self.dir)?.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let parsed = std::fs::read_to_string(&path)
                .map_err(BackendError::from)
                .and_then(|text| serde_json::from_str::<Note>(&text).map_err(BackendError::from));
            match parsed {
                Ok(note) => notes.push(note),
                Err(e) => tracing::warn!("Skipping unreadable note {}: {e}", path.display()),
            }
        }
        notes.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(notes)
    }

    /// Write atomically (temp file, then rename) so a crash mid-write cannot
    /// leave a truncated note behind.
    fn write(&self, note: &Note) -> Result<(), BackendError> {
        let path = self.path_for(&note.id)?;
        let tmp_path = path.with_extension("json.tmp");
        std::fs::write(&tmp_path, serde_json::to_vec(note)?)?;
        std::fs::rename(&tmp_path, &path)?;
        Ok(())
    }

    async fn blocking<T, F>(&self, f: F) -> Result<T, BackendError>
    where
        F: FnOnce(&FileNoteStore) -> Result<T, BackendError> + Send + 'static,
        T: Send + 'static,
    {
        let store = self.clone();
        tokio::task::spawn_blocking(move || f(&store))
            .await
            .map_err(|e| BackendError::Transport(format!("store task failed: {e}")))?
    }
}

#[async_trait]
impl NotesBackend for FileNoteStore {
    async fn list_notes(&self) -> Result<Vec<Note>, BackendError> {
        self.blocking(|store| store.read_all()).await
    }

    async fn create_note(&self) -> Result<Note, BackendError> {
        let note = Note::new(uuid::Uuid::new_v4().to_string(), NEW_NOTE_TITLE, "");
        let stored = note.clone();
        self.blocking(move |store| store.write(&stored)).await?;
        tracing::debug!(id = %note.id, "note created");
        Ok(note)
    }

    async fn save_note(&self, id: &str, title: &str, content: &str) -> Result<(), BackendError> {
        let note = Note::new(id, title, content);
        self.blocking(move |store| store.write(&note)).await
    }

    async fn delete_note(&self, id: &str) -> Result<(), BackendError> {
        let id = id.to_string();
        self.blocking(move |store| {
            let path = store.path_for(&id)?;
            std::fs::remove_file(&path).map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => BackendError::NotFound(id.clone()),
                _ => BackendError::Io(e),
            })
        })
        .await
    }

    /// Case-insensitive substring match on title or content.
    async fn search_notes(&self, query: &str) -> Result<Vec<Note>, BackendError> {
        let notes = self.list_notes().await?;
        if query.is_empty() {
            return Ok(notes);
        }
        let query = query.to_lowercase();
        Ok(notes
            .into_iter()
            .filter(|note| {
                note.title.to_lowercase().contains(&query)
                    || note.content.to_lowercase().contains(&query)
            })
            .collect())
    }

    /// Notes within `distance_cutoff` (cosine distance) of the query,
    /// closest first.
    async fn semantic_search(
        &self,
        query: &str,
        distance_cutoff: f32,
    ) -> Result<Vec<Note>, BackendError> {
        let notes = self.list_notes().await?;
        if query.is_empty() {
            return Ok(notes);
        }
        let query_embedding = embeddings::embed(query);
        let mut ranked: Vec<(f32, Note)> = notes
            .into_iter()
            .map(|note| {
                let text = format!("{} {}", note.title, note.content);
                let distance = embeddings::cosine_distance(&query_embedding, &embeddings::embed(&text));
                (distance, note)
            })
            .filter(|(distance, _)| *distance <= distance_cutoff)
            .collect();
        ranked.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
        Ok(ranked.into_iter().map(|(_, note)| note).collect())
    }
}

/// Ids become file names, so only accept characters that cannot escape the
/// store directory.
fn is_valid_note_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}
