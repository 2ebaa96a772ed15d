//! Boundary traits for the services the engine talks to. Everything behind
//! them (storage, ranking, the completion model) is the implementor's business.

use async_trait::async_trait;

use crate::error::BackendError;
use crate::types::Note;

#[async_trait]
pub trait NotesBackend: Send + Sync {
    /// Every note, called once at startup.
    async fn list_notes(&self) -> Result<Vec<Note>, BackendError>;

    /// Allocate a new note with a fresh id.
    async fn create_note(&self) -> Result<Note, BackendError>;

    /// Upsert the persisted title and content of `id`.
    async fn save_note(&self, id: &str, title: &str, content: &str) -> Result<(), BackendError>;

    async fn delete_note(&self, id: &str) -> Result<(), BackendError>;

    /// Lexical search.
    async fn search_notes(&self, query: &str) -> Result<Vec<Note>, BackendError>;

    /// Optional ranked search. Backends without one keep the default, which
    /// makes the engine fall back to [`NotesBackend::search_notes`].
    async fn semantic_search(
        &self,
        _query: &str,
        _distance_cutoff: f32,
    ) -> Result<Vec<Note>, BackendError> {
        Err(BackendError::Unsupported("semantic search"))
    }
}

#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Continuation text for `prompt`. May be slow; any error means
    /// "no suggestion".
    async fn request_completion(
        &self,
        prompt: &str,
        max_tokens: u32,
        temperature: f32,
    ) -> Result<String, BackendError>;
}
