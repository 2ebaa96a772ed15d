use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: String, // opaque, never changes after creation
    pub title: String,
    pub content: String,
}

impl Note {
    pub fn new(id: impl Into<String>, title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            content: content.into(),
        }
    }
}

/// The three note mutations propagated across every view cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MutationKind {
    Created,
    Updated,
    Deleted,
}

/// Lifecycle of the inline suggestion attached to the edit buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SuggestionState {
    /// No suggestion shown and nothing in flight.
    #[default]
    Idle,
    /// A completion request is armed or in flight; nothing shown yet.
    Requesting,
    /// A non-empty suggestion is shown after the buffer.
    Active,
}

/// What the editor pane renders. Published after every settled step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EditorSnapshot {
    pub note_id: Option<String>,
    pub title: String,
    pub content: String,
    /// Byte offset into `content`, always on a char boundary.
    pub cursor: usize,
    pub suggestion: Option<String>,
    pub suggestion_state: SuggestionState,
    pub generation: u64,
    /// True while the buffer differs from what was last sent to persistence.
    pub dirty: bool,
}

/// An asynchronous call tagged with the generation that was live when it was
/// issued. Its response only applies while that generation is still live.
#[derive(Debug, Clone)]
pub struct PendingRequest<T> {
    pub generation: u64,
    pub note_id: String,
    /// The input the request was built from.
    pub issued_at: T,
}

impl<T> PendingRequest<T> {
    pub fn is_current(&self, live_generation: u64, live_note: Option<&str>) -> bool {
        self.generation == live_generation && live_note == Some(self.note_id.as_str())
    }
}
