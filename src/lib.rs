pub mod backend;
pub mod cache;
pub mod commands;
pub mod completion;
pub mod config;
pub mod debounce;
pub mod embeddings;
pub mod error;
pub mod gemini;
pub mod save;
pub mod search;
pub mod session;
pub mod store;
pub mod suggestion;
pub mod types;

use tokio::sync::Mutex;

use crate::cache::CacheSynchronizer;
use crate::session::EditSession;

pub use crate::backend::{CompletionClient, NotesBackend};
pub use crate::cache::ViewCaches;
pub use crate::commands::EditorEngine;
pub use crate::config::EngineConfig;
pub use crate::error::{BackendError, EngineError};
pub use crate::types::{EditorSnapshot, MutationKind, Note, SuggestionState};

/// All mutable engine state. Every step (edit, timer firing, response
/// application) holds the lock for its whole duration and never awaits a
/// boundary call while holding it, so steps never interleave.
#[derive(Debug, Default)]
pub struct EngineState {
    /// The note being edited, if any. Replaced wholesale on selection change.
    pub session: Option<EditSession>,
    /// Monotonic counter tagging completion requests.
    /// Advanced on every invalidating edit, acceptance, dismissal and session
    /// replacement; a response tagged with an older value is dropped.
    pub generation: u64,
    /// The three note views. Only written through the synchronizer.
    pub caches: CacheSynchronizer,
}

impl EngineState {
    pub fn active_note_id(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.note_id.as_str())
    }
}

/// Type alias used by the engine handle and its background tasks.
pub type EngineMutex = Mutex<EngineState>;

/// Install a fmt subscriber for hosts that do not bring their own.
pub fn init_tracing() {
    // Release builds stay at WARN; note text is only ever logged at debug.
    #[cfg(debug_assertions)]
    let _ = tracing_subscriber::fmt().try_init();
    #[cfg(not(debug_assertions))]
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .try_init();
}
