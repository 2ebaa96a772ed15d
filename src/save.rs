//! Save pipeline: debounced, fire-and-forget persistence of the buffer.
//!
//! The view caches are updated synchronously on every edit, so save latency
//! is never visible. A save targets the note id captured when it was
//! dispatched; it never writes UI state. On failure the buffer is kept as is
//! (the local buffer is the truth) and the session is marked dirty so the
//! next debounce window sends it again.

use tracing::{debug, warn};

use crate::commands::EditorEngine;
use crate::error::EngineError;
use crate::session::{EditSession, SavedSnapshot};

impl EditorEngine {
    /// (Re)arm the save timer of `session`.
    pub(crate) fn schedule_save(&self, session: &mut EditSession) {
        let note_id = session.note_id.clone();
        let weak = self.downgrade();
        let delay = self.inner().config.save_debounce();
        session.save_timer.schedule(delay, async move {
            if let Some(engine) = EditorEngine::upgrade(&weak) {
                engine.fire_save(&note_id).await;
            }
        });
    }

    /// Send the buffer now instead of waiting for the quiet period.
    /// Returns whether a save was dispatched (a clean buffer sends nothing).
    pub async fn save_now(&self) -> Result<bool, EngineError> {
        let mut guard = self.inner().state.lock().await;
        let state = &mut *guard;
        let session = state.session.as_mut().ok_or(EngineError::NoActiveNote)?;
        session.save_timer.cancel();
        let sent = self.dispatch_save(session);
        self.publish_editor(state);
        Ok(sent)
    }

    async fn fire_save(&self, note_id: &str) {
        let mut guard = self.inner().state.lock().await;
        let state = &mut *guard;
        let Some(session) = state.session.as_mut().filter(|s| s.note_id == note_id) else {
            debug!(%note_id, "save timer outlived its session");
            return;
        };
        if self.dispatch_save(session) {
            self.publish_editor(state);
        }
    }

    /// Hand the current title/content of `session` to the backend on its
    /// own task. Records the snapshot as sent before the call resolves.
    pub(crate) fn dispatch_save(&self, session: &mut EditSession) -> bool {
        if !session.is_dirty() {
            debug!(id = %session.note_id, "buffer unchanged since last save");
            return false;
        }
        let snapshot = session.snapshot();
        session.last_saved = Some(snapshot.clone());
        let note_id = session.note_id.clone();

        let backend = self.inner().backend.clone();
        let weak = self.downgrade();
        tokio::spawn(async move {
            match backend
                .save_note(&note_id, &snapshot.title, &snapshot.content)
                .await
            {
                Ok(()) => debug!(id = %note_id, len = snapshot.content.len(), "note saved"),
                Err(e) => {
                    warn!(id = %note_id, "save_note failed: {e}");
                    if let Some(engine) = EditorEngine::upgrade(&weak) {
                        engine.mark_unsaved(&note_id, &snapshot).await;
                    }
                }
            }
        });
        true
    }

    /// A save failed. If the same note is still being edited and nothing
    /// newer has been sent since, forget the snapshot so the buffer counts as
    /// unsaved again.
    async fn mark_unsaved(&self, note_id: &str, failed: &SavedSnapshot) {
        let mut guard = self.inner().state.lock().await;
        let state = &mut *guard;
        let Some(session) = state.session.as_mut().filter(|s| s.note_id == note_id) else {
            return;
        };
        if session.last_saved.as_ref() == Some(failed) {
            session.last_saved = None;
            self.publish_editor(state);
        }
    }
}
