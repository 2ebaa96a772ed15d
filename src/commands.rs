use std::sync::{Arc, Weak};

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::backend::{CompletionClient, NotesBackend};
use crate::cache::ViewCaches;
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::session::EditSession;
use crate::suggestion::Reconciliation;
use crate::types::{EditorSnapshot, MutationKind, Note};
use crate::{EngineMutex, EngineState};

/// Handle to the editing engine. Cheap to clone; every clone drives the same
/// state. Background timers and boundary calls hold only a weak reference,
/// so dropping the last handle neutralises whatever is still outstanding.
#[derive(Clone)]
pub struct EditorEngine {
    inner: Arc<Inner>,
}

pub(crate) struct Inner {
    pub(crate) state: EngineMutex,
    pub(crate) backend: Arc<dyn NotesBackend>,
    pub(crate) completer: Arc<dyn CompletionClient>,
    pub(crate) config: EngineConfig,
    editor_tx: watch::Sender<EditorSnapshot>,
    views_rx: watch::Receiver<ViewCaches>,
}

// ─── Operations invoked by the UI shell ──────────────────────────────────────

impl EditorEngine {
    pub fn new(
        backend: Arc<dyn NotesBackend>,
        completer: Arc<dyn CompletionClient>,
        config: EngineConfig,
    ) -> Self {
        let state = EngineState::default();
        let views_rx = state.caches.subscribe();
        let (editor_tx, _) = watch::channel(EditorSnapshot::default());
        Self {
            inner: Arc::new(Inner {
                state: EngineMutex::new(state),
                backend,
                completer,
                config,
                editor_tx,
                views_rx,
            }),
        }
    }

    /// Seed the full list and the search results from `listNotes`.
    /// Called once at startup. Returns how many notes were loaded.
    pub async fn load(&self) -> Result<usize, EngineError> {
        let notes = self.inner.backend.list_notes().await?;
        let count = notes.len();
        let state = self.inner.state.lock().await;
        state.caches.seed(notes);
        info!(count, "note caches seeded");
        Ok(count)
    }

    /// Allocate a note through the backend, add it to the views, and start
    /// editing it.
    pub async fn create_note(&self) -> Result<Note, EngineError> {
        let note = self.inner.backend.create_note().await.map_err(|e| {
            warn!("create_note failed: {e}");
            e
        })?;

        let mut state = self.inner.state.lock().await;
        state
            .caches
            .apply_note_mutation(MutationKind::Created, note.clone());
        self.replace_session(&mut state, Some(EditSession::open(&note)));
        self.publish_editor(&state);
        Ok(note)
    }

    /// Start editing the cached note `id`. Selecting the note already being
    /// edited keeps the current session.
    pub async fn select_note(&self, id: &str) -> Result<Note, EngineError> {
        let mut state = self.inner.state.lock().await;
        if let Some(session) = state.session.as_ref().filter(|s| s.note_id == id) {
            return Ok(session.as_note());
        }
        let note = state
            .caches
            .select(Some(id))
            .ok_or_else(|| EngineError::UnknownNote(id.to_string()))?;
        self.replace_session(&mut state, Some(EditSession::open(&note)));
        self.publish_editor(&state);
        Ok(note)
    }

    pub async fn clear_selection(&self) {
        let mut state = self.inner.state.lock().await;
        state.caches.select(None);
        self.replace_session(&mut state, None);
        self.publish_editor(&state);
    }

    /// Replace the buffer content. `cursor` is a byte offset and defaults to
    /// the end of the new content.
    pub async fn edit_content(
        &self,
        content: String,
        cursor: Option<usize>,
    ) -> Result<(), EngineError> {
        let mut guard = self.inner.state.lock().await;
        let state = &mut *guard;
        let session = state.session.as_mut().ok_or(EngineError::NoActiveNote)?;

        let old = session.replace_content(content, cursor);
        match session.suggestion.reconcile(&old, &session.content) {
            Reconciliation::Unchanged | Reconciliation::Consumed => {}
            Reconciliation::Exhausted | Reconciliation::Invalidated => {
                self.arm_completion(session, &mut state.generation);
            }
        }
        if old != session.content {
            state
                .caches
                .apply_note_mutation(MutationKind::Updated, session.as_note());
            self.schedule_save(session);
        }
        self.publish_editor(state);
        Ok(())
    }

    pub async fn edit_title(&self, title: String) -> Result<(), EngineError> {
        let mut guard = self.inner.state.lock().await;
        let state = &mut *guard;
        let session = state.session.as_mut().ok_or(EngineError::NoActiveNote)?;
        if session.title == title {
            return Ok(());
        }
        session.title = title;
        state
            .caches
            .apply_note_mutation(MutationKind::Updated, session.as_note());
        self.schedule_save(session);
        self.publish_editor(state);
        Ok(())
    }

    pub async fn move_cursor(&self, pos: usize) -> Result<(), EngineError> {
        let mut state = self.inner.state.lock().await;
        let session = state.session.as_mut().ok_or(EngineError::NoActiveNote)?;
        session.move_cursor(pos);
        self.publish_editor(&state);
        Ok(())
    }

    /// Splice the whole displayed suggestion into the buffer at the cursor
    /// and prefetch the continuation. Returns false when nothing was shown.
    pub async fn accept_suggestion(&self) -> Result<bool, EngineError> {
        let mut guard = self.inner.state.lock().await;
        let state = &mut *guard;
        let session = state.session.as_mut().ok_or(EngineError::NoActiveNote)?;
        let Some(text) = session.suggestion.take_for_accept() else {
            return Ok(false);
        };

        session.splice_at_cursor(&text);
        state
            .caches
            .apply_note_mutation(MutationKind::Updated, session.as_note());
        self.schedule_save(session);
        self.arm_completion(session, &mut state.generation);
        self.publish_editor(state);
        Ok(true)
    }

    /// Hide the suggestion and neutralise any request still in flight.
    pub async fn dismiss_suggestion(&self) {
        let mut guard = self.inner.state.lock().await;
        let state = &mut *guard;
        if let Some(session) = state.session.as_mut() {
            session.completion_timer.cancel();
            session.suggestion.clear();
            state.generation += 1;
        }
        self.publish_editor(state);
    }

    /// Delete `id` through the backend, then drop it from every view.
    /// If it is the note being edited, its timers are disarmed up front so a
    /// late save cannot recreate it.
    pub async fn delete_note(&self, id: &str) -> Result<(), EngineError> {
        {
            let mut guard = self.inner.state.lock().await;
            let state = &mut *guard;
            if let Some(session) = state.session.as_mut().filter(|s| s.note_id == id) {
                session.cancel_timers();
                session.suggestion.clear();
                state.generation += 1;
            }
            self.publish_editor(state);
        }

        let result = self.inner.backend.delete_note(id).await;

        let mut guard = self.inner.state.lock().await;
        let state = &mut *guard;
        if let Err(e) = result {
            warn!(%id, "delete_note failed: {e}");
            // Still editing it: whatever was pending must reach persistence.
            if let Some(session) = state.session.as_mut().filter(|s| s.note_id == id) {
                if session.is_dirty() {
                    self.schedule_save(session);
                }
            }
            return Err(e.into());
        }

        let note = state
            .caches
            .find(id)
            .unwrap_or_else(|| Note::new(id, "", ""));
        state.caches.apply_note_mutation(MutationKind::Deleted, note);
        if state.active_note_id() == Some(id) {
            // Dropping the session drops its timers; nothing is flushed.
            state.session = None;
            state.generation += 1;
        }
        self.publish_editor(state);
        info!(%id, "note deleted");
        Ok(())
    }

    pub fn views(&self) -> ViewCaches {
        self.inner.views_rx.borrow().clone()
    }

    pub fn editor(&self) -> EditorSnapshot {
        self.inner.editor_tx.borrow().clone()
    }

    pub fn subscribe_views(&self) -> watch::Receiver<ViewCaches> {
        self.inner.views_rx.clone()
    }

    pub fn subscribe_editor(&self) -> watch::Receiver<EditorSnapshot> {
        self.inner.editor_tx.subscribe()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }
}

// ─── Internal helpers ─────────────────────────────────────────────────────────

impl EditorEngine {
    pub(crate) fn inner(&self) -> &Inner {
        &self.inner
    }

    pub(crate) fn downgrade(&self) -> Weak<Inner> {
        Arc::downgrade(&self.inner)
    }

    pub(crate) fn upgrade(weak: &Weak<Inner>) -> Option<Self> {
        weak.upgrade().map(|inner| Self { inner })
    }

    /// Swap the editing session. The outgoing session's unsaved buffer is
    /// flushed to its own note id (when configured), then its timers go
    /// with it. Advancing the generation drops its in-flight completions.
    pub(crate) fn replace_session(&self, state: &mut EngineState, next: Option<EditSession>) {
        state.generation += 1;
        if let Some(mut old) = state.session.take() {
            if self.inner.config.flush_on_switch && old.is_dirty() {
                debug!(id = %old.note_id, "flushing unsaved buffer on switch");
                self.dispatch_save(&mut old);
            }
            old.cancel_timers();
        }
        debug!(
            id = next.as_ref().map(|s| s.note_id.as_str()).unwrap_or("<none>"),
            generation = state.generation,
            "editing session replaced"
        );
        state.session = next;
    }

    /// Publish what the editor pane should show. Only notifies subscribers
    /// when something visible changed.
    pub(crate) fn publish_editor(&self, state: &EngineState) {
        let snapshot = match state.session.as_ref() {
            Some(s) => EditorSnapshot {
                note_id: Some(s.note_id.clone()),
                title: s.title.clone(),
                content: s.content.clone(),
                cursor: s.cursor,
                suggestion: s.suggestion.text().map(str::to_owned),
                suggestion_state: s.suggestion.state(),
                generation: state.generation,
                dirty: s.is_dirty(),
            },
            None => EditorSnapshot {
                generation: state.generation,
                ..EditorSnapshot::default()
            },
        };
        self.inner.editor_tx.send_if_modified(|current| {
            if *current == snapshot {
                return false;
            }
            *current = snapshot;
            true
        });
    }
}
