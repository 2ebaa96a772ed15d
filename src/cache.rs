//! The three note views the UI renders (full list, search results, selected
//! note) and the single write path that keeps them in agreement.
//!
//! `ViewCaches` has no public mutators. Every write goes through
//! [`CacheSynchronizer`], which applies a whole mutation inside one
//! `watch::Sender::send_modify` call: subscribers observe either the state
//! before the mutation or after it, never a mix.

use serde::Serialize;
use tokio::sync::watch;

use crate::types::{MutationKind, Note};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ViewCaches {
    all: Vec<Note>,
    search_results: Vec<Note>,
    selected: Option<Note>,
    query: String,
}

impl ViewCaches {
    pub fn all(&self) -> &[Note] {
        &self.all
    }

    pub fn search_results(&self) -> &[Note] {
        &self.search_results
    }

    pub fn selected(&self) -> Option<&Note> {
        self.selected.as_ref()
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn find(&self, id: &str) -> Option<&Note> {
        self.all.iter().find(|n| n.id == id)
    }

    /// Whitespace-only queries count as no filter.
    pub fn filter_active(&self) -> bool {
        !self.query.trim().is_empty()
    }

    /// True when every cache holding a given id holds the same title and
    /// content for it.
    pub fn is_consistent(&self) -> bool {
        let agrees = |note: &Note| {
            let in_all = self.all.iter().filter(|n| n.id == note.id);
            let in_results = self.search_results.iter().filter(|n| n.id == note.id);
            in_all.chain(in_results).all(|n| n == note)
        };
        self.all.iter().all(agrees)
            && self.search_results.iter().all(agrees)
            && self.selected.iter().all(agrees)
    }

    fn apply(&mut self, kind: MutationKind, note: Note) {
        match kind {
            MutationKind::Created => {
                self.all.retain(|n| n.id != note.id);
                self.all.insert(0, note.clone());
                // A new note never bypasses an active filter.
                if !self.filter_active() {
                    self.search_results.retain(|n| n.id != note.id);
                    self.search_results.insert(0, note.clone());
                } else {
                    replace_in_place(&mut self.search_results, &note);
                }
                self.selected = Some(note);
            }
            MutationKind::Updated => {
                replace_in_place(&mut self.all, &note);
                replace_in_place(&mut self.search_results, &note);
                if self.selected.as_ref().is_some_and(|s| s.id == note.id) {
                    self.selected = Some(note);
                }
            }
            MutationKind::Deleted => {
                self.all.retain(|n| n.id != note.id);
                self.search_results.retain(|n| n.id != note.id);
                if self.selected.as_ref().is_some_and(|s| s.id == note.id) {
                    self.selected = None;
                }
            }
        }
    }

    /// Swap in results from the search boundary. Ids we already hold locally
    /// take the local copy, which may carry edits not yet persisted.
    fn install_results(&mut self, results: Vec<Note>) {
        self.search_results = results
            .into_iter()
            .map(|hit| match self.all.iter().find(|n| n.id == hit.id) {
                Some(local) => local.clone(),
                None => hit,
            })
            .collect();
    }
}

fn replace_in_place(notes: &mut [Note], note: &Note) {
    if let Some(slot) = notes.iter_mut().find(|n| n.id == note.id) {
        *slot = note.clone();
    }
}

/// Owner of the view caches. Each method is one logical step and publishes
/// exactly one new value to subscribers.
#[derive(Debug)]
pub struct CacheSynchronizer {
    tx: watch::Sender<ViewCaches>,
}

impl Default for CacheSynchronizer {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheSynchronizer {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(ViewCaches::default());
        Self { tx }
    }

    pub fn subscribe(&self) -> watch::Receiver<ViewCaches> {
        self.tx.subscribe()
    }

    pub fn current(&self) -> ViewCaches {
        self.tx.borrow().clone()
    }

    pub fn find(&self, id: &str) -> Option<Note> {
        self.tx.borrow().find(id).cloned()
    }

    /// Initial population from `listNotes`. Search results mirror the full
    /// list unless a query is already active.
    pub fn seed(&self, notes: Vec<Note>) {
        self.tx.send_modify(|caches| {
            if !caches.filter_active() {
                caches.search_results = notes.clone();
            }
            caches.all = notes;
            if let Some(sel) = caches.selected.take() {
                caches.selected = caches.find(&sel.id).cloned();
            }
        });
    }

    pub fn apply_note_mutation(&self, kind: MutationKind, note: Note) {
        tracing::debug!(?kind, id = %note.id, "applying note mutation");
        self.tx.send_modify(|caches| caches.apply(kind, note));
    }

    /// Point `selected` at the cached copy of `id`, or clear it.
    pub fn select(&self, id: Option<&str>) -> Option<Note> {
        let mut picked = None;
        self.tx.send_modify(|caches| {
            caches.selected = id.and_then(|id| caches.find(id).cloned());
            picked = caches.selected.clone();
        });
        picked
    }

    /// Record a new query. An empty query restores the results to a snapshot
    /// of the full list right away; returns true when a search call is needed.
    pub fn set_query(&self, query: &str) -> bool {
        let mut needs_search = false;
        self.tx.send_modify(|caches| {
            caches.query = query.to_string();
            needs_search = caches.filter_active();
            if !needs_search {
                caches.search_results = caches.all.clone();
            }
        });
        needs_search
    }

    /// Apply results for `query` unless a different query has been issued
    /// since. Returns whether the results were applied.
    pub fn apply_search_results(&self, query: &str, results: Vec<Note>) -> bool {
        self.tx.send_if_modified(|caches| {
            if caches.query != query {
                return false;
            }
            caches.install_results(results);
            true
        })
    }
}
