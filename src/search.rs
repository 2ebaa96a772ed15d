//! Search result refresh.
//!
//! Results are keyed on the query string: a response only lands if its query
//! is still the current one, so an older query can never overwrite a newer
//! one regardless of the order responses arrive in.

use tracing::{debug, warn};

use crate::commands::EditorEngine;
use crate::types::Note;

impl EditorEngine {
    /// Record a new query and refresh the search results for it.
    ///
    /// An empty (or whitespace-only) query resets the results to a snapshot
    /// of the full list without a boundary call. Otherwise the backend is
    /// asked, semantic search first when enabled and lexical search as the
    /// fallback. A failed search leaves the current results in place.
    /// Returns whether fresh results were applied.
    pub async fn set_query(&self, query: &str) -> bool {
        let needs_search = {
            let state = self.inner().state.lock().await;
            state.caches.set_query(query)
        };
        if !needs_search {
            debug!("search cleared, results restored from the full list");
            return false;
        }

        let Some(results) = self.run_search(query).await else {
            return false;
        };

        let state = self.inner().state.lock().await;
        let applied = state.caches.apply_search_results(query, results);
        if !applied {
            debug!("dropping results for superseded query");
        }
        applied
    }

    async fn run_search(&self, query: &str) -> Option<Vec<Note>> {
        let inner = self.inner();
        if inner.config.semantic_search {
            match inner
                .backend
                .semantic_search(query, inner.config.distance_cutoff)
                .await
            {
                Ok(results) => return Some(results),
                Err(e) => debug!("semantic search unavailable, falling back to lexical: {e}"),
            }
        }
        match inner.backend.search_notes(query).await {
            Ok(results) => Some(results),
            Err(e) => {
                warn!("search_notes failed: {e}");
                None
            }
        }
    }
}
