//! Completion request pipeline: debounced requests built from the tail of the
//! buffer, with every response checked against the live generation before
//! it may touch the suggestion.

use tracing::{debug, warn};

use crate::commands::EditorEngine;
use crate::error::BackendError;
use crate::session::EditSession;
use crate::types::PendingRequest;

/// The prompt for a completion: the buffer from the start of its last
/// `tokens` whitespace-delimited tokens to the end, trailing whitespace kept
/// so the model can tell whether a word was finished.
/// `None` when the buffer holds no token at all.
pub fn completion_context(buffer: &str, tokens: usize) -> Option<&str> {
    if tokens == 0 {
        return None;
    }
    let mut starts = Vec::new();
    let mut prev_is_space = true;
    for (i, c) in buffer.char_indices() {
        let is_space = c.is_whitespace();
        if prev_is_space && !is_space {
            starts.push(i);
        }
        prev_is_space = is_space;
    }
    let first = *starts.get(starts.len().saturating_sub(tokens))?;
    Some(&buffer[first..])
}

/// Clean a raw completion for display after `buffer`. Trailing whitespace
/// and leading line breaks go; a leading space is the word separator and is
/// kept unless the buffer already ends in whitespace.
pub fn normalize_suggestion(raw: &str, buffer: &str) -> String {
    let text = raw.trim_end().trim_start_matches(['\r', '\n']);
    if buffer.is_empty() || buffer.ends_with(char::is_whitespace) {
        text.trim_start().to_string()
    } else {
        text.to_string()
    }
}

impl EditorEngine {
    /// Advance the generation and (re)arm the completion timer for `session`.
    /// The timer carries the new generation; anything older is now stale.
    pub(crate) fn arm_completion(&self, session: &mut EditSession, generation: &mut u64) {
        *generation += 1;
        let pending = PendingRequest {
            generation: *generation,
            note_id: session.note_id.clone(),
            issued_at: (),
        };
        let weak = self.downgrade();
        let delay = self.inner().config.completion_debounce();
        session.completion_timer.schedule(delay, async move {
            if let Some(engine) = EditorEngine::upgrade(&weak) {
                engine.fire_completion(pending).await;
            }
        });
    }

    /// Timer body: build the prompt under the lock, then hand the boundary
    /// call to its own task so a later re-arm cannot abort it mid-flight.
    async fn fire_completion(&self, armed: PendingRequest<()>) {
        let inner = self.inner();
        let pending = {
            let mut guard = inner.state.lock().await;
            let state = &mut *guard;
            if !armed.is_current(state.generation, state.active_note_id()) {
                debug!(generation = armed.generation, "completion timer superseded");
                return;
            }
            let Some(session) = state.session.as_mut() else {
                return;
            };
            let Some(prompt) = completion_context(&session.content, inner.config.context_tokens)
            else {
                debug!("empty completion context, skipping request");
                session.suggestion.clear();
                self.publish_editor(state);
                return;
            };
            let pending = PendingRequest {
                generation: armed.generation,
                note_id: armed.note_id,
                issued_at: prompt.to_string(),
            };
            session.suggestion.mark_requesting();
            self.publish_editor(state);
            pending
        };

        debug!(
            generation = pending.generation,
            prompt_len = pending.issued_at.len(),
            "requesting completion"
        );
        let completer = inner.completer.clone();
        let (max_tokens, temperature) = (inner.config.max_tokens, inner.config.temperature);
        let weak = self.downgrade();
        tokio::spawn(async move {
            let result = completer
                .request_completion(&pending.issued_at, max_tokens, temperature)
                .await;
            if let Some(engine) = EditorEngine::upgrade(&weak) {
                engine.resolve_completion(pending, result).await;
            }
        });
    }

    async fn resolve_completion(
        &self,
        pending: PendingRequest<String>,
        result: Result<String, BackendError>,
    ) {
        let mut guard = self.inner().state.lock().await;
        let state = &mut *guard;
        if !pending.is_current(state.generation, state.active_note_id()) {
            debug!(
                issued = pending.generation,
                live = state.generation,
                "dropping stale completion"
            );
            return;
        }
        let Some(session) = state.session.as_mut() else {
            return;
        };
        match result {
            Ok(raw) => {
                let text = normalize_suggestion(&raw, &session.content);
                debug!(generation = pending.generation, len = text.len(), "completion installed");
                session.suggestion.install(text);
            }
            Err(e) => {
                warn!("completion request failed: {e}");
                session.suggestion.clear();
            }
        }
        self.publish_editor(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_is_last_n_tokens_with_spacing_kept() {
        let buf = "one two  three four";
        assert_eq!(completion_context(buf, 2), Some("three four"));
        assert_eq!(completion_context(buf, 3), Some("two  three four"));
        assert_eq!(completion_context(buf, 10), Some("one two  three four"));
    }

    #[test]
    fn context_keeps_trailing_whitespace() {
        assert_eq!(completion_context("  hello there ", 1), Some("there "));
        assert_eq!(completion_context("  hello there ", 5), Some("hello there "));
    }

    #[test]
    fn empty_or_blank_buffer_has_no_context() {
        assert_eq!(completion_context("", 10), None);
        assert_eq!(completion_context(" \n\t ", 10), None);
        assert_eq!(completion_context("word", 0), None);
    }

    #[test]
    fn suggestion_keeps_separator_only_when_needed() {
        assert_eq!(normalize_suggestion(" world  \n", "Hello"), " world");
        assert_eq!(normalize_suggestion(" world", "Hello "), "world");
        assert_eq!(normalize_suggestion("lo world", "Hel"), "lo world");
        assert_eq!(normalize_suggestion("\n\nnext line", "end."), "next line");
        assert_eq!(normalize_suggestion("   ", "x"), "");
    }
}
