//! Inline suggestion reconciliation.
//!
//! Decides, for every buffer-content change, whether the displayed suggestion
//! survives (the user typed its next character), is used up, or must be thrown
//! away and re-requested. Pure and synchronous: the engine owns generations and
//! timers and acts on the returned [`Reconciliation`].

use crate::types::SuggestionState;

/// Outcome of feeding one `old -> new` content change to the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciliation {
    /// Content is identical; nothing changed.
    Unchanged,
    /// One character matching the head of the suggestion was typed and the
    /// rest of the suggestion remains. No request is needed.
    Consumed,
    /// The last character of the suggestion was typed. The tracker is idle
    /// and a fresh request should be armed.
    Exhausted,
    /// Any other edit. The suggestion is gone, the tracker is requesting and
    /// the caller must advance the generation and arm a new request.
    Invalidated,
}

#[derive(Debug, Clone, Default)]
pub struct SuggestionTracker {
    state: SuggestionState,
    text: String,
}

impl SuggestionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SuggestionState {
        self.state
    }

    /// The displayed suggestion, only while `Active`.
    pub fn text(&self) -> Option<&str> {
        match self.state {
            SuggestionState::Active => Some(&self.text),
            _ => None,
        }
    }

    pub fn reconcile(&mut self, old: &str, new: &str) -> Reconciliation {
        if old == new {
            return Reconciliation::Unchanged;
        }

        if self.state == SuggestionState::Active {
            if let Some(typed) = appended_char(old, new) {
                if self.text.starts_with(typed) {
                    self.text.drain(..typed.len_utf8());
                    if self.text.is_empty() {
                        self.state = SuggestionState::Idle;
                        return Reconciliation::Exhausted;
                    }
                    return Reconciliation::Consumed;
                }
            }
        }

        self.text.clear();
        self.state = SuggestionState::Requesting;
        Reconciliation::Invalidated
    }

    /// Remove the whole suggestion for splicing into the buffer.
    /// Returns `None` (and changes nothing) unless a suggestion is shown.
    pub fn take_for_accept(&mut self) -> Option<String> {
        if self.state != SuggestionState::Active {
            return None;
        }
        self.state = SuggestionState::Idle;
        Some(std::mem::take(&mut self.text))
    }

    /// A request has been dispatched; nothing is shown until it resolves.
    pub fn mark_requesting(&mut self) {
        self.text.clear();
        self.state = SuggestionState::Requesting;
    }

    /// Show a resolved suggestion. An empty one leaves the tracker idle.
    pub fn install(&mut self, text: String) {
        if text.is_empty() {
            self.clear();
        } else {
            self.text = text;
            self.state = SuggestionState::Active;
        }
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.state = SuggestionState::Idle;
    }
}

/// The single character `new` adds at the end of `old`, if that is the only
/// difference between them.
fn appended_char(old: &str, new: &str) -> Option<char> {
    let rest = new.strip_prefix(old)?;
    let mut chars = rest.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(c),
        _ => None,
    }
}
