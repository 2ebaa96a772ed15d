use crate::debounce::Debouncer;
use crate::suggestion::SuggestionTracker;
use crate::types::Note;

/// Title and content as last handed to the persistence boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedSnapshot {
    pub title: String,
    pub content: String,
}

/// Live editing state for the one note being edited.
///
/// Replaced wholesale when the selection changes. Dropping it drops both
/// debouncers, which disarms any timer the session still had pending.
#[derive(Debug)]
pub struct EditSession {
    pub note_id: String,
    pub title: String,
    pub content: String,
    /// Byte offset into `content`, kept on a char boundary.
    pub cursor: usize,
    pub suggestion: SuggestionTracker,
    pub last_saved: Option<SavedSnapshot>,
    pub save_timer: Debouncer,
    pub completion_timer: Debouncer,
}

impl EditSession {
    /// Start editing `note`. The note came from the caches, which mirror what
    /// persistence has (or is about to have), so it counts as saved.
    pub fn open(note: &Note) -> Self {
        Self {
            note_id: note.id.clone(),
            title: note.title.clone(),
            content: note.content.clone(),
            cursor: note.content.len(),
            suggestion: SuggestionTracker::new(),
            last_saved: Some(SavedSnapshot {
                title: note.title.clone(),
                content: note.content.clone(),
            }),
            save_timer: Debouncer::new(),
            completion_timer: Debouncer::new(),
        }
    }

    pub fn as_note(&self) -> Note {
        Note::new(self.note_id.clone(), self.title.clone(), self.content.clone())
    }

    pub fn snapshot(&self) -> SavedSnapshot {
        SavedSnapshot {
            title: self.title.clone(),
            content: self.content.clone(),
        }
    }

    pub fn is_dirty(&self) -> bool {
        match &self.last_saved {
            Some(saved) => saved.title != self.title || saved.content != self.content,
            None => true,
        }
    }

    pub fn cancel_timers(&mut self) {
        self.save_timer.cancel();
        self.completion_timer.cancel();
    }

    /// Replace the buffer content and return the previous one. `cursor`
    /// defaults to the end of the new content.
    pub fn replace_content(&mut self, content: String, cursor: Option<usize>) -> String {
        let cursor = cursor.unwrap_or(content.len());
        self.cursor = clamp_to_boundary(&content, cursor);
        std::mem::replace(&mut self.content, content)
    }

    pub fn move_cursor(&mut self, pos: usize) {
        self.cursor = clamp_to_boundary(&self.content, pos);
    }

    /// Insert `text` at the cursor and leave the cursor after it.
    pub fn splice_at_cursor(&mut self, text: &str) {
        let at = clamp_to_boundary(&self.content, self.cursor);
        self.content.insert_str(at, text);
        self.cursor = at + text.len();
    }
}

/// Largest char boundary of `s` that is `<= pos`.
pub fn clamp_to_boundary(s: &str, pos: usize) -> usize {
    let mut pos = pos.min(s.len());
    while !s.is_char_boundary(pos) {
        pos -= 1;
    }
    pos
}
