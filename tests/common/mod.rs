#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use note_session::{
    BackendError, CompletionClient, EditorEngine, EngineConfig, Note, NotesBackend,
};

/// Let timers and spawned boundary calls make progress on the paused clock.
pub async fn settle(ms: u64) {
    tokio::time::advance(Duration::from_millis(ms)).await;
    for _ in 0..32 {
        tokio::task::yield_now().await;
    }
}

/// One scripted completion response.
#[derive(Clone)]
pub struct Reply {
    pub delay: Duration,
    pub result: Result<String, String>,
}

impl Reply {
    pub fn ok(text: &str, delay_ms: u64) -> Self {
        Self {
            delay: Duration::from_millis(delay_ms),
            result: Ok(text.to_string()),
        }
    }

    pub fn err(delay_ms: u64) -> Self {
        Self {
            delay: Duration::from_millis(delay_ms),
            result: Err("service unavailable".to_string()),
        }
    }
}

/// Completion client that records prompts and answers from a queue.
/// Once the queue is empty it answers with an empty string.
#[derive(Default)]
pub struct ScriptedCompleter {
    prompts: Mutex<Vec<String>>,
    replies: Mutex<VecDeque<Reply>>,
}

impl ScriptedCompleter {
    pub fn with_replies(replies: impl IntoIterator<Item = Reply>) -> Arc<Self> {
        Arc::new(Self {
            prompts: Mutex::new(Vec::new()),
            replies: Mutex::new(replies.into_iter().collect()),
        })
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn push(&self, reply: Reply) {
        self.replies.lock().unwrap().push_back(reply);
    }
}

#[async_trait]
impl CompletionClient for ScriptedCompleter {
    async fn request_completion(
        &self,
        prompt: &str,
        _max_tokens: u32,
        _temperature: f32,
    ) -> Result<String, BackendError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Reply::ok("", 0));
        tokio::time::sleep(reply.delay).await;
        reply.result.map_err(BackendError::Transport)
    }
}

/// In-memory notes backend with programmable latency and failures.
#[derive(Default)]
pub struct ScriptedBackend {
    pub notes: Mutex<Vec<Note>>,
    pub saves: Mutex<Vec<Note>>,
    pub deletes: Mutex<Vec<String>>,
    pub searches: Mutex<Vec<String>>,
    pub semantic_calls: AtomicUsize,
    pub fail_saves: AtomicBool,
    pub fail_deletes: AtomicBool,
    pub fail_semantic: AtomicBool,
    pub search_delays: Mutex<HashMap<String, Duration>>,
    pub delete_delay: Mutex<Duration>,
    created: AtomicUsize,
}

impl ScriptedBackend {
    pub fn with_notes(notes: Vec<Note>) -> Arc<Self> {
        Arc::new(Self {
            notes: Mutex::new(notes),
            ..Self::default()
        })
    }

    pub fn saves(&self) -> Vec<Note> {
        self.saves.lock().unwrap().clone()
    }

    pub fn delay_search(&self, query: &str, ms: u64) {
        self.search_delays
            .lock()
            .unwrap()
            .insert(query.to_string(), Duration::from_millis(ms));
    }
}

#[async_trait]
impl NotesBackend for ScriptedBackend {
    async fn list_notes(&self) -> Result<Vec<Note>, BackendError> {
        Ok(self.notes.lock().unwrap().clone())
    }

    async fn create_note(&self) -> Result<Note, BackendError> {
        let n = self.created.fetch_add(1, Ordering::SeqCst) + 1;
        let note = Note::new(format!("new-{n}"), "", "");
        self.notes.lock().unwrap().insert(0, note.clone());
        Ok(note)
    }

    async fn save_note(&self, id: &str, title: &str, content: &str) -> Result<(), BackendError> {
        let note = Note::new(id, title, content);
        self.saves.lock().unwrap().push(note.clone());
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(BackendError::Transport("disk full".into()));
        }
        let mut notes = self.notes.lock().unwrap();
        match notes.iter_mut().find(|n| n.id == id) {
            Some(slot) => *slot = note,
            None => notes.insert(0, note),
        }
        Ok(())
    }

    async fn delete_note(&self, id: &str) -> Result<(), BackendError> {
        let delay = *self.delete_delay.lock().unwrap();
        tokio::time::sleep(delay).await;
        self.deletes.lock().unwrap().push(id.to_string());
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(BackendError::Transport("offline".into()));
        }
        self.notes.lock().unwrap().retain(|n| n.id != id);
        Ok(())
    }

    async fn search_notes(&self, query: &str) -> Result<Vec<Note>, BackendError> {
        self.searches.lock().unwrap().push(query.to_string());
        let delay = self
            .search_delays
            .lock()
            .unwrap()
            .get(query)
            .copied()
            .unwrap_or_default();
        tokio::time::sleep(delay).await;
        let q = query.to_lowercase();
        Ok(self
            .notes
            .lock()
            .unwrap()
            .iter()
            .filter(|n| n.title.to_lowercase().contains(&q) || n.content.to_lowercase().contains(&q))
            .cloned()
            .collect())
    }

    async fn semantic_search(
        &self,
        query: &str,
        _distance_cutoff: f32,
    ) -> Result<Vec<Note>, BackendError> {
        self.semantic_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_semantic.load(Ordering::SeqCst) {
            return Err(BackendError::Transport("index not ready".into()));
        }
        let q = query.to_lowercase();
        Ok(self
            .notes
            .lock()
            .unwrap()
            .iter()
            .filter(|n| n.title.to_lowercase().starts_with(&q))
            .cloned()
            .collect())
    }
}

pub fn sample_notes() -> Vec<Note> {
    vec![
        Note::new("n3", "Groceries", "milk"),
        Note::new("n2", "Ideas", "a note-taking app"),
        Note::new("n1", "Journal", ""),
    ]
}

/// Engine over `sample_notes`, loaded, with `n1` selected.
pub async fn engine_with(
    completer: Arc<ScriptedCompleter>,
    config: EngineConfig,
) -> (EditorEngine, Arc<ScriptedBackend>) {
    let backend = ScriptedBackend::with_notes(sample_notes());
    let engine = EditorEngine::new(backend.clone(), completer, config);
    engine.load().await.unwrap();
    engine.select_note("n1").await.unwrap();
    (engine, backend)
}
