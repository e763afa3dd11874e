use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use crate::types::{SessionSummary, Turn};

use super::{ConversationStore, ConversationWindow, DEFAULT_MAX_SESSIONS, DEFAULT_WINDOW_CAPACITY};

type SharedWindow = Arc<Mutex<ConversationWindow>>;

#[derive(Debug)]
struct SessionSlot {
    window: SharedWindow,
    last_touched: AtomicU64,
}

/// Process-local store with one independently locked window per session.
/// At most `max_sessions` windows are kept; creating one more evicts the
/// least recently written session.
#[derive(Debug)]
pub struct InMemoryConversationStore {
    sessions: RwLock<HashMap<String, Arc<SessionSlot>>>,
    capacity: usize,
    max_sessions: usize,
    touch_seq: AtomicU64,
}

impl Default for InMemoryConversationStore {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_CAPACITY)
    }
}

impl InMemoryConversationStore {
    pub fn new(capacity: usize) -> Self {
        Self::with_max_sessions(capacity, DEFAULT_MAX_SESSIONS)
    }

    pub fn with_max_sessions(capacity: usize, max_sessions: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            capacity,
            max_sessions: max_sessions.max(1),
            touch_seq: AtomicU64::new(1),
        }
    }

    async fn existing(&self, session_id: &str) -> Option<SharedWindow> {
        self.sessions
            .read()
            .await
            .get(session_id)
            .map(|slot| slot.window.clone())
    }

    async fn touch_or_create(&self, session_id: &str) -> SharedWindow {
        let stamp = self.touch_seq.fetch_add(1, Ordering::Relaxed);
        if let Some(slot) = self.sessions.read().await.get(session_id) {
            slot.last_touched.store(stamp, Ordering::Relaxed);
            return slot.window.clone();
        }

        let mut sessions = self.sessions.write().await;
        if let Some(slot) = sessions.get(session_id) {
            slot.last_touched.store(stamp, Ordering::Relaxed);
            return slot.window.clone();
        }

        while sessions.len() >= self.max_sessions {
            let Some(oldest) = sessions
                .iter()
                .min_by_key(|(_, slot)| slot.last_touched.load(Ordering::Relaxed))
                .map(|(key, _)| key.clone())
            else {
                break;
            };
            debug!(session_id = %oldest, "evicting least recently used session");
            sessions.remove(&oldest);
        }

        let slot = Arc::new(SessionSlot {
            window: Arc::new(Mutex::new(ConversationWindow::new(self.capacity))),
            last_touched: AtomicU64::new(stamp),
        });
        let window = slot.window.clone();
        sessions.insert(session_id.to_owned(), slot);
        window
    }
}

#[async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn snapshot(&self, session_id: &str) -> anyhow::Result<Vec<Turn>> {
        let Some(window) = self.existing(session_id).await else {
            return Ok(Vec::new());
        };
        let snapshot = window.lock().await.snapshot();
        Ok(snapshot)
    }

    async fn preview_with(&self, session_id: &str, turn: Turn) -> anyhow::Result<Vec<Turn>> {
        let Some(window) = self.existing(session_id).await else {
            return Ok(ConversationWindow::new(self.capacity).preview_with(turn));
        };
        let preview = window.lock().await.preview_with(turn);
        Ok(preview)
    }

    async fn append(&self, session_id: &str, turns: Vec<Turn>) -> anyhow::Result<()> {
        if turns.is_empty() {
            return Ok(());
        }

        let window = self.touch_or_create(session_id).await;
        let mut window = window.lock().await;
        for turn in turns {
            window.append(turn);
        }
        Ok(())
    }

    async fn list_sessions(&self, limit: usize) -> anyhow::Result<Vec<SessionSummary>> {
        let windows = self
            .sessions
            .read()
            .await
            .iter()
            .map(|(session_id, slot)| (session_id.clone(), slot.window.clone()))
            .collect::<Vec<_>>();

        let mut sessions = Vec::with_capacity(windows.len());
        for (session_id, window) in windows {
            let window = window.lock().await;
            sessions.push(SessionSummary {
                session_id,
                turn_count: window.len(),
                last_activity: window.last().map(|turn| turn.timestamp),
            });
        }

        sessions.sort_by_key(|entry| std::cmp::Reverse(entry.last_activity));
        sessions.truncate(limit);
        Ok(sessions)
    }
}
