mod in_memory;
mod window;

use async_trait::async_trait;

use crate::types::{SessionSummary, Turn};

pub use in_memory::InMemoryConversationStore;
pub use window::{ConversationWindow, DEFAULT_WINDOW_CAPACITY};

pub const DEFAULT_MAX_SESSIONS: usize = 10_000;

#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Chronological turns for `session_id`; empty for unknown sessions.
    async fn snapshot(&self, session_id: &str) -> anyhow::Result<Vec<Turn>>;

    /// Bounded snapshot the session would hold after appending `turn`.
    async fn preview_with(&self, session_id: &str, turn: Turn) -> anyhow::Result<Vec<Turn>>;

    /// Appends every turn under a single exclusive acquisition of the
    /// session's window.
    async fn append(&self, session_id: &str, turns: Vec<Turn>) -> anyhow::Result<()>;

    async fn list_sessions(&self, limit: usize) -> anyhow::Result<Vec<SessionSummary>>;
}
