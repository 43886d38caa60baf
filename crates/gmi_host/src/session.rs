//! Host sessions.
//!
//! A session holds the transcript of one conversation. Turns on the same
//! session id run one at a time: the stream holds the session lock for the
//! whole turn. Different session ids never share state.
//!
//! The store holds at most `max_sessions` sessions. Creating one more evicts
//! the least recently used session that no turn is holding.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Default cap on sessions kept in memory.
pub const DEFAULT_MAX_SESSIONS: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub speaker: Speaker,
    pub text: String,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub transcript: Vec<Turn>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            transcript: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn record(&mut self, speaker: Speaker, text: impl Into<String>) {
        self.transcript.push(Turn {
            speaker,
            text: text.into(),
            at: Utc::now(),
        });
    }

    /// Transcript as `User:` / `Assistant:` lines for a prompt.
    pub fn render(&self) -> String {
        self.transcript
            .iter()
            .map(|turn| match turn.speaker {
                Speaker::User => format!("User: {}", turn.text),
                Speaker::Assistant => format!("Assistant: {}", turn.text),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

type SharedSession = Arc<tokio::sync::Mutex<Session>>;

struct Slot {
    session: SharedSession,
    last_used: u64,
}

#[derive(Default)]
struct Slots {
    by_id: HashMap<String, Slot>,
    clock: u64,
}

/// Sessions by id, created on first use.
pub struct SessionStore {
    slots: Mutex<Slots>,
    max_sessions: usize,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_MAX_SESSIONS)
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store keeping at most `max_sessions` sessions (at least one).
    pub fn with_capacity(max_sessions: usize) -> Self {
        Self {
            slots: Mutex::new(Slots::default()),
            max_sessions: max_sessions.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.max_sessions
    }

    /// Look up a session, creating an empty one if absent.
    pub fn get_or_create(&self, id: &str) -> SharedSession {
        let mut slots = self.slots.lock();
        slots.clock += 1;
        let now = slots.clock;

        if let Some(slot) = slots.by_id.get_mut(id) {
            slot.last_used = now;
            return slot.session.clone();
        }

        while slots.by_id.len() >= self.max_sessions {
            // A session is idle when the store holds its only handle.
            let idle = slots
                .by_id
                .iter()
                .filter(|(_, slot)| Arc::strong_count(&slot.session) == 1)
                .min_by_key(|(_, slot)| slot.last_used)
                .map(|(key, _)| key.clone());
            let Some(key) = idle else {
                warn!(
                    max_sessions = self.max_sessions,
                    "Every session is busy; exceeding the session cap"
                );
                break;
            };
            slots.by_id.remove(&key);
            debug!(session = %key, "Evicted idle session");
        }

        let session = Arc::new(tokio::sync::Mutex::new(Session::new(id)));
        slots.by_id.insert(
            id.to_string(),
            Slot {
                session: session.clone(),
                last_used: now,
            },
        );
        session
    }

    pub fn contains(&self, id: &str) -> bool {
        self.slots.lock().by_id.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.slots.lock().by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.lock().by_id.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_or_create_reuses_session() {
        let store = SessionStore::new();
        {
            let session = store.get_or_create("s-1");
            session.lock().await.record(Speaker::User, "hello");
        }
        let again = store.get_or_create("s-1");
        assert_eq!(again.lock().await.transcript.len(), 1);

        let other = store.get_or_create("s-2");
        assert!(other.lock().await.transcript.is_empty());
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_least_recently_used_idle_session_is_evicted() {
        let store = SessionStore::with_capacity(2);
        store.get_or_create("a");
        store.get_or_create("b");
        store.get_or_create("a");

        store.get_or_create("c");

        assert_eq!(store.len(), 2);
        assert!(store.contains("a"));
        assert!(!store.contains("b"));
        assert!(store.contains("c"));
    }

    #[test]
    fn test_busy_session_is_kept() {
        let store = SessionStore::with_capacity(1);
        let held = store.get_or_create("a");

        store.get_or_create("b");

        assert!(store.contains("a"));
        assert_eq!(store.len(), 2);
        drop(held);

        store.get_or_create("c");
        assert_eq!(store.len(), 1);
        assert!(store.contains("c"));
    }

    #[test]
    fn test_render() {
        let mut session = Session::new("s");
        session.record(Speaker::User, "Plan a launch");
        session.record(Speaker::Assistant, "Contacted the PM agent");
        assert_eq!(
            session.render(),
            "User: Plan a launch\nAssistant: Contacted the PM agent"
        );
    }
}
