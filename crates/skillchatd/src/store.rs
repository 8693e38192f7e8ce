//! In-memory transcript store.
//!
//! Maps a caller-chosen session id to its append-only list of turns. Sessions
//! are created implicitly on first append; reads of unknown sessions return an
//! empty list and create nothing.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use skillchat_core::Turn;
use tracing::info;

#[derive(Debug, Default)]
struct SessionEntry {
    turns: Vec<Turn>,
    /// Logical clock value of the last append, for eviction.
    last_touched: u64,
}

impl SessionEntry {
    /// Append, clamping the timestamp so it never goes backwards.
    fn push(&mut self, mut turn: Turn) {
        if let Some(last) = self.turns.last() {
            if turn.timestamp < last.timestamp {
                turn.timestamp = last.timestamp;
            }
        }
        self.turns.push(turn);
    }
}

#[derive(Debug, Default)]
struct Inner {
    sessions: HashMap<String, SessionEntry>,
    clock: u64,
}

/// Shared store of conversation transcripts.
#[derive(Debug, Default)]
pub struct TranscriptStore {
    inner: RwLock<Inner>,
    /// 0 means unbounded.
    max_sessions: usize,
}

impl TranscriptStore {
    /// Store that keeps every session for the lifetime of the process.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store holding at most `max_sessions` sessions (0 = unbounded). When full,
    /// creating a session evicts the one appended to least recently.
    pub fn with_max_sessions(max_sessions: usize) -> Self {
        Self {
            inner: RwLock::default(),
            max_sessions,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Turns of a session in conversation order; empty if the session is unknown.
    pub fn get(&self, session_id: &str) -> Vec<Turn> {
        self.turns_if_exists(session_id).unwrap_or_default()
    }

    /// Same as [`TranscriptStore::get`].
    pub fn all_turns(&self, session_id: &str) -> Vec<Turn> {
        self.get(session_id)
    }

    /// Turns of a session, or `None` if it has never been appended to.
    pub fn turns_if_exists(&self, session_id: &str) -> Option<Vec<Turn>> {
        self.read()
            .sessions
            .get(session_id)
            .map(|entry| entry.turns.clone())
    }

    pub fn contains(&self, session_id: &str) -> bool {
        self.read().sessions.contains_key(session_id)
    }

    pub fn session_count(&self) -> usize {
        self.read().sessions.len()
    }

    pub fn turn_count(&self, session_id: &str) -> usize {
        self.read()
            .sessions
            .get(session_id)
            .map_or(0, |entry| entry.turns.len())
    }

    /// Append one turn, creating the session if needed.
    pub fn append(&self, session_id: &str, turn: Turn) {
        let mut inner = self.write();
        self.entry(&mut inner, session_id).push(turn);
    }

    /// Append a user turn and its reply under a single lock, in that order.
    pub fn append_exchange(&self, session_id: &str, user: Turn, assistant: Turn) {
        let mut inner = self.write();
        let entry = self.entry(&mut inner, session_id);
        entry.push(user);
        entry.push(assistant);
    }

    fn entry<'a>(&self, inner: &'a mut Inner, session_id: &str) -> &'a mut SessionEntry {
        inner.clock += 1;
        let clock = inner.clock;

        if self.max_sessions > 0
            && inner.sessions.len() >= self.max_sessions
            && !inner.sessions.contains_key(session_id)
        {
            Self::evict_oldest(inner);
        }

        let entry = inner
            .sessions
            .entry(session_id.to_string())
            .or_default();
        entry.last_touched = clock;
        entry
    }

    fn evict_oldest(inner: &mut Inner) {
        let oldest = inner
            .sessions
            .iter()
            .min_by_key(|(_, entry)| entry.last_touched)
            .map(|(id, _)| id.clone());

        if let Some(id) = oldest {
            if let Some(entry) = inner.sessions.remove(&id) {
                info!(
                    session_id = %id,
                    turns = entry.turns.len(),
                    "evicted least recently used session"
                );
            }
        }
    }
}
