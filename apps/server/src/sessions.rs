//! In-memory wizard sessions, one per open booking dialog.

use booking_wizard::BookingWizard;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use uuid::Uuid;

pub struct SessionEntry {
    pub wizard: Mutex<BookingWizard>,
    last_seen: std::sync::Mutex<Instant>,
}

impl SessionEntry {
    fn new(wizard: BookingWizard) -> Self {
        Self {
            wizard: Mutex::new(wizard),
            last_seen: std::sync::Mutex::new(Instant::now()),
        }
    }

    pub fn touch(&self) {
        let mut last_seen = self.last_seen.lock().unwrap_or_else(|e| e.into_inner());
        *last_seen = Instant::now();
    }

    fn idle_for(&self, now: Instant) -> Duration {
        let last_seen = self.last_seen.lock().unwrap_or_else(|e| e.into_inner());
        now.saturating_duration_since(*last_seen)
    }
}

#[derive(Default)]
pub struct SessionStore {
    sessions: DashMap<Uuid, Arc<SessionEntry>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, wizard: BookingWizard) -> Uuid {
        let id = Uuid::new_v4();
        self.sessions.insert(id, Arc::new(SessionEntry::new(wizard)));
        id
    }

    /// Looks the session up and marks it as used.
    pub fn get(&self, id: &Uuid) -> Option<Arc<SessionEntry>> {
        let entry = self.sessions.get(id).map(|e| Arc::clone(e.value()))?;
        entry.touch();
        Some(entry)
    }

    pub fn remove(&self, id: &Uuid) -> bool {
        self.sessions.remove(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Drop sessions untouched for `idle`. Returns how many were dropped.
    pub fn sweep(&self, idle: Duration, now: Instant) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, entry| entry.idle_for(now) < idle);
        before.saturating_sub(self.sessions.len())
    }
}
