//! Per-surface session state and the store that owns it.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use pagehand_protocols::{
    ActionKind, ActionRecord, ChatMessage, GeneratedAction, PageSnapshot, ParsedIntent,
};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::time::{interval, Instant};
use tracing::{debug, info, warn};

use crate::retry::RetryContext;

/// Bounds applied to the store and to each session.
#[derive(Debug, Clone)]
pub struct SessionLimits {
    pub max_sessions: usize,
    pub idle_timeout: Duration,
    pub max_messages: usize,
    pub max_actions: usize,
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self {
            max_sessions: 50,
            idle_timeout: Duration::from_secs(30 * 60),
            max_messages: 50,
            max_actions: 100,
        }
    }
}

/// A question waiting for the user's answer.
#[derive(Debug, Clone)]
pub struct PendingClarification {
    /// The command that raised the question.
    pub command: String,
    pub question: String,
    pub options: Vec<String>,
    pub suggested_action: Option<ActionKind>,
    pub asked_at: DateTime<Utc>,
}

/// Flagged actions waiting for the user's approval.
#[derive(Debug, Clone)]
pub struct PendingConfirmation {
    pub command: String,
    pub intent: ParsedIntent,
    pub actions: Vec<GeneratedAction>,
    pub message: String,
    pub retry: RetryContext,
}

/// At most one outstanding interaction per session.
#[derive(Debug, Clone)]
pub enum PendingInteraction {
    Clarification(PendingClarification),
    Confirmation(PendingConfirmation),
}

/// Conversation and action history of one surface.
#[derive(Debug)]
pub struct Session {
    pub id: String,
    pub surface_id: String,
    messages: VecDeque<ChatMessage>,
    /// Snapshot whose element ids are currently resolvable.
    pub last_snapshot: Option<PageSnapshot>,
    action_history: VecDeque<ActionRecord>,
    pub pending: Option<PendingInteraction>,
    pub created_at: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
    max_messages: usize,
    max_actions: usize,
}

impl Session {
    pub fn new(surface_id: impl Into<String>, limits: &SessionLimits) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            surface_id: surface_id.into(),
            messages: VecDeque::new(),
            last_snapshot: None,
            action_history: VecDeque::new(),
            pending: None,
            created_at: now,
            last_active: now,
            max_messages: limits.max_messages,
            max_actions: limits.max_actions,
        }
    }

    pub fn touch(&mut self) {
        self.last_active = Utc::now();
    }

    /// Append a message, dropping the oldest past the bound.
    pub fn add_message(&mut self, message: ChatMessage) {
        self.messages.push_back(message);
        while self.messages.len() > self.max_messages {
            self.messages.pop_front();
        }
    }

    pub fn messages(&self) -> &VecDeque<ChatMessage> {
        &self.messages
    }

    /// The last `n` messages, oldest first.
    pub fn recent_messages(&self, n: usize) -> Vec<ChatMessage> {
        let skip = self.messages.len().saturating_sub(n);
        self.messages.iter().skip(skip).cloned().collect()
    }

    pub fn record_action(&mut self, action: GeneratedAction, success: bool) {
        self.action_history.push_back(ActionRecord::new(action, success));
        while self.action_history.len() > self.max_actions {
            self.action_history.pop_front();
        }
    }

    pub fn action_history(&self) -> &VecDeque<ActionRecord> {
        &self.action_history
    }

    pub fn set_snapshot(&mut self, snapshot: PageSnapshot) {
        self.last_snapshot = Some(snapshot);
    }

    pub fn pending_clarification(&self) -> Option<&PendingClarification> {
        match &self.pending {
            Some(PendingInteraction::Clarification(p)) => Some(p),
            _ => None,
        }
    }

    pub fn pending_confirmation(&self) -> Option<&PendingConfirmation> {
        match &self.pending {
            Some(PendingInteraction::Confirmation(p)) => Some(p),
            _ => None,
        }
    }
}

struct Entry {
    session: Arc<Mutex<Session>>,
    last_access: Instant,
    /// Access order; higher is more recent.
    seq: u64,
}

impl Entry {
    /// Nobody but the store holds the session.
    fn is_idle_owner(&self) -> bool {
        Arc::strong_count(&self.session) == 1
    }
}

/// Called with the surface id of every session the store drops.
pub type EvictionListener = Arc<dyn Fn(&str) + Send + Sync>;

/// Owns every session, keyed by surface id.
///
/// A caller holds the session's async lock for a whole command, so commands
/// on one surface queue behind each other while different surfaces run
/// concurrently. Eviction never touches a session someone holds.
pub struct SessionStore {
    entries: parking_lot::Mutex<HashMap<String, Entry>>,
    limits: SessionLimits,
    seq: AtomicU64,
    listeners: parking_lot::RwLock<Vec<EvictionListener>>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(SessionLimits::default())
    }
}

impl SessionStore {
    pub fn new(limits: SessionLimits) -> Self {
        Self {
            entries: parking_lot::Mutex::new(HashMap::new()),
            limits,
            seq: AtomicU64::new(0),
            listeners: parking_lot::RwLock::new(Vec::new()),
        }
    }

    /// Register a listener for dropped sessions.
    ///
    /// Listeners run after the store lock is released, for idle and capacity
    /// eviction as well as [`remove`](Self::remove).
    pub fn on_evict<F>(&self, listener: F)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.listeners.write().push(Arc::new(listener));
    }

    fn notify_evicted(&self, surfaces: &[String]) {
        if surfaces.is_empty() {
            return;
        }
        let listeners = self.listeners.read().clone();
        for surface in surfaces {
            for listener in &listeners {
                listener(surface);
            }
        }
    }

    pub fn limits(&self) -> &SessionLimits {
        &self.limits
    }

    /// Lock the session of `surface`, creating it if needed.
    ///
    /// Runs idle and capacity eviction first.
    pub async fn acquire(&self, surface: &str) -> OwnedMutexGuard<Session> {
        let (session, evicted) = {
            let mut entries = self.entries.lock();
            let now = Instant::now();
            let mut evicted = self.evict_idle(&mut entries, now);

            if !entries.contains_key(surface) {
                evicted.extend(
                    self.evict_for_capacity(&mut entries, self.limits.max_sessions.saturating_sub(1)),
                );
                debug!("Creating session for surface {}", surface);
            }

            let seq = self.seq.fetch_add(1, Ordering::SeqCst) + 1;
            let entry = entries
                .entry(surface.to_string())
                .or_insert_with(|| Entry {
                    session: Arc::new(Mutex::new(Session::new(surface, &self.limits))),
                    last_access: now,
                    seq,
                });
            entry.last_access = now;
            entry.seq = seq;
            (entry.session.clone(), evicted)
        };
        self.notify_evicted(&evicted);

        let mut guard = session.lock_owned().await;
        guard.touch();
        guard
    }

    pub fn contains(&self, surface: &str) -> bool {
        self.entries.lock().contains_key(surface)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn surfaces(&self) -> Vec<String> {
        self.entries.lock().keys().cloned().collect()
    }

    /// Destroy a session. In-flight holders keep their detached copy.
    pub fn remove(&self, surface: &str) -> bool {
        let removed = self.entries.lock().remove(surface).is_some();
        if removed {
            self.notify_evicted(&[surface.to_string()]);
        }
        removed
    }

    /// Evict idle sessions and trim to capacity. Returns the number evicted.
    pub fn cleanup(&self) -> usize {
        let evicted = {
            let mut entries = self.entries.lock();
            let mut evicted = self.evict_idle(&mut entries, Instant::now());
            evicted.extend(self.evict_for_capacity(&mut entries, self.limits.max_sessions));
            evicted
        };
        self.notify_evicted(&evicted);
        evicted.len()
    }

    fn evict_idle(&self, entries: &mut HashMap<String, Entry>, now: Instant) -> Vec<String> {
        let timeout = self.limits.idle_timeout;
        let mut evicted = Vec::new();
        entries.retain(|surface, entry| {
            let expired = now.duration_since(entry.last_access) >= timeout && entry.is_idle_owner();
            if expired {
                debug!("Evicting idle session for surface {}", surface);
                evicted.push(surface.clone());
            }
            !expired
        });
        evicted
    }

    /// Evict least recently used sessions until at most `target` remain.
    fn evict_for_capacity(&self, entries: &mut HashMap<String, Entry>, target: usize) -> Vec<String> {
        let mut evicted = Vec::new();
        while entries.len() > target {
            let oldest = entries
                .iter()
                .filter(|(_, entry)| entry.is_idle_owner())
                .min_by_key(|(_, entry)| entry.seq)
                .map(|(surface, _)| surface.clone());

            match oldest {
                Some(surface) => {
                    debug!("Evicting session for surface {} (capacity)", surface);
                    entries.remove(&surface);
                    evicted.push(surface);
                }
                None => {
                    warn!(
                        "Session store over capacity ({} > {}), all sessions busy",
                        entries.len(),
                        target
                    );
                    break;
                }
            }
        }
        evicted
    }
}

/// Background task running [`SessionStore::cleanup`] on an interval.
pub struct SessionCleaner {
    store: Arc<SessionStore>,
    interval: Duration,
}

impl SessionCleaner {
    pub fn new(store: Arc<SessionStore>, cleanup_interval: Duration) -> Self {
        Self {
            store,
            interval: cleanup_interval,
        }
    }

    /// Start the cleanup task.
    pub fn spawn(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = interval(self.interval);

            loop {
                ticker.tick().await;

                let count = self.store.cleanup();
                if count > 0 {
                    info!("Cleaned up {} expired sessions", count);
                }
            }
        })
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
