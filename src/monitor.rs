//! Change polling over tracked issues.
//!
//! The monitor observes state, it does not own it: each tracked key carries
//! the last status seen, and a poll cycle emits exactly one event per
//! detected transition. The first observation of a key only seeds its
//! state. A fetch failure for one key never blocks the others; the failing
//! key keeps its previous state and is retried on the next cycle.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, watch, Mutex};
use tracing::{debug, instrument, warn};

use crate::api::transport::Transport;
use crate::issues::IssueRepository;

/// Last-known status for a tracked issue.
#[derive(Debug, Clone)]
struct ObservedState {
    status: String,
    last_seen_at: DateTime<Utc>,
}

/// A detected status transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityEvent {
    pub issue_key: String,
    pub previous_status: String,
    pub new_status: String,
    pub observed_at: DateTime<Utc>,
}

/// Polls tracked issues and emits status-transition events.
pub struct ActivityMonitor<T> {
    repository: Arc<IssueRepository<T>>,
    interval: Duration,
    /// `None` means tracked but not yet observed.
    tracked: Mutex<HashMap<String, Option<ObservedState>>>,
}

impl<T: Transport> ActivityMonitor<T> {
    pub fn new(repository: Arc<IssueRepository<T>>, interval: Duration) -> Self {
        Self {
            repository,
            interval,
            tracked: Mutex::new(HashMap::new()),
        }
    }

    /// Begin polling an issue. Tracking an already-tracked key keeps its
    /// observed state.
    pub async fn track(&self, key: &str) {
        let mut tracked = self.tracked.lock().await;
        tracked.entry(key.to_string()).or_insert(None);
        debug!(issue_key = %key, "tracking issue");
    }

    /// Stop polling an issue and drop its observed state.
    pub async fn untrack(&self, key: &str) {
        let mut tracked = self.tracked.lock().await;
        if tracked.remove(key).is_some() {
            debug!(issue_key = %key, "untracked issue");
        }
    }

    /// The keys currently being polled.
    pub async fn tracked(&self) -> Vec<String> {
        self.tracked.lock().await.keys().cloned().collect()
    }

    /// When `key` was last successfully observed, if ever.
    pub async fn last_seen(&self, key: &str) -> Option<DateTime<Utc>> {
        self.tracked
            .lock()
            .await
            .get(key)
            .and_then(|state| state.as_ref())
            .map(|state| state.last_seen_at)
    }

    /// One observation cycle over every tracked key.
    ///
    /// Each key's state update is atomic: the new status is stored in the
    /// same critical section that decides whether to emit, so cancelling
    /// the cycle mid-way leaves every key either fully updated or
    /// untouched, and a key never produces two events for one transition.
    #[instrument(skip(self))]
    pub async fn poll_tick(&self) -> Vec<ActivityEvent> {
        let keys: Vec<String> = {
            let tracked = self.tracked.lock().await;
            tracked.keys().cloned().collect()
        };

        let mut events = Vec::new();
        for key in keys {
            let issue = match self.repository.get(&key).await {
                Ok(issue) => issue,
                Err(e) => {
                    warn!(issue_key = %key, error = %e, "poll fetch failed, retrying next cycle");
                    continue;
                }
            };

            let status = issue.fields.status;
            let observed_at = Utc::now();

            let mut tracked = self.tracked.lock().await;
            // The key may have been untracked while the fetch was in flight.
            let Some(entry) = tracked.get_mut(&key) else {
                continue;
            };

            let previous = entry.take();
            *entry = Some(ObservedState {
                status: status.clone(),
                last_seen_at: observed_at,
            });

            match previous {
                Some(prev) if prev.status != status => {
                    debug!(issue_key = %key, from = %prev.status, to = %status, "status changed");
                    events.push(ActivityEvent {
                        issue_key: key,
                        previous_status: prev.status,
                        new_status: status,
                        observed_at,
                    });
                }
                Some(_) => {}
                None => {
                    debug!(issue_key = %key, status = %status, "seeded observed state");
                }
            }
        }
        events
    }

    /// Poll on a timer, delivering events over `events`.
    ///
    /// Stops when `shutdown` flips to true, its sender is dropped, or the
    /// event receiver goes away. Tracking state survives a stop, so the
    /// loop can be restarted where it left off.
    #[instrument(skip_all)]
    pub async fn run(
        &self,
        events: mpsc::Sender<ActivityEvent>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        if *shutdown.borrow() {
            return;
        }
        debug!(interval_secs = self.interval.as_secs(), "monitor started");
        loop {
            tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        debug!("monitor stopping");
                        return;
                    }
                }
                _ = tokio::time::sleep(self.interval) => {
                    for event in self.poll_tick().await {
                        if events.send(event).await.is_err() {
                            debug!("event receiver dropped, monitor stopping");
                            return;
                        }
                    }
                }
            }
        }
    }
}
