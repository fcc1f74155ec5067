// Connection health - last-writer-wins state with periodic staleness checks
use crate::domain::connection::ConnectionState;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy)]
pub struct HealthPolicy {
    /// How often staleness is re-evaluated.
    pub tick: Duration,
    /// Silence longer than this while active forces `timeout`.
    pub freshness_window: Duration,
}

impl Default for HealthPolicy {
    fn default() -> Self {
        Self {
            tick: Duration::from_secs(10),
            freshness_window: Duration::from_secs(60),
        }
    }
}

/// Point-in-time view for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthSnapshot {
    pub state: ConnectionState,
    pub last_error: Option<String>,
    pub last_success_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
struct Tracker {
    active_since: Option<Instant>,
    last_success: Option<Instant>,
    last_success_at: Option<DateTime<Utc>>,
    last_error: Option<String>,
}

struct HealthInner {
    state: watch::Sender<ConnectionState>,
    tracker: Mutex<Tracker>,
}

/// Shared connection state for one process.
///
/// Writers are the sender, poller and simulated source; the monitor task
/// re-asserts `timeout` on its own cadence. Every write replaces the previous
/// state. Signals that arrive while no session is active are dropped.
#[derive(Clone)]
pub struct ConnectionHealth {
    inner: Arc<HealthInner>,
}

impl Default for ConnectionHealth {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionHealth {
    pub fn new() -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            inner: Arc::new(HealthInner {
                state,
                tracker: Mutex::new(Tracker::default()),
            }),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state.subscribe()
    }

    pub fn state(&self) -> ConnectionState {
        *self.inner.state.borrow()
    }

    pub fn snapshot(&self) -> HealthSnapshot {
        let tracker = self.lock();
        HealthSnapshot {
            state: self.state(),
            last_error: tracker.last_error.clone(),
            last_success_at: tracker.last_success_at,
        }
    }

    /// Session became active. Optimistically reports `connected` until the
    /// first real exchange says otherwise.
    pub fn activate(&self) {
        let mut tracker = self.lock();
        *tracker = Tracker {
            active_since: Some(Instant::now()),
            ..Tracker::default()
        };
        self.set(ConnectionState::Connected);
    }

    pub fn deactivate(&self) {
        let mut tracker = self.lock();
        *tracker = Tracker::default();
        self.set(ConnectionState::Disconnected);
    }

    pub fn mark_sending(&self) {
        let tracker = self.lock();
        if tracker.active_since.is_some() {
            self.set(ConnectionState::Sending);
        }
    }

    pub fn record_send_success(&self) {
        let mut tracker = self.lock();
        if tracker.active_since.is_none() {
            return;
        }
        Self::touch(&mut tracker);
        tracker.last_error = None;
        self.set(ConnectionState::Connected);
    }

    pub fn record_send_failure(&self, error: impl Into<String>) {
        let mut tracker = self.lock();
        if tracker.active_since.is_none() {
            return;
        }
        tracker.last_error = Some(error.into());
        self.set(ConnectionState::Error);
    }

    /// A poll delivered a reading. Only the freshness timestamp moves.
    pub fn record_poll_success(&self) {
        let mut tracker = self.lock();
        if tracker.active_since.is_some() {
            Self::touch(&mut tracker);
        }
    }

    /// Force `timeout` when the last success (or activation, before any
    /// success) is older than `freshness_window`. Returns the resulting state.
    pub fn evaluate(&self, freshness_window: Duration) -> ConnectionState {
        let tracker = self.lock();
        let reference = tracker.last_success.or(tracker.active_since);

        if let Some(reference) = reference {
            let silent_for = Instant::now().saturating_duration_since(reference);
            if silent_for > freshness_window {
                if self.state() != ConnectionState::Timeout {
                    tracing::warn!(
                        silent_ms = silent_for.as_millis() as u64,
                        "no successful exchange within freshness window"
                    );
                }
                self.set(ConnectionState::Timeout);
            }
        }

        self.state()
    }

    fn touch(tracker: &mut Tracker) {
        tracker.last_success = Some(Instant::now());
        tracker.last_success_at = Some(Utc::now());
    }

    // Transitions are logged by whoever subscribes.
    fn set(&self, next: ConnectionState) {
        self.inner.state.send_replace(next);
    }

    fn lock(&self) -> MutexGuard<'_, Tracker> {
        // Tracker fields stay valid even if a writer panicked.
        self.inner
            .tracker
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Re-evaluate staleness every `policy.tick` until cancelled.
pub async fn run_health_monitor(
    health: ConnectionHealth,
    policy: HealthPolicy,
    cancel: CancellationToken,
) {
    let mut interval = tokio::time::interval(policy.tick);
    interval.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {
                health.evaluate(policy.freshness_window);
            }
        }
    }

    tracing::debug!("health monitor stopped");
}
