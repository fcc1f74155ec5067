// Poller - fetches the latest reading on a fixed cadence
use crate::application::health_monitor::ConnectionHealth;
use crate::application::telemetry_transport::TelemetryTransport;
use crate::domain::reading::Reading;
use crate::domain::session::Session;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Receives each newly fetched reading.
pub type ReadingConsumer = Arc<dyn Fn(Reading) + Send + Sync>;

pub struct Poller {
    transport: Arc<dyn TelemetryTransport>,
    session: Session,
    interval: Duration,
    consumer: ReadingConsumer,
    health: Option<ConnectionHealth>,
}

impl Poller {
    pub fn new(
        transport: Arc<dyn TelemetryTransport>,
        session: Session,
        interval: Duration,
        consumer: ReadingConsumer,
    ) -> Self {
        Self {
            transport,
            session,
            interval,
            consumer,
            health: None,
        }
    }

    pub fn with_health(mut self, health: ConnectionHealth) -> Self {
        self.health = Some(health);
        self
    }

    /// Fetch once and deliver the newest reading, if any. Failures and empty
    /// results deliver nothing and leave the freshness timestamp untouched.
    pub async fn poll_once(&self) -> Option<Reading> {
        if let Some(field) = self.session.missing_field() {
            tracing::debug!(missing = field, "skipping poll");
            return None;
        }

        let result = self
            .transport
            .fetch_latest(
                &self.session.pond_code,
                &self.session.user_id,
                &self.session.credentials,
            )
            .await;

        let newest = match result {
            Ok(readings) => readings.into_iter().next(),
            Err(e) => {
                tracing::warn!(code = %self.session.pond_code, error = %e, "poll failed");
                return None;
            }
        };

        let Some(reading) = newest else {
            tracing::debug!(code = %self.session.pond_code, "no readings yet");
            return None;
        };

        if let Some(health) = &self.health {
            health.record_poll_success();
        }
        (self.consumer)(reading.clone());
        Some(reading)
    }

    /// Poll immediately, then every `interval` until `cancel` fires. A fetch
    /// that is still running when cancelled is dropped and its result never
    /// delivered.
    pub async fn run(self, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = interval.tick() => {}
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = self.poll_once() => {}
            }
        }

        tracing::debug!(code = %self.session.pond_code, "poller stopped");
    }
}
