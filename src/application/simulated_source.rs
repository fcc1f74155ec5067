// Simulated source - stands in for the pond controller when no device is attached
use crate::application::health_monitor::ConnectionHealth;
use crate::application::retrying_sender::{RetryingSender, SendError};
use crate::domain::reading::{Reading, SensorMetrics};
use crate::domain::session::Session;
use rand::Rng;
use std::ops::RangeInclusive;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Plausible ranges for a 12 V solar-powered aerator rig in a warm pond.
pub mod ranges {
    use std::ops::RangeInclusive;

    pub const PV_VOLTAGE: RangeInclusive<f64> = 12.0..=14.0;
    pub const PV_CURRENT: RangeInclusive<f64> = 0.5..=3.0;
    pub const PV_POWER: RangeInclusive<f64> = 6.0..=42.0;
    pub const BATTERY_VOLTAGE: RangeInclusive<f64> = 11.8..=13.0;
    pub const BATTERY_CURRENT: RangeInclusive<f64> = 0.2..=2.0;
    pub const BATTERY_PERCENTAGE: RangeInclusive<f64> = 60.0..=100.0;
    pub const LOAD_VOLTAGE: RangeInclusive<f64> = 11.5..=12.8;
    pub const LOAD_CURRENT: RangeInclusive<f64> = 0.1..=1.5;
    pub const LOAD_POWER: RangeInclusive<f64> = 1.0..=19.0;
    /// Degrees Celsius.
    pub const WATER_TEMPERATURE: RangeInclusive<f64> = 26.0..=31.0;
    pub const PH: RangeInclusive<f64> = 6.5..=8.5;
    /// mg/L.
    pub const DISSOLVED_OXYGEN: RangeInclusive<f64> = 4.0..=8.0;
    /// NTU.
    pub const TURBIDITY: RangeInclusive<f64> = 10.0..=40.0;
}

fn sample(rng: &mut impl Rng, range: RangeInclusive<f64>) -> f64 {
    (rng.random_range(range) * 100.0).round() / 100.0
}

pub fn synthesize_metrics(rng: &mut impl Rng) -> SensorMetrics {
    SensorMetrics {
        pv_voltage: sample(rng, ranges::PV_VOLTAGE),
        pv_current: sample(rng, ranges::PV_CURRENT),
        pv_power: sample(rng, ranges::PV_POWER),
        battery_voltage: sample(rng, ranges::BATTERY_VOLTAGE),
        battery_current: sample(rng, ranges::BATTERY_CURRENT),
        battery_percentage: sample(rng, ranges::BATTERY_PERCENTAGE),
        load_voltage: sample(rng, ranges::LOAD_VOLTAGE),
        load_current: sample(rng, ranges::LOAD_CURRENT),
        load_power: sample(rng, ranges::LOAD_POWER),
        water_temperature: sample(rng, ranges::WATER_TEMPERATURE),
        ph: sample(rng, ranges::PH),
        dissolved_oxygen: sample(rng, ranges::DISSOLVED_OXYGEN),
        turbidity: sample(rng, ranges::TURBIDITY),
    }
}

pub struct SimulatedSource {
    sender: RetryingSender,
    session: Session,
    interval: Duration,
    health: Option<ConnectionHealth>,
}

impl SimulatedSource {
    pub fn new(sender: RetryingSender, session: Session, interval: Duration) -> Self {
        Self {
            sender,
            session,
            interval,
            health: None,
        }
    }

    pub fn with_health(mut self, health: ConnectionHealth) -> Self {
        self.health = Some(health);
        self
    }

    pub fn synthesize(&self) -> Reading {
        let metrics = synthesize_metrics(&mut rand::rng());
        Reading::new(
            self.session.pond_code.clone(),
            self.session.user_id.clone(),
            metrics,
        )
    }

    /// Synthesize one reading and push it through the sender, reporting the
    /// overall outcome to the health monitor.
    pub async fn emit_once(&self) -> Result<serde_json::Value, SendError> {
        if let Some(field) = self.session.missing_field() {
            tracing::debug!(missing = field, "skipping simulated reading");
            return Err(SendError::Precondition(field));
        }

        let reading = self.synthesize();
        let result = self.sender.send(reading, &self.session.credentials).await;

        if let Some(health) = &self.health {
            match &result {
                Ok(_) => health.record_send_success(),
                Err(e @ SendError::Exhausted { .. }) => health.record_send_failure(e.to_string()),
                Err(SendError::Precondition(_)) => {}
            }
        }

        match &result {
            Ok(_) => tracing::info!(code = %self.session.pond_code, "simulated reading delivered"),
            Err(e) => tracing::warn!(code = %self.session.pond_code, error = %e, "simulated reading dropped"),
        }

        result
    }

    /// Emit a reading every `interval`, starting one interval after launch.
    pub async fn run(self, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        interval.tick().await; // consume the immediate first tick

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = interval.tick() => {}
            }

            // Dropping the send on cancellation also abandons pending retries.
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = self.emit_once() => {}
            }
        }

        tracing::debug!(code = %self.session.pond_code, "simulated source stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::retrying_sender::RetryPolicy;
    use crate::application::test_support::{session, StubTransport};
    use crate::domain::connection::ConnectionState;
    use crate::domain::session::Credentials;
    use std::sync::Arc;

    fn source(stub: &Arc<StubTransport>, health: &ConnectionHealth) -> SimulatedSource {
        let sender = RetryingSender::new(stub.clone(), RetryPolicy::default())
            .with_health(health.clone());
        SimulatedSource::new(sender, session(), Duration::from_secs(30)).with_health(health.clone())
    }

    #[test]
    fn test_metrics_stay_in_range() {
        let mut rng = rand::rng();
        for _ in 0..200 {
            let m = synthesize_metrics(&mut rng);
            assert!(ranges::PV_VOLTAGE.contains(&m.pv_voltage));
            assert!(ranges::BATTERY_PERCENTAGE.contains(&m.battery_percentage));
            assert!(ranges::WATER_TEMPERATURE.contains(&m.water_temperature));
            assert!(ranges::PH.contains(&m.ph));
            assert!(ranges::DISSOLVED_OXYGEN.contains(&m.dissolved_oxygen));
            assert!(ranges::TURBIDITY.contains(&m.turbidity));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_synthesized_reading_is_unstamped() {
        let stub = Arc::new(StubTransport::new());
        let reading = source(&stub, &ConnectionHealth::new()).synthesize();

        assert_eq!(reading.code, "POND-7");
        assert_eq!(reading.user_id, "42");
        assert!(reading.timestamp.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_marks_connected() {
        let stub = Arc::new(StubTransport::new());
        let health = ConnectionHealth::new();
        health.activate();

        assert!(source(&stub, &health).emit_once().await.is_ok());

        let snapshot = health.snapshot();
        assert_eq!(snapshot.state, ConnectionState::Connected);
        assert!(snapshot.last_success_at.is_some());
        assert!(stub.submitted_readings()[0].timestamp.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_marks_error() {
        let stub = Arc::new(StubTransport::failing());
        let health = ConnectionHealth::new();
        health.activate();

        assert!(source(&stub, &health).emit_once().await.is_err());

        let snapshot = health.snapshot();
        assert_eq!(snapshot.state, ConnectionState::Error);
        assert!(snapshot.last_error.unwrap().contains("after 3 attempts"));
        assert_eq!(snapshot.last_success_at, None);
        assert_eq!(stub.submit_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_token_skips_send() {
        let stub = Arc::new(StubTransport::new());
        let health = ConnectionHealth::new();
        health.activate();
        let sender = RetryingSender::new(stub.clone(), RetryPolicy::default())
            .with_health(health.clone());
        let mut session = session();
        session.credentials = Credentials::new("");
        let source = SimulatedSource::new(sender, session, Duration::from_secs(30))
            .with_health(health.clone());

        let err = source.emit_once().await.unwrap_err();

        assert_eq!(err, SendError::Precondition("token"));
        assert_eq!(stub.submit_count(), 0);
        let snapshot = health.snapshot();
        assert_eq!(snapshot.state, ConnectionState::Connected);
        assert_eq!(snapshot.last_error, None);
        assert_eq!(snapshot.last_success_at, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_waits_one_interval() {
        let stub = Arc::new(StubTransport::new());
        let health = ConnectionHealth::new();
        health.activate();
        let cancel = CancellationToken::new();

        let task = tokio::spawn(source(&stub, &health).run(cancel.clone()));

        tokio::time::sleep(Duration::from_secs(29)).await;
        assert_eq!(stub.submit_count(), 0);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(stub.submit_count(), 1);

        cancel.cancel();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_abandons_pending_retries() {
        let stub = Arc::new(StubTransport::failing());
        let health = ConnectionHealth::new();
        health.activate();
        let cancel = CancellationToken::new();

        let task = tokio::spawn(source(&stub, &health).run(cancel.clone()));

        // First attempt at 30s, next retry would be at 35s.
        tokio::time::sleep(Duration::from_secs(31)).await;
        assert_eq!(stub.submit_count(), 1);

        cancel.cancel();
        task.await.unwrap();

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(stub.submit_count(), 1);
    }
}
