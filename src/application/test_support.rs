// Scripted transport shared by the application-layer tests
use crate::application::telemetry_transport::{
    PollResult, SendResult, TelemetryTransport, TransportError,
};
use crate::domain::reading::{Reading, SensorMetrics};
use crate::domain::session::{Credentials, Session};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use tokio::time::Instant;

/// Replays queued outcomes; once a queue is drained, submissions echo the
/// reading back (or fail, when built with `failing`) and fetches return an
/// empty list.
#[derive(Default)]
pub struct StubTransport {
    submit_outcomes: Mutex<VecDeque<SendResult>>,
    fetch_outcomes: Mutex<VecDeque<PollResult>>,
    always_fail: bool,
    submitted: Mutex<Vec<(Instant, Reading)>>,
    fetches: Mutex<Vec<Instant>>,
}

impl StubTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            always_fail: true,
            ..Self::default()
        }
    }

    pub fn with_submits(self, outcomes: Vec<SendResult>) -> Self {
        *self.submit_outcomes.lock().unwrap() = outcomes.into();
        self
    }

    pub fn with_fetches(self, outcomes: Vec<PollResult>) -> Self {
        *self.fetch_outcomes.lock().unwrap() = outcomes.into();
        self
    }

    pub fn submit_count(&self) -> usize {
        self.submitted.lock().unwrap().len()
    }

    pub fn submit_times(&self) -> Vec<Instant> {
        self.submitted.lock().unwrap().iter().map(|(at, _)| *at).collect()
    }

    pub fn submitted_readings(&self) -> Vec<Reading> {
        self.submitted
            .lock()
            .unwrap()
            .iter()
            .map(|(_, r)| r.clone())
            .collect()
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.lock().unwrap().len()
    }

    pub fn fetch_times(&self) -> Vec<Instant> {
        self.fetches.lock().unwrap().clone()
    }

    pub fn total_calls(&self) -> usize {
        self.submit_count() + self.fetch_count()
    }
}

#[async_trait]
impl TelemetryTransport for StubTransport {
    async fn submit_reading(&self, reading: &Reading, _credentials: &Credentials) -> SendResult {
        self.submitted
            .lock()
            .unwrap()
            .push((Instant::now(), reading.clone()));

        if let Some(outcome) = self.submit_outcomes.lock().unwrap().pop_front() {
            return outcome;
        }
        if self.always_fail {
            return Err(unavailable());
        }
        serde_json::to_value(reading).map_err(|e| TransportError::Malformed(e.to_string()))
    }

    async fn fetch_latest(
        &self,
        _pond_code: &str,
        _user_id: &str,
        _credentials: &Credentials,
    ) -> PollResult {
        self.fetches.lock().unwrap().push(Instant::now());

        if let Some(outcome) = self.fetch_outcomes.lock().unwrap().pop_front() {
            return outcome;
        }
        if self.always_fail {
            return Err(unavailable());
        }
        Ok(Vec::new())
    }
}

pub fn unavailable() -> TransportError {
    TransportError::Status {
        status: 503,
        body: "unavailable".to_string(),
    }
}

pub fn session() -> Session {
    Session::new(
        "42".to_string(),
        "operator".to_string(),
        "POND-7".to_string(),
        Credentials::new("token-abc"),
    )
}

pub fn reading(pv_voltage: f64) -> Reading {
    Reading::new(
        "POND-7".to_string(),
        "42".to_string(),
        SensorMetrics {
            pv_voltage,
            ..Default::default()
        },
    )
}
