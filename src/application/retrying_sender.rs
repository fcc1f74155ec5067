// Retrying sender - bounded, fixed-delay retries around submit_reading
use crate::application::health_monitor::ConnectionHealth;
use crate::application::telemetry_transport::{TelemetryTransport, TransportError};
use crate::domain::reading::Reading;
use crate::domain::session::Credentials;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Constant wait between a failed attempt and the next.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SendError {
    /// Identifying data was missing; no attempt was made.
    #[error("cannot submit reading: missing {0}")]
    Precondition(&'static str),

    #[error("submission failed after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: TransportError },
}

#[derive(Clone)]
pub struct RetryingSender {
    transport: Arc<dyn TelemetryTransport>,
    policy: RetryPolicy,
    health: Option<ConnectionHealth>,
}

impl RetryingSender {
    pub fn new(transport: Arc<dyn TelemetryTransport>, policy: RetryPolicy) -> Self {
        Self {
            transport,
            policy,
            health: None,
        }
    }

    /// Report `sending` to `health` at the start of every attempt.
    pub fn with_health(mut self, health: ConnectionHealth) -> Self {
        self.health = Some(health);
        self
    }

    /// Stamp `reading` with the current instant and submit it, retrying
    /// failed attempts after a fixed delay. Returns the server payload of the
    /// first successful attempt.
    pub async fn send(
        &self,
        reading: Reading,
        credentials: &Credentials,
    ) -> Result<serde_json::Value, SendError> {
        if reading.code.trim().is_empty() {
            return Err(SendError::Precondition("pond code"));
        }
        if reading.user_id.trim().is_empty() {
            return Err(SendError::Precondition("user id"));
        }
        if !credentials.is_present() {
            return Err(SendError::Precondition("token"));
        }

        let reading = reading.stamped(Utc::now());
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            if let Some(health) = &self.health {
                health.mark_sending();
            }

            let err = match self.transport.submit_reading(&reading, credentials).await {
                Ok(payload) => {
                    tracing::debug!(code = %reading.code, attempt, "reading submitted");
                    return Ok(payload);
                }
                Err(err) => err,
            };

            if attempt >= max_attempts {
                tracing::error!(code = %reading.code, attempts = attempt, error = %err, "giving up on reading");
                return Err(SendError::Exhausted {
                    attempts: attempt,
                    last: err,
                });
            }

            tracing::warn!(
                code = %reading.code,
                attempt,
                max_attempts,
                error = %err,
                "submit failed, retrying in {:?}",
                self.policy.delay
            );
            tokio::time::sleep(self.policy.delay).await;
            attempt += 1;
        }
    }
}
