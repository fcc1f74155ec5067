// Transport trait for the remote telemetry API
use crate::domain::reading::Reading;
use crate::domain::session::Credentials;
use async_trait::async_trait;
use thiserror::Error;

/// Why a single exchange with the remote API failed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransportError {
    #[error("network error: {0}")]
    Network(String),

    #[error("server replied with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed response: {0}")]
    Malformed(String),
}

/// Outcome of one submission: the decoded server payload or the failure.
pub type SendResult = Result<serde_json::Value, TransportError>;

/// Outcome of one fetch: readings ordered newest first, possibly empty.
pub type PollResult = Result<Vec<Reading>, TransportError>;

#[async_trait]
pub trait TelemetryTransport: Send + Sync {
    /// Submit a stamped reading. All failures are returned as values.
    async fn submit_reading(&self, reading: &Reading, credentials: &Credentials) -> SendResult;

    /// Fetch the latest readings for a pond owned by `user_id`.
    /// An empty list is a successful result.
    async fn fetch_latest(
        &self,
        pond_code: &str,
        user_id: &str,
        credentials: &Credentials,
    ) -> PollResult;
}
