// HTTP transport for the remote monitoring API
use crate::application::telemetry_transport::{
    PollResult, SendResult, TelemetryTransport, TransportError,
};
use crate::domain::reading::Reading;
use crate::domain::session::Credentials;
use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;

const SUBMIT_PATH: &str = "/monitoring/micro/sensors";
const LATEST_PATH: &str = "/monitoring/sensors/latest";

#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

/// Every API response is wrapped as `{ status, payload }`; only the payload
/// is used.
#[derive(Debug, Deserialize)]
struct ApiEnvelope<T> {
    payload: Option<T>,
}

impl HttpTransport {
    pub fn new(base_url: String, request_timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn build_latest_url(&self, pond_code: &str, user_id: &str) -> String {
        format!(
            "{}{}?code={}&id={}",
            self.base_url,
            LATEST_PATH,
            urlencoding::encode(pond_code),
            urlencoding::encode(user_id)
        )
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        credentials: &Credentials,
    ) -> Result<Option<T>, TransportError> {
        let response = request
            .header(AUTHORIZATION, credentials.bearer())
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let envelope: ApiEnvelope<T> =
            serde_json::from_str(&body).map_err(|e| TransportError::Malformed(e.to_string()))?;

        Ok(envelope.payload)
    }
}

#[async_trait]
impl TelemetryTransport for HttpTransport {
    async fn submit_reading(&self, reading: &Reading, credentials: &Credentials) -> SendResult {
        let url = format!("{}{}", self.base_url, SUBMIT_PATH);
        tracing::debug!(%url, code = %reading.code, "submitting reading");

        let request = self.client.post(&url).json(reading);
        let payload = self.execute::<serde_json::Value>(request, credentials).await?;

        Ok(payload.unwrap_or(serde_json::Value::Null))
    }

    async fn fetch_latest(
        &self,
        pond_code: &str,
        user_id: &str,
        credentials: &Credentials,
    ) -> PollResult {
        let url = self.build_latest_url(pond_code, user_id);
        tracing::debug!(%url, "fetching latest reading");

        let request = self.client.get(&url);
        let readings = self.execute::<Vec<Reading>>(request, credentials).await?;

        Ok(readings.unwrap_or_default())
    }
}
