use crate::application::health_monitor::HealthPolicy;
use crate::application::retrying_sender::RetryPolicy;
use crate::application::sync_controller::SyncSchedule;
use crate::domain::session::{Credentials, Session};
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct SyncConfig {
    pub api: ApiSettings,
    #[serde(default)]
    pub session: SessionSettings,
    #[serde(default)]
    pub schedule: ScheduleSettings,
    #[serde(default)]
    pub server: ServerSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiSettings {
    pub base_url: String,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct SessionSettings {
    pub user_id: String,
    pub username: String,
    pub pond_code: String,
    pub token: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ScheduleSettings {
    pub send_interval_ms: u64,
    pub poll_interval_ms: u64,
    pub health_interval_ms: u64,
    pub freshness_window_ms: u64,
    pub max_attempts: u32,
    pub retry_delay_ms: u64,
    pub simulate: bool,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerSettings {
    pub listen_addr: String,
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

impl Default for ScheduleSettings {
    fn default() -> Self {
        Self {
            send_interval_ms: 30_000,
            poll_interval_ms: 30_000,
            health_interval_ms: 10_000,
            freshness_window_ms: 60_000,
            max_attempts: 3,
            retry_delay_ms: 5_000,
            simulate: true,
        }
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".to_string(),
        }
    }
}

impl ApiSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl SessionSettings {
    pub fn to_session(&self) -> Session {
        Session::new(
            self.user_id.clone(),
            self.username.clone(),
            self.pond_code.clone(),
            Credentials::new(self.token.clone()),
        )
    }
}

impl ScheduleSettings {
    /// Intervals and the freshness window drive tokio timers and must be
    /// non-zero.
    pub fn validate(&self) -> anyhow::Result<()> {
        for (name, value) in [
            ("send_interval_ms", self.send_interval_ms),
            ("poll_interval_ms", self.poll_interval_ms),
            ("health_interval_ms", self.health_interval_ms),
            ("freshness_window_ms", self.freshness_window_ms),
        ] {
            anyhow::ensure!(value > 0, "schedule.{name} must be greater than zero");
        }
        Ok(())
    }

    pub fn to_schedule(&self) -> SyncSchedule {
        SyncSchedule {
            send_interval: Duration::from_millis(self.send_interval_ms),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            retry: RetryPolicy {
                max_attempts: self.max_attempts,
                delay: Duration::from_millis(self.retry_delay_ms),
            },
            health: HealthPolicy {
                tick: Duration::from_millis(self.health_interval_ms),
                freshness_window: Duration::from_millis(self.freshness_window_ms),
            },
            simulate: self.simulate,
        }
    }
}

/// Load `config/sync.*` (optional) overlaid with `POND_SYNC__*` environment
/// variables, e.g. `POND_SYNC__SESSION__TOKEN`.
pub fn load_sync_config() -> anyhow::Result<SyncConfig> {
    build_sync_config(config::File::with_name("config/sync").required(false))
}

fn build_sync_config<S>(file: S) -> anyhow::Result<SyncConfig>
where
    S: config::Source + Send + Sync + 'static,
{
    let settings = config::Config::builder()
        .add_source(file)
        .add_source(
            config::Environment::with_prefix("POND_SYNC")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    let sync_config: SyncConfig = settings.try_deserialize()?;
    sync_config.schedule.validate()?;
    Ok(sync_config)
}
