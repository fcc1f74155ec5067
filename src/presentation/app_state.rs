// Application state for HTTP handlers
use crate::application::health_monitor::ConnectionHealth;
use crate::domain::reading::Reading;
use tokio::sync::watch;

#[derive(Clone)]
pub struct AppState {
    pub health: ConnectionHealth,
    pub latest_reading: watch::Receiver<Option<Reading>>,
}
