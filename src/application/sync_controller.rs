// Sync controller - owns the poller, simulated source and health monitor tasks
use crate::application::health_monitor::{run_health_monitor, ConnectionHealth, HealthPolicy};
use crate::application::poller::{Poller, ReadingConsumer};
use crate::application::retrying_sender::{RetryPolicy, RetryingSender};
use crate::application::simulated_source::SimulatedSource;
use crate::application::telemetry_transport::TelemetryTransport;
use crate::domain::session::Session;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy)]
pub struct SyncSchedule {
    pub send_interval: Duration,
    pub poll_interval: Duration,
    pub retry: RetryPolicy,
    pub health: HealthPolicy,
    /// Run the simulated source alongside the poller.
    pub simulate: bool,
}

impl Default for SyncSchedule {
    fn default() -> Self {
        Self {
            send_interval: Duration::from_secs(30),
            poll_interval: Duration::from_secs(30),
            retry: RetryPolicy::default(),
            health: HealthPolicy::default(),
            simulate: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ActivationError {
    #[error("session is missing {0}")]
    Incomplete(&'static str),
}

struct ActiveSync {
    session: Session,
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

/// Runs the sync loops for at most one session at a time.
///
/// Activating a new session (or a different pond) stops the previous loops
/// first. Dropping the controller cancels whatever is still running.
pub struct SyncController {
    transport: Arc<dyn TelemetryTransport>,
    schedule: SyncSchedule,
    health: ConnectionHealth,
    consumer: ReadingConsumer,
    active: Option<ActiveSync>,
}

impl SyncController {
    pub fn new(
        transport: Arc<dyn TelemetryTransport>,
        schedule: SyncSchedule,
        consumer: ReadingConsumer,
    ) -> Self {
        Self {
            transport,
            schedule,
            health: ConnectionHealth::new(),
            consumer,
            active: None,
        }
    }

    pub fn health(&self) -> ConnectionHealth {
        self.health.clone()
    }

    pub fn active_session(&self) -> Option<&Session> {
        self.active.as_ref().map(|a| &a.session)
    }

    /// Start the loops for `session`. An incomplete session deactivates
    /// whatever was running and is rejected.
    pub async fn activate(&mut self, session: Session) -> Result<(), ActivationError> {
        if let Some(field) = session.missing_field() {
            self.deactivate().await;
            return Err(ActivationError::Incomplete(field));
        }

        if self.active_session() == Some(&session) {
            return Ok(());
        }
        self.deactivate().await;

        tracing::info!(
            user = %session.username,
            code = %session.pond_code,
            simulate = self.schedule.simulate,
            "activating sync session"
        );

        self.health.activate();
        let cancel = CancellationToken::new();
        let mut tasks = Vec::with_capacity(3);

        let poller = Poller::new(
            self.transport.clone(),
            session.clone(),
            self.schedule.poll_interval,
            self.consumer.clone(),
        )
        .with_health(self.health.clone());
        tasks.push(tokio::spawn(poller.run(cancel.clone())));

        if self.schedule.simulate {
            let sender = RetryingSender::new(self.transport.clone(), self.schedule.retry)
                .with_health(self.health.clone());
            let source = SimulatedSource::new(sender, session.clone(), self.schedule.send_interval)
                .with_health(self.health.clone());
            tasks.push(tokio::spawn(source.run(cancel.clone())));
        }

        tasks.push(tokio::spawn(run_health_monitor(
            self.health.clone(),
            self.schedule.health,
            cancel.clone(),
        )));

        self.active = Some(ActiveSync {
            session,
            cancel,
            tasks,
        });
        Ok(())
    }

    /// Stop every loop and wait for them to exit. No transport call is made
    /// once this returns.
    pub async fn deactivate(&mut self) {
        let Some(active) = self.active.take() else {
            self.health.deactivate();
            return;
        };

        active.cancel.cancel();
        for task in active.tasks {
            if let Err(e) = task.await {
                tracing::error!(error = %e, "sync task ended abnormally");
            }
        }
        self.health.deactivate();

        tracing::info!(code = %active.session.pond_code, "sync session deactivated");
    }
}

impl Drop for SyncController {
    fn drop(&mut self) {
        if let Some(active) = &self.active {
            active.cancel.cancel();
        }
    }
}
