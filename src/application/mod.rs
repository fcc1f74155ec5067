// Application layer - Sync loops and their collaborators
pub mod health_monitor;
pub mod poller;
pub mod retrying_sender;
pub mod simulated_source;
pub mod sync_controller;
pub mod telemetry_transport;

#[cfg(test)]
pub(crate) mod test_support;
