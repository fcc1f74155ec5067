// Domain layer - Core telemetry and session types
pub mod connection;
pub mod reading;
pub mod session;
