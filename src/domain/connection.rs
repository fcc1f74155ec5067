// Connection state shown to the operator
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Sending,
    Connected,
    Timeout,
    Error,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Sending => "sending",
            ConnectionState::Connected => "connected",
            ConnectionState::Timeout => "timeout",
            ConnectionState::Error => "error",
        };
        f.write_str(label)
    }
}
