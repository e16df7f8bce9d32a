use std::time::Duration;

/// Failure reported by (or on the way to) the host.
///
/// Every variant is treated the same by the executor: logged, surfaced as a
/// warning, and swallowed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HostError {
    #[error("{0}")]
    Rejected(String),
    #[error("host connection closed")]
    Disconnected,
    #[error("host did not answer `{request}` within {timeout:?}")]
    TimedOut { request: String, timeout: Duration },
}

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("settings I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid settings JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unable to determine a configuration directory")]
    NoConfigDir,
}
