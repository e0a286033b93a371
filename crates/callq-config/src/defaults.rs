use crate::action::ActionMode;
use crate::logging::LogFormat;

/// Default broker host.
pub const DEFAULT_HOSTNAME: &str = "localhost";

/// Default STOMP port exposed by ActiveMQ-compatible brokers.
pub const DEFAULT_PORT: u16 = 61613;

/// Default time to wait for the next request before the run ends.
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 500;

/// Default log filter expression.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Owned default broker host used where allocation is required (e.g. serde).
pub fn default_hostname() -> String {
    DEFAULT_HOSTNAME.to_owned()
}

/// Default log filter expression.
pub fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format.
pub fn default_log_format() -> LogFormat {
    LogFormat::Json
}

/// Default client action.
pub fn default_action() -> ActionMode {
    ActionMode::Publish
}
