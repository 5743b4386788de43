//! Client configuration.
//!
//! Every timing constant in the realtime layer is configuration, not
//! protocol: typing cadence and notification expiry are product decisions,
//! so callers can tune them without touching the state machines.

use std::time::Duration;

use chalkline_core::backoff::BackoffConfig;
use chalkline_proto::Priority;

/// Minimum gap between outbound typing-start signals per room.
pub const DEFAULT_TYPING_SEND_INTERVAL: Duration = Duration::from_secs(1);

/// Local quiet time after which a stop-typing signal is emitted.
pub const DEFAULT_TYPING_QUIET_PERIOD: Duration = Duration::from_secs(1);

/// Lifetime of a remote typing entry with no refreshing signal.
pub const DEFAULT_REMOTE_TYPING_TTL: Duration = Duration::from_secs(3);

/// Lifetime of a low-priority notification before auto-expiry.
pub const DEFAULT_LOW_PRIORITY_TTL: Duration = Duration::from_secs(300);

/// Lowest priority forwarded to the host alert sink.
pub const DEFAULT_ALERT_THRESHOLD: Priority = Priority::High;

/// Typing debounce configuration.
#[derive(Debug, Clone)]
pub struct TypingConfig {
    /// Minimum gap between outbound typing-start signals per room.
    pub send_interval: Duration,
    /// Local quiet time after which stop-typing is emitted.
    pub quiet_period: Duration,
    /// Lifetime of a remote typing entry with no refreshing signal.
    pub remote_ttl: Duration,
}

impl Default for TypingConfig {
    fn default() -> Self {
        Self {
            send_interval: DEFAULT_TYPING_SEND_INTERVAL,
            quiet_period: DEFAULT_TYPING_QUIET_PERIOD,
            remote_ttl: DEFAULT_REMOTE_TYPING_TTL,
        }
    }
}

/// Notification store configuration.
#[derive(Debug, Clone)]
pub struct NotificationConfig {
    /// Lifetime of a low-priority record before auto-expiry. Records at
    /// normal priority and above never expire on their own.
    pub low_priority_ttl: Duration,
    /// Lowest priority forwarded to the host alert sink.
    pub alert_threshold: Priority,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            low_priority_ttl: DEFAULT_LOW_PRIORITY_TTL,
            alert_threshold: DEFAULT_ALERT_THRESHOLD,
        }
    }
}

/// Aggregate client configuration.
#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    /// Reconnect retry policy.
    pub backoff: BackoffConfig,
    /// Typing debounce timings.
    pub typing: TypingConfig,
    /// Notification store policy.
    pub notifications: NotificationConfig,
}
