//! Deterministic test harness for the Chalkline realtime client.
//!
//! Two levels of testing support:
//!
//! - [`ClientHarness`]: drives the Sans-IO [`chalkline_client::Client`]
//!   directly, playing the role of a perfect driver. Records every outbound
//!   command, dial, retry, state transition, and badge update so scenario
//!   tests assert on exact sequences.
//! - [`ScriptedTransport`]: implements the supervisor's `Transport` seam
//!   with scripted dial outcomes and an injectable event feed, for
//!   end-to-end tests of the tokio event loop under a paused clock.
//!
//! Both run on [`MockEnv`]'s virtual clock, so retry delays, typing TTLs,
//! and notification expiry are advanced explicitly and tests never sleep.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod driver;
mod script;

pub use chalkline_core::env::test_utils::MockEnv;
pub use driver::ClientHarness;
pub use script::{Feed, ScriptedTransport, TransportController};

use chalkline_proto::{NotificationRecord, Priority};
use chrono::{DateTime, TimeZone, Utc};

/// Install a fmt subscriber honoring `RUST_LOG`.
///
/// Safe to call from every test; repeat installations are ignored.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Build a notification fixture with sensible defaults.
pub fn notification_fixture(id: &str, priority: Priority) -> NotificationRecord {
    NotificationRecord {
        id: id.into(),
        doubt_id: Some("doubt-1".into()),
        kind: "response".into(),
        priority,
        title: "New response".into(),
        message: "A mentor replied to your doubt".into(),
        metadata: None,
        created_at: Utc.with_ymd_and_hms(2026, 2, 1, 10, 0, 0).single().unwrap_or(DateTime::UNIX_EPOCH),
        action_ref: None,
    }
}
