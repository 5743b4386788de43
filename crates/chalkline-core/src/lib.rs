//! Core
//!
//! Foundation layer for the Chalkline realtime client: the [`Environment`]
//! abstraction that decouples state machines from wall-clock time and OS
//! randomness, the error taxonomy shared across the workspace, the pure
//! [`Backoff`] retry scheduler, and the [`Session`] connection-lifecycle
//! state machine.
//!
//! # Architecture
//!
//! Everything here is Sans-IO: state machines take time as input and return
//! actions for a driver to execute. No module performs I/O, sleeps, or reads
//! the real clock, which is what makes the reconnection logic fully
//! deterministic under test.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod backoff;
pub mod env;
pub mod error;
pub mod session;

pub use backoff::{Backoff, BackoffConfig};
pub use env::Environment;
pub use error::{AuthError, ConnectError, SessionError, TransportError};
pub use session::{CloseCause, ConnectionState, Session, SessionAction, SessionConfig, StateChange};
