//! Client
//!
//! Sans-IO realtime client for the Chalkline protocol. Multiplexes the
//! platform's logical event streams over one connection, tracks room
//! membership across reconnects, debounces typing indicators, and feeds a
//! de-duplicating notification store.
//!
//! # Architecture
//!
//! The client follows the same Sans-IO and action-based patterns as
//! [`chalkline_core`]. It receives events ([`ClientEvent`]), processes them
//! through pure state machine logic, and returns actions ([`ClientAction`])
//! for the caller to execute. All state mutation happens inside
//! [`Client::handle`] on the driver's single logical thread, so no locking
//! is needed and every scenario is reproducible under a scripted driver.
//!
//! # Components
//!
//! - [`Client`]: top-level state machine composing the parts below
//! - [`EventBus`]: typed pub/sub registry with per-handler failure isolation
//! - [`RoomRegistry`]: membership intent, replayed on every reconnect
//! - [`TypingTracker`]: local debounce and self-expiring remote typing set
//! - [`NotificationStore`]: ordered, id-de-duplicated records with O(1)
//!   unread count and an injectable [`AlertSink`]
//!
//! # Supervisor (optional)
//!
//! With the `transport` feature enabled, this crate also provides:
//! - [`supervisor::Transport`]: the async transport seam
//! - [`supervisor::Supervisor`]: a tokio driver for the state machine

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod bus;
mod client;
mod config;
mod error;
mod event;
mod notifications;
mod rooms;
mod typing;

#[cfg(feature = "transport")]
pub mod supervisor;

pub use bus::{BusMessage, EventBus, Handler, HandlerError, SubscriptionId};
pub use chalkline_core::{
    env::Environment,
    session::{CloseCause, ConnectionState, StateChange},
};
pub use chalkline_proto::{EventKind, NotificationId, RoomId, UserId};
pub use client::Client;
pub use config::{ClientConfig, NotificationConfig, TypingConfig};
pub use error::ClientError;
pub use event::{ClientAction, ClientEvent};
pub use notifications::{AlertPermission, AlertSink, NoAlerts, NotificationStore};
pub use rooms::RoomRegistry;
pub use typing::TypingTracker;
