//! Typed pub/sub event multiplexer.
//!
//! Maps an [`EventKind`] to a list of subscriber callbacks and dispatches
//! inbound messages to them in registration order. A failing handler never
//! prevents its siblings from running: the failure is counted and re-emitted
//! under [`EventKind::HandlerError`] so diagnostics surfaces can observe it.
//!
//! Handlers run to completion on the driver's thread before the next event
//! is dispatched, so they may freely mutate their captured state without
//! locking.

use std::collections::HashMap;

use chalkline_core::session::StateChange;
use chalkline_proto::{EventKind, ServerEvent};
use thiserror::Error;

/// Failure reported by a subscriber.
///
/// Isolated per handler: returned from the callback instead of propagated,
/// so one broken panel cannot starve the others.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct HandlerError {
    /// Subscriber diagnostic.
    pub message: String,
}

impl HandlerError {
    /// Create a handler error from any displayable value.
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

/// Messages flowing through the bus.
///
/// Server events plus the two client-internal streams, so UI surfaces
/// subscribe to connection health and handler failures through the same
/// registry as protocol events.
#[derive(Debug, Clone, PartialEq)]
pub enum BusMessage {
    /// Event delivered by the server.
    Server(ServerEvent),

    /// Connection lifecycle transition.
    ConnectionStateChanged(StateChange),

    /// A subscriber failed while processing an event.
    HandlerError {
        /// Kind the failing subscriber was registered for.
        kind: EventKind,
        /// The failure it reported.
        error: HandlerError,
    },
}

impl BusMessage {
    /// Multiplexer kind of this message.
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Server(event) => event.kind(),
            Self::ConnectionStateChanged(_) => EventKind::ConnectionStateChanged,
            Self::HandlerError { .. } => EventKind::HandlerError,
        }
    }
}

/// Subscriber callback.
pub type Handler = Box<dyn FnMut(&BusMessage) -> Result<(), HandlerError> + Send>;

/// Identity of one registration, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct Entry {
    id: SubscriptionId,
    key: Option<String>,
    handler: Handler,
}

/// Typed pub/sub registry.
///
/// # Invariants
///
/// - Per kind, handlers observe events in registration order
/// - Removing one subscription never affects siblings of the same kind
/// - A keyed re-registration replaces in place: the same logical subscriber
///   is never invoked twice per event
#[derive(Default)]
pub struct EventBus {
    entries: HashMap<EventKind, Vec<Entry>>,
    next_id: u64,
    handler_errors: u64,
}

impl EventBus {
    /// Create an empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for `kind`.
    ///
    /// Returns an id accepted by [`EventBus::unsubscribe`]. The bus holds
    /// the callback but not the subscriber's identity; every call registers
    /// a fresh entry. Use [`EventBus::subscribe_keyed`] when re-registration
    /// must be idempotent.
    pub fn subscribe(&mut self, kind: EventKind, handler: Handler) -> SubscriptionId {
        let id = self.allocate_id();
        self.entries.entry(kind).or_default().push(Entry { id, key: None, handler });
        id
    }

    /// Register a handler under a stable key.
    ///
    /// If `key` is already registered for `kind`, the existing entry's
    /// callback is replaced in place: its position in dispatch order and its
    /// subscription id are retained. This makes registration idempotent per
    /// subscriber identity.
    pub fn subscribe_keyed(
        &mut self,
        kind: EventKind,
        key: impl Into<String>,
        handler: Handler,
    ) -> SubscriptionId {
        let key = key.into();
        let entries = self.entries.entry(kind).or_default();

        if let Some(entry) = entries.iter_mut().find(|e| e.key.as_deref() == Some(key.as_str())) {
            entry.handler = handler;
            return entry.id;
        }

        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        entries.push(Entry { id, key: Some(key), handler });
        id
    }

    /// Remove a subscription.
    ///
    /// Idempotent: removing an id that was already removed (or never
    /// existed) returns `false` and changes nothing.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        for entries in self.entries.values_mut() {
            if let Some(position) = entries.iter().position(|e| e.id == id) {
                entries.remove(position);
                return true;
            }
        }
        false
    }

    /// Dispatch a message to every handler registered for its kind.
    ///
    /// Handlers run in registration order. Failures are collected, counted,
    /// and re-dispatched under [`EventKind::HandlerError`]; failures of
    /// `HandlerError` subscribers themselves are only counted, so reporting
    /// cannot recurse.
    pub fn dispatch(&mut self, message: &BusMessage) {
        let failures = self.run_handlers(message);

        if message.kind() == EventKind::HandlerError {
            self.handler_errors += failures.len() as u64;
            return;
        }

        for error in failures {
            self.handler_errors += 1;
            tracing::warn!(kind = %message.kind(), %error, "subscriber failed");
            let report = BusMessage::HandlerError { kind: message.kind(), error };
            let nested = self.run_handlers(&report);
            self.handler_errors += nested.len() as u64;
        }
    }

    /// Number of handler failures observed since construction.
    #[must_use]
    pub fn handler_errors(&self) -> u64 {
        self.handler_errors
    }

    /// Number of live subscriptions for `kind`.
    #[must_use]
    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        self.entries.get(&kind).map_or(0, Vec::len)
    }

    fn run_handlers(&mut self, message: &BusMessage) -> Vec<HandlerError> {
        let mut failures = Vec::new();

        if let Some(entries) = self.entries.get_mut(&message.kind()) {
            for entry in entries.iter_mut() {
                if let Err(error) = (entry.handler)(message) {
                    failures.push(error);
                }
            }
        }

        failures
    }

    fn allocate_id(&mut self) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        id
    }
}
