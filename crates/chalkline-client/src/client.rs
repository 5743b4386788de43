//! Client state machine.
//!
//! The `Client` is the top-level state machine that owns the connection
//! lifecycle, room membership, typing state, the notification store, and
//! the subscriber registry, and orchestrates them in response to events.
//!
//! Inbound server events flow through two paths in order: first to the
//! typed stores this client owns (typing tracker, notification store), then
//! to bus subscribers. The stores are mutated only here, so cross-component
//! communication always goes through dispatch, never through shared
//! references.

use chalkline_core::{
    env::Environment,
    error::AuthError,
    session::{ConnectionState, Session, SessionAction, SessionConfig},
};
use chalkline_proto::{EventKind, NotificationId, RoomId, ServerEvent, UserId};

use crate::{
    bus::{BusMessage, EventBus, Handler, SubscriptionId},
    config::ClientConfig,
    error::ClientError,
    event::{ClientAction, ClientEvent},
    notifications::{AlertSink, NotificationStore},
    rooms::RoomRegistry,
    typing::TypingTracker,
};

/// Realtime client state machine.
///
/// Pure except for reading the environment clock: it consumes
/// [`ClientEvent`]s and produces [`ClientAction`]s for the caller to
/// execute. Construct one per session; nothing is process-global, so tests
/// instantiate isolated clients freely.
pub struct Client<E: Environment> {
    /// Environment for timing and randomness.
    env: E,

    /// Bearer credential attached to every dial.
    credential: Option<String>,

    /// Connection lifecycle and retry policy.
    session: Session,

    /// Subscriber registry.
    bus: EventBus,

    /// Room membership intent.
    rooms: RoomRegistry,

    /// Typing debounce and remote typing set.
    typing: TypingTracker<E::Instant>,

    /// Notification records and read state.
    notifications: NotificationStore<E::Instant>,
}

impl<E: Environment> Client<E> {
    /// Create a client with the null alert sink.
    pub fn new(env: E, config: ClientConfig) -> Self {
        let session = Session::new(SessionConfig { backoff: config.backoff.clone() });
        let typing = TypingTracker::new(config.typing.clone());
        let notifications = NotificationStore::new(config.notifications.clone());

        Self {
            env,
            credential: None,
            session,
            bus: EventBus::new(),
            rooms: RoomRegistry::new(),
            typing,
            notifications,
        }
    }

    /// Replace the alert sink.
    ///
    /// Call before the first connect; the permission handshake happens on
    /// first qualifying ingest.
    #[must_use]
    pub fn with_alert_sink(mut self, sink: Box<dyn AlertSink>) -> Self {
        self.notifications.set_alert_sink(sink);
        self
    }

    /// Set the bearer credential used for subsequent dials.
    pub fn set_credential(&mut self, token: impl Into<String>) {
        self.credential = Some(token.into());
    }

    /// Credential for the driver to attach to a dial.
    #[must_use]
    pub fn credential(&self) -> Option<&str> {
        self.credential.as_deref()
    }

    /// Current connection lifecycle state.
    #[must_use]
    pub fn connection_state(&self) -> ConnectionState {
        self.session.state()
    }

    /// Consecutive failed attempts since the last successful open.
    #[must_use]
    pub fn attempt(&self) -> u32 {
        self.session.attempt()
    }

    /// Rooms the application intends to be joined to.
    pub fn rooms(&self) -> impl Iterator<Item = &RoomId> {
        self.rooms.rooms()
    }

    /// Users currently typing in `room`.
    pub fn typists(&self, room: &RoomId) -> Vec<UserId> {
        self.typing.typists(room, self.env.now())
    }

    /// Unread notification count.
    #[must_use]
    pub fn unread_count(&self) -> usize {
        self.notifications.unread_count()
    }

    /// Notification records in insertion order with their read state.
    pub fn notifications(
        &self,
    ) -> impl Iterator<Item = (&chalkline_proto::NotificationRecord, bool)> {
        self.notifications.iter()
    }

    /// Duplicate notification deliveries absorbed so far.
    #[must_use]
    pub fn duplicates_absorbed(&self) -> u64 {
        self.notifications.duplicates_absorbed()
    }

    /// Subscriber failures observed so far.
    #[must_use]
    pub fn handler_errors(&self) -> u64 {
        self.bus.handler_errors()
    }

    /// Register a handler for `kind`. See [`EventBus::subscribe`].
    pub fn subscribe(&mut self, kind: EventKind, handler: Handler) -> SubscriptionId {
        self.bus.subscribe(kind, handler)
    }

    /// Register a handler under a stable key. See
    /// [`EventBus::subscribe_keyed`].
    pub fn subscribe_keyed(
        &mut self,
        kind: EventKind,
        key: impl Into<String>,
        handler: Handler,
    ) -> SubscriptionId {
        self.bus.subscribe_keyed(kind, key, handler)
    }

    /// Remove a subscription. See [`EventBus::unsubscribe`].
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.bus.unsubscribe(id)
    }

    /// Process an event and return resulting actions.
    pub fn handle(
        &mut self,
        event: ClientEvent<E::Instant>,
    ) -> Result<Vec<ClientAction>, ClientError> {
        match event {
            ClientEvent::Connect => self.handle_connect(),
            ClientEvent::Disconnect => Ok(self.handle_disconnect()),
            ClientEvent::Opened => self.handle_opened(),
            ClientEvent::DialFailed { error } => {
                tracing::debug!(%error, "dial failed");
                Ok(self.handle_connection_lost())
            },
            ClientEvent::ConnectionLost { reason } => {
                tracing::debug!(%reason, "connection lost");
                Ok(self.handle_connection_lost())
            },
            ClientEvent::AuthRejected => Ok(self.handle_auth_rejected()),
            ClientEvent::RetryElapsed => {
                let actions = self.session.retry_elapsed();
                Ok(self.map_session_actions(actions))
            },
            ClientEvent::EventReceived(event) => Ok(self.handle_server_event(event)),
            ClientEvent::Tick { now } => Ok(self.handle_tick(now)),
            ClientEvent::JoinRoom { room_id } => Ok(self.handle_join(room_id)),
            ClientEvent::LeaveRoom { room_id } => Ok(self.handle_leave(&room_id)),
            ClientEvent::LocalTyping { room_id } => Ok(self.handle_local_typing(room_id)),
            ClientEvent::MarkRead { id } => Ok(self.handle_mark_read(&id)),
            ClientEvent::MarkAllRead => Ok(self.handle_mark_all_read()),
            ClientEvent::DeleteNotification { id } => Ok(self.handle_delete(&id)),
            ClientEvent::ClearNotifications => Ok(self.handle_clear()),
        }
    }

    fn handle_connect(&mut self) -> Result<Vec<ClientAction>, ClientError> {
        if self.credential.is_none() {
            return Err(ClientError::Auth(AuthError::Missing));
        }

        let actions = self.session.connect()?;
        Ok(self.map_session_actions(actions))
    }

    fn handle_disconnect(&mut self) -> Vec<ClientAction> {
        let actions = self.session.disconnect();
        self.rooms.reset_announcements();
        self.typing.clear_local();
        self.map_session_actions(actions)
    }

    fn handle_opened(&mut self) -> Result<Vec<ClientAction>, ClientError> {
        let session_actions = self.session.opened()?;

        // Replay membership before announcing Open, so room-scoped
        // subscribers never observe a false "joined" state.
        let mut actions: Vec<ClientAction> =
            self.rooms.replay().into_iter().map(ClientAction::Send).collect();
        actions.extend(self.map_session_actions(session_actions));

        tracing::info!(rooms = self.rooms.len(), "connection open, membership replayed");
        Ok(actions)
    }

    fn handle_connection_lost(&mut self) -> Vec<ClientAction> {
        self.rooms.reset_announcements();
        self.typing.clear_local();
        let actions = self.session.connection_lost(&self.env);
        self.map_session_actions(actions)
    }

    fn handle_auth_rejected(&mut self) -> Vec<ClientAction> {
        self.rooms.reset_announcements();
        self.typing.clear_local();
        let actions = self.session.auth_rejected();
        self.map_session_actions(actions)
    }

    fn handle_server_event(&mut self, event: ServerEvent) -> Vec<ClientAction> {
        let mut actions = Vec::new();
        let now = self.env.now();

        match &event {
            ServerEvent::UserTyping(signal) => {
                self.typing.observe_remote(
                    signal.doubt_id.clone(),
                    signal.user_id.clone(),
                    signal.typing,
                    now,
                );
            },
            ServerEvent::Notification(record) => {
                if self.notifications.ingest(record.clone(), now) {
                    actions.push(ClientAction::NotificationsChanged {
                        unread: self.notifications.unread_count(),
                    });
                }
            },
            // Remaining streams carry no client-owned state; subscribers
            // consume them directly.
            ServerEvent::DoubtUpdate(_)
            | ServerEvent::NewResponse(_)
            | ServerEvent::NewDoubtAvailable(_)
            | ServerEvent::DoubtStatisticsUpdate(_) => {},
        }

        self.bus.dispatch(&BusMessage::Server(event));
        actions
    }

    fn handle_tick(&mut self, now: E::Instant) -> Vec<ClientAction> {
        let mut actions: Vec<ClientAction> = self
            .typing
            .tick(now, self.session.is_open())
            .into_iter()
            .map(ClientAction::Send)
            .collect();

        if self.notifications.expire(now) {
            actions.push(ClientAction::NotificationsChanged {
                unread: self.notifications.unread_count(),
            });
        }

        actions
    }

    fn handle_join(&mut self, room_id: RoomId) -> Vec<ClientAction> {
        self.rooms
            .join(room_id, self.session.is_open())
            .map(ClientAction::Send)
            .into_iter()
            .collect()
    }

    fn handle_leave(&mut self, room_id: &RoomId) -> Vec<ClientAction> {
        self.rooms
            .leave(room_id, self.session.is_open())
            .map(ClientAction::Send)
            .into_iter()
            .collect()
    }

    fn handle_local_typing(&mut self, room_id: RoomId) -> Vec<ClientAction> {
        let now = self.env.now();
        self.typing
            .notify_local(room_id, now, self.session.is_open())
            .map(ClientAction::Send)
            .into_iter()
            .collect()
    }

    fn handle_mark_read(&mut self, id: &NotificationId) -> Vec<ClientAction> {
        if self.notifications.mark_read(id) {
            vec![ClientAction::NotificationsChanged { unread: self.notifications.unread_count() }]
        } else {
            vec![]
        }
    }

    fn handle_mark_all_read(&mut self) -> Vec<ClientAction> {
        if self.notifications.mark_all_read() {
            vec![ClientAction::NotificationsChanged { unread: 0 }]
        } else {
            vec![]
        }
    }

    fn handle_delete(&mut self, id: &NotificationId) -> Vec<ClientAction> {
        if self.notifications.delete(id) {
            vec![ClientAction::NotificationsChanged { unread: self.notifications.unread_count() }]
        } else {
            vec![]
        }
    }

    fn handle_clear(&mut self) -> Vec<ClientAction> {
        if self.notifications.is_empty() {
            return vec![];
        }
        self.notifications.clear();
        vec![ClientAction::NotificationsChanged { unread: 0 }]
    }

    /// Convert session actions to client actions, mirroring every state
    /// change onto the bus.
    fn map_session_actions(&mut self, actions: Vec<SessionAction>) -> Vec<ClientAction> {
        actions
            .into_iter()
            .map(|action| match action {
                SessionAction::Dial { attempt } => ClientAction::Dial { attempt },
                SessionAction::ScheduleRetry { delay, attempt } => {
                    ClientAction::ScheduleRetry { delay, attempt }
                },
                SessionAction::StateChanged(change) => {
                    tracing::info!(?change, "connection state changed");
                    self.bus.dispatch(&BusMessage::ConnectionStateChanged(change));
                    ClientAction::StateChanged(change)
                },
            })
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::disallowed_types)]
mod tests {
    use std::sync::{Arc, Mutex};

    use chalkline_core::{
        env::test_utils::MockEnv,
        session::{CloseCause, StateChange},
    };
    use chalkline_proto::{ClientCommand, NotificationRecord, Priority, UserTyping};
    use chrono::{TimeZone, Utc};

    use super::*;

    fn client() -> Client<MockEnv> {
        let mut client = Client::new(MockEnv::new(), ClientConfig::default());
        client.set_credential("bearer-token");
        client
    }

    fn open_client() -> Client<MockEnv> {
        let mut client = client();
        client.handle(ClientEvent::Connect).unwrap();
        client.handle(ClientEvent::Opened).unwrap();
        client
    }

    fn notification(id: &str) -> ServerEvent {
        ServerEvent::Notification(NotificationRecord {
            id: id.into(),
            doubt_id: None,
            kind: "response".into(),
            priority: Priority::Normal,
            title: "New response".into(),
            message: "A mentor replied".into(),
            metadata: None,
            created_at: Utc.with_ymd_and_hms(2026, 2, 1, 10, 0, 0).unwrap(),
            action_ref: None,
        })
    }

    #[test]
    fn connect_without_credential_fails_with_auth_error() {
        let mut client: Client<MockEnv> = Client::new(MockEnv::new(), ClientConfig::default());

        let result = client.handle(ClientEvent::Connect);
        assert!(matches!(result, Err(ClientError::Auth(AuthError::Missing))));
        assert_eq!(client.connection_state(), ConnectionState::Idle);
    }

    #[test]
    fn connect_produces_dial_and_state_change() {
        let mut client = client();

        let actions = client.handle(ClientEvent::Connect).unwrap();
        assert_eq!(client.connection_state(), ConnectionState::Connecting);
        assert!(actions.contains(&ClientAction::Dial { attempt: 0 }));
    }

    #[test]
    fn membership_replay_precedes_open_announcement() {
        let mut client = client();
        client.handle(ClientEvent::JoinRoom { room_id: "doubt-42".into() }).unwrap();
        client.handle(ClientEvent::Connect).unwrap();

        let actions = client.handle(ClientEvent::Opened).unwrap();

        let join_position = actions
            .iter()
            .position(|a| {
                matches!(a, ClientAction::Send(ClientCommand::JoinDoubt { doubt_id }) if doubt_id == "doubt-42")
            })
            .expect("join replayed");
        let open_position = actions
            .iter()
            .position(|a| {
                matches!(
                    a,
                    ClientAction::StateChanged(StateChange { current: ConnectionState::Open, .. })
                )
            })
            .expect("open announced");

        assert!(join_position < open_position);
    }

    #[test]
    fn join_while_open_sends_immediately() {
        let mut client = open_client();

        let actions = client.handle(ClientEvent::JoinRoom { room_id: "doubt-7".into() }).unwrap();
        assert_eq!(actions, vec![ClientAction::Send(ClientCommand::JoinDoubt {
            doubt_id: "doubt-7".into()
        })]);
    }

    #[test]
    fn drop_schedules_retry_and_clears_announcements() {
        let mut client = open_client();
        client.handle(ClientEvent::JoinRoom { room_id: "doubt-1".into() }).unwrap();

        let actions = client
            .handle(ClientEvent::ConnectionLost { reason: "reset by peer".into() })
            .unwrap();
        assert_eq!(client.connection_state(), ConnectionState::Degraded);
        assert!(actions.iter().any(|a| matches!(a, ClientAction::ScheduleRetry { .. })));

        // Reconnect replays the room exactly once.
        client.handle(ClientEvent::RetryElapsed).unwrap();
        let actions = client.handle(ClientEvent::Opened).unwrap();
        let joins = actions
            .iter()
            .filter(|a| matches!(a, ClientAction::Send(ClientCommand::JoinDoubt { .. })))
            .count();
        assert_eq!(joins, 1);
    }

    #[test]
    fn retry_elapsed_dials_again() {
        let mut client = open_client();
        client.handle(ClientEvent::ConnectionLost { reason: "reset".into() }).unwrap();

        let actions = client.handle(ClientEvent::RetryElapsed).unwrap();
        assert!(actions.iter().any(|a| matches!(a, ClientAction::Dial { attempt: 1 })));
    }

    #[test]
    fn auth_rejection_closes_without_retry() {
        let mut client = client();
        client.handle(ClientEvent::Connect).unwrap();

        let actions = client.handle(ClientEvent::AuthRejected).unwrap();
        assert_eq!(client.connection_state(), ConnectionState::Closed);
        assert!(!actions.iter().any(|a| matches!(a, ClientAction::ScheduleRetry { .. })));
        assert!(actions.iter().any(|a| matches!(
            a,
            ClientAction::StateChanged(StateChange { cause: Some(CloseCause::AuthRejected), .. })
        )));
    }

    #[test]
    fn notification_ingest_updates_badge() {
        let mut client = open_client();

        let actions = client.handle(ClientEvent::EventReceived(notification("n-1"))).unwrap();
        assert!(actions.contains(&ClientAction::NotificationsChanged { unread: 1 }));

        // Duplicate delivery is absorbed without a badge action.
        let actions = client.handle(ClientEvent::EventReceived(notification("n-1"))).unwrap();
        assert!(actions.is_empty());
        assert_eq!(client.duplicates_absorbed(), 1);
        assert_eq!(client.unread_count(), 1);
    }

    #[test]
    fn mark_read_on_unknown_id_is_silent() {
        let mut client = open_client();

        let actions = client.handle(ClientEvent::MarkRead { id: "ghost".into() }).unwrap();
        assert!(actions.is_empty());
    }

    #[test]
    fn remote_typing_flows_into_typist_set() {
        let mut client = open_client();

        let event = ServerEvent::UserTyping(UserTyping {
            doubt_id: "doubt-1".into(),
            user_id: "u-3".into(),
            user_name: "Ravi".into(),
            typing: true,
        });
        client.handle(ClientEvent::EventReceived(event)).unwrap();

        assert_eq!(client.typists(&"doubt-1".into()), vec![UserId::from("u-3")]);
    }

    #[test]
    fn server_events_reach_subscribers_in_order() {
        let mut client = open_client();
        let seen = Arc::new(Mutex::new(Vec::new()));
        {
            let seen = Arc::clone(&seen);
            client.subscribe(
                EventKind::Notification,
                Box::new(move |message| {
                    if let BusMessage::Server(ServerEvent::Notification(record)) = message {
                        seen.lock().unwrap().push(record.id.clone());
                    }
                    Ok(())
                }),
            );
        }

        client.handle(ClientEvent::EventReceived(notification("n-1"))).unwrap();
        client.handle(ClientEvent::EventReceived(notification("n-2"))).unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![
            NotificationId::from("n-1"),
            NotificationId::from("n-2")
        ]);
    }

    #[test]
    fn state_changes_reach_subscribers() {
        let mut client = client();
        let states = Arc::new(Mutex::new(Vec::new()));
        {
            let states = Arc::clone(&states);
            client.subscribe(
                EventKind::ConnectionStateChanged,
                Box::new(move |message| {
                    if let BusMessage::ConnectionStateChanged(change) = message {
                        states.lock().unwrap().push(change.current);
                    }
                    Ok(())
                }),
            );
        }

        client.handle(ClientEvent::Connect).unwrap();
        client.handle(ClientEvent::Opened).unwrap();
        client.handle(ClientEvent::Disconnect).unwrap();

        assert_eq!(*states.lock().unwrap(), vec![
            ConnectionState::Connecting,
            ConnectionState::Open,
            ConnectionState::Closed
        ]);
    }

    #[test]
    fn disconnect_then_reconnect_replays_membership() {
        let mut client = open_client();
        client.handle(ClientEvent::JoinRoom { room_id: "doubt-9".into() }).unwrap();

        client.handle(ClientEvent::Disconnect).unwrap();
        assert_eq!(client.connection_state(), ConnectionState::Closed);

        client.handle(ClientEvent::Connect).unwrap();
        let actions = client.handle(ClientEvent::Opened).unwrap();
        assert!(actions.iter().any(|a| {
            matches!(a, ClientAction::Send(ClientCommand::JoinDoubt { doubt_id }) if doubt_id == "doubt-9")
        }));
    }

    #[test]
    fn subscriptions_survive_reconnect() {
        let mut client = open_client();
        let count = Arc::new(Mutex::new(0));
        {
            let count = Arc::clone(&count);
            client.subscribe(
                EventKind::Notification,
                Box::new(move |_| {
                    *count.lock().unwrap() += 1;
                    Ok(())
                }),
            );
        }

        client.handle(ClientEvent::EventReceived(notification("n-1"))).unwrap();
        client.handle(ClientEvent::Disconnect).unwrap();
        client.handle(ClientEvent::Connect).unwrap();
        client.handle(ClientEvent::Opened).unwrap();
        client.handle(ClientEvent::EventReceived(notification("n-2"))).unwrap();

        assert_eq!(*count.lock().unwrap(), 2);
    }
}
