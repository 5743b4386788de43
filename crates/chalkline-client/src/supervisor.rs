//! Async driver for the client state machine.
//!
//! Provides the [`Transport`] seam and a tokio [`Supervisor`] that owns a
//! [`Client`] plus a transport and runs the event loop: executing actions
//! (dial, send, schedule retry), feeding transport outcomes and ticks back
//! into the state machine, and relaying application intents from a channel
//! handle. This is a thin I/O layer; all protocol logic stays in the
//! Sans-IO [`Client`].
//!
//! Timer hygiene: the pending retry timer is dropped the moment a
//! disconnect intent is processed, and the state machine additionally
//! ignores stale `RetryElapsed` events, so nothing fires after teardown.

use std::{pin::Pin, time::Duration};

use thiserror::Error;
use tokio::sync::mpsc;

use chalkline_core::{
    env::Environment,
    error::{AuthError, ConnectError, TransportError},
    session::ConnectionState,
};
use chalkline_proto::{ClientCommand, NotificationId, ProtocolError, RoomId, ServerEvent};

use crate::{
    client::Client,
    error::ClientError,
    event::{ClientAction, ClientEvent},
};

/// Interval between housekeeping ticks fed to the client.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(250);

/// Capacity of the intent channel between handles and the supervisor.
const INTENT_CHANNEL_CAPACITY: usize = 64;

/// Async transport seam.
///
/// Implementations wrap whatever carries the connection (a WebSocket, a
/// scripted fake in tests). They decode inbound envelopes themselves, so
/// the supervisor can count protocol errors without knowing the codec.
pub trait Transport: Send {
    /// Open the connection, attaching the bearer credential.
    fn dial(
        &mut self,
        credential: &str,
    ) -> impl Future<Output = Result<(), ConnectError>> + Send;

    /// Send a control command.
    fn send(
        &mut self,
        command: ClientCommand,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Receive the next inbound event.
    ///
    /// `None` means the connection dropped. `Some(Err(_))` reports an
    /// envelope this client could not decode; the connection stays up.
    fn recv(
        &mut self,
    ) -> impl Future<Output = Option<Result<ServerEvent, ProtocolError>>> + Send;

    /// Tear the connection down.
    fn close(&mut self);

    /// Whether the connection is currently up.
    fn is_connected(&self) -> bool;
}

/// Application intents accepted by [`SupervisorHandle`].
#[derive(Debug, Clone)]
pub enum Intent {
    /// Establish the connection.
    Connect,
    /// Tear down deterministically.
    Disconnect,
    /// Join a room-scoped channel.
    Join(RoomId),
    /// Leave a room-scoped channel.
    Leave(RoomId),
    /// Local keystroke in a room's composer.
    Typing(RoomId),
    /// Mark one notification as read.
    MarkRead(NotificationId),
    /// Mark every notification as read.
    MarkAllRead,
    /// Delete one notification.
    Delete(NotificationId),
    /// Delete every notification.
    Clear,
}

/// Cloneable handle for feeding intents into a running supervisor.
#[derive(Debug, Clone)]
pub struct SupervisorHandle {
    sender: mpsc::Sender<Intent>,
}

impl SupervisorHandle {
    /// Send an intent.
    ///
    /// # Errors
    ///
    /// Returns [`SupervisorError::Stopped`] if the supervisor is gone.
    pub async fn send(&self, intent: Intent) -> Result<(), SupervisorError> {
        self.sender.send(intent).await.map_err(|_| SupervisorError::Stopped)
    }
}

/// Supervisor failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SupervisorError {
    /// The client rejected an operation with a fatal error.
    #[error(transparent)]
    Client(#[from] ClientError),

    /// The supervisor's event loop has stopped.
    #[error("supervisor stopped")]
    Stopped,
}

/// Tokio driver owning a [`Client`] and a [`Transport`].
pub struct Supervisor<T: Transport, E: Environment> {
    client: Client<E>,
    transport: T,
    env: E,
    intents: mpsc::Receiver<Intent>,
    retry: Option<Pin<Box<tokio::time::Sleep>>>,
    tick_interval: Duration,
    protocol_errors: u64,
}

impl<T: Transport, E: Environment> Supervisor<T, E> {
    /// Create a supervisor and a handle for feeding it intents.
    pub fn new(client: Client<E>, transport: T, env: E) -> (Self, SupervisorHandle) {
        let (sender, intents) = mpsc::channel(INTENT_CHANNEL_CAPACITY);
        let supervisor = Self {
            client,
            transport,
            env,
            intents,
            retry: None,
            tick_interval: DEFAULT_TICK_INTERVAL,
            protocol_errors: 0,
        };
        (supervisor, SupervisorHandle { sender })
    }

    /// Override the housekeeping tick interval.
    #[must_use]
    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    /// Inbound envelopes that failed to decode since construction.
    #[must_use]
    pub fn protocol_errors(&self) -> u64 {
        self.protocol_errors
    }

    /// Borrow the underlying client (state inspection, subscriptions).
    pub fn client_mut(&mut self) -> &mut Client<E> {
        &mut self.client
    }

    /// Run the event loop until every handle is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`SupervisorError::Client`] when the client reports a fatal
    /// error (e.g. connecting without a credential).
    pub async fn run(mut self) -> Result<(), SupervisorError> {
        let mut tick = tokio::time::interval(self.tick_interval);
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            let connected = self.transport.is_connected();
            let env = self.env.clone();

            let step = {
                let retry = &mut self.retry;
                tokio::select! {
                    maybe = self.intents.recv() => match maybe {
                        Some(intent) => Step::Event(Self::intent_event(intent)),
                        None => Step::Shutdown,
                    },
                    inbound = self.transport.recv(), if connected => match inbound {
                        Some(Ok(event)) => Step::Event(ClientEvent::EventReceived(event)),
                        Some(Err(error)) => Step::BadEnvelope(error),
                        None => Step::Event(ClientEvent::ConnectionLost {
                            reason: "transport closed".to_string(),
                        }),
                    },
                    () = wait_retry(retry) => {
                        *retry = None;
                        Step::Event(ClientEvent::RetryElapsed)
                    },
                    _ = tick.tick() => Step::Event(ClientEvent::Tick { now: env.now() }),
                }
            };

            match step {
                Step::Event(event) => self.drive(event).await?,
                Step::BadEnvelope(error) => {
                    self.protocol_errors += 1;
                    tracing::warn!(%error, "dropping undecodable envelope");
                },
                Step::Shutdown => {
                    // Every handle dropped: deterministic teardown.
                    self.drive(ClientEvent::Disconnect).await?;
                    self.transport.close();
                    return Ok(());
                },
            }
        }
    }

    /// Feed one event through the client and execute resulting actions,
    /// looping until no follow-up events remain.
    async fn drive(&mut self, event: ClientEvent<E::Instant>) -> Result<(), SupervisorError> {
        let mut pending = vec![event];

        while let Some(event) = pending.pop() {
            let actions = match self.client.handle(event) {
                Ok(actions) => actions,
                Err(error @ ClientError::Auth(_)) => return Err(error.into()),
                Err(error) => {
                    tracing::warn!(%error, "client rejected event");
                    continue;
                },
            };

            for action in actions {
                if let Some(follow_up) = self.execute(action).await {
                    pending.push(follow_up);
                }
            }
        }

        Ok(())
    }

    /// Execute one action, returning any follow-up event it produced.
    async fn execute(&mut self, action: ClientAction) -> Option<ClientEvent<E::Instant>> {
        match action {
            ClientAction::Dial { attempt } => {
                let credential = self.client.credential().unwrap_or_default().to_string();
                tracing::debug!(attempt, "dialing");
                match self.transport.dial(&credential).await {
                    Ok(()) => Some(ClientEvent::Opened),
                    Err(ConnectError::Auth(AuthError::Rejected | AuthError::Missing)) => {
                        Some(ClientEvent::AuthRejected)
                    },
                    Err(ConnectError::Transport(error)) => Some(ClientEvent::DialFailed { error }),
                    Err(ConnectError::Exhausted { attempts }) => {
                        // Transports do not track attempts; treat as transient.
                        Some(ClientEvent::DialFailed {
                            error: TransportError::Dial {
                                reason: format!("exhausted after {attempts} attempts"),
                            },
                        })
                    },
                }
            },
            ClientAction::Send(command) => match self.transport.send(command).await {
                Ok(()) => None,
                Err(error) => Some(ClientEvent::ConnectionLost { reason: error.to_string() }),
            },
            ClientAction::ScheduleRetry { delay, attempt } => {
                tracing::debug!(?delay, attempt, "scheduling retry");
                self.retry = Some(Box::pin(tokio::time::sleep(delay)));
                None
            },
            ClientAction::StateChanged(change) => {
                if change.current == ConnectionState::Closed {
                    // Cancel the pending timer synchronously with teardown.
                    self.retry = None;
                    self.transport.close();
                }
                None
            },
            ClientAction::NotificationsChanged { unread } => {
                tracing::debug!(unread, "notification badge changed");
                None
            },
        }
    }

    fn intent_event(intent: Intent) -> ClientEvent<E::Instant> {
        match intent {
            Intent::Connect => ClientEvent::Connect,
            Intent::Disconnect => ClientEvent::Disconnect,
            Intent::Join(room_id) => ClientEvent::JoinRoom { room_id },
            Intent::Leave(room_id) => ClientEvent::LeaveRoom { room_id },
            Intent::Typing(room_id) => ClientEvent::LocalTyping { room_id },
            Intent::MarkRead(id) => ClientEvent::MarkRead { id },
            Intent::MarkAllRead => ClientEvent::MarkAllRead,
            Intent::Delete(id) => ClientEvent::DeleteNotification { id },
            Intent::Clear => ClientEvent::ClearNotifications,
        }
    }
}

/// One iteration's outcome of the supervisor select loop.
enum Step<I> {
    /// Feed this event through the client.
    Event(ClientEvent<I>),
    /// An inbound envelope failed to decode; count it and move on.
    BadEnvelope(ProtocolError),
    /// Every handle dropped; tear down and stop.
    Shutdown,
}

/// Await the pending retry timer, or park forever when none is armed.
///
/// Parking keeps the select branch total; the loop rebuilds this future
/// every iteration, so arming a timer takes effect immediately.
async fn wait_retry(retry: &mut Option<Pin<Box<tokio::time::Sleep>>>) {
    match retry.as_mut() {
        Some(sleep) => sleep.await,
        None => std::future::pending().await,
    }
}
