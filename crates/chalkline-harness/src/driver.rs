//! Recording driver for the Sans-IO client.
//!
//! Plays the role of a perfect driver: feeds events into the client and
//! files every resulting action into per-category logs, so scenario tests
//! assert on exact outbound sequences instead of re-implementing action
//! handling in every test.

use std::time::{Duration, Instant};

use chalkline_client::{Client, ClientAction, ClientConfig, ClientError, ClientEvent};
use chalkline_core::{env::test_utils::MockEnv, session::StateChange};
use chalkline_proto::ClientCommand;

/// Client plus recorded action history.
pub struct ClientHarness {
    /// Shared virtual clock; advance it to move time forward.
    pub env: MockEnv,
    /// The client under test.
    pub client: Client<MockEnv>,
    /// Outbound commands, in emission order.
    pub sent: Vec<ClientCommand>,
    /// Dial attempts, in emission order.
    pub dials: Vec<u32>,
    /// Scheduled retries as (delay, attempt).
    pub retries: Vec<(Duration, u32)>,
    /// Lifecycle transitions.
    pub transitions: Vec<StateChange>,
    /// Unread badge updates.
    pub badges: Vec<usize>,
}

impl ClientHarness {
    /// Harness with the default configuration and a fixed credential.
    pub fn new() -> Self {
        Self::with_config(ClientConfig::default())
    }

    /// Harness with a custom configuration.
    pub fn with_config(config: ClientConfig) -> Self {
        let env = MockEnv::with_seed(7);
        let mut client = Client::new(env.clone(), config);
        client.set_credential("harness-token");

        Self {
            env,
            client,
            sent: Vec::new(),
            dials: Vec::new(),
            retries: Vec::new(),
            transitions: Vec::new(),
            badges: Vec::new(),
        }
    }

    /// Feed one event, recording and returning the resulting actions.
    ///
    /// # Errors
    ///
    /// Propagates [`ClientError`] from the client untouched.
    pub fn dispatch(
        &mut self,
        event: ClientEvent<Instant>,
    ) -> Result<Vec<ClientAction>, ClientError> {
        let actions = self.client.handle(event)?;
        tracing::debug!(count = actions.len(), "recorded actions");

        for action in &actions {
            match action {
                ClientAction::Send(command) => self.sent.push(command.clone()),
                ClientAction::Dial { attempt } => self.dials.push(*attempt),
                ClientAction::ScheduleRetry { delay, attempt } => {
                    self.retries.push((*delay, *attempt));
                },
                ClientAction::StateChanged(change) => self.transitions.push(*change),
                ClientAction::NotificationsChanged { unread } => self.badges.push(*unread),
            }
        }

        Ok(actions)
    }

    /// Connect and complete the handshake.
    ///
    /// # Panics
    ///
    /// Panics if the lifecycle rejects the transition.
    #[allow(clippy::unwrap_used)]
    pub fn open(&mut self) {
        self.dispatch(ClientEvent::Connect).unwrap();
        self.dispatch(ClientEvent::Opened).unwrap();
    }

    /// Simulate an unexpected connection drop.
    ///
    /// # Panics
    ///
    /// Panics if dispatch fails, which it never does for this event.
    #[allow(clippy::unwrap_used)]
    pub fn drop_connection(&mut self) {
        self.dispatch(ClientEvent::ConnectionLost { reason: "simulated drop".into() }).unwrap();
    }

    /// Advance the virtual clock and deliver a tick.
    ///
    /// # Panics
    ///
    /// Panics if dispatch fails, which it never does for this event.
    #[allow(clippy::unwrap_used)]
    pub fn advance_and_tick(&mut self, by: Duration) {
        self.env.advance(by);
        let now = self.now();
        self.dispatch(ClientEvent::Tick { now }).unwrap();
    }

    /// Current virtual time.
    pub fn now(&self) -> Instant {
        use chalkline_core::env::Environment as _;
        self.env.now()
    }

    /// Drain the recorded outbound commands.
    pub fn take_sent(&mut self) -> Vec<ClientCommand> {
        std::mem::take(&mut self.sent)
    }

    /// Outbound `join_doubt` commands for `room` recorded so far.
    pub fn join_count(&self, room: &str) -> usize {
        self.sent
            .iter()
            .filter(|c| matches!(c, ClientCommand::JoinDoubt { doubt_id } if doubt_id == room))
            .count()
    }
}

impl Default for ClientHarness {
    fn default() -> Self {
        Self::new()
    }
}
