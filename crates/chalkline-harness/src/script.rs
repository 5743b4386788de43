//! Scriptable fake transport.
//!
//! Implements the supervisor's [`Transport`] seam without any network:
//! dial outcomes are scripted up front, inbound events and simulated drops
//! are injected through a [`TransportController`], and every outbound
//! command is captured for assertion. Drives the full tokio supervisor loop
//! deterministically under a paused clock.

use std::collections::VecDeque;

use tokio::sync::mpsc;

use chalkline_client::supervisor::Transport;
use chalkline_core::error::{ConnectError, TransportError};
use chalkline_proto::{ClientCommand, ProtocolError, ServerEvent};

/// One item injected by the controller.
#[derive(Debug)]
pub enum Feed {
    /// Deliver an inbound event (or a decode failure) to the client.
    Event(Result<ServerEvent, ProtocolError>),
    /// Drop the connection.
    Drop,
}

/// Test-side handle for a [`ScriptedTransport`].
pub struct TransportController {
    feed: mpsc::UnboundedSender<Feed>,
    sent: mpsc::UnboundedReceiver<ClientCommand>,
}

impl TransportController {
    /// Deliver an inbound event.
    pub fn emit(&self, event: ServerEvent) {
        let _ = self.feed.send(Feed::Event(Ok(event)));
    }

    /// Deliver an envelope that fails to decode.
    pub fn emit_malformed(&self, error: ProtocolError) {
        let _ = self.feed.send(Feed::Event(Err(error)));
    }

    /// Drop the connection out from under the client.
    pub fn sever(&self) {
        let _ = self.feed.send(Feed::Drop);
    }

    /// Await the next outbound command.
    pub async fn next_sent(&mut self) -> Option<ClientCommand> {
        self.sent.recv().await
    }

    /// Drain outbound commands already captured, without waiting.
    pub fn drain_sent(&mut self) -> Vec<ClientCommand> {
        let mut commands = Vec::new();
        while let Ok(command) = self.sent.try_recv() {
            commands.push(command);
        }
        commands
    }
}

/// Scriptable [`Transport`] implementation.
pub struct ScriptedTransport {
    dial_outcomes: VecDeque<Result<(), ConnectError>>,
    always_succeed: bool,
    feed: mpsc::UnboundedReceiver<Feed>,
    sent: mpsc::UnboundedSender<ClientCommand>,
    connected: bool,
}

impl ScriptedTransport {
    /// Build a transport whose dials resolve to `dial_outcomes` in order.
    ///
    /// Dials past the end of the script fail as refused connections.
    pub fn scripted(
        dial_outcomes: impl IntoIterator<Item = Result<(), ConnectError>>,
    ) -> (Self, TransportController) {
        let (feed_tx, feed_rx) = mpsc::unbounded_channel();
        let (sent_tx, sent_rx) = mpsc::unbounded_channel();

        let transport = Self {
            dial_outcomes: dial_outcomes.into_iter().collect(),
            always_succeed: false,
            feed: feed_rx,
            sent: sent_tx,
            connected: false,
        };
        let controller = TransportController { feed: feed_tx, sent: sent_rx };

        (transport, controller)
    }

    /// Transport whose every dial succeeds.
    pub fn always_up() -> (Self, TransportController) {
        let (mut transport, controller) = Self::scripted([]);
        transport.always_succeed = true;
        (transport, controller)
    }
}

impl Transport for ScriptedTransport {
    async fn dial(&mut self, _credential: &str) -> Result<(), ConnectError> {
        let outcome = if self.always_succeed {
            Ok(())
        } else {
            self.dial_outcomes.pop_front().unwrap_or(Err(ConnectError::Transport(
                TransportError::Dial { reason: "script exhausted".to_string() },
            )))
        };

        self.connected = outcome.is_ok();
        outcome
    }

    async fn send(&mut self, command: ClientCommand) -> Result<(), TransportError> {
        if !self.connected {
            return Err(TransportError::Lost { reason: "not connected".to_string() });
        }
        self.sent
            .send(command)
            .map_err(|_| TransportError::Lost { reason: "controller gone".to_string() })
    }

    async fn recv(&mut self) -> Option<Result<ServerEvent, ProtocolError>> {
        loop {
            match self.feed.recv().await {
                Some(Feed::Event(event)) => return Some(event),
                Some(Feed::Drop) => {
                    self.connected = false;
                    return None;
                },
                // Controller gone: park so the supervisor can still shut
                // down via its intent channel.
                None => std::future::pending::<()>().await,
            }
        }
    }

    fn close(&mut self) {
        self.connected = false;
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}
