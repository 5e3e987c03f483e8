//! Inter-context message protocol.
//!
//! Page, popup and coordinator contexts share no memory. They exchange
//! [`Message`]s over `flume` channels; a message that expects an answer
//! travels with a [`Responder`], the single-use sending half of a reply
//! channel.
//!
//! ## Wire shape
//!
//! ```text
//! {"action": "explain_text",    "text": "..."}
//! {"action": "execute_command", "command": "..."}   → reply {"result": "..."}
//! {"action": "show_overlay",    "explanation": "..."}
//! {"action": "command_result",  "result": "..."}
//! ```

use crate::error::RelayError;
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

/// Prefix marking a `show_overlay` payload as an error report.
pub const ERROR_PREFIX: &str = "Error: ";

/// A message between contexts. Immutable and single-use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Message {
    /// Page → coordinator: explain the selected text. Answered by a later
    /// `ShowOverlay` push, never through a reply channel.
    ExplainText { text: String },

    /// Page → coordinator: run a console command. Answered through the
    /// reply channel with a [`CommandReply`].
    ExecuteCommand { command: String },

    /// Coordinator → page: explanation (or `"Error: "`-prefixed failure)
    /// for the overlay.
    ShowOverlay { explanation: String },

    /// Coordinator → page: console output pushed outside a reply channel.
    CommandResult { result: String },
}

impl Message {
    /// The wire discriminant.
    pub fn action(&self) -> &'static str {
        match self {
            Self::ExplainText { .. } => "explain_text",
            Self::ExecuteCommand { .. } => "execute_command",
            Self::ShowOverlay { .. } => "show_overlay",
            Self::CommandResult { .. } => "command_result",
        }
    }

    /// Whether the sender should attach a reply channel.
    pub fn expects_reply(&self) -> bool {
        matches!(self, Self::ExecuteCommand { .. })
    }
}

/// Reply payload of `execute_command`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandReply {
    pub result: String,
}

impl CommandReply {
    pub fn new(result: impl Into<String>) -> Self {
        Self {
            result: result.into(),
        }
    }
}

/// Sending half of a reply channel.
///
/// `respond` consumes the responder, so a channel can be resolved at most
/// once. Dropping it unresolved is seen by the requester as
/// [`RelayError::ChannelLost`].
#[derive(Debug)]
pub struct Responder {
    tx: oneshot::Sender<CommandReply>,
}

impl Responder {
    /// Resolve the channel. Returns `false` if the requester is gone.
    pub fn respond(self, reply: CommandReply) -> bool {
        self.tx.send(reply).is_ok()
    }

    /// True once the requester has stopped waiting.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Receiving half of a reply channel.
#[derive(Debug)]
pub struct ReplyReceiver {
    rx: oneshot::Receiver<CommandReply>,
}

impl ReplyReceiver {
    /// Wait for the single reply.
    pub async fn recv(self) -> Result<CommandReply, RelayError> {
        self.rx.await.map_err(|_| RelayError::reply_dropped())
    }

    /// Wait for the reply from sync code. Must not be called inside an
    /// async context.
    pub fn blocking_recv(self) -> Result<CommandReply, RelayError> {
        self.rx.blocking_recv().map_err(|_| RelayError::reply_dropped())
    }
}

/// Create a connected responder/receiver pair.
pub fn reply_channel() -> (Responder, ReplyReceiver) {
    let (tx, rx) = oneshot::channel();
    (Responder { tx }, ReplyReceiver { rx })
}

/// A message in flight to the coordinator, with its optional reply channel.
#[derive(Debug)]
pub struct Envelope {
    pub message: Message,
    pub responder: Option<Responder>,
}

/// Cloneable sender into the coordinator's inbox.
///
/// Works from sync and async code alike; sends never block.
#[derive(Debug, Clone)]
pub struct RouterHandle {
    tx: flume::Sender<Envelope>,
}

impl RouterHandle {
    /// Send a push message (no reply channel).
    pub fn send(&self, message: Message) -> Result<(), RelayError> {
        self.tx
            .send(Envelope {
                message,
                responder: None,
            })
            .map_err(|_| RelayError::coordinator_gone())
    }

    /// Send a message with a reply channel attached.
    pub fn request(&self, message: Message) -> Result<ReplyReceiver, RelayError> {
        let (responder, receiver) = reply_channel();
        self.tx
            .send(Envelope {
                message,
                responder: Some(responder),
            })
            .map_err(|_| RelayError::coordinator_gone())?;
        Ok(receiver)
    }

    /// True once the coordinator has stopped reading its inbox.
    pub fn is_disconnected(&self) -> bool {
        self.tx.is_disconnected()
    }
}

/// Create the coordinator inbox and a handle to it.
pub fn router_channel() -> (RouterHandle, flume::Receiver<Envelope>) {
    let (tx, rx) = flume::unbounded();
    (RouterHandle { tx }, rx)
}
