//! Message router, the coordinator's inbound entry point.
//!
//! Each inbound [`Envelope`] is classified by [`MessageRouter::dispatch`]:
//!
//! - `explain_text` → [`Dispatch::Background`]: the explain call runs
//!   detached and its outcome is pushed as `show_overlay` to whichever tab is
//!   active when it completes. The reply channel is not used.
//! - `execute_command` → [`Dispatch::Reply`]: the future always yields a
//!   [`CommandReply`]; gateway failures are encoded in the result text.
//! - `show_overlay` / `command_result` → [`Dispatch::Ignored`]: page-bound
//!   pushes with no coordinator consumer.
//!
//! Whether a message is answered later is visible in the type returned by
//! `dispatch`, so the loop never has to be told to keep a channel open.

use crate::error::GatewayError;
use crate::gateway::AgentService;
use crate::protocol::{CommandReply, Envelope, Message, ERROR_PREFIX};
use crate::storage::{StateStore, LAST_EXPLANATION_KEY, LAST_TEXT_KEY, LOADING_PLACEHOLDER};
use crate::tabs::TabRegistry;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Overlay text pushed when the agent service cannot be reached.
pub const NETWORK_ERROR: &str = "Network Error: Is the server running? Check console.";

pub type ReplyFuture = Pin<Box<dyn Future<Output = CommandReply> + Send + 'static>>;
pub type TaskFuture = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// How an inbound message will be completed.
pub enum Dispatch {
    /// Resolve the message's reply channel with the future's output.
    Reply(ReplyFuture),
    /// Run to completion without touching the reply channel.
    Background(TaskFuture),
    /// Nothing to do.
    Ignored,
}

impl std::fmt::Debug for Dispatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Reply(_) => f.write_str("Dispatch::Reply"),
            Self::Background(_) => f.write_str("Dispatch::Background"),
            Self::Ignored => f.write_str("Dispatch::Ignored"),
        }
    }
}

/// Overlay payload for a failed explain call.
pub fn overlay_error(err: &GatewayError) -> String {
    match err {
        GatewayError::Unreachable(_) => format!("{ERROR_PREFIX}{NETWORK_ERROR}"),
        GatewayError::Remote(message) => format!("{ERROR_PREFIX}{message}"),
    }
}

/// Routes coordinator-bound messages to the agent service.
#[derive(Clone)]
pub struct MessageRouter {
    service: Arc<dyn AgentService>,
    tabs: Arc<TabRegistry>,
    store: Arc<dyn StateStore>,
}

impl MessageRouter {
    pub fn new(
        service: Arc<dyn AgentService>,
        tabs: Arc<TabRegistry>,
        store: Arc<dyn StateStore>,
    ) -> Self {
        Self {
            service,
            tabs,
            store,
        }
    }

    pub fn tabs(&self) -> &Arc<TabRegistry> {
        &self.tabs
    }

    /// Classify `message` and build the work that completes it.
    pub fn dispatch(&self, message: Message) -> Dispatch {
        match message {
            Message::ExplainText { text } => {
                tracing::info!("Received text to explain ({} chars)", text.chars().count());
                record(&*self.store, LAST_EXPLANATION_KEY, LOADING_PLACEHOLDER);
                record(&*self.store, LAST_TEXT_KEY, &text);
                Dispatch::Background(Box::pin(explain_and_push(
                    Arc::clone(&self.service),
                    Arc::clone(&self.tabs),
                    Arc::clone(&self.store),
                    text,
                )))
            }
            Message::ExecuteCommand { command } => {
                tracing::info!("Executing command: {command}");
                let service = Arc::clone(&self.service);
                Dispatch::Reply(Box::pin(async move {
                    match service.execute(&command).await {
                        Ok(result) => CommandReply::new(result),
                        Err(e) => {
                            tracing::warn!("Command '{command}' failed: {e}");
                            CommandReply::new(format!("{ERROR_PREFIX}{e}"))
                        }
                    }
                }))
            }
            Message::ShowOverlay { .. } | Message::CommandResult { .. } => {
                tracing::debug!("Ignoring page-bound '{}' at coordinator", message.action());
                Dispatch::Ignored
            }
        }
    }

    /// Route one envelope, spawning whatever work it needs.
    pub fn route(&self, envelope: Envelope) {
        let Envelope { message, responder } = envelope;
        match (self.dispatch(message), responder) {
            (Dispatch::Reply(reply), Some(responder)) => {
                tokio::spawn(async move {
                    if !responder.respond(reply.await) {
                        tracing::debug!("Requester went away before the reply was ready");
                    }
                });
            }
            (Dispatch::Reply(reply), None) => {
                tokio::spawn(async move {
                    let reply = reply.await;
                    tracing::debug!("Discarding reply with no reply channel: {}", reply.result);
                });
            }
            (Dispatch::Background(task), _) => {
                tokio::spawn(task);
            }
            (Dispatch::Ignored, _) => {}
        }
    }

    /// Drain the coordinator inbox until it closes or `shutdown` fires.
    pub async fn run(self, inbox: flume::Receiver<Envelope>, shutdown: CancellationToken) {
        tracing::info!("Message router started");
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                envelope = inbox.recv_async() => match envelope {
                    Ok(envelope) => self.route(envelope),
                    Err(_) => break,
                },
            }
        }
        tracing::info!("Message router stopped");
    }
}

async fn explain_and_push(
    service: Arc<dyn AgentService>,
    tabs: Arc<TabRegistry>,
    store: Arc<dyn StateStore>,
    text: String,
) {
    let explanation = match service.explain(&text).await {
        Ok(explanation) => explanation,
        Err(e) => {
            tracing::warn!("Explain failed: {e}");
            overlay_error(&e)
        }
    };
    record(&*store, LAST_EXPLANATION_KEY, &explanation);

    if !tabs.push_to_active(Message::ShowOverlay { explanation }) {
        tracing::warn!("No active tab to show the explanation in");
    }
}

fn record(store: &dyn StateStore, key: &str, value: &str) {
    if let Err(e) = store.set(key, value) {
        tracing::warn!("Failed to record {key}: {e}");
    }
}
