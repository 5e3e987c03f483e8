//! Coordinator runtime bridge.
//!
//! The coordinator (the extension's background context) runs on a dedicated
//! thread with its own tokio `Runtime`. Page and popup contexts reach it
//! through a [`RouterHandle`], which is a `flume` sender and therefore usable
//! from sync code, smol, or another tokio runtime.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────┐   flume: Envelope    ┌─────────────────────┐
//! │  page / popup    │ ───────────────────► │  coordinator thread │
//! │  contexts        │ ◄── reply channel ── │  MessageRouter      │
//! │                  │ ◄── tab push ─────── │  → AgentService     │
//! └──────────────────┘                      └─────────────────────┘
//! ```
//!
//! Shutting down drops every unanswered reply channel, which requesters see
//! as `ChannelLost`.

use crate::gateway::AgentService;
use crate::protocol::{router_channel, RouterHandle};
use crate::router::MessageRouter;
use crate::storage::StateStore;
use crate::tabs::TabRegistry;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use tokio_util::sync::CancellationToken;

/// Handle to the running coordinator.
pub struct RelayBridge {
    router: RouterHandle,
    tabs: Arc<TabRegistry>,
    shutdown: CancellationToken,
    stopped: Arc<AtomicBool>,
    runtime_thread: Option<thread::JoinHandle<()>>,
}

impl RelayBridge {
    /// Spawn the coordinator thread and start routing.
    pub fn start(
        service: Arc<dyn AgentService>,
        store: Arc<dyn StateStore>,
    ) -> std::io::Result<Self> {
        let tabs = Arc::new(TabRegistry::new());
        let router = MessageRouter::new(service, Arc::clone(&tabs), store);
        let (handle, inbox) = router_channel();
        let shutdown = CancellationToken::new();
        let stopped = Arc::new(AtomicBool::new(false));

        let token = shutdown.clone();
        let stopped_flag = Arc::clone(&stopped);
        let runtime_thread = thread::Builder::new()
            .name("agent-relay-coordinator".into())
            .spawn(move || {
                match tokio::runtime::Builder::new_multi_thread()
                    .worker_threads(2)
                    .thread_name("agent-relay-worker")
                    .enable_all()
                    .build()
                {
                    Ok(rt) => {
                        rt.block_on(router.run(inbox.clone(), token));
                        // Unrouted envelopes still hold reply channels.
                        inbox.drain().for_each(drop);
                        // Dropping the runtime drops in-flight calls and
                        // their reply channels.
                        drop(rt);
                    }
                    Err(e) => tracing::error!("Failed to start coordinator runtime: {e}"),
                }
                stopped_flag.store(true, Ordering::Release);
            })?;

        Ok(Self {
            router: handle,
            tabs,
            shutdown,
            stopped,
            runtime_thread: Some(runtime_thread),
        })
    }

    /// Sender into the coordinator's inbox.
    pub fn router(&self) -> RouterHandle {
        self.router.clone()
    }

    pub fn tabs(&self) -> &Arc<TabRegistry> {
        &self.tabs
    }

    /// Whether the coordinator thread has finished.
    pub fn is_shutdown(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    /// Ask the coordinator to stop. Does not wait.
    pub fn request_shutdown(&self) {
        self.shutdown.cancel();
    }

    /// Stop the coordinator and wait for its thread to exit.
    pub fn shutdown(mut self) {
        self.request_shutdown();
        if let Some(thread) = self.runtime_thread.take() {
            if thread.join().is_err() {
                tracing::error!("Coordinator thread panicked");
            }
        }
    }
}

impl Drop for RelayBridge {
    fn drop(&mut self) {
        if !self.is_shutdown() {
            self.request_shutdown();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RelayError;
    use crate::protocol::Message;
    use crate::storage::MemoryStore;
    use crate::testing::ScriptedService;
    use std::time::Duration;

    fn bridge_with(service: ScriptedService) -> RelayBridge {
        RelayBridge::start(Arc::new(service), Arc::new(MemoryStore::new())).unwrap()
    }

    #[test]
    fn test_bridge_request_reply() {
        let bridge = bridge_with(ScriptedService::new());
        let reply = bridge
            .router()
            .request(Message::ExecuteCommand {
                command: "hello".into(),
            })
            .unwrap()
            .blocking_recv()
            .unwrap();
        assert_eq!(reply.result, "ran: hello");
        bridge.shutdown();
    }

    #[test]
    fn test_bridge_pushes_explanation_to_active_tab() {
        let bridge = bridge_with(ScriptedService::new());
        let page = bridge.tabs().open(4);
        bridge.tabs().activate(4);

        bridge
            .router()
            .send(Message::ExplainText { text: "tokio".into() })
            .unwrap();
        let pushed = page.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(
            pushed,
            Message::ShowOverlay {
                explanation: "explained: tokio".into()
            }
        );
        bridge.shutdown();
    }

    #[test]
    fn test_shutdown_loses_pending_replies() {
        let service = ScriptedService::new().execute_after(
            "sleep",
            Duration::from_secs(600),
            Ok("never".into()),
        );
        let bridge = bridge_with(service);
        let router = bridge.router();
        let pending = router
            .request(Message::ExecuteCommand {
                command: "sleep".into(),
            })
            .unwrap();

        bridge.shutdown();
        assert!(matches!(
            pending.blocking_recv(),
            Err(RelayError::ChannelLost(_))
        ));
        assert!(router.is_disconnected());
        assert!(router
            .request(Message::ExecuteCommand {
                command: "late".into()
            })
            .is_err());
    }

    #[test]
    fn test_shutdown_flag() {
        let bridge = bridge_with(ScriptedService::new());
        let stopped = Arc::clone(&bridge.stopped);
        assert!(!bridge.is_shutdown());
        bridge.shutdown();
        assert!(stopped.load(Ordering::Acquire));
    }
}
