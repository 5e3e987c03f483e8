//! Page controller for the content-script context.
//!
//! One controller per page owns the [`Overlay`] and the [`CommandCenter`]
//! and is their only mutator. It drains a single inbox of [`PageEvent`]s:
//! user input from the host, push messages from the coordinator, and command
//! replies forwarded back by small waiter tasks.
//!
//! ```text
//! host ──PageEvent──► inbox ──► PageController ──Message──► coordinator
//!                       ▲                                      │
//!        CommandReplied ┴── reply waiter ◄── reply channel ◄───┤
//!        Push           ┴── push forwarder ◄── tab inbox ◄─────┘
//! ```

use crate::command_center::{CommandCenter, TranscriptLine};
use crate::error::RelayError;
use crate::keybindings::{KeyBindings, KeyPress, Trigger};
use crate::overlay::{Overlay, OverlayState};
use crate::protocol::{CommandReply, Message, RouterHandle, ERROR_PREFIX};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::oneshot;

/// Destination of the overlay's Copy control.
pub trait Clipboard: Send + Sync {
    fn write_text(&self, text: &str);
}

/// Clipboard that remembers the last copied text.
#[derive(Debug, Default)]
pub struct MemoryClipboard {
    contents: Mutex<Option<String>>,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> Option<String> {
        self.contents.lock().clone()
    }
}

impl Clipboard for MemoryClipboard {
    fn write_text(&self, text: &str) {
        *self.contents.lock() = Some(text.to_string());
    }
}

/// Input to the page context.
#[derive(Debug)]
pub enum PageEvent {
    /// A key went down while `selection` was the page's selected text.
    KeyDown { press: KeyPress, selection: String },
    /// The console input field now holds this text.
    ConsoleInput(String),
    /// Enter in the console input field.
    ConsoleSubmit,
    /// The console's close control.
    ConsoleClose,
    /// The overlay's close control.
    DismissOverlay,
    /// The overlay's Copy control.
    CopyExplanation,
    /// The page navigated; all widget state is discarded.
    Navigate,
    /// A push message from the coordinator.
    Push(Message),
    /// The reply (or its loss) for one submitted command.
    CommandReplied(Result<CommandReply, RelayError>),
    /// Ask for a copy of the current state.
    Snapshot(oneshot::Sender<PageSnapshot>),
}

/// Point-in-time view of the page widgets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSnapshot {
    pub overlay: OverlayState,
    pub overlay_markup: Option<String>,
    pub console_open: bool,
    pub console_markup: Option<String>,
    pub transcript: Vec<TranscriptLine>,
    /// Commands submitted whose reply has not arrived yet.
    pub pending_commands: usize,
}

/// Owner of a page's overlay and command center.
pub struct PageController {
    keys: KeyBindings,
    overlay: Overlay,
    console: CommandCenter,
    router: RouterHandle,
    clipboard: Arc<dyn Clipboard>,
    /// Weak, so the controller alone does not keep its inbox open.
    events: flume::WeakSender<PageEvent>,
    pending_commands: usize,
}

impl PageController {
    /// Start a page context on the current tokio runtime.
    ///
    /// `pushes` is the tab's push inbox from the
    /// [`TabRegistry`](crate::tabs::TabRegistry).
    pub fn spawn(
        keys: KeyBindings,
        router: RouterHandle,
        clipboard: Arc<dyn Clipboard>,
        pushes: flume::Receiver<Message>,
    ) -> PageHandle {
        let (tx, rx) = flume::unbounded();
        let controller = PageController::new(keys, router, clipboard, tx.downgrade());

        let forward = tx.clone();
        tokio::spawn(async move {
            while let Ok(message) = pushes.recv_async().await {
                if forward.send(PageEvent::Push(message)).is_err() {
                    break;
                }
            }
        });
        tokio::spawn(controller.run(rx));

        PageHandle { tx }
    }

    fn new(
        keys: KeyBindings,
        router: RouterHandle,
        clipboard: Arc<dyn Clipboard>,
        events: flume::WeakSender<PageEvent>,
    ) -> Self {
        Self {
            keys,
            overlay: Overlay::new(),
            console: CommandCenter::new(),
            router,
            clipboard,
            events,
            pending_commands: 0,
        }
    }

    async fn run(mut self, inbox: flume::Receiver<PageEvent>) {
        while let Ok(event) = inbox.recv_async().await {
            self.handle(event);
        }
        tracing::debug!("Page context closed");
    }

    fn handle(&mut self, event: PageEvent) {
        match event {
            PageEvent::KeyDown { press, selection } => match self.keys.classify(&press) {
                Some(Trigger::Explain) => match self.explain(&selection) {
                    Ok(()) => {}
                    Err(RelayError::EmptyInput) => tracing::debug!("No text selected"),
                    Err(e) => tracing::warn!("Explain request not delivered: {e}"),
                },
                Some(Trigger::ToggleConsole) => self.console.toggle(),
                None => {}
            },
            PageEvent::ConsoleInput(text) => self.console.set_input(text),
            PageEvent::ConsoleSubmit => self.submit_command(),
            PageEvent::ConsoleClose => self.console.close(),
            PageEvent::DismissOverlay => self.overlay.dismiss(),
            PageEvent::CopyExplanation => {
                if let Some(text) = self.overlay.copy_text() {
                    self.clipboard.write_text(text);
                }
            }
            PageEvent::Navigate => {
                self.overlay.dismiss();
                self.console.close();
            }
            PageEvent::Push(message) => self.on_push(message),
            PageEvent::CommandReplied(reply) => {
                self.pending_commands = self.pending_commands.saturating_sub(1);
                match reply {
                    Ok(reply) => self.console.append_result(&reply.result),
                    Err(e) => self
                        .console
                        .append_system_error(&format!("Extension Error: {e}")),
                }
            }
            PageEvent::Snapshot(reply) => {
                let _ = reply.send(self.snapshot());
            }
        }
    }

    /// Show the loading overlay and ask the coordinator for an explanation.
    fn explain(&mut self, selection: &str) -> Result<(), RelayError> {
        let text = selection.trim();
        if text.is_empty() {
            return Err(RelayError::EmptyInput);
        }
        tracing::debug!("Explain chord with {} chars selected", text.chars().count());
        self.overlay.begin_loading();
        let sent = self.router.send(Message::ExplainText {
            text: text.to_string(),
        });
        if let Err(e) = &sent {
            self.overlay.show(format!("{ERROR_PREFIX}{e}"));
        }
        sent
    }

    fn submit_command(&mut self) {
        // Replies come back through the inbox; check it before echoing.
        let Some(events) = self.events.upgrade() else {
            tracing::warn!("Page inbox closed, not submitting command");
            return;
        };
        let Some(command) = self.console.submit() else {
            return;
        };
        let receiver = match self.router.request(Message::ExecuteCommand { command }) {
            Ok(receiver) => receiver,
            Err(e) => {
                self.console
                    .append_system_error(&format!("Extension Error: {e}"));
                return;
            }
        };
        self.pending_commands += 1;
        tokio::spawn(async move {
            let reply = receiver.recv().await;
            let _ = events.send(PageEvent::CommandReplied(reply));
        });
    }

    fn on_push(&mut self, message: Message) {
        match message {
            Message::ShowOverlay { explanation } => {
                self.overlay.show(explanation);
            }
            Message::CommandResult { result } => self.console.append_result(&result),
            other => tracing::debug!("Ignoring '{}' pushed to page", other.action()),
        }
    }

    fn snapshot(&self) -> PageSnapshot {
        PageSnapshot {
            overlay: self.overlay.state().clone(),
            overlay_markup: self.overlay.render(),
            console_open: self.console.is_open(),
            console_markup: self.console.render(),
            transcript: self.console.transcript().to_vec(),
            pending_commands: self.pending_commands,
        }
    }
}

/// Host-side handle to a running page context.
#[derive(Debug, Clone)]
pub struct PageHandle {
    tx: flume::Sender<PageEvent>,
}

impl PageHandle {
    /// Deliver an event. Returns `false` if the page context has ended.
    pub fn send(&self, event: PageEvent) -> bool {
        self.tx.send(event).is_ok()
    }

    pub fn key_down(&self, press: KeyPress, selection: impl Into<String>) -> bool {
        self.send(PageEvent::KeyDown {
            press,
            selection: selection.into(),
        })
    }

    /// Type `text` into the console input and press Enter.
    pub fn run_command(&self, text: impl Into<String>) -> bool {
        self.send(PageEvent::ConsoleInput(text.into())) && self.send(PageEvent::ConsoleSubmit)
    }

    pub async fn snapshot(&self) -> Option<PageSnapshot> {
        let (tx, rx) = oneshot::channel();
        if !self.send(PageEvent::Snapshot(tx)) {
            return None;
        }
        rx.await.ok()
    }
}
