//! # agent-relay
//!
//! Relay between in-page widgets and a locally running agent service.
//!
//! Three isolated contexts cooperate without sharing memory:
//!
//! ```text
//! page (PageController)  ──Message──►  coordinator (MessageRouter)  ──HTTP──►  agent service
//!        ▲   overlay + console              │
//!        └──── reply channel / tab push ────┘
//! popup (HistoryFetcher)  ─────────────────────────────────────────HTTP──►  /history
//! ```
//!
//! - **RelayBridge**: runs the coordinator on its own tokio thread
//! - **MessageRouter**: dispatches `explain_text` / `execute_command`
//! - **HttpGateway**: single-shot calls to the agent service
//! - **PageController**: owns the explanation overlay and command center
//! - **HistoryFetcher**: one history read per popup open

pub mod command_center;
pub mod config;
pub mod error;
pub mod formatter;
pub mod gateway;
pub mod keybindings;
pub mod overlay;
pub mod page;
pub mod popup;
pub mod protocol;
pub mod router;
pub mod runtime;
pub mod storage;
pub mod tabs;

#[cfg(test)]
mod testing;

pub use config::RelayConfig;
pub use error::{GatewayError, RelayError};
pub use gateway::{AgentService, HttpGateway};
pub use page::{PageController, PageHandle};
pub use protocol::{Message, RouterHandle};
pub use runtime::RelayBridge;
