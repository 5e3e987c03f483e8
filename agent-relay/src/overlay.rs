//! Explanation overlay state machine.
//!
//! ```text
//!            trigger                 show_overlay
//! Hidden ─────────────► Loading ─────────────────► Shown | Error
//!   ▲                    │  ▲ trigger                  │  show_overlay
//!   └────── dismiss ─────┴──┴──────────────────────────┴──► (overwrite)
//! ```
//!
//! There is no request identity: a `show_overlay` that arrives after a newer
//! trigger still lands, so the last response to *arrive* wins. Pushes that
//! arrive while Hidden have no overlay to update and are dropped.

use crate::formatter::format_explanation;
use crate::protocol::ERROR_PREFIX;

/// Overlay lifecycle state. Shown/Error keep the raw payload.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum OverlayState {
    #[default]
    Hidden,
    Loading,
    Shown(String),
    Error(String),
}

/// The page's single explanation overlay.
#[derive(Debug, Default)]
pub struct Overlay {
    state: OverlayState,
}

impl Overlay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &OverlayState {
        &self.state
    }

    pub fn is_visible(&self) -> bool {
        self.state != OverlayState::Hidden
    }

    /// Replace any existing overlay with a fresh one in `Loading`.
    pub fn begin_loading(&mut self) {
        if self.is_visible() {
            tracing::debug!("Replacing existing overlay");
        }
        self.state = OverlayState::Loading;
    }

    /// Apply a `show_overlay` payload. Returns `false` if it was dropped
    /// because the overlay is hidden.
    pub fn show(&mut self, explanation: String) -> bool {
        if !self.is_visible() {
            tracing::debug!("Dropping explanation for dismissed overlay");
            return false;
        }
        self.state = if explanation.starts_with(ERROR_PREFIX) {
            OverlayState::Error(explanation)
        } else {
            OverlayState::Shown(explanation)
        };
        true
    }

    pub fn dismiss(&mut self) {
        self.state = OverlayState::Hidden;
    }

    /// The unformatted text the Copy control puts on the clipboard.
    pub fn copy_text(&self) -> Option<&str> {
        match &self.state {
            OverlayState::Shown(text) | OverlayState::Error(text) => Some(text),
            OverlayState::Hidden | OverlayState::Loading => None,
        }
    }

    /// Markup for the overlay body, or `None` while hidden.
    pub fn render(&self) -> Option<String> {
        match &self.state {
            OverlayState::Hidden => None,
            OverlayState::Loading => Some(
                "<div class=\"explainer-loading\"><div class=\"explainer-spinner\"></div>\
                 <span>Analyzing text...</span></div>"
                    .to_string(),
            ),
            OverlayState::Shown(text) => Some(render_body("explainer-content", text)),
            OverlayState::Error(text) => Some(render_body("explainer-error", text)),
        }
    }
}

fn render_body(class: &str, text: &str) -> String {
    format!(
        "<div class=\"{class}\">{}</div><button id=\"copy-explainer\">Copy</button>",
        format_explanation(text)
    )
}
