//! Popup context: recent history for one agent.
//!
//! Every open issues a fresh `/history` read. There is no retry, paging or
//! caching; the records are shown in the order the service returns them.

use crate::formatter::escape_html;
use crate::gateway::{AgentService, HistoryRecord};
use std::sync::Arc;

pub const EMPTY_MESSAGE: &str = "No recent history.";
pub const ERROR_MESSAGE: &str = "Failed to load history. Is server running?";

/// What the popup shows after loading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryView {
    Empty,
    Entries(Vec<HistoryRecord>),
    Failed(String),
}

impl HistoryView {
    /// Markup for the history list.
    pub fn render(&self) -> String {
        match self {
            Self::Empty => format!("<p>{EMPTY_MESSAGE}</p>"),
            Self::Failed(_) => format!("<p class=\"error\">{ERROR_MESSAGE}</p>"),
            Self::Entries(records) => records
                .iter()
                .map(|record| {
                    format!(
                        "<div class=\"history-item\"><div class=\"query\">\"{}\"</div>\
                         <div class=\"timestamp\">{}</div></div>",
                        escape_html(&record.input_text),
                        record.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
                    )
                })
                .collect(),
        }
    }

    /// Plain-text rendering, one entry per line.
    pub fn render_text(&self) -> String {
        match self {
            Self::Empty => EMPTY_MESSAGE.to_string(),
            Self::Failed(_) => ERROR_MESSAGE.to_string(),
            Self::Entries(records) => records
                .iter()
                .map(|r| format!("\"{}\"  {}", r.input_text, r.timestamp.format("%Y-%m-%d %H:%M")))
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

/// Loads history for a fixed agent.
#[derive(Clone)]
pub struct HistoryFetcher {
    service: Arc<dyn AgentService>,
    agent: String,
}

impl HistoryFetcher {
    pub fn new(service: Arc<dyn AgentService>, agent: impl Into<String>) -> Self {
        Self {
            service,
            agent: agent.into(),
        }
    }

    pub fn agent(&self) -> &str {
        &self.agent
    }

    /// One read, as done each time the popup opens.
    pub async fn open(&self) -> HistoryView {
        match self.service.history(&self.agent).await {
            Ok(records) if records.is_empty() => HistoryView::Empty,
            Ok(records) => HistoryView::Entries(records),
            Err(e) => {
                tracing::warn!("History request for {} failed: {e}", self.agent);
                HistoryView::Failed(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GatewayError;
    use crate::testing::ScriptedService;
    use chrono::{TimeZone, Utc};

    fn record(text: &str, hour: u32) -> HistoryRecord {
        HistoryRecord {
            input_text: text.into(),
            timestamp: Utc.with_ymd_and_hms(2024, 5, 1, hour, 0, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_empty_history_shows_message() {
        let fetcher = HistoryFetcher::new(Arc::new(ScriptedService::new()), "GoogleExplainer");
        let view = fetcher.open().await;
        assert_eq!(view, HistoryView::Empty);
        assert_eq!(view.render(), "<p>No recent history.</p>");
    }

    #[tokio::test]
    async fn test_entries_keep_service_order() {
        let service = ScriptedService::new()
            .with_history(Ok(vec![record("newer", 12), record("<older>", 9)]));
        let fetcher = HistoryFetcher::new(Arc::new(service), "GoogleExplainer");

        let html = fetcher.open().await.render();
        let newer = html.find("newer").unwrap();
        let older = html.find("&lt;older&gt;").unwrap();
        assert!(newer < older);
        assert!(html.contains("2024-05-01 12:00:00 UTC"));
    }

    #[tokio::test]
    async fn test_failure_is_distinct_state() {
        let service = ScriptedService::new()
            .with_history(Err(GatewayError::Unreachable("connection refused".into())));
        let fetcher = HistoryFetcher::new(Arc::new(service), "GoogleExplainer");

        let view = fetcher.open().await;
        assert!(matches!(view, HistoryView::Failed(_)));
        assert!(view.render().contains("class=\"error\""));
        assert_eq!(view.render_text(), ERROR_MESSAGE);
    }

    #[tokio::test]
    async fn test_each_open_reads_again() {
        let service = Arc::new(ScriptedService::new());
        let fetcher = HistoryFetcher::new(Arc::clone(&service) as Arc<dyn AgentService>, "Main");
        fetcher.open().await;
        fetcher.open().await;
        assert_eq!(service.calls(), vec!["history:Main", "history:Main"]);
    }
}
