//! Remote call gateway for the local agent service.
//!
//! Every call is a single HTTP request with no retry. Transport failures and
//! undecodable bodies become [`GatewayError::Unreachable`]; a decoded body
//! that reports failure becomes [`GatewayError::Remote`].
//!
//! | Endpoint | Method | Success body |
//! |----------|--------|--------------|
//! | `/explain` | POST `{text}` | `{status: "success", explanation}` |
//! | `/execute` | POST `{command}` | `{result}`, `{message}` or neither |
//! | `/history?agent=<name>` | GET | `{history: [{input_text, timestamp}]}` |
//! | `/health` | GET | `{status, agents}` |

use crate::config::RelayConfig;
use crate::error::GatewayError;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::time::Duration;

/// One past interaction, as stored by the agent service.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HistoryRecord {
    pub input_text: String,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub timestamp: DateTime<Utc>,
}

/// Result of `/health`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub agents: Vec<String>,
}

/// The agent service as seen by the relay.
#[async_trait]
pub trait AgentService: Send + Sync {
    /// Explain a piece of selected text.
    async fn explain(&self, text: &str) -> Result<String, GatewayError>;

    /// Run a free-form console command and return its output.
    async fn execute(&self, command: &str) -> Result<String, GatewayError>;

    /// Recent interactions of `agent`, most recent first.
    async fn history(&self, agent: &str) -> Result<Vec<HistoryRecord>, GatewayError>;

    /// Liveness and registered agents.
    async fn health(&self) -> Result<HealthStatus, GatewayError>;
}

#[derive(Serialize)]
struct ExplainRequest<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct ExecuteRequest<'a> {
    command: &'a str,
}

#[derive(Deserialize)]
struct ExplainResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    explanation: Option<String>,
    #[serde(default)]
    message: Option<String>,
    /// FastAPI puts `HTTPException` details here.
    #[serde(default)]
    detail: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct ExecuteResponse {
    #[serde(default)]
    result: Option<serde_json::Value>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Deserialize)]
struct HistoryResponse {
    #[serde(default)]
    history: Vec<HistoryRecord>,
}

/// HTTP implementation of [`AgentService`].
#[derive(Debug, Clone)]
pub struct HttpGateway {
    base_url: String,
    http_client: reqwest::Client,
}

impl HttpGateway {
    /// Create a gateway for `base_url` with a per-request timeout.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, GatewayError> {
        let http_client = reqwest::Client::builder().timeout(timeout).build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self {
            base_url,
            http_client,
        })
    }

    /// Create a gateway from the relay configuration.
    pub fn from_config(config: &RelayConfig) -> Result<Self, GatewayError> {
        Self::new(config.base_url.clone(), config.request_timeout())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post<B, R>(&self, endpoint: &str, body: &B) -> Result<R, GatewayError>
    where
        B: Serialize + ?Sized + Sync,
        R: DeserializeOwned,
    {
        let url = format!("{}{endpoint}", self.base_url);
        tracing::debug!("POST {url}");
        let response = self.http_client.post(&url).json(body).send().await?;
        Ok(response.json::<R>().await?)
    }

    async fn get<R>(&self, endpoint: &str, query: &[(&str, &str)]) -> Result<R, GatewayError>
    where
        R: DeserializeOwned,
    {
        let url = format!("{}{endpoint}", self.base_url);
        tracing::debug!("GET {url}");
        let response = self.http_client.get(&url).query(query).send().await?;
        Ok(response.json::<R>().await?)
    }
}

#[async_trait]
impl AgentService for HttpGateway {
    async fn explain(&self, text: &str) -> Result<String, GatewayError> {
        let body: ExplainResponse = self.post("/explain", &ExplainRequest { text }).await?;
        if body.status.as_deref() == Some("success") {
            return Ok(body.explanation.unwrap_or_default());
        }
        let message = body
            .message
            .filter(|m| !m.is_empty())
            .or_else(|| body.detail.as_ref().map(value_text))
            .unwrap_or_else(|| "Unknown Agent Error".to_string());
        Err(GatewayError::Remote(message))
    }

    /// A body with neither `result` nor `message` yields an empty string;
    /// only transport failures are errors here.
    async fn execute(&self, command: &str) -> Result<String, GatewayError> {
        let body: ExecuteResponse = self.post("/execute", &ExecuteRequest { command }).await?;
        Ok(body
            .result
            .as_ref()
            .map(value_text)
            .filter(|r| !r.is_empty())
            .or(body.message)
            .unwrap_or_default())
    }

    async fn history(&self, agent: &str) -> Result<Vec<HistoryRecord>, GatewayError> {
        let body: HistoryResponse = self.get("/history", &[("agent", agent)]).await?;
        Ok(body.history)
    }

    async fn health(&self) -> Result<HealthStatus, GatewayError> {
        self.get("/health", &[]).await
    }
}

/// Render a JSON value as display text; strings lose their quotes.
fn value_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Accept RFC 3339 as well as SQLite's `CURRENT_TIMESTAMP` format (UTC).
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {raw}")))
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}
