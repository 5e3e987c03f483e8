//! Scripted agent service for unit tests.

use crate::error::GatewayError;
use crate::gateway::{AgentService, HealthStatus, HistoryRecord};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;

type Scripted = (Duration, Result<String, GatewayError>);

/// Answers from a script; unscripted inputs succeed immediately with
/// `explained: <text>` / `ran: <command>`.
#[derive(Default)]
pub(crate) struct ScriptedService {
    explain: HashMap<String, Scripted>,
    execute: HashMap<String, Scripted>,
    history: Option<Result<Vec<HistoryRecord>, GatewayError>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn explain_after(
        mut self,
        text: &str,
        delay: Duration,
        result: Result<String, GatewayError>,
    ) -> Self {
        self.explain.insert(text.to_string(), (delay, result));
        self
    }

    pub fn execute_after(
        mut self,
        command: &str,
        delay: Duration,
        result: Result<String, GatewayError>,
    ) -> Self {
        self.execute.insert(command.to_string(), (delay, result));
        self
    }

    pub fn with_history(mut self, result: Result<Vec<HistoryRecord>, GatewayError>) -> Self {
        self.history = Some(result);
        self
    }

    /// Every call made so far, as `endpoint:input`.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

async fn play(script: Option<&Scripted>, fallback: String) -> Result<String, GatewayError> {
    match script {
        Some((delay, result)) => {
            tokio::time::sleep(*delay).await;
            result.clone()
        }
        None => Ok(fallback),
    }
}

#[async_trait]
impl AgentService for ScriptedService {
    async fn explain(&self, text: &str) -> Result<String, GatewayError> {
        self.calls.lock().push(format!("explain:{text}"));
        play(self.explain.get(text), format!("explained: {text}")).await
    }

    async fn execute(&self, command: &str) -> Result<String, GatewayError> {
        self.calls.lock().push(format!("execute:{command}"));
        play(self.execute.get(command), format!("ran: {command}")).await
    }

    async fn history(&self, agent: &str) -> Result<Vec<HistoryRecord>, GatewayError> {
        self.calls.lock().push(format!("history:{agent}"));
        self.history.clone().unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn health(&self) -> Result<HealthStatus, GatewayError> {
        Ok(HealthStatus {
            status: "running".into(),
            agents: vec!["GoogleExplainer".into()],
        })
    }
}
