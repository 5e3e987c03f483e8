//! Error kinds shared across contexts.
//!
//! None of these is fatal. Each is scoped to the single request that
//! produced it and ends up rendered as text by the state machine that asked.

use thiserror::Error;

/// Failure of a single call to the agent service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// No usable response: connection refused, timeout, or a body that
    /// is not the expected JSON.
    #[error("agent service unreachable: {0}")]
    Unreachable(String),

    /// The service answered but reported a failure.
    #[error("{0}")]
    Remote(String),
}

impl From<reqwest::Error> for GatewayError {
    fn from(e: reqwest::Error) -> Self {
        Self::Unreachable(e.to_string())
    }
}

/// Errors observed by a requesting context.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RelayError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// The context holding the reply channel went away before answering.
    #[error("{0}")]
    ChannelLost(String),

    /// The user action carried no text after trimming; it is ignored.
    #[error("empty input")]
    EmptyInput,
}

impl RelayError {
    /// Reply channel dropped by the coordinator without an answer.
    pub fn reply_dropped() -> Self {
        Self::ChannelLost("The message port closed before a response was received.".into())
    }

    /// Coordinator inbox closed; nothing can be sent.
    pub fn coordinator_gone() -> Self {
        Self::ChannelLost("Could not establish connection. Receiving end does not exist.".into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = GatewayError::Unreachable("connection refused".into());
        assert_eq!(err.to_string(), "agent service unreachable: connection refused");

        let err = GatewayError::Remote("quota exceeded".into());
        assert_eq!(err.to_string(), "quota exceeded");

        let err: RelayError = GatewayError::Remote("boom".into()).into();
        assert_eq!(err.to_string(), "boom");

        assert!(RelayError::reply_dropped().to_string().contains("port closed"));
    }
}
