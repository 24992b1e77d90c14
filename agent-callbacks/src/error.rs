//! Error types for the turn pipeline
//!
//! Each subsystem has its own error enum; `PipelineError` aggregates them into the
//! single failure type a caller of `TurnPipeline::run_turn` sees. Tool denial is not an
//! error: a blocking hook hands back a structured payload instead.

use std::time::Duration;
use thiserror::Error;

use crate::hooks::InterceptionPoint;
use crate::state::Scope;

/// Failure raised by a registered hook. Aborts the turn.
#[derive(Debug, Error)]
pub enum HookError {
    #[error("hook timed out after {0:?}")]
    Timeout(Duration),

    #[error("audit failed: {0}")]
    Audit(#[from] AuditError),

    #[error(transparent)]
    State(#[from] StateError),

    #[error("{0}")]
    Failed(String),
}

impl HookError {
    pub fn failed(message: impl Into<String>) -> Self {
        HookError::Failed(message.into())
    }
}

/// Failure of the model invocation boundary
#[derive(Debug, Clone, Error)]
pub enum ModelError {
    #[error("[HTTP {status}] {message}")]
    Http { status: u16, message: String },

    #[error("model request timed out")]
    Timeout,

    #[error("model quota exhausted: {0}")]
    QuotaExhausted(String),

    #[error("no scripted model response left")]
    Exhausted,

    #[error("{0}")]
    Other(String),
}

impl ModelError {
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        ModelError::Http {
            status,
            message: message.into(),
        }
    }

    /// Transient failures worth another attempt under a retry policy
    pub fn is_retryable(&self) -> bool {
        match self {
            ModelError::Http { status, .. } => crate::model::retry::is_retryable_status(*status),
            ModelError::Timeout | ModelError::QuotaExhausted(_) => true,
            ModelError::Exhausted | ModelError::Other(_) => false,
        }
    }
}

/// Failure of the tool invocation boundary
#[derive(Debug, Clone, Error)]
pub enum ToolError {
    /// Arguments did not match the tool schema; reported back to the model as a payload
    #[error("{0}")]
    InvalidParameters(String),

    #[error("remote call failed: {0}")]
    Remote(String),

    #[error("remote call timed out")]
    Timeout,

    #[error(transparent)]
    State(#[from] StateError),
}

impl ToolError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, ToolError::Remote(_) | ToolError::Timeout)
    }
}

/// Violations of the scoped state contract
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StateError {
    #[error("state key is empty")]
    EmptyKey,

    #[error("unknown scope prefix '{prefix}:' in key '{key}'")]
    UnknownScopePrefix { prefix: String, key: String },

    #[error("key '{key}' names {found} scope but was addressed as {expected}")]
    ScopeMismatch {
        key: String,
        expected: Scope,
        found: Scope,
    },

    #[error("temp-scoped key '{0}' cannot be persisted")]
    TempNotPersistable(String),

    #[error("value at '{0}' is not an integer")]
    NotANumber(String),

    #[error("value at '{0}' is not an object")]
    NotAnObject(String),

    #[error("session '{0}' not found")]
    SessionNotFound(String),

    #[error("session '{0}' already exists")]
    SessionExists(String),

    #[error("session '{session_id}' does not belong to user '{user_id}'")]
    SessionOwnerMismatch { session_id: String, user_id: String },
}

/// Failure of the audit delegate
#[derive(Debug, Error)]
pub enum AuditError {
    #[error("auditor returned an empty response")]
    EmptyResponse,

    #[error("auditor reply is not a valid verdict: {0}")]
    MalformedVerdict(String),

    #[error("auditor pipeline failed: {0}")]
    Pipeline(#[source] Box<PipelineError>),
}

/// Failure while loading pipeline configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("environment variable {name} has an invalid value '{value}'")]
    InvalidEnv { name: String, value: String },
}

/// Turn-level failure. No partial response accompanies it.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("hook '{hook_id}' failed at {point}: {source}")]
    Hook {
        point: InterceptionPoint,
        hook_id: String,
        #[source]
        source: HookError,
    },

    #[error("model call failed: {0}")]
    Model(#[from] ModelError),

    #[error("tool '{name}' failed: {source}")]
    Tool {
        name: String,
        #[source]
        source: ToolError,
    },

    #[error(transparent)]
    State(#[from] StateError),

    #[error("hook at {point} returned a {found} payload")]
    PayloadMismatch {
        point: InterceptionPoint,
        found: &'static str,
    },

    #[error("model loop exceeded {0} model calls")]
    ModelLoopExhausted(u32),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_error_retryable() {
        assert!(ModelError::http(503, "unavailable").is_retryable());
        assert!(ModelError::http(429, "slow down").is_retryable());
        assert!(ModelError::Timeout.is_retryable());
        assert!(!ModelError::http(400, "bad request").is_retryable());
        assert!(!ModelError::Other("boom".into()).is_retryable());
    }

    #[test]
    fn test_tool_error_retryable() {
        assert!(ToolError::Remote("reset".into()).is_retryable());
        assert!(!ToolError::InvalidParameters("missing field".into()).is_retryable());
    }

    #[test]
    fn test_pipeline_error_display() {
        let err = PipelineError::Hook {
            point: InterceptionPoint::PreTool,
            hook_id: "builtin.permissions".to_string(),
            source: HookError::failed("boom"),
        };
        assert_eq!(
            err.to_string(),
            "hook 'builtin.permissions' failed at before_tool: boom"
        );
    }
}
