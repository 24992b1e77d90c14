//! Logging hook - Records every interception point for debugging
//!
//! This hook logs each point of a turn with configurable verbosity and never changes
//! the turn.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;

use crate::hooks::types::{Hook, HookOutcome, HookResult, InterceptionPoint};
use crate::pipeline::TurnEnvelope;
use crate::state::TurnState;

/// Verbosity level for logging
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Only the turn boundaries
    Warn,
    #[default]
    Info,
    Debug,
    /// Full envelope and state snapshot (may include sensitive data)
    Trace,
}

/// Hook that logs every point
pub struct LoggingHook {
    level: LogLevel,
    /// Whether to include tool and response details
    include_context: bool,
}

impl LoggingHook {
    pub fn new() -> Self {
        Self {
            level: LogLevel::Info,
            include_context: false,
        }
    }

    pub fn with_level(level: LogLevel) -> Self {
        Self {
            level,
            include_context: matches!(level, LogLevel::Debug | LogLevel::Trace),
        }
    }

    pub fn verbose() -> Self {
        Self {
            level: LogLevel::Trace,
            include_context: true,
        }
    }

    fn format_context(&self, envelope: &TurnEnvelope, state: &TurnState) -> String {
        if !self.include_context {
            return String::new();
        }

        let mut parts = vec![format!("session={}", state.session_id())];
        if let Some(tool_name) = envelope.tool_name() {
            parts.push(format!("tool={}", tool_name));
        }
        if let Some(response) = &envelope.response {
            parts.push(format!("response_chars={}", response.content.chars().count()));
            if response.has_tool_calls() {
                parts.push(format!("tool_calls={}", response.tool_calls.len()));
            }
        }
        if envelope.tool_result.is_some() {
            parts.push("has_result=true".to_string());
        }

        format!(" [{}]", parts.join(", "))
    }

    fn log(&self, envelope: &TurnEnvelope, state: &TurnState) {
        let point = envelope.stage.as_str();
        let ctx_str = self.format_context(envelope, state);

        match self.level {
            LogLevel::Warn => {
                if matches!(
                    envelope.stage,
                    InterceptionPoint::PreTurn | InterceptionPoint::PostTurn
                ) {
                    log::warn!("[HOOK EVENT] {} ({}){}", point, envelope.invocation_id, ctx_str);
                }
            }
            LogLevel::Info => {
                log::info!("[HOOK EVENT] {} ({}){}", point, envelope.invocation_id, ctx_str);
            }
            LogLevel::Debug => {
                log::debug!("[HOOK EVENT] {} ({}){}", point, envelope.invocation_id, ctx_str);
            }
            LogLevel::Trace => {
                let snapshot = state.snapshot().unwrap_or_default();
                log::trace!(
                    "[HOOK EVENT] {} - envelope: {:?} - state: {}",
                    point,
                    envelope,
                    serde_json::Value::Object(snapshot)
                );
            }
        }
    }
}

impl Default for LoggingHook {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Hook for LoggingHook {
    fn id(&self) -> &str {
        "builtin.logging"
    }

    fn name(&self) -> &str {
        "Logging Hook"
    }

    fn description(&self) -> &str {
        "Logs every interception point of a turn"
    }

    fn points(&self) -> Vec<InterceptionPoint> {
        InterceptionPoint::iter().collect()
    }

    async fn execute(&self, envelope: &TurnEnvelope, state: &TurnState) -> HookOutcome {
        self.log(envelope, state);
        Ok(HookResult::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ModelRequest, ModelResponse};
    use crate::state::StateStore;
    use serde_json::Map;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_logging_hook_always_continues() {
        let store = Arc::new(StateStore::new("logging_test"));
        store.create_session("u1", "s1", Map::new()).unwrap();
        let state = TurnState::new(store, "u1", "s1", "inv-1");

        let hook = LoggingHook::verbose();
        assert_eq!(hook.points().len(), 6);

        for point in InterceptionPoint::iter() {
            let envelope = TurnEnvelope::new(point, "inv-1", ModelRequest::new("scripted"))
                .with_response(ModelResponse::text("hello"));
            let result = hook.execute(&envelope, &state).await.unwrap();
            assert!(matches!(result, HookResult::Continue));
        }
    }
}
