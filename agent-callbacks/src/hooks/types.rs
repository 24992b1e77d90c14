//! Hook types and traits for the turn interception points
//!
//! This module defines the interception points, the tagged result a hook returns and the
//! `Hook` trait itself.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use strum::{Display, EnumIter, IntoStaticStr};

use crate::error::HookError;
use crate::model::ModelResponse;
use crate::pipeline::TurnEnvelope;
use crate::state::TurnState;

/// Points in a turn where a hook can be attached
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter, IntoStaticStr,
)]
pub enum InterceptionPoint {
    /// Before the agent starts processing the turn
    #[serde(rename = "before_agent")]
    #[strum(serialize = "before_agent")]
    PreTurn,
    /// Before each model call
    #[serde(rename = "before_model")]
    #[strum(serialize = "before_model")]
    PreModel,
    /// After each model call, or after a PreModel substitute
    #[serde(rename = "after_model")]
    #[strum(serialize = "after_model")]
    PostModel,
    /// Before each tool invocation
    #[serde(rename = "before_tool")]
    #[strum(serialize = "before_tool")]
    PreTool,
    /// After each tool invocation
    #[serde(rename = "after_tool")]
    #[strum(serialize = "after_tool")]
    PostTool,
    /// After the agent produced its final response
    #[serde(rename = "after_agent")]
    #[strum(serialize = "after_agent")]
    PostTurn,
}

impl InterceptionPoint {
    pub fn as_str(&self) -> &'static str {
        (*self).into()
    }

    /// Whether a short-circuit at this point must carry a tool result rather than a
    /// model response
    pub fn expects_tool_result(&self) -> bool {
        matches!(self, InterceptionPoint::PreTool | InterceptionPoint::PostTool)
    }
}

/// Substitute value carried by a short-circuit
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Stands in for a model response (PreTurn, PreModel, PostModel, PostTurn)
    Response(ModelResponse),
    /// Stands in for a tool result (PreTool, PostTool)
    ToolResult(Value),
}

impl Payload {
    pub fn kind(&self) -> &'static str {
        match self {
            Payload::Response(_) => "response",
            Payload::ToolResult(_) => "tool result",
        }
    }
}

/// Result of a hook execution.
///
/// Mutation and short-circuit are separate variants, so a hook cannot do both.
#[derive(Debug, Clone)]
pub enum HookResult {
    /// Proceed with the envelope unchanged
    Continue,
    /// Proceed with a modified envelope
    ContinueWith(Box<TurnEnvelope>),
    /// Supply a substitute and skip the stage it stands in for
    ShortCircuit(Payload),
}

impl HookResult {
    pub fn mutate(envelope: TurnEnvelope) -> Self {
        HookResult::ContinueWith(Box::new(envelope))
    }

    /// Short-circuit with a plain text response
    pub fn respond(text: impl Into<String>) -> Self {
        HookResult::ShortCircuit(Payload::Response(ModelResponse::text(text)))
    }

    /// Short-circuit a tool stage with a substitute result
    pub fn tool_result(value: Value) -> Self {
        HookResult::ShortCircuit(Payload::ToolResult(value))
    }

    /// Block a tool call with the structured denial payload
    pub fn deny_tool(reason: impl Into<String>) -> Self {
        HookResult::tool_result(json!({
            "error": reason.into(),
            "denied": true,
        }))
    }

    /// Check if the result lets the turn proceed normally
    pub fn should_continue(&self) -> bool {
        matches!(self, HookResult::Continue | HookResult::ContinueWith(_))
    }

    pub fn is_short_circuit(&self) -> bool {
        matches!(self, HookResult::ShortCircuit(_))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            HookResult::Continue => "continue",
            HookResult::ContinueWith(_) => "continue_with",
            HookResult::ShortCircuit(_) => "short_circuit",
        }
    }
}

pub type HookOutcome = Result<HookResult, HookError>;

/// The main Hook trait that all hooks must implement.
///
/// Each interception point has its own provided method returning `Continue`; a hook
/// overrides the ones it cares about and lists them in `points()`.
#[async_trait]
pub trait Hook: Send + Sync {
    /// Unique identifier for this hook
    fn id(&self) -> &str;

    /// Human-readable name for this hook
    fn name(&self) -> &str;

    /// Description of what this hook does
    fn description(&self) -> &str {
        ""
    }

    /// Points this hook attaches to when registered with `HookRegistry::register`
    fn points(&self) -> Vec<InterceptionPoint>;

    /// Timeout for hook execution
    fn timeout(&self) -> Duration {
        Duration::from_secs(5)
    }

    /// Whether this hook is enabled
    fn enabled(&self) -> bool {
        true
    }

    async fn before_turn(&self, _envelope: &TurnEnvelope, _state: &TurnState) -> HookOutcome {
        Ok(HookResult::Continue)
    }

    async fn before_model(&self, _envelope: &TurnEnvelope, _state: &TurnState) -> HookOutcome {
        Ok(HookResult::Continue)
    }

    async fn after_model(&self, _envelope: &TurnEnvelope, _state: &TurnState) -> HookOutcome {
        Ok(HookResult::Continue)
    }

    async fn before_tool(&self, _envelope: &TurnEnvelope, _state: &TurnState) -> HookOutcome {
        Ok(HookResult::Continue)
    }

    async fn after_tool(&self, _envelope: &TurnEnvelope, _state: &TurnState) -> HookOutcome {
        Ok(HookResult::Continue)
    }

    async fn after_turn(&self, _envelope: &TurnEnvelope, _state: &TurnState) -> HookOutcome {
        Ok(HookResult::Continue)
    }

    /// Route the envelope to the method for its stage
    async fn execute(&self, envelope: &TurnEnvelope, state: &TurnState) -> HookOutcome {
        match envelope.stage {
            InterceptionPoint::PreTurn => self.before_turn(envelope, state).await,
            InterceptionPoint::PreModel => self.before_model(envelope, state).await,
            InterceptionPoint::PostModel => self.after_model(envelope, state).await,
            InterceptionPoint::PreTool => self.before_tool(envelope, state).await,
            InterceptionPoint::PostTool => self.after_tool(envelope, state).await,
            InterceptionPoint::PostTurn => self.after_turn(envelope, state).await,
        }
    }
}

pub type BoxedHook = Arc<dyn Hook>;

type HookFn = dyn Fn(&TurnEnvelope, &TurnState) -> HookOutcome + Send + Sync;

/// Adapts a synchronous closure into a hook for a single point
pub struct FnHook {
    id: String,
    point: InterceptionPoint,
    func: Box<HookFn>,
}

impl FnHook {
    pub fn new(
        id: impl Into<String>,
        point: InterceptionPoint,
        func: impl Fn(&TurnEnvelope, &TurnState) -> HookOutcome + Send + Sync + 'static,
    ) -> Self {
        FnHook {
            id: id.into(),
            point,
            func: Box::new(func),
        }
    }
}

#[async_trait]
impl Hook for FnHook {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.id
    }

    fn points(&self) -> Vec<InterceptionPoint> {
        vec![self.point]
    }

    async fn execute(&self, envelope: &TurnEnvelope, state: &TurnState) -> HookOutcome {
        (self.func)(envelope, state)
    }
}

/// Per-hook overrides, usually loaded from the pipeline config file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HookConfig {
    /// Hook ID
    pub id: String,
    /// Whether this hook is enabled
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Timeout override in seconds
    pub timeout_secs: Option<u64>,
}

fn default_true() -> bool {
    true
}

/// Statistics for one interception point
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HookStats {
    /// Total number of executions
    pub executions: u64,
    pub continues: u64,
    pub mutations: u64,
    pub short_circuits: u64,
    /// Number of failed executions, timeouts included
    pub failures: u64,
    /// Average execution time in milliseconds
    pub avg_execution_ms: f64,
    /// Maximum execution time in milliseconds
    pub max_execution_ms: u64,
}

impl HookStats {
    pub fn record_execution(&mut self, duration_ms: u64, outcome: &HookOutcome) {
        self.executions += 1;

        let total = self.avg_execution_ms * (self.executions - 1) as f64;
        self.avg_execution_ms = (total + duration_ms as f64) / self.executions as f64;

        if duration_ms > self.max_execution_ms {
            self.max_execution_ms = duration_ms;
        }

        match outcome {
            Ok(HookResult::Continue) => self.continues += 1,
            Ok(HookResult::ContinueWith(_)) => self.mutations += 1,
            Ok(HookResult::ShortCircuit(_)) => self.short_circuits += 1,
            Err(_) => self.failures += 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_point_names() {
        let names: Vec<&str> = InterceptionPoint::iter().map(|p| p.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "before_agent",
                "before_model",
                "after_model",
                "before_tool",
                "after_tool",
                "after_agent"
            ]
        );
        assert_eq!(InterceptionPoint::PostTool.to_string(), "after_tool");
        assert_eq!(
            serde_json::to_value(InterceptionPoint::PreModel).unwrap(),
            json!("before_model")
        );
    }

    #[test]
    fn test_deny_tool_payload() {
        match HookResult::deny_tool("no access") {
            HookResult::ShortCircuit(Payload::ToolResult(value)) => {
                assert_eq!(value, json!({"error": "no access", "denied": true}));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_stats_recording() {
        let mut stats = HookStats::default();
        stats.record_execution(10, &Ok(HookResult::Continue));
        stats.record_execution(30, &Ok(HookResult::respond("hi")));
        stats.record_execution(20, &Err(HookError::failed("boom")));

        assert_eq!(stats.executions, 3);
        assert_eq!(stats.continues, 1);
        assert_eq!(stats.short_circuits, 1);
        assert_eq!(stats.failures, 1);
        assert_eq!(stats.max_execution_ms, 30);
        assert!((stats.avg_execution_ms - 20.0).abs() < f64::EPSILON);
    }
}
