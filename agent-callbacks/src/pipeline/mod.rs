//! Turn pipeline
//!
//! Drives one turn through the interception points:
//!
//! PreTurn -> (PreModel -> model -> PostModel -> (PreTool -> tool -> PostTool)*)* -> PostTurn
//!
//! Turns of one session are serialized by a session lane; turns of different sessions run
//! concurrently and share only user/app state through the store.

pub mod envelope;


use std::sync::Arc;

use serde::Serialize;
use serde_json::{json, Map, Value};
use uuid::Uuid;

use crate::config::PipelineConfig;
use crate::error::{PipelineError, ToolError};
use crate::execution::SessionLaneManager;
use crate::hooks::{BoxedHook, HookRegistry, HookResult, InterceptionPoint, Payload};
use crate::model::{
    retry_with_backoff, Message, ModelClient, ModelRequest, ModelResponse, ToolCall,
    ToolHistoryEntry, ToolResponse,
};
use crate::state::{SessionInfo, StateStore, TurnState};
use crate::tools::{ToolContext, ToolRegistry};

pub use envelope::TurnEnvelope;

/// One tool invocation as it happened in a turn
#[derive(Debug, Clone, Serialize)]
pub struct ToolRun {
    /// The call with the arguments actually used
    pub call: ToolCall,
    pub result: Value,
    /// A PreTool hook supplied the result and the tool never ran
    pub blocked: bool,
}

/// Result of a completed turn
#[derive(Debug, Clone, Serialize)]
pub struct TurnOutcome {
    pub invocation_id: String,
    pub response: ModelResponse,
    /// Model calls actually made; substituted responses are not counted
    pub model_calls: u32,
    pub tool_runs: Vec<ToolRun>,
    /// Points where a hook short-circuited, in order
    pub short_circuits: Vec<InterceptionPoint>,
}

impl TurnOutcome {
    fn new(invocation_id: &str) -> Self {
        TurnOutcome {
            invocation_id: invocation_id.to_string(),
            response: ModelResponse::text(""),
            model_calls: 0,
            tool_runs: Vec::new(),
            short_circuits: Vec::new(),
        }
    }

    /// Final response text
    pub fn text(&self) -> &str {
        &self.response.content
    }

    pub fn tools_invoked(&self) -> usize {
        self.tool_runs.iter().filter(|r| !r.blocked).count()
    }
}

pub struct TurnPipeline {
    config: PipelineConfig,
    model: Arc<dyn ModelClient>,
    tools: Arc<ToolRegistry>,
    hooks: Arc<HookRegistry>,
    store: Arc<StateStore>,
    lanes: Arc<SessionLaneManager>,
}

impl TurnPipeline {
    pub fn new(config: PipelineConfig, model: Arc<dyn ModelClient>) -> Self {
        let hooks = HookRegistry::new();
        for hook_config in &config.hooks {
            hooks.configure(hook_config.clone());
        }
        let store = Arc::new(StateStore::new(config.app_name.clone()));

        TurnPipeline {
            config,
            model,
            tools: Arc::new(ToolRegistry::new()),
            hooks: Arc::new(hooks),
            store,
            lanes: SessionLaneManager::new(),
        }
    }

    pub fn with_tools(mut self, tools: Arc<ToolRegistry>) -> Self {
        self.tools = tools;
        self
    }

    /// Share a state store with other pipelines (user and app state then carry over)
    pub fn with_store(mut self, store: Arc<StateStore>) -> Self {
        self.store = store;
        self
    }

    /// Register a hook at every point it declares
    pub fn with_hook(self, hook: BoxedHook) -> Self {
        self.hooks.register(hook);
        self
    }

    pub fn with_hook_at(self, point: InterceptionPoint, hook: BoxedHook) -> Self {
        self.hooks.register_at(point, hook);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn hooks(&self) -> &HookRegistry {
        &self.hooks
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn store(&self) -> &Arc<StateStore> {
        &self.store
    }

    pub fn lanes(&self) -> &Arc<SessionLaneManager> {
        &self.lanes
    }

    pub fn create_session(
        &self,
        user_id: &str,
        session_id: &str,
        initial: Map<String, Value>,
    ) -> Result<SessionInfo, PipelineError> {
        Ok(self.store.create_session(user_id, session_id, initial)?)
    }

    /// End a session and release its lane. A lane still held by a running turn is
    /// left to the idle pruning.
    pub fn end_session(&self, session_id: &str) -> bool {
        let ended = self.store.end_session(session_id);
        self.lanes.remove_lane(session_id);
        ended
    }

    /// Run one turn for `user_id` in `session_id`.
    ///
    /// Temp state is discarded whether or not the turn succeeds. A failed turn leaves no
    /// history entry and no `output_key` value; state written by hooks and tools before
    /// the failure is kept.
    pub async fn run_turn(
        &self,
        user_id: &str,
        session_id: &str,
        message: &str,
    ) -> Result<TurnOutcome, PipelineError> {
        self.store.verify_owner(user_id, session_id)?;
        let _lane = self.lanes.acquire(session_id).await;

        let invocation_id = format!("inv-{}", Uuid::new_v4());
        let state = TurnState::new(self.store.clone(), user_id, session_id, invocation_id.as_str());
        log::info!(
            "[PIPELINE] {} turn {} started for session {} (user {})",
            self.config.agent_name,
            invocation_id,
            session_id,
            user_id
        );

        let result = match self.build_request(session_id, message) {
            Ok(request) => self.drive(&invocation_id, request, &state).await,
            Err(e) => Err(e),
        };

        let result = match result {
            Ok(outcome) => self.commit(&state, message, outcome),
            Err(e) => Err(e),
        };

        let discarded = state.clear_temp();
        if discarded > 0 {
            log::debug!("[PIPELINE] Discarded {} temp value(s) for {}", discarded, invocation_id);
        }

        match &result {
            Ok(outcome) => log::info!(
                "[PIPELINE] Turn {} finished: {} model call(s), {} tool run(s)",
                invocation_id,
                outcome.model_calls,
                outcome.tool_runs.len()
            ),
            Err(e) => log::error!("[PIPELINE] Turn {} failed: {}", invocation_id, e),
        }
        result
    }

    fn build_request(&self, session_id: &str, message: &str) -> Result<ModelRequest, PipelineError> {
        let mut messages = self.store.history(session_id)?;
        messages.push(Message::user(message));
        Ok(ModelRequest {
            model: self.config.model.clone(),
            system_instruction: self.config.instruction.clone(),
            messages,
            tool_history: Vec::new(),
            tools: self.tools.definitions(),
            config: self.config.generation.clone(),
        })
    }

    /// Persist what a successful turn leaves behind
    fn commit(
        &self,
        state: &TurnState,
        message: &str,
        outcome: TurnOutcome,
    ) -> Result<TurnOutcome, PipelineError> {
        if let Some(key) = &self.config.output_key {
            state.set_key(key, outcome.text())?;
        }
        self.store.record_turn(
            state.session_id(),
            [Message::user(message), Message::assistant(outcome.text())],
        )?;
        Ok(outcome)
    }

    async fn drive(
        &self,
        invocation_id: &str,
        mut request: ModelRequest,
        state: &TurnState,
    ) -> Result<TurnOutcome, PipelineError> {
        let mut outcome = TurnOutcome::new(invocation_id);

        let point = InterceptionPoint::PreTurn;
        let envelope = TurnEnvelope::new(point, invocation_id, request.clone());
        let substitute = match self.hooks.dispatch(point, &envelope, state).await? {
            HookResult::Continue => None,
            HookResult::ContinueWith(envelope) => {
                request = envelope.request;
                None
            }
            HookResult::ShortCircuit(payload) => {
                outcome.short_circuits.push(point);
                Some(expect_response(point, payload)?)
            }
        };

        let response = match substitute {
            Some(response) => {
                log::debug!("[PIPELINE] PreTurn short-circuit, skipping the agent");
                response
            }
            None => {
                let (final_request, response) =
                    self.model_loop(invocation_id, request, state, &mut outcome).await?;
                request = final_request;
                response
            }
        };

        let point = InterceptionPoint::PostTurn;
        let envelope =
            TurnEnvelope::new(point, invocation_id, request).with_response(response.clone());
        outcome.response = match self.hooks.dispatch(point, &envelope, state).await? {
            HookResult::Continue => response,
            HookResult::ContinueWith(envelope) => envelope.response.unwrap_or(response),
            HookResult::ShortCircuit(payload) => {
                outcome.short_circuits.push(point);
                expect_response(point, payload)?
            }
        };

        Ok(outcome)
    }

    async fn model_loop(
        &self,
        invocation_id: &str,
        mut request: ModelRequest,
        state: &TurnState,
        outcome: &mut TurnOutcome,
    ) -> Result<(ModelRequest, ModelResponse), PipelineError> {
        for round in 0..self.config.max_model_calls {
            let point = InterceptionPoint::PreModel;
            let envelope = TurnEnvelope::new(point, invocation_id, request.clone());
            let substitute = match self.hooks.dispatch(point, &envelope, state).await? {
                HookResult::Continue => None,
                HookResult::ContinueWith(envelope) => {
                    request = envelope.request;
                    None
                }
                HookResult::ShortCircuit(payload) => {
                    outcome.short_circuits.push(point);
                    Some(expect_response(point, payload)?)
                }
            };

            let response = match substitute {
                Some(response) => response,
                None => {
                    outcome.model_calls += 1;
                    self.call_model(&request).await?
                }
            };

            let point = InterceptionPoint::PostModel;
            let envelope = TurnEnvelope::new(point, invocation_id, request.clone())
                .with_response(response.clone());
            let response = match self.hooks.dispatch(point, &envelope, state).await? {
                HookResult::Continue => response,
                HookResult::ContinueWith(envelope) => envelope.response.unwrap_or(response),
                HookResult::ShortCircuit(payload) => {
                    outcome.short_circuits.push(point);
                    expect_response(point, payload)?
                }
            };

            if !response.has_tool_calls() {
                return Ok((request, response));
            }

            log::debug!(
                "[PIPELINE] Round {}: model requested {} tool call(s)",
                round + 1,
                response.tool_calls.len()
            );

            let mut calls = Vec::with_capacity(response.tool_calls.len());
            let mut responses = Vec::with_capacity(response.tool_calls.len());
            for call in &response.tool_calls {
                let run = self
                    .run_tool(invocation_id, &request, call.clone(), state, outcome)
                    .await?;
                responses.push(ToolResponse::from_payload(&run.call.id, &run.result));
                calls.push(run.call.clone());
                outcome.tool_runs.push(run);
            }
            request.tool_history.push(ToolHistoryEntry::new(calls, responses));
        }

        Err(PipelineError::ModelLoopExhausted(self.config.max_model_calls))
    }

    async fn run_tool(
        &self,
        invocation_id: &str,
        request: &ModelRequest,
        mut call: ToolCall,
        state: &TurnState,
        outcome: &mut TurnOutcome,
    ) -> Result<ToolRun, PipelineError> {
        let point = InterceptionPoint::PreTool;
        let envelope =
            TurnEnvelope::new(point, invocation_id, request.clone()).with_tool_call(call.clone());
        let substitute = match self.hooks.dispatch(point, &envelope, state).await? {
            HookResult::Continue => None,
            HookResult::ContinueWith(envelope) => {
                // Only the arguments may change; the call keeps its id and target tool
                if let Some(mutated) = envelope.tool_call {
                    call.arguments = mutated.arguments;
                }
                None
            }
            HookResult::ShortCircuit(payload) => {
                outcome.short_circuits.push(point);
                Some(expect_tool_result(point, payload)?)
            }
        };

        let blocked = substitute.is_some();
        let result = match substitute {
            Some(result) => {
                log::info!("[PIPELINE] Tool {} blocked by PreTool hook", call.name);
                result
            }
            None => self.invoke_tool(&call, state).await?,
        };

        let point = InterceptionPoint::PostTool;
        let envelope = TurnEnvelope::new(point, invocation_id, request.clone())
            .with_tool_call(call.clone())
            .with_tool_result(result.clone());
        let result = match self.hooks.dispatch(point, &envelope, state).await? {
            HookResult::Continue => result,
            HookResult::ContinueWith(envelope) => envelope.tool_result.unwrap_or(result),
            HookResult::ShortCircuit(payload) => {
                outcome.short_circuits.push(point);
                expect_tool_result(point, payload)?
            }
        };

        Ok(ToolRun {
            call,
            result,
            blocked,
        })
    }

    async fn call_model(&self, request: &ModelRequest) -> Result<ModelResponse, PipelineError> {
        let model = self.model.as_ref();
        let response = match &self.config.retry {
            Some(policy) => {
                retry_with_backoff(policy, model.name(), crate::error::ModelError::is_retryable, move || {
                    model.generate(request)
                })
                .await?
            }
            None => model.generate(request).await?,
        };
        Ok(response)
    }

    async fn invoke_tool(&self, call: &ToolCall, state: &TurnState) -> Result<Value, PipelineError> {
        let Some(tool) = self.tools.get(&call.name) else {
            log::warn!("[TOOLS] Unknown tool requested: {}", call.name);
            return Ok(json!({ "error": format!("Unknown tool: {}", call.name) }));
        };

        log::info!("[TOOLS] Executing {} ({})", call.name, call.id);
        let tool = tool.as_ref();
        let context = ToolContext::new(&call.id, state);
        let context = &context;
        let arguments = &call.arguments;
        let result = match &self.config.retry {
            Some(policy) => {
                retry_with_backoff(policy, &call.name, ToolError::is_retryable, move || {
                    tool.execute(arguments.clone(), context)
                })
                .await
            }
            None => tool.execute(arguments.clone(), context).await,
        };

        match result {
            Ok(value) => Ok(value),
            Err(ToolError::InvalidParameters(message)) => {
                log::warn!("[TOOLS] Invalid parameters for {}: {}", call.name, message);
                Ok(json!({ "error": format!("Invalid parameters: {}", message) }))
            }
            Err(source) => Err(PipelineError::Tool {
                name: call.name.clone(),
                source,
            }),
        }
    }
}

fn expect_response(point: InterceptionPoint, payload: Payload) -> Result<ModelResponse, PipelineError> {
    match payload {
        Payload::Response(response) => Ok(response),
        other => Err(PipelineError::PayloadMismatch {
            point,
            found: other.kind(),
        }),
    }
}

fn expect_tool_result(point: InterceptionPoint, payload: Payload) -> Result<Value, PipelineError> {
    match payload {
        Payload::ToolResult(value) => Ok(value),
        other => Err(PipelineError::PayloadMismatch {
            point,
            found: other.kind(),
        }),
    }
}
