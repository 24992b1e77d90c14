use serde_json::Value;

use crate::hooks::InterceptionPoint;
use crate::model::{ModelRequest, ModelResponse, ToolCall};

/// The in-flight object handed to the hook at each interception point.
///
/// `response` is only set from PostModel on (or at PostTurn), `tool_call` only at the
/// tool stages, and `tool_result` only at PostTool. A hook that wants to change something
/// clones the envelope, edits it and returns `HookResult::ContinueWith`.
#[derive(Debug, Clone)]
pub struct TurnEnvelope {
    pub stage: InterceptionPoint,
    pub invocation_id: String,
    pub request: ModelRequest,
    pub response: Option<ModelResponse>,
    pub tool_call: Option<ToolCall>,
    pub tool_result: Option<Value>,
}

impl TurnEnvelope {
    pub fn new(
        stage: InterceptionPoint,
        invocation_id: impl Into<String>,
        request: ModelRequest,
    ) -> Self {
        TurnEnvelope {
            stage,
            invocation_id: invocation_id.into(),
            request,
            response: None,
            tool_call: None,
            tool_result: None,
        }
    }

    pub fn with_response(mut self, response: ModelResponse) -> Self {
        self.response = Some(response);
        self
    }

    pub fn with_tool_call(mut self, call: ToolCall) -> Self {
        self.tool_call = Some(call);
        self
    }

    pub fn with_tool_result(mut self, result: Value) -> Self {
        self.tool_result = Some(result);
        self
    }

    /// The user message that started this turn
    pub fn user_message(&self) -> &str {
        self.request.last_user_message().unwrap_or_default()
    }

    /// Text of the response, empty before one exists
    pub fn response_text(&self) -> &str {
        self.response
            .as_ref()
            .map(|r| r.content.as_str())
            .unwrap_or_default()
    }

    pub fn tool_name(&self) -> Option<&str> {
        self.tool_call.as_ref().map(|c| c.name.as_str())
    }

    /// String argument of the current tool call
    pub fn tool_arg_str(&self, name: &str) -> Option<&str> {
        self.tool_call
            .as_ref()
            .and_then(|c| c.arguments.get(name))
            .and_then(Value::as_str)
    }
}
