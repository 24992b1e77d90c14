use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::Value;

use super::{MessageRole, ModelClient, ModelRequest, ModelResponse, ToolCall};
use crate::error::ModelError;

type Matcher = Box<dyn Fn(&str) -> Option<Value> + Send + Sync>;

/// Maps a user message to a tool call. The matcher returns the call arguments when the
/// rule applies.
pub struct ScriptRule {
    tool: String,
    matcher: Matcher,
}

impl ScriptRule {
    pub fn new(
        tool: impl Into<String>,
        matcher: impl Fn(&str) -> Option<Value> + Send + Sync + 'static,
    ) -> Self {
        ScriptRule {
            tool: tool.into(),
            matcher: Box::new(matcher),
        }
    }

    /// Fire with fixed arguments when the message contains any of the keywords
    /// (case-insensitive)
    pub fn keyword(tool: impl Into<String>, keywords: &'static [&'static str], arguments: Value) -> Self {
        ScriptRule::new(tool, move |message| {
            let lower = message.to_lowercase();
            keywords
                .iter()
                .any(|k| lower.contains(k))
                .then(|| arguments.clone())
        })
    }

    pub fn tool(&self) -> &str {
        &self.tool
    }
}

/// Deterministic stand-in for a hosted model.
///
/// On the first call of a turn every matching rule becomes a tool call; once tool results
/// are in the request the model answers with a summary of them. Messages no rule matches
/// get the default reply, where `{message}` expands to the user's text.
pub struct ScriptedModel {
    name: String,
    rules: Vec<ScriptRule>,
    default_reply: String,
    summary_prefix: String,
    calls: AtomicUsize,
}

impl ScriptedModel {
    pub fn new(name: impl Into<String>) -> Self {
        ScriptedModel {
            name: name.into(),
            rules: Vec::new(),
            default_reply: "You said: {message}".to_string(),
            summary_prefix: "Here is what I found:".to_string(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_rule(mut self, rule: ScriptRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn with_default_reply(mut self, reply: impl Into<String>) -> Self {
        self.default_reply = reply.into();
        self
    }

    pub fn with_summary_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.summary_prefix = prefix.into();
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn plan_tool_calls(&self, message: &str) -> Vec<ToolCall> {
        self.rules
            .iter()
            .filter_map(|rule| (rule.matcher)(message).map(|args| (rule.tool.as_str(), args)))
            .enumerate()
            .map(|(i, (tool, args))| ToolCall::new(format!("call_{}", i + 1), tool, args))
            .collect()
    }

    fn summarize(&self, request: &ModelRequest) -> String {
        let results: Vec<&str> = request
            .tool_history
            .iter()
            .flat_map(|round| round.tool_responses.iter())
            .map(|r| r.content.as_str())
            .collect();
        format!("{}\n\n{}", self.summary_prefix, results.join("\n\n"))
    }
}

#[async_trait]
impl ModelClient for ScriptedModel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(&self, request: &ModelRequest) -> Result<ModelResponse, ModelError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if !request.tool_history.is_empty() {
            return Ok(ModelResponse::text(self.summarize(request)));
        }

        let message = request
            .messages
            .iter()
            .rev()
            .find(|m| m.role == MessageRole::User)
            .map(|m| m.content.as_str())
            .unwrap_or_default();

        let calls = self.plan_tool_calls(message);
        if calls.is_empty() {
            Ok(ModelResponse::text(
                self.default_reply.replace("{message}", message),
            ))
        } else {
            log::debug!(
                "[MODEL] {} planned {} tool call(s) for '{}'",
                self.name,
                calls.len(),
                message
            );
            Ok(ModelResponse::with_tools("", calls))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Message, ToolHistoryEntry, ToolResponse};
    use serde_json::json;

    fn request_for(message: &str) -> ModelRequest {
        let mut request = ModelRequest::new("scripted");
        request.messages.push(Message::user(message));
        request
    }

    #[tokio::test]
    async fn test_rules_become_tool_calls() {
        let model = ScriptedModel::new("weather")
            .with_rule(ScriptRule::keyword(
                "get_current_weather",
                &["weather"],
                json!({"location": "London"}),
            ))
            .with_rule(ScriptRule::keyword(
                "get_weather_alerts",
                &["alert"],
                json!({"location": "London"}),
            ));

        let response = model
            .generate(&request_for("What's the WEATHER in London?"))
            .await
            .unwrap();
        assert_eq!(response.tool_calls.len(), 1);
        assert_eq!(response.tool_calls[0].name, "get_current_weather");
        assert_eq!(response.tool_calls[0].id, "call_1");
    }

    #[tokio::test]
    async fn test_default_reply_and_summary() {
        let model = ScriptedModel::new("echo").with_default_reply("Echo: {message}");
        let response = model.generate(&request_for("hi there")).await.unwrap();
        assert_eq!(response.content, "Echo: hi there");

        let mut request = request_for("hi there");
        request.tool_history.push(ToolHistoryEntry::new(
            vec![ToolCall::new("call_1", "noop", json!({}))],
            vec![ToolResponse::success("call_1".into(), "done".into())],
        ));
        let response = model.generate(&request).await.unwrap();
        assert_eq!(response.content, "Here is what I found:\n\ndone");
        assert_eq!(model.call_count(), 2);
    }
}
