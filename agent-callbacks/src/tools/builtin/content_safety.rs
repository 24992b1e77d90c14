use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::error::ToolError;
use crate::tools::registry::Tool;
use crate::tools::types::{parse_params, PropertySchema, ToolContext, ToolDefinition};

pub const UNSAFE_KEYWORDS: [&str; 9] = [
    "violence",
    "hate",
    "harassment",
    "illegal",
    "dangerous",
    "inappropriate",
    "offensive",
    "harmful",
    "toxic",
];

#[derive(Debug, Deserialize)]
struct SafetyParams {
    text: String,
}

/// Keyword screen for user-supplied text
pub struct ContentSafetyTool;

#[async_trait]
impl Tool for ContentSafetyTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new("check_content_safety", "Check if content is safe and appropriate")
            .param("text", PropertySchema::string("Text to check for safety"), true)
    }

    async fn execute(&self, params: Value, _context: &ToolContext<'_>) -> Result<Value, ToolError> {
        let params: SafetyParams = parse_params(params)?;
        let lower = params.text.to_lowercase();
        let issues: Vec<&str> = UNSAFE_KEYWORDS
            .iter()
            .copied()
            .filter(|k| lower.contains(k))
            .collect();

        let text = if issues.is_empty() {
            "✅ Content appears safe and appropriate".to_string()
        } else {
            log::warn!("[TOOLS] Safety issues found: {:?}", issues);
            format!("⚠️ Content safety issues detected: {}", issues.join(", "))
        };
        Ok(Value::String(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::builtin::test_state;
    use serde_json::json;

    #[tokio::test]
    async fn test_safety_check() {
        let state = test_state();
        let context = ToolContext::new("call_1", &state);
        let result = ContentSafetyTool
            .execute(json!({"text": "A TOXIC and harmful rant"}), &context)
            .await
            .unwrap();
        assert_eq!(result, "⚠️ Content safety issues detected: harmful, toxic");

        let result = ContentSafetyTool
            .execute(json!({"text": "Tips for a picnic"}), &context)
            .await
            .unwrap();
        assert_eq!(result, "✅ Content appears safe and appropriate");
    }
}
