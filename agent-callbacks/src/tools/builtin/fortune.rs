use async_trait::async_trait;
use rand::seq::SliceRandom;
use serde::Deserialize;
use serde_json::Value;

use crate::error::ToolError;
use crate::tools::registry::Tool;
use crate::tools::types::{parse_params, PropertySchema, ToolContext, ToolDefinition};

pub const MAGIC_RESPONSES: [&str; 20] = [
    "🔮 The spirits say: Absolutely yes!",
    "✨ The universe whispers: It is certain!",
    "🌟 Magic reveals: Without a doubt!",
    "🎭 The crystal ball shows: Yes definitely!",
    "🌙 Ancient wisdom says: You may rely on it!",
    "⭐ The stars align: As I see it, yes!",
    "🔥 The flames reveal: Most likely!",
    "💫 Cosmic forces say: Outlook good!",
    "🌈 The rainbow points to: Yes!",
    "🦄 The unicorns whisper: Signs point to yes!",
    "🌊 The ocean waves say: Reply hazy, try again!",
    "🌪️ The winds are unclear: Ask again later!",
    "🌫️ The mist obscures: Better not tell you now!",
    "⚡ Lightning strikes doubt: Cannot predict now!",
    "🌑 The dark moon hides: Concentrate and ask again!",
    "❄️ The ice crystals say: Don't count on it!",
    "🌋 The volcano rumbles: My reply is no!",
    "🌵 The desert speaks: My sources say no!",
    "🕳️ The void whispers: Outlook not so good!",
    "💀 The spirits warn: Very doubtful!",
];

#[derive(Debug, Deserialize)]
struct QuestionParams {
    question: String,
}

/// Magic 8-ball
pub struct MagicAnswerTool;

#[async_trait]
impl Tool for MagicAnswerTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new("get_magic_answer", "Get a mystical answer from the Magic 8-Ball")
            .param("question", PropertySchema::string("The question to ask the magic 8-ball"), true)
    }

    async fn execute(&self, params: Value, _context: &ToolContext<'_>) -> Result<Value, ToolError> {
        let params: QuestionParams = parse_params(params)?;
        let answer = MAGIC_RESPONSES
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or(MAGIC_RESPONSES[0]);
        log::info!("[TOOLS] Magic 8-Ball consulted with '{}': {}", params.question, answer);
        Ok(Value::String(answer.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::builtin::test_state;
    use serde_json::json;

    #[tokio::test]
    async fn test_answer_comes_from_the_ball() {
        let state = test_state();
        let context = ToolContext::new("call_1", &state);
        for _ in 0..10 {
            let answer = MagicAnswerTool
                .execute(json!({"question": "Will it rain?"}), &context)
                .await
                .unwrap();
            assert!(MAGIC_RESPONSES.contains(&answer.as_str().unwrap()));
        }
    }
}
