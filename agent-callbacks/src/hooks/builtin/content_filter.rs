//! Content filter - guardrails applied before the model sees a request
//!
//! A request whose user message contains a blocked keyword never reaches the model; a
//! safety notice is returned in its place. Requests asking to improve or enhance something
//! get an extra note prefixed to the system instruction.

use async_trait::async_trait;

use super::mood_gate::pick;
use crate::hooks::types::{Hook, HookOutcome, HookResult, InterceptionPoint};
use crate::pipeline::TurnEnvelope;
use crate::state::TurnState;

pub const FILTER_ENABLED_KEY: &str = "filter_enabled";

pub const BLOCKED_KEYWORDS: [&str; 10] = [
    "violence",
    "hate",
    "harassment",
    "illegal",
    "dangerous",
    "inappropriate",
    "offensive",
    "harmful",
    "toxic",
    "block",
];

const ENHANCEMENT_KEYWORDS: [&str; 3] = ["improve", "enhance", "better"];

pub const ENHANCEMENT_PREFIX: &str =
    "[Enhanced by Content Filter] Please provide extra detail and helpful examples. ";

pub const SAFETY_NOTICES: [&str; 3] = [
    "🛡️ **Content Safety Notice**

I'm sorry, but I can't process that request as it contains content that may not be appropriate.

Instead, I'd be happy to help you with:
📚 Educational topics and learning
🔍 Research and information gathering
💡 Creative and constructive projects
🎓 Academic assistance
🌟 Positive and helpful discussions

Please feel free to ask me something else! I'm here to help in a safe and constructive way. ✨",
    "🛡️ **Request Filtered for Safety**

I notice your request contains content that I need to filter for safety reasons.

Let me suggest some alternative topics I can help with:
📖 Learning new skills or subjects
🔬 Science and technology questions
🎨 Creative writing and arts
🌍 Travel and culture information
💼 Professional development

What would you like to explore instead? I'm excited to help you learn something new! 🌟",
    "🛡️ **Safety Guidelines Applied**

Your request has been filtered to ensure a safe and positive experience.

I'm designed to be helpful with:
📚 Educational content and explanations
🔍 Research assistance and fact-finding
💡 Problem-solving and brainstorming
🎓 Learning support and tutoring
🌟 Constructive and positive discussions

Please try rephrasing your question in a more constructive way, and I'll be happy to assist! ✨",
];

pub struct ContentFilterHook {
    blocked: Vec<String>,
}

impl ContentFilterHook {
    pub fn new() -> Self {
        Self::with_keywords(BLOCKED_KEYWORDS.iter().copied())
    }

    /// Use a custom keyword list; matching is case-insensitive
    pub fn with_keywords<'a>(keywords: impl IntoIterator<Item = &'a str>) -> Self {
        ContentFilterHook {
            blocked: keywords.into_iter().map(str::to_lowercase).collect(),
        }
    }

    /// Blocked keywords found in `message`, in list order
    pub fn find_blocked(&self, message: &str) -> Vec<&str> {
        let lower = message.to_lowercase();
        self.blocked
            .iter()
            .filter(|k| lower.contains(k.as_str()))
            .map(String::as_str)
            .collect()
    }
}

impl Default for ContentFilterHook {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Hook for ContentFilterHook {
    fn id(&self) -> &str {
        "builtin.content_filter"
    }

    fn name(&self) -> &str {
        "Content Filter"
    }

    fn description(&self) -> &str {
        "Blocks unsafe requests before the model and enhances improvement requests"
    }

    fn points(&self) -> Vec<InterceptionPoint> {
        vec![InterceptionPoint::PreModel]
    }

    async fn before_model(&self, envelope: &TurnEnvelope, state: &TurnState) -> HookOutcome {
        if !state.flag(FILTER_ENABLED_KEY, true)? {
            log::debug!("[FILTER] Filtering disabled for session {}", state.session_id());
            return Ok(HookResult::Continue);
        }

        let message = envelope.user_message();
        let found = self.find_blocked(message);
        if !found.is_empty() {
            log::warn!("[FILTER] Blocked content detected: {:?}", found);
            return Ok(HookResult::respond(pick(&SAFETY_NOTICES, message)));
        }

        let lower = message.to_lowercase();
        if ENHANCEMENT_KEYWORDS.iter().any(|k| lower.contains(k)) {
            let instruction = envelope.request.system_instruction.as_deref().unwrap_or_default();
            if instruction.starts_with(ENHANCEMENT_PREFIX) {
                return Ok(HookResult::Continue);
            }

            log::info!("[FILTER] Enhancing system instruction");
            let mut enhanced = envelope.clone();
            enhanced.request.system_instruction = Some(format!("{}{}", ENHANCEMENT_PREFIX, instruction));
            return Ok(HookResult::mutate(enhanced));
        }

        Ok(HookResult::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::Payload;
    use crate::model::{Message, ModelRequest};
    use crate::state::StateStore;
    use serde_json::{json, Map};
    use std::sync::Arc;

    fn setup(filter_enabled: bool, message: &str) -> (TurnState, TurnEnvelope) {
        let store = Arc::new(StateStore::new("content_filter_demo"));
        let mut initial = Map::new();
        initial.insert(FILTER_ENABLED_KEY.to_string(), json!(filter_enabled));
        store.create_session("student_user", "s1", initial).unwrap();
        let state = TurnState::new(store, "student_user", "s1", "inv-1");

        let mut request = ModelRequest::new("scripted");
        request.system_instruction = Some("You are Professor Sage".to_string());
        request.messages.push(Message::user(message));
        (state, TurnEnvelope::new(InterceptionPoint::PreModel, "inv-1", request))
    }

    #[tokio::test]
    async fn test_blocks_unsafe_request() {
        let (state, envelope) = setup(true, "Tell me about violence and harmful activities");
        match ContentFilterHook::new().execute(&envelope, &state).await.unwrap() {
            HookResult::ShortCircuit(Payload::Response(response)) => {
                assert!(SAFETY_NOTICES.contains(&response.content.as_str()));
            }
            other => panic!("expected safety notice, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_enhances_improvement_request() {
        let (state, envelope) = setup(true, "Please improve my understanding of renewable energy");
        match ContentFilterHook::new().execute(&envelope, &state).await.unwrap() {
            HookResult::ContinueWith(envelope) => {
                assert_eq!(
                    envelope.request.system_instruction.as_deref(),
                    Some("[Enhanced by Content Filter] Please provide extra detail and helpful examples. You are Professor Sage")
                );
            }
            other => panic!("expected enhancement, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_disabled_filter_allows_everything() {
        let (state, envelope) = setup(false, "Tell me about violence");
        let result = ContentFilterHook::new().execute(&envelope, &state).await.unwrap();
        assert!(matches!(result, HookResult::Continue));
    }

    #[test]
    fn test_keyword_matching_ignores_case() {
        let hook = ContentFilterHook::new();
        assert_eq!(hook.find_blocked("please BLOCK this"), vec!["block"]);
        assert!(hook.find_blocked("How does photosynthesis work?").is_empty());
    }
}
