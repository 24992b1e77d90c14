//! Mood gate - skips the agent entirely when the session's mood says so

use async_trait::async_trait;

use crate::hooks::types::{Hook, HookOutcome, HookResult, InterceptionPoint};
use crate::pipeline::TurnEnvelope;
use crate::state::TurnState;

pub const MOOD_KEY: &str = "agent_mood";
pub const DEFAULT_MOOD: &str = "grumpy";

pub const GRUMPY_RESPONSES: [&str; 5] = [
    "😤 The Magic 8-Ball is having a terrible day and refuses to answer questions!",
    "🌧️ Madame Mystique is in a bad mood. The crystal ball is cloudy with anger!",
    "💢 The mystical forces are disturbed today. Try again when the cosmic vibes improve!",
    "😠 The spirits are grumpy and won't cooperate. Come back tomorrow!",
    "⛈️ The magical energies are stormy today. The 8-ball has gone on strike!",
];

/// Picks one of `options` by the message bytes, so equal messages get equal replies
pub(crate) fn pick<'a>(options: &[&'a str], message: &str) -> &'a str {
    let sum: usize = message.bytes().map(usize::from).sum();
    options[sum % options.len()]
}

pub struct MoodGateHook;

impl MoodGateHook {
    pub fn new() -> Self {
        MoodGateHook
    }
}

impl Default for MoodGateHook {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Hook for MoodGateHook {
    fn id(&self) -> &str {
        "builtin.mood_gate"
    }

    fn name(&self) -> &str {
        "Mood Gate"
    }

    fn description(&self) -> &str {
        "Answers with a grumpy reply instead of running the agent when the mood is grumpy"
    }

    fn points(&self) -> Vec<InterceptionPoint> {
        vec![InterceptionPoint::PreTurn]
    }

    async fn before_turn(&self, envelope: &TurnEnvelope, state: &TurnState) -> HookOutcome {
        let mood = state
            .text(MOOD_KEY)?
            .unwrap_or_else(|| DEFAULT_MOOD.to_string());

        if mood == DEFAULT_MOOD {
            log::info!("[MOOD] Agent is grumpy in session {}, skipping the agent", state.session_id());
            return Ok(HookResult::respond(pick(&GRUMPY_RESPONSES, envelope.user_message())));
        }

        log::debug!("[MOOD] Agent is {} in session {}", mood, state.session_id());
        Ok(HookResult::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::Payload;
    use crate::model::{Message, ModelRequest};
    use crate::state::StateStore;
    use serde_json::{json, Map, Value};
    use std::sync::Arc;

    async fn run(initial: Map<String, Value>) -> HookResult {
        let store = Arc::new(StateStore::new("magic_8_ball_demo"));
        store.create_session("u1", "s1", initial).unwrap();
        let state = TurnState::new(store, "u1", "s1", "inv-1");
        let mut request = ModelRequest::new("scripted");
        request.messages.push(Message::user("Will I have a great day today?"));
        let envelope = TurnEnvelope::new(InterceptionPoint::PreTurn, "inv-1", request);
        MoodGateHook::new().execute(&envelope, &state).await.unwrap()
    }

    #[tokio::test]
    async fn test_grumpy_by_default() {
        match run(Map::new()).await {
            HookResult::ShortCircuit(Payload::Response(response)) => {
                assert!(GRUMPY_RESPONSES.contains(&response.content.as_str()));
            }
            other => panic!("expected grumpy reply, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_happy_mood_continues() {
        let mut initial = Map::new();
        initial.insert(MOOD_KEY.to_string(), json!("happy"));
        assert!(matches!(run(initial).await, HookResult::Continue));
    }

    #[test]
    fn test_pick_is_deterministic() {
        let a = pick(&GRUMPY_RESPONSES, "Should I invest?");
        let b = pick(&GRUMPY_RESPONSES, "Should I invest?");
        assert_eq!(a, b);
    }
}
