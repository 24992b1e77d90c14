//! Memory hook - Copies the session into long-term memory after every turn
//!
//! The copy holds the committed history plus the turn that just finished. A failure to
//! save is logged and never fails the turn.

use std::sync::Arc;

use async_trait::async_trait;

use crate::hooks::types::{Hook, HookOutcome, HookResult, InterceptionPoint};
use crate::memory::MemoryService;
use crate::model::Message;
use crate::pipeline::TurnEnvelope;
use crate::state::TurnState;

pub struct MemoryHook {
    memory: Arc<MemoryService>,
}

impl MemoryHook {
    pub fn new(memory: Arc<MemoryService>) -> Self {
        MemoryHook { memory }
    }
}

#[async_trait]
impl Hook for MemoryHook {
    fn id(&self) -> &str {
        "builtin.memory"
    }

    fn name(&self) -> &str {
        "Memory Hook"
    }

    fn description(&self) -> &str {
        "Saves each session to long-term memory after the agent responds"
    }

    fn points(&self) -> Vec<InterceptionPoint> {
        vec![InterceptionPoint::PostTurn]
    }

    async fn after_turn(&self, envelope: &TurnEnvelope, state: &TurnState) -> HookOutcome {
        let mut messages = match state.history() {
            Ok(history) => history,
            Err(e) => {
                log::error!("[MEMORY] Failed to save session {} to memory: {}", state.session_id(), e);
                return Ok(HookResult::Continue);
            }
        };
        messages.push(Message::user(envelope.user_message()));
        messages.push(Message::assistant(envelope.response_text()));

        let stored = self
            .memory
            .add_session(state.app_name(), state.user_id(), state.session_id(), &messages);
        log::info!(
            "[MEMORY] Session {} saved to memory ({} entries)",
            state.session_id(),
            stored
        );
        Ok(HookResult::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ModelRequest, ModelResponse};
    use crate::state::StateStore;
    use serde_json::Map;

    fn post_turn(user: &str, reply: &str) -> TurnEnvelope {
        let mut request = ModelRequest::new("m");
        request.messages.push(Message::user(user));
        TurnEnvelope::new(InterceptionPoint::PostTurn, "inv-1", request)
            .with_response(ModelResponse::text(reply))
    }

    #[tokio::test]
    async fn test_saves_history_and_current_turn() {
        let store = Arc::new(StateStore::new("essencia"));
        store.create_session("maria", "s1", Map::new()).unwrap();
        store
            .record_turn("s1", [Message::user("my skin is dry"), Message::assistant("Noted!")])
            .unwrap();

        let memory = Arc::new(MemoryService::new());
        let hook = MemoryHook::new(memory.clone());
        let state = TurnState::new(store, "maria", "s1", "inv-1");
        let result = hook
            .execute(&post_turn("I love lavender", "Lavender soap it is"), &state)
            .await
            .unwrap();
        assert!(matches!(result, HookResult::Continue));

        assert_eq!(memory.session_count("essencia", "maria"), 1);
        assert_eq!(memory.search("essencia", "maria", "dry", 10).len(), 1);
        assert_eq!(memory.search("essencia", "maria", "lavender", 10).len(), 2);
    }

    #[tokio::test]
    async fn test_missing_session_does_not_fail_the_turn() {
        let store = Arc::new(StateStore::new("essencia"));
        let memory = Arc::new(MemoryService::new());
        let hook = MemoryHook::new(memory.clone());
        let state = TurnState::new(store, "maria", "gone", "inv-1");

        let result = hook.execute(&post_turn("hi", "hello"), &state).await.unwrap();
        assert!(result.should_continue());
        assert_eq!(memory.session_count("essencia", "maria"), 0);
    }
}
