//! Rate limit hook - Throttles turns per session and tool calls per turn
//!
//! PreTurn keeps a sliding window of turn start times per session; a session over the
//! limit enters a cooldown and its turns are answered with a rate-limit message. PreTool
//! counts calls in the turn's temp state and denies calls beyond the cap.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::hooks::types::{Hook, HookOutcome, HookResult, InterceptionPoint};
use crate::pipeline::TurnEnvelope;
use crate::state::{Scope, TurnState};

/// Temp key holding the number of tool calls seen in the current turn
const TOOL_CALLS_KEY: &str = "rate_limit_tool_calls";

/// Sessions tracked before stale entries are swept
const MAX_TRACKED_SESSIONS: usize = 1024;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Maximum turns per window
    pub max_turns: u32,
    pub window_secs: u64,
    /// Maximum tool calls in one turn
    pub max_tool_calls_per_turn: Option<u32>,
    /// Cooldown after hitting the limit (seconds)
    pub cooldown_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_turns: 60,
            window_secs: 60,
            max_tool_calls_per_turn: Some(10),
            cooldown_secs: 30,
        }
    }
}

#[derive(Debug, Default)]
struct SessionRateState {
    turn_times: Vec<DateTime<Utc>>,
    cooldown_until: Option<DateTime<Utc>>,
}

pub struct RateLimitHook {
    config: RateLimitConfig,
    states: DashMap<String, SessionRateState>,
}

impl RateLimitHook {
    pub fn new() -> Self {
        Self::with_config(RateLimitConfig::default())
    }

    pub fn with_config(config: RateLimitConfig) -> Self {
        Self {
            config,
            states: DashMap::new(),
        }
    }

    /// Record a turn for `session_id`, or explain why it is refused
    fn check_turn(&self, session_id: &str, now: DateTime<Utc>) -> Result<(), String> {
        if self.states.len() > MAX_TRACKED_SESSIONS {
            self.prune_stale(now);
        }
        let mut state = self.states.entry(session_id.to_string()).or_default();

        if let Some(until) = state.cooldown_until {
            if now < until {
                let remaining = (until - now).num_seconds().max(1);
                return Err(format!("Rate limited. Please wait {} seconds.", remaining));
            }
            state.cooldown_until = None;
        }

        let window_start = now - Duration::seconds(self.config.window_secs as i64);
        state.turn_times.retain(|t| *t > window_start);

        if state.turn_times.len() >= self.config.max_turns as usize {
            state.cooldown_until = Some(now + Duration::seconds(self.config.cooldown_secs as i64));
            return Err(format!(
                "Rate limit exceeded: {} turns in {}s. Cooldown for {}s.",
                self.config.max_turns, self.config.window_secs, self.config.cooldown_secs
            ));
        }

        state.turn_times.push(now);
        Ok(())
    }

    pub fn reset(&self, session_id: &str) {
        self.states.remove(session_id);
    }

    /// Forget sessions with no turn in the window and no running cooldown.
    /// Returns the number of sessions dropped.
    pub fn prune_stale(&self, now: DateTime<Utc>) -> usize {
        let window_start = now - Duration::seconds(self.config.window_secs as i64);
        let before = self.states.len();
        self.states.retain(|_, state| {
            state.cooldown_until.is_some_and(|until| now < until)
                || state.turn_times.iter().any(|t| *t > window_start)
        });
        let removed = before.saturating_sub(self.states.len());
        if removed > 0 {
            log::debug!("[RATE LIMIT] Dropped {} stale session(s)", removed);
        }
        removed
    }

    pub fn tracked_sessions(&self) -> usize {
        self.states.len()
    }
}

impl Default for RateLimitHook {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Hook for RateLimitHook {
    fn id(&self) -> &str {
        "builtin.rate_limit"
    }

    fn name(&self) -> &str {
        "Rate Limit Hook"
    }

    fn description(&self) -> &str {
        "Limits turns per session and tool calls per turn"
    }

    fn points(&self) -> Vec<InterceptionPoint> {
        vec![InterceptionPoint::PreTurn, InterceptionPoint::PreTool]
    }

    async fn before_turn(&self, _envelope: &TurnEnvelope, state: &TurnState) -> HookOutcome {
        match self.check_turn(state.session_id(), Utc::now()) {
            Ok(()) => Ok(HookResult::Continue),
            Err(message) => {
                log::warn!("[RATE LIMIT] Session {}: {}", state.session_id(), message);
                Ok(HookResult::respond(format!("⏰ {}", message)))
            }
        }
    }

    async fn before_tool(&self, envelope: &TurnEnvelope, state: &TurnState) -> HookOutcome {
        let Some(max_calls) = self.config.max_tool_calls_per_turn else {
            return Ok(HookResult::Continue);
        };

        let calls = state.increment(Scope::Temp, TOOL_CALLS_KEY, 1)?;
        if calls > max_calls as i64 {
            log::warn!(
                "[RATE LIMIT] Tool call limit exceeded in {} ({})",
                state.session_id(),
                envelope.tool_name().unwrap_or("unknown")
            );
            return Ok(HookResult::deny_tool(format!(
                "Tool call limit exceeded: maximum {} calls per turn",
                max_calls
            )));
        }

        Ok(HookResult::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::Payload;
    use crate::model::{ModelRequest, ToolCall};
    use crate::state::StateStore;
    use serde_json::{json, Map};
    use std::sync::Arc;

    fn turn_state(store: &Arc<StateStore>, invocation: &str) -> TurnState {
        TurnState::new(store.clone(), "u1", "s1", invocation)
    }

    #[tokio::test]
    async fn test_turn_limit_and_cooldown() {
        let store = Arc::new(StateStore::new("rate_test"));
        store.create_session("u1", "s1", Map::new()).unwrap();
        let hook = RateLimitHook::with_config(RateLimitConfig {
            max_turns: 2,
            window_secs: 60,
            max_tool_calls_per_turn: Some(3),
            cooldown_secs: 10,
        });

        let envelope = TurnEnvelope::new(InterceptionPoint::PreTurn, "inv-1", ModelRequest::new("m"));
        for _ in 0..2 {
            let result = hook.execute(&envelope, &turn_state(&store, "inv-1")).await.unwrap();
            assert!(result.should_continue());
        }

        match hook.execute(&envelope, &turn_state(&store, "inv-3")).await.unwrap() {
            HookResult::ShortCircuit(Payload::Response(response)) => {
                assert!(response.content.contains("Rate limit exceeded"));
            }
            other => panic!("expected short-circuit, got {:?}", other),
        }

        // Still cooling down
        match hook.execute(&envelope, &turn_state(&store, "inv-4")).await.unwrap() {
            HookResult::ShortCircuit(Payload::Response(response)) => {
                assert!(response.content.contains("Please wait"));
            }
            other => panic!("expected short-circuit, got {:?}", other),
        }

        hook.reset("s1");
        let result = hook.execute(&envelope, &turn_state(&store, "inv-5")).await.unwrap();
        assert!(result.should_continue());
    }

    #[test]
    fn test_window_slides() {
        let hook = RateLimitHook::with_config(RateLimitConfig {
            max_turns: 1,
            window_secs: 60,
            max_tool_calls_per_turn: None,
            cooldown_secs: 0,
        });
        let start = Utc::now();
        assert!(hook.check_turn("s1", start).is_ok());
        assert!(hook.check_turn("s1", start + Duration::seconds(30)).is_err());
        assert!(hook.check_turn("s1", start + Duration::seconds(61)).is_ok());
    }

    #[tokio::test]
    async fn test_tool_call_limit_per_turn() {
        let store = Arc::new(StateStore::new("rate_test"));
        store.create_session("u1", "s1", Map::new()).unwrap();
        let hook = RateLimitHook::with_config(RateLimitConfig {
            max_turns: 100,
            window_secs: 60,
            max_tool_calls_per_turn: Some(2),
            cooldown_secs: 10,
        });

        let envelope = TurnEnvelope::new(InterceptionPoint::PreTool, "inv-1", ModelRequest::new("m"))
            .with_tool_call(ToolCall::new("call_1", "get_current_weather", json!({})));
        let state = turn_state(&store, "inv-1");

        assert!(hook.execute(&envelope, &state).await.unwrap().should_continue());
        assert!(hook.execute(&envelope, &state).await.unwrap().should_continue());
        match hook.execute(&envelope, &state).await.unwrap() {
            HookResult::ShortCircuit(Payload::ToolResult(value)) => {
                assert_eq!(value["denied"], true);
            }
            other => panic!("expected denial, got {:?}", other),
        }

        // A new turn starts with a fresh temp namespace
        let next_turn = turn_state(&store, "inv-2");
        assert!(hook.execute(&envelope, &next_turn).await.unwrap().should_continue());
    }

    #[test]
    fn test_stale_sessions_are_dropped() {
        let hook = RateLimitHook::with_config(RateLimitConfig {
            max_turns: 1,
            window_secs: 60,
            max_tool_calls_per_turn: None,
            cooldown_secs: 300,
        });
        let start = Utc::now();
        for i in 0..5 {
            hook.check_turn(&format!("s{}", i), start).unwrap();
        }
        assert!(hook.check_turn("s0", start).is_err());
        assert_eq!(hook.tracked_sessions(), 5);

        assert_eq!(hook.prune_stale(start), 0);
        // s0 is still cooling down
        assert_eq!(hook.prune_stale(start + Duration::seconds(120)), 4);
        assert_eq!(hook.tracked_sessions(), 1);
        assert_eq!(hook.prune_stale(start + Duration::seconds(400)), 1);
    }

    #[test]
    fn test_check_turn_sweeps_beyond_limit() {
        let hook = RateLimitHook::new();
        let start = Utc::now();
        for i in 0..=MAX_TRACKED_SESSIONS {
            hook.check_turn(&format!("s{}", i), start).unwrap();
        }
        assert_eq!(hook.tracked_sessions(), MAX_TRACKED_SESSIONS + 1);

        hook.check_turn("late", start + Duration::seconds(120)).unwrap();
        assert_eq!(hook.tracked_sessions(), 1);
    }
}
