//! Response guard - replaces model responses that carry a blocking marker

use async_trait::async_trait;

use crate::hooks::types::{Hook, HookOutcome, HookResult, InterceptionPoint};
use crate::pipeline::TurnEnvelope;
use crate::state::TurnState;

pub const DEFAULT_MARKER: &str = "BLOCK";

pub const SAFETY_MESSAGE: &str =
    "🛡️ This response was withheld by the safety guard. Please rephrase your request.";

pub struct ResponseGuardHook {
    marker: String,
    message: String,
}

impl ResponseGuardHook {
    pub fn new() -> Self {
        Self::with_marker(DEFAULT_MARKER, SAFETY_MESSAGE)
    }

    /// Guard on a custom marker (matched case-sensitively) with a custom replacement
    pub fn with_marker(marker: impl Into<String>, message: impl Into<String>) -> Self {
        ResponseGuardHook {
            marker: marker.into(),
            message: message.into(),
        }
    }
}

impl Default for ResponseGuardHook {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Hook for ResponseGuardHook {
    fn id(&self) -> &str {
        "builtin.response_guard"
    }

    fn name(&self) -> &str {
        "Response Guard"
    }

    fn points(&self) -> Vec<InterceptionPoint> {
        vec![InterceptionPoint::PostModel]
    }

    async fn after_model(&self, envelope: &TurnEnvelope, _state: &TurnState) -> HookOutcome {
        if envelope.response_text().contains(&self.marker) {
            log::warn!(
                "[GUARD] Response in {} contained marker '{}', replacing it",
                envelope.invocation_id,
                self.marker
            );
            return Ok(HookResult::respond(self.message.clone()));
        }
        Ok(HookResult::Continue)
    }
}
