//! Audit hook - lets an audit delegate grade the final response of a turn
//!
//! When `audit_enabled` (session, default true) is set the delegate sees the final text;
//! a verdict that asks for revision replaces it. By default an audit failure fails the
//! turn; a lenient hook keeps the original response instead.

use std::sync::Arc;

use async_trait::async_trait;

use crate::audit::AuditDelegate;
use crate::hooks::types::{Hook, HookOutcome, HookResult, InterceptionPoint};
use crate::pipeline::TurnEnvelope;
use crate::state::TurnState;

pub const AUDIT_ENABLED_KEY: &str = "audit_enabled";

pub struct AuditHook {
    delegate: Arc<dyn AuditDelegate>,
    criteria: String,
    lenient: bool,
}

impl AuditHook {
    pub fn new(delegate: Arc<dyn AuditDelegate>, criteria: impl Into<String>) -> Self {
        AuditHook {
            delegate,
            criteria: criteria.into(),
            lenient: false,
        }
    }

    /// Keep the original response when the delegate fails
    pub fn lenient(mut self) -> Self {
        self.lenient = true;
        self
    }
}

#[async_trait]
impl Hook for AuditHook {
    fn id(&self) -> &str {
        "builtin.audit"
    }

    fn name(&self) -> &str {
        "Audit Hook"
    }

    fn description(&self) -> &str {
        "Audits the final response and substitutes a revision when needed"
    }

    fn points(&self) -> Vec<InterceptionPoint> {
        vec![InterceptionPoint::PostTurn]
    }

    fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(30)
    }

    async fn after_turn(&self, envelope: &TurnEnvelope, state: &TurnState) -> HookOutcome {
        if !state.flag(AUDIT_ENABLED_KEY, true)? {
            log::debug!("[AUDIT] Auditing disabled for session {}", state.session_id());
            return Ok(HookResult::Continue);
        }

        let text = envelope.response_text();
        if text.trim().is_empty() {
            return Ok(HookResult::Continue);
        }

        let verdict = match self.delegate.audit(text, &self.criteria).await {
            Ok(verdict) => verdict,
            Err(e) if self.lenient => {
                log::warn!("[AUDIT] Audit failed, keeping original response: {}", e);
                return Ok(HookResult::Continue);
            }
            Err(e) => return Err(e.into()),
        };

        match verdict.revision() {
            Some(revised) => {
                log::info!("[AUDIT] Response revised: {}", verdict.notes);
                Ok(HookResult::respond(revised))
            }
            None => Ok(HookResult::Continue),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::AuditVerdict;
    use crate::error::{AuditError, HookError};
    use crate::hooks::Payload;
    use crate::model::{ModelRequest, ModelResponse};
    use crate::state::StateStore;
    use parking_lot::Mutex;
    use serde_json::{json, Map, Value};

    struct FixedAuditor {
        verdict: Option<AuditVerdict>,
        seen: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl AuditDelegate for FixedAuditor {
        async fn audit(&self, response_text: &str, criteria: &str) -> Result<AuditVerdict, AuditError> {
            self.seen.lock().push((response_text.to_string(), criteria.to_string()));
            self.verdict
                .clone()
                .ok_or_else(|| AuditError::MalformedVerdict("no json".to_string()))
        }
    }

    fn auditor(verdict: Option<AuditVerdict>) -> Arc<FixedAuditor> {
        Arc::new(FixedAuditor {
            verdict,
            seen: Mutex::new(Vec::new()),
        })
    }

    async fn run(hook: &AuditHook, session: &[(&str, Value)]) -> HookOutcome {
        let store = Arc::new(StateStore::new("restaurant_review_demo"));
        let initial: Map<String, Value> = session
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        store.create_session("food_critic", "s1", initial).unwrap();
        let state = TurnState::new(store, "food_critic", "s1", "inv-1");
        let envelope = TurnEnvelope::new(InterceptionPoint::PostTurn, "inv-1", ModelRequest::new("m"))
            .with_response(ModelResponse::text("Food was ok."));
        hook.execute(&envelope, &state).await
    }

    #[tokio::test]
    async fn test_revision_is_substituted() {
        let delegate = auditor(Some(AuditVerdict::revised("A balanced 4/5 review", "More detail")));
        let hook = AuditHook::new(delegate.clone(), "criteria");
        match run(&hook, &[]).await.unwrap() {
            HookResult::ShortCircuit(Payload::Response(response)) => {
                assert_eq!(response.content, "A balanced 4/5 review");
            }
            other => panic!("expected revision, got {:?}", other),
        }
        assert_eq!(
            delegate.seen.lock()[0],
            ("Food was ok.".to_string(), "criteria".to_string())
        );
    }

    #[tokio::test]
    async fn test_approval_and_disabled_keep_response() {
        let delegate = auditor(Some(AuditVerdict::approved("Good")));
        let hook = AuditHook::new(delegate.clone(), "criteria");
        assert!(matches!(run(&hook, &[]).await.unwrap(), HookResult::Continue));

        let result = run(&hook, &[(AUDIT_ENABLED_KEY, json!(false))]).await.unwrap();
        assert!(matches!(result, HookResult::Continue));
        assert_eq!(delegate.seen.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_audit_failure() {
        let strict = AuditHook::new(auditor(None), "criteria");
        assert!(matches!(run(&strict, &[]).await, Err(HookError::Audit(_))));

        let lenient = AuditHook::new(auditor(None), "criteria").lenient();
        assert!(matches!(run(&lenient, &[]).await.unwrap(), HookResult::Continue));
    }
}
