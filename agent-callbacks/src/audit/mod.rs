//! Response auditing
//!
//! An `AuditDelegate` grades a finished response against a set of criteria and may hand
//! back a revised text. `LlmAuditor` does this with a secondary `TurnPipeline` whose model
//! is asked to answer with a JSON verdict.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Map;
use uuid::Uuid;

use crate::config::PipelineConfig;
use crate::error::AuditError;
use crate::model::ModelClient;
use crate::pipeline::TurnPipeline;
use crate::state::StateStore;

pub const AUDITOR_APP: &str = "auditor_app";
pub const AUDITOR_USER: &str = "auditor_user";

/// Verdict returned by an auditor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditVerdict {
    #[serde(rename = "needs_improvement")]
    pub needs_revision: bool,
    #[serde(rename = "improved_response", default)]
    pub revised_text: Option<String>,
    #[serde(rename = "audit_notes", default)]
    pub notes: String,
}

impl AuditVerdict {
    pub fn approved(notes: impl Into<String>) -> Self {
        AuditVerdict {
            needs_revision: false,
            revised_text: None,
            notes: notes.into(),
        }
    }

    pub fn revised(text: impl Into<String>, notes: impl Into<String>) -> Self {
        AuditVerdict {
            needs_revision: true,
            revised_text: Some(text.into()),
            notes: notes.into(),
        }
    }

    /// Parse the auditor's reply. A surrounding markdown code fence is tolerated.
    pub fn parse(reply: &str) -> Result<Self, AuditError> {
        let trimmed = reply.trim();
        if trimmed.is_empty() {
            return Err(AuditError::EmptyResponse);
        }
        let body = trimmed
            .strip_prefix("```json")
            .or_else(|| trimmed.strip_prefix("```"))
            .and_then(|rest| rest.strip_suffix("```"))
            .unwrap_or(trimmed)
            .trim();
        serde_json::from_str(body).map_err(|e| AuditError::MalformedVerdict(e.to_string()))
    }

    /// The text to use instead of the original, if the auditor asked for one
    pub fn revision(&self) -> Option<&str> {
        if !self.needs_revision {
            return None;
        }
        self.revised_text.as_deref().filter(|t| !t.trim().is_empty())
    }
}

/// Grades and optionally rewrites a response
#[async_trait]
pub trait AuditDelegate: Send + Sync {
    async fn audit(&self, response_text: &str, criteria: &str) -> Result<AuditVerdict, AuditError>;
}

/// Predefined audit criteria
pub struct AuditCriteria;

impl AuditCriteria {
    pub const RESTAURANT_REVIEW: &'static str = "\
- Professional and constructive tone
- Specific details about food, service, and atmosphere
- Balanced perspective (both positives and areas for improvement)
- Helpful for other diners
- Free of offensive language
- Proper grammar and spelling";

    pub const CONTENT_FILTER: &'static str = "\
- No inappropriate, offensive, or harmful content
- Respectful and inclusive language
- Age-appropriate content
- No personal attacks or harassment
- Factually accurate information
- Clear and understandable language";

    pub const TRANSLATION_QUALITY: &'static str = "\
- Accurate translation of meaning
- Natural flow in target language
- Proper grammar and syntax
- Cultural appropriateness
- Maintains original tone and style
- No mistranslations or omissions";

    pub const WEATHER_SERVICE: &'static str = "\
- Accurate and current weather information
- Clear and easy to understand
- Includes relevant details (temperature, conditions, etc.)
- Appropriate warnings for severe weather
- Professional and helpful tone
- Properly formatted data";

    pub const CALCULATION_ACCURACY: &'static str = "\
- Mathematically correct results
- Clear step-by-step explanations
- Proper units and formatting
- Appropriate precision for the context
- Easy to verify calculations
- Professional presentation";
}

/// System instruction for the auditor model
pub fn audit_instruction(criteria: &str) -> String {
    format!(
        r#"You are a professional response auditor and editor. Your job is to review responses and improve them when necessary.

AUDIT CRITERIA:
{criteria}

When reviewing a response, you should:
1. Analyze the response against the criteria
2. Determine if improvements are needed
3. If improvements are needed, provide a better version
4. Always maintain the original intent and tone while improving quality

Respond in this exact JSON format:
{{
    "needs_improvement": true/false,
    "improved_response": "your improved version here (only if needs_improvement is true)",
    "audit_notes": "brief explanation of what was improved or why no improvement was needed"
}}

Be concise but thorough in your analysis."#
    )
}

/// Text sent to the auditor for one response
pub fn audit_request(response_text: &str) -> String {
    format!("Please audit this response:\n\n{}", response_text)
}

/// Auditor backed by a secondary pipeline. Every audit runs in a fresh session of its own
/// store, so audits never see each other or the audited conversation.
pub struct LlmAuditor {
    name: String,
    model: Arc<dyn ModelClient>,
    store: Arc<StateStore>,
}

impl LlmAuditor {
    pub fn new(name: impl Into<String>, model: Arc<dyn ModelClient>) -> Self {
        LlmAuditor {
            name: name.into(),
            model,
            store: Arc::new(StateStore::new(AUDITOR_APP)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn pipeline(&self, criteria: &str) -> TurnPipeline {
        let config = PipelineConfig::new(AUDITOR_APP, self.name.clone())
            .with_instruction(audit_instruction(criteria))
            .with_max_model_calls(1);
        TurnPipeline::new(config, self.model.clone()).with_store(self.store.clone())
    }
}

#[async_trait]
impl AuditDelegate for LlmAuditor {
    async fn audit(&self, response_text: &str, criteria: &str) -> Result<AuditVerdict, AuditError> {
        let pipeline = self.pipeline(criteria);
        let session_id = format!("audit-{}", Uuid::new_v4());
        pipeline
            .create_session(AUDITOR_USER, &session_id, Map::new())
            .map_err(|e| AuditError::Pipeline(Box::new(e)))?;

        log::debug!("[AUDIT] {} auditing {} chars", self.name, response_text.len());
        let outcome = pipeline
            .run_turn(AUDITOR_USER, &session_id, &audit_request(response_text))
            .await;
        pipeline.end_session(&session_id);

        let outcome = outcome.map_err(|e| AuditError::Pipeline(Box::new(e)))?;
        let verdict = AuditVerdict::parse(outcome.text())?;
        log::info!(
            "[AUDIT] {} verdict: needs_improvement={} ({})",
            self.name,
            verdict.needs_revision,
            verdict.notes
        );
        Ok(verdict)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{MockModelClient, ModelResponse};

    #[test]
    fn test_parse_verdict() {
        let verdict = AuditVerdict::parse(
            r#"{"needs_improvement": true, "improved_response": "Better", "audit_notes": "Added detail"}"#,
        )
        .unwrap();
        assert_eq!(verdict, AuditVerdict::revised("Better", "Added detail"));
        assert_eq!(verdict.revision(), Some("Better"));
    }

    #[test]
    fn test_parse_fenced_verdict() {
        let reply = "```json\n{\"needs_improvement\": false, \"audit_notes\": \"Fine\"}\n```";
        let verdict = AuditVerdict::parse(reply).unwrap();
        assert!(!verdict.needs_revision);
        assert_eq!(verdict.revision(), None);
    }

    #[test]
    fn test_revision_requires_text() {
        let verdict = AuditVerdict {
            needs_revision: true,
            revised_text: Some("  ".to_string()),
            notes: String::new(),
        };
        assert_eq!(verdict.revision(), None);
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(AuditVerdict::parse("   "), Err(AuditError::EmptyResponse)));
        assert!(matches!(
            AuditVerdict::parse("Looks great to me!"),
            Err(AuditError::MalformedVerdict(_))
        ));
    }

    #[tokio::test]
    async fn test_llm_auditor_uses_secondary_pipeline() {
        let model = Arc::new(MockModelClient::new(vec![Ok(ModelResponse::text(
            r#"{"needs_improvement": true, "improved_response": "A detailed review", "audit_notes": "Too short"}"#,
        ))]));
        let auditor = LlmAuditor::new("RestaurantReviewAuditor", model.clone());

        let verdict = auditor
            .audit("Food ok.", AuditCriteria::RESTAURANT_REVIEW)
            .await
            .unwrap();
        assert_eq!(verdict.revision(), Some("A detailed review"));

        let request = model.last_request().unwrap();
        assert_eq!(request.last_user_message(), Some("Please audit this response:\n\nFood ok."));
        let instruction = request.system_instruction.unwrap();
        assert!(instruction.contains("Specific details about food, service, and atmosphere"));
        assert!(instruction.contains("\"needs_improvement\": true/false"));
    }

    #[tokio::test]
    async fn test_llm_auditor_malformed_reply() {
        let model = Arc::new(MockModelClient::replying("I think it is fine"));
        let auditor = LlmAuditor::new("Auditor", model);
        let err = auditor.audit("text", AuditCriteria::CONTENT_FILTER).await.unwrap_err();
        assert!(matches!(err, AuditError::MalformedVerdict(_)));
    }
}
