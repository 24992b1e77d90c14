//! Translation helper tools

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use super::title_case;
use crate::error::ToolError;
use crate::tools::registry::Tool;
use crate::tools::types::{parse_params, PropertySchema, ToolContext, ToolDefinition};

/// Marker phrases per language, in priority order for ties
const LANGUAGE_PATTERNS: [(&str, [&str; 6]); 5] = [
    ("spanish", ["hola", "gracias", "por favor", "buenos días", "¿cómo", "está"]),
    ("french", ["bonjour", "merci", "s'il vous plaît", "comment", "allez-vous", "très"]),
    ("german", ["hallo", "danke", "bitte", "guten tag", "wie", "geht"]),
    ("italian", ["ciao", "grazie", "prego", "buongiorno", "come", "stai"]),
    ("portuguese", ["olá", "obrigado", "por favor", "bom dia", "como", "está"]),
];

const TRANSLATION_CONTEXT: [((&str, &str), &str); 6] = [
    (("spanish", "english"), "Consider formal vs informal 'you' (tú/usted). Watch for false friends."),
    (("french", "english"), "Mind the subjunctive mood and formal register differences."),
    (("german", "english"), "German compound words may need breaking down. Consider case system."),
    (("english", "spanish"), "Consider regional variations (Spain vs Latin America)."),
    (("english", "french"), "Pay attention to gender agreement and formal/informal registers."),
    (("english", "german"), "German prefers compound words and different sentence structure."),
];

/// Best matching language and its number of matched markers
fn best_language(text: &str) -> Option<(&'static str, usize)> {
    let lower = text.to_lowercase();
    let mut best: Option<(&'static str, usize)> = None;
    for (language, patterns) in LANGUAGE_PATTERNS {
        let matches = patterns.iter().filter(|p| lower.contains(*p)).count();
        if matches > 0 && best.is_none_or(|(_, n)| matches > n) {
            best = Some((language, matches));
        }
    }
    best
}

#[derive(Debug, Deserialize)]
struct DetectParams {
    text: String,
}

pub struct DetectLanguageTool;

#[async_trait]
impl Tool for DetectLanguageTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new("detect_language", "Detect the language of the input text")
            .param("text", PropertySchema::string("Text to analyze for language detection"), true)
    }

    async fn execute(&self, params: Value, _context: &ToolContext<'_>) -> Result<Value, ToolError> {
        let params: DetectParams = parse_params(params)?;
        let text = match best_language(&params.text) {
            Some((language, matches)) => {
                log::info!("[TOOLS] Language detected: {}", language);
                format!(
                    "🌍 Detected language: {} (confidence: {} matches)",
                    title_case(language),
                    matches
                )
            }
            None => "🌍 Language: English (default - no other language patterns detected)".to_string(),
        };
        Ok(Value::String(text))
    }
}

#[derive(Debug, Deserialize)]
struct ContextParams {
    source_lang: String,
    target_lang: String,
}

/// Cultural and linguistic notes for a language pair
pub struct TranslationContextTool;

#[async_trait]
impl Tool for TranslationContextTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new("get_translation_context", "Get cultural and linguistic context for translation")
            .param("source_lang", PropertySchema::string("Source language"), true)
            .param("target_lang", PropertySchema::string("Target language"), true)
    }

    async fn execute(&self, params: Value, _context: &ToolContext<'_>) -> Result<Value, ToolError> {
        let params: ContextParams = parse_params(params)?;
        let key = (params.source_lang.to_lowercase(), params.target_lang.to_lowercase());
        log::info!("[TOOLS] Getting translation context for {} → {}", params.source_lang, params.target_lang);

        let note = TRANSLATION_CONTEXT
            .iter()
            .find(|((source, target), _)| *source == key.0 && *target == key.1)
            .map(|(_, note)| *note);
        let text = match note {
            Some(note) => format!(
                "📝 Translation Context ({} → {}):\n{}",
                params.source_lang, params.target_lang, note
            ),
            None => format!(
                "📝 Translation Context: Standard translation practices apply for {} → {}",
                params.source_lang, params.target_lang
            ),
        };
        Ok(Value::String(text))
    }
}
