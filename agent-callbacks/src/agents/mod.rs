//! Preset agents
//!
//! Each preset pairs a `ScriptedModel` with the tools and hooks of one example service.
//! Settings shared by every preset (model calls, retries, generation, hook overrides)
//! come from the base `PipelineConfig`.

mod reviewer;
mod scenarios;

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Value};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

use crate::audit::{AuditCriteria, LlmAuditor};
use crate::config::PipelineConfig;
use crate::hooks::builtin::{
    AuditHook, CalculationValidatorHook, ContentFilterHook, ImageUploadHook, LoggingHook,
    MemoryHook, MoodGateHook, RateLimitHook, ResponseGuardHook, ToolPermissionHook,
    TranslationQualityHook,
};
use crate::hooks::InterceptionPoint;
use crate::memory::MemoryService;
use crate::model::{ScriptRule, ScriptedModel};
use crate::pipeline::TurnPipeline;
use crate::tools::builtin::{
    registry_with, title_case, BasicCalculatorTool, ContentSafetyTool, CurrentWeatherTool,
    DetectLanguageTool, GenerateImageTool, ListArtifactsTool, ListGeneratedImagesTool,
    LoadMemoryTool, MagicAnswerTool, ProcessRefundTool, ProductRecommendationTool,
    PurchaseHistoryTool, RefundEligibilityTool, RestaurantInfoTool, SaveUserPreferenceTool,
    ScientificCalculatorTool, ShowImageTool, TrackInteractionTool, TranslationContextTool,
    UnitConverterTool, WeatherAlertsTool, WeatherForecastTool,
};

pub use reviewer::ReviewAuditorModel;
pub use scenarios::{run_on, run_scenario, scenarios, Scenario, ScenarioTurn, TurnReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, EnumString, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum AgentKind {
    MagicEightBall,
    RestaurantReviewer,
    ContentAssistant,
    TranslationService,
    WeatherService,
    Calculator,
    CustomerPreferences,
    RefundAssistant,
    ImageStudio,
    ImageAnalyzer,
    MemoryAssistant,
}

impl AgentKind {
    pub fn all() -> Vec<AgentKind> {
        AgentKind::iter().collect()
    }

    pub fn build(self, base: &PipelineConfig) -> TurnPipeline {
        match self {
            AgentKind::MagicEightBall => magic_eight_ball(base),
            AgentKind::RestaurantReviewer => restaurant_reviewer(base),
            AgentKind::ContentAssistant => content_assistant(base),
            AgentKind::TranslationService => translation_service(base),
            AgentKind::WeatherService => weather_service(base),
            AgentKind::Calculator => calculator(base),
            AgentKind::CustomerPreferences => customer_preferences(base),
            AgentKind::RefundAssistant => refund_assistant(base),
            AgentKind::ImageStudio => image_studio(base),
            AgentKind::ImageAnalyzer => image_analyzer(base),
            AgentKind::MemoryAssistant => memory_assistant(base),
        }
    }
}

/// Put a logging hook on every point the pipeline leaves free
pub fn attach_logging(pipeline: TurnPipeline) -> TurnPipeline {
    let logger = Arc::new(LoggingHook::verbose());
    let free: Vec<InterceptionPoint> = InterceptionPoint::iter()
        .filter(|p| pipeline.hooks().get(*p).is_none())
        .collect();
    free.into_iter()
        .fold(pipeline, |pipeline, point| pipeline.with_hook_at(point, logger.clone()))
}

fn preset_config(base: &PipelineConfig, app_name: &str, agent_name: &str, instruction: &str) -> PipelineConfig {
    PipelineConfig {
        app_name: app_name.to_string(),
        agent_name: agent_name.to_string(),
        instruction: Some(instruction.to_string()),
        ..base.clone()
    }
}

fn capture(pattern: &Regex, message: &str, group: usize) -> Option<String> {
    pattern
        .captures(message)
        .and_then(|c| c.get(group))
        .map(|m| m.as_str().trim().to_string())
}

// ==================== Magic 8-ball ====================

fn magic_eight_ball(base: &PipelineConfig) -> TurnPipeline {
    let model = ScriptedModel::new("magic_8_ball")
        .with_rule(ScriptRule::new("get_magic_answer", |message| {
            message.contains('?').then(|| json!({ "question": message.trim() }))
        }))
        .with_default_reply("🔮 Ask me a yes-or-no question and the Magic 8-Ball will answer!")
        .with_summary_prefix("🎱 Madame Mystique gazes into the Magic 8-Ball...");

    let config = preset_config(
        base,
        "magic_8_ball_demo",
        "magic_8_ball",
        "You are Madame Mystique, a theatrical fortune teller. Answer every question with the Magic 8-Ball.",
    );
    TurnPipeline::new(config, Arc::new(model))
        .with_tools(registry_with(vec![Arc::new(MagicAnswerTool)]))
        .with_hook(Arc::new(MoodGateHook::new()))
}

// ==================== Restaurant reviewer ====================

static REVIEW_TARGET: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)review (?:for|of) (?:the )?(.+?)(?: restaurant)?[.!?]*$").unwrap()
});

fn restaurant_reviewer(base: &PipelineConfig) -> TurnPipeline {
    let model = ScriptedModel::new("restaurant_reviewer")
        .with_rule(ScriptRule::new("get_restaurant_info", |message| {
            capture(&REVIEW_TARGET, message, 1).map(|name| json!({ "restaurant_name": name }))
        }))
        .with_default_reply("🍽️ Tell me which restaurant to review.")
        .with_summary_prefix("📝 Review notes:");

    let auditor = LlmAuditor::new("RestaurantReviewAuditor", Arc::new(ReviewAuditorModel));
    let config = preset_config(
        base,
        "restaurant_reviewer_demo",
        "restaurant_reviewer",
        "You are a professional food critic. Write fair, specific reviews.",
    );
    TurnPipeline::new(config, Arc::new(model))
        .with_tools(registry_with(vec![Arc::new(RestaurantInfoTool)]))
        .with_hook(Arc::new(AuditHook::new(
            Arc::new(auditor),
            AuditCriteria::RESTAURANT_REVIEW,
        )))
}

// ==================== Content assistant ====================

fn content_assistant(base: &PipelineConfig) -> TurnPipeline {
    let model = ScriptedModel::new("content_assistant")
        .with_rule(ScriptRule::new("check_content_safety", |message| {
            let lower = message.to_lowercase();
            (lower.contains("is this safe") || lower.contains("check"))
                .then(|| json!({ "text": message }))
        }))
        .with_default_reply("📚 Great question! Here is a clear, friendly explanation of: {message}")
        .with_summary_prefix("🔍 Safety review:");

    let config = preset_config(
        base,
        "content_filter_demo",
        "content_assistant",
        "You are a friendly educational assistant.",
    );
    TurnPipeline::new(config, Arc::new(model))
        .with_tools(registry_with(vec![Arc::new(ContentSafetyTool)]))
        .with_hook(Arc::new(ContentFilterHook::new()))
        .with_hook(Arc::new(ResponseGuardHook::new()))
}

// ==================== Translation service ====================

static QUOTED: Lazy<Regex> = Lazy::new(|| Regex::new(r"'([^']+)'").unwrap());
static TARGET_LANGUAGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bto (spanish|french|german|english|italian|portuguese)\b").unwrap()
});

fn translation_service(base: &PipelineConfig) -> TurnPipeline {
    let model = ScriptedModel::new("translation_service")
        .with_rule(ScriptRule::new("detect_language", |message| {
            let lower = message.to_lowercase();
            (lower.contains("detect") || lower.contains("what language")).then(|| {
                let text = capture(&QUOTED, message, 1).unwrap_or_else(|| message.to_string());
                json!({ "text": text })
            })
        }))
        .with_rule(ScriptRule::new("get_translation_context", |message| {
            if !message.to_lowercase().contains("cultural context") {
                return None;
            }
            capture(&TARGET_LANGUAGE, message, 1)
                .map(|target| json!({ "source_lang": "english", "target_lang": target.to_lowercase() }))
        }))
        .with_default_reply("🌍 On it: {message}")
        .with_summary_prefix("🌍 Translation notes:");

    let config = preset_config(
        base,
        "translation_service_demo",
        "translation_service",
        "You are a professional translator. Focus on accuracy, cultural context, and natural flow.",
    );
    TurnPipeline::new(config, Arc::new(model))
        .with_tools(registry_with(vec![
            Arc::new(DetectLanguageTool),
            Arc::new(TranslationContextTool),
        ]))
        .with_hook(Arc::new(TranslationQualityHook::new()))
}

// ==================== Weather service ====================

const KNOWN_CITIES: [&str; 5] = ["new york", "london", "tokyo", "sydney", "paris"];

static NAMED_PLACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:in|for) ([A-Z][A-Za-z]*(?: [A-Z][A-Za-z]*)*)").unwrap());
static DAYS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)(\d+)[- ]day").unwrap());

fn find_location(message: &str) -> Option<String> {
    let lower = message.to_lowercase();
    KNOWN_CITIES
        .iter()
        .find(|city| lower.contains(*city))
        .map(|city| title_case(city))
        .or_else(|| capture(&NAMED_PLACE, message, 1))
}

fn weather_service(base: &PipelineConfig) -> TurnPipeline {
    let model = ScriptedModel::new("weather_service")
        .with_rule(ScriptRule::new("get_current_weather", |message| {
            let lower = message.to_lowercase();
            let wants_current =
                lower.contains("current") || (lower.contains("weather") && !lower.contains("forecast"));
            if !wants_current {
                return None;
            }
            find_location(message).map(|location| json!({ "location": location }))
        }))
        .with_rule(ScriptRule::new("get_weather_forecast", |message| {
            if !message.to_lowercase().contains("forecast") {
                return None;
            }
            let days: i64 = capture(&DAYS, message, 1)
                .and_then(|d| d.parse().ok())
                .unwrap_or(3);
            find_location(message).map(|location| json!({ "location": location, "days": days }))
        }))
        .with_rule(ScriptRule::new("get_weather_alerts", |message| {
            if !message.to_lowercase().contains("alert") {
                return None;
            }
            find_location(message).map(|location| json!({ "location": location }))
        }))
        .with_default_reply("🌤️ Which city would you like the weather for?")
        .with_summary_prefix("🌤️ Weather report:");

    let config = preset_config(
        base,
        "weather_service_demo",
        "weather_service",
        "You are a weather assistant. Use the weather tools and explain any access restrictions.",
    );
    TurnPipeline::new(config, Arc::new(model))
        .with_tools(registry_with(vec![
            Arc::new(CurrentWeatherTool),
            Arc::new(WeatherForecastTool),
            Arc::new(WeatherAlertsTool),
        ]))
        .with_hook(Arc::new(ToolPermissionHook::new()))
}

// ==================== Calculator ====================

static ARITHMETIC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)calculate\s+([0-9+\-*/(). ]*[0-9)])").unwrap());
static SCIENTIFIC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(sin|cos|tan|log|ln|sqrt|factorial)\s*\(\s*(-?\d+(?:\.\d+)?)\s*\)").unwrap()
});
static CONVERSION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)convert\s+(-?\d+(?:\.\d+)?)\s*([a-z]+)\s+to\s+([a-z]+)").unwrap()
});

fn unit_alias(unit: &str) -> String {
    let unit = unit.to_lowercase();
    let canonical = match unit.as_str() {
        "feet" | "foot" => "ft",
        "meter" | "meters" | "metre" | "metres" => "m",
        "kilometer" | "kilometers" | "kilometre" | "kilometres" => "km",
        "centimeter" | "centimeters" => "cm",
        "millimeter" | "millimeters" => "mm",
        "miles" => "mile",
        "inches" => "inch",
        "yards" => "yard",
        "gram" | "grams" => "g",
        "kilogram" | "kilograms" => "kg",
        "pound" | "pounds" | "lbs" => "lb",
        "ounce" | "ounces" => "oz",
        other => other,
    };
    canonical.to_string()
}

fn calculator(base: &PipelineConfig) -> TurnPipeline {
    let model = ScriptedModel::new("calculator")
        .with_rule(ScriptRule::new("basic_calculator", |message| {
            capture(&ARITHMETIC, message, 1)
                .filter(|e| e.contains(['+', '-', '*', '/']))
                .map(|expression| json!({ "expression": expression }))
        }))
        .with_rule(ScriptRule::new("basic_calculator", |message| {
            let lower = message.to_lowercase();
            (lower.contains("divide by zero") || lower.contains("divided by zero"))
                .then(|| json!({ "expression": "1 / 0" }))
        }))
        .with_rule(ScriptRule::new("scientific_calculator", |message| {
            let captures = SCIENTIFIC.captures(message)?;
            let argument: f64 = captures.get(2)?.as_str().parse().ok()?;
            Some(json!({
                "operation": captures.get(1)?.as_str().to_lowercase(),
                "arguments": [argument],
            }))
        }))
        .with_rule(ScriptRule::new("unit_converter", |message| {
            let captures = CONVERSION.captures(message)?;
            let value: f64 = captures.get(1)?.as_str().parse().ok()?;
            Some(json!({
                "value": value,
                "from_unit": unit_alias(captures.get(2)?.as_str()),
                "to_unit": unit_alias(captures.get(3)?.as_str()),
            }))
        }))
        .with_default_reply("🧮 Give me an expression to calculate, a function like sqrt(16), or a conversion.")
        .with_summary_prefix("🧮 Professor Calculate shows the work:");

    let config = preset_config(
        base,
        "calculator_service_demo",
        "calculator",
        "You are Professor Calculate. Always show your work and explain results.",
    );
    TurnPipeline::new(config, Arc::new(model))
        .with_tools(registry_with(vec![
            Arc::new(BasicCalculatorTool),
            Arc::new(ScientificCalculatorTool),
            Arc::new(UnitConverterTool),
        ]))
        .with_hook(Arc::new(CalculationValidatorHook::new()))
}

// ==================== Customer preferences ====================

static SKIN_TYPE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)my skin(?: type)? is (\w+)").unwrap());
static CUSTOMER_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)my name is (\w+)").unwrap());
static CATEGORY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)recommend\w*\s+(?:some\s+)?(\w+)\s+products").unwrap());
static INTERACTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(question|purchase|complaint)\b").unwrap());

fn customer_preferences(base: &PipelineConfig) -> TurnPipeline {
    let model = ScriptedModel::new("customer_preferences")
        .with_rule(ScriptRule::new("save_user_preference", |message| {
            capture(&SKIN_TYPE, message, 1)
                .map(|skin| json!({ "preference_key": "skin_type", "preference_value": skin.to_lowercase() }))
        }))
        .with_rule(ScriptRule::new("save_user_preference", |message| {
            capture(&CUSTOMER_NAME, message, 1)
                .map(|name| json!({ "preference_key": "name", "preference_value": name }))
        }))
        .with_rule(ScriptRule::new("get_product_recommendation", |message| {
            if !message.to_lowercase().contains("recommend") {
                return None;
            }
            Some(match capture(&CATEGORY, message, 1) {
                Some(category) => json!({ "category": category.to_lowercase() }),
                None => json!({}),
            })
        }))
        .with_rule(ScriptRule::new("track_interaction", |message| {
            capture(&INTERACTION, message, 1).map(|kind| {
                json!({ "interaction_type": kind.to_lowercase(), "details": message })
            })
        }))
        .with_default_reply("💄 Welcome to Essencia! Tell me about your skin type so I can help.")
        .with_summary_prefix("💄 Essencia assistant:");

    let config = preset_config(
        base,
        "essencia_store",
        "customer_preferences",
        "You are the Essencia beauty assistant. Remember customer preferences across conversations.",
    );
    TurnPipeline::new(config, Arc::new(model)).with_tools(registry_with(vec![
        Arc::new(SaveUserPreferenceTool),
        Arc::new(ProductRecommendationTool),
        Arc::new(TrackInteractionTool),
    ]))
}

// ==================== Refund assistant ====================

static PURCHASER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:i am|i'm|my name is|this is) (\w+)").unwrap());
static SHIPPING: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\b(insured|standard|express)\b").unwrap());
static ORDER_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b([A-Z]{3}\d{3}-\d{8})\b").unwrap());
static AMOUNT: Lazy<Regex> = Lazy::new(|| Regex::new(r"R\$\s*(\d+(?:[.,]\d{1,2})?)").unwrap());

fn refund_reason(message: &str) -> Option<&'static str> {
    let lower = message.to_lowercase();
    if lower.contains("damaged") || lower.contains("broken") {
        Some("DAMAGED")
    } else if lower.contains("never arrived") || lower.contains("didn't arrive") {
        Some("NEVER_ARRIVED")
    } else if lower.contains("late") {
        Some("LATE")
    } else {
        None
    }
}

fn refund_assistant(base: &PipelineConfig) -> TurnPipeline {
    let model = ScriptedModel::new("refund_assistant")
        .with_rule(ScriptRule::new("get_purchase_history", |message| {
            capture(&PURCHASER, message, 1).map(|name| json!({ "purchaser": name }))
        }))
        .with_rule(ScriptRule::new("check_refund_eligibility", |message| {
            let reason = refund_reason(message)?;
            let shipping = capture(&SHIPPING, message, 1)
                .map(|s| s.to_uppercase())
                .unwrap_or_else(|| "STANDARD".to_string());
            Some(json!({ "reason": reason, "shipping_method": shipping }))
        }))
        .with_rule(ScriptRule::new("process_refund", |message| {
            let order_id = capture(&ORDER_ID, message, 1)?;
            let amount: f64 = capture(&AMOUNT, message, 1)?.replace(',', ".").parse().ok()?;
            Some(json!({ "amount": amount, "order_id": order_id }))
        }))
        .with_default_reply("📦 I can help with refunds. Please tell me your name and what happened to your order.")
        .with_summary_prefix("📦 Refund assistant:");

    let config = preset_config(
        base,
        "refund_assistant_demo",
        "refund_assistant",
        "You are a refund assistant. Check purchase history and eligibility before processing refunds.",
    );
    TurnPipeline::new(config, Arc::new(model))
        .with_tools(registry_with(vec![
            Arc::new(PurchaseHistoryTool),
            Arc::new(RefundEligibilityTool),
            Arc::new(ProcessRefundTool),
        ]))
        .with_hook(Arc::new(RateLimitHook::new()))
}

// ==================== Image studio ====================

static IMAGE_PROMPT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:generate|create|draw|make)\s+(?:me\s+)?(?:an?\s+)?(?:image|picture|drawing)\s+of\s+(.+?)[.!?]*$")
        .unwrap()
});

fn image_studio(base: &PipelineConfig) -> TurnPipeline {
    let model = ScriptedModel::new("image_studio")
        .with_rule(ScriptRule::new("generate_image", |message| {
            capture(&IMAGE_PROMPT, message, 1).map(|prompt| json!({ "prompt": prompt }))
        }))
        .with_rule(ScriptRule::keyword(
            "list_generated_images",
            &["list my", "list the", "list images", "show my images"],
            Value::Object(Default::default()),
        ))
        .with_default_reply("🎨 Describe the image you would like me to create.")
        .with_summary_prefix("🎨 Image studio:");

    let config = preset_config(
        base,
        "image_studio",
        "image_studio",
        "You are an image generation assistant.",
    );
    TurnPipeline::new(config, Arc::new(model))
        .with_tools(registry_with(vec![
            Arc::new(GenerateImageTool::new()),
            Arc::new(ListGeneratedImagesTool),
        ]))
        .with_hook(Arc::new(LoggingHook::new()))
}

// ==================== Image analyzer ====================

fn image_analyzer(base: &PipelineConfig) -> TurnPipeline {
    let model = ScriptedModel::new("image_analyzer")
        .with_rule(ScriptRule::keyword(
            "show_image",
            &["show me", "display"],
            Value::Object(Default::default()),
        ))
        .with_rule(ScriptRule::keyword(
            "list_artifacts",
            &["list my", "list the", "list artifacts", "what files"],
            Value::Object(Default::default()),
        ))
        .with_default_reply("🖼️ Got it: {message}\n\nAsk me to show or list your saved images.")
        .with_summary_prefix("🖼️ Image analyzer:");

    let config = preset_config(
        base,
        "image_analyzer",
        "image_analyzer",
        "You are an image assistant. Uploaded images are saved as artifacts you can list and show.",
    );
    TurnPipeline::new(config, Arc::new(model))
        .with_tools(registry_with(vec![Arc::new(ListArtifactsTool), Arc::new(ShowImageTool)]))
        .with_hook(Arc::new(ImageUploadHook::new()))
}

// ==================== Memory assistant ====================

const RECALL_CUES: [&str; 5] = ["before", "last time", "remember", "earlier", "previous"];

static RECALL_TOPIC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\babout (?:my |the |our )?([\w ]+?)[.!?]*$").unwrap());

fn memory_assistant(base: &PipelineConfig) -> TurnPipeline {
    let memory = Arc::new(MemoryService::new());
    let model = ScriptedModel::new("memory_assistant")
        .with_rule(ScriptRule::new("load_memory", |message| {
            let lower = message.to_lowercase();
            if !RECALL_CUES.iter().any(|cue| lower.contains(cue)) {
                return None;
            }
            let query = capture(&RECALL_TOPIC, message, 1).unwrap_or_else(|| message.to_string());
            Some(json!({ "query": query }))
        }))
        .with_default_reply("💄 Lovely to hear from you! I will remember that: {message}")
        .with_summary_prefix("✨ Here is what I remember:");

    let config = preset_config(
        base,
        "essencia_memory",
        "memory_assistant",
        "You are the Essencia assistant with long-term memory. Use load_memory when the customer mentions earlier conversations.",
    );
    TurnPipeline::new(config, Arc::new(model))
        .with_tools(registry_with(vec![Arc::new(LoadMemoryTool::new(memory.clone()))]))
        .with_hook(Arc::new(MemoryHook::new(memory)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_kind_names() {
        assert_eq!(AgentKind::MagicEightBall.to_string(), "magic_eight_ball");
        assert_eq!("weather_service".parse::<AgentKind>().unwrap(), AgentKind::WeatherService);
        assert_eq!(AgentKind::all().len(), 11);
        assert_eq!(AgentKind::MemoryAssistant.to_string(), "memory_assistant");
    }

    #[test]
    fn test_presets_wire_tools_and_hooks() {
        let base = PipelineConfig::default();
        let weather = AgentKind::WeatherService.build(&base);
        assert_eq!(weather.config().app_name, "weather_service_demo");
        assert_eq!(weather.tools().len(), 3);
        assert!(weather.hooks().get(InterceptionPoint::PreTool).is_some());

        let images = AgentKind::ImageStudio.build(&base);
        assert_eq!(images.hooks().hook_count(), 6);

        let analyzer = AgentKind::ImageAnalyzer.build(&base);
        assert_eq!(analyzer.hooks().get(InterceptionPoint::PreTurn).unwrap().id(), "builtin.image_upload");
        let memory = AgentKind::MemoryAssistant.build(&base);
        assert_eq!(memory.hooks().get(InterceptionPoint::PostTurn).unwrap().id(), "builtin.memory");
        assert!(memory.tools().get("load_memory").is_some());
    }

    #[test]
    fn test_attach_logging_keeps_existing_hooks() {
        let base = PipelineConfig::default();
        let pipeline = attach_logging(AgentKind::WeatherService.build(&base));
        let pre_tool = pipeline.hooks().get(InterceptionPoint::PreTool).unwrap();
        assert_eq!(pre_tool.id(), "builtin.tool_permission");
        assert_eq!(pipeline.hooks().hook_count(), 6);
    }

    #[test]
    fn test_message_extraction() {
        assert_eq!(find_location("What's the weather like in London?").as_deref(), Some("London"));
        assert_eq!(find_location("Weather in Blockville please").as_deref(), Some("Blockville"));
        assert_eq!(
            capture(&REVIEW_TARGET, "Please write a review for Bella Italia restaurant", 1).as_deref(),
            Some("Bella Italia")
        );
        assert_eq!(
            capture(&ARITHMETIC, "Calculate 15 * 8 + 32 / 4", 1).as_deref(),
            Some("15 * 8 + 32 / 4")
        );
        assert_eq!(unit_alias("Feet"), "ft");
        assert_eq!(
            capture(&RECALL_TOPIC, "What did I tell you last time about my lavender soap?", 1).as_deref(),
            Some("lavender soap")
        );
        assert_eq!(refund_reason("It never arrived"), Some("NEVER_ARRIVED"));
    }
}
