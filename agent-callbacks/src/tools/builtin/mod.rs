//! Built-in tools backed by mock business data

mod artifacts;
mod calculator;
mod content_safety;
mod fortune;
mod images;
mod memory;
mod preferences;
mod refunds;
mod restaurant;
mod translation;
mod weather;

use std::sync::Arc;

pub use artifacts::{
    save_artifact, ListArtifactsTool, ShowImageTool, ARTIFACTS_KEY, LAST_UPLOAD_KEY, UPLOAD_PREFIX,
};
pub use calculator::{BasicCalculatorTool, ScientificCalculatorTool, UnitConverterTool};
pub use content_safety::{ContentSafetyTool, UNSAFE_KEYWORDS};
pub use fortune::{MagicAnswerTool, MAGIC_RESPONSES};
pub use images::{
    GenerateImageTool, ListGeneratedImagesTool, IMAGE_INDEX_KEY, IMAGE_PREFIX, LAST_IMAGE_KEY,
};
pub use memory::LoadMemoryTool;
pub use preferences::{
    Product, ProductRecommendationTool, SaveUserPreferenceTool, TrackInteractionTool,
    ALL_CATEGORIES, PRODUCT_CATALOG,
};
pub use refunds::{
    is_refund_eligible, purchase_history, ProcessRefundTool, PurchaseHistoryTool, PurchaseItem,
    PurchaseRecord, RefundEligibilityTool,
};
pub use restaurant::RestaurantInfoTool;
pub use translation::{DetectLanguageTool, TranslationContextTool};
pub use weather::{CurrentWeatherTool, WeatherAlertsTool, WeatherForecastTool};

use super::registry::{Tool, ToolRegistry};

/// Capitalize the first letter of every word, lowercase the rest
pub(crate) fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut at_word_start = true;
    for c in text.chars() {
        if c.is_alphabetic() {
            if at_word_start {
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(c);
            at_word_start = true;
        }
    }
    out
}

/// Every built-in tool that needs no shared service
pub fn all_tools() -> Vec<Arc<dyn Tool>> {
    vec![
        Arc::new(CurrentWeatherTool),
        Arc::new(WeatherForecastTool),
        Arc::new(WeatherAlertsTool),
        Arc::new(BasicCalculatorTool),
        Arc::new(ScientificCalculatorTool),
        Arc::new(UnitConverterTool),
        Arc::new(DetectLanguageTool),
        Arc::new(TranslationContextTool),
        Arc::new(PurchaseHistoryTool),
        Arc::new(RefundEligibilityTool),
        Arc::new(ProcessRefundTool),
        Arc::new(RestaurantInfoTool),
        Arc::new(ContentSafetyTool),
        Arc::new(SaveUserPreferenceTool),
        Arc::new(ProductRecommendationTool),
        Arc::new(TrackInteractionTool),
        Arc::new(GenerateImageTool::new()),
        Arc::new(ListGeneratedImagesTool),
        Arc::new(ListArtifactsTool),
        Arc::new(ShowImageTool),
        Arc::new(MagicAnswerTool),
    ]
}

/// Registry holding the given tools
pub fn registry_with(tools: Vec<Arc<dyn Tool>>) -> Arc<ToolRegistry> {
    let registry = ToolRegistry::new();
    for tool in tools {
        registry.register(tool);
    }
    Arc::new(registry)
}

/// Registry with every built-in tool
pub fn create_default_registry() -> Arc<ToolRegistry> {
    let registry = registry_with(all_tools());
    log::info!("[TOOLS] Default registry created with {} tools", registry.len());
    registry
}

#[cfg(test)]
pub(crate) fn test_state() -> crate::state::TurnState {
    let store = Arc::new(crate::state::StateStore::new("tool_tests"));
    store
        .create_session("tester", "session", serde_json::Map::new())
        .unwrap();
    crate::state::TurnState::new(store, "tester", "session", "inv-test")
}
