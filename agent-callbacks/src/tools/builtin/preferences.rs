//! Customer preference tools for the Essencia store
//!
//! Between them these tools touch all four state namespaces: preferences and counters
//! per user, the last request per session, a global interaction counter and per-turn
//! processing markers.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use once_cell::sync::Lazy;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ToolError;
use crate::state::Scope;
use crate::tools::registry::Tool;
use crate::tools::types::{parse_params, PropertySchema, ToolContext, ToolDefinition};

/// Category value that disables filtering
pub const ALL_CATEGORIES: &str = "geral";
pub const DEFAULT_SKIN_TYPE: &str = "normal";
pub const DEFAULT_CUSTOMER_NAME: &str = "Cliente";

pub struct Product {
    pub name: &'static str,
    pub price: f64,
    pub category: &'static str,
}

/// Products by skin type
pub static PRODUCT_CATALOG: Lazy<HashMap<&'static str, Vec<Product>>> = Lazy::new(|| {
    HashMap::from([
        (
            "seca",
            vec![
                Product { name: "Creme Hidratante Intensivo Essencia 250ml", price: 45.90, category: "hidratante" },
                Product { name: "Óleo Nutritivo Essencia Argan 100ml", price: 52.90, category: "óleo" },
            ],
        ),
        (
            "oleosa",
            vec![
                Product { name: "Gel de Limpeza Purificante Essencia 200ml", price: 35.90, category: "limpeza" },
                Product { name: "Protetor Solar Matte Essencia FPS 60", price: 68.90, category: "proteção" },
            ],
        ),
        (
            "normal",
            vec![
                Product { name: "Perfume Essencia Floral 75ml", price: 95.90, category: "perfume" },
                Product { name: "Sabonete Líquido Essencia Lavanda 300ml", price: 18.90, category: "sabonete" },
            ],
        ),
    ])
});

#[derive(Debug, Deserialize)]
struct PreferenceParams {
    preference_key: String,
    preference_value: String,
}

/// Stores a preference in the user namespace so every session of the user sees it
pub struct SaveUserPreferenceTool;

#[async_trait]
impl Tool for SaveUserPreferenceTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new("save_user_preference", "Save a preference to the customer's profile")
            .param(
                "preference_key",
                PropertySchema::string("Preference name, e.g. 'skin_type', 'favorite_category' or 'name'"),
                true,
            )
            .param("preference_value", PropertySchema::string("Preference value"), true)
    }

    async fn execute(&self, params: Value, context: &ToolContext<'_>) -> Result<Value, ToolError> {
        let params: PreferenceParams = parse_params(params)?;
        let state = context.state;
        state.set(Scope::User, &params.preference_key, params.preference_value.as_str())?;
        let count = state.increment(Scope::User, "interaction_count", 1)?;
        log::info!(
            "[TOOLS] Saved user preference: user:{} = {} ({} interactions)",
            params.preference_key,
            params.preference_value,
            count
        );
        Ok(Value::String(format!(
            "✅ Preference '{}' saved as '{}' in your profile!",
            params.preference_key, params.preference_value
        )))
    }
}

#[derive(Debug, Deserialize)]
struct RecommendationParams {
    #[serde(default = "default_category")]
    category: String,
}

fn default_category() -> String {
    ALL_CATEGORIES.to_string()
}

pub struct ProductRecommendationTool;

#[async_trait]
impl Tool for ProductRecommendationTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            "get_product_recommendation",
            "Recommend products based on the preferences stored in the customer's profile",
        )
        .param(
            "category",
            PropertySchema::string("hidratante, perfume, limpeza, óleo, sabonete, or geral for all")
                .with_default(json!(ALL_CATEGORIES)),
            false,
        )
    }

    async fn execute(&self, params: Value, context: &ToolContext<'_>) -> Result<Value, ToolError> {
        let params: RecommendationParams = parse_params(params)?;
        let state = context.state;
        let skin_type = state
            .text("user:skin_type")?
            .unwrap_or_else(|| DEFAULT_SKIN_TYPE.to_string());
        let customer = state
            .text("user:name")?
            .unwrap_or_else(|| DEFAULT_CUSTOMER_NAME.to_string());

        state.set(Scope::Temp, "last_recommendation_request", params.category.as_str())?;
        log::info!(
            "[TOOLS] Getting recommendations for skin_type={}, category={}",
            skin_type,
            params.category
        );

        let catalog_key = skin_type.to_lowercase();
        let products = PRODUCT_CATALOG
            .get(catalog_key.as_str())
            .or_else(|| PRODUCT_CATALOG.get(DEFAULT_SKIN_TYPE))
            .map(Vec::as_slice)
            .unwrap_or_default();
        let wanted = params.category.to_lowercase();
        let matching: Vec<&Product> = products
            .iter()
            .filter(|p| wanted == ALL_CATEGORIES || p.category.to_lowercase().contains(&wanted))
            .collect();

        state.set(Scope::Session, "last_recommendation_category", params.category.as_str())?;

        if matching.is_empty() {
            return Ok(Value::String(format!(
                "No products found in category '{}' for {} skin.",
                params.category, skin_type
            )));
        }

        let mut text = format!("💄 Recommendations for {} ({} skin):\n\n", customer, skin_type);
        for (i, product) in matching.iter().enumerate() {
            text.push_str(&format!("{}. {} - R$ {:.2}\n", i + 1, product.name, product.price));
        }
        Ok(Value::String(text))
    }
}

#[derive(Debug, Deserialize)]
struct InteractionParams {
    interaction_type: String,
    #[serde(default)]
    details: String,
}

/// Records an interaction in every namespace
pub struct TrackInteractionTool;

#[async_trait]
impl Tool for TrackInteractionTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new("track_interaction", "Track a customer interaction")
            .param(
                "interaction_type",
                PropertySchema::string("Type of interaction, e.g. 'question', 'purchase' or 'complaint'"),
                true,
            )
            .param("details", PropertySchema::string("Additional details").with_default(json!("")), false)
    }

    async fn execute(&self, params: Value, context: &ToolContext<'_>) -> Result<Value, ToolError> {
        let params: InteractionParams = parse_params(params)?;
        let state = context.state;

        state.set(Scope::Session, "current_interaction_type", params.interaction_type.as_str())?;
        state.set(Scope::Session, "session_interaction_details", params.details.as_str())?;
        let user_total = state.increment(Scope::User, "total_interactions", 1)?;
        let app_total = state.increment(Scope::App, "total_customer_interactions", 1)?;
        state.set(Scope::Temp, "processing_timestamp", Utc::now().to_rfc3339())?;
        state.set(Scope::Temp, "interaction_processed", true)?;

        log::info!(
            "[TOOLS] Tracked interaction: type={}, user_total={}, app_total={}",
            params.interaction_type,
            user_total,
            app_total
        );
        Ok(Value::String(format!(
            "✅ Interaction tracked!\nType: {}\nYour total interactions: {}\nTotal interactions in the app: {}",
            params.interaction_type, user_total, app_total
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{StateStore, TurnState};
    use serde_json::Map;
    use std::sync::Arc;

    fn store() -> Arc<StateStore> {
        let store = Arc::new(StateStore::new("essencia_store"));
        store.create_session("maria", "s1", Map::new()).unwrap();
        store.create_session("maria", "s2", Map::new()).unwrap();
        store.create_session("joao", "s3", Map::new()).unwrap();
        store
    }

    #[tokio::test]
    async fn test_preferences_follow_the_user() {
        let store = store();
        let first = TurnState::new(store.clone(), "maria", "s1", "inv-1");
        let context = ToolContext::new("call_1", &first);
        SaveUserPreferenceTool
            .execute(json!({"preference_key": "skin_type", "preference_value": "seca"}), &context)
            .await
            .unwrap();
        SaveUserPreferenceTool
            .execute(json!({"preference_key": "name", "preference_value": "Maria"}), &context)
            .await
            .unwrap();
        assert_eq!(store.user_value("maria", "interaction_count"), Some(json!(2)));

        let second = TurnState::new(store.clone(), "maria", "s2", "inv-2");
        let context = ToolContext::new("call_1", &second);
        let text = ProductRecommendationTool
            .execute(json!({}), &context)
            .await
            .unwrap();
        assert_eq!(
            text,
            "💄 Recommendations for Maria (seca skin):\n\n1. Creme Hidratante Intensivo Essencia 250ml - R$ 45.90\n2. Óleo Nutritivo Essencia Argan 100ml - R$ 52.90\n"
        );
        assert_eq!(
            second.get(Scope::Temp, "last_recommendation_request").unwrap(),
            Some(json!("geral"))
        );
        assert_eq!(store.get("s2", "last_recommendation_category").unwrap(), Some(json!("geral")));

        let other = TurnState::new(store.clone(), "joao", "s3", "inv-3");
        let context = ToolContext::new("call_1", &other);
        let text = ProductRecommendationTool
            .execute(json!({"category": "perfume"}), &context)
            .await
            .unwrap();
        assert!(text.as_str().unwrap().starts_with("💄 Recommendations for Cliente (normal skin)"));
    }

    #[tokio::test]
    async fn test_recommendation_without_match() {
        let store = store();
        let state = TurnState::new(store, "maria", "s1", "inv-1");
        let context = ToolContext::new("call_1", &state);
        let text = ProductRecommendationTool
            .execute(json!({"category": "limpeza"}), &context)
            .await
            .unwrap();
        assert_eq!(text, "No products found in category 'limpeza' for normal skin.");
    }

    #[tokio::test]
    async fn test_track_interaction_scopes() {
        let store = store();
        for (user, session) in [("maria", "s1"), ("maria", "s2"), ("joao", "s3")] {
            let state = TurnState::new(store.clone(), user, session, "inv");
            let context = ToolContext::new("call_1", &state);
            TrackInteractionTool
                .execute(json!({"interaction_type": "question", "details": "shipping"}), &context)
                .await
                .unwrap();
            assert_eq!(state.get(Scope::Temp, "interaction_processed").unwrap(), Some(json!(true)));
        }

        assert_eq!(store.app_value("total_customer_interactions"), Some(json!(3)));
        assert_eq!(store.user_value("maria", "total_interactions"), Some(json!(2)));
        assert_eq!(store.user_value("joao", "total_interactions"), Some(json!(1)));
        assert_eq!(store.get("s3", "current_interaction_type").unwrap(), Some(json!("question")));
        assert_eq!(store.get("s1", "temp:interaction_processed").ok().flatten(), None);
    }
}
