//! Restaurant lookup used as review context

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use super::title_case;
use crate::error::ToolError;
use crate::tools::registry::Tool;
use crate::tools::types::{parse_params, PropertySchema, ToolContext, ToolDefinition};

struct Restaurant {
    key: &'static str,
    cuisine: &'static str,
    price_range: &'static str,
    location: &'static str,
    specialties: [&'static str; 3],
}

const RESTAURANTS: [Restaurant; 4] = [
    Restaurant { key: "bella italia", cuisine: "Italian", price_range: "$$", location: "Downtown", specialties: ["pasta", "pizza", "tiramisu"] },
    Restaurant { key: "sushi zen", cuisine: "Japanese", price_range: "$$$", location: "Uptown", specialties: ["sashimi", "rolls", "sake"] },
    Restaurant { key: "burger palace", cuisine: "American", price_range: "$", location: "Mall", specialties: ["burgers", "fries", "milkshakes"] },
    Restaurant { key: "le petit bistro", cuisine: "French", price_range: "$$$$", location: "Arts District", specialties: ["coq au vin", "escargot", "wine"] },
];

#[derive(Debug, Deserialize)]
struct RestaurantParams {
    restaurant_name: String,
}

pub struct RestaurantInfoTool;

#[async_trait]
impl Tool for RestaurantInfoTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            "get_restaurant_info",
            "Get basic information about a restaurant for review context",
        )
        .param("restaurant_name", PropertySchema::string("Name of the restaurant"), true)
    }

    async fn execute(&self, params: Value, _context: &ToolContext<'_>) -> Result<Value, ToolError> {
        let params: RestaurantParams = parse_params(params)?;
        let key = params.restaurant_name.trim().to_lowercase();
        log::info!("[TOOLS] Looking up restaurant: {}", params.restaurant_name);

        let text = match RESTAURANTS.iter().find(|r| r.key == key) {
            Some(info) => format!(
                "Restaurant: {}\nCuisine: {}\nPrice Range: {}\nLocation: {}\nSpecialties: {}",
                title_case(&params.restaurant_name),
                info.cuisine,
                info.price_range,
                info.location,
                info.specialties.join(", ")
            ),
            None => format!(
                "Restaurant '{}' not found in our database. Please provide your own context for the review.",
                params.restaurant_name
            ),
        };
        Ok(Value::String(text))
    }
}
