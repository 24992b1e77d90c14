//! Weather service tools backed by a small table of simulated city data

use std::collections::HashMap;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use serde::Deserialize;
use serde_json::{json, Value};

use super::title_case;
use crate::error::ToolError;
use crate::tools::registry::Tool;
use crate::tools::types::{parse_params, PropertySchema, ToolContext, ToolDefinition};

struct CurrentConditions {
    temperature: &'static str,
    condition: &'static str,
    humidity: &'static str,
    wind: &'static str,
}

static CURRENT: Lazy<HashMap<&'static str, CurrentConditions>> = Lazy::new(|| {
    HashMap::from([
        ("new york", CurrentConditions { temperature: "22°C", condition: "Partly cloudy", humidity: "65%", wind: "15 km/h NW" }),
        ("london", CurrentConditions { temperature: "18°C", condition: "Light rain", humidity: "80%", wind: "12 km/h SW" }),
        ("tokyo", CurrentConditions { temperature: "26°C", condition: "Sunny", humidity: "55%", wind: "8 km/h E" }),
        ("sydney", CurrentConditions { temperature: "20°C", condition: "Overcast", humidity: "70%", wind: "18 km/h S" }),
        ("paris", CurrentConditions { temperature: "19°C", condition: "Clear", humidity: "60%", wind: "10 km/h N" }),
    ])
});

static FORECASTS: Lazy<HashMap<&'static str, [&'static str; 7]>> = Lazy::new(|| {
    HashMap::from([
        ("new york", ["Sunny", "Partly cloudy", "Rain", "Cloudy", "Clear", "Thunderstorms", "Overcast"]),
        ("london", ["Light rain", "Overcast", "Partly cloudy", "Heavy rain", "Clear", "Drizzle", "Foggy"]),
        ("tokyo", ["Sunny", "Clear", "Partly cloudy", "Rain", "Humid", "Typhoon risk", "Hot"]),
        ("sydney", ["Overcast", "Sunny", "Windy", "Clear", "Rain", "Partly cloudy", "Warm"]),
        ("paris", ["Clear", "Cloudy", "Light rain", "Sunny", "Overcast", "Cool", "Mild"]),
    ])
});

static ALERTS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("new york", "⚠️ Heat advisory in effect until 8 PM"),
        ("london", "🌧️ Flood watch for low-lying areas"),
        ("tokyo", "🌀 Typhoon watch - monitor conditions"),
        ("sydney", "🔥 Fire danger rating: High"),
        ("paris", "❄️ Frost warning for tonight"),
    ])
});

#[derive(Debug, Deserialize)]
struct LocationParams {
    location: String,
}

#[derive(Debug, Deserialize)]
struct ForecastParams {
    location: String,
    #[serde(default = "default_days")]
    days: i64,
}

fn default_days() -> i64 {
    3
}

fn location_key(location: &str) -> String {
    location.trim().to_lowercase()
}

fn location_param() -> PropertySchema {
    PropertySchema::string("City or location name, e.g. 'London'")
}

/// Current conditions for a city
pub struct CurrentWeatherTool;

#[async_trait]
impl Tool for CurrentWeatherTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new("get_current_weather", "Get current weather information for a location")
            .param("location", location_param(), true)
    }

    async fn execute(&self, params: Value, _context: &ToolContext<'_>) -> Result<Value, ToolError> {
        let params: LocationParams = parse_params(params)?;
        log::info!("[TOOLS] Getting weather for: {}", params.location);

        let text = match CURRENT.get(location_key(&params.location).as_str()) {
            Some(data) => format!(
                "🌤️ Current Weather in {}:\nTemperature: {}\nCondition: {}\nHumidity: {}\nWind: {}",
                title_case(&params.location),
                data.temperature,
                data.condition,
                data.humidity,
                data.wind
            ),
            None => format!(
                "🌍 Weather data not available for {}. Please try a major city like New York, London, Tokyo, Sydney, or Paris.",
                params.location
            ),
        };
        Ok(Value::String(text))
    }
}

/// Forecast of one to seven days
pub struct WeatherForecastTool;

#[async_trait]
impl Tool for WeatherForecastTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new("get_weather_forecast", "Get weather forecast for a location")
            .param("location", location_param(), true)
            .param(
                "days",
                PropertySchema::integer("Number of days to forecast (1-7)").with_default(json!(3)),
                false,
            )
    }

    async fn execute(&self, params: Value, _context: &ToolContext<'_>) -> Result<Value, ToolError> {
        let params: ForecastParams = parse_params(params)?;
        let days = params.days.clamp(1, 7) as usize;
        log::info!("[TOOLS] Getting {}-day forecast for: {}", days, params.location);

        let text = match FORECASTS.get(location_key(&params.location).as_str()) {
            Some(conditions) => {
                let mut text = format!(
                    "📅 {}-Day Weather Forecast for {}:\n",
                    days,
                    title_case(&params.location)
                );
                for (i, condition) in conditions.iter().take(days).enumerate() {
                    text.push_str(&format!("Day {}: {}\n", i + 1, condition));
                }
                text
            }
            None => format!(
                "📅 Forecast not available for {}. Please try a major city.",
                params.location
            ),
        };
        Ok(Value::String(text))
    }
}

/// Active weather alerts for a city
pub struct WeatherAlertsTool;

#[async_trait]
impl Tool for WeatherAlertsTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new("get_weather_alerts", "Get weather alerts and warnings for a location")
            .param("location", location_param(), true)
    }

    async fn execute(&self, params: Value, _context: &ToolContext<'_>) -> Result<Value, ToolError> {
        let params: LocationParams = parse_params(params)?;
        let text = match ALERTS.get(location_key(&params.location).as_str()) {
            Some(alert) => {
                log::warn!("[TOOLS] Weather alert found for: {}", params.location);
                format!("🚨 Weather Alerts for {}:\n{}", title_case(&params.location), alert)
            }
            None => format!("✅ No weather alerts for {}", title_case(&params.location)),
        };
        Ok(Value::String(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::builtin::test_state;

    #[tokio::test]
    async fn test_current_weather() {
        let state = test_state();
        let context = ToolContext::new("call_1", &state);
        let result = CurrentWeatherTool
            .execute(json!({"location": "new york"}), &context)
            .await
            .unwrap();
        assert_eq!(
            result,
            "🌤️ Current Weather in New York:\nTemperature: 22°C\nCondition: Partly cloudy\nHumidity: 65%\nWind: 15 km/h NW"
        );

        let result = CurrentWeatherTool
            .execute(json!({"location": "Atlantis"}), &context)
            .await
            .unwrap();
        assert!(result.as_str().unwrap().starts_with("🌍 Weather data not available for Atlantis."));
    }

    #[tokio::test]
    async fn test_forecast_days_are_clamped() {
        let state = test_state();
        let context = ToolContext::new("call_1", &state);
        let result = WeatherForecastTool
            .execute(json!({"location": "Tokyo", "days": 12}), &context)
            .await
            .unwrap();
        let text = result.as_str().unwrap();
        assert!(text.starts_with("📅 7-Day Weather Forecast for Tokyo:\n"));
        assert!(text.contains("Day 7: Hot\n"));

        let result = WeatherForecastTool
            .execute(json!({"location": "London"}), &context)
            .await
            .unwrap();
        assert_eq!(
            result,
            "📅 3-Day Weather Forecast for London:\nDay 1: Light rain\nDay 2: Overcast\nDay 3: Partly cloudy\n"
        );
    }

    #[tokio::test]
    async fn test_alerts() {
        let state = test_state();
        let context = ToolContext::new("call_1", &state);
        let result = WeatherAlertsTool
            .execute(json!({"location": "sydney"}), &context)
            .await
            .unwrap();
        assert_eq!(result, "🚨 Weather Alerts for Sydney:\n🔥 Fire danger rating: High");

        let result = WeatherAlertsTool
            .execute(json!({"location": "oslo"}), &context)
            .await
            .unwrap();
        assert_eq!(result, "✅ No weather alerts for Oslo");
    }

    #[tokio::test]
    async fn test_missing_location_is_invalid() {
        let state = test_state();
        let context = ToolContext::new("call_1", &state);
        let err = WeatherAlertsTool.execute(json!({}), &context).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidParameters(_)));
    }
}
