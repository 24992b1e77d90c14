use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ToolError;
use crate::state::TurnState;

/// JSON-schema-like description of one tool parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertySchema {
    #[serde(rename = "type")]
    pub schema_type: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<PropertySchema>>,
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<String>>,
}

impl PropertySchema {
    fn of(schema_type: &str, description: &str) -> Self {
        PropertySchema {
            schema_type: schema_type.to_string(),
            description: description.to_string(),
            default: None,
            items: None,
            enum_values: None,
        }
    }

    pub fn string(description: &str) -> Self {
        Self::of("string", description)
    }

    pub fn number(description: &str) -> Self {
        Self::of("number", description)
    }

    pub fn integer(description: &str) -> Self {
        Self::of("integer", description)
    }

    pub fn array(description: &str, items: PropertySchema) -> Self {
        let mut schema = Self::of("array", description);
        schema.items = Some(Box::new(items));
        schema
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    pub fn with_enum(mut self, values: &[&str]) -> Self {
        self.enum_values = Some(values.iter().map(|v| v.to_string()).collect());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInputSchema {
    #[serde(rename = "type")]
    pub schema_type: String,
    pub properties: HashMap<String, PropertySchema>,
    pub required: Vec<String>,
}

/// What the model is told about a tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: ToolInputSchema,
}

impl ToolDefinition {
    pub fn new(name: &str, description: &str) -> Self {
        ToolDefinition {
            name: name.to_string(),
            description: description.to_string(),
            input_schema: ToolInputSchema {
                schema_type: "object".to_string(),
                properties: HashMap::new(),
                required: Vec::new(),
            },
        }
    }

    pub fn param(mut self, name: &str, schema: PropertySchema, required: bool) -> Self {
        self.input_schema.properties.insert(name.to_string(), schema);
        if required {
            self.input_schema.required.push(name.to_string());
        }
        self
    }
}

/// What a tool can see while it runs: its call id and the turn's state
pub struct ToolContext<'a> {
    pub call_id: &'a str,
    pub state: &'a TurnState,
}

impl<'a> ToolContext<'a> {
    pub fn new(call_id: &'a str, state: &'a TurnState) -> Self {
        ToolContext { call_id, state }
    }
}

/// Deserialize tool arguments, mapping failures to `ToolError::InvalidParameters`
pub fn parse_params<T: DeserializeOwned>(params: Value) -> Result<T, ToolError> {
    serde_json::from_value(params).map_err(|e| ToolError::InvalidParameters(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_definition_serializes_as_json_schema() {
        let definition = ToolDefinition::new("get_weather_forecast", "Forecast")
            .param("location", PropertySchema::string("City"), true)
            .param(
                "days",
                PropertySchema::integer("Days").with_default(json!(3)),
                false,
            );
        let value = serde_json::to_value(&definition).unwrap();
        assert_eq!(value["input_schema"]["type"], "object");
        assert_eq!(value["input_schema"]["properties"]["days"]["default"], 3);
        assert_eq!(value["input_schema"]["required"], json!(["location"]));
    }

    #[test]
    fn test_parse_params_error() {
        #[derive(Debug, Deserialize)]
        #[allow(dead_code)]
        struct Params {
            location: String,
        }
        let err = parse_params::<Params>(json!({"city": "Paris"})).unwrap_err();
        assert!(matches!(err, ToolError::InvalidParameters(_)));
    }
}
