use std::env;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::hooks::HookConfig;
use crate::model::{GenerationConfig, RetryPolicy};

/// Settings for one `TurnPipeline`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Namespace for the state store
    pub app_name: String,
    pub agent_name: String,
    /// Model identifier forwarded in every request
    pub model: String,
    /// System instruction for the model
    pub instruction: Option<String>,
    /// Upper bound on model calls in one turn
    pub max_model_calls: u32,
    /// Session key that receives the final response text
    pub output_key: Option<String>,
    pub generation: GenerationConfig,
    /// Retry policy for model and tool calls; none means a single attempt
    pub retry: Option<RetryPolicy>,
    /// Per-hook overrides
    pub hooks: Vec<HookConfig>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            app_name: "agent_callbacks".to_string(),
            agent_name: "assistant".to_string(),
            model: "scripted".to_string(),
            instruction: None,
            max_model_calls: 8,
            output_key: None,
            generation: GenerationConfig::default(),
            retry: None,
            hooks: Vec::new(),
        }
    }
}

impl PipelineConfig {
    pub fn new(app_name: impl Into<String>, agent_name: impl Into<String>) -> Self {
        PipelineConfig {
            app_name: app_name.into(),
            agent_name: agent_name.into(),
            ..Default::default()
        }
    }

    /// Build from `CALLBACKS_*` environment variables, falling back to defaults
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = PipelineConfig::default();
        let retry_attempts: u32 = parse_var(&lookup, "CALLBACKS_RETRY_ATTEMPTS", 0)?;

        Ok(PipelineConfig {
            app_name: lookup("CALLBACKS_APP_NAME").unwrap_or(defaults.app_name),
            agent_name: lookup("CALLBACKS_AGENT_NAME").unwrap_or(defaults.agent_name),
            model: lookup("CALLBACKS_MODEL").unwrap_or(defaults.model),
            instruction: lookup("CALLBACKS_INSTRUCTION"),
            max_model_calls: parse_var(&lookup, "CALLBACKS_MAX_MODEL_CALLS", defaults.max_model_calls)?,
            output_key: lookup("CALLBACKS_OUTPUT_KEY"),
            generation: GenerationConfig {
                temperature: parse_var(
                    &lookup,
                    "CALLBACKS_TEMPERATURE",
                    defaults.generation.temperature,
                )?,
                max_output_tokens: parse_var(
                    &lookup,
                    "CALLBACKS_MAX_OUTPUT_TOKENS",
                    defaults.generation.max_output_tokens,
                )?,
                safety_settings: Vec::new(),
            },
            retry: (retry_attempts > 0).then(|| RetryPolicy {
                max_attempts: retry_attempts,
                ..Default::default()
            }),
            hooks: Vec::new(),
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn with_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.instruction = Some(instruction.into());
        self
    }

    pub fn with_output_key(mut self, key: impl Into<String>) -> Self {
        self.output_key = Some(key.into());
        self
    }

    pub fn with_retry(mut self, policy: RetryPolicy) -> Self {
        self.retry = Some(policy);
        self
    }

    pub fn with_max_model_calls(mut self, max: u32) -> Self {
        self.max_model_calls = max;
        self
    }
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(name) {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
            name: name.to_string(),
            value,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults_without_env() {
        let config = PipelineConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.app_name, "agent_callbacks");
        assert_eq!(config.max_model_calls, 8);
        assert!(config.retry.is_none());
    }

    #[test]
    fn test_env_overrides() {
        let config = PipelineConfig::from_lookup(lookup_from(&[
            ("CALLBACKS_APP_NAME", "weather_service_demo"),
            ("CALLBACKS_MAX_MODEL_CALLS", "4"),
            ("CALLBACKS_TEMPERATURE", "0.2"),
            ("CALLBACKS_RETRY_ATTEMPTS", "5"),
        ]))
        .unwrap();
        assert_eq!(config.app_name, "weather_service_demo");
        assert_eq!(config.max_model_calls, 4);
        assert!((config.generation.temperature - 0.2).abs() < f32::EPSILON);
        assert_eq!(config.retry.unwrap().max_attempts, 5);
    }

    #[test]
    fn test_invalid_env_value() {
        let err = PipelineConfig::from_lookup(lookup_from(&[("CALLBACKS_MAX_MODEL_CALLS", "many")]))
            .unwrap_err();
        match err {
            ConfigError::InvalidEnv { name, value } => {
                assert_eq!(name, "CALLBACKS_MAX_MODEL_CALLS");
                assert_eq!(value, "many");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
app_name = "calculator_demo"
instruction = "You are Professor Calculate"
max_model_calls = 3
output_key = "last_answer"

[generation]
temperature = 0.1

[retry]
max_attempts = 2
base_delay_ms = 50

[[hooks]]
id = "builtin.logging"
enabled = false
"#
        )
        .unwrap();

        let config = PipelineConfig::from_file(file.path()).unwrap();
        assert_eq!(config.app_name, "calculator_demo");
        assert_eq!(config.max_model_calls, 3);
        assert_eq!(config.output_key.as_deref(), Some("last_answer"));
        assert_eq!(config.generation.max_output_tokens, 2048);
        let retry = config.retry.unwrap();
        assert_eq!(retry.max_attempts, 2);
        assert_eq!(retry.max_delay_ms, 8000);
        assert_eq!(config.hooks.len(), 1);
        assert!(!config.hooks[0].enabled);
    }

    #[test]
    fn test_missing_file() {
        let err = PipelineConfig::from_file("/nonexistent/pipeline.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_invalid_toml() {
        let err = PipelineConfig::from_toml_str("max_model_calls = \"lots\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
