// Agent configuration
//
// AgentConfig can be:
// - Created directly or with AgentConfigBuilder
// - Read from SWITCHYARD_* environment variables via `from_env`
// - Deserialized from JSON (timeout in seconds)

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AgentError, Result};

pub const ENV_MODEL: &str = "SWITCHYARD_MODEL";
pub const ENV_SYSTEM_PROMPT: &str = "SWITCHYARD_SYSTEM_PROMPT";
pub const ENV_TIMEOUT_SECS: &str = "SWITCHYARD_TIMEOUT_SECS";
pub const ENV_PARALLEL_TOOLS: &str = "SWITCHYARD_PARALLEL_TOOLS";

/// Configuration for a tool-calling agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    /// System prompt that defines the agent's behavior
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// Model identifier (e.g., "gpt-4o-mini")
    #[serde(default = "default_model")]
    pub model: String,

    /// Deadline for one run; the only bound on the tool-calling loop
    #[serde(default = "default_timeout", with = "duration_secs")]
    pub timeout: Duration,

    /// Run the tool calls of one batch concurrently
    #[serde(default)]
    pub parallel_tool_calls: bool,

    /// Temperature for sampling (0.0 - 2.0)
    #[serde(default)]
    pub temperature: Option<f32>,

    /// Maximum tokens to generate per reply
    #[serde(default)]
    pub max_tokens: Option<u32>,
}

fn default_system_prompt() -> String {
    "You are a helpful assistant.".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_timeout() -> Duration {
    Duration::from_secs(120)
}

impl AgentConfig {
    /// Read overrides from the SWITCHYARD_* environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read overrides through `lookup`; unset keys keep their defaults
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(model) = lookup(ENV_MODEL) {
            config.model = model;
        }
        if let Some(prompt) = lookup(ENV_SYSTEM_PROMPT) {
            config.system_prompt = prompt;
        }
        if let Some(raw) = lookup(ENV_TIMEOUT_SECS) {
            let secs: u64 = raw.trim().parse().map_err(|_| {
                AgentError::config(format!("{ENV_TIMEOUT_SECS} must be whole seconds, got {raw:?}"))
            })?;
            config.timeout = Duration::from_secs(secs);
        }
        if let Some(raw) = lookup(ENV_PARALLEL_TOOLS) {
            config.parallel_tool_calls = parse_flag(&raw).ok_or_else(|| {
                AgentError::config(format!("{ENV_PARALLEL_TOOLS} must be a boolean, got {raw:?}"))
            })?;
        }

        Ok(config)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_parallel_tool_calls(mut self, parallel: bool) -> Self {
        self.parallel_tool_calls = parallel;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            system_prompt: default_system_prompt(),
            model: default_model(),
            timeout: default_timeout(),
            parallel_tool_calls: false,
            temperature: None,
            max_tokens: None,
        }
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}

/// Builder for AgentConfig with fluent API
pub struct AgentConfigBuilder {
    config: AgentConfig,
}

impl AgentConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: AgentConfig::default(),
        }
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = prompt.into();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    pub fn parallel_tool_calls(mut self, parallel: bool) -> Self {
        self.config.parallel_tool_calls = parallel;
        self
    }

    pub fn temperature(mut self, temp: f32) -> Self {
        self.config.temperature = Some(temp);
        self
    }

    pub fn max_tokens(mut self, tokens: u32) -> Self {
        self.config.max_tokens = Some(tokens);
        self
    }

    pub fn build(self) -> AgentConfig {
        self.config
    }
}

impl Default for AgentConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AgentConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(120));
        assert!(!config.parallel_tool_calls);
        assert_eq!(config.system_prompt, "You are a helpful assistant.");
    }

    #[test]
    fn test_from_lookup_overrides() {
        let config = AgentConfig::from_lookup(lookup(&[
            (ENV_MODEL, "local-model"),
            (ENV_TIMEOUT_SECS, "30"),
            (ENV_PARALLEL_TOOLS, "yes"),
        ]))
        .unwrap();

        assert_eq!(config.model, "local-model");
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert!(config.parallel_tool_calls);
        assert_eq!(config.system_prompt, "You are a helpful assistant.");
    }

    #[test]
    fn test_from_lookup_rejects_bad_values() {
        let err = AgentConfig::from_lookup(lookup(&[(ENV_TIMEOUT_SECS, "soon")])).unwrap_err();
        assert!(matches!(err, AgentError::Configuration(_)));

        let err = AgentConfig::from_lookup(lookup(&[(ENV_PARALLEL_TOOLS, "maybe")])).unwrap_err();
        assert!(err.to_string().contains(ENV_PARALLEL_TOOLS));
    }

    #[test]
    fn test_builder() {
        let config = AgentConfigBuilder::new()
            .model("gpt-4o")
            .timeout(Duration::from_secs(5))
            .parallel_tool_calls(true)
            .temperature(0.2)
            .build();

        assert_eq!(config.model, "gpt-4o");
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert!(config.parallel_tool_calls);
        assert_eq!(config.temperature, Some(0.2));
    }

    #[test]
    fn test_serde_timeout_in_seconds() {
        let config: AgentConfig =
            serde_json::from_str(r#"{"model": "m", "timeout": 1.5}"#).unwrap();
        assert_eq!(config.timeout, Duration::from_millis(1500));
        assert_eq!(config.system_prompt, "You are a helpful assistant.");

        let json = serde_json::to_value(AgentConfig::default()).unwrap();
        assert_eq!(json["timeout"], 120.0);
    }
}
