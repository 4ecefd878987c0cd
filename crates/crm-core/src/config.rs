//! Configuration management
//!
//! Settings are resolved in this order:
//! 1. environment variables
//! 2. the `crm-gateway.toml` settings file
//! 3. defaults
//!
//! `${VAR_NAME}` inside the settings file is replaced with the value of the
//! environment variable before parsing.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::Error;

/// Default settings file looked up in the working directory
pub const CONFIG_FILE: &str = "crm-gateway.toml";

/// System prompt sent ahead of every conversation
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are an intelligent conversational assistant specialized in \
e-commerce operations, CRM workflows, and customer lifecycle management. Your role is to help users \
manage products, contacts, deals, subscriptions, and operational tasks commonly found in e-commerce and \
SaaS-enabled e-commerce businesses. You can answer questions, guide on best practices, retrieve data \
through available tools, or perform actions by calling tools whenever needed. You should always decide \
autonomously when a tool call is required. Responses must be clear, helpful, and practical, and any \
JSON must be formatted into user-friendly responses.";

/// HubSpot (CRM) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HubSpotConfig {
    /// Private app access token, sent as a bearer token
    #[serde(default)]
    pub access_token: String,

    /// API root
    #[serde(default = "default_hubspot_base_url")]
    pub base_url: String,
}

impl Default for HubSpotConfig {
    fn default() -> Self {
        Self {
            access_token: String::new(),
            base_url: default_hubspot_base_url(),
        }
    }
}

/// LLM configuration (OpenAI-compatible chat completions)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// API key
    #[serde(default)]
    pub api_key: String,

    /// Model to use
    #[serde(default = "default_model")]
    pub model: String,

    /// Base URL (optional, for custom endpoints)
    pub base_url: Option<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: default_model(),
            base_url: None,
        }
    }
}

/// HTTP API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Bind address
    #[serde(default = "default_api_host")]
    pub host: String,

    /// Port for HTTP API server
    #[serde(default = "default_api_port")]
    pub port: u16,

    /// Allowed CORS origins. `None` allows any origin.
    #[serde(default)]
    pub allowed_origins: Option<Vec<String>>,

    /// Directory served for paths no route matches
    #[serde(default)]
    pub static_dir: Option<String>,

    /// Seconds in-flight requests get to finish after a shutdown signal
    #[serde(default = "default_shutdown_grace_secs")]
    pub shutdown_grace_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_api_host(),
            port: default_api_port(),
            allowed_origins: None,
            static_dir: None,
            shutdown_grace_secs: default_shutdown_grace_secs(),
        }
    }
}

/// Chat assistant configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantConfig {
    /// System prompt prepended to every conversation
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// Base URL the tools use to reach this server's own gateway routes.
    /// Defaults to `http://127.0.0.1:<api.port>`.
    #[serde(default)]
    pub gateway_url: Option<String>,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            system_prompt: default_system_prompt(),
            gateway_url: None,
        }
    }
}

/// Main configuration for crm-gateway
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// CRM configuration
    #[serde(default)]
    pub hubspot: HubSpotConfig,

    /// LLM configuration
    #[serde(default)]
    pub llm: LlmConfig,

    /// HTTP API configuration
    #[serde(default)]
    pub api: ApiConfig,

    /// Chat assistant configuration
    #[serde(default)]
    pub assistant: AssistantConfig,
}

fn default_hubspot_base_url() -> String {
    "https://api.hubapi.com".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_api_host() -> String {
    "0.0.0.0".to_string()
}

fn default_api_port() -> u16 {
    3001
}

fn default_shutdown_grace_secs() -> u64 {
    10
}

fn default_system_prompt() -> String {
    DEFAULT_SYSTEM_PROMPT.to_string()
}

fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

impl Config {
    /// Replace `${VAR_NAME}` occurrences using `lookup`.
    ///
    /// Unknown variables expand to an empty string.
    fn expand_vars(value: &str, lookup: &impl Fn(&str) -> Option<String>) -> String {
        let mut result = String::new();
        let mut chars = value.chars().peekable();

        while let Some(c) = chars.next() {
            if c == '$' && chars.peek() == Some(&'{') {
                chars.next();

                let mut var_name = String::new();
                for c in chars.by_ref() {
                    if c == '}' {
                        break;
                    }
                    var_name.push(c);
                }

                if let Some(env_value) = lookup(&var_name) {
                    result.push_str(&env_value);
                }
            } else {
                result.push(c);
            }
        }

        result
    }

    /// Load settings from a TOML file, then apply environment overrides.
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let path = path.as_ref();

        let toml_content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config file: {}", e)))?;

        let mut cfg = Self::from_toml_str(&toml_content, &env_lookup)?;
        cfg.apply_overrides(&env_lookup);

        Ok(cfg)
    }

    fn from_toml_str(
        content: &str,
        lookup: &impl Fn(&str) -> Option<String>,
    ) -> crate::Result<Self> {
        let expanded = Self::expand_vars(content, lookup);
        toml::from_str(&expanded).map_err(|e| Error::Config(format!("Failed to parse TOML: {}", e)))
    }

    /// Load settings from `crm-gateway.toml` when present, else from the
    /// environment, and validate the required credentials.
    pub fn load() -> crate::Result<Self> {
        let cfg = if Path::new(CONFIG_FILE).exists() {
            Self::from_toml_file(CONFIG_FILE)?
        } else {
            Self::from_env()
        };

        cfg.validate()?;
        Ok(cfg)
    }

    /// Build settings from defaults plus environment variables
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        cfg.apply_overrides(&env_lookup);
        cfg
    }

    /// Override settings with whatever `lookup` knows about
    fn apply_overrides(&mut self, lookup: &impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(token) = non_empty("HUBSPOT_ACCESS_TOKEN") {
            self.hubspot.access_token = token;
        }
        if let Some(url) = non_empty("HUBSPOT_BASE_URL") {
            self.hubspot.base_url = url;
        }

        if let Some(key) = non_empty("OPENAI_API_KEY").or_else(|| non_empty("LLM_API_KEY")) {
            self.llm.api_key = key;
        }
        if let Some(model) = non_empty("LLM_MODEL") {
            self.llm.model = model;
        }
        if let Some(base_url) = non_empty("LLM_BASE_URL") {
            self.llm.base_url = Some(base_url);
        }

        if let Some(host) = non_empty("API_HOST") {
            self.api.host = host;
        }
        if let Some(port) = non_empty("API_PORT").and_then(|p| p.parse().ok()) {
            self.api.port = port;
        }
        if let Some(origins) = non_empty("API_ALLOWED_ORIGINS") {
            self.api.allowed_origins = Some(
                origins
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
            );
        }
        if let Some(dir) = non_empty("STATIC_DIR") {
            self.api.static_dir = Some(dir);
        }
        if let Some(secs) = non_empty("SHUTDOWN_GRACE_SECS").and_then(|s| s.parse().ok()) {
            self.api.shutdown_grace_secs = secs;
        }

        if let Some(prompt) = non_empty("ASSISTANT_SYSTEM_PROMPT") {
            self.assistant.system_prompt = prompt;
        }
        if let Some(url) = non_empty("GATEWAY_URL") {
            self.assistant.gateway_url = Some(url);
        }
    }

    /// Both credentials must be present before the server may start
    pub fn validate(&self) -> crate::Result<()> {
        let mut missing = Vec::new();
        if self.hubspot.access_token.trim().is_empty() {
            missing.push("HUBSPOT_ACCESS_TOKEN");
        }
        if self.llm.api_key.trim().is_empty() {
            missing.push("OPENAI_API_KEY");
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(Error::Config(format!("{} not set", missing.join(", "))))
        }
    }

    /// Base URL of this server as seen by the tools
    pub fn gateway_url(&self) -> String {
        self.assistant
            .gateway_url
            .clone()
            .unwrap_or_else(|| format!("http://127.0.0.1:{}", self.api.port))
    }

    /// Get the effective LLM configuration
    pub fn llm_config(&self) -> &LlmConfig {
        &self.llm
    }
}
