//! Process configuration read from the environment.
//!
//! Every value has a default; unparseable values log a warning and fall back
//! to the default instead of aborting startup.

use std::fmt;
use std::str::FromStr;

use crate::use_cases::scene::ExtractionStrategy;

/// Which chat-completions dialect the provider speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LlmProvider {
    /// OpenAI-compatible (`/v1/chat/completions`), including Ollama
    #[default]
    OpenAi,
    Azure,
}

impl FromStr for LlmProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" | "ollama" => Ok(Self::OpenAi),
            "azure" => Ok(Self::Azure),
            other => Err(format!("unknown LLM provider '{other}'")),
        }
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub azure_api_version: String,
    pub timeout_secs: u64,
}

// Keep the API key out of logs.
impl fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmConfig")
            .field("provider", &self.provider)
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("azure_api_version", &self.azure_api_version)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SceneSettings {
    pub extraction: ExtractionStrategy,
    pub strict_validation: bool,
    pub lock_per_world: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub server_host: String,
    pub server_port: u16,
    pub worlds_db: String,
    pub llm: LlmConfig,
    pub scene: SceneSettings,
    /// Comma-separated origins, `*`, or `None` for permissive CORS.
    pub cors_allowed_origins: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let server_port_raw = get("SERVER_PORT").or_else(|| get("PORT"));

        Self {
            server_host: get("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            server_port: parse_or_default("SERVER_PORT", server_port_raw, 5000),
            worlds_db: get("WORLDS_DB").unwrap_or_else(|| "game_worlds.db".into()),
            llm: LlmConfig {
                provider: parse_or_default("LLM_PROVIDER", get("LLM_PROVIDER"), LlmProvider::OpenAi),
                base_url: get("LLM_BASE_URL").unwrap_or_else(|| "http://localhost:11434".into()),
                api_key: get("LLM_API_KEY"),
                model: get("LLM_MODEL").unwrap_or_else(|| "llama3.2".into()),
                azure_api_version: get("AZURE_OPENAI_API_VERSION")
                    .unwrap_or_else(|| "2025-01-01-preview".into()),
                timeout_secs: parse_or_default("LLM_TIMEOUT_SECS", get("LLM_TIMEOUT_SECS"), 120),
            },
            scene: SceneSettings {
                extraction: parse_or_default(
                    "SCENE_EXTRACTION",
                    get("SCENE_EXTRACTION"),
                    ExtractionStrategy::Balanced,
                ),
                strict_validation: parse_flag(
                    "SCENE_STRICT_VALIDATION",
                    get("SCENE_STRICT_VALIDATION"),
                    false,
                ),
                lock_per_world: parse_flag("SCENE_LOCK_PER_WORLD", get("SCENE_LOCK_PER_WORLD"), true),
            },
            cors_allowed_origins: get("CORS_ALLOWED_ORIGINS"),
        }
    }
}

fn parse_or_default<T>(key: &str, raw: Option<String>, default: T) -> T
where
    T: FromStr + fmt::Debug,
    T::Err: fmt::Display,
{
    let Some(raw) = raw else {
        return default;
    };
    match raw.parse() {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(key, value = %raw, error = %e, default = ?default, "Invalid config value, using default");
            default
        }
    }
}

fn parse_flag(key: &str, raw: Option<String>, default: bool) -> bool {
    let Some(raw) = raw else {
        return default;
    };
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => {
            tracing::warn!(key, value = %raw, default, "Invalid boolean config value, using default");
            default
        }
    }
}
