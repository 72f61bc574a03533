//! Configuration loader and path helpers.
//!
//! Uses Figment to merge built-in defaults + `config.toml` + `config.<env>.toml`
//! + `APP_*` env vars (`__` separates nested keys, e.g. `APP_CHAT__LLM`).

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatSettings {
    pub api_base_url: String,
    pub llm: String,
    /// Name of the retrieval step whose output carries the sources.
    pub source_step: String,
    pub timeout_ms: u64,
    /// Buffered events per subscriber before slow receivers start lagging.
    pub event_capacity: usize,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000".to_string(),
            llm: "qwen3".to_string(),
            source_step: "FindDocs".to_string(),
            timeout_ms: 60_000,
            event_capacity: 256,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CitationSettings {
    /// Number written in the first source's marker: 1 for `[^1]`, 0 for `[^0]`.
    pub index_base: u8,
}

impl Default for CitationSettings {
    fn default() -> Self {
        Self { index_base: 1 }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub chat: ChatSettings,
    pub citations: CitationSettings,
}

impl Settings {
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.chat.source_step.trim().is_empty() {
            return Err(Error::InvalidConfig("chat.source_step must not be empty".into()));
        }
        if self.chat.event_capacity == 0 {
            return Err(Error::InvalidConfig("chat.event_capacity must be positive".into()));
        }
        if self.citations.index_base > 1 {
            return Err(Error::InvalidConfig(format!(
                "citations.index_base must be 0 or 1, got {}",
                self.citations.index_base
            )));
        }
        Ok(())
    }
}

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        Self::load_in(Path::new("."))
    }

    /// Load `config.toml` and the env-specific overlay from `base`.
    pub fn load_in(base: &Path) -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());
        Self::load_for_env(base, &env_name)
    }

    pub fn load_for_env(base: &Path, env_name: &str) -> anyhow::Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(base.join("config.toml")));
        match env_name {
            "dev" | "development" => figment = figment.merge(Toml::file(base.join("config.dev.toml"))),
            "prod" | "production" => figment = figment.merge(Toml::file(base.join("config.prod.toml"))),
            "test" | "testing" => figment = figment.merge(Toml::file(base.join("config.test.toml"))),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment };
        config.validate_for_env(env_name)?;
        Ok(config)
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    pub fn settings(&self) -> anyhow::Result<Settings> {
        let settings: Settings = self
            .figment
            .extract()
            .map_err(|e| anyhow::anyhow!("Failed to read settings: {}", e))?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate_for_env(&self, env: &str) -> anyhow::Result<()> {
        let settings = self.settings()?;
        match env {
            "prod" | "production" if settings.chat.api_base_url.starts_with("http://localhost") => {
                Err(Error::InvalidConfig("chat.api_base_url points at localhost in production".into()).into())
            }
            _ => Ok(()),
        }
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}
