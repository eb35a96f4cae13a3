//! Lightweight configuration loader and path helpers.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `APP_*` env vars
//! (`__` separates nested keys, e.g. `APP_RAG__TOP_K=8`). Typed accessors for
//! the `[rag]` and `[embed]` sections fall back to defaults when the section
//! is absent. Provides a helper to expand `~` and `${VAR}` in
//! user-supplied paths.

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::chunker::ChunkingConfig;
use crate::types::ChunkScope;

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::new().merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment };
        config.validate()?;
        Ok(config)
    }

    /// Load a single explicit TOML file, still overridable by `APP_*` vars.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            anyhow::bail!("Config file not found: {}", path.display());
        }
        let figment = Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed("APP_").split("__"));
        let config = Self { figment };
        config.validate()?;
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

    pub fn rag_settings(&self) -> anyhow::Result<RagSettings> {
        self.section("rag")
    }

    pub fn embed_settings(&self) -> anyhow::Result<EmbedSettings> {
        self.section("embed")
    }

    fn section<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned + Default,
    {
        if self.figment.contains(key) { self.get(key) } else { Ok(T::default()) }
    }

    fn validate(&self) -> anyhow::Result<()> {
        let rag = self.rag_settings()?;
        rag.chunking()?;
        if rag.top_k == 0 {
            anyhow::bail!("rag.top_k must be at least 1");
        }
        let embed = self.embed_settings()?;
        if embed.max_len == 0 {
            anyhow::bail!("embed.max_len must be at least 1");
        }
        Ok(())
    }
}

/// `[rag]` section: chunking and retrieval parameters for the document pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RagSettings {
    pub max_tokens: usize,
    pub overlap: usize,
    pub top_k: usize,
    pub scope: ChunkScope,
}

impl Default for RagSettings {
    fn default() -> Self {
        let docs = ChunkingConfig::documents();
        Self { max_tokens: docs.max_tokens(), overlap: docs.overlap(), top_k: 6, scope: ChunkScope::default() }
    }
}

impl RagSettings {
    pub fn chunking(&self) -> crate::error::Result<ChunkingConfig> {
        ChunkingConfig::new(self.max_tokens, self.overlap)
    }
}

/// `[embed]` section: where the sentence-embedding model lives and how it runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbedSettings {
    pub model_dir: Option<String>,
    pub max_len: usize,
    pub use_fake: bool,
    pub fake_dim: usize,
}

impl Default for EmbedSettings {
    fn default() -> Self {
        Self { model_dir: None, max_len: 256, use_fake: false, fake_dim: 384 }
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    // Expand env vars first
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    // Expand ~ at start
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}
