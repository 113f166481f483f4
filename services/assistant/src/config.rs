use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use modelops::{ModelConfig, DEFAULT_MAX_TOKENS, DEFAULT_TOP_K};

pub const DEFAULT_MODEL_PATH: &str = "/data/local/tmp/llm/car_manual_model.task";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub model_path: PathBuf,
    pub model: ModelConfig,
    pub engine_url: String,
    pub bind_addr: String,
    pub load_on_start: bool,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let model_path = var("MODEL_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_MODEL_PATH));

        let max_tokens = number(&var, "MODEL_MAX_TOKENS", DEFAULT_MAX_TOKENS)?;
        let top_k = number(&var, "MODEL_TOP_K", DEFAULT_TOP_K)?;

        let engine_url = var("ENGINE_URL").unwrap_or_else(|| "http://127.0.0.1:1234".to_string());
        let bind_addr = var("ASSISTANT_BIND_ADDR").unwrap_or_else(|| "127.0.0.1:8080".to_string());
        let load_on_start = var("LOAD_ON_START")
            .map(|v| matches!(v.as_str(), "1" | "true" | "TRUE" | "yes" | "YES"))
            .unwrap_or(true);

        // Tiny sanity checks (fail fast, fail loud)
        if max_tokens == 0 {
            bail!("MODEL_MAX_TOKENS must be greater than zero");
        }
        if top_k == 0 {
            bail!("MODEL_TOP_K must be greater than zero");
        }
        if !engine_url.starts_with("http://") && !engine_url.starts_with("https://") {
            bail!("ENGINE_URL must start with http:// or https://");
        }

        Ok(Self {
            model_path,
            model: ModelConfig { max_tokens, top_k },
            engine_url,
            bind_addr,
            load_on_start,
        })
    }
}

fn number(var: &impl Fn(&str) -> Option<String>, key: &str, default: u32) -> Result<u32> {
    match var(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} must be a non-negative integer, got {raw:?}")),
        None => Ok(default),
    }
}
