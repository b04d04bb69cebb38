use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::segment::Strategy;

pub const CONFIG_ENV: &str = "CINEMOOD_CONFIG";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub classifier: ClassifierConfig,
    pub plot_source: PlotSourceConfig,
    pub segmenter: SegmenterConfig,
    pub server: ServerConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Empty endpoint leaves the classifier unavailable.
    pub endpoint: String,
    pub api_token_env: String,
    pub batch_size: usize,
    pub max_parallel_batches: usize,
    pub timeout_secs: u64,
    pub max_scene_tokens: usize,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api-inference.huggingface.co/models/j-hartmann/emotion-english-distilroberta-base"
                .to_string(),
            api_token_env: "HF_API_TOKEN".to_string(),
            batch_size: 16,
            max_parallel_batches: 4,
            timeout_secs: 60,
            max_scene_tokens: 512,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlotSourceConfig {
    pub api_base: String,
    pub user_agent: String,
    pub search_limit: usize,
    pub timeout_secs: u64,
}

impl Default for PlotSourceConfig {
    fn default() -> Self {
        Self {
            api_base: "https://en.wikipedia.org/w/api.php".to_string(),
            user_agent: format!("cinemood/{} (movie emotion analysis)", env!("CARGO_PKG_VERSION")),
            search_limit: 5,
            timeout_secs: 20,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmenterConfig {
    pub strategy: Strategy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8000".to_string(),
            allowed_origins: vec!["http://localhost:3000".to_string()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { dir: PathBuf::from("out") }
    }
}

impl Config {
    /// CLI path > `CINEMOOD_CONFIG` > built-in defaults.
    pub fn load(cli_path: Option<&Path>) -> Result<Self> {
        let path = match cli_path {
            Some(p) => Some(p.to_path_buf()),
            None => std::env::var(CONFIG_ENV).ok().map(PathBuf::from),
        };

        match path {
            Some(path) => {
                debug!("Loading config from: {}", path.display());
                let raw = std::fs::read_to_string(&path)
                    .with_context(|| format!("Reading config {}", path.display()))?;
                Self::from_toml(&raw).with_context(|| format!("Parsing config {}", path.display()))
            }
            None => {
                debug!("No config file given, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }
}

impl ClassifierConfig {
    pub fn api_token(&self) -> Option<String> {
        if self.api_token_env.is_empty() {
            return None;
        }
        std::env::var(&self.api_token_env).ok().filter(|t| !t.trim().is_empty())
    }
}
