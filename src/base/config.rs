//! Load configuration via `config` crate with env-override support.

use std::{
    ops::Deref,
    path::{Path, PathBuf},
    sync::Arc,
};

use config::builder::{ConfigBuilder, DefaultState};
use serde::Deserialize;

use super::types::Res;

/// File name of the specialty mapping inside the model directory.
pub const SPECIALTY_MAP_FILE_NAME: &str = "disease_to_specialty.json";

/// Default bind address.
fn default_host() -> String {
    "0.0.0.0".to_string()
}

/// Default bind port.
fn default_port() -> u16 {
    5002
}

/// Default pretrained model directory.
fn default_model_dir() -> PathBuf {
    PathBuf::from("models/clinical_bert_disease_model")
}

/// Bind to CUDA when it is available.
fn default_use_gpu() -> bool {
    true
}

/// Default size of the inference worker pool.
fn default_max_concurrent_inferences() -> usize {
    4
}

/// Default upper bound on the requested number of results.
fn default_max_top_k() -> usize {
    50
}

/// Configuration for the symptom predictor.
#[derive(Debug, Clone)]
pub struct Config {
    pub inner: Arc<ConfigInner>,
}

impl Deref for Config {
    type Target = ConfigInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ConfigInner {
    /// Address to bind the HTTP server to (`SYMPTOM_PREDICTOR_HOST`).
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to bind the HTTP server to (`SYMPTOM_PREDICTOR_PORT`).
    #[serde(default = "default_port")]
    pub port: u16,
    /// Directory holding `config.json`, `tokenizer.json` and `model.safetensors` (`SYMPTOM_PREDICTOR_MODEL_DIR`).
    #[serde(default = "default_model_dir")]
    pub model_dir: PathBuf,
    /// Disease to specialty JSON mapping (`SYMPTOM_PREDICTOR_SPECIALTY_MAP_PATH`).
    /// Defaults to `disease_to_specialty.json` inside the model directory.
    #[serde(default)]
    pub specialty_map_path: Option<PathBuf>,
    /// Whether to bind the model to CUDA when available (`SYMPTOM_PREDICTOR_USE_GPU`).
    #[serde(default = "default_use_gpu")]
    pub use_gpu: bool,
    /// Number of classifications allowed to run at once (`SYMPTOM_PREDICTOR_MAX_CONCURRENT_INFERENCES`).
    #[serde(default = "default_max_concurrent_inferences")]
    pub max_concurrent_inferences: usize,
    /// Hard cap on `top_k` (`SYMPTOM_PREDICTOR_MAX_TOP_K`).
    #[serde(default = "default_max_top_k")]
    pub max_top_k: usize,
}

impl ConfigInner {
    /// Resolved path of the specialty mapping file.
    pub fn specialty_map_path(&self) -> PathBuf {
        self.specialty_map_path.clone().unwrap_or_else(|| self.model_dir.join(SPECIALTY_MAP_FILE_NAME))
    }

    /// The `host:port` pair the server binds to.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Values given on the command line; these win over the environment and the file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub model_dir: Option<PathBuf>,
    pub port: Option<u16>,
}

impl Config {
    pub fn load(explicit_path: Option<&Path>, overrides: &ConfigOverrides) -> Res<Self> {
        let mut cfg = config::Config::builder().add_source(config::Environment::default().prefix("SYMPTOM_PREDICTOR").try_parsing(true));

        if let Some(p) = explicit_path {
            cfg = cfg.add_source(config::File::from(p.to_path_buf()));
        } else if Path::new(".hidden/config.toml").exists() {
            cfg = cfg.add_source(config::File::with_name(".hidden/config.toml"));
        }

        Self::from_builder(cfg, overrides)
    }

    /// Apply `overrides`, build, deserialize, and validate.
    fn from_builder(mut cfg: ConfigBuilder<DefaultState>, overrides: &ConfigOverrides) -> Res<Self> {
        if let Some(model_dir) = &overrides.model_dir {
            cfg = cfg.set_override("model_dir", model_dir.to_string_lossy().into_owned())?;
        }

        if let Some(port) = overrides.port {
            cfg = cfg.set_override("port", i64::from(port))?;
        }

        let result = Config {
            inner: Arc::new(cfg.build()?.try_deserialize()?),
        };

        result.validate()?;

        Ok(result)
    }

    /// Check the values that `serde` cannot.
    pub fn validate(&self) -> Res<()> {
        if self.max_concurrent_inferences == 0 {
            return Err(anyhow::anyhow!("Max concurrent inferences must be at least 1."));
        }

        if self.max_top_k == 0 {
            return Err(anyhow::anyhow!("Max top k must be at least 1."));
        }

        Ok(())
    }
}

// Tests.
