use std::path::Path;

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};

use crate::storage::{BackendLocal, StorageManager};

const CONFIG_FILE_NAME: &str = "config.yaml";

/// Default embedding model (384-dimensional sentence encoder)
const DEFAULT_MODEL: &str = "all-MiniLM-L6-v2";
/// Default number of results per query
const DEFAULT_TOP_K: usize = 5;
/// Default preview length in characters
const DEFAULT_PREVIEW_CHARS: usize = 500;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Model name for embeddings (e.g., "all-MiniLM-L6-v2")
    #[serde(default = "default_model")]
    pub model: String,

    /// Maximum number of documents returned per query
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Number of characters shown in each result preview
    #[serde(default = "default_preview_chars")]
    pub preview_chars: usize,

    /// Show download progress when the model is fetched for the first time
    #[serde(default = "default_show_download_progress")]
    pub show_download_progress: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: default_model(),
            top_k: default_top_k(),
            preview_chars: default_preview_chars(),
            show_download_progress: default_show_download_progress(),
        }
    }
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}

fn default_preview_chars() -> usize {
    DEFAULT_PREVIEW_CHARS
}

fn default_show_download_progress() -> bool {
    true
}

impl Config {
    fn validate(&self) -> anyhow::Result<()> {
        if self.model.trim().is_empty() {
            bail!("model must not be empty");
        }

        if self.top_k == 0 {
            bail!("top_k must be greater than 0");
        }

        if self.preview_chars == 0 {
            bail!("preview_chars must be greater than 0");
        }

        Ok(())
    }

    /// Load `config.yaml` from `base_path`, creating it with defaults when missing.
    pub fn load_with(base_path: &Path) -> anyhow::Result<Self> {
        let store = BackendLocal::new(base_path)
            .with_context(|| format!("failed to create {}", base_path.display()))?;

        // create new if does not exist
        if !store.exists(CONFIG_FILE_NAME) {
            store.write(
                CONFIG_FILE_NAME,
                serde_yml::to_string(&Self::default())?.as_bytes(),
            )?;
        }

        let config_str = String::from_utf8(store.read(CONFIG_FILE_NAME)?)
            .context("config file is not valid utf8")?;
        let config: Self = serde_yml::from_str(&config_str).context("config is malformed")?;

        config.validate()?;

        // resave in case config version needs an upgrade
        let normalized = serde_yml::to_string(&config)?;
        if config_str != normalized {
            store.write(CONFIG_FILE_NAME, normalized.as_bytes())?;
        }

        Ok(config)
    }
}
