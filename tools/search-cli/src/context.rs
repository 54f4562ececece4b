//! CLI execution context.

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use tracing::{debug, warn};
use turbo_search::config::SearchConfig;
use turbo_search::request::SearchRequestBuilder;

use crate::output::Output;

/// Execution context for CLI commands.
pub struct Context {
    /// Search configuration.
    pub config: SearchConfig,
    /// Output handler.
    pub output: Output,
}

impl Context {
    /// Load context from config file.
    pub fn load(config_path: Option<&str>, output: Output) -> Result<Self> {
        let config = match config_path {
            Some(path) => SearchConfig::load(path)
                .with_context(|| format!("Failed to load config file: {}", path))?,
            None => {
                let cwd = std::env::current_dir().context("Failed to get current directory")?;
                Self::find_config(&cwd, &output).unwrap_or_default()
            }
        };
        debug!(
            page_size = config.default_page_size,
            price_ceiling = ?config.price_ceiling(),
            "search config resolved"
        );

        Ok(Self { config, output })
    }

    /// Find config file in directory tree.
    fn find_config(start: &Path, output: &Output) -> Option<SearchConfig> {
        let config_names = ["tsearch.toml", ".tsearch.toml", "tsearch.json"];

        let mut current = PathBuf::from(start);
        loop {
            for name in &config_names {
                let config_path = current.join(name);
                if config_path.exists() {
                    match SearchConfig::load(&config_path) {
                        Ok(config) => {
                            debug!(path = %config_path.display(), "config file found");
                            output.debug(&format!("Using config {}", config_path.display()));
                            return Some(config);
                        }
                        Err(e) => {
                            warn!(path = %config_path.display(), error = %e, "unreadable config file");
                            output.warn(&format!("Ignoring {}: {}", config_path.display(), e));
                        }
                    }
                }
            }

            if !current.pop() {
                break;
            }
        }

        None
    }

    /// Request builder honoring the configured price ceiling.
    pub fn builder(&self) -> SearchRequestBuilder {
        SearchRequestBuilder::new().with_price_ceiling(self.config.price_ceiling())
    }
}

/// Read and parse a JSON fixture file.
pub fn read_json<T: serde::de::DeserializeOwned>(path: &str) -> Result<T> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read file: {}", path))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse JSON: {}", path))
}
