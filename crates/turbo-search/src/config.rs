//! Search configuration.
//!
//! Loaded from TOML or JSON, chosen by file extension. Every field has a
//! default so a partial file is valid.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SearchError};

/// Price at or above which an upper bound means "no ceiling".
///
/// Price sliders report this value when the handle sits at the far right, so
/// the request builder drops any upper bound that reaches it. Whether a real
/// product could be priced at or above it is unknown; deployments that sell
/// such items should raise it or set `price_ceiling = 0` in the config file
/// to turn the check off.
pub const UNBOUNDED_PRICE_SENTINEL: f64 = 999_999.0;

/// Top-level search configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Items per page on first load.
    pub default_page_size: u32,
    /// Items added by one "load more".
    pub load_more_step: u32,
    /// Page size used when draining the variants query.
    pub variant_batch_size: u32,
    /// Upper price bounds at or above this are ignored. Zero disables the check.
    pub price_ceiling: f64,
    /// Bucket limits for the facet aggregations.
    pub aggregation: AggregationLimits,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_page_size: 24,
            load_more_step: 24,
            variant_batch_size: 100,
            price_ceiling: UNBOUNDED_PRICE_SENTINEL,
            aggregation: AggregationLimits::default(),
        }
    }
}

impl SearchConfig {
    /// Load config from a file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            SearchError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;

        if path.extension().is_some_and(|ext| ext == "json") {
            Ok(serde_json::from_str(&content)?)
        } else {
            Self::from_toml_str(&content)
        }
    }

    /// Parse config from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// The effective price ceiling, `None` when disabled.
    pub fn price_ceiling(&self) -> Option<f64> {
        (self.price_ceiling > 0.0).then_some(self.price_ceiling)
    }
}

/// Maximum bucket counts for the value aggregations used to build facets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregationLimits {
    pub option_names: u32,
    pub choice_names: u32,
    pub inventory_statuses: u32,
}

impl Default for AggregationLimits {
    fn default() -> Self {
        Self {
            option_names: 20,
            choice_names: 50,
            inventory_statuses: 10,
        }
    }
}
