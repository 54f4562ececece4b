//! Sort selection.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::error::SearchError;

/// Sort options for catalog listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SortSpec {
    /// Sort by name A-Z.
    NameAsc,
    /// Sort by name Z-A.
    NameDesc,
    /// Sort by price, low to high.
    PriceAsc,
    /// Sort by price, high to low.
    PriceDesc,
    /// Merchant ordering within the current category.
    Recommended,
    /// Newest first. Never written to the URL.
    #[default]
    Newest,
}

impl SortSpec {
    pub const ALL: [SortSpec; 6] = [
        SortSpec::NameAsc,
        SortSpec::NameDesc,
        SortSpec::PriceAsc,
        SortSpec::PriceDesc,
        SortSpec::Recommended,
        SortSpec::Newest,
    ];

    /// Token used for the `sort` URL parameter.
    pub fn as_param(&self) -> &'static str {
        match self {
            SortSpec::NameAsc => "name_asc",
            SortSpec::NameDesc => "name_desc",
            SortSpec::PriceAsc => "price_asc",
            SortSpec::PriceDesc => "price_desc",
            SortSpec::Recommended => "recommended",
            SortSpec::Newest => "newest",
        }
    }

    /// Parse a `sort` URL parameter token.
    pub fn from_param(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|spec| spec.as_param() == s)
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            SortSpec::NameAsc => "Name: A-Z",
            SortSpec::NameDesc => "Name: Z-A",
            SortSpec::PriceAsc => "Price: Low to High",
            SortSpec::PriceDesc => "Price: High to Low",
            SortSpec::Recommended => "Recommended",
            SortSpec::Newest => "Newest",
        }
    }

    /// Whether this is the implicit default.
    pub fn is_default(&self) -> bool {
        *self == SortSpec::default()
    }
}

impl FromStr for SortSpec {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_param(s).ok_or_else(|| {
            let known: Vec<_> = Self::ALL.iter().map(SortSpec::as_param).collect();
            SearchError::InvalidQuery(format!("unknown sort '{}', expected one of: {}", s, known.join(", ")))
        })
    }
}

/// State container for the sort of one catalog view.
#[derive(Debug)]
pub struct SortState {
    tx: watch::Sender<SortSpec>,
}

impl SortState {
    pub fn new(initial: SortSpec) -> Self {
        let (tx, _) = watch::channel(initial);
        Self { tx }
    }

    pub fn current(&self) -> SortSpec {
        *self.tx.borrow()
    }

    /// Subscribe to sort changes. The current value counts as seen.
    pub fn subscribe(&self) -> watch::Receiver<SortSpec> {
        self.tx.subscribe()
    }

    /// Change the sort. Returns whether it changed.
    pub fn set(&self, sort: SortSpec) -> bool {
        self.tx.send_if_modified(|current| {
            if *current == sort {
                return false;
            }
            *current = sort;
            true
        })
    }
}

impl Default for SortState {
    fn default() -> Self {
        Self::new(SortSpec::default())
    }
}
