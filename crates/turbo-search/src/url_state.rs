//! Mirrors filter and sort selections into the page URL and back.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, warn};
use url::form_urlencoded;

use crate::error::{Result, SearchError};
use crate::facets::{CatalogFacets, CatalogState, ProductOption};
use crate::filter::{Filter, FilterState, PriceRange};
use crate::sort::{SortSpec, SortState};

/// Query parameter names.
pub mod params {
    pub const MIN_PRICE: &str = "minPrice";
    pub const MAX_PRICE: &str = "maxPrice";
    pub const SORT: &str = "sort";
    pub const AVAILABILITY: &str = "availability";
}

/// Value of one query parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    Single(String),
    Multi(Vec<String>),
}

impl ParamValue {
    pub fn first(&self) -> Option<&str> {
        match self {
            ParamValue::Single(v) => Some(v),
            ParamValue::Multi(vs) => vs.first().map(String::as_str),
        }
    }

    pub fn values(&self) -> Vec<&str> {
        match self {
            ParamValue::Single(v) => vec![v.as_str()],
            ParamValue::Multi(vs) => vs.iter().map(String::as_str).collect(),
        }
    }
}

/// Decoded query string. Repeated keys become multi-valued.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UrlParams {
    params: BTreeMap<String, ParamValue>,
}

impl UrlParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a query string, with or without the leading `?`.
    pub fn parse(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        let mut out = Self::new();
        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            out.append(key.into_owned(), value.into_owned());
        }
        out
    }

    /// Encode as a query string without the leading `?`.
    pub fn to_query_string(&self) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (key, value) in &self.params {
            for v in value.values() {
                serializer.append_pair(key, v);
            }
        }
        serializer.finish()
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.params.get(key)
    }

    pub fn get_first(&self, key: &str) -> Option<&str> {
        self.params.get(key).and_then(ParamValue::first)
    }

    pub fn get_all(&self, key: &str) -> Vec<&str> {
        self.params.get(key).map(ParamValue::values).unwrap_or_default()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.params.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.params.keys().map(String::as_str)
    }

    /// Set a single value, replacing any previous ones.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.params.insert(key.into(), ParamValue::Single(value.into()));
    }

    /// Set all values of a key. An empty list removes the key.
    pub fn set_all(&mut self, key: impl Into<String>, mut values: Vec<String>) {
        let key = key.into();
        match values.len() {
            0 => {
                self.params.remove(&key);
            }
            1 => {
                let value = values.remove(0);
                self.params.insert(key, ParamValue::Single(value));
            }
            _ => {
                self.params.insert(key, ParamValue::Multi(values));
            }
        }
    }

    /// Add a value, turning the key multi-valued if it already has one.
    pub fn append(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let value = value.into();
        match self.params.entry(key.into()) {
            Entry::Vacant(slot) => {
                slot.insert(ParamValue::Single(value));
            }
            Entry::Occupied(mut slot) => {
                let current = slot.get_mut();
                match current {
                    ParamValue::Single(prev) => {
                        let prev = std::mem::take(prev);
                        *current = ParamValue::Multi(vec![prev, value]);
                    }
                    ParamValue::Multi(values) => values.push(value),
                }
            }
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<ParamValue> {
        self.params.remove(key)
    }
}

impl fmt::Display for UrlParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_query_string())
    }
}

impl FromStr for UrlParams {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self> {
        Ok(Self::parse(s))
    }
}

/// Where the current URL lives: a browser history shim, a router, or
/// [`MemoryUrl`].
pub trait UrlStore: Send + Sync {
    fn url_params(&self) -> UrlParams;
    fn update_url(&self, params: UrlParams) -> Result<()>;
}

/// In-process URL holding a query string.
#[derive(Debug)]
pub struct MemoryUrl {
    query: watch::Sender<String>,
}

impl MemoryUrl {
    pub fn new(query: impl Into<String>) -> Self {
        let (query, _) = watch::channel(query.into());
        Self { query }
    }

    /// The current query string.
    pub fn query_string(&self) -> String {
        self.query.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<String> {
        self.query.subscribe()
    }
}

impl Default for MemoryUrl {
    fn default() -> Self {
        Self::new(String::new())
    }
}

impl UrlStore for MemoryUrl {
    fn url_params(&self) -> UrlParams {
        UrlParams::parse(&self.query.borrow())
    }

    fn update_url(&self, params: UrlParams) -> Result<()> {
        self.query.send_replace(params.to_query_string());
        Ok(())
    }
}

/// Keeps the URL in step with the filter and sort of a catalog view.
pub struct UrlStateSync<U> {
    url: Arc<U>,
    filter: Arc<FilterState>,
    sort: Arc<SortState>,
    catalog: watch::Receiver<CatalogState>,
    /// Option keys last written or restored, stripped on the next write even
    /// after the facets they belong to are gone.
    option_keys: watch::Sender<BTreeSet<String>>,
}

impl<U: UrlStore> UrlStateSync<U> {
    pub fn new(
        url: Arc<U>,
        filter: Arc<FilterState>,
        sort: Arc<SortState>,
        catalog: watch::Receiver<CatalogState>,
    ) -> Self {
        let (option_keys, _) = watch::channel(BTreeSet::new());
        Self {
            url,
            filter,
            sort,
            catalog,
            option_keys,
        }
    }

    fn facets(&self) -> CatalogFacets {
        self.catalog.borrow().facets.clone()
    }

    /// Commit a filter and write it into the URL.
    ///
    /// Prices equal to the catalog bounds are left out. Unrelated params and
    /// the sort survive.
    pub fn apply_filters(&self, filter: Filter) {
        let facets = self.facets();
        let mut params = self.url.url_params();
        self.strip_filter_params(&mut params, &facets);
        let written = write_filter_params(&mut params, &filter, &facets);
        self.option_keys.send_replace(written);

        let sort = self.sort.current();
        if !sort.is_default() {
            params.set(params::SORT, sort.as_param());
        }

        self.filter.replace(filter);
        self.write(params);
    }

    /// Reset the filter to the catalog defaults and strip it from the URL.
    pub fn clear_filters(&self) {
        let facets = self.facets();
        self.filter.reset(facets.default_price_range());

        let mut params = self.url.url_params();
        self.strip_filter_params(&mut params, &facets);
        self.option_keys.send_replace(BTreeSet::new());
        self.write(params);
    }

    /// Commit a sort and write it into the URL. The default sort is not
    /// written.
    pub fn set_sort_by(&self, sort: SortSpec) {
        self.sort.set(sort);

        let mut params = self.url.url_params();
        if sort.is_default() {
            params.remove(params::SORT);
        } else {
            params.set(params::SORT, sort.as_param());
        }
        self.write(params);
    }

    /// Rebuild filter and sort from the URL and commit them.
    /// Returns whether either changed.
    pub fn restore_from_url(&self) -> bool {
        let params = self.url.url_params();
        let facets = self.facets();
        let filter = filter_from_params(&params, &facets);
        let sort = sort_from_params(&params);

        let restored = facets
            .product_options
            .iter()
            .map(option_param)
            .filter(|key| params.contains_key(key))
            .map(str::to_string)
            .collect();
        self.option_keys.send_replace(restored);

        let filter_changed = self.filter.replace(filter);
        let sort_changed = self.sort.set(sort);
        filter_changed || sort_changed
    }

    fn strip_filter_params(&self, params: &mut UrlParams, facets: &CatalogFacets) {
        params.remove(params::MIN_PRICE);
        params.remove(params::MAX_PRICE);
        params.remove(params::AVAILABILITY);
        for option in &facets.product_options {
            params.remove(option_param(option));
        }
        for key in self.option_keys.borrow().iter() {
            params.remove(key);
        }
    }

    fn write(&self, params: UrlParams) {
        if let Err(e) = self.url.update_url(params) {
            warn!(error = %e, "failed to update URL");
        }
    }
}

fn option_param(option: &ProductOption) -> &str {
    if option.is_inventory() {
        params::AVAILABILITY
    } else {
        &option.name
    }
}

/// Write the filter into `params`, returning the option keys written.
fn write_filter_params(params: &mut UrlParams, filter: &Filter, facets: &CatalogFacets) -> BTreeSet<String> {
    let bounds = facets.default_price_range();
    let range = filter.price_range;
    if range.min != bounds.min {
        params.set(params::MIN_PRICE, range.min.to_string());
    }
    if range.max != bounds.max {
        if let Some(max) = range.max {
            params.set(params::MAX_PRICE, max.to_string());
        }
    }

    let mut written = BTreeSet::new();
    for (option_id, choices) in &filter.selected_options {
        let Some(option) = facets.option(option_id) else {
            debug!(option = %option_id, "selected option is not a facet, not written to URL");
            continue;
        };
        let names: Vec<String> = choices
            .iter()
            .filter_map(|id| option.choice(id))
            .map(|choice| choice.name.clone())
            .collect();
        if !names.is_empty() {
            written.insert(option_param(option).to_string());
        }
        params.set_all(option_param(option), names);
    }
    written
}

fn parse_price(params: &UrlParams, key: &str) -> Option<f64> {
    let raw = params.get_first(key)?;
    match raw.trim().parse::<f64>() {
        Ok(value) if value.is_finite() => Some(value),
        _ => {
            warn!(param = key, value = raw, "ignoring unparseable price");
            None
        }
    }
}

/// The filter a set of URL params describes.
///
/// Missing or unparseable prices fall back to the catalog bounds. Choice
/// names are matched against the facets ignoring case; unknown ones are
/// dropped.
pub fn filter_from_params(params: &UrlParams, facets: &CatalogFacets) -> Filter {
    let bounds = facets.default_price_range();
    let mut filter = Filter::new(PriceRange {
        min: parse_price(params, params::MIN_PRICE).unwrap_or(bounds.min),
        max: parse_price(params, params::MAX_PRICE).or(bounds.max),
    });

    for option in &facets.product_options {
        for name in params.get_all(option_param(option)) {
            match option.choice_named(name) {
                Some(choice) => filter.select(option.id.clone(), choice.id.clone()),
                None => debug!(option = %option.name, choice = name, "unknown choice in URL"),
            }
        }
    }
    filter
}

/// The sort a set of URL params describes, the default when absent or
/// unknown.
pub fn sort_from_params(params: &UrlParams) -> SortSpec {
    params
        .get_first(params::SORT)
        .and_then(SortSpec::from_param)
        .unwrap_or_default()
}
