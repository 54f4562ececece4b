//! Faceted catalog search for TurboCommerce storefronts.
//!
//! This crate drives a category listing page against a remote search backend:
//!
//! - **Request**: Translate filter, sort and paging state into backend search requests
//! - **Facets**: Derive the filterable options a category offers from aggregations
//! - **List**: Keep the visible products in step with paging and query changes
//! - **Enrich**: Fetch variants the search response left out
//! - **URL state**: Mirror filter and sort into the page URL and back
//!
//! Backends are reached through the traits in [`api`]; the crate ships no
//! HTTP client of its own.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use turbo_search::prelude::*;
//!
//! let config = SearchConfig::default();
//! let facets = CatalogFacetLoader::new(search.clone(), customizations, &config);
//! facets.load_catalog_data(Some(&category)).await;
//!
//! let filter = Arc::new(FilterState::new(Filter::new(facets.facets().default_price_range())));
//! let sort = Arc::new(SortState::default());
//! let url = UrlStateSync::new(Arc::new(MemoryUrl::default()), filter.clone(), sort.clone(), facets.subscribe());
//! url.restore_from_url();
//!
//! let list = ProductList::new(search, variants, &config, query, initial_response);
//! list.apply_query(filter.current(), sort.current(), Some(category)).await?;
//! ```

pub mod error;
pub mod ids;

pub mod api;
pub mod catalog;
pub mod config;
pub mod enrich;
pub mod facets;
pub mod filter;
pub mod guard;
pub mod list;
pub mod paging;
pub mod request;
pub mod sort;
pub mod url_state;

#[cfg(test)]
mod testing;

pub use error::{Result, SearchError};
pub use ids::*;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::error::{Result, SearchError};
    pub use crate::ids::*;

    // Backends
    pub use crate::api::{
        AggregationData, Customization, CustomizationsApi, PagingMetadata, SearchApi,
        SearchResponse, VariantsApi,
    };
    pub use crate::catalog::{Product, Variant};
    pub use crate::config::SearchConfig;

    // State
    pub use crate::filter::{Filter, FilterState, PriceRange};
    pub use crate::paging::{PaginationController, PagingState};
    pub use crate::sort::{SortSpec, SortState};

    // Components
    pub use crate::enrich::VariantEnricher;
    pub use crate::facets::{CatalogFacetLoader, CatalogFacets, CatalogState, PriceFacet, ProductOption};
    pub use crate::list::{ListQuery, ListState, ProductList};
    pub use crate::request::{build_aggregation_request, build_search_options, SearchRequest, SearchRequestBuilder};
    pub use crate::url_state::{MemoryUrl, UrlParams, UrlStateSync, UrlStore};
}
