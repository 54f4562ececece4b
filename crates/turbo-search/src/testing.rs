//! In-memory backends for unit tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::api::{
    AggregationData, Customization, CustomizationPage, CustomizationsApi, SearchApi, SearchResponse,
    VariantPage, VariantQuery, VariantsApi,
};
use crate::catalog::Variant;
use crate::error::{Result, SearchError};
use crate::request::SearchRequest;

/// Records every request. Answers with queued responses first, then with
/// the fallback response.
#[derive(Default)]
pub struct FakeSearch {
    requests: Mutex<Vec<SearchRequest>>,
    queued: Mutex<VecDeque<SearchResponse>>,
    fallback: Mutex<SearchResponse>,
    failure: Mutex<Option<String>>,
    gate: Mutex<Option<Arc<Gate>>>,
}

/// Holds one search call open until released.
#[derive(Default)]
pub struct Gate {
    entered: Notify,
    release: Notify,
}

impl Gate {
    /// Wait until the held call has started.
    pub async fn entered(&self) {
        self.entered.notified().await;
    }

    pub fn release(&self) {
        self.release.notify_one();
    }
}

impl FakeSearch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_aggregations(aggregation_data: AggregationData) -> Self {
        let fake = Self::new();
        *fake.fallback.lock().unwrap() = SearchResponse {
            aggregation_data,
            ..Default::default()
        };
        fake
    }

    pub fn push_response(&self, response: SearchResponse) {
        self.queued.lock().unwrap().push_back(response);
    }

    /// Fail every following call.
    pub fn fail_with(&self, message: &str) {
        *self.failure.lock().unwrap() = Some(message.to_string());
    }

    pub fn requests(&self) -> Vec<SearchRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Hold the next call after it picked its response.
    pub fn hold_next_call(&self) -> Arc<Gate> {
        let gate = Arc::new(Gate::default());
        *self.gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    fn respond(&self, request: &SearchRequest) -> Result<SearchResponse> {
        self.requests.lock().unwrap().push(request.clone());
        if let Some(message) = self.failure.lock().unwrap().clone() {
            return Err(SearchError::backend(message));
        }
        let queued = self.queued.lock().unwrap().pop_front();
        Ok(queued.unwrap_or_else(|| self.fallback.lock().unwrap().clone()))
    }
}

#[async_trait]
impl SearchApi for FakeSearch {
    async fn search_products(&self, request: &SearchRequest) -> Result<SearchResponse> {
        let response = self.respond(request);
        let gate = self.gate.lock().unwrap().take();
        if let Some(gate) = gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }
        response
    }
}

/// Serves customizations in pages of `page_size`.
pub struct FakeCustomizations {
    items: Vec<Customization>,
    page_size: usize,
    failure: Option<String>,
    calls: Mutex<usize>,
}

impl FakeCustomizations {
    pub fn new(items: Vec<Customization>) -> Self {
        let page_size = items.len().max(1);
        Self::paged(items, page_size)
    }

    pub fn paged(items: Vec<Customization>, page_size: usize) -> Self {
        Self {
            items,
            page_size: page_size.max(1),
            failure: None,
            calls: Mutex::new(0),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            ..Self::new(Vec::new())
        }
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl CustomizationsApi for FakeCustomizations {
    async fn query_customizations(&self, cursor: Option<&str>) -> Result<CustomizationPage> {
        *self.calls.lock().unwrap() += 1;
        if let Some(message) = &self.failure {
            return Err(SearchError::Http {
                status: 403,
                message: message.clone(),
            });
        }
        let (items, next_cursor) = page(&self.items, cursor, self.page_size);
        Ok(CustomizationPage { items, next_cursor })
    }
}

/// Serves variants of the queried products, honoring limit and cursor.
pub struct FakeVariants {
    variants: Vec<Variant>,
    failure: Option<String>,
    queries: Mutex<Vec<VariantQuery>>,
}

impl FakeVariants {
    pub fn new(variants: Vec<Variant>) -> Self {
        Self {
            variants,
            failure: None,
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            ..Self::new(Vec::new())
        }
    }

    pub fn queries(&self) -> Vec<VariantQuery> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl VariantsApi for FakeVariants {
    async fn query_variants(&self, query: &VariantQuery) -> Result<VariantPage> {
        self.queries.lock().unwrap().push(query.clone());
        if let Some(message) = &self.failure {
            return Err(SearchError::backend(message));
        }
        let matching: Vec<Variant> = self
            .variants
            .iter()
            .filter(|v| query.product_ids.contains(&v.product_id))
            .cloned()
            .collect();
        let (items, next_cursor) = page(&matching, query.cursor.as_deref(), query.limit as usize);
        Ok(VariantPage { items, next_cursor })
    }
}

/// Offset-cursor paging over a slice.
fn page<T: Clone>(all: &[T], cursor: Option<&str>, size: usize) -> (Vec<T>, Option<String>) {
    let start = cursor.and_then(|c| c.parse::<usize>().ok()).unwrap_or(0).min(all.len());
    let end = (start + size.max(1)).min(all.len());
    let next = (end < all.len()).then(|| end.to_string());
    (all[start..end].to_vec(), next)
}
