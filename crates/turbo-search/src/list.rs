//! The product list of one catalog view.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, warn};

use crate::api::{SearchApi, SearchResponse, VariantsApi};
use crate::catalog::Product;
use crate::config::SearchConfig;
use crate::enrich::VariantEnricher;
use crate::error::Result;
use crate::filter::Filter;
use crate::guard::RequestGuard;
use crate::ids::CategoryId;
use crate::paging::{PaginationController, PagingState};
use crate::request::SearchRequestBuilder;
use crate::sort::SortSpec;

/// What the list is currently showing.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ListQuery {
    pub filter: Filter,
    pub sort: SortSpec,
    pub category_id: Option<CategoryId>,
}

/// Observable list contents.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ListState {
    pub products: Vec<Product>,
    pub is_loading: bool,
    pub error: Option<String>,
}

/// Products of a catalog view, kept in step with its query and paging.
///
/// Constructed from the response the page was first rendered with, so the
/// initial state is never fetched again. After that, every paging change
/// seen by [`refresh_if_paging_changed`](Self::refresh_if_paging_changed)
/// costs exactly one search.
pub struct ProductList<S, V> {
    search: Arc<S>,
    enricher: VariantEnricher<V>,
    builder: SearchRequestBuilder,
    paging: PaginationController,
    query: watch::Sender<ListQuery>,
    /// Paging state of the last issued search.
    searched_paging: watch::Sender<PagingState>,
    state: watch::Sender<ListState>,
    guard: RequestGuard,
}

impl<S, V> ProductList<S, V>
where
    S: SearchApi,
    V: VariantsApi,
{
    pub fn new(
        search: Arc<S>,
        variants: Arc<V>,
        config: &SearchConfig,
        query: ListQuery,
        initial: SearchResponse,
    ) -> Self {
        let paging_state = PagingState::first_page(config.default_page_size);
        let (searched_paging, _) = watch::channel(paging_state.clone());
        let (query, _) = watch::channel(query);
        let (state, _) = watch::channel(ListState {
            products: initial.products,
            is_loading: false,
            error: None,
        });

        Self {
            search,
            enricher: VariantEnricher::from_config(variants, config),
            builder: SearchRequestBuilder::new().with_price_ceiling(config.price_ceiling()),
            paging: PaginationController::new(paging_state, initial.paging_metadata),
            query,
            searched_paging,
            state,
            guard: RequestGuard::new(),
        }
    }

    pub fn paging(&self) -> &PaginationController {
        &self.paging
    }

    pub fn query(&self) -> ListQuery {
        self.query.borrow().clone()
    }

    pub fn state(&self) -> ListState {
        self.state.borrow().clone()
    }

    pub fn products(&self) -> Vec<Product> {
        self.state.borrow().products.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ListState> {
        self.state.subscribe()
    }

    /// Search with the current query and paging and commit the result.
    ///
    /// The error is recorded in the list state and also returned. A search
    /// overtaken by a newer one commits nothing.
    pub async fn search_products(&self) -> Result<()> {
        let request_id = self.guard.begin();
        let paging = self.paging.state();
        self.searched_paging.send_replace(paging.clone());
        let request = {
            let query = self.query.borrow();
            self.builder.build(
                Some(&query.filter),
                query.category_id.as_ref(),
                Some(query.sort),
                Some(&paging.to_clause()),
            )
        };
        self.state.send_modify(|state| state.is_loading = true);
        debug!(request_id, limit = paging.limit, cursor = ?paging.cursor, "searching products");

        let response = match self.search.search_products(&request).await {
            Ok(response) => response,
            Err(e) => {
                warn!(request_id, error = %e, "product search failed");
                if self.guard.is_current(request_id) {
                    self.state.send_modify(|state| {
                        state.is_loading = false;
                        state.error = Some(e.to_string());
                    });
                }
                return Err(e);
            }
        };

        let products = self.enricher.fetch_missing_variants(response.products).await;
        if !self.guard.is_current(request_id) {
            debug!(request_id, "discarding superseded search results");
            return Ok(());
        }

        debug!(request_id, products = products.len(), "search results committed");
        self.state.send_replace(ListState {
            products,
            is_loading: false,
            error: None,
        });
        self.paging.record_metadata(response.paging_metadata);
        Ok(())
    }

    /// Search once if paging moved since the last search.
    /// Returns whether a search ran.
    pub async fn refresh_if_paging_changed(&self) -> Result<bool> {
        if *self.searched_paging.borrow() == self.paging.state() {
            return Ok(false);
        }
        self.search_products().await?;
        Ok(true)
    }

    /// Follow paging changes until the list is dropped.
    ///
    /// Search failures are recorded in the list state and do not stop the
    /// loop.
    pub async fn watch_paging(&self) {
        let mut paging = self.paging.subscribe();
        while paging.changed().await.is_ok() {
            paging.borrow_and_update();
            if let Err(e) = self.refresh_if_paging_changed().await {
                debug!(error = %e, "paging refresh failed");
            }
        }
    }

    /// Show a new filter, sort and category from the first page.
    pub async fn apply_query(&self, filter: Filter, sort: SortSpec, category_id: Option<CategoryId>) -> Result<()> {
        self.query.send_replace(ListQuery {
            filter,
            sort,
            category_id,
        });
        // Claim the first page before moving there so a paging watcher
        // does not search it a second time.
        self.searched_paging
            .send_replace(PagingState::first_page(self.paging.state().limit));
        self.paging.go_to_first_page();
        self.search_products().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{Cursors, PagingMetadata};
    use crate::filter::PriceRange;
    use crate::testing::{FakeSearch, FakeVariants};
    use std::time::Duration;

    fn page(names: &[&str], next: Option<&str>) -> SearchResponse {
        SearchResponse {
            products: names.iter().map(|n| Product::new(*n, *n)).collect(),
            paging_metadata: PagingMetadata {
                has_next: next.is_some(),
                cursors: Cursors {
                    next: next.map(String::from),
                    prev: None,
                },
            },
            ..Default::default()
        }
    }

    fn list(search: Arc<FakeSearch>, initial: SearchResponse) -> ProductList<FakeSearch, FakeVariants> {
        ProductList::new(
            search,
            Arc::new(FakeVariants::new(Vec::new())),
            &SearchConfig::default(),
            ListQuery {
                category_id: Some("c1".into()),
                ..Default::default()
            },
            initial,
        )
    }

    #[tokio::test]
    async fn test_initial_state_does_not_fetch() {
        let search = Arc::new(FakeSearch::new());
        let list = list(search.clone(), page(&["a", "b"], Some("n1")));

        assert_eq!(list.products().len(), 2);
        assert!(list.paging().has_next_page());
        assert!(!list.refresh_if_paging_changed().await.unwrap());
        assert!(search.requests().is_empty());
    }

    #[tokio::test]
    async fn test_one_search_per_paging_change() {
        let search = Arc::new(FakeSearch::new());
        search.push_response(page(&["c", "d"], None));
        let list = list(search.clone(), page(&["a", "b"], Some("n1")));

        list.paging().next_page();
        assert!(list.refresh_if_paging_changed().await.unwrap());
        assert!(!list.refresh_if_paging_changed().await.unwrap());

        let requests = search.requests();
        assert_eq!(requests.len(), 1);
        let paging = requests[0].paging.as_ref().unwrap();
        assert_eq!(paging.cursor.as_deref(), Some("n1"));
        assert_eq!(paging.limit, 24);

        let names: Vec<_> = list.products().into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["c", "d"]);
        assert!(!list.paging().has_next_page());
    }

    #[tokio::test]
    async fn test_load_more_grows_limit() {
        let search = Arc::new(FakeSearch::new());
        let list = list(search.clone(), page(&["a"], Some("n1")));

        list.paging().load_more(24);
        list.refresh_if_paging_changed().await.unwrap();

        assert_eq!(search.requests()[0].paging.as_ref().unwrap().limit, 48);
    }

    #[tokio::test]
    async fn test_apply_query_restarts_from_first_page() {
        let search = Arc::new(FakeSearch::new());
        let list = list(search.clone(), page(&["a"], Some("n1")));
        list.paging().next_page();
        list.refresh_if_paging_changed().await.unwrap();

        list.apply_query(
            Filter::new(PriceRange::new(10.0, 50.0)),
            SortSpec::PriceAsc,
            Some("c2".into()),
        )
        .await
        .unwrap();

        let requests = search.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].paging.as_ref().unwrap().cursor, None);
        assert_eq!(list.paging().state().cursor, None);
        assert!(!list.refresh_if_paging_changed().await.unwrap());
        assert_eq!(list.query().sort, SortSpec::PriceAsc);
    }

    #[tokio::test]
    async fn test_superseded_search_commits_nothing() {
        let search = Arc::new(FakeSearch::new());
        search.push_response(page(&["stale"], Some("n-stale")));
        search.push_response(page(&["fresh"], None));
        let list = list(search.clone(), page(&["a"], Some("n1")));
        let gate = search.hold_next_call();

        let slow = list.search_products();
        let fast = async {
            gate.entered().await;
            list.search_products().await.unwrap();
            gate.release();
        };
        let (slow, ()) = tokio::join!(slow, fast);
        slow.unwrap();

        let state = list.state();
        assert!(!state.is_loading);
        assert_eq!(state.error, None);
        let names: Vec<_> = state.products.into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["fresh"]);
        assert!(!list.paging().has_next_page());
        assert_eq!(search.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_search_error_is_recorded_and_returned() {
        let search = Arc::new(FakeSearch::new());
        let list = list(search.clone(), page(&["a"], None));
        search.fail_with("boom");

        assert!(list.search_products().await.is_err());

        let state = list.state();
        assert!(!state.is_loading);
        assert!(state.error.unwrap().contains("boom"));
        assert_eq!(state.products.len(), 1);
    }

    #[tokio::test]
    async fn test_watch_paging_follows_changes() {
        let search = Arc::new(FakeSearch::new());
        search.push_response(page(&["b"], None));
        let list = list(search.clone(), page(&["a"], Some("n1")));

        let watcher = list.watch_paging();
        let driver = async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            list.paging().next_page();
            for _ in 0..50 {
                if !search.requests().is_empty() {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        };
        tokio::select! {
            _ = watcher => {}
            _ = driver => {}
        }

        assert_eq!(search.requests().len(), 1);
    }
}
