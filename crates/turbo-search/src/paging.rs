//! Cursor and load-more pagination.

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::api::PagingMetadata;
use crate::request::PagingClause;

/// The request-driving part of pagination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PagingState {
    /// Page size, or the accumulated size in load-more mode.
    pub limit: u32,
    /// Cursor of the current page. `None` is the first page.
    pub cursor: Option<String>,
}

impl PagingState {
    pub fn first_page(limit: u32) -> Self {
        Self { limit, cursor: None }
    }

    /// The paging clause for a search request.
    pub fn to_clause(&self) -> PagingClause {
        PagingClause::new(self.limit, self.cursor.clone())
    }
}

/// Pagination of one product list.
///
/// Two ways to move through results: walk cursors with `next_page` /
/// `prev_page`, or grow the limit with `load_more`. Every effective change to
/// the limit or cursor notifies subscribers once; a no-op notifies nobody.
#[derive(Debug)]
pub struct PaginationController {
    state: watch::Sender<PagingState>,
    metadata: watch::Sender<PagingMetadata>,
}

impl PaginationController {
    /// Create the controller with the state and metadata of the initial page.
    pub fn new(initial: PagingState, metadata: PagingMetadata) -> Self {
        let (state, _) = watch::channel(initial);
        let (metadata, _) = watch::channel(metadata);
        Self { state, metadata }
    }

    /// Current paging state.
    pub fn state(&self) -> PagingState {
        self.state.borrow().clone()
    }

    /// Metadata of the last response.
    pub fn metadata(&self) -> PagingMetadata {
        self.metadata.borrow().clone()
    }

    /// Subscribe to paging state changes. The current value counts as seen.
    pub fn subscribe(&self) -> watch::Receiver<PagingState> {
        self.state.subscribe()
    }

    /// Set the page size and go back to the first page.
    pub fn set_limit(&self, limit: u32) {
        self.update(|state| {
            state.limit = limit;
            state.cursor = None;
        });
    }

    /// Grow the limit by `delta`, keeping the cursor.
    pub fn load_more(&self, delta: u32) {
        self.update(|state| state.limit = state.limit.saturating_add(delta));
    }

    /// Move to the next page. Does nothing without a next cursor.
    pub fn next_page(&self) {
        if let Some(next) = self.metadata.borrow().cursors.next.clone() {
            self.update(|state| state.cursor = Some(next));
        }
    }

    /// Move to the previous page. Does nothing without a previous cursor.
    pub fn prev_page(&self) {
        if let Some(prev) = self.metadata.borrow().cursors.prev.clone() {
            self.update(|state| state.cursor = Some(prev));
        }
    }

    /// Go back to the first page.
    pub fn go_to_first_page(&self) {
        self.update(|state| state.cursor = None);
    }

    pub fn has_next_page(&self) -> bool {
        self.metadata.borrow().has_next
    }

    pub fn has_prev_page(&self) -> bool {
        self.metadata.borrow().cursors.prev.is_some()
    }

    /// Commit the paging metadata of a fresh response.
    pub fn record_metadata(&self, metadata: PagingMetadata) {
        self.metadata.send_replace(metadata);
    }

    fn update(&self, change: impl FnOnce(&mut PagingState)) {
        self.state.send_if_modified(|state| {
            let before = state.clone();
            change(state);
            *state != before
        });
    }
}
