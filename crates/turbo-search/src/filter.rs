//! Filter selection and its state container.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::ids::{ChoiceId, OptionId};

/// Option id of the synthetic availability facet.
pub const INVENTORY_FILTER_ID: &str = "inventory-filter";

/// A price range selection.
///
/// `max = None` means there is no ceiling. `min <= max` is not checked here
/// or by the request builder; a reversed range reaches the backend as-is.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PriceRange {
    pub min: f64,
    pub max: Option<f64>,
}

impl PriceRange {
    /// Create a bounded range.
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max: Some(max) }
    }

    /// Create a range with no ceiling.
    pub fn at_least(min: f64) -> Self {
        Self { min, max: None }
    }
}

/// The user's current filter selection.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Filter {
    pub price_range: PriceRange,
    /// Selected choice ids per option id.
    pub selected_options: BTreeMap<OptionId, BTreeSet<ChoiceId>>,
}

impl Filter {
    /// Create a filter with a price range and no option selections.
    pub fn new(price_range: PriceRange) -> Self {
        Self {
            price_range,
            selected_options: BTreeMap::new(),
        }
    }

    /// Add a selected choice.
    pub fn with_choice(mut self, option: impl Into<OptionId>, choice: impl Into<ChoiceId>) -> Self {
        self.select(option.into(), choice.into());
        self
    }

    /// Replace the selection for one option.
    pub fn with_choices<I, C>(mut self, option: impl Into<OptionId>, choices: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<ChoiceId>,
    {
        self.selected_options
            .insert(option.into(), choices.into_iter().map(Into::into).collect());
        self
    }

    /// Select a choice.
    pub fn select(&mut self, option: OptionId, choice: ChoiceId) {
        self.selected_options.entry(option).or_default().insert(choice);
    }

    /// Toggle a choice on or off. Returns whether it is now selected.
    pub fn toggle(&mut self, option: OptionId, choice: ChoiceId) -> bool {
        let choices = self.selected_options.entry(option.clone()).or_default();
        let selected = if choices.remove(&choice) {
            false
        } else {
            choices.insert(choice);
            true
        };
        if choices.is_empty() {
            self.selected_options.remove(&option);
        }
        selected
    }

    /// Whether a choice is selected.
    pub fn is_selected(&self, option: &OptionId, choice: &ChoiceId) -> bool {
        self.selected_options
            .get(option)
            .is_some_and(|choices| choices.contains(choice))
    }

    /// Whether any option has at least one selected choice.
    pub fn has_option_selections(&self) -> bool {
        self.selected_options.values().any(|c| !c.is_empty())
    }
}

/// State container for the filter of one catalog view.
///
/// Subscribers are notified only when the filter actually changes.
#[derive(Debug)]
pub struct FilterState {
    tx: watch::Sender<Filter>,
}

impl FilterState {
    /// Create the state with an initial filter.
    pub fn new(initial: Filter) -> Self {
        let (tx, _) = watch::channel(initial);
        Self { tx }
    }

    /// Snapshot of the current filter.
    pub fn current(&self) -> Filter {
        self.tx.borrow().clone()
    }

    /// Subscribe to filter changes. The current value counts as seen.
    pub fn subscribe(&self) -> watch::Receiver<Filter> {
        self.tx.subscribe()
    }

    /// Replace the whole filter. Returns whether it changed.
    pub fn replace(&self, filter: Filter) -> bool {
        self.tx.send_if_modified(|current| {
            if *current == filter {
                return false;
            }
            *current = filter;
            true
        })
    }

    /// Set the price range. Returns whether it changed.
    pub fn set_price_range(&self, range: PriceRange) -> bool {
        self.tx.send_if_modified(|current| {
            if current.price_range == range {
                return false;
            }
            current.price_range = range;
            true
        })
    }

    /// Toggle a single choice.
    pub fn toggle_choice(&self, option: OptionId, choice: ChoiceId) {
        self.tx.send_modify(|current| {
            current.toggle(option, choice);
        });
    }

    /// Drop every selection for one option. Returns whether anything changed.
    pub fn clear_option(&self, option: &OptionId) -> bool {
        self.tx
            .send_if_modified(|current| current.selected_options.remove(option).is_some())
    }

    /// Reset to the given default range with no option selections.
    pub fn reset(&self, default_range: PriceRange) -> bool {
        self.replace(Filter::new(default_range))
    }
}

impl Default for FilterState {
    fn default() -> Self {
        Self::new(Filter::default())
    }
}
