//! Filter, sort and paging to search request.

use serde_json::json;

use crate::config::{AggregationLimits, UNBOUNDED_PRICE_SENTINEL};
use crate::filter::{Filter, INVENTORY_FILTER_ID};
use crate::ids::CategoryId;
use crate::request::{
    aggregation_names, fields, Aggregation, Condition, PagingClause, ScalarKind, SearchRequest,
    SortClause, SortOrder, DEFAULT_FIELD_PROJECTION,
};
use crate::sort::SortSpec;

/// Builds search requests from explicit inputs.
///
/// Holds only configuration; building never touches any state store or the
/// network, so equal inputs always produce equal requests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchRequestBuilder {
    price_ceiling: Option<f64>,
}

impl Default for SearchRequestBuilder {
    fn default() -> Self {
        Self {
            price_ceiling: Some(UNBOUNDED_PRICE_SENTINEL),
        }
    }
}

impl SearchRequestBuilder {
    /// Create a builder with the default price ceiling.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the price at or above which an upper bound is dropped.
    pub fn with_price_ceiling(mut self, ceiling: Option<f64>) -> Self {
        self.price_ceiling = ceiling;
        self
    }

    /// Build a listing search request.
    pub fn build(
        &self,
        filter: Option<&Filter>,
        category_id: Option<&CategoryId>,
        sort: Option<SortSpec>,
        paging: Option<&PagingClause>,
    ) -> SearchRequest {
        SearchRequest {
            filter: Condition::all(self.conditions(filter, category_id)),
            sort: sort
                .map(|spec| vec![sort_clause(spec, category_id)])
                .unwrap_or_default(),
            paging: paging.cloned(),
            aggregations: Vec::new(),
            fields: DEFAULT_FIELD_PROJECTION.iter().map(|f| f.to_string()).collect(),
        }
    }

    fn conditions(&self, filter: Option<&Filter>, category_id: Option<&CategoryId>) -> Vec<Condition> {
        let mut conditions = Vec::new();

        if let Some(id) = category_id {
            conditions.push(Condition::Category(id.clone()));
        }

        let Some(filter) = filter else {
            return conditions;
        };

        let range = filter.price_range;
        let at_least = (range.min > 0.0).then_some(range.min);
        let at_most = range.max.filter(|&max| max > 0.0 && self.below_ceiling(max));
        if at_least.is_some() || at_most.is_some() {
            conditions.push(Condition::Price { at_least, at_most });
        }

        for (option, choices) in &filter.selected_options {
            if choices.is_empty() {
                continue;
            }
            let choices = choices.iter().cloned().collect();
            if option.as_str() == INVENTORY_FILTER_ID {
                conditions.push(Condition::Inventory(choices));
            } else {
                conditions.push(Condition::OptionChoices {
                    option: option.clone(),
                    choices,
                });
            }
        }

        conditions
    }

    fn below_ceiling(&self, max: f64) -> bool {
        self.price_ceiling.map_or(true, |ceiling| max < ceiling)
    }
}

fn sort_clause(spec: SortSpec, category_id: Option<&CategoryId>) -> SortClause {
    match spec {
        SortSpec::NameAsc => SortClause::new(fields::NAME, SortOrder::Asc),
        SortSpec::NameDesc => SortClause::new(fields::NAME, SortOrder::Desc),
        SortSpec::PriceAsc => SortClause::new(fields::MIN_PRICE, SortOrder::Asc),
        SortSpec::PriceDesc => SortClause::new(fields::MIN_PRICE, SortOrder::Desc),
        SortSpec::Newest => SortClause::new(fields::CREATED_DATE, SortOrder::Desc),
        SortSpec::Recommended => {
            let mut clause = SortClause::new(fields::CATEGORY_INDEX, SortOrder::Asc);
            clause.select_items_by = category_id.map(|id| {
                let mut selector = serde_json::Map::new();
                selector.insert(fields::CATEGORY_ID.to_string(), json!(id));
                vec![serde_json::Value::Object(selector)]
            });
            clause
        }
    }
}

/// Build a listing search request with the default builder.
pub fn build_search_options(
    filter: Option<&Filter>,
    category_id: Option<&CategoryId>,
    sort: Option<SortSpec>,
    paging: Option<&PagingClause>,
) -> SearchRequest {
    SearchRequestBuilder::default().build(filter, category_id, sort, paging)
}

/// Build the request that aggregates a category into facet data.
///
/// Asks for no products, only the price bounds and the distinct option names,
/// choice names and availability statuses.
pub fn build_aggregation_request(
    category_id: Option<&CategoryId>,
    limits: &AggregationLimits,
) -> SearchRequest {
    SearchRequest {
        filter: category_id.map(|id| Condition::Category(id.clone())),
        sort: Vec::new(),
        paging: Some(PagingClause::new(0, None)),
        aggregations: vec![
            Aggregation::scalar(aggregation_names::MIN_PRICE, fields::MIN_PRICE, ScalarKind::Min),
            Aggregation::scalar(aggregation_names::MAX_PRICE, fields::MAX_PRICE, ScalarKind::Max),
            Aggregation::values(
                aggregation_names::OPTION_NAMES,
                fields::OPTION_NAME,
                limits.option_names,
            ),
            Aggregation::values(
                aggregation_names::CHOICE_NAMES,
                fields::CHOICE_NAME,
                limits.choice_names,
            ),
            Aggregation::values(
                aggregation_names::INVENTORY_STATUS,
                fields::AVAILABILITY,
                limits.inventory_statuses,
            ),
        ],
        fields: Vec::new(),
    }
}
