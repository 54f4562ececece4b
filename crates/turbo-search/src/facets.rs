//! Catalog facets: the filter options a category actually offers.
//!
//! Facets come from two sources joined by name. The customization
//! definitions say which options and choices exist at all; one aggregation
//! search says which of those names occur in the category's products.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, error};

use crate::api::{
    AggregationData, Customization, CustomizationType, CustomizationsApi, RenderType, SearchApi,
};
use crate::config::{AggregationLimits, SearchConfig};
use crate::error::Result;
use crate::filter::{PriceRange, INVENTORY_FILTER_ID};
use crate::guard::RequestGuard;
use crate::ids::{CategoryId, ChoiceId, OptionId};
use crate::request::{aggregation_names, build_aggregation_request};

/// Display name of the synthetic availability facet.
pub const AVAILABILITY_FACET_NAME: &str = "Availability";

/// Price facet of a catalog.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum PriceFacet {
    /// No load has completed yet.
    #[default]
    NotLoaded,
    /// Loaded, but the catalog has no usable price bounds.
    Absent,
    /// Loaded price bounds.
    Bounds(PriceRange),
}

impl PriceFacet {
    pub fn bounds(&self) -> Option<PriceRange> {
        match self {
            PriceFacet::Bounds(range) => Some(*range),
            _ => None,
        }
    }
}

/// One selectable choice of a facet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FacetChoice {
    pub id: ChoiceId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_code: Option<String>,
}

/// A filterable product option with its choices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductOption {
    pub id: OptionId,
    pub name: String,
    pub choices: Vec<FacetChoice>,
    pub render_type: RenderType,
}

impl ProductOption {
    /// Whether this is the synthetic availability facet.
    pub fn is_inventory(&self) -> bool {
        self.id.as_str() == INVENTORY_FILTER_ID
    }

    pub fn choice(&self, id: &ChoiceId) -> Option<&FacetChoice> {
        self.choices.iter().find(|c| &c.id == id)
    }

    /// Find a choice by display name, ignoring case.
    pub fn choice_named(&self, name: &str) -> Option<&FacetChoice> {
        let name = fold_case(name);
        self.choices.iter().find(|c| fold_case(&c.name) == name)
    }
}

/// Facets derived from one aggregation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogFacets {
    pub product_options: Vec<ProductOption>,
    pub price_range: PriceFacet,
}

impl CatalogFacets {
    pub fn option(&self, id: &OptionId) -> Option<&ProductOption> {
        self.product_options.iter().find(|o| &o.id == id)
    }

    /// The filter range that selects everything: the price bounds when
    /// known, otherwise zero with no ceiling.
    pub fn default_price_range(&self) -> PriceRange {
        self.price_range.bounds().unwrap_or_default()
    }
}

/// Observable state of the facet loader.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CatalogState {
    pub facets: CatalogFacets,
    pub is_loading: bool,
    pub error: Option<String>,
    /// Category of the facets currently held.
    pub category_id: Option<CategoryId>,
}

/// Loads facets for a category and holds the latest result.
pub struct CatalogFacetLoader<S, C> {
    search: Arc<S>,
    customizations: Arc<C>,
    limits: AggregationLimits,
    state: watch::Sender<CatalogState>,
    guard: RequestGuard,
}

impl<S, C> CatalogFacetLoader<S, C>
where
    S: SearchApi,
    C: CustomizationsApi,
{
    pub fn new(search: Arc<S>, customizations: Arc<C>, config: &SearchConfig) -> Self {
        let (state, _) = watch::channel(CatalogState::default());
        Self {
            search,
            customizations,
            limits: config.aggregation,
            state,
            guard: RequestGuard::new(),
        }
    }

    pub fn state(&self) -> CatalogState {
        self.state.borrow().clone()
    }

    pub fn facets(&self) -> CatalogFacets {
        self.state.borrow().facets.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<CatalogState> {
        self.state.subscribe()
    }

    /// Load facets for a category, replacing the current ones.
    ///
    /// Never fails: errors are recorded in the state and the facets are
    /// emptied. When calls overlap, only the most recently started one
    /// commits its result.
    pub async fn load_catalog_data(&self, category_id: Option<&CategoryId>) {
        let request_id = self.guard.begin();
        self.state.send_modify(|state| {
            state.is_loading = true;
            state.error = None;
        });

        let request = build_aggregation_request(category_id, &self.limits);
        let (search, customizations) = futures::join!(
            self.search.search_products(&request),
            self.fetch_customizations()
        );
        let outcome = search.and_then(|response| {
            customizations.map(|defs| derive_facets(&response.aggregation_data, &defs))
        });

        if !self.guard.is_current(request_id) {
            debug!(request_id, "discarding facets of a superseded load");
            return;
        }

        self.state.send_modify(|state| {
            match outcome {
                Ok(facets) => {
                    debug!(
                        options = facets.product_options.len(),
                        category = ?category_id,
                        "catalog facets loaded"
                    );
                    state.facets = facets;
                    state.error = None;
                }
                Err(e) => {
                    error!(error = %e, category = ?category_id, "failed to load catalog facets");
                    state.facets = CatalogFacets {
                        product_options: Vec::new(),
                        price_range: PriceFacet::Absent,
                    };
                    state.error = Some(e.to_string());
                }
            }
            state.category_id = category_id.cloned();
            state.is_loading = false;
        });
    }

    async fn fetch_customizations(&self) -> Result<Vec<Customization>> {
        let mut all = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let page = self
                .customizations
                .query_customizations(cursor.as_deref())
                .await?;
            all.extend(page.items);
            match page.next_cursor {
                Some(next) if cursor.as_deref() != Some(next.as_str()) => cursor = Some(next),
                _ => break,
            }
        }
        Ok(all)
    }
}

/// Build facets from aggregation results and customization definitions.
pub fn derive_facets(data: &AggregationData, customizations: &[Customization]) -> CatalogFacets {
    let mut product_options = option_facets(data, customizations);
    if let Some(availability) = availability_facet(data) {
        product_options.push(availability);
    }

    CatalogFacets {
        product_options,
        price_range: price_facet(data),
    }
}

fn price_facet(data: &AggregationData) -> PriceFacet {
    match (
        data.scalar(aggregation_names::MIN_PRICE),
        data.scalar(aggregation_names::MAX_PRICE),
    ) {
        (Some(min), Some(max)) if min > 0.0 || max > 0.0 => PriceFacet::Bounds(PriceRange::new(min, max)),
        _ => PriceFacet::Absent,
    }
}

/// Case folding shared by the facet intersection and URL choice lookup.
fn fold_case(name: &str) -> String {
    name.to_lowercase()
}

fn lowercase_set(values: Vec<&str>) -> HashSet<String> {
    values.into_iter().map(fold_case).collect()
}

fn option_facets(data: &AggregationData, customizations: &[Customization]) -> Vec<ProductOption> {
    let option_names = lowercase_set(data.values(aggregation_names::OPTION_NAMES));
    let choice_names = lowercase_set(data.values(aggregation_names::CHOICE_NAMES));

    customizations
        .iter()
        .filter(|c| c.customization_type == CustomizationType::ProductOption)
        .filter(|c| option_names.contains(&fold_case(&c.name)))
        .filter_map(|c| {
            let mut choices: Vec<FacetChoice> = c
                .choices_settings
                .choices
                .iter()
                .filter(|choice| choice_names.contains(&fold_case(&choice.name)))
                .map(|choice| FacetChoice {
                    id: choice.id.clone(),
                    name: choice.name.clone(),
                    color_code: choice.color_code.clone(),
                })
                .collect();
            if choices.is_empty() {
                return None;
            }
            choices.sort_by(|a, b| compare_choice_names(&a.name, &b.name));

            Some(ProductOption {
                id: c.id.clone(),
                name: c.name.clone(),
                choices,
                render_type: c.customization_render_type,
            })
        })
        .collect()
}

fn availability_facet(data: &AggregationData) -> Option<ProductOption> {
    let mut seen = HashSet::new();
    let statuses: Vec<&str> = data
        .values(aggregation_names::INVENTORY_STATUS)
        .into_iter()
        .filter(|status| seen.insert(*status))
        .collect();

    if statuses.len() <= 1 {
        return None;
    }

    Some(ProductOption {
        id: OptionId::new(INVENTORY_FILTER_ID),
        name: AVAILABILITY_FACET_NAME.to_string(),
        choices: statuses
            .into_iter()
            .map(|status| FacetChoice {
                id: ChoiceId::new(status),
                name: availability_label(status).to_string(),
                color_code: None,
            })
            .collect(),
        render_type: RenderType::TextChoices,
    })
}

/// Human label of an availability status.
pub fn availability_label(status: &str) -> &str {
    match status {
        "IN_STOCK" => "In Stock",
        "OUT_OF_STOCK" => "Out of Stock",
        "PARTIALLY_OUT_OF_STOCK" => "Partially Out of Stock",
        other => other,
    }
}

fn numeric_value(name: &str) -> Option<f64> {
    name.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Choice display order: numeric names first, largest first, then the rest
/// in byte order.
pub fn compare_choice_names(a: &str, b: &str) -> Ordering {
    match (numeric_value(a), numeric_value(b)) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{AggregationResult, CustomizationChoice, SearchResponse};
    use crate::testing::{FakeCustomizations, FakeSearch};

    fn aggregation(
        min: f64,
        max: f64,
        options: &[&str],
        choices: &[&str],
        statuses: &[&str],
    ) -> AggregationData {
        AggregationData {
            results: vec![
                AggregationResult::scalar(aggregation_names::MIN_PRICE, min),
                AggregationResult::scalar(aggregation_names::MAX_PRICE, max),
                AggregationResult::values(aggregation_names::OPTION_NAMES, options.iter().copied()),
                AggregationResult::values(aggregation_names::CHOICE_NAMES, choices.iter().copied()),
                AggregationResult::values(aggregation_names::INVENTORY_STATUS, statuses.iter().copied()),
            ],
        }
    }

    fn color_and_size() -> Vec<Customization> {
        vec![
            Customization::option(
                "color",
                "Color",
                vec![
                    CustomizationChoice::new("red", "Red"),
                    CustomizationChoice::new("blue", "Blue"),
                ],
            ),
            Customization::option(
                "size",
                "Size",
                vec![
                    CustomizationChoice::new("s", "Small"),
                    CustomizationChoice::new("xl", "XL"),
                ],
            ),
        ]
    }

    #[test]
    fn test_choice_ordering() {
        let mut names = vec!["10", "2", "apple", "Banana"];
        names.sort_by(|a, b| compare_choice_names(a, b));
        assert_eq!(names, vec!["10", "2", "Banana", "apple"]);
    }

    #[test]
    fn test_decimal_choices_sort_numerically() {
        let mut names = vec!["7.5", "10", "S", "8"];
        names.sort_by(|a, b| compare_choice_names(a, b));
        assert_eq!(names, vec!["10", "8", "7.5", "S"]);
    }

    #[test]
    fn test_zero_prices_mean_absent() {
        let facets = derive_facets(&aggregation(0.0, 0.0, &[], &[], &[]), &[]);
        assert_eq!(facets.price_range, PriceFacet::Absent);
    }

    #[test]
    fn test_missing_bound_means_absent() {
        let data = AggregationData {
            results: vec![AggregationResult::scalar(aggregation_names::MAX_PRICE, 40.0)],
        };
        assert_eq!(derive_facets(&data, &[]).price_range, PriceFacet::Absent);
    }

    #[test]
    fn test_price_bounds() {
        let facets = derive_facets(&aggregation(0.0, 80.0, &[], &[], &[]), &[]);
        assert_eq!(facets.price_range, PriceFacet::Bounds(PriceRange::new(0.0, 80.0)));
        assert_eq!(facets.default_price_range(), PriceRange::new(0.0, 80.0));
    }

    #[test]
    fn test_options_intersect_case_insensitively() {
        let data = aggregation(1.0, 10.0, &["color"], &["RED", "small"], &["IN_STOCK"]);
        let facets = derive_facets(&data, &color_and_size());

        assert_eq!(facets.product_options.len(), 1);
        let color = &facets.product_options[0];
        assert_eq!(color.id, OptionId::new("color"));
        assert_eq!(color.choices.len(), 1);
        assert_eq!(color.choices[0].name, "Red");
    }

    #[test]
    fn test_non_ascii_choice_found_by_any_case() {
        let customizations = vec![Customization::option(
            "shade",
            "Shade",
            vec![CustomizationChoice::new("ecru", "Écru")],
        )];
        let facets = derive_facets(&aggregation(1.0, 10.0, &["SHADE"], &["ÉCRU"], &[]), &customizations);

        let shade = facets.option(&OptionId::new("shade")).unwrap();
        assert_eq!(shade.choices.len(), 1);
        assert_eq!(shade.choice_named("ÉCRU").map(|c| c.id.as_str()), Some("ecru"));
        assert_eq!(shade.choice_named("écru").map(|c| c.id.as_str()), Some("ecru"));
        assert!(shade.choice_named("ecru").is_none());
    }

    #[test]
    fn test_option_without_matching_choices_is_dropped() {
        let data = aggregation(1.0, 10.0, &["Color", "Size"], &["Red"], &[]);
        let facets = derive_facets(&data, &color_and_size());

        let ids: Vec<_> = facets.product_options.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, vec!["color"]);
    }

    #[test]
    fn test_modifiers_are_not_facets() {
        let mut customizations = color_and_size();
        customizations[0].customization_type = CustomizationType::Modifier;
        let data = aggregation(1.0, 10.0, &["Color", "Size"], &["Red", "XL"], &[]);

        let facets = derive_facets(&data, &customizations);
        let ids: Vec<_> = facets.product_options.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, vec!["size"]);
    }

    #[test]
    fn test_availability_needs_two_statuses() {
        let single = derive_facets(&aggregation(1.0, 2.0, &[], &[], &["IN_STOCK", "IN_STOCK"]), &[]);
        assert!(single.option(&OptionId::new(INVENTORY_FILTER_ID)).is_none());

        let both = derive_facets(&aggregation(1.0, 2.0, &[], &[], &["IN_STOCK", "OUT_OF_STOCK"]), &[]);
        let availability = both.option(&OptionId::new(INVENTORY_FILTER_ID)).unwrap();
        assert!(availability.is_inventory());
        assert_eq!(availability.name, "Availability");
        assert_eq!(availability.choices[1].id, ChoiceId::new("OUT_OF_STOCK"));
        assert_eq!(availability.choices[1].name, "Out of Stock");
    }

    #[test]
    fn test_availability_is_appended_last() {
        let data = aggregation(1.0, 2.0, &["Color"], &["Red"], &["IN_STOCK", "OUT_OF_STOCK"]);
        let facets = derive_facets(&data, &color_and_size());
        assert_eq!(facets.product_options.len(), 2);
        assert!(facets.product_options[1].is_inventory());
    }

    #[tokio::test]
    async fn test_load_replaces_facets() {
        let search = Arc::new(FakeSearch::with_aggregations(aggregation(
            5.0,
            50.0,
            &["Color"],
            &["Red", "Blue"],
            &[],
        )));
        let customizations = Arc::new(FakeCustomizations::new(color_and_size()));
        let loader = CatalogFacetLoader::new(search.clone(), customizations, &SearchConfig::default());

        assert_eq!(loader.state().facets.price_range, PriceFacet::NotLoaded);
        loader.load_catalog_data(Some(&"c1".into())).await;

        let state = loader.state();
        assert!(!state.is_loading);
        assert_eq!(state.error, None);
        assert_eq!(state.category_id, Some(CategoryId::new("c1")));
        assert_eq!(state.facets.price_range, PriceFacet::Bounds(PriceRange::new(5.0, 50.0)));
        let names: Vec<_> = state.facets.product_options[0]
            .choices
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(names, vec!["Blue", "Red"]);

        let requests = search.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].aggregations.len(), 5);
    }

    #[tokio::test]
    async fn test_superseded_load_keeps_newer_facets() {
        let search = Arc::new(FakeSearch::new());
        search.push_response(SearchResponse {
            aggregation_data: aggregation(1.0, 10.0, &["Color"], &["Red"], &[]),
            ..Default::default()
        });
        search.push_response(SearchResponse {
            aggregation_data: aggregation(20.0, 90.0, &["Size"], &["XL"], &[]),
            ..Default::default()
        });
        let customizations = Arc::new(FakeCustomizations::new(color_and_size()));
        let loader = CatalogFacetLoader::new(search.clone(), customizations, &SearchConfig::default());
        let gate = search.hold_next_call();

        let slow_category: CategoryId = "a".into();
        let slow = loader.load_catalog_data(Some(&slow_category));
        let fast = async {
            gate.entered().await;
            loader.load_catalog_data(Some(&"b".into())).await;
            assert_eq!(loader.state().category_id, Some(CategoryId::new("b")));
            gate.release();
        };
        tokio::join!(slow, fast);

        let state = loader.state();
        assert!(!state.is_loading);
        assert_eq!(state.category_id, Some(CategoryId::new("b")));
        assert_eq!(state.facets.price_range, PriceFacet::Bounds(PriceRange::new(20.0, 90.0)));
        let ids: Vec<_> = state.facets.product_options.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, vec!["size"]);
        assert_eq!(search.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_customizations_are_drained() {
        let search = Arc::new(FakeSearch::with_aggregations(aggregation(
            1.0,
            9.0,
            &["Color", "Size"],
            &["Red", "XL"],
            &[],
        )));
        let customizations = Arc::new(FakeCustomizations::paged(color_and_size(), 1));
        let loader = CatalogFacetLoader::new(search, customizations.clone(), &SearchConfig::default());

        loader.load_catalog_data(None).await;

        assert_eq!(loader.facets().product_options.len(), 2);
        assert_eq!(customizations.calls(), 2);
    }

    #[tokio::test]
    async fn test_failure_resets_facets() {
        let search = Arc::new(FakeSearch::with_aggregations(aggregation(
            5.0,
            50.0,
            &["Color"],
            &["Red"],
            &[],
        )));
        let customizations = Arc::new(FakeCustomizations::new(color_and_size()));
        let loader = CatalogFacetLoader::new(search.clone(), customizations, &SearchConfig::default());
        loader.load_catalog_data(None).await;
        assert_eq!(loader.facets().product_options.len(), 1);

        search.fail_with("search unavailable");
        loader.load_catalog_data(None).await;

        let state = loader.state();
        assert!(!state.is_loading);
        assert!(state.error.unwrap().contains("search unavailable"));
        assert!(state.facets.product_options.is_empty());
        assert_eq!(state.facets.price_range, PriceFacet::Absent);
    }

    #[tokio::test]
    async fn test_customizations_failure_is_recorded() {
        let search = Arc::new(FakeSearch::with_aggregations(aggregation(1.0, 2.0, &[], &[], &[])));
        let customizations = Arc::new(FakeCustomizations::failing("forbidden"));
        let loader = CatalogFacetLoader::new(search, customizations, &SearchConfig::default());

        loader.load_catalog_data(None).await;

        let state = loader.state();
        assert!(state.error.is_some());
        assert_eq!(state.facets.price_range, PriceFacet::Absent);
    }
}
