//! Backend seams: the search, customizations and variants APIs.
//!
//! Implementations live outside this crate (HTTP clients, SDK wrappers).
//! Everything here is the wire shape those APIs return.

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};

use crate::catalog::{Product, Variant};
use crate::error::Result;
use crate::ids::{ChoiceId, OptionId, ProductId};
use crate::request::SearchRequest;

/// Product search with aggregations.
#[async_trait]
pub trait SearchApi: Send + Sync {
    async fn search_products(&self, request: &SearchRequest) -> Result<SearchResponse>;
}

/// Customization (product option) definitions.
#[async_trait]
pub trait CustomizationsApi: Send + Sync {
    /// Fetch one page of customizations, starting at `cursor`.
    async fn query_customizations(&self, cursor: Option<&str>) -> Result<CustomizationPage>;
}

/// Variant lookup by product.
#[async_trait]
pub trait VariantsApi: Send + Sync {
    async fn query_variants(&self, query: &VariantQuery) -> Result<VariantPage>;
}

/// Response of a product search.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    #[serde(default)]
    pub products: Vec<Product>,
    #[serde(default)]
    pub paging_metadata: PagingMetadata,
    #[serde(default)]
    pub aggregation_data: AggregationData,
}

/// Cursor paging metadata of a response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct PagingMetadata {
    #[serde(default)]
    pub has_next: bool,
    #[serde(default)]
    pub cursors: Cursors,
}

/// Continuation tokens in each direction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Cursors {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prev: Option<String>,
}

/// Aggregation results keyed by aggregation name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct AggregationData {
    #[serde(default)]
    pub results: Vec<AggregationResult>,
}

impl AggregationData {
    fn find(&self, name: &str) -> Option<&AggregationResult> {
        self.results.iter().find(|r| r.name == name)
    }

    /// Value of a scalar aggregation.
    pub fn scalar(&self, name: &str) -> Option<f64> {
        self.find(name)?.scalar.as_ref().and_then(|s| s.value)
    }

    /// Distinct values of a value aggregation, in backend order.
    pub fn values(&self, name: &str) -> Vec<&str> {
        self.find(name)
            .and_then(|r| r.values.as_ref())
            .map(|v| v.results.iter().map(|b| b.value.as_str()).collect())
            .unwrap_or_default()
    }
}

/// One aggregation result. Exactly one of `scalar` / `values` is set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct AggregationResult {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scalar: Option<ScalarResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<ValueResults>,
}

impl AggregationResult {
    pub fn scalar(name: &str, value: f64) -> Self {
        Self {
            name: name.to_string(),
            scalar: Some(ScalarResult { value: Some(value) }),
            values: None,
        }
    }

    pub fn values<'a>(name: &str, values: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            name: name.to_string(),
            scalar: None,
            values: Some(ValueResults {
                results: values
                    .into_iter()
                    .map(|value| ValueBucket {
                        value: value.to_string(),
                        count: 1,
                    })
                    .collect(),
            }),
        }
    }
}

/// Scalar aggregation value. Some backends send numbers as strings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct ScalarResult {
    #[serde(default, deserialize_with = "lenient_number")]
    pub value: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ValueResults {
    #[serde(default)]
    pub results: Vec<ValueBucket>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ValueBucket {
    pub value: String,
    #[serde(default)]
    pub count: u64,
}

fn lenient_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Number(n)) => Some(n),
        Some(Raw::Text(s)) => s.trim().parse().ok(),
        None => None,
    })
}

/// One page of customizations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct CustomizationPage {
    #[serde(default)]
    pub items: Vec<Customization>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

/// A backend-defined product option such as "Size".
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Customization {
    pub id: OptionId,
    pub name: String,
    #[serde(default)]
    pub customization_type: CustomizationType,
    #[serde(default)]
    pub customization_render_type: RenderType,
    #[serde(default)]
    pub choices_settings: ChoicesSettings,
}

impl Customization {
    /// A product option with text choices.
    pub fn option(id: impl Into<OptionId>, name: impl Into<String>, choices: Vec<CustomizationChoice>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            customization_type: CustomizationType::ProductOption,
            customization_render_type: RenderType::TextChoices,
            choices_settings: ChoicesSettings { choices },
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CustomizationType {
    #[default]
    ProductOption,
    Modifier,
    #[serde(other)]
    Unknown,
}

/// How a facet's choices are presented.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RenderType {
    #[default]
    TextChoices,
    SwatchChoices,
    FreeText,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ChoicesSettings {
    #[serde(default)]
    pub choices: Vec<CustomizationChoice>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CustomizationChoice {
    pub id: ChoiceId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_code: Option<String>,
}

impl CustomizationChoice {
    pub fn new(id: impl Into<ChoiceId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            color_code: None,
        }
    }
}

/// Variants of a set of products, one page at a time.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VariantQuery {
    pub product_ids: Vec<ProductId>,
    pub limit: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct VariantPage {
    #[serde(default)]
    pub items: Vec<Variant>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}
