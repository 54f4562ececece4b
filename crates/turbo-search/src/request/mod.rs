//! Backend search requests.
//!
//! Filters are assembled as a small condition tree and only turned into the
//! backend's JSON shape when the request is serialized.

mod builder;

pub use builder::{build_aggregation_request, build_search_options, SearchRequestBuilder};

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::{json, Map, Value};

use crate::error::Result;
use crate::ids::{CategoryId, ChoiceId, OptionId};

/// Backend field paths.
pub mod fields {
    pub const CATEGORIES: &str = "allCategoriesInfo.categories";
    pub const CATEGORY_INDEX: &str = "allCategoriesInfo.categories.index";
    pub const CATEGORY_ID: &str = "allCategoriesInfo.categories.id";
    pub const MIN_PRICE: &str = "actualPriceRange.minValue.amount";
    pub const MAX_PRICE: &str = "actualPriceRange.maxValue.amount";
    pub const OPTION_NAME: &str = "options.name";
    pub const CHOICE_ID: &str = "options.choicesSettings.choices.choiceId";
    pub const CHOICE_NAME: &str = "options.choicesSettings.choices.name";
    pub const AVAILABILITY: &str = "inventory.availabilityStatus";
    pub const NAME: &str = "name";
    pub const CREATED_DATE: &str = "createdDate";
}

/// Names of the facet aggregations, as echoed back in the response.
pub mod aggregation_names {
    pub const MIN_PRICE: &str = "minPrice";
    pub const MAX_PRICE: &str = "maxPrice";
    pub const OPTION_NAMES: &str = "optionNames";
    pub const CHOICE_NAMES: &str = "choiceNames";
    pub const INVENTORY_STATUS: &str = "inventoryStatus";
}

/// Product fields requested alongside every listing search.
pub const DEFAULT_FIELD_PROJECTION: &[&str] = &[
    "CURRENCY",
    "THUMBNAIL",
    "URL",
    "MEDIA_ITEMS_INFO",
    "VARIANT_OPTION_CHOICE_NAMES",
];

/// A single filter condition.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Product belongs to the category.
    Category(CategoryId),
    /// Minimum product price lies within the bounds. At least one is set.
    Price {
        at_least: Option<f64>,
        at_most: Option<f64>,
    },
    /// Product offers any of the choices of an option.
    OptionChoices {
        option: OptionId,
        choices: Vec<ChoiceId>,
    },
    /// Product availability status is one of the given statuses.
    Inventory(Vec<ChoiceId>),
    /// All conditions hold.
    And(Vec<Condition>),
}

impl Condition {
    /// Combine conditions: none yields `None`, one is returned unwrapped.
    pub fn all(mut conditions: Vec<Condition>) -> Option<Condition> {
        match conditions.len() {
            0 => None,
            1 => conditions.pop(),
            _ => Some(Condition::And(conditions)),
        }
    }

    /// Backend JSON shape of this condition.
    pub fn to_json(&self) -> Value {
        match self {
            Condition::Category(id) => on_field(
                fields::CATEGORIES,
                json!({ "$matchItems": [{ "_id": { "$in": [id] } }] }),
            ),
            Condition::Price { at_least, at_most } => {
                let mut bounds = Map::new();
                if let Some(min) = at_least {
                    bounds.insert("$gte".to_string(), json!(min));
                }
                if let Some(max) = at_most {
                    bounds.insert("$lte".to_string(), json!(max));
                }
                on_field(fields::MIN_PRICE, Value::Object(bounds))
            }
            Condition::OptionChoices { choices, .. } => {
                on_field(fields::CHOICE_ID, json!({ "$hasSome": choices }))
            }
            Condition::Inventory(statuses) => {
                on_field(fields::AVAILABILITY, json!({ "$in": statuses }))
            }
            Condition::And(conditions) => json!({
                "$and": conditions.iter().map(Condition::to_json).collect::<Vec<_>>()
            }),
        }
    }
}

/// `{ path: value }`
fn on_field(path: &str, value: Value) -> Value {
    let mut map = Map::new();
    map.insert(path.to_string(), value);
    Value::Object(map)
}

impl Serialize for Condition {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortOrder {
    Asc,
    Desc,
}

/// One ordering clause.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SortClause {
    pub field_name: String,
    pub order: SortOrder,
    /// Restricts which array element drives the ordering (category index).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub select_items_by: Option<Vec<Value>>,
}

impl SortClause {
    pub fn new(field_name: impl Into<String>, order: SortOrder) -> Self {
        Self {
            field_name: field_name.into(),
            order,
            select_items_by: None,
        }
    }
}

/// Cursor paging clause.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PagingClause {
    pub limit: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
}

impl PagingClause {
    pub fn new(limit: u32, cursor: Option<String>) -> Self {
        Self { limit, cursor }
    }
}

/// Scalar aggregation function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ScalarKind {
    Min,
    Max,
}

/// What an aggregation computes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregationKind {
    /// A single value over the field.
    Scalar(ScalarKind),
    /// The most frequent distinct values, at most `limit` of them.
    Value { limit: u32 },
}

/// A named aggregation over a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Aggregation {
    pub name: String,
    pub field_path: String,
    pub kind: AggregationKind,
}

impl Aggregation {
    pub fn scalar(name: &str, field_path: &str, kind: ScalarKind) -> Self {
        Self {
            name: name.to_string(),
            field_path: field_path.to_string(),
            kind: AggregationKind::Scalar(kind),
        }
    }

    pub fn values(name: &str, field_path: &str, limit: u32) -> Self {
        Self {
            name: name.to_string(),
            field_path: field_path.to_string(),
            kind: AggregationKind::Value { limit },
        }
    }
}

impl Serialize for Aggregation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(4))?;
        map.serialize_entry("name", &self.name)?;
        map.serialize_entry("fieldPath", &self.field_path)?;
        match self.kind {
            AggregationKind::Scalar(kind) => {
                map.serialize_entry("type", "SCALAR")?;
                map.serialize_entry("scalar", &json!({ "type": kind }))?;
            }
            AggregationKind::Value { limit } => {
                map.serialize_entry("type", "VALUE")?;
                map.serialize_entry("value", &json!({ "limit": limit }))?;
            }
        }
        map.end()
    }
}

/// A complete search request.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<Condition>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sort: Vec<SortClause>,
    #[serde(rename = "cursorPaging", skip_serializing_if = "Option::is_none")]
    pub paging: Option<PagingClause>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub aggregations: Vec<Aggregation>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<String>,
}

impl SearchRequest {
    /// Serialize to the backend JSON body.
    pub fn to_json(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }
}
