//! Product and variant records.
//!
//! Only the fields this crate reads are typed. Everything else the backend
//! sends is kept in `extra` and written back out unchanged.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::ids::{ProductId, VariantId};

/// A product as returned by the search API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    /// Embedded variants. `None` when the backend left them out.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variants_info: Option<VariantsInfo>,
    #[serde(default)]
    pub variant_summary: VariantSummary,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Embedded variant list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct VariantsInfo {
    #[serde(default)]
    pub variants: Vec<Variant>,
}

/// Variant counters reported with every product.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct VariantSummary {
    #[serde(default)]
    pub variant_count: u32,
}

impl Product {
    /// Create a product with only an id and name.
    pub fn new(id: impl Into<ProductId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    /// Set the reported variant count.
    pub fn with_variant_count(mut self, count: u32) -> Self {
        self.variant_summary.variant_count = count;
        self
    }

    /// Embed a variant list.
    pub fn with_variants(mut self, variants: Vec<Variant>) -> Self {
        self.variants_info = Some(VariantsInfo { variants });
        self
    }

    /// Embedded variants, if the backend sent them.
    pub fn variants(&self) -> Option<&[Variant]> {
        self.variants_info.as_ref().map(|info| info.variants.as_slice())
    }

    /// Whether variants have to be fetched separately: none are embedded
    /// but the product says it has some.
    pub fn needs_variants(&self) -> bool {
        self.variants_info.is_none() && self.variant_summary.variant_count > 0
    }

    /// Append variants to the embedded list, creating it if needed.
    pub fn merge_variants(&mut self, variants: Vec<Variant>) {
        self.variants_info
            .get_or_insert_with(VariantsInfo::default)
            .variants
            .extend(variants);
    }
}

/// A purchasable configuration of a product.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Variant {
    pub id: VariantId,
    pub product_id: ProductId,
    /// Option name to choice name, e.g. `Size` → `Large`.
    #[serde(default)]
    pub choices: Vec<VariantChoice>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<VariantPrice>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Variant {
    pub fn new(id: impl Into<VariantId>, product_id: impl Into<ProductId>) -> Self {
        Self {
            id: id.into(),
            product_id: product_id.into(),
            ..Default::default()
        }
    }
}

/// One option choice of a variant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VariantChoice {
    pub option_name: String,
    pub choice_name: String,
}

/// Variant price.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VariantPrice {
    pub amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
}
