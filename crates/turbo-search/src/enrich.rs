//! Fills in variants the search response left out.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::api::{VariantQuery, VariantsApi};
use crate::catalog::{Product, Variant};
use crate::config::SearchConfig;
use crate::error::Result;
use crate::ids::ProductId;

/// Fetches variants for products that report some but embed none.
pub struct VariantEnricher<V> {
    api: Arc<V>,
    batch_size: u32,
}

impl<V: VariantsApi> VariantEnricher<V> {
    pub fn new(api: Arc<V>, batch_size: u32) -> Self {
        Self {
            api,
            batch_size: batch_size.max(1),
        }
    }

    pub fn from_config(api: Arc<V>, config: &SearchConfig) -> Self {
        Self::new(api, config.variant_batch_size)
    }

    /// Return `products` with missing variants filled in.
    ///
    /// Products that need nothing pass through untouched, and when none need
    /// anything the input is returned as is. A product the query returned no
    /// variants for is left as it was. Any backend failure is logged and the
    /// input is returned unmodified.
    pub async fn fetch_missing_variants(&self, mut products: Vec<Product>) -> Vec<Product> {
        let missing: Vec<ProductId> = products
            .iter()
            .filter(|p| p.needs_variants())
            .map(|p| p.id.clone())
            .collect();
        if missing.is_empty() {
            return products;
        }

        let count = missing.len();
        let mut by_product = match self.fetch_variants(missing).await {
            Ok(grouped) => grouped,
            Err(e) => {
                warn!(error = %e, products = count, "variant enrichment failed, keeping products as returned");
                return products;
            }
        };

        let mut merged = 0;
        for product in products.iter_mut().filter(|p| p.needs_variants()) {
            if let Some(variants) = by_product.remove(&product.id) {
                product.merge_variants(variants);
                merged += 1;
            }
        }
        debug!(requested = count, merged, "variants merged");
        products
    }

    async fn fetch_variants(&self, product_ids: Vec<ProductId>) -> Result<HashMap<ProductId, Vec<Variant>>> {
        let mut query = VariantQuery {
            product_ids,
            limit: self.batch_size,
            cursor: None,
        };
        let mut grouped: HashMap<ProductId, Vec<Variant>> = HashMap::new();

        loop {
            let page = self.api.query_variants(&query).await?;
            for variant in page.items {
                grouped.entry(variant.product_id.clone()).or_default().push(variant);
            }
            match page.next_cursor {
                Some(next) if query.cursor.as_deref() != Some(next.as_str()) => query.cursor = Some(next),
                _ => break,
            }
        }

        Ok(grouped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeVariants;

    fn variants(product: &str, n: usize) -> Vec<Variant> {
        (0..n)
            .map(|i| Variant::new(format!("{product}-v{i}"), product))
            .collect()
    }

    #[tokio::test]
    async fn test_nothing_to_enrich_returns_same_list() {
        let api = Arc::new(FakeVariants::new(Vec::new()));
        let enricher = VariantEnricher::new(api.clone(), 100);
        let products = vec![
            Product::new("p1", "Mug"),
            Product::new("p2", "Cup").with_variant_count(2).with_variants(variants("p2", 2)),
        ];
        let ptr = products.as_ptr();

        let out = enricher.fetch_missing_variants(products).await;

        assert_eq!(out.as_ptr(), ptr);
        assert!(api.queries().is_empty());
    }

    #[tokio::test]
    async fn test_merges_by_product() {
        let mut all = variants("p1", 2);
        all.extend(variants("p3", 1));
        let api = Arc::new(FakeVariants::new(all));
        let enricher = VariantEnricher::new(api.clone(), 100);

        let out = enricher
            .fetch_missing_variants(vec![
                Product::new("p1", "Mug").with_variant_count(2),
                Product::new("p2", "Plate"),
                Product::new("p3", "Bowl").with_variant_count(1),
            ])
            .await;

        assert_eq!(out[0].variants().map(|v| v.len()), Some(2));
        assert!(out[1].variants().is_none());
        assert_eq!(out[2].variants().map(|v| v.len()), Some(1));

        let queries = api.queries();
        assert_eq!(queries.len(), 1);
        assert_eq!(queries[0].product_ids, vec![ProductId::new("p1"), ProductId::new("p3")]);
        assert_eq!(queries[0].limit, 100);
    }

    #[tokio::test]
    async fn test_follows_cursor() {
        let api = Arc::new(FakeVariants::new(variants("p1", 5)));
        let enricher = VariantEnricher::new(api.clone(), 2);

        let out = enricher
            .fetch_missing_variants(vec![Product::new("p1", "Mug").with_variant_count(5)])
            .await;

        assert_eq!(out[0].variants().map(|v| v.len()), Some(5));
        assert_eq!(api.queries().len(), 3);
    }

    #[tokio::test]
    async fn test_unmatched_product_is_unchanged() {
        let api = Arc::new(FakeVariants::new(variants("p1", 1)));
        let enricher = VariantEnricher::new(api, 100);
        let plate = Product::new("p2", "Plate").with_variant_count(3);

        let out = enricher
            .fetch_missing_variants(vec![Product::new("p1", "Mug").with_variant_count(1), plate.clone()])
            .await;

        assert_eq!(out[0].variants().map(|v| v.len()), Some(1));
        assert_eq!(out[1], plate);
        assert!(out[1].variants().is_none());
    }

    #[tokio::test]
    async fn test_failure_returns_input() {
        let api = Arc::new(FakeVariants::failing("timeout"));
        let enricher = VariantEnricher::new(api, 100);
        let input = vec![Product::new("p1", "Mug").with_variant_count(3)];

        let out = enricher.fetch_missing_variants(input.clone()).await;

        assert_eq!(out, input);
    }
}
