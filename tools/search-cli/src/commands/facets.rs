//! Facet derivation command.

use anyhow::Result;
use serde::Deserialize;
use tracing::debug;
use turbo_search::api::{AggregationData, Customization};
use turbo_search::facets::{derive_facets, PriceFacet};

use super::FacetsArgs;
use crate::context::{read_json, Context};
use crate::output::format_price;

/// A full search response or just its aggregation data.
#[derive(Deserialize)]
#[serde(untagged)]
enum AggregationFile {
    Response {
        #[serde(rename = "aggregationData")]
        aggregation_data: AggregationData,
    },
    Data(AggregationData),
}

/// A bare customization list or one page of the customizations query.
#[derive(Deserialize)]
#[serde(untagged)]
enum CustomizationsFile {
    List(Vec<Customization>),
    Page { items: Vec<Customization> },
}

/// Run the facets command.
pub async fn run(args: FacetsArgs, ctx: &Context) -> Result<()> {
    let data = match read_json::<AggregationFile>(&args.aggregations)? {
        AggregationFile::Response { aggregation_data } => aggregation_data,
        AggregationFile::Data(data) => data,
    };
    let customizations = match read_json::<CustomizationsFile>(&args.customizations)? {
        CustomizationsFile::List(items) | CustomizationsFile::Page { items } => items,
    };
    ctx.output.debug(&format!(
        "{} aggregation result(s), {} customization(s)",
        data.results.len(),
        customizations.len()
    ));

    let facets = derive_facets(&data, &customizations);
    debug!(
        options = facets.product_options.len(),
        price = ?facets.price_range,
        "facets derived"
    );

    if ctx.output.is_json() {
        ctx.output.json(&facets);
        return Ok(());
    }

    ctx.output.header("Price");
    match facets.price_range {
        PriceFacet::Bounds(range) => {
            ctx.output.kv("min", &format_price(Some(range.min)));
            ctx.output.kv("max", &format_price(range.max));
        }
        _ => ctx.output.info("No price range in this catalog"),
    }

    if facets.product_options.is_empty() {
        ctx.output.info("No option facets in this catalog");
        return Ok(());
    }

    for option in &facets.product_options {
        ctx.output.header(&format!("{} ({})", option.name, option.id));
        for choice in &option.choices {
            ctx.output.list_item(&format!("{} [{}]", choice.name, choice.id));
        }
    }

    Ok(())
}
