//! URL decoding command.

use std::sync::Arc;

use anyhow::Result;
use serde_json::json;
use tokio::sync::watch;
use tracing::debug;
use turbo_search::facets::{CatalogFacets, CatalogState};
use turbo_search::filter::{Filter, FilterState, PriceRange};
use turbo_search::ids::CategoryId;
use turbo_search::paging::PagingState;
use turbo_search::sort::SortState;
use turbo_search::url_state::{MemoryUrl, UrlParams, UrlStateSync};

use super::UrlArgs;
use crate::context::{read_json, Context};
use crate::output::format_price;

/// Run the url command.
pub async fn run(args: UrlArgs, ctx: &Context) -> Result<()> {
    let facets: CatalogFacets = read_json(&args.facets)?;
    let params: UrlParams = args.query.parse()?;

    let url = Arc::new(MemoryUrl::new(params.to_query_string()));
    let filter_state = Arc::new(FilterState::new(Filter::new(facets.default_price_range())));
    let sort_state = Arc::new(SortState::default());
    let (_catalog, catalog_rx) = watch::channel(CatalogState {
        facets: facets.clone(),
        ..Default::default()
    });
    let sync = UrlStateSync::new(url.clone(), filter_state.clone(), sort_state.clone(), catalog_rx);

    let changed = sync.restore_from_url();
    debug!(changed, query = %params, "restored filter and sort from URL");
    let restored = filter_state.current();
    let sort = sort_state.current();

    // Writing the restored state back yields the canonical query.
    sync.apply_filters(restored.clone());
    let canonical = url.query_string();

    let category = args.category.as_deref().map(CategoryId::new);
    let paging = PagingState::first_page(args.limit.unwrap_or(ctx.config.default_page_size));
    let request = ctx
        .builder()
        .build(Some(&restored), category.as_ref(), Some(sort), Some(&paging.to_clause()));

    if ctx.output.is_json() {
        ctx.output.json(&json!({
            "filter": restored,
            "sort": sort.as_param(),
            "canonicalQuery": canonical,
            "request": request.to_json()?,
        }));
        return Ok(());
    }

    ctx.output.header("Filter");
    let PriceRange { min, max } = restored.price_range;
    ctx.output.kv("min price", &format_price(Some(min)));
    ctx.output.kv("max price", &format_price(max));
    for (option_id, choices) in &restored.selected_options {
        let option_name = facets
            .option(option_id)
            .map_or(option_id.as_str(), |o| o.name.as_str());
        let names: Vec<_> = choices.iter().map(|c| c.as_str()).collect();
        ctx.output.list_item(&format!("{}: {}", option_name, names.join(", ")));
    }
    ctx.output.kv("sort", sort.display_name());

    let kept = UrlParams::parse(&canonical);
    let dropped: Vec<_> = params.keys().filter(|key| !kept.contains_key(key)).collect();
    if !dropped.is_empty() {
        ctx.output.warn(&format!("Dropped unrecognized values for: {}", dropped.join(", ")));
    }

    ctx.output.header("Canonical query");
    ctx.output.info(if canonical.is_empty() { "(empty)" } else { canonical.as_str() });

    ctx.output.header("Request");
    ctx.output.json(&request.to_json()?);
    Ok(())
}
