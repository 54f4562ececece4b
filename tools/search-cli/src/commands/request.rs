//! Request building command.

use anyhow::{bail, Result};
use turbo_search::filter::{Filter, PriceRange};
use turbo_search::ids::CategoryId;
use turbo_search::paging::PagingState;
use turbo_search::request::build_aggregation_request;
use turbo_search::sort::SortSpec;

use super::RequestArgs;
use crate::context::Context;

/// Run the request command.
pub async fn run(args: RequestArgs, ctx: &Context) -> Result<()> {
    let category = args.category.as_deref().map(CategoryId::new);

    let request = if args.aggregation {
        ctx.output.debug("Building facet aggregation request");
        build_aggregation_request(category.as_ref(), &ctx.config.aggregation)
    } else {
        let filter = filter_from_args(&args)?;
        let sort = args.sort.as_deref().map(str::parse::<SortSpec>).transpose()?;

        let base = args.limit.unwrap_or(ctx.config.default_page_size);
        let paging = PagingState {
            limit: base.saturating_add(args.load_more.saturating_mul(ctx.config.load_more_step)),
            cursor: args.cursor.clone(),
        };
        ctx.output.debug(&format!(
            "Building listing request: limit {}, {} option(s)",
            paging.limit,
            filter.selected_options.len()
        ));

        ctx.builder()
            .build(Some(&filter), category.as_ref(), sort, Some(&paging.to_clause()))
    };

    ctx.output.json(&request.to_json()?);
    Ok(())
}

fn filter_from_args(args: &RequestArgs) -> Result<Filter> {
    let mut filter = Filter::new(PriceRange {
        min: args.min_price.unwrap_or(0.0),
        max: args.max_price,
    });

    for selection in &args.options {
        let Some((option, choice)) = selection.split_once('=') else {
            bail!("Invalid option selection '{}': expected OPTION=CHOICE", selection);
        };
        if option.is_empty() || choice.is_empty() {
            bail!("Invalid option selection '{}': expected OPTION=CHOICE", selection);
        }
        filter.select(option.into(), choice.into());
    }

    Ok(filter)
}
