//! CLI command implementations.

pub mod facets;
pub mod request;
pub mod url;

use clap::Args;

/// Arguments for the request command.
#[derive(Args)]
pub struct RequestArgs {
    /// Category to search in.
    #[arg(long)]
    pub category: Option<String>,

    /// Lower price bound.
    #[arg(long)]
    pub min_price: Option<f64>,

    /// Upper price bound.
    #[arg(long)]
    pub max_price: Option<f64>,

    /// Selected choice as OPTION_ID=CHOICE_ID. Repeatable.
    #[arg(short, long = "option", value_name = "OPTION=CHOICE")]
    pub options: Vec<String>,

    /// Sort token (name_asc, name_desc, price_asc, price_desc, recommended, newest).
    #[arg(short, long)]
    pub sort: Option<String>,

    /// Page size (default: from config).
    #[arg(short, long)]
    pub limit: Option<u32>,

    /// Number of "load more" steps applied to the page size.
    #[arg(long, default_value_t = 0)]
    pub load_more: u32,

    /// Page cursor.
    #[arg(long)]
    pub cursor: Option<String>,

    /// Build the facet aggregation request instead.
    #[arg(long, conflicts_with_all = ["min_price", "max_price", "options", "sort", "cursor"])]
    pub aggregation: bool,
}

/// Arguments for the facets command.
#[derive(Args)]
pub struct FacetsArgs {
    /// Search response or aggregation data JSON file.
    #[arg(short, long)]
    pub aggregations: String,

    /// Customizations JSON file (a list or a page with `items`).
    #[arg(short, long)]
    pub customizations: String,
}

/// Arguments for the url command.
#[derive(Args)]
pub struct UrlArgs {
    /// Query string, with or without the leading `?`.
    pub query: String,

    /// Facets JSON file, as printed by `tsearch --json facets`.
    #[arg(short, long)]
    pub facets: String,

    /// Category to search in.
    #[arg(long)]
    pub category: Option<String>,

    /// Page size (default: from config).
    #[arg(short, long)]
    pub limit: Option<u32>,
}
