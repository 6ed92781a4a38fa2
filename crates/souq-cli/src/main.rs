use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use souq_catalog::{effective_amount, AmountRange, CatalogQuery, SortKey};
use souq_core::{ListingKind, Locale, Pricing};

#[derive(Debug, Parser)]
#[command(name = "souq-cli")]
#[command(about = "SOUQ marketplace catalog command-line interface")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run the web UI.
    Serve,
    /// Run a catalog query against the local catalog and print the page.
    Query {
        /// Listing kind: product, service, or project.
        #[arg(long, default_value = "product")]
        kind: String,
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        min: Option<f64>,
        #[arg(long)]
        max: Option<f64>,
        /// Sort key; unknown values fall back to "recommended".
        #[arg(long, default_value = "recommended")]
        sort: String,
        #[arg(long, default_value_t = 1)]
        page: usize,
        /// Display locale: ar or en.
        #[arg(long, default_value = "en")]
        lang: String,
        /// Catalog root holding fixtures/ and categories.yaml.
        #[arg(long, default_value = ".")]
        root: PathBuf,
    },
}

fn parse_kind(raw: &str) -> Result<ListingKind> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "product" | "products" => Ok(ListingKind::Product),
        "service" | "services" => Ok(ListingKind::Service),
        "project" | "projects" => Ok(ListingKind::Project),
        other => bail!("unknown listing kind {other:?} (expected product, service, or project)"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => souq_web::serve_from_env().await?,
        Commands::Query {
            kind,
            search,
            category,
            min,
            max,
            sort,
            page,
            lang,
            root,
        } => {
            let kind = parse_kind(&kind)?;
            let locale = Locale::parse_or_default(&lang);

            let mut params = CatalogQuery::new(kind.page_size());
            params.search_text = search;
            params.category_id = category;
            if min.is_some() || max.is_some() {
                params.amount_range = Some(AmountRange {
                    min: min.unwrap_or(0.0),
                    max: max.unwrap_or(f64::MAX),
                });
            }
            params.sort = SortKey::parse_or_default(&sort);
            params.page = page.max(1);

            let snapshot: Vec<_> = souq_store::load_catalog(&root)
                .await
                .into_iter()
                .filter(|l| l.kind == kind)
                .collect();
            let result = souq_catalog::query(&snapshot, &params, Some(&effective_amount));

            for listing in &result.items {
                let amount = match &listing.pricing {
                    Pricing::Budget { min, max } => format!("{min:.0}-{max:.0}"),
                    _ => effective_amount(listing)
                        .map(|v| format!("{v:.0}"))
                        .unwrap_or_else(|| "-".to_string()),
                };
                println!(
                    "{}  {:<40}  {:<16}  SAR {}",
                    listing.id,
                    listing.title.get(locale),
                    listing.category_id,
                    amount
                );
            }
            println!(
                "page {}/{} ({} results, sort={})",
                result.page,
                result.total_pages,
                result.total_count,
                params.sort.as_str()
            );
        }
    }

    Ok(())
}
