//! End-to-end engine runs over the built-in demo catalog.

use souq_catalog::{effective_amount, AmountRange, CatalogPage, CatalogQuery, SortKey};
use souq_core::{Listing, ListingKind};
use souq_store::demo_listings;

fn of_kind(kind: ListingKind) -> Vec<Listing> {
    demo_listings()
        .into_iter()
        .filter(|l| l.kind == kind)
        .collect()
}

fn run(records: &[Listing], params: &CatalogQuery) -> CatalogPage {
    souq_catalog::query(records, params, Some(&effective_amount))
}

#[test]
fn product_page_fits_the_whole_demo_set() {
    let products = of_kind(ListingKind::Product);
    let params = CatalogQuery::new(ListingKind::Product.page_size());
    let page = run(&products, &params);
    assert_eq!(page.total_count, 6);
    assert_eq!(page.total_pages, 1);
    assert_eq!(page.items.len(), 6);
}

#[test]
fn cheapest_demo_product_leads_the_price_sort() {
    let products = of_kind(ListingKind::Product);
    let mut params = CatalogQuery::new(ListingKind::Product.page_size());
    params.sort = SortKey::PriceAsc;
    let page = run(&products, &params);
    assert_eq!(page.items[0].title.en, "Arabic Font Collection");
    let prices: Vec<f64> = page
        .items
        .iter()
        .map(|l| effective_amount(l).expect("demo products are priced"))
        .collect();
    assert!(prices.windows(2).all(|w| w[0] <= w[1]));
}

#[test]
fn service_from_prices_use_the_cheapest_package() {
    let services = of_kind(ListingKind::Service);
    let mut params = CatalogQuery::new(ListingKind::Service.page_size());
    params.amount_range = Some(AmountRange {
        min: 0.0,
        max: 200.0,
    });
    // Basic-tier prices in the demo set: 150, 80, 400.
    let page = run(&services, &params);
    assert_eq!(page.total_count, 2);
}

#[test]
fn project_budget_filter_uses_the_budget_ceiling() {
    let projects = of_kind(ListingKind::Project);
    let mut params = CatalogQuery::new(ListingKind::Project.page_size());
    params.amount_range = Some(AmountRange {
        min: 0.0,
        max: 1000.0,
    });
    // Only the portfolio site (max 900) and content review (max 400) fit.
    let page = run(&projects, &params);
    assert_eq!(page.total_count, 2);
}

#[test]
fn skill_search_is_case_insensitive_across_projects() {
    let projects = of_kind(ListingKind::Project);
    let mut params = CatalogQuery::new(ListingKind::Project.page_size());
    params.search_text = Some("react".to_string());
    // React Native app + React portfolio site.
    assert_eq!(run(&projects, &params).total_count, 2);
}

#[test]
fn recommended_order_is_stable_between_runs() {
    let services = of_kind(ListingKind::Service);
    let params = CatalogQuery::new(ListingKind::Service.page_size());
    let first = run(&services, &params);
    let second = run(&services, &params);
    assert_eq!(first, second);
    // Highest completed-order seller first.
    assert_eq!(first.items[0].title.en, "Logo Design");
}
