//! Catalog query engine: filter, sort, and paginate marketplace listings.
//!
//! Every listing page (products, services, freelance projects) funnels its UI
//! state through [`query`] whenever a control changes. The engine is pure and
//! synchronous: it owns no state, performs no I/O, and never mutates its
//! input, so concurrent invocations over shared snapshots are safe.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use souq_core::{ExperienceLevel, Listing, Pricing};

pub const CRATE_NAME: &str = "souq-catalog";

/// Caller-supplied pure extractor producing the single numeric value used for
/// price filtering and sorting. `None` means the listing has no usable amount:
/// range filters exclude it and price sorts order it last.
pub type AmountFn<'a> = &'a dyn Fn(&Listing) -> Option<f64>;

/// Standard extractor covering all three pricing shapes: flat price for
/// products, cheapest package for services, budget ceiling for projects.
pub fn effective_amount(listing: &Listing) -> Option<f64> {
    match &listing.pricing {
        Pricing::Flat { .. } => listing.pricing.flat(),
        Pricing::Tiered { .. } => listing.pricing.cheapest(),
        Pricing::Budget { .. } => listing.pricing.budget_max(),
    }
}

/// Inclusive numeric filter bounds. An inverted range (`min > max`) matches
/// nothing; the UI bug degrades to an empty result rather than an error.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AmountRange {
    pub min: f64,
    pub max: f64,
}

impl AmountRange {
    pub fn contains(&self, amount: f64) -> bool {
        self.min <= amount && amount <= self.max
    }
}

/// Orderings exposed by the listing-page sort controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortKey {
    #[default]
    Recommended,
    Newest,
    PriceAsc,
    PriceDesc,
    TopRated,
    MostReviewed,
    LeastReviewed,
}

impl SortKey {
    /// Parses the URL query-string value. Unknown strings fall back to
    /// [`SortKey::Recommended`] instead of erroring.
    pub fn parse_or_default(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "recommended" => SortKey::Recommended,
            "newest" => SortKey::Newest,
            "price-low" | "price-asc" => SortKey::PriceAsc,
            "price-high" | "price-desc" => SortKey::PriceDesc,
            "rating" | "top-rated" => SortKey::TopRated,
            "most-reviewed" => SortKey::MostReviewed,
            "least-reviewed" | "fewest-proposals" => SortKey::LeastReviewed,
            _ => SortKey::Recommended,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::Recommended => "recommended",
            SortKey::Newest => "newest",
            SortKey::PriceAsc => "price-low",
            SortKey::PriceDesc => "price-high",
            SortKey::TopRated => "rating",
            SortKey::MostReviewed => "most-reviewed",
            SortKey::LeastReviewed => "least-reviewed",
        }
    }
}

/// Normalized filter/sort/page state for one catalog query, derived from UI
/// controls and URL query-string state.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogQuery {
    pub search_text: Option<String>,
    pub category_id: Option<String>,
    pub amount_range: Option<AmountRange>,
    pub experience_level: Option<ExperienceLevel>,
    pub max_delivery_days: Option<u32>,
    pub sort: SortKey,
    /// 1-based. A page past the end yields an empty page, not an error.
    pub page: usize,
    pub page_size: usize,
}

impl CatalogQuery {
    pub fn new(page_size: usize) -> Self {
        Self {
            search_text: None,
            category_id: None,
            amount_range: None,
            experience_level: None,
            max_delivery_days: None,
            sort: SortKey::Recommended,
            page: 1,
            page_size,
        }
    }
}

/// One page of results plus the pre-pagination totals the pager needs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogPage {
    pub items: Vec<Listing>,
    pub total_count: usize,
    pub total_pages: usize,
    pub page: usize,
}

/// Per-category count over the otherwise-filtered collection, for the facet
/// sidebar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryCount {
    pub category_id: String,
    pub count: usize,
    pub selected: bool,
}

/// Applies every active predicate, AND-composed. Each predicate is a no-op
/// when its parameter is unset, so application order never matters.
///
/// Panics when a numeric range is requested without an amount extractor;
/// that is a wiring bug in the caller, unlike the data-driven edge cases
/// which all degrade gracefully.
pub fn filter<'a>(
    records: &'a [Listing],
    query: &CatalogQuery,
    amount: Option<AmountFn>,
) -> Vec<&'a Listing> {
    if query.amount_range.is_some() {
        assert!(
            amount.is_some(),
            "amount_range filter requires an effective-amount extractor"
        );
    }

    let needle = query
        .search_text
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase);

    records
        .iter()
        .filter(|listing| {
            if let Some(needle) = &needle {
                if !listing.matches_text(needle) {
                    return false;
                }
            }
            if let Some(category_id) = &query.category_id {
                if &listing.category_id != category_id {
                    return false;
                }
            }
            if let Some(range) = &query.amount_range {
                let extract = amount.expect("checked above");
                match extract(listing) {
                    Some(value) if range.contains(value) => {}
                    // Missing amounts fail the filter so incomplete
                    // listings are not silently included.
                    _ => return false,
                }
            }
            if let Some(level) = query.experience_level {
                if listing.experience_level != Some(level) {
                    return false;
                }
            }
            if let Some(ceiling) = query.max_delivery_days {
                match listing.delivery_days {
                    Some(days) if days <= ceiling => {}
                    _ => return false,
                }
            }
            true
        })
        .collect()
}

/// Orders the filtered collection. `Vec::sort_by` is stable, so equal-key
/// records keep their input order beyond the documented tie-breaks.
pub fn sort<'a>(
    mut records: Vec<&'a Listing>,
    key: SortKey,
    amount: Option<AmountFn>,
) -> Vec<&'a Listing> {
    match key {
        SortKey::Recommended => {
            // Completed-order count is the reputation signal; without one the
            // ordering degenerates to newest-first.
            records.sort_by(|a, b| {
                b.seller_completed_orders
                    .cmp(&a.seller_completed_orders)
                    .then_with(|| b.created_at.cmp(&a.created_at))
                    .then_with(|| a.id.cmp(&b.id))
            });
        }
        SortKey::Newest => {
            records.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        }
        SortKey::PriceAsc => {
            records.sort_by(|a, b| {
                cmp_amounts(extract(amount, a), extract(amount, b), false)
                    .then_with(|| a.id.cmp(&b.id))
            });
        }
        SortKey::PriceDesc => {
            records.sort_by(|a, b| {
                cmp_amounts(extract(amount, a), extract(amount, b), true)
                    .then_with(|| a.id.cmp(&b.id))
            });
        }
        SortKey::TopRated => {
            records.sort_by(|a, b| {
                b.rating
                    .total_cmp(&a.rating)
                    .then_with(|| b.review_count.cmp(&a.review_count))
                    .then_with(|| a.id.cmp(&b.id))
            });
        }
        SortKey::MostReviewed => {
            records.sort_by(|a, b| {
                b.review_count
                    .cmp(&a.review_count)
                    .then_with(|| a.id.cmp(&b.id))
            });
        }
        SortKey::LeastReviewed => {
            records.sort_by(|a, b| {
                a.review_count
                    .cmp(&b.review_count)
                    .then_with(|| a.id.cmp(&b.id))
            });
        }
    }
    records
}

fn extract(amount: Option<AmountFn>, listing: &Listing) -> Option<f64> {
    amount.and_then(|f| f(listing))
}

/// Listings without an amount sort last regardless of direction.
fn cmp_amounts(a: Option<f64>, b: Option<f64>, descending: bool) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => {
            if descending {
                y.total_cmp(&x)
            } else {
                x.total_cmp(&y)
            }
        }
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Slices the sorted collection into a fixed-size page and reports totals.
/// An out-of-range page yields empty `items` with accurate counts.
pub fn paginate(records: Vec<&Listing>, page: usize, page_size: usize) -> CatalogPage {
    assert!(page_size > 0, "page_size must be positive");
    let page = page.max(1);

    let total_count = records.len();
    let total_pages = total_count.max(1).div_ceil(page_size);

    let start = (page - 1).saturating_mul(page_size);
    let items = if start >= total_count {
        Vec::new()
    } else {
        records[start..(start + page_size).min(total_count)]
            .iter()
            .map(|listing| (*listing).clone())
            .collect()
    };

    CatalogPage {
        items,
        total_count,
        total_pages,
        page,
    }
}

/// The engine entry point: `paginate(sort(filter(records)))`.
///
/// Pure function: identical inputs always produce identical output. All
/// data-driven edge cases (unknown sort strings, inverted ranges, pages past
/// the end, missing amounts) degrade to well-defined results; only caller
/// wiring bugs panic (see [`filter`] and [`paginate`]).
pub fn query(records: &[Listing], params: &CatalogQuery, amount: Option<AmountFn>) -> CatalogPage {
    let filtered = filter(records, params, amount);
    let ordered = sort(filtered, params.sort, amount);
    paginate(ordered, params.page, params.page_size)
}

/// Per-category counts for the facet sidebar. Each count honors every active
/// filter except the category selection itself, so the numbers shown match
/// what clicking that facet would produce.
pub fn category_counts(
    records: &[Listing],
    params: &CatalogQuery,
    amount: Option<AmountFn>,
) -> Vec<CategoryCount> {
    let mut without_category = params.clone();
    without_category.category_id = None;

    let mut counts = BTreeMap::<String, usize>::new();
    for listing in filter(records, &without_category, amount) {
        *counts.entry(listing.category_id.clone()).or_default() += 1;
    }

    let selected_id = params.category_id.clone().unwrap_or_default();
    counts
        .into_iter()
        .map(|(category_id, count)| CategoryCount {
            selected: !selected_id.is_empty() && selected_id == category_id,
            category_id,
            count,
        })
        .collect()
}
