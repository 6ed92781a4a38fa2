//! Axum + Askama web UI for the SOUQ marketplace catalog.
//!
//! Each listing kind has a page shell plus htmx table/facet partials that are
//! re-fetched whenever a filter, sort, or pager control changes; the partial
//! handlers decode the URL state into a [`CatalogQuery`] and run the engine
//! over the current catalog snapshot.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use askama::Template;
use axum::{
    extract::{Path as AxumPath, Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use serde::Deserialize;
use souq_catalog::{effective_amount, AmountRange, CatalogQuery, SortKey};
use souq_core::{Category, ExperienceLevel, Listing, ListingKind, Locale, Pricing};
use tokio::net::TcpListener;
use uuid::Uuid;

pub const CRATE_NAME: &str = "souq-web";

#[derive(Clone)]
pub struct AppState {
    pub workspace_root: PathBuf,
}

impl AppState {
    pub fn new(workspace_root: impl Into<PathBuf>) -> Self {
        Self {
            workspace_root: workspace_root.into(),
        }
    }
}

/// URL query-string state for the listing pages and their partials.
#[derive(Debug, Deserialize, Default)]
pub struct ListingsQuery {
    pub q: Option<String>,
    pub category: Option<String>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub level: Option<String>,
    pub delivery: Option<u32>,
    pub sort: Option<String>,
    pub page: Option<usize>,
    pub lang: Option<String>,
}

impl ListingsQuery {
    fn locale(&self) -> Locale {
        self.lang
            .as_deref()
            .map(Locale::parse_or_default)
            .unwrap_or_default()
    }

    /// Decodes URL state into engine parameters. Bad values degrade the same
    /// way the engine does: unknown sort strings become `recommended`, page
    /// defaults to 1, an inverted min/max simply matches nothing.
    fn to_catalog_query(&self, kind: ListingKind) -> CatalogQuery {
        let mut params = CatalogQuery::new(kind.page_size());
        params.search_text = self.q.clone();
        params.category_id = self.category.clone().filter(|c| !c.is_empty());
        if self.min.is_some() || self.max.is_some() {
            params.amount_range = Some(AmountRange {
                min: self.min.unwrap_or(0.0),
                max: self.max.unwrap_or(f64::MAX),
            });
        }
        params.experience_level = self.level.as_deref().and_then(parse_level);
        params.max_delivery_days = self.delivery;
        params.sort = self
            .sort
            .as_deref()
            .map(SortKey::parse_or_default)
            .unwrap_or_default();
        params.page = self.page.unwrap_or(1).max(1);
        params
    }

    /// Re-encodes the active parameters so the shell can point its htmx
    /// partials at the same state.
    fn to_query_string(&self) -> String {
        let mut pairs: Vec<String> = Vec::new();
        if let Some(q) = self.q.as_deref().filter(|s| !s.trim().is_empty()) {
            pairs.push(format!("q={q}"));
        }
        if let Some(category) = self.category.as_deref().filter(|s| !s.is_empty()) {
            pairs.push(format!("category={category}"));
        }
        if let Some(min) = self.min {
            pairs.push(format!("min={min}"));
        }
        if let Some(max) = self.max {
            pairs.push(format!("max={max}"));
        }
        if let Some(level) = self.level.as_deref().filter(|s| !s.is_empty()) {
            pairs.push(format!("level={level}"));
        }
        if let Some(delivery) = self.delivery {
            pairs.push(format!("delivery={delivery}"));
        }
        if let Some(sort) = self.sort.as_deref().filter(|s| !s.is_empty()) {
            pairs.push(format!("sort={sort}"));
        }
        if let Some(page) = self.page {
            pairs.push(format!("page={page}"));
        }
        if let Some(lang) = self.lang.as_deref().filter(|s| !s.is_empty()) {
            pairs.push(format!("lang={lang}"));
        }
        if pairs.is_empty() {
            String::new()
        } else {
            format!("?{}", pairs.join("&"))
        }
    }
}

fn parse_level(raw: &str) -> Option<ExperienceLevel> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "entry" => Some(ExperienceLevel::Entry),
        "intermediate" => Some(ExperienceLevel::Intermediate),
        "expert" => Some(ExperienceLevel::Expert),
        _ => None,
    }
}

/// One listing prepared for rendering: locale already resolved, price already
/// formatted for the listing kind.
#[derive(Debug, Clone)]
pub struct ListingRow {
    pub id: String,
    pub title: String,
    pub category_id: String,
    pub price_label: String,
    pub rating_label: String,
    pub review_count: u32,
}

#[derive(Debug, Clone)]
struct FacetRow {
    category_id: String,
    name: String,
    count: usize,
    selected: bool,
}

#[derive(Template)]
#[template(path = "index.html")]
struct IndexTemplate {
    total_products: usize,
    total_services: usize,
    total_projects: usize,
    total_categories: usize,
}

#[derive(Template)]
#[template(path = "listings.html")]
struct ListingsPageTemplate {
    heading: String,
    kind_path: String,
    lang: String,
    rtl: bool,
    search_value: String,
    sort_value: String,
    partial_query: String,
}

#[derive(Template)]
#[template(path = "listings_table_partial.html")]
struct ListingsTablePartialTemplate {
    rows: Vec<ListingRow>,
    page: usize,
    total_pages: usize,
    total_count: usize,
}

#[derive(Template)]
#[template(path = "listings_facets_partial.html")]
struct ListingsFacetsPartialTemplate {
    kind_path: String,
    facets: Vec<FacetRow>,
    all_selected: bool,
}

#[derive(Template)]
#[template(path = "listing_detail.html")]
struct ListingDetailTemplate {
    title: String,
    description: String,
    category_id: String,
    price_label: String,
    rating_label: String,
    review_count: u32,
    tags_text: String,
    packages: Vec<PackageRow>,
}

#[derive(Debug, Clone)]
struct PackageRow {
    tier: String,
    price_label: String,
    delivery_days: u32,
    revision_count: u32,
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/products", get(products_page_handler))
        .route("/products/table", get(products_table_handler))
        .route("/products/facets", get(products_facets_handler))
        .route("/services", get(services_page_handler))
        .route("/services/table", get(services_table_handler))
        .route("/services/facets", get(services_facets_handler))
        .route("/projects", get(projects_page_handler))
        .route("/projects/table", get(projects_table_handler))
        .route("/projects/facets", get(projects_facets_handler))
        .route("/listings/{id}", get(listing_detail_handler))
        .route("/assets/static/app.css", get(app_css_handler))
        .with_state(Arc::new(state))
}

pub async fn serve_from_env() -> anyhow::Result<()> {
    let port: u16 = std::env::var("SOUQ_WEB_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(8000);
    let state = AppState::new(".");
    let listener = TcpListener::bind(("0.0.0.0", port)).await?;
    axum::serve(listener, app(state)).await?;
    Ok(())
}

async fn index_handler(State(state): State<Arc<AppState>>) -> Response {
    let listings = souq_store::load_catalog(&state.workspace_root).await;
    let categories = souq_store::load_categories(&state.workspace_root).await;
    let count_of = |kind: ListingKind| listings.iter().filter(|l| l.kind == kind).count();
    render_html(IndexTemplate {
        total_products: count_of(ListingKind::Product),
        total_services: count_of(ListingKind::Service),
        total_projects: count_of(ListingKind::Project),
        total_categories: categories.len(),
    })
}

async fn products_page_handler(
    state: State<Arc<AppState>>,
    query: Query<ListingsQuery>,
) -> Response {
    listings_page(state, query, ListingKind::Product).await
}

async fn products_table_handler(
    state: State<Arc<AppState>>,
    query: Query<ListingsQuery>,
) -> Response {
    listings_table(state, query, ListingKind::Product).await
}

async fn products_facets_handler(
    state: State<Arc<AppState>>,
    query: Query<ListingsQuery>,
) -> Response {
    listings_facets(state, query, ListingKind::Product).await
}

async fn services_page_handler(
    state: State<Arc<AppState>>,
    query: Query<ListingsQuery>,
) -> Response {
    listings_page(state, query, ListingKind::Service).await
}

async fn services_table_handler(
    state: State<Arc<AppState>>,
    query: Query<ListingsQuery>,
) -> Response {
    listings_table(state, query, ListingKind::Service).await
}

async fn services_facets_handler(
    state: State<Arc<AppState>>,
    query: Query<ListingsQuery>,
) -> Response {
    listings_facets(state, query, ListingKind::Service).await
}

async fn projects_page_handler(
    state: State<Arc<AppState>>,
    query: Query<ListingsQuery>,
) -> Response {
    listings_page(state, query, ListingKind::Project).await
}

async fn projects_table_handler(
    state: State<Arc<AppState>>,
    query: Query<ListingsQuery>,
) -> Response {
    listings_table(state, query, ListingKind::Project).await
}

async fn projects_facets_handler(
    state: State<Arc<AppState>>,
    query: Query<ListingsQuery>,
) -> Response {
    listings_facets(state, query, ListingKind::Project).await
}

fn kind_path(kind: ListingKind) -> &'static str {
    match kind {
        ListingKind::Product => "products",
        ListingKind::Service => "services",
        ListingKind::Project => "projects",
    }
}

fn heading(kind: ListingKind, locale: Locale) -> &'static str {
    match (kind, locale) {
        (ListingKind::Product, Locale::En) => "Ready-Made Products",
        (ListingKind::Product, Locale::Ar) => "منتجات جاهزة",
        (ListingKind::Service, Locale::En) => "Custom Services",
        (ListingKind::Service, Locale::Ar) => "خدمات مخصصة",
        (ListingKind::Project, Locale::En) => "Freelance Projects",
        (ListingKind::Project, Locale::Ar) => "مشاريع العمل الحر",
    }
}

async fn listings_page(
    State(_state): State<Arc<AppState>>,
    Query(query): Query<ListingsQuery>,
    kind: ListingKind,
) -> Response {
    let locale = query.locale();
    render_html(ListingsPageTemplate {
        heading: heading(kind, locale).to_string(),
        kind_path: kind_path(kind).to_string(),
        lang: locale.as_str().to_string(),
        rtl: locale == Locale::Ar,
        search_value: query.q.clone().unwrap_or_default(),
        sort_value: query
            .sort
            .as_deref()
            .map(SortKey::parse_or_default)
            .unwrap_or_default()
            .as_str()
            .to_string(),
        partial_query: query.to_query_string(),
    })
}

async fn listings_table(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListingsQuery>,
    kind: ListingKind,
) -> Response {
    let locale = query.locale();
    let params = query.to_catalog_query(kind);
    let snapshot = catalog_of_kind(&state.workspace_root, kind).await;
    let page = souq_catalog::query(&snapshot, &params, Some(&effective_amount));

    let rows = page
        .items
        .iter()
        .map(|listing| listing_row(listing, locale))
        .collect();
    let mut resp = render_html(ListingsTablePartialTemplate {
        rows,
        page: page.page,
        total_pages: page.total_pages,
        total_count: page.total_count,
    });
    resp.headers_mut().insert(
        header::HeaderName::from_static("hx-trigger"),
        header::HeaderValue::from_static("listingsTableLoaded"),
    );
    resp
}

async fn listings_facets(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListingsQuery>,
    kind: ListingKind,
) -> Response {
    let locale = query.locale();
    let params = query.to_catalog_query(kind);
    let snapshot = catalog_of_kind(&state.workspace_root, kind).await;
    let categories = souq_store::load_categories(&state.workspace_root).await;

    let facets = souq_catalog::category_counts(&snapshot, &params, Some(&effective_amount))
        .into_iter()
        .map(|facet| FacetRow {
            name: category_name(&categories, &facet.category_id, locale),
            category_id: facet.category_id,
            count: facet.count,
            selected: facet.selected,
        })
        .collect::<Vec<_>>();
    let all_selected = params.category_id.is_none();
    render_html(ListingsFacetsPartialTemplate {
        kind_path: kind_path(kind).to_string(),
        facets,
        all_selected,
    })
}

async fn listing_detail_handler(
    State(state): State<Arc<AppState>>,
    AxumPath(id): AxumPath<String>,
    Query(query): Query<ListingsQuery>,
) -> Response {
    let Ok(id) = Uuid::parse_str(&id) else {
        return (StatusCode::NOT_FOUND, Html("Listing not found".to_string())).into_response();
    };
    let locale = query.locale();
    let listings = souq_store::load_catalog(&state.workspace_root).await;
    let Some(listing) = listings.into_iter().find(|l| l.id == id) else {
        return (StatusCode::NOT_FOUND, Html("Listing not found".to_string())).into_response();
    };

    let tags_text = if listing.tags.is_empty() {
        "none".to_string()
    } else {
        listing.tags.join(", ")
    };
    let packages = match &listing.pricing {
        Pricing::Tiered { packages } => packages
            .iter()
            .map(|p| PackageRow {
                tier: format!("{:?}", p.tier),
                price_label: format!("SAR {:.0}", p.price),
                delivery_days: p.delivery_days,
                revision_count: p.revision_count,
            })
            .collect(),
        _ => Vec::new(),
    };
    render_html(ListingDetailTemplate {
        title: listing.title.get(locale).to_string(),
        description: listing.description.get(locale).to_string(),
        category_id: listing.category_id.clone(),
        price_label: price_label(&listing),
        rating_label: rating_label(&listing),
        review_count: listing.review_count,
        tags_text,
        packages,
    })
}

async fn app_css_handler(State(state): State<Arc<AppState>>) -> Response {
    let css_path = state.workspace_root.join("assets/static/app.css");
    match tokio::fs::read_to_string(&css_path).await {
        Ok(css) => ([(header::CONTENT_TYPE, "text/css; charset=utf-8")], css).into_response(),
        Err(_) => (
            StatusCode::NOT_FOUND,
            Html("/* missing app.css */".to_string()),
        )
            .into_response(),
    }
}

async fn catalog_of_kind(workspace_root: &Path, kind: ListingKind) -> Vec<Listing> {
    souq_store::load_catalog(workspace_root)
        .await
        .into_iter()
        .filter(|l| l.kind == kind)
        .collect()
}

fn category_name(categories: &[Category], category_id: &str, locale: Locale) -> String {
    categories
        .iter()
        .find(|c| c.id == category_id)
        .map(|c| c.name.get(locale).to_string())
        .unwrap_or_else(|| category_id.to_string())
}

fn listing_row(listing: &Listing, locale: Locale) -> ListingRow {
    ListingRow {
        id: listing.id.to_string(),
        title: listing.title.get(locale).to_string(),
        category_id: listing.category_id.clone(),
        price_label: price_label(listing),
        rating_label: rating_label(listing),
        review_count: listing.review_count,
    }
}

fn price_label(listing: &Listing) -> String {
    match &listing.pricing {
        Pricing::Flat { price } => format!("SAR {price:.0}"),
        Pricing::Tiered { .. } => match listing.pricing.cheapest() {
            Some(price) => format!("From SAR {price:.0}"),
            None => "Price on request".to_string(),
        },
        Pricing::Budget { min, max } => format!("Budget SAR {min:.0}–{max:.0}"),
    }
}

fn rating_label(listing: &Listing) -> String {
    if listing.review_count == 0 {
        "—".to_string()
    } else {
        format!("{:.1}", listing.rating)
    }
}

fn render_html<T: Template>(tpl: T) -> Response {
    match tpl.render() {
        Ok(html) => Html(html).into_response(),
        Err(err) => server_error(anyhow::anyhow!(err.to_string())),
    }
}

fn server_error(err: anyhow::Error) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Html(format!("Server error: {}", err)),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn demo_app() -> (tempfile::TempDir, Router) {
        // An empty workspace root forces the demo-catalog fallback.
        let dir = tempfile::tempdir().expect("tempdir");
        let app = app(AppState::new(dir.path()));
        (dir, app)
    }

    async fn body_text(resp: Response) -> String {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn handler_smoke_get_index() {
        let (_dir, app) = demo_app();
        let resp = app
            .oneshot(
                axum::http::Request::builder()
                    .uri("/")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let text = body_text(resp).await;
        assert!(text.contains("SOUQ Marketplace"));
    }

    #[tokio::test]
    async fn products_table_sorts_by_price() {
        let (_dir, app) = demo_app();
        let resp = app
            .oneshot(
                axum::http::Request::builder()
                    .uri("/products/table?sort=price-low")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers()["hx-trigger"].to_str().unwrap(),
            "listingsTableLoaded"
        );
        let text = body_text(resp).await;
        let cheapest = text.find("SAR 79").expect("cheapest product listed");
        let priciest = text.find("SAR 299").expect("priciest product listed");
        assert!(cheapest < priciest);
    }

    #[tokio::test]
    async fn arabic_locale_renders_arabic_titles() {
        let (_dir, app) = demo_app();
        let resp = app
            .oneshot(
                axum::http::Request::builder()
                    .uri("/services/table?lang=ar")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let text = body_text(resp).await;
        assert!(text.contains("تصميم شعار"));
    }

    #[tokio::test]
    async fn facets_partial_lists_categories_with_counts() {
        let (_dir, app) = demo_app();
        let resp = app
            .oneshot(
                axum::http::Request::builder()
                    .uri("/products/facets")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let text = body_text(resp).await;
        assert!(text.contains("Graphic Design"));
        assert!(text.contains("(2)"));
    }

    #[tokio::test]
    async fn detail_renders_service_packages() {
        let (_dir, app) = demo_app();
        let resp = app
            .oneshot(
                axum::http::Request::builder()
                    .uri("/listings/00000000-0000-0000-0000-00000000000a")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let text = body_text(resp).await;
        assert!(text.contains("Logo Design"));
        assert!(text.contains("Premium"));
    }

    #[tokio::test]
    async fn unknown_listing_is_404() {
        let (_dir, app) = demo_app();
        for uri in [
            "/listings/not-a-uuid",
            "/listings/99999999-9999-9999-9999-999999999999",
        ] {
            let resp = app
                .clone()
                .oneshot(
                    axum::http::Request::builder()
                        .uri(uri)
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();
            assert_eq!(resp.status(), StatusCode::NOT_FOUND, "{uri}");
        }
    }

    #[tokio::test]
    async fn out_of_range_page_renders_empty_table() {
        let (_dir, app) = demo_app();
        let resp = app
            .oneshot(
                axum::http::Request::builder()
                    .uri("/projects/table?page=7")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let text = body_text(resp).await;
        assert!(text.contains("Page 7 of 1"));
        assert!(text.contains("(5 results)"));
    }
}
