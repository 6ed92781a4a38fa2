//! Data provider for the catalog: Postgres when configured, JSON fixtures and
//! a built-in demo dataset otherwise.
//!
//! The catalog engine never learns which source produced its input; the
//! provider contract is "returns listings, or a well-known fallback set when a
//! richer source is unavailable". Every downgrade is logged.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{TimeZone, Utc};
use serde::Deserialize;
use souq_core::{
    Category, ExperienceLevel, Listing, ListingKind, LocalizedText, PackageTier, Pricing,
    ServicePackage,
};
use sqlx::{PgPool, Row};
use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

pub const CRATE_NAME: &str = "souq-store";

pub const FIXTURE_FILE: &str = "fixtures/listings.json";
pub const CATEGORY_REGISTRY_FILE: &str = "categories.yaml";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing fixture JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("parsing category registry YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

#[derive(Debug, Clone, Deserialize)]
struct CategoryRegistry {
    categories: Vec<Category>,
}

/// Loads listings from a JSON fixture file (an array of listing records).
pub fn fixtures_from_path(path: &Path) -> Result<Vec<Listing>, StoreError> {
    let raw = std::fs::read_to_string(path).map_err(|source| StoreError::Io {
        path: path.display().to_string(),
        source,
    })?;
    Ok(serde_json::from_str(&raw)?)
}

/// Loads the marketplace category registry from `categories.yaml`.
pub fn categories_from_path(path: &Path) -> Result<Vec<Category>, StoreError> {
    let raw = std::fs::read_to_string(path).map_err(|source| StoreError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let registry: CategoryRegistry = serde_yaml::from_str(&raw)?;
    Ok(registry.categories)
}

pub async fn connect_from_env() -> Option<PgPool> {
    let database_url = std::env::var("DATABASE_URL").ok()?;
    PgPool::connect(&database_url).await.ok()
}

/// Loads the current listings from Postgres. Each row carries the full record
/// as a JSON document; rows that no longer decode are skipped with a warning
/// rather than failing the whole page.
pub async fn listings_from_db(pool: &PgPool) -> Result<Vec<Listing>> {
    let rows = sqlx::query(
        r#"
        SELECT id::text AS id, data_json
          FROM listings
         WHERE status = 'published'
         ORDER BY created_at DESC
        "#,
    )
    .fetch_all(pool)
    .await
    .context("querying published listings")?;

    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        let id: String = row.try_get("id")?;
        let data_json: serde_json::Value = row.try_get("data_json")?;
        match serde_json::from_value::<Listing>(data_json) {
            Ok(listing) => out.push(listing),
            Err(err) => warn!(listing_id = %id, error = %err, "skipping undecodable listing row"),
        }
    }
    Ok(out)
}

pub async fn categories_from_db(pool: &PgPool) -> Result<Vec<Category>> {
    let rows = sqlx::query(
        r#"
        SELECT id, name_ar, name_en
          FROM categories
         ORDER BY id
        "#,
    )
    .fetch_all(pool)
    .await
    .context("querying categories")?;

    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        out.push(Category {
            id: row.try_get("id")?,
            name: LocalizedText::new(
                row.try_get::<String, _>("name_ar")?,
                row.try_get::<String, _>("name_en")?,
            ),
        });
    }
    Ok(out)
}

/// The downgrade chain: Postgres when `DATABASE_URL` is set and answers, then
/// the fixture file under the workspace root, then the built-in demo set.
pub async fn load_catalog(workspace_root: &Path) -> Vec<Listing> {
    if let Some(pool) = connect_from_env().await {
        match listings_from_db(&pool).await {
            Ok(rows) if !rows.is_empty() => return rows,
            Ok(_) => warn!("database returned no listings, falling back to fixtures"),
            Err(err) => warn!(error = %err, "database load failed, falling back to fixtures"),
        }
    }

    let fixture_path = workspace_root.join(FIXTURE_FILE);
    match fixtures_from_path(&fixture_path) {
        Ok(rows) if !rows.is_empty() => rows,
        Ok(_) => {
            warn!(path = %fixture_path.display(), "fixture file is empty, using demo listings");
            demo_listings()
        }
        Err(err) => {
            warn!(error = %err, "fixture load failed, using demo listings");
            demo_listings()
        }
    }
}

pub async fn load_categories(workspace_root: &Path) -> Vec<Category> {
    if let Some(pool) = connect_from_env().await {
        match categories_from_db(&pool).await {
            Ok(rows) if !rows.is_empty() => return rows,
            _ => warn!("database category load failed, falling back to registry file"),
        }
    }

    let registry_path = workspace_root.join(CATEGORY_REGISTRY_FILE);
    match categories_from_path(&registry_path) {
        Ok(rows) if !rows.is_empty() => rows,
        _ => demo_categories(),
    }
}

pub fn demo_categories() -> Vec<Category> {
    vec![
        Category {
            id: "graphic-design".into(),
            name: LocalizedText::new("تصميم جرافيك", "Graphic Design"),
        },
        Category {
            id: "templates".into(),
            name: LocalizedText::new("قوالب جاهزة", "Templates"),
        },
        Category {
            id: "development".into(),
            name: LocalizedText::new("برمجة وتطوير", "Development"),
        },
        Category {
            id: "writing".into(),
            name: LocalizedText::new("كتابة وترجمة", "Writing & Translation"),
        },
    ]
}

fn demo_id(n: u128) -> Uuid {
    Uuid::from_u128(n)
}

fn day(month: u32, day: u32) -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, month, day, 12, 0, 0)
        .single()
        .expect("valid demo timestamp")
}

/// The bilingual demo catalog rendered when neither the database nor a
/// fixture file is available. Ids and timestamps are fixed so demo pages are
/// reproducible.
pub fn demo_listings() -> Vec<Listing> {
    let mut listings = Vec::new();

    let products: [(u128, &str, &str, &str, f64, f64, u32, u32, u32); 6] = [
        (1, "قالب سيرة ذاتية", "CV Template Pack", "templates", 99.0, 4.7, 112, 88, 1),
        (2, "حزمة أيقونات", "Icon Bundle", "graphic-design", 149.0, 4.5, 64, 40, 2),
        (3, "كتاب إلكتروني للتسويق", "Marketing E-Book", "writing", 199.0, 4.2, 18, 12, 3),
        (4, "قالب متجر إلكتروني", "E-Commerce Store Theme", "templates", 179.0, 4.8, 201, 150, 4),
        (5, "خطوط عربية", "Arabic Font Collection", "graphic-design", 79.0, 4.9, 330, 260, 5),
        (6, "دورة تطوير واجهات", "Frontend Course", "development", 299.0, 4.6, 95, 70, 6),
    ];
    for (n, ar, en, category, price, rating, reviews, orders, created_day) in products {
        listings.push(Listing {
            id: demo_id(n),
            kind: ListingKind::Product,
            title: LocalizedText::new(ar, en),
            description: LocalizedText::new(
                format!("{ar} جاهز للتحميل الفوري"),
                format!("{en}, ready for instant download"),
            ),
            category_id: category.to_string(),
            pricing: Pricing::Flat { price },
            rating,
            review_count: reviews,
            seller_completed_orders: orders,
            experience_level: None,
            delivery_days: None,
            tags: vec!["digital".into(), "download".into()],
            created_at: day(1, created_day),
        });
    }

    let services: [(u128, &str, &str, &str, f64, f64, f64, f64, u32, u32); 3] = [
        (10, "تصميم شعار", "Logo Design", "graphic-design", 150.0, 350.0, 700.0, 4.9, 210, 180),
        (11, "ترجمة مقالات", "Article Translation", "writing", 80.0, 160.0, 320.0, 4.6, 75, 60),
        (12, "تطوير موقع ووردبريس", "WordPress Development", "development", 400.0, 900.0, 1800.0, 4.7, 130, 95),
    ];
    for (n, ar, en, category, basic, standard, premium, rating, reviews, orders) in services {
        listings.push(Listing {
            id: demo_id(n),
            kind: ListingKind::Service,
            title: LocalizedText::new(ar, en),
            description: LocalizedText::new(
                format!("خدمة {ar} باحترافية عالية"),
                format!("Professional {en} service"),
            ),
            category_id: category.to_string(),
            pricing: Pricing::Tiered {
                packages: vec![
                    ServicePackage {
                        tier: PackageTier::Basic,
                        price: basic,
                        delivery_days: 7,
                        revision_count: 2,
                    },
                    ServicePackage {
                        tier: PackageTier::Standard,
                        price: standard,
                        delivery_days: 4,
                        revision_count: 5,
                    },
                    ServicePackage {
                        tier: PackageTier::Premium,
                        price: premium,
                        delivery_days: 2,
                        revision_count: 10,
                    },
                ],
            },
            rating,
            review_count: reviews,
            seller_completed_orders: orders,
            experience_level: None,
            delivery_days: Some(7),
            tags: vec!["service".into()],
            created_at: day(2, n as u32 - 9),
        });
    }

    let projects: [(u128, &str, &str, f64, f64, ExperienceLevel, u32, &[&str]); 5] = [
        (20, "تطبيق جوال للتوصيل", "Delivery Mobile App", 8000.0, 25000.0, ExperienceLevel::Expert, 60, &["React Native", "Firebase"]),
        (21, "موقع شخصي", "Personal Portfolio Site", 300.0, 900.0, ExperienceLevel::Entry, 10, &["React", "Tailwind"]),
        (22, "لوحة تحكم مبيعات", "Sales Dashboard", 2000.0, 6000.0, ExperienceLevel::Intermediate, 21, &["TypeScript", "PostgreSQL"]),
        (23, "تدقيق محتوى عربي", "Arabic Content Review", 150.0, 400.0, ExperienceLevel::Entry, 7, &["Copywriting"]),
        (24, "تكامل بوابة دفع", "Payment Gateway Integration", 1500.0, 4500.0, ExperienceLevel::Expert, 14, &["Rust", "Stripe"]),
    ];
    for (n, ar, en, min, max, level, days, skills) in projects {
        listings.push(Listing {
            id: demo_id(n),
            kind: ListingKind::Project,
            title: LocalizedText::new(ar, en),
            description: LocalizedText::new(
                format!("مطلوب تنفيذ: {ar}"),
                format!("Looking for a freelancer: {en}"),
            ),
            category_id: "development".to_string(),
            pricing: Pricing::Budget { min, max },
            rating: 0.0,
            review_count: 0,
            seller_completed_orders: 0,
            experience_level: Some(level),
            delivery_days: Some(days),
            tags: skills.iter().map(|s| s.to_string()).collect(),
            created_at: day(3, n as u32 - 19),
        });
    }

    listings
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::io::Write;

    #[test]
    fn demo_listings_have_unique_ids_and_all_kinds() {
        let listings = demo_listings();
        let ids: HashSet<Uuid> = listings.iter().map(|l| l.id).collect();
        assert_eq!(ids.len(), listings.len());
        for kind in [ListingKind::Product, ListingKind::Service, ListingKind::Project] {
            assert!(listings.iter().any(|l| l.kind == kind));
        }
    }

    #[test]
    fn demo_ratings_are_in_range_and_backed_by_reviews() {
        for listing in demo_listings() {
            assert!((0.0..=5.0).contains(&listing.rating), "{}", listing.id);
            if listing.review_count == 0 {
                assert_eq!(listing.rating, 0.0);
            }
        }
    }

    #[test]
    fn fixture_file_round_trips_through_json() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("listings.json");
        let demo = demo_listings();
        let mut file = std::fs::File::create(&path).expect("create fixture");
        file.write_all(serde_json::to_string_pretty(&demo).expect("serialize").as_bytes())
            .expect("write fixture");

        let loaded = fixtures_from_path(&path).expect("load fixture");
        assert_eq!(loaded, demo);
    }

    #[test]
    fn missing_fixture_file_reports_the_path() {
        let err = fixtures_from_path(Path::new("/nonexistent/listings.json"))
            .expect_err("should fail");
        assert!(err.to_string().contains("/nonexistent/listings.json"));
    }

    #[test]
    fn category_registry_parses_yaml() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("categories.yaml");
        std::fs::write(
            &path,
            concat!(
                "categories:\n",
                "  - id: graphic-design\n",
                "    name:\n",
                "      ar: \"تصميم جرافيك\"\n",
                "      en: \"Graphic Design\"\n",
                "  - id: development\n",
                "    name:\n",
                "      ar: \"برمجة وتطوير\"\n",
                "      en: \"Development\"\n",
            ),
        )
        .expect("write registry");

        let categories = categories_from_path(&path).expect("load registry");
        assert_eq!(categories.len(), 2);
        assert_eq!(categories[0].id, "graphic-design");
        assert_eq!(categories[1].name.en, "Development");
    }

    #[tokio::test]
    async fn load_catalog_falls_back_to_demo_listings() {
        let dir = tempfile::tempdir().expect("tempdir");
        // No DATABASE_URL handling needed here: without a fixture file the
        // chain must still end in the demo set.
        let listings = load_catalog(dir.path()).await;
        assert!(!listings.is_empty());
    }

    #[tokio::test]
    async fn load_catalog_prefers_fixture_file_when_present() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::create_dir_all(dir.path().join("fixtures")).expect("mkdir");
        let only = vec![demo_listings().remove(0)];
        std::fs::write(
            dir.path().join(FIXTURE_FILE),
            serde_json::to_string(&only).expect("serialize"),
        )
        .expect("write fixture");

        let listings = load_catalog(dir.path()).await;
        assert_eq!(listings, only);
    }
}
