//! Core domain model for the SOUQ marketplace catalog.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const CRATE_NAME: &str = "souq-core";

/// Display locale for listing text. The marketplace ships Arabic and English.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    Ar,
    #[default]
    En,
}

impl Locale {
    pub fn as_str(&self) -> &'static str {
        match self {
            Locale::Ar => "ar",
            Locale::En => "en",
        }
    }

    /// Parses a URL/query-string language tag. Anything unrecognized falls
    /// back to English rather than erroring.
    pub fn parse_or_default(tag: &str) -> Self {
        match tag.trim().to_ascii_lowercase().as_str() {
            "ar" => Locale::Ar,
            _ => Locale::En,
        }
    }
}

/// A string carried in both locales, resolved at render time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct LocalizedText {
    pub ar: String,
    pub en: String,
}

impl LocalizedText {
    pub fn new(ar: impl Into<String>, en: impl Into<String>) -> Self {
        Self {
            ar: ar.into(),
            en: en.into(),
        }
    }

    pub fn get(&self, locale: Locale) -> &str {
        match locale {
            Locale::Ar => &self.ar,
            Locale::En => &self.en,
        }
    }

    /// Case-insensitive substring match against both locales. `needle` must
    /// already be lowercased by the caller.
    pub fn contains_lowercase(&self, needle: &str) -> bool {
        self.ar.to_lowercase().contains(needle) || self.en.to_lowercase().contains(needle)
    }
}

/// The three sellable listing kinds exposed on the marketplace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingKind {
    Product,
    Service,
    Project,
}

impl ListingKind {
    /// Fixed page size used by the listing page for this kind.
    pub fn page_size(&self) -> usize {
        match self {
            ListingKind::Product | ListingKind::Service => 12,
            ListingKind::Project => 10,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ListingKind::Product => "product",
            ListingKind::Service => "service",
            ListingKind::Project => "project",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageTier {
    Basic,
    Standard,
    Premium,
}

/// One tier of a service listing's Basic/Standard/Premium offering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServicePackage {
    pub tier: PackageTier,
    pub price: f64,
    pub delivery_days: u32,
    pub revision_count: u32,
}

/// Pricing shape per listing kind: flat price for products, tiered packages
/// for services, a budget range for freelance projects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "lowercase")]
pub enum Pricing {
    Flat { price: f64 },
    Tiered { packages: Vec<ServicePackage> },
    Budget { min: f64, max: f64 },
}

impl Pricing {
    pub fn flat(&self) -> Option<f64> {
        match self {
            Pricing::Flat { price } => Some(*price),
            _ => None,
        }
    }

    /// Cheapest package price, the "from" price shown on service cards.
    /// An empty package list is an incomplete listing and yields `None`.
    pub fn cheapest(&self) -> Option<f64> {
        match self {
            Pricing::Tiered { packages } => packages
                .iter()
                .map(|p| p.price)
                .min_by(f64::total_cmp),
            _ => None,
        }
    }

    pub fn budget_max(&self) -> Option<f64> {
        match self {
            Pricing::Budget { max, .. } => Some(*max),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExperienceLevel {
    Entry,
    Intermediate,
    Expert,
}

/// Normalized sellable item: product, service, or freelance project.
///
/// Produced externally (database rows or fixtures) once per request and handed
/// to the catalog engine as an immutable slice. `id` is unique within any
/// collection; `rating` is only meaningful when `review_count > 0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub id: Uuid,
    pub kind: ListingKind,
    pub title: LocalizedText,
    pub description: LocalizedText,
    pub category_id: String,
    pub pricing: Pricing,
    pub rating: f64,
    pub review_count: u32,
    /// Seller reputation signal used by the recommended ordering.
    pub seller_completed_orders: u32,
    #[serde(default)]
    pub experience_level: Option<ExperienceLevel>,
    #[serde(default)]
    pub delivery_days: Option<u32>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl Listing {
    /// True when `needle` (already lowercased) appears in either locale of the
    /// title or description, or in any tag/skill string.
    pub fn matches_text(&self, needle: &str) -> bool {
        self.title.contains_lowercase(needle)
            || self.description.contains_lowercase(needle)
            || self
                .tags
                .iter()
                .any(|tag| tag.to_lowercase().contains(needle))
    }
}

/// Marketplace category. Owned by the category registry, referenced by
/// listings through `category_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: LocalizedText,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locale_parsing_defaults_to_english() {
        assert_eq!(Locale::parse_or_default("ar"), Locale::Ar);
        assert_eq!(Locale::parse_or_default(" AR "), Locale::Ar);
        assert_eq!(Locale::parse_or_default("en"), Locale::En);
        assert_eq!(Locale::parse_or_default("fr"), Locale::En);
        assert_eq!(Locale::parse_or_default(""), Locale::En);
    }

    #[test]
    fn localized_text_matches_either_locale() {
        let title = LocalizedText::new("تصميم شعار احترافي", "Professional Logo Design");
        assert_eq!(title.get(Locale::Ar), "تصميم شعار احترافي");
        assert_eq!(title.get(Locale::En), "Professional Logo Design");
        assert!(title.contains_lowercase("logo"));
        assert!(title.contains_lowercase("شعار"));
        assert!(!title.contains_lowercase("banner"));
    }

    #[test]
    fn cheapest_package_ignores_tier_order() {
        let pricing = Pricing::Tiered {
            packages: vec![
                ServicePackage {
                    tier: PackageTier::Premium,
                    price: 500.0,
                    delivery_days: 3,
                    revision_count: 10,
                },
                ServicePackage {
                    tier: PackageTier::Basic,
                    price: 99.0,
                    delivery_days: 7,
                    revision_count: 2,
                },
            ],
        };
        assert_eq!(pricing.cheapest(), Some(99.0));
        assert_eq!(pricing.flat(), None);
        assert_eq!(pricing.budget_max(), None);
    }

    #[test]
    fn empty_package_list_has_no_price() {
        let pricing = Pricing::Tiered { packages: vec![] };
        assert_eq!(pricing.cheapest(), None);
    }

    #[test]
    fn page_sizes_are_fixed_per_kind() {
        assert_eq!(ListingKind::Product.page_size(), 12);
        assert_eq!(ListingKind::Service.page_size(), 12);
        assert_eq!(ListingKind::Project.page_size(), 10);
    }
}
