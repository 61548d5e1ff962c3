use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub description: String,
}

/// Admin input for a new category. The slug defaults to one derived from the name.
#[derive(Debug, Clone, Deserialize)]
pub struct CategoryDraft {
    pub name: String,
    pub slug: Option<String>,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone)]
pub struct NewCategory {
    pub name: String,
    pub slug: String,
    pub description: String,
}

/// A bookable travel package. `price` is per person.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Package {
    pub id: i64,
    pub category_id: Option<i64>,
    pub title: String,
    pub slug: String,
    pub image_url: Option<String>,
    pub rating: Decimal,
    pub price: Decimal,
    pub duration: String,
    pub include_meals: bool,
    pub include_hotels: bool,
    pub include_flights: bool,
    pub include_sightseeing: bool,
    pub custom_includes: String,
    pub short_itinerary: String,
    pub created_at: DateTime<Utc>,
}

impl Package {
    /// Human-readable list of what the price covers.
    pub fn inclusions(&self) -> Vec<String> {
        let mut inclusions = Vec::new();
        if self.include_meals {
            inclusions.push("Meals".to_string());
        }
        if self.include_hotels {
            inclusions.push("Hotels".to_string());
        }
        if self.include_flights {
            inclusions.push("Flights".to_string());
        }
        if self.include_sightseeing {
            inclusions.push("Sightseeing".to_string());
        }
        let custom = self.custom_includes.trim();
        if !custom.is_empty() {
            inclusions.push(custom.to_string());
        }
        inclusions
    }
}

/// Admin input for a new package. The category is referenced by slug.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct PackageDraft {
    pub title: String,
    pub slug: Option<String>,
    pub category: Option<String>,
    pub image_url: Option<String>,
    pub rating: Option<Decimal>,
    pub price: Decimal,
    #[serde(default)]
    pub duration: String,
    #[serde(default)]
    pub include_meals: bool,
    #[serde(default)]
    pub include_hotels: bool,
    #[serde(default)]
    pub include_flights: bool,
    #[serde(default)]
    pub include_sightseeing: bool,
    #[serde(default)]
    pub custom_includes: String,
    #[serde(default)]
    pub short_itinerary: String,
}

/// Validated package ready for storage.
#[derive(Debug, Clone)]
pub struct NewPackage {
    pub category_id: Option<i64>,
    pub title: String,
    pub slug: String,
    pub image_url: Option<String>,
    pub rating: Decimal,
    pub price: Decimal,
    pub duration: String,
    pub include_meals: bool,
    pub include_hotels: bool,
    pub include_flights: bool,
    pub include_sightseeing: bool,
    pub custom_includes: String,
    pub short_itinerary: String,
}

impl NewPackage {
    pub fn into_package(self, id: i64, created_at: DateTime<Utc>) -> Package {
        Package {
            id,
            category_id: self.category_id,
            title: self.title,
            slug: self.slug,
            image_url: self.image_url,
            rating: self.rating,
            price: self.price,
            duration: self.duration,
            include_meals: self.include_meals,
            include_hotels: self.include_hotels,
            include_flights: self.include_flights,
            include_sightseeing: self.include_sightseeing,
            custom_includes: self.custom_includes,
            short_itinerary: self.short_itinerary,
            created_at,
        }
    }
}

/// Partial package edit. The slug is immutable.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PackageUpdate {
    pub title: Option<String>,
    pub category: Option<String>,
    pub image_url: Option<String>,
    pub rating: Option<Decimal>,
    pub price: Option<Decimal>,
    pub duration: Option<String>,
    pub include_meals: Option<bool>,
    pub include_hotels: Option<bool>,
    pub include_flights: Option<bool>,
    pub include_sightseeing: Option<bool>,
    pub custom_includes: Option<String>,
    pub short_itinerary: Option<String>,
}

impl PackageUpdate {
    /// Applies every field except `category`, which needs a lookup.
    pub fn apply(self, package: &mut Package) {
        if let Some(v) = self.title { package.title = v.trim().to_string(); }
        if let Some(v) = self.image_url { package.image_url = Some(v); }
        if let Some(v) = self.rating { package.rating = v; }
        if let Some(v) = self.price { package.price = v; }
        if let Some(v) = self.duration { package.duration = v; }
        if let Some(v) = self.include_meals { package.include_meals = v; }
        if let Some(v) = self.include_hotels { package.include_hotels = v; }
        if let Some(v) = self.include_flights { package.include_flights = v; }
        if let Some(v) = self.include_sightseeing { package.include_sightseeing = v; }
        if let Some(v) = self.custom_includes { package.custom_includes = v; }
        if let Some(v) = self.short_itinerary { package.short_itinerary = v; }
    }
}
