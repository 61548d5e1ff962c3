use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::info;

use crate::error::{CatalogError, CatalogResult};
use crate::package::{Category, CategoryDraft, NewCategory, NewPackage, Package, PackageDraft, PackageUpdate};
use crate::repository::CatalogRepository;
use crate::slug::{slugify, validate_slug};

const MAX_TITLE_LENGTH: usize = 200;
const MAX_CATEGORY_NAME_LENGTH: usize = 100;
const MAX_DURATION_LENGTH: usize = 50;
/// Largest price a package row holds, in hundredths.
const MAX_PRICE_CENTS: i64 = 9_999_999_999;

/// Catalog browsing and admin maintenance.
#[derive(Clone)]
pub struct CatalogService {
    repo: Arc<dyn CatalogRepository>,
}

impl CatalogService {
    pub fn new(repo: Arc<dyn CatalogRepository>) -> Self {
        Self { repo }
    }

    pub async fn list_categories(&self) -> CatalogResult<Vec<Category>> {
        Ok(self.repo.list_categories().await?)
    }

    /// Newest packages first. An unknown category slug is a `NotFound`, not an empty list.
    pub async fn list_packages(&self, category_slug: Option<&str>) -> CatalogResult<Vec<Package>> {
        let category_id = match category_slug {
            Some(slug) => Some(self.category(slug).await?.id),
            None => None,
        };
        Ok(self.repo.list_packages(category_id).await?)
    }

    pub async fn get_package(&self, slug: &str) -> CatalogResult<Package> {
        self.repo
            .get_package_by_slug(slug)
            .await?
            .ok_or_else(|| CatalogError::NotFound(format!("package '{}'", slug)))
    }

    pub async fn create_category(&self, draft: CategoryDraft) -> CatalogResult<Category> {
        let name = draft.name.trim().to_string();
        if name.is_empty() || name.chars().count() > MAX_CATEGORY_NAME_LENGTH {
            return Err(CatalogError::Validation(format!(
                "category name must be 1 to {} characters",
                MAX_CATEGORY_NAME_LENGTH
            )));
        }
        let slug = resolve_slug(draft.slug.as_deref(), &name)?;

        if self.repo.get_category_by_slug(&slug).await?.is_some() {
            return Err(CatalogError::Conflict(format!("category '{}'", slug)));
        }
        if self.repo.list_categories().await?.iter().any(|c| c.name == name) {
            return Err(CatalogError::Conflict(format!("category named '{}'", name)));
        }

        let category = self
            .repo
            .create_category(NewCategory {
                name,
                slug,
                description: draft.description.trim().to_string(),
            })
            .await?;
        info!("Category created: {} ({})", category.slug, category.id);
        Ok(category)
    }

    pub async fn create_package(&self, draft: PackageDraft) -> CatalogResult<Package> {
        let title = validate_title(&draft.title)?;
        let slug = resolve_slug(draft.slug.as_deref(), &title)?;
        let price = validate_price(draft.price)?;
        let rating = draft.rating.unwrap_or(Decimal::ZERO);
        validate_rating(rating)?;
        validate_duration(&draft.duration)?;

        let category_id = match draft.category.as_deref() {
            Some(category) => Some(self.category(category).await?.id),
            None => None,
        };

        if self.repo.get_package_by_slug(&slug).await?.is_some() {
            return Err(CatalogError::Conflict(format!("package '{}'", slug)));
        }

        let package = self
            .repo
            .create_package(NewPackage {
                category_id,
                title,
                slug,
                image_url: draft.image_url,
                rating,
                price,
                duration: draft.duration.trim().to_string(),
                include_meals: draft.include_meals,
                include_hotels: draft.include_hotels,
                include_flights: draft.include_flights,
                include_sightseeing: draft.include_sightseeing,
                custom_includes: draft.custom_includes,
                short_itinerary: draft.short_itinerary,
            })
            .await?;
        info!("Package created: {} at {}", package.slug, package.price);
        Ok(package)
    }

    /// Edits descriptive fields and price. Existing bookings keep the total they were created with.
    pub async fn update_package(&self, slug: &str, mut update: PackageUpdate) -> CatalogResult<Package> {
        let mut package = self.get_package(slug).await?;

        if let Some(title) = &update.title {
            validate_title(title)?;
        }
        if let Some(price) = update.price {
            update.price = Some(validate_price(price)?);
        }
        if let Some(rating) = update.rating {
            validate_rating(rating)?;
        }
        if let Some(duration) = &update.duration {
            validate_duration(duration)?;
        }
        // An empty category slug detaches the package
        if let Some(category) = update.category.take() {
            package.category_id = match category.trim() {
                "" => None,
                slug => Some(self.category(slug).await?.id),
            };
        }

        update.apply(&mut package);
        self.repo.update_package(&package).await?;
        info!("Package updated: {}", package.slug);
        Ok(package)
    }

    async fn category(&self, slug: &str) -> CatalogResult<Category> {
        self.repo
            .get_category_by_slug(slug)
            .await?
            .ok_or_else(|| CatalogError::NotFound(format!("category '{}'", slug)))
    }
}

fn resolve_slug(explicit: Option<&str>, source: &str) -> CatalogResult<String> {
    let slug = match explicit.map(str::trim) {
        Some(slug) if !slug.is_empty() => slug.to_string(),
        _ => slugify(source),
    };
    validate_slug(&slug)?;
    Ok(slug)
}

fn validate_title(title: &str) -> CatalogResult<String> {
    let title = title.trim();
    if title.is_empty() || title.chars().count() > MAX_TITLE_LENGTH {
        return Err(CatalogError::Validation(format!(
            "title must be 1 to {} characters",
            MAX_TITLE_LENGTH
        )));
    }
    Ok(title.to_string())
}

/// Returns the price rounded to two places.
fn validate_price(price: Decimal) -> CatalogResult<Decimal> {
    if price.is_sign_negative() {
        return Err(CatalogError::Validation("price must not be negative".to_string()));
    }
    let price = price.round_dp(2);
    let max = Decimal::new(MAX_PRICE_CENTS, 2);
    if price > max {
        return Err(CatalogError::Validation(format!("price must be at most {}", max)));
    }
    Ok(price)
}

fn validate_rating(rating: Decimal) -> CatalogResult<()> {
    if rating < Decimal::ZERO || rating > Decimal::from(5) {
        return Err(CatalogError::Validation("rating must be between 0 and 5".to_string()));
    }
    Ok(())
}

fn validate_duration(duration: &str) -> CatalogResult<()> {
    if duration.trim().chars().count() > MAX_DURATION_LENGTH {
        return Err(CatalogError::Validation(format!(
            "duration must be at most {} characters",
            MAX_DURATION_LENGTH
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryCatalogRepository;
    use rust_decimal_macros::dec;

    fn service() -> CatalogService {
        CatalogService::new(Arc::new(InMemoryCatalogRepository::new()))
    }

    fn draft(title: &str, price: Decimal) -> PackageDraft {
        PackageDraft {
            title: title.to_string(),
            price,
            duration: "4 Days / 3 Nights".to_string(),
            ..Default::default()
        }
    }

    fn beaches() -> CategoryDraft {
        CategoryDraft {
            name: "Beaches".to_string(),
            slug: None,
            description: String::new(),
        }
    }

    #[tokio::test]
    async fn test_create_package_derives_slug() {
        let service = service();
        let package = service.create_package(draft("Goa Beach Escape", dec!(12499))).await.unwrap();

        assert_eq!(package.slug, "goa-beach-escape");
        assert_eq!(package.rating, Decimal::ZERO);
        assert_eq!(service.get_package("goa-beach-escape").await.unwrap().id, package.id);
    }

    #[tokio::test]
    async fn test_duplicate_slug_is_conflict() {
        let service = service();
        service.create_package(draft("Goa Beach Escape", dec!(100))).await.unwrap();
        let result = service.create_package(draft("Goa  Beach Escape!", dec!(200))).await;
        assert!(matches!(result, Err(CatalogError::Conflict(_))));

        service.create_category(beaches()).await.unwrap();
        assert!(matches!(
            service.create_category(beaches()).await,
            Err(CatalogError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_invalid_drafts_rejected() {
        let service = service();
        assert!(matches!(
            service.create_package(draft("Cheap", dec!(-1))).await,
            Err(CatalogError::Validation(_))
        ));

        let mut too_good = draft("Too Good", dec!(10));
        too_good.rating = Some(dec!(5.5));
        assert!(matches!(service.create_package(too_good).await, Err(CatalogError::Validation(_))));

        let mut bad_slug = draft("Bad Slug", dec!(10));
        bad_slug.slug = Some("Bad Slug".to_string());
        assert!(matches!(service.create_package(bad_slug).await, Err(CatalogError::Validation(_))));

        let mut unknown_category = draft("Nowhere", dec!(10));
        unknown_category.category = Some("mountains".to_string());
        assert!(matches!(
            service.create_package(unknown_category).await,
            Err(CatalogError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_price_limited_to_storable_range() {
        let service = service();
        let top = service
            .create_package(draft("Top Shelf", dec!(99999999.99)))
            .await
            .unwrap();
        assert_eq!(top.price, dec!(99999999.99));

        // Rounds up past the limit
        assert!(matches!(
            service.create_package(draft("Over", dec!(99999999.995))).await,
            Err(CatalogError::Validation(_))
        ));
        assert!(matches!(
            service
                .create_package(draft("Way Over", dec!(100000000000000000000.00)))
                .await,
            Err(CatalogError::Validation(_))
        ));
        assert!(matches!(
            service
                .update_package(
                    "top-shelf",
                    PackageUpdate {
                        price: Some(dec!(100000000)),
                        ..Default::default()
                    },
                )
                .await,
            Err(CatalogError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_list_packages_by_category() {
        let service = service();
        let category = service.create_category(beaches()).await.unwrap();
        assert_eq!(category.slug, "beaches");

        let mut goa = draft("Goa", dec!(100));
        goa.category = Some("beaches".to_string());
        service.create_package(goa).await.unwrap();
        service.create_package(draft("Manali", dec!(200))).await.unwrap();

        let all = service.list_packages(None).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].slug, "manali");

        let beach_packages = service.list_packages(Some("beaches")).await.unwrap();
        assert_eq!(beach_packages.len(), 1);
        assert_eq!(beach_packages[0].slug, "goa");

        assert!(matches!(
            service.list_packages(Some("deserts")).await,
            Err(CatalogError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_update_package() {
        let service = service();
        service.create_category(beaches()).await.unwrap();
        service.create_package(draft("Goa", dec!(1000))).await.unwrap();

        let updated = service
            .update_package(
                "goa",
                PackageUpdate {
                    price: Some(dec!(1250.499)),
                    category: Some("beaches".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.price, dec!(1250.50));
        assert!(updated.category_id.is_some());
        assert_eq!(updated.slug, "goa");

        let detached = service
            .update_package(
                "goa",
                PackageUpdate {
                    category: Some(String::new()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(detached.category_id, None);

        assert!(matches!(
            service.update_package("missing", PackageUpdate::default()).await,
            Err(CatalogError::NotFound(_))
        ));
    }
}
