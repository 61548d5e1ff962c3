use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use triplicity_catalog::{CatalogRepository, Category, NewCategory, NewPackage, Package};
use triplicity_core::BoxError;

use crate::database::unique_violation;

pub struct PgCatalogRepository {
    pool: PgPool,
}

impl PgCatalogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const PACKAGE_COLUMNS: &str = "id, category_id, title, slug, image_url, rating, price, duration, \
     include_meals, include_hotels, include_flights, include_sightseeing, custom_includes, \
     short_itinerary, created_at";

#[derive(sqlx::FromRow)]
struct CategoryRow {
    id: i64,
    name: String,
    slug: String,
    description: String,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Category {
            id: row.id,
            name: row.name,
            slug: row.slug,
            description: row.description,
        }
    }
}

#[derive(sqlx::FromRow)]
struct PackageRow {
    id: i64,
    category_id: Option<i64>,
    title: String,
    slug: String,
    image_url: Option<String>,
    rating: Decimal,
    price: Decimal,
    duration: String,
    include_meals: bool,
    include_hotels: bool,
    include_flights: bool,
    include_sightseeing: bool,
    custom_includes: String,
    short_itinerary: String,
    created_at: DateTime<Utc>,
}

impl From<PackageRow> for Package {
    fn from(row: PackageRow) -> Self {
        Package {
            id: row.id,
            category_id: row.category_id,
            title: row.title,
            slug: row.slug,
            image_url: row.image_url,
            rating: row.rating,
            price: row.price,
            duration: row.duration,
            include_meals: row.include_meals,
            include_hotels: row.include_hotels,
            include_flights: row.include_flights,
            include_sightseeing: row.include_sightseeing,
            custom_includes: row.custom_includes,
            short_itinerary: row.short_itinerary,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl CatalogRepository for PgCatalogRepository {
    async fn list_categories(&self) -> Result<Vec<Category>, BoxError> {
        let rows = sqlx::query_as::<_, CategoryRow>(
            "SELECT id, name, slug, description FROM categories ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Category::from).collect())
    }

    async fn get_category_by_slug(&self, slug: &str) -> Result<Option<Category>, BoxError> {
        let row = sqlx::query_as::<_, CategoryRow>(
            "SELECT id, name, slug, description FROM categories WHERE slug = $1",
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Category::from))
    }

    async fn create_category(&self, category: NewCategory) -> Result<Category, BoxError> {
        let row = sqlx::query_as::<_, CategoryRow>(
            r#"
            INSERT INTO categories (name, slug, description)
            VALUES ($1, $2, $3)
            RETURNING id, name, slug, description
            "#,
        )
        .bind(&category.name)
        .bind(&category.slug)
        .bind(&category.description)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| unique_violation(e, &format!("category '{}'", category.slug)))?;

        Ok(row.into())
    }

    async fn list_packages(&self, category_id: Option<i64>) -> Result<Vec<Package>, BoxError> {
        let rows = sqlx::query_as::<_, PackageRow>(&format!(
            r#"
            SELECT {}
            FROM packages
            WHERE $1::BIGINT IS NULL OR category_id = $1
            ORDER BY created_at DESC, id DESC
            "#,
            PACKAGE_COLUMNS
        ))
        .bind(category_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Package::from).collect())
    }

    async fn get_package(&self, id: i64) -> Result<Option<Package>, BoxError> {
        let row = sqlx::query_as::<_, PackageRow>(&format!(
            "SELECT {} FROM packages WHERE id = $1",
            PACKAGE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Package::from))
    }

    async fn get_package_by_slug(&self, slug: &str) -> Result<Option<Package>, BoxError> {
        let row = sqlx::query_as::<_, PackageRow>(&format!(
            "SELECT {} FROM packages WHERE slug = $1",
            PACKAGE_COLUMNS
        ))
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Package::from))
    }

    async fn create_package(&self, package: NewPackage) -> Result<Package, BoxError> {
        let row = sqlx::query_as::<_, PackageRow>(&format!(
            r#"
            INSERT INTO packages (category_id, title, slug, image_url, rating, price, duration,
                include_meals, include_hotels, include_flights, include_sightseeing,
                custom_includes, short_itinerary)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING {}
            "#,
            PACKAGE_COLUMNS
        ))
        .bind(package.category_id)
        .bind(&package.title)
        .bind(&package.slug)
        .bind(&package.image_url)
        .bind(package.rating)
        .bind(package.price)
        .bind(&package.duration)
        .bind(package.include_meals)
        .bind(package.include_hotels)
        .bind(package.include_flights)
        .bind(package.include_sightseeing)
        .bind(&package.custom_includes)
        .bind(&package.short_itinerary)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| unique_violation(e, &format!("package '{}'", package.slug)))?;

        Ok(row.into())
    }

    async fn update_package(&self, package: &Package) -> Result<(), BoxError> {
        let result = sqlx::query(
            r#"
            UPDATE packages
            SET category_id = $2, title = $3, image_url = $4, rating = $5, price = $6, duration = $7,
                include_meals = $8, include_hotels = $9, include_flights = $10,
                include_sightseeing = $11, custom_includes = $12, short_itinerary = $13
            WHERE id = $1
            "#,
        )
        .bind(package.id)
        .bind(package.category_id)
        .bind(&package.title)
        .bind(&package.image_url)
        .bind(package.rating)
        .bind(package.price)
        .bind(&package.duration)
        .bind(package.include_meals)
        .bind(package.include_hotels)
        .bind(package.include_flights)
        .bind(package.include_sightseeing)
        .bind(&package.custom_includes)
        .bind(&package.short_itinerary)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(format!("package {} does not exist", package.id).into());
        }
        Ok(())
    }
}
