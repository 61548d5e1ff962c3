use async_trait::async_trait;
use triplicity_core::BoxError;

use crate::package::{Category, NewCategory, NewPackage, Package};

/// Repository trait for categories and packages
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// All categories ordered by name
    async fn list_categories(&self) -> Result<Vec<Category>, BoxError>;

    async fn get_category_by_slug(&self, slug: &str) -> Result<Option<Category>, BoxError>;

    async fn create_category(&self, category: NewCategory) -> Result<Category, BoxError>;

    /// Packages newest first, optionally restricted to one category
    async fn list_packages(&self, category_id: Option<i64>) -> Result<Vec<Package>, BoxError>;

    async fn get_package(&self, id: i64) -> Result<Option<Package>, BoxError>;

    async fn get_package_by_slug(&self, slug: &str) -> Result<Option<Package>, BoxError>;

    async fn create_package(&self, package: NewPackage) -> Result<Package, BoxError>;

    async fn update_package(&self, package: &Package) -> Result<(), BoxError>;
}
