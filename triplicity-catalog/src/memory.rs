use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::RwLock;
use triplicity_core::{BoxError, DuplicateKey};

use crate::package::{Category, NewCategory, NewPackage, Package};
use crate::repository::CatalogRepository;

#[derive(Default)]
struct CatalogState {
    categories: Vec<Category>,
    packages: Vec<Package>,
    next_category_id: i64,
    next_package_id: i64,
}

/// In-memory catalog with sequential ids. Slugs are unique per table.
#[derive(Default, Clone)]
pub struct InMemoryCatalogRepository {
    state: Arc<RwLock<CatalogState>>,
}

impl InMemoryCatalogRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CatalogRepository for InMemoryCatalogRepository {
    async fn list_categories(&self) -> Result<Vec<Category>, BoxError> {
        let mut categories = self.state.read().await.categories.clone();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    async fn get_category_by_slug(&self, slug: &str) -> Result<Option<Category>, BoxError> {
        let state = self.state.read().await;
        Ok(state.categories.iter().find(|c| c.slug == slug).cloned())
    }

    async fn create_category(&self, category: NewCategory) -> Result<Category, BoxError> {
        let mut state = self.state.write().await;
        if state
            .categories
            .iter()
            .any(|c| c.slug == category.slug || c.name == category.name)
        {
            return Err(DuplicateKey::boxed(format!("category '{}'", category.slug)));
        }

        state.next_category_id += 1;
        let category = Category {
            id: state.next_category_id,
            name: category.name,
            slug: category.slug,
            description: category.description,
        };
        state.categories.push(category.clone());
        Ok(category)
    }

    async fn list_packages(&self, category_id: Option<i64>) -> Result<Vec<Package>, BoxError> {
        let state = self.state.read().await;
        let mut packages: Vec<Package> = state
            .packages
            .iter()
            .filter(|p| category_id.is_none() || p.category_id == category_id)
            .cloned()
            .collect();
        packages.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(packages)
    }

    async fn get_package(&self, id: i64) -> Result<Option<Package>, BoxError> {
        let state = self.state.read().await;
        Ok(state.packages.iter().find(|p| p.id == id).cloned())
    }

    async fn get_package_by_slug(&self, slug: &str) -> Result<Option<Package>, BoxError> {
        let state = self.state.read().await;
        Ok(state.packages.iter().find(|p| p.slug == slug).cloned())
    }

    async fn create_package(&self, package: NewPackage) -> Result<Package, BoxError> {
        let mut state = self.state.write().await;
        if state.packages.iter().any(|p| p.slug == package.slug) {
            return Err(DuplicateKey::boxed(format!("package '{}'", package.slug)));
        }

        state.next_package_id += 1;
        let package = package.into_package(state.next_package_id, Utc::now());
        state.packages.push(package.clone());
        Ok(package)
    }

    async fn update_package(&self, package: &Package) -> Result<(), BoxError> {
        let mut state = self.state.write().await;
        match state.packages.iter_mut().find(|p| p.id == package.id) {
            Some(existing) => {
                *existing = package.clone();
                Ok(())
            }
            None => Err(format!("package {} does not exist", package.id).into()),
        }
    }
}
