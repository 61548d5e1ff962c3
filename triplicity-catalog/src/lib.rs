pub mod error;
pub mod memory;
pub mod package;
pub mod repository;
pub mod service;
pub mod slug;

pub use error::CatalogError;
pub use memory::InMemoryCatalogRepository;
pub use package::{Category, CategoryDraft, NewCategory, NewPackage, Package, PackageDraft, PackageUpdate};
pub use repository::CatalogRepository;
pub use service::CatalogService;
