//! Catalog access: products and articles the advisor may recommend.
//!
//! The advisor only ever reads the catalog. `CatalogRepository` is the seam:
//! `CachedCatalog` wraps a source (Postgres in production) with a TTL snapshot,
//! `InMemoryCatalog` serves fixed data for tests and local runs.

use std::sync::Arc;

use async_trait::async_trait;

use crate::errors::AppError;
use crate::models::catalog::{Article, Product};

pub mod cache;
pub mod postgres;

pub use cache::CachedCatalog;
pub use postgres::PgCatalogSource;

/// Read access to the product/article catalog.
///
/// Carried in `AppState` as `Arc<dyn CatalogRepository>`.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    async fn get_all_products(&self) -> Result<Arc<Vec<Product>>, AppError>;

    async fn get_product(&self, id: i64) -> Result<Option<Product>, AppError>;

    async fn get_all_articles(&self) -> Result<Arc<Vec<Article>>, AppError>;

    async fn get_article(&self, id: i64) -> Result<Option<Article>, AppError>;

    /// Drops any cached copies so the next read hits the source.
    async fn invalidate(&self);
}

/// One consistent view of the catalog for the duration of a single turn.
///
/// Filtering, prompt assembly and enrichment all read from the same snapshot.
#[derive(Debug, Clone)]
pub struct CatalogSnapshot {
    pub products: Arc<Vec<Product>>,
    pub articles: Arc<Vec<Article>>,
}

impl CatalogSnapshot {
    pub async fn load(catalog: &dyn CatalogRepository) -> Result<Self, AppError> {
        let products = catalog.get_all_products().await?;
        let articles = catalog.get_all_articles().await?;
        Ok(Self { products, articles })
    }

    pub fn product(&self, id: i64) -> Option<Product> {
        self.products.iter().find(|p| p.id == id).cloned()
    }

    pub fn article(&self, id: i64) -> Option<Article> {
        self.articles.iter().find(|a| a.id == id).cloned()
    }
}

/// Fixed in-memory catalog.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    products: Arc<Vec<Product>>,
    articles: Arc<Vec<Article>>,
}

impl InMemoryCatalog {
    pub fn new(products: Vec<Product>, articles: Vec<Article>) -> Self {
        Self {
            products: Arc::new(products),
            articles: Arc::new(articles),
        }
    }
}

#[async_trait]
impl CatalogRepository for InMemoryCatalog {
    async fn get_all_products(&self) -> Result<Arc<Vec<Product>>, AppError> {
        Ok(Arc::clone(&self.products))
    }

    async fn get_product(&self, id: i64) -> Result<Option<Product>, AppError> {
        Ok(self.products.iter().find(|p| p.id == id).cloned())
    }

    async fn get_all_articles(&self) -> Result<Arc<Vec<Article>>, AppError> {
        Ok(Arc::clone(&self.articles))
    }

    async fn get_article(&self, id: i64) -> Result<Option<Article>, AppError> {
        Ok(self.articles.iter().find(|a| a.id == id).cloned())
    }

    async fn invalidate(&self) {}
}
