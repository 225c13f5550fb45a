//! TTL snapshot cache in front of a catalog source.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::debug;

use crate::catalog::CatalogRepository;
use crate::errors::AppError;
use crate::models::catalog::{Article, Product};

struct Entry<T> {
    value: Arc<Vec<T>>,
    loaded_at: Instant,
}

/// Caches full product and article lists for `ttl`. Single-item lookups are
/// answered from a fresh snapshot when possible and fall through to the source
/// otherwise.
pub struct CachedCatalog<S> {
    source: S,
    ttl: Duration,
    products: RwLock<Option<Entry<Product>>>,
    articles: RwLock<Option<Entry<Article>>>,
}

impl<S: CatalogRepository> CachedCatalog<S> {
    pub fn new(source: S, ttl: Duration) -> Self {
        Self {
            source,
            ttl,
            products: RwLock::new(None),
            articles: RwLock::new(None),
        }
    }

    fn fresh<T>(&self, entry: &Option<Entry<T>>) -> Option<Arc<Vec<T>>> {
        entry
            .as_ref()
            .filter(|e| e.loaded_at.elapsed() < self.ttl)
            .map(|e| Arc::clone(&e.value))
    }
}

#[async_trait]
impl<S: CatalogRepository> CatalogRepository for CachedCatalog<S> {
    async fn get_all_products(&self) -> Result<Arc<Vec<Product>>, AppError> {
        if let Some(hit) = self.fresh(&*self.products.read().await) {
            return Ok(hit);
        }

        let mut slot = self.products.write().await;
        // Another task may have refilled the slot while we waited for the lock.
        if let Some(hit) = self.fresh(&*slot) {
            return Ok(hit);
        }
        let value = self.source.get_all_products().await?;
        debug!("Product cache refreshed ({} items)", value.len());
        *slot = Some(Entry {
            value: Arc::clone(&value),
            loaded_at: Instant::now(),
        });
        Ok(value)
    }

    async fn get_product(&self, id: i64) -> Result<Option<Product>, AppError> {
        if let Some(products) = self.fresh(&*self.products.read().await) {
            if let Some(product) = products.iter().find(|p| p.id == id) {
                return Ok(Some(product.clone()));
            }
        }
        self.source.get_product(id).await
    }

    async fn get_all_articles(&self) -> Result<Arc<Vec<Article>>, AppError> {
        if let Some(hit) = self.fresh(&*self.articles.read().await) {
            return Ok(hit);
        }

        let mut slot = self.articles.write().await;
        if let Some(hit) = self.fresh(&*slot) {
            return Ok(hit);
        }
        let value = self.source.get_all_articles().await?;
        debug!("Article cache refreshed ({} items)", value.len());
        *slot = Some(Entry {
            value: Arc::clone(&value),
            loaded_at: Instant::now(),
        });
        Ok(value)
    }

    async fn get_article(&self, id: i64) -> Result<Option<Article>, AppError> {
        if let Some(articles) = self.fresh(&*self.articles.read().await) {
            if let Some(article) = articles.iter().find(|a| a.id == id) {
                return Ok(Some(article.clone()));
            }
        }
        self.source.get_article(id).await
    }

    async fn invalidate(&self) {
        *self.products.write().await = None;
        *self.articles.write().await = None;
        self.source.invalidate().await;
        debug!("Catalog cache invalidated");
    }
}
