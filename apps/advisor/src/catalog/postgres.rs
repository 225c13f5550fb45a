use std::sync::Arc;

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::info;

use crate::catalog::CatalogRepository;
use crate::errors::AppError;
use crate::models::catalog::{Article, Product};

/// Most recent articles offered to the advisor.
const ARTICLE_LIMIT: i64 = 50;

const PRODUCT_COLUMNS: &str = "id, name, price, regular_price, sale_price, categories, \
    description, features, url, image, in_stock";

const ARTICLE_COLUMNS: &str = "id, title, excerpt, categories, tags, url, date";

/// Reads the published catalog from the shop database.
/// Only purchasable products and published articles are visible.
#[derive(Clone)]
pub struct PgCatalogSource {
    pool: PgPool,
}

impl PgCatalogSource {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CatalogRepository for PgCatalogSource {
    async fn get_all_products(&self) -> Result<Arc<Vec<Product>>, AppError> {
        let products = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE purchasable ORDER BY menu_order, id"
        ))
        .fetch_all(&self.pool)
        .await?;

        info!("Loaded {} products from catalog", products.len());
        Ok(Arc::new(products))
    }

    async fn get_product(&self, id: i64) -> Result<Option<Product>, AppError> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1 AND purchasable"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    async fn get_all_articles(&self) -> Result<Arc<Vec<Article>>, AppError> {
        let articles = sqlx::query_as::<_, Article>(&format!(
            "SELECT {ARTICLE_COLUMNS} FROM articles WHERE status = 'publish' \
             ORDER BY date DESC, id DESC LIMIT $1"
        ))
        .bind(ARTICLE_LIMIT)
        .fetch_all(&self.pool)
        .await?;

        info!("Loaded {} articles from catalog", articles.len());
        Ok(Arc::new(articles))
    }

    async fn get_article(&self, id: i64) -> Result<Option<Article>, AppError> {
        let article = sqlx::query_as::<_, Article>(&format!(
            "SELECT {ARTICLE_COLUMNS} FROM articles WHERE id = $1 AND status = 'publish'"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(article)
    }

    async fn invalidate(&self) {}
}
