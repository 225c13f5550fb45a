use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A purchasable product as exposed to the advisor.
/// An `id` of 0 (or a row without one) is treated as a missing identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Product {
    #[serde(default)]
    pub id: i64,
    pub name: String,
    pub price: f64,
    #[serde(default)]
    pub regular_price: f64,
    #[serde(default)]
    pub sale_price: Option<f64>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub features: Vec<String>,
    pub url: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default = "default_in_stock")]
    pub in_stock: bool,
}

/// A published blog article that can be linked from advice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Article {
    #[serde(default)]
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub excerpt: String,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub url: String,
    #[serde(default)]
    pub date: Option<NaiveDate>,
}

fn default_in_stock() -> bool {
    true
}

/// Anything the catalog filter can score and the prompt builder can cite.
pub trait CatalogEntry {
    fn id(&self) -> i64;

    /// Name/title, categories and description/excerpt joined by spaces.
    fn searchable_text(&self) -> String;

    fn has_identifier(&self) -> bool {
        self.id() > 0
    }
}

impl CatalogEntry for Product {
    fn id(&self) -> i64 {
        self.id
    }

    fn searchable_text(&self) -> String {
        format!(
            "{} {} {}",
            self.name,
            self.categories.join(" "),
            self.description
        )
    }
}

impl CatalogEntry for Article {
    fn id(&self) -> i64 {
        self.id
    }

    fn searchable_text(&self) -> String {
        format!(
            "{} {} {}",
            self.title,
            self.categories.join(" "),
            self.excerpt
        )
    }
}
