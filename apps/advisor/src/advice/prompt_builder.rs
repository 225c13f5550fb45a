//! Prompt Assembler: turns policy text plus the filtered catalog into the system prompt.
//!
//! Section order is fixed:
//! role → numbered rules → output schema → products → articles → matching guidelines.
//! Every entry renders with a stable field order, so identical inputs give
//! byte-identical prompts.

use tracing::debug;

use crate::advice::prompts::{
    ARTICLE_CATALOG_HEADING, CATEGORY_DELIMITER, MATCHING_GUIDELINES_SECTION, NO_ARTICLES_LINE,
    NO_PRODUCTS_LINE, OUTPUT_SCHEMA_SECTION, PRODUCT_CATALOG_HEADING, ROLE_SECTION, RULES,
    RULES_HEADING,
};
use crate::errors::AppError;
use crate::models::catalog::{Article, CatalogEntry, Product};

/// Builds the system prompt for one turn.
///
/// Never fails on empty catalogs or an empty message. Fails with
/// `AppError::Configuration` when a catalog entry has no identifier.
pub fn build_system_prompt(
    latest_user_message: &str,
    products: &[Product],
    articles: &[Article],
) -> Result<String, AppError> {
    ensure_identifiers(products, "product")?;
    ensure_identifiers(articles, "article")?;

    let mut prompt = String::with_capacity(8 * 1024);
    prompt.push_str(ROLE_SECTION);
    prompt.push_str(&format_rules());
    prompt.push_str(OUTPUT_SCHEMA_SECTION);
    prompt.push_str(&format_product_catalog(products));
    prompt.push_str(&format_article_catalog(articles));
    prompt.push_str(MATCHING_GUIDELINES_SECTION);

    debug!(
        message_chars = latest_user_message.chars().count(),
        products = products.len(),
        articles = articles.len(),
        prompt_chars = prompt.chars().count(),
        "System prompt assembled"
    );

    Ok(prompt)
}

fn ensure_identifiers<T: CatalogEntry>(items: &[T], kind: &str) -> Result<(), AppError> {
    match items.iter().position(|item| !item.has_identifier()) {
        Some(index) => Err(AppError::Configuration(format!(
            "{kind} at catalog position {index} has no identifier"
        ))),
        None => Ok(()),
    }
}

fn format_rules() -> String {
    let mut section = format!("{RULES_HEADING}\n\n");
    for (i, rule) in RULES.iter().enumerate() {
        section.push_str(&format!("{}. {}\n", i + 1, rule));
    }
    section.push_str("\n\n");
    section
}

fn format_product_catalog(products: &[Product]) -> String {
    let mut catalog = format!("{PRODUCT_CATALOG_HEADING}\n\n");

    if products.is_empty() {
        catalog.push_str(NO_PRODUCTS_LINE);
        catalog.push_str("\n\n");
        return catalog;
    }

    for product in products {
        catalog.push_str(&format!("## Product ID: {}\n", product.id));
        catalog.push_str(&format!("Naam: {}\n", product.name));
        catalog.push_str(&format!("Prijs: €{:.2}\n", product.price));
        catalog.push_str(&format!(
            "Categorie: {}\n",
            product.categories.join(CATEGORY_DELIMITER)
        ));
        catalog.push_str(&format!("Beschrijving: {}\n", product.description));

        if !product.features.is_empty() {
            catalog.push_str("Kenmerken:\n");
            for feature in &product.features {
                catalog.push_str(&format!("- {feature}\n"));
            }
        }

        catalog.push_str(&format!("Link: {}\n\n", product.url));
    }

    catalog
}

fn format_article_catalog(articles: &[Article]) -> String {
    let mut catalog = format!("{ARTICLE_CATALOG_HEADING}\n\n");

    if articles.is_empty() {
        catalog.push_str(NO_ARTICLES_LINE);
        catalog.push_str("\n\n");
        return catalog;
    }

    for article in articles {
        catalog.push_str(&format!("## Artikel ID: {}\n", article.id));
        catalog.push_str(&format!("Titel: {}\n", article.title));
        catalog.push_str(&format!(
            "Onderwerp: {}\n",
            article.categories.join(CATEGORY_DELIMITER)
        ));
        catalog.push_str(&format!("Samenvatting: {}\n", article.excerpt));
        catalog.push_str(&format!("Link: {}\n\n", article.url));
    }

    catalog
}
