//! Catalog Filter: picks the catalog entries worth putting in front of the model.
//!
//! Keywords come from a static synonym table (canonical term → literal variants).
//! No LLM calls, no I/O: the output depends only on the inputs and the table.

use crate::models::catalog::CatalogEntry;

/// Maximum products injected into one prompt.
pub const MAX_PRODUCTS: usize = 20;
/// Maximum articles injected into one prompt.
pub const MAX_ARTICLES: usize = 5;

/// A canonical keyword and the literal spellings that count as a hit for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeywordGroup {
    pub canonical: &'static str,
    pub variants: &'static [&'static str],
}

const fn group(canonical: &'static str, variants: &'static [&'static str]) -> KeywordGroup {
    KeywordGroup {
        canonical,
        variants,
    }
}

/// Body parts and activities, in extraction order. Variants are lower-case.
pub const KEYWORD_SYNONYMS: &[KeywordGroup] = &[
    group("knie", &["knie", "knieen"]),
    group("enkel", &["enkel", "enkels"]),
    group("pols", &["pols", "polsen"]),
    group("elleboog", &["elleboog", "ellebogen"]),
    group("schouder", &["schouder", "schouders"]),
    group("rug", &["rug", "rugpijn", "rugklachten"]),
    group("nek", &["nek", "nekpijn"]),
    group("heup", &["heup", "heupen"]),
    group("voet", &["voet", "voeten"]),
    group("hand", &["hand", "handen"]),
    group("duim", &["duim", "duimen"]),
    group("hardlopen", &["hardlopen", "rennen", "joggen"]),
    group("sport", &["sport", "sporten"]),
    group("tennis", &["tennis", "tennissen"]),
    group("golf", &["golf", "golfen"]),
    group("fitness", &["fitness", "gym"]),
];

/// A catalog entry paired with its relevance during one filtering pass.
#[derive(Debug)]
struct RelevanceScore<'a, T> {
    item: &'a T,
    score: usize,
}

/// Extracts canonical keyword groups mentioned in the message.
/// Each group appears at most once, in table order.
pub fn extract_keywords(message: &str) -> Vec<&'static KeywordGroup> {
    let message = message.to_lowercase();
    KEYWORD_SYNONYMS
        .iter()
        .filter(|group| group.variants.iter().any(|v| message.contains(v)))
        .collect()
}

/// Number of keyword groups with at least one variant in `text`.
/// Repeated hits for the same group count once.
pub fn relevance_score(text: &str, keywords: &[&KeywordGroup]) -> usize {
    let text = text.to_lowercase();
    keywords
        .iter()
        .filter(|group| group.variants.iter().any(|v| text.contains(v)))
        .count()
}

/// Returns at most `max_results` entries ranked by relevance to `user_message`.
///
/// - No keyword extracted: the first `max_results` entries, catalog order.
/// - Otherwise: entries scoring ≥ 1, descending by score, ties in catalog order.
pub fn filter_catalog<T>(items: &[T], user_message: &str, max_results: usize) -> Vec<T>
where
    T: CatalogEntry + Clone,
{
    let keywords = extract_keywords(user_message);

    if keywords.is_empty() {
        return items.iter().take(max_results).cloned().collect();
    }

    let mut scored: Vec<RelevanceScore<'_, T>> = items
        .iter()
        .map(|item| RelevanceScore {
            item,
            score: relevance_score(&item.searchable_text(), &keywords),
        })
        .filter(|s| s.score > 0)
        .collect();

    // sort_by is stable: equal scores keep catalog order
    scored.sort_by(|a, b| b.score.cmp(&a.score));

    scored
        .into_iter()
        .take(max_results)
        .map(|s| s.item.clone())
        .collect()
}
