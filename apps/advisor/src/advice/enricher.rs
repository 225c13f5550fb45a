//! Response Enricher: hydrates the ids in a validated reply with catalog records.
//!
//! Lookups that miss never fail the reply: a missing product drops the product
//! section, a missing article drops that article.

use serde::{Deserialize, Serialize};

use crate::advice::contract::{AdviceBundle, AdviceResponse, HealthAdvice, QuestionReply};
use crate::models::catalog::{Article, Product};

/// What the caller receives: the question as-is, or the advice with catalog data attached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "message_type", rename_all = "snake_case")]
pub enum EnrichedResponse {
    Question(QuestionReply),
    Advice(EnrichedAdvice),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedAdvice {
    pub personal_message: String,
    /// `None` when the recommended product is not in the catalog.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_recommendation: Option<EnrichedProductRecommendation>,
    pub health_advice: HealthAdvice,
    pub severity_warning: bool,
    pub related_blogs: Vec<i64>,
    #[serde(default)]
    pub related_blogs_data: Vec<Article>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedProductRecommendation {
    pub product_id: i64,
    pub reasoning: String,
    pub product_data: Product,
}

impl EnrichedResponse {
    pub fn is_advice(&self) -> bool {
        matches!(self, EnrichedResponse::Advice(_))
    }

    /// ORs the externally detected severity into the advice. Questions are unaffected.
    pub fn merge_severity(&mut self, detected: bool) {
        if let EnrichedResponse::Advice(advice) = self {
            advice.severity_warning |= detected;
        }
    }
}

/// Resolves product and article ids through the given lookups.
pub fn enrich<P, B>(response: AdviceResponse, product_lookup: P, blog_lookup: B) -> EnrichedResponse
where
    P: Fn(i64) -> Option<Product>,
    B: Fn(i64) -> Option<Article>,
{
    match response {
        AdviceResponse::Question(question) => EnrichedResponse::Question(question),
        AdviceResponse::Advice(advice) => {
            EnrichedResponse::Advice(enrich_advice(advice, product_lookup, blog_lookup))
        }
    }
}

fn enrich_advice<P, B>(advice: AdviceBundle, product_lookup: P, blog_lookup: B) -> EnrichedAdvice
where
    P: Fn(i64) -> Option<Product>,
    B: Fn(i64) -> Option<Article>,
{
    let AdviceBundle {
        personal_message,
        product_recommendation,
        health_advice,
        severity_warning,
        related_blogs,
    } = advice;

    let product_recommendation = match product_lookup(product_recommendation.product_id) {
        Some(product_data) => Some(EnrichedProductRecommendation {
            product_id: product_recommendation.product_id,
            reasoning: product_recommendation.reasoning,
            product_data,
        }),
        None => {
            tracing::warn!(
                product_id = product_recommendation.product_id,
                "Recommended product not found in catalog, omitting product section"
            );
            None
        }
    };

    let related_blogs_data = related_blogs.iter().filter_map(|&id| blog_lookup(id)).collect();

    EnrichedAdvice {
        personal_message,
        product_recommendation,
        health_advice,
        severity_warning,
        related_blogs,
        related_blogs_data,
    }
}
