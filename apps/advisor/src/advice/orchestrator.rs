//! Turn orchestration: runs one user message through the advisor pipeline.
//!
//! Flow: validate → session → severity → snapshot → filter → prompt →
//!       gateway → enrich → severity merge → session status → response.
//!
//! Conversation bookkeeping is best effort: a store failure is logged and the
//! turn still gets its answer.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::advice::catalog_filter::{filter_catalog, MAX_ARTICLES, MAX_PRODUCTS};
use crate::advice::contract::AdviceResponse;
use crate::advice::enricher::{enrich, EnrichedResponse};
use crate::advice::prompt_builder::build_system_prompt;
use crate::advice::severity::detect_severe;
use crate::catalog::{CatalogRepository, CatalogSnapshot};
use crate::errors::AppError;
use crate::llm_client::CompletionGateway;
use crate::models::conversation::{ConversationTurn, Role};
use crate::sessions::{new_session_id, ClientInfo, ConversationStore, SessionStatus};

/// Longest user message accepted, in characters.
pub const MAX_MESSAGE_CHARS: usize = 2000;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct TurnRequest {
    pub message: String,
    #[serde(default)]
    pub session_id: Option<String>,
    /// Earlier turns, oldest first. Echoed to the model, never modified.
    #[serde(default)]
    pub history: Vec<ConversationTurn>,
    /// Filled in by the HTTP layer, never read from the body.
    #[serde(skip)]
    pub client: ClientInfo,
}

#[derive(Debug, Clone, Serialize)]
pub struct TurnResult {
    pub session_id: String,
    pub response: EnrichedResponse,
    pub tokens_used: u32,
}

// ────────────────────────────────────────────────────────────────────────────
// Orchestrator
// ────────────────────────────────────────────────────────────────────────────

/// Wires the advisor's collaborators together. Cheap to clone.
#[derive(Clone)]
pub struct Advisor {
    catalog: Arc<dyn CatalogRepository>,
    gateway: Arc<dyn CompletionGateway>,
    store: Arc<dyn ConversationStore>,
}

impl Advisor {
    pub fn new(
        catalog: Arc<dyn CatalogRepository>,
        gateway: Arc<dyn CompletionGateway>,
        store: Arc<dyn ConversationStore>,
    ) -> Self {
        Self {
            catalog,
            gateway,
            store,
        }
    }

    /// Handles one incoming message.
    ///
    /// Steps:
    /// 1. validate the message
    /// 2. reuse or mint the session id
    /// 3. detect severity on the raw message
    /// 4. load one catalog snapshot, filter products and articles
    /// 5. build the system prompt, call the gateway once
    /// 6. enrich advice from the same snapshot, merge severity
    /// 7. mark the session completed when advice was given
    pub async fn handle_turn(&self, request: TurnRequest) -> Result<TurnResult, AppError> {
        let TurnRequest {
            message,
            session_id,
            history,
            client,
        } = request;

        // Step 1: Validate
        let message = message.trim().to_string();
        if message.is_empty() {
            return Err(AppError::Validation("Bericht mag niet leeg zijn.".to_string()));
        }
        if message.chars().count() > MAX_MESSAGE_CHARS {
            return Err(AppError::Validation(format!(
                "Bericht mag maximaal {MAX_MESSAGE_CHARS} tekens bevatten."
            )));
        }

        // Step 2: Session
        let session_id = match session_id.filter(|id| !id.trim().is_empty()) {
            Some(id) => id,
            None => {
                let id = new_session_id();
                info!("Started session {id}");
                id
            }
        };
        log_store_failure(
            self.store.save_session(&session_id, &client).await,
            "save session",
        );

        // Step 3: Severity, independent of the model
        let severe = detect_severe(&message);
        if severe {
            info!("Severe symptoms detected in session {session_id}");
        }

        let mut turns = history;
        turns.push(ConversationTurn::user(message.as_str()));

        log_store_failure(
            self.store
                .save_message(&session_id, Role::User, &message, 0)
                .await,
            "save user message",
        );

        // Step 4: Catalog snapshot + filtering
        let snapshot = CatalogSnapshot::load(self.catalog.as_ref()).await?;
        let products = filter_catalog(&snapshot.products, &message, MAX_PRODUCTS);
        let articles = filter_catalog(&snapshot.articles, &message, MAX_ARTICLES);
        info!(
            "Selected {} of {} products and {} of {} articles for session {}",
            products.len(),
            snapshot.products.len(),
            articles.len(),
            snapshot.articles.len(),
            session_id
        );

        // Step 5: Prompt + generation
        let system_prompt = build_system_prompt(&message, &products, &articles)?;
        let completion = self.gateway.complete(&system_prompt, &turns).await?;

        log_store_failure(
            self.store
                .save_message(
                    &session_id,
                    Role::Assistant,
                    &completion.raw_content,
                    completion.tokens_used,
                )
                .await,
            "save assistant message",
        );

        if let AdviceResponse::Advice(advice) = &completion.response {
            log_store_failure(
                self.store
                    .save_recommendation(&session_id, advice.product_recommendation.product_id)
                    .await,
                "save recommendation",
            );
        }

        // Step 6: Enrichment + severity merge
        let mut response = enrich(
            completion.response,
            |id| snapshot.product(id),
            |id| snapshot.article(id),
        );
        response.merge_severity(severe);

        // Step 7: Session status
        if response.is_advice() {
            log_store_failure(
                self.store
                    .update_session_status(&session_id, SessionStatus::Completed)
                    .await,
                "complete session",
            );
        }

        info!(
            "Session {} answered with {} using {} tokens ({})",
            session_id,
            if response.is_advice() { "advice" } else { "a question" },
            completion.tokens_used,
            completion.model
        );

        Ok(TurnResult {
            session_id,
            response,
            tokens_used: completion.tokens_used,
        })
    }
}

fn log_store_failure(result: Result<(), AppError>, action: &str) {
    if let Err(e) = result {
        warn!("Conversation store failed to {action}: {e}");
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
