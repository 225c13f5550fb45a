//! Axum route handlers for the advisor API.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use axum::{
    extract::{rejection::JsonRejection, ConnectInfo, State},
    http::{header::USER_AGENT, HeaderMap},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::advice::orchestrator::{TurnRequest, TurnResult};
use crate::errors::AppError;
use crate::sessions::ClientInfo;
use crate::state::AppState;

pub const ADMIN_TOKEN_HEADER: &str = "x-admin-token";
const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ProductClickRequest {
    #[serde(default)]
    pub session_id: String,
    #[serde(default)]
    pub product_id: i64,
}

#[derive(Debug, Serialize)]
pub struct ProductClickResponse {
    pub tracked: bool,
}

#[derive(Debug, Serialize)]
pub struct CacheClearResponse {
    pub cleared: bool,
}

#[derive(Debug, Serialize)]
pub struct ConnectionTestResponse {
    pub status: &'static str,
    pub model: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/chat/message
///
/// Runs one conversation turn. Rate limited per client; a limiter outage lets
/// the request through.
pub async fn handle_chat_message(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    payload: Result<Json<TurnRequest>, JsonRejection>,
) -> Result<Json<TurnResult>, AppError> {
    let client_ip = client_ip(&headers, connect_info.map(|ConnectInfo(addr)| addr));

    match state.rate_limiter.check(&client_ip.to_string()).await {
        Ok(true) => {}
        Ok(false) => {
            info!("Rate limit exceeded for {client_ip}");
            return Err(AppError::RateLimited);
        }
        Err(e) => warn!("Rate limiter unavailable, allowing request: {e}"),
    }

    let mut request = json_body(payload)?;
    let user_agent = headers.get(USER_AGENT).and_then(|v| v.to_str().ok());
    request.client = ClientInfo::new(client_ip.to_string(), user_agent);

    let result = state.advisor.handle_turn(request).await?;
    Ok(Json(result))
}

/// POST /api/v1/chat/click
///
/// Records that the user followed a recommended product link.
pub async fn handle_product_click(
    State(state): State<AppState>,
    payload: Result<Json<ProductClickRequest>, JsonRejection>,
) -> Result<Json<ProductClickResponse>, AppError> {
    let request = json_body(payload)?;

    let session_id = request.session_id.trim();
    if session_id.is_empty() || request.product_id <= 0 {
        return Err(AppError::Validation("Ongeldige parameters.".to_string()));
    }

    let tracked = state
        .store
        .track_product_click(session_id, request.product_id)
        .await?;
    if tracked {
        info!(
            "Product {} clicked in session {session_id}",
            request.product_id
        );
    } else {
        debug!(
            "Click for product {} matched no recommendation in session {session_id}",
            request.product_id
        );
    }

    Ok(Json(ProductClickResponse { tracked }))
}

/// POST /api/v1/admin/cache/clear
pub async fn handle_clear_cache(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<CacheClearResponse>, AppError> {
    require_admin(&headers, state.config.admin_token.as_deref())?;

    state.catalog.invalidate().await;
    info!("Catalog cache cleared");

    Ok(Json(CacheClearResponse { cleared: true }))
}

/// POST /api/v1/admin/test-connection
///
/// Sends a minimal request to the generation endpoint.
pub async fn handle_test_connection(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ConnectionTestResponse>, AppError> {
    require_admin(&headers, state.config.admin_token.as_deref())?;

    state.gateway.probe().await?;

    Ok(Json(ConnectionTestResponse {
        status: "ok",
        model: state.config.generation.model.clone(),
    }))
}

// ────────────────────────────────────────────────────────────────────────────
// Helpers
// ────────────────────────────────────────────────────────────────────────────

/// Unwraps a JSON body; the rejection detail is logged, never returned.
fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    payload.map(|Json(body)| body).map_err(|rejection| {
        warn!("Rejected request body: {rejection}");
        AppError::Validation("Ongeldig verzoek.".to_string())
    })
}

/// First hop of `X-Forwarded-For` when it is a valid IP, else the peer
/// address, else `0.0.0.0`.
fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> IpAddr {
    let forwarded = headers
        .get(FORWARDED_FOR_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .and_then(|v| v.trim().parse::<IpAddr>().ok());

    forwarded
        .or_else(|| peer.map(|addr| addr.ip()))
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
}

/// Admin routes are closed unless a token is configured and presented.
fn require_admin(headers: &HeaderMap, expected: Option<&str>) -> Result<(), AppError> {
    let presented = headers
        .get(ADMIN_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok());

    match (expected, presented) {
        (Some(expected), Some(presented)) if !expected.is_empty() && expected == presented => {
            Ok(())
        }
        _ => {
            warn!("Rejected admin request");
            Err(AppError::Forbidden)
        }
    }
}
