use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Json,
};
use http::HeaderName;
use std::sync::Arc;
use tracing::info;

use super::models::{
    validated, CreateSharedLinkRequest, DeleteSharedLinkResponse, MarkPaymentRequest,
    PaymentRecordsQuery, SharedLinkResponse,
};
use crate::access::gate::{ADMIN_ROLES, READ_ROLES};
use crate::access::{AccessGate, CapabilityTokenAuthority, Credentials, SharedLinkValidation};
use crate::config::Config;
use crate::directory::SessionProvider;
use crate::error::AppResult;
use crate::ledger::{LedgerKey, LedgerMutator, LedgerRow, PaymentRecord, ReconciliationEngine};

/// Session header supplied by the console's auth collaborator.
static SESSION_HEADER: HeaderName = HeaderName::from_static("x-session-token");

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ReconciliationEngine>,
    pub mutator: Arc<LedgerMutator>,
    pub authority: Arc<CapabilityTokenAuthority>,
    pub gate: Arc<AccessGate>,
    pub sessions: Arc<dyn SessionProvider>,
    pub config: Arc<Config>,
}

/// Resolve what the caller presented. A capability token wins over a
/// session header; neither resolves to Anonymous and fails downstream.
async fn credentials(
    state: &AppState,
    headers: &HeaderMap,
    token: Option<&str>,
) -> AppResult<Credentials> {
    if let Some(token) = token {
        return Ok(Credentials::SharedToken(token.to_string()));
    }
    if let Some(session_token) = headers.get(&SESSION_HEADER).and_then(|v| v.to_str().ok()) {
        if let Some(identity) = state.sessions.resolve(session_token).await? {
            return Ok(Credentials::Session(identity));
        }
    }
    Ok(Credentials::Anonymous)
}

pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Reconciled payment records for a month.
/// GET /api/v1/payments
pub async fn get_payment_records(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<PaymentRecordsQuery>,
) -> AppResult<Json<Vec<PaymentRecord>>> {
    let query = validated(query)?;
    let selector = query.selector()?;

    let creds = credentials(&state, &headers, query.token.as_deref()).await?;
    let scope = state.gate.authorize(&creds, &READ_ROLES).await?;

    let records = state
        .engine
        .payment_records(query.month, query.year, selector, &scope)
        .await?;
    Ok(Json(records))
}

/// Mark a user's pay period as paid.
/// POST /api/v1/payments/mark-paid
pub async fn mark_payment_paid(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<MarkPaymentRequest>,
) -> AppResult<Json<LedgerRow>> {
    let request = validated(request)?;

    let creds = credentials(&state, &headers, request.token.as_deref()).await?;
    let scope = state.gate.authorize(&creds, &ADMIN_ROLES).await?;

    let key = LedgerKey {
        user_id: request.user_id,
        period: request.period,
        month: request.month,
        year: request.year,
    };
    let actor = request
        .actor
        .as_deref()
        .unwrap_or_else(|| scope.actor_name());

    let row = state.mutator.mark_paid(&key, actor, &scope).await?;
    Ok(Json(row))
}

/// Revert a user's pay period to pending.
/// POST /api/v1/payments/mark-pending
pub async fn mark_payment_pending(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<MarkPaymentRequest>,
) -> AppResult<Json<LedgerRow>> {
    let request = validated(request)?;

    let creds = credentials(&state, &headers, request.token.as_deref()).await?;
    let scope = state.gate.authorize(&creds, &ADMIN_ROLES).await?;

    let key = LedgerKey {
        user_id: request.user_id,
        period: request.period,
        month: request.month,
        year: request.year,
    };

    let row = state.mutator.mark_pending(&key, &scope).await?;
    Ok(Json(row))
}

/// Mint (or return) the shared invoice link for a pay period.
/// POST /api/v1/shared-links
pub async fn create_shared_link(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<CreateSharedLinkRequest>,
) -> AppResult<Json<SharedLinkResponse>> {
    let request = validated(request)?;

    // Link management is session-only: a token never mints a token.
    let creds = credentials(&state, &headers, None).await?;
    let scope = state.gate.require_role(&creds, &ADMIN_ROLES).await?;

    let link = state
        .authority
        .mint(request.month, request.year, request.period, &scope)
        .await?;

    info!(month = link.month, year = link.year, period = %link.period, "shared link issued");
    Ok(Json(SharedLinkResponse {
        url: format!(
            "{}/shared-invoice/{}",
            state.config.public_base_url.trim_end_matches('/'),
            link.token
        ),
        token: link.token,
        month: link.month,
        year: link.year,
        period: link.period,
        expires_at: link.expires_at,
    }))
}

/// Public validation endpoint for a shared link token; this is the whole
/// unauthenticated surface into the ledger.
/// GET /api/v1/shared-links/:token
pub async fn validate_shared_link(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> AppResult<Json<SharedLinkValidation>> {
    let outcome = state.authority.validate(&token).await?;
    Ok(Json(outcome))
}

/// Revoke a shared link.
/// DELETE /api/v1/shared-links/:token
pub async fn delete_shared_link(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(token): Path<String>,
) -> AppResult<Json<DeleteSharedLinkResponse>> {
    let creds = credentials(&state, &headers, None).await?;
    let scope = state.gate.require_role(&creds, &ADMIN_ROLES).await?;

    let success = state.authority.revoke(&token, &scope).await?;
    Ok(Json(DeleteSharedLinkResponse { success }))
}
