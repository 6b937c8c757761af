// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Provider callback endpoints (seamless wallet protocol).
//!
//! Every inbound call moves through the same pipeline: verify the request
//! signature, resolve the target account, invoke the ledger, respond. A bad
//! signature short-circuits before any ledger access; ledger failures are
//! translated into the provider's fixed status vocabulary. The provider owns
//! all retries, which is why the ledger's idempotency on `transactionRef` is
//! load-bearing — a retried call must never double-charge or double-pay.
//!
//! Responses always use HTTP 200 with a body-level `status` code; the
//! provider's client inspects the body, not the transport status.

use std::collections::BTreeMap;

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{ledger::LedgerError, state::AppState};

// =============================================================================
// Provider Status Vocabulary
// =============================================================================

/// Fixed body-level status codes of the provider protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderStatus {
    Ok = 200,
    InvalidRequest = 400,
    InsufficientFunds = 402,
    InvalidSignature = 403,
    AccountNotFound = 404,
    TransactionNotFound = 408,
    AlreadyProcessed = 409,
    InternalError = 500,
}

impl ProviderStatus {
    pub fn code(self) -> u16 {
        self as u16
    }
}

// =============================================================================
// Response Shape
// =============================================================================

/// Provider-facing response body.
///
/// `status` is always present; the remaining fields depend on the operation.
#[derive(Debug, Serialize, ToSchema)]
pub struct ProviderResponse {
    /// Status code from the provider vocabulary.
    pub status: u16,
    /// Whether the mutation was applied (absent on balance queries).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    /// Current balance in minor units (balance queries only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub balance: Option<i64>,
    /// Balance after the mutation, in minor units.
    #[serde(rename = "newBalance", skip_serializing_if = "Option::is_none")]
    pub new_balance: Option<i64>,
    /// Failure description, absent on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProviderResponse {
    fn ok_balance(balance: i64) -> Self {
        Self {
            status: ProviderStatus::Ok.code(),
            success: None,
            balance: Some(balance),
            new_balance: None,
            error: None,
        }
    }

    fn ok_applied(new_balance: i64) -> Self {
        Self {
            status: ProviderStatus::Ok.code(),
            success: Some(true),
            balance: None,
            new_balance: Some(new_balance),
            error: None,
        }
    }

    fn failure(status: ProviderStatus, message: impl Into<String>) -> Self {
        Self {
            status: status.code(),
            success: Some(false),
            balance: None,
            new_balance: None,
            error: Some(message.into()),
        }
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Query a player's balance. Read-only; no transfer record is created.
#[utoipa::path(
    get,
    path = "/api/balance",
    tag = "Provider",
    params(
        ("accountId" = String, Query, description = "Account to query"),
        ("key" = String, Query, description = "Request signature digest")
    ),
    responses(
        (status = 200, description = "Body-level status code indicates the outcome", body = ProviderResponse)
    )
)]
pub async fn balance(
    State(state): State<AppState>,
    Query(params): Query<BTreeMap<String, String>>,
) -> Json<ProviderResponse> {
    let response = balance_inner(&state, &params).unwrap_or_else(|failure| failure);
    Json(response)
}

fn balance_inner(
    state: &AppState,
    params: &BTreeMap<String, String>,
) -> Result<ProviderResponse, ProviderResponse> {
    authenticate(state, params)?;
    let account_id = require_param(params, "accountId")?;
    let account = state.ledger.get_account(account_id).map_err(ledger_failure)?;
    Ok(ProviderResponse::ok_balance(account.balance))
}

/// Debit a player's balance for a wager.
#[utoipa::path(
    get,
    path = "/api/debit",
    tag = "Provider",
    params(
        ("accountId" = String, Query, description = "Account to debit"),
        ("amount" = i64, Query, description = "Amount in minor units"),
        ("transactionRef" = String, Query, description = "Provider idempotency key"),
        ("key" = String, Query, description = "Request signature digest")
    ),
    responses(
        (status = 200, description = "Body-level status code indicates the outcome", body = ProviderResponse)
    )
)]
pub async fn debit(
    State(state): State<AppState>,
    Query(params): Query<BTreeMap<String, String>>,
) -> Json<ProviderResponse> {
    let response = debit_inner(&state, &params).unwrap_or_else(|failure| failure);
    Json(response)
}

fn debit_inner(
    state: &AppState,
    params: &BTreeMap<String, String>,
) -> Result<ProviderResponse, ProviderResponse> {
    authenticate(state, params)?;
    let account_id = require_param(params, "accountId")?;
    let amount = require_amount(params)?;
    let transaction_ref = require_param(params, "transactionRef")?;

    let record = state
        .ledger
        .provider_debit(account_id, amount, transaction_ref)
        .map_err(ledger_failure)?;
    Ok(ProviderResponse::ok_applied(record.balance_after))
}

/// Credit a player's balance for a win.
#[utoipa::path(
    get,
    path = "/api/credit",
    tag = "Provider",
    params(
        ("accountId" = String, Query, description = "Account to credit"),
        ("amount" = i64, Query, description = "Amount in minor units"),
        ("transactionRef" = String, Query, description = "Provider idempotency key"),
        ("key" = String, Query, description = "Request signature digest")
    ),
    responses(
        (status = 200, description = "Body-level status code indicates the outcome", body = ProviderResponse)
    )
)]
pub async fn credit(
    State(state): State<AppState>,
    Query(params): Query<BTreeMap<String, String>>,
) -> Json<ProviderResponse> {
    let response = credit_inner(&state, &params).unwrap_or_else(|failure| failure);
    Json(response)
}

fn credit_inner(
    state: &AppState,
    params: &BTreeMap<String, String>,
) -> Result<ProviderResponse, ProviderResponse> {
    authenticate(state, params)?;
    let account_id = require_param(params, "accountId")?;
    let amount = require_amount(params)?;
    let transaction_ref = require_param(params, "transactionRef")?;

    let record = state
        .ledger
        .provider_credit(account_id, amount, transaction_ref)
        .map_err(ledger_failure)?;
    Ok(ProviderResponse::ok_applied(record.balance_after))
}

/// Reverse a previously applied debit or credit.
#[utoipa::path(
    get,
    path = "/api/rollback",
    tag = "Provider",
    params(
        ("transactionRef" = String, Query, description = "Reference of the operation to reverse"),
        ("key" = String, Query, description = "Request signature digest")
    ),
    responses(
        (status = 200, description = "Body-level status code indicates the outcome", body = ProviderResponse)
    )
)]
pub async fn rollback(
    State(state): State<AppState>,
    Query(params): Query<BTreeMap<String, String>>,
) -> Json<ProviderResponse> {
    let response = rollback_inner(&state, &params).unwrap_or_else(|failure| failure);
    Json(response)
}

fn rollback_inner(
    state: &AppState,
    params: &BTreeMap<String, String>,
) -> Result<ProviderResponse, ProviderResponse> {
    authenticate(state, params)?;
    let transaction_ref = require_param(params, "transactionRef")?;

    let record = state
        .ledger
        .provider_rollback(transaction_ref)
        .map_err(ledger_failure)?;
    Ok(ProviderResponse::ok_applied(record.balance_after))
}

// =============================================================================
// Pipeline Steps
// =============================================================================

/// Terminal signature check; no ledger access is attempted on failure.
fn authenticate(
    state: &AppState,
    params: &BTreeMap<String, String>,
) -> Result<(), ProviderResponse> {
    state.validator.verify(params).map_err(|e| {
        tracing::warn!(error = %e, "rejected provider request");
        ProviderResponse::failure(ProviderStatus::InvalidSignature, e.to_string())
    })
}

fn require_param<'a>(
    params: &'a BTreeMap<String, String>,
    name: &str,
) -> Result<&'a str, ProviderResponse> {
    params
        .get(name)
        .map(String::as_str)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| {
            ProviderResponse::failure(
                ProviderStatus::InvalidRequest,
                format!("missing parameter: {name}"),
            )
        })
}

fn require_amount(params: &BTreeMap<String, String>) -> Result<i64, ProviderResponse> {
    require_param(params, "amount")?.parse::<i64>().map_err(|_| {
        ProviderResponse::failure(
            ProviderStatus::InvalidRequest,
            "amount must be an integer in minor units",
        )
    })
}

/// Translate ledger failures into the provider vocabulary.
fn ledger_failure(err: LedgerError) -> ProviderResponse {
    let status = match &err {
        LedgerError::InsufficientFunds(_) => ProviderStatus::InsufficientFunds,
        LedgerError::AccountNotFound(_) => ProviderStatus::AccountNotFound,
        LedgerError::TransactionNotFound(_) => ProviderStatus::TransactionNotFound,
        LedgerError::AlreadyProcessed(_) | LedgerError::AlreadyRolledBack(_) => {
            ProviderStatus::AlreadyProcessed
        }
        LedgerError::InvalidAmount(_)
        | LedgerError::InvalidAccountId(_)
        | LedgerError::SelfTransfer => ProviderStatus::InvalidRequest,
        _ => {
            tracing::error!(error = %err, "ledger failure on provider call");
            return ProviderResponse::failure(ProviderStatus::InternalError, "internal error");
        }
    };
    ProviderResponse::failure(status, err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        api::router,
        ledger::LedgerEngine,
        signing::{SignatureValidator, SIGNATURE_PARAM},
    };
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    fn test_state() -> (AppState, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let ledger = LedgerEngine::open(&dir.path().join("test.redb")).unwrap();
        let state = AppState::new(
            ledger,
            SignatureValidator::new("test-secret"),
            "session-secret",
        );
        (state, dir)
    }

    /// Build a correctly signed request URI. Test values are URL-safe, so no
    /// percent-encoding is needed when assembling the query string.
    fn signed_uri(state: &AppState, path: &str, pairs: &[(&str, &str)]) -> String {
        let mut map: BTreeMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let digest = state.validator.compute_digest(&map);
        map.insert(SIGNATURE_PARAM.to_string(), digest);
        let query = map
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");
        format!("{path}?{query}")
    }

    async fn get_json(state: &AppState, uri: &str) -> serde_json::Value {
        let response = router(state.clone())
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), axum::http::StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn signed_balance_query_returns_balance() {
        let (state, _dir) = test_state();
        state.ledger.create_account("alice", 1000).unwrap();

        let uri = signed_uri(&state, "/api/balance", &[("accountId", "alice")]);
        let body = get_json(&state, &uri).await;
        assert_eq!(body["status"], 200);
        assert_eq!(body["balance"], 1000);
    }

    #[tokio::test]
    async fn debit_applies_and_replays_idempotently() {
        let (state, _dir) = test_state();
        state.ledger.create_account("alice", 1000).unwrap();

        let uri = signed_uri(
            &state,
            "/api/debit",
            &[("accountId", "alice"), ("amount", "300"), ("transactionRef", "tx1")],
        );
        let body = get_json(&state, &uri).await;
        assert_eq!(body["status"], 200);
        assert_eq!(body["success"], true);
        assert_eq!(body["newBalance"], 700);

        // Provider retry: same URL, same outcome, no second application
        let body = get_json(&state, &uri).await;
        assert_eq!(body["status"], 200);
        assert_eq!(body["newBalance"], 700);
        assert_eq!(state.ledger.get_account("alice").unwrap().balance, 700);
    }

    #[tokio::test]
    async fn tampered_parameter_is_rejected_before_ledger_access() {
        let (state, _dir) = test_state();
        state.ledger.create_account("alice", 1000).unwrap();

        let uri = signed_uri(
            &state,
            "/api/debit",
            &[("accountId", "alice"), ("amount", "300"), ("transactionRef", "tx1")],
        );
        let tampered = uri.replace("amount=300", "amount=900");
        let body = get_json(&state, &tampered).await;
        assert_eq!(body["status"], 403);
        assert_eq!(state.ledger.get_account("alice").unwrap().balance, 1000);
    }

    #[tokio::test]
    async fn missing_signature_is_rejected() {
        let (state, _dir) = test_state();
        state.ledger.create_account("alice", 1000).unwrap();

        let body = get_json(&state, "/api/balance?accountId=alice").await;
        assert_eq!(body["status"], 403);
    }

    #[tokio::test]
    async fn insufficient_funds_maps_to_402() {
        let (state, _dir) = test_state();
        state.ledger.create_account("alice", 100).unwrap();

        let uri = signed_uri(
            &state,
            "/api/debit",
            &[("accountId", "alice"), ("amount", "300"), ("transactionRef", "tx1")],
        );
        let body = get_json(&state, &uri).await;
        assert_eq!(body["status"], 402);
        assert_eq!(body["success"], false);
        assert_eq!(state.ledger.get_account("alice").unwrap().balance, 100);
    }

    #[tokio::test]
    async fn unknown_account_maps_to_404() {
        let (state, _dir) = test_state();
        let uri = signed_uri(&state, "/api/balance", &[("accountId", "ghost")]);
        let body = get_json(&state, &uri).await;
        assert_eq!(body["status"], 404);
    }

    #[tokio::test]
    async fn rollback_round_trip_restores_balance() {
        let (state, _dir) = test_state();
        state.ledger.create_account("alice", 1000).unwrap();

        let debit = signed_uri(
            &state,
            "/api/debit",
            &[("accountId", "alice"), ("amount", "300"), ("transactionRef", "tx1")],
        );
        get_json(&state, &debit).await;

        let rollback = signed_uri(&state, "/api/rollback", &[("transactionRef", "tx1")]);
        let body = get_json(&state, &rollback).await;
        assert_eq!(body["status"], 200);
        assert_eq!(body["success"], true);
        assert_eq!(body["newBalance"], 1000);

        // A second rollback is refused
        let body = get_json(&state, &rollback).await;
        assert_eq!(body["status"], 409);
        assert_eq!(state.ledger.get_account("alice").unwrap().balance, 1000);
    }

    #[tokio::test]
    async fn unknown_rollback_ref_maps_to_408() {
        let (state, _dir) = test_state();
        let uri = signed_uri(&state, "/api/rollback", &[("transactionRef", "ghost")]);
        let body = get_json(&state, &uri).await;
        assert_eq!(body["status"], 408);
    }

    #[tokio::test]
    async fn missing_amount_maps_to_400() {
        let (state, _dir) = test_state();
        state.ledger.create_account("alice", 1000).unwrap();

        let uri = signed_uri(
            &state,
            "/api/debit",
            &[("accountId", "alice"), ("transactionRef", "tx1")],
        );
        let body = get_json(&state, &uri).await;
        assert_eq!(body["status"], 400);
    }
}
