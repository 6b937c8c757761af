// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Internal operator endpoints: transfers, history, account creation.
//!
//! These routes are session-protected (JWT, see [`crate::auth`]) and use the
//! uniform `{ success, message, data }` envelope; they are never exposed to
//! the game provider.

use axum::{
    extract::{Query, State},
    Json,
};
use crate::{
    auth::Auth,
    error::ApiError,
    models::{
        Account, ApiEnvelope, CreateAccountRequest, TransferHistoryItem, TransferHistoryQuery,
        TransferHistoryResponse, TransferRequest, TransferResponse,
    },
    state::AppState,
};

/// Default page size for history listings.
const DEFAULT_HISTORY_LIMIT: usize = 50;
/// Upper bound on history page size.
const MAX_HISTORY_LIMIT: usize = 200;

/// Move funds between two operator accounts.
///
/// Both balance updates and the transfer record commit as one atomic unit;
/// a missing account on either side aborts the whole operation.
#[utoipa::path(
    post,
    path = "/tr/transfer",
    tag = "Transfers",
    request_body = TransferRequest,
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Transfer applied", body = ApiEnvelope<TransferResponse>),
        (status = 401, description = "Missing or invalid session token"),
        (status = 404, description = "Sender or receiver not found"),
        (status = 422, description = "Insufficient funds")
    )
)]
pub async fn create_transfer(
    Auth(user): Auth,
    State(state): State<AppState>,
    Json(request): Json<TransferRequest>,
) -> Result<Json<ApiEnvelope<TransferResponse>>, ApiError> {
    let (transfer, updated_sender, updated_receiver) = state.ledger.transfer(
        &request.sender_id,
        &request.receiver_id,
        request.amount,
        request.note,
    )?;

    tracing::info!(
        operator = %user.user_id,
        sender = %transfer.sender_id,
        receiver = %transfer.receiver_id,
        amount = transfer.amount,
        "operator transfer applied"
    );

    Ok(Json(ApiEnvelope::ok(
        "Transfer applied",
        TransferResponse {
            transfer,
            updated_sender,
            updated_receiver,
        },
    )))
}

/// List an account's transfer history, newest first.
#[utoipa::path(
    get,
    path = "/tr/transfer-history",
    tag = "Transfers",
    params(TransferHistoryQuery),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "One page of history", body = ApiEnvelope<TransferHistoryResponse>),
        (status = 401, description = "Missing or invalid session token")
    )
)]
pub async fn transfer_history(
    Auth(_user): Auth,
    State(state): State<AppState>,
    Query(query): Query<TransferHistoryQuery>,
) -> Result<Json<ApiEnvelope<TransferHistoryResponse>>, ApiError> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .min(MAX_HISTORY_LIMIT);

    let (records, next_cursor) =
        state
            .ledger
            .transfers_for_account(&query.username, query.cursor.as_deref(), limit)?;

    let transfers = records
        .into_iter()
        .map(|(transfer, direction)| TransferHistoryItem {
            transfer,
            direction,
        })
        .collect();

    Ok(Json(ApiEnvelope::ok(
        "Transfer history",
        TransferHistoryResponse {
            transfers,
            next_cursor,
        },
    )))
}

/// Create a new ledger account.
#[utoipa::path(
    post,
    path = "/tr/account",
    tag = "Transfers",
    request_body = CreateAccountRequest,
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Account created", body = ApiEnvelope<Account>),
        (status = 401, description = "Missing or invalid session token"),
        (status = 409, description = "Account already exists")
    )
)]
pub async fn create_account(
    Auth(user): Auth,
    State(state): State<AppState>,
    Json(request): Json<CreateAccountRequest>,
) -> Result<Json<ApiEnvelope<Account>>, ApiError> {
    let account = state
        .ledger
        .create_account(&request.account_id, request.initial_balance)?;

    tracing::info!(
        operator = %user.user_id,
        account_id = %account.id,
        "account created via internal API"
    );

    Ok(Json(ApiEnvelope::ok("Account created", account)))
}
