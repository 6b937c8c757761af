// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Core Data Models
//!
//! Accounts, transfer records, and the request/response structures used by
//! the internal operator API. All types derive `Serialize`, `Deserialize`,
//! and `ToSchema` for automatic JSON handling and OpenAPI documentation.
//!
//! Monetary amounts are fixed-point integers in minor units (e.g. cents);
//! there is no floating point anywhere in the money path.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

// =============================================================================
// Account
// =============================================================================

/// A ledger account.
///
/// The account id doubles as the operator-facing username; the provider's
/// `accountId` parameter and the operator's `username` address the same key
/// space. Balances are mutated exclusively through the ledger engine and are
/// non-negative at every committed read.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct Account {
    /// Unique, immutable account identifier.
    pub id: String,
    /// Current balance in minor units. Never negative.
    pub balance: i64,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
    /// When the balance was last mutated.
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Create a new account with the given opening balance.
    pub fn new(id: impl Into<String>, balance: i64) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            balance,
            created_at: now,
            updated_at: now,
        }
    }
}

// =============================================================================
// Transfer Records
// =============================================================================

/// The kind of balance mutation a transfer record documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TransferKind {
    /// Operator-initiated credit (also used for two-account transfers).
    Deposit,
    /// Operator-initiated debit.
    Withdraw,
    /// Wager debit initiated by the game provider.
    ProviderDebit,
    /// Win credit initiated by the game provider.
    ProviderCredit,
    /// Reversal of a previously applied provider debit or credit.
    ProviderRollback,
}

/// An immutable record of a single balance mutation.
///
/// Transfer records are the sole audit trail: they are created atomically
/// with the mutation they document and are never updated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct TransferRecord {
    /// Unique record id, generated at creation.
    pub id: String,
    /// Source account. For single-account operations this equals the
    /// receiver: the account acts as both sides of the adjustment.
    pub sender_id: String,
    /// Target account.
    pub receiver_id: String,
    /// What kind of mutation this record documents.
    pub kind: TransferKind,
    /// Positive amount in minor units; the signed delta is derived from `kind`.
    pub amount: i64,
    /// Optional free-form note.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// Provider-supplied idempotency key, present on provider operations.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_ref: Option<String>,
    /// Balance of the affected account immediately before this mutation.
    pub balance_before: i64,
    /// Balance of the affected account immediately after this mutation.
    pub balance_after: i64,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Internal API Envelope
// =============================================================================

/// Uniform response envelope for internal operator endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiEnvelope<T> {
    /// Whether the operation succeeded.
    pub success: bool,
    /// Human-readable outcome description.
    pub message: String,
    /// Operation result, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiEnvelope<T> {
    /// Build a success envelope around `data`.
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
        }
    }
}

// =============================================================================
// Internal API Models
// =============================================================================

/// Request to move funds between two distinct accounts.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequest {
    /// Account to debit.
    pub sender_id: String,
    /// Account to credit.
    pub receiver_id: String,
    /// Amount to move, in minor units.
    pub amount: i64,
    /// Optional free-form note recorded on the transfer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Result of an applied transfer.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransferResponse {
    /// The transfer record documenting the movement.
    pub transfer: TransferRecord,
    /// Sender account after the debit.
    pub updated_sender: Account,
    /// Receiver account after the credit.
    pub updated_receiver: Account,
}

/// Request to create a new account.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateAccountRequest {
    /// Account identifier (operator-facing username).
    pub account_id: String,
    /// Opening balance in minor units. Defaults to zero.
    #[serde(default)]
    pub initial_balance: i64,
}

/// Query parameters for the transfer history listing.
#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct TransferHistoryQuery {
    /// Account whose history to list.
    pub username: String,
    /// Opaque pagination cursor from a previous page.
    pub cursor: Option<String>,
    /// Page size (default 50, capped at 200).
    pub limit: Option<usize>,
}

/// A transfer record together with its direction relative to the queried
/// account (`debit` or `credit`).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TransferHistoryItem {
    /// The transfer record.
    pub transfer: TransferRecord,
    /// `debit` if the queried account lost funds, `credit` if it gained.
    pub direction: String,
}

/// One page of transfer history, newest first.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransferHistoryResponse {
    /// Transfers on this page.
    pub transfers: Vec<TransferHistoryItem>,
    /// Cursor for the next page, absent on the last page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transfer_kind_serializes_snake_case() {
        let json = serde_json::to_string(&TransferKind::ProviderRollback).unwrap();
        assert_eq!(json, r#""provider_rollback""#);

        let kind: TransferKind = serde_json::from_str(r#""provider_debit""#).unwrap();
        assert_eq!(kind, TransferKind::ProviderDebit);
    }

    #[test]
    fn envelope_ok_wraps_data() {
        let env = ApiEnvelope::ok("done", 42);
        assert!(env.success);
        assert_eq!(env.message, "done");
        assert_eq!(env.data, Some(42));
    }

    #[test]
    fn transfer_request_uses_camel_case_wire_names() {
        let req: TransferRequest = serde_json::from_str(
            r#"{"senderId":"a","receiverId":"b","amount":100}"#,
        )
        .unwrap();
        assert_eq!(req.sender_id, "a");
        assert_eq!(req.receiver_id, "b");
        assert_eq!(req.amount, 100);
        assert!(req.note.is_none());
    }
}
