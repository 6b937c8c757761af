// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! API error type for the internal operator endpoints.
//!
//! Internal responses use a uniform `{ success, message }` envelope; this
//! type is the failure half of that envelope. Provider-facing endpoints do
//! NOT use this type — they report failures as body-level status codes
//! (see `api::provider`).

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::ledger::LedgerError;

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    pub fn unprocessable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        match &err {
            LedgerError::AccountNotFound(_) | LedgerError::TransactionNotFound(_) => {
                ApiError::not_found(err.to_string())
            }
            LedgerError::AccountExists(_)
            | LedgerError::AlreadyProcessed(_)
            | LedgerError::AlreadyRolledBack(_) => ApiError::conflict(err.to_string()),
            LedgerError::InvalidAmount(_)
            | LedgerError::InvalidAccountId(_)
            | LedgerError::SelfTransfer => ApiError::bad_request(err.to_string()),
            LedgerError::InsufficientFunds(_) => ApiError::unprocessable(err.to_string()),
            _ => {
                tracing::error!(error = %err, "ledger storage failure");
                ApiError::internal("Storage unavailable")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            success: false,
            message: self.message,
        });
        (self.status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[test]
    fn constructors_set_status_and_message() {
        let nf = ApiError::not_found("missing");
        assert_eq!(nf.status, StatusCode::NOT_FOUND);
        assert_eq!(nf.message, "missing");

        let bad = ApiError::bad_request("bad");
        assert_eq!(bad.status, StatusCode::BAD_REQUEST);
        assert_eq!(bad.message, "bad");

        let unp = ApiError::unprocessable("oops");
        assert_eq!(unp.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(unp.message, "oops");
    }

    #[tokio::test]
    async fn into_response_returns_envelope_body() {
        let response = ApiError::bad_request("bad data").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = String::from_utf8(body_bytes.to_vec()).unwrap();
        assert_eq!(body, r#"{"success":false,"message":"bad data"}"#);
    }

    #[test]
    fn ledger_errors_map_to_expected_statuses() {
        let nf: ApiError = LedgerError::AccountNotFound("alice".into()).into();
        assert_eq!(nf.status, StatusCode::NOT_FOUND);

        let funds: ApiError = LedgerError::InsufficientFunds("alice".into()).into();
        assert_eq!(funds.status, StatusCode::UNPROCESSABLE_ENTITY);

        let dup: ApiError = LedgerError::AlreadyProcessed("tx1".into()).into();
        assert_eq!(dup.status, StatusCode::CONFLICT);

        let amt: ApiError = LedgerError::InvalidAmount(-5).into();
        assert_eq!(amt.status, StatusCode::BAD_REQUEST);
    }
}
