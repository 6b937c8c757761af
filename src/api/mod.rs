// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    models::{
        Account, ApiEnvelope, CreateAccountRequest, TransferHistoryItem, TransferHistoryResponse,
        TransferKind, TransferRecord, TransferRequest, TransferResponse,
    },
    state::AppState,
};

pub mod health;
pub mod provider;
pub mod transfer;

pub fn router(state: AppState) -> Router {
    let provider_routes = Router::new()
        .route("/balance", get(provider::balance))
        .route("/debit", get(provider::debit))
        .route("/credit", get(provider::credit))
        .route("/rollback", get(provider::rollback));

    let internal_routes = Router::new()
        .route("/transfer", post(transfer::create_transfer))
        .route("/transfer-history", get(transfer::transfer_history))
        .route("/account", post(transfer::create_account));

    Router::new()
        .nest("/api", provider_routes)
        .nest("/tr", internal_routes)
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

#[derive(OpenApi)]
#[openapi(
    paths(
        provider::balance,
        provider::debit,
        provider::credit,
        provider::rollback,
        transfer::create_transfer,
        transfer::transfer_history,
        transfer::create_account,
        health::health,
        health::liveness
    ),
    components(
        schemas(
            Account,
            TransferKind,
            TransferRecord,
            TransferRequest,
            TransferResponse,
            TransferHistoryItem,
            TransferHistoryResponse,
            CreateAccountRequest,
            ApiEnvelope<TransferResponse>,
            provider::ProviderResponse,
            health::HealthResponse,
            health::ReadyResponse
        )
    ),
    tags(
        (name = "Provider", description = "Signed seamless-wallet callbacks"),
        (name = "Transfers", description = "Internal operator transfers and accounts"),
        (name = "Health", description = "Liveness and readiness probes")
    )
)]
struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ledger::LedgerEngine, signing::SignatureValidator};

    #[tokio::test]
    async fn router_builds_with_all_routes() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = LedgerEngine::open(&dir.path().join("test.redb")).unwrap();
        let state = AppState::new(ledger, SignatureValidator::new("secret"), "session");
        let app = router(state);
        // Ensure the router can be converted into a service without panicking.
        let _ = app.into_make_service();
    }
}
