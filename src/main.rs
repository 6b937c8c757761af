// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::{env, net::SocketAddr, path::PathBuf};

use tracing_subscriber::EnvFilter;

use seamless_wallet_server::{
    api::router,
    config::{
        DATA_DIR_ENV, HOST_ENV, LOG_FORMAT_ENV, PORT_ENV, PROVIDER_SECRET_ENV, SEED_ACCOUNT_ENV,
        SESSION_JWT_SECRET_ENV,
    },
    ledger::{LedgerEngine, LedgerError},
    signing::SignatureValidator,
    state::AppState,
};

#[tokio::main]
async fn main() {
    init_tracing();

    // Secrets are mandatory; refuse to start without them.
    let provider_secret = env::var(PROVIDER_SECRET_ENV)
        .unwrap_or_else(|_| panic!("{PROVIDER_SECRET_ENV} must be set"));
    let session_secret = env::var(SESSION_JWT_SECRET_ENV)
        .unwrap_or_else(|_| panic!("{SESSION_JWT_SECRET_ENV} must be set"));

    let data_dir = PathBuf::from(env::var(DATA_DIR_ENV).unwrap_or_else(|_| "/data".to_string()));
    let db_path = data_dir.join("ledger.redb");

    let ledger = LedgerEngine::open(&db_path)
        .unwrap_or_else(|e| panic!("Failed to open ledger database at {db_path:?}: {e}"));

    if let Ok(seed) = env::var(SEED_ACCOUNT_ENV) {
        seed_account(&ledger, &seed);
    }

    let state = AppState::new(ledger, SignatureValidator::new(&provider_secret), &session_secret);
    let app = router(state);

    let host = env::var(HOST_ENV).unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = env::var(PORT_ENV)
        .unwrap_or_else(|_| "8080".to_string())
        .parse()
        .unwrap_or(8080);

    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .expect("Failed to parse bind address");

    tracing::info!(%addr, "Seamless wallet server listening (docs at /docs)");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listen address");
    axum::serve(listener, app.into_make_service())
        .await
        .expect("Server failed");
}

/// Create the optional startup account from `account_id:balance`.
fn seed_account(ledger: &LedgerEngine, seed: &str) {
    let Some((id, balance)) = seed.split_once(':') else {
        tracing::warn!("{SEED_ACCOUNT_ENV} is not in account_id:balance form, ignoring");
        return;
    };
    let Ok(balance) = balance.parse::<i64>() else {
        tracing::warn!("{SEED_ACCOUNT_ENV} balance is not an integer, ignoring");
        return;
    };

    match ledger.create_account(id, balance) {
        Ok(account) => {
            tracing::info!(account_id = %account.id, balance = account.balance, "seeded account")
        }
        Err(LedgerError::AccountExists(_)) => {
            tracing::debug!(account_id = id, "seed account already exists")
        }
        Err(e) => panic!("Failed to seed account: {e}"),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug"));

    let json = env::var(LOG_FORMAT_ENV)
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
