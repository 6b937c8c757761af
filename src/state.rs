// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::ledger::LedgerEngine;
use crate::signing::SignatureValidator;

#[derive(Clone)]
pub struct AppState {
    /// The one component allowed to mutate balances.
    pub ledger: Arc<LedgerEngine>,
    /// Verifies provider request signatures; holds the shared secret.
    pub validator: Arc<SignatureValidator>,
    /// HS256 secret for internal operator session tokens.
    pub session_secret: Arc<str>,
}

impl AppState {
    pub fn new(ledger: LedgerEngine, validator: SignatureValidator, session_secret: &str) -> Self {
        Self {
            ledger: Arc::new(ledger),
            validator: Arc::new(validator),
            session_secret: Arc::from(session_secret),
        }
    }
}
