// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Seamless Wallet - Signed-Request Transaction Service
//!
//! This crate provides the wallet side of a seamless-wallet casino
//! integration: the game provider holds no player funds and calls back into
//! this service for every balance read, wager debit, win credit, and
//! rollback, authenticating each request with a shared-secret digest.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum): provider callbacks and internal routes
//! - `auth` - Session token verification for internal operator endpoints
//! - `ledger` - Atomic account/transfer ledger on an embedded database
//! - `signing` - Digest computation and verification for provider requests

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod ledger;
pub mod models;
pub mod signing;
pub mod state;
