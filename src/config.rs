// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration Constants
//!
//! This module defines environment variable names and default values used
//! throughout the application. Configuration is loaded from the environment
//! at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `DATA_DIR` | Root directory for the ledger database | `/data` |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `PROVIDER_SECRET` | Shared secret for provider request signatures | Required |
//! | `SESSION_JWT_SECRET` | HS256 secret for internal session tokens | Required |
//! | `SEED_ACCOUNT` | Optional `account_id:balance` pair created at startup | Unset |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

/// Environment variable name for the data directory path.
///
/// The ledger database file (`ledger.redb`) lives here. All accounts and
/// transfer records are stored in this single embedded database.
pub const DATA_DIR_ENV: &str = "DATA_DIR";

/// Environment variable name for the server bind address.
pub const HOST_ENV: &str = "HOST";

/// Environment variable name for the server bind port.
pub const PORT_ENV: &str = "PORT";

/// Environment variable name for the log output format (`json` or `pretty`).
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

/// Environment variable name for the provider signing secret.
///
/// Shared out-of-band with the game provider. Every provider-facing request
/// carries a `key` digest computed over its parameters plus this secret.
/// The secret is never logged and never transmitted.
pub const PROVIDER_SECRET_ENV: &str = "PROVIDER_SECRET";

/// Environment variable name for the internal session token secret.
///
/// Operator dashboard sessions present HS256 JWTs signed with this secret
/// when calling the `/tr/*` endpoints.
pub const SESSION_JWT_SECRET_ENV: &str = "SESSION_JWT_SECRET";

/// Environment variable name for the optional startup seed account.
///
/// Format: `account_id:balance_minor_units`, e.g. `demo:100000`.
/// Ignored if the account already exists.
pub const SEED_ACCOUNT_ENV: &str = "SEED_ACCOUNT";
