// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Session authentication for the internal operator endpoints (`/tr/*`).
//! Session issuance lives in the operator dashboard service; this module
//! only verifies the tokens it mints.
//!
//! ## Auth Flow
//!
//! 1. Dashboard authenticates the operator and issues an HS256 JWT
//! 2. Dashboard sends `Authorization: Bearer <JWT>` on internal calls
//! 3. This service verifies signature and expiry against the shared
//!    `SESSION_JWT_SECRET` and extracts `sub` as the operator id
//!
//! Provider-facing endpoints do NOT use sessions; they are authenticated
//! per-request by the signature scheme in [`crate::signing`].

pub mod error;
pub mod extractor;

pub use error::AuthError;
pub use extractor::{Auth, SessionUser};
