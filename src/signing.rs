// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Provider request signing and verification.
//!
//! Every provider-facing request carries a `key` parameter: a 160-bit hex
//! digest over the request's remaining parameters plus a shared secret.
//! Both sides build the same canonical string, so the digest is independent
//! of transport-level parameter ordering:
//!
//! 1. Drop parameters with empty values (and the `key` parameter itself).
//! 2. Sort the remaining keys in ascending lexicographic order.
//! 3. Percent-encode as `application/x-www-form-urlencoded` pairs joined
//!    with `&`.
//! 4. Prepend the secret (no separator) and hash with SHA-1.
//!
//! Verification is constant-time with respect to digest length; a mismatch
//! and a near-miss are indistinguishable to a timing observer.

use std::collections::BTreeMap;

use ring::constant_time::verify_slices_are_equal;
use sha1::{Digest, Sha1};
use url::form_urlencoded;

/// Name of the query parameter carrying the request signature.
pub const SIGNATURE_PARAM: &str = "key";

/// Reasons a signed request fails verification. All fail closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    #[error("signature parameter is missing")]
    MissingSignature,

    #[error("no parameters to sign")]
    EmptyParameters,

    #[error("signature mismatch")]
    Mismatch,
}

/// Validates provider request signatures against a shared secret.
///
/// The secret is injected at construction and never exposed; there is no
/// global signing state.
#[derive(Clone)]
pub struct SignatureValidator {
    secret: String,
}

impl SignatureValidator {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Compute the canonical digest for a parameter set.
    ///
    /// The `key` parameter and empty values are excluded. `BTreeMap`
    /// iteration order gives the ascending key sort for free, so the result
    /// is deterministic regardless of how the caller assembled the map.
    pub fn compute_digest(&self, params: &BTreeMap<String, String>) -> String {
        let mut canonical = form_urlencoded::Serializer::new(String::new());
        for (key, value) in params {
            if key == SIGNATURE_PARAM || value.is_empty() {
                continue;
            }
            canonical.append_pair(key, value);
        }
        let query = canonical.finish();

        let mut hasher = Sha1::new();
        hasher.update(self.secret.as_bytes());
        hasher.update(query.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Verify the `key` signature carried in `params`.
    ///
    /// Pure over its inputs; callers own logging of rejections.
    pub fn verify(&self, params: &BTreeMap<String, String>) -> Result<(), SignatureError> {
        let provided = params
            .get(SIGNATURE_PARAM)
            .filter(|v| !v.is_empty())
            .ok_or(SignatureError::MissingSignature)?;

        let has_signed_params = params
            .iter()
            .any(|(k, v)| k != SIGNATURE_PARAM && !v.is_empty());
        if !has_signed_params {
            return Err(SignatureError::EmptyParameters);
        }

        let expected = self.compute_digest(params);
        let provided = provided.to_ascii_lowercase();
        verify_slices_are_equal(expected.as_bytes(), provided.as_bytes())
            .map_err(|_| SignatureError::Mismatch)
    }
}

impl std::fmt::Debug for SignatureValidator {
    // The secret must never leak through Debug formatting or logs.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureValidator").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn signed(validator: &SignatureValidator, pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        let mut map = params(pairs);
        let digest = validator.compute_digest(&map);
        map.insert(SIGNATURE_PARAM.to_string(), digest);
        map
    }

    #[test]
    fn digest_is_independent_of_insertion_order() {
        let validator = SignatureValidator::new("secret");
        let forward = params(&[("accountId", "alice"), ("amount", "300"), ("transactionRef", "tx1")]);
        let backward = params(&[("transactionRef", "tx1"), ("amount", "300"), ("accountId", "alice")]);
        assert_eq!(
            validator.compute_digest(&forward),
            validator.compute_digest(&backward)
        );
    }

    #[test]
    fn digest_matches_canonical_sha1() {
        let validator = SignatureValidator::new("secret");
        let map = params(&[("accountId", "alice"), ("amount", "300")]);

        let mut hasher = Sha1::new();
        hasher.update(b"secret");
        hasher.update(b"accountId=alice&amount=300");
        let expected = hex::encode(hasher.finalize());

        assert_eq!(validator.compute_digest(&map), expected);
        assert_eq!(expected.len(), 40);
    }

    #[test]
    fn empty_values_are_dropped_before_signing() {
        let validator = SignatureValidator::new("secret");
        let with_empty = params(&[("accountId", "alice"), ("note", "")]);
        let without = params(&[("accountId", "alice")]);
        assert_eq!(
            validator.compute_digest(&with_empty),
            validator.compute_digest(&without)
        );
    }

    #[test]
    fn signature_param_is_excluded_from_digest() {
        let validator = SignatureValidator::new("secret");
        let bare = params(&[("accountId", "alice")]);
        let mut with_key = bare.clone();
        with_key.insert(SIGNATURE_PARAM.to_string(), "deadbeef".to_string());
        assert_eq!(
            validator.compute_digest(&bare),
            validator.compute_digest(&with_key)
        );
    }

    #[test]
    fn values_are_percent_encoded_canonically() {
        let validator = SignatureValidator::new("secret");
        let map = params(&[("note", "win & rollback")]);

        let mut hasher = Sha1::new();
        hasher.update(b"secret");
        hasher.update(b"note=win+%26+rollback");
        assert_eq!(validator.compute_digest(&map), hex::encode(hasher.finalize()));
    }

    #[test]
    fn verify_accepts_a_correctly_signed_request() {
        let validator = SignatureValidator::new("secret");
        let map = signed(&validator, &[("accountId", "alice"), ("amount", "300")]);
        assert_eq!(validator.verify(&map), Ok(()));
    }

    #[test]
    fn verify_accepts_uppercase_hex_digests() {
        let validator = SignatureValidator::new("secret");
        let mut map = params(&[("accountId", "alice")]);
        let digest = validator.compute_digest(&map).to_ascii_uppercase();
        map.insert(SIGNATURE_PARAM.to_string(), digest);
        assert_eq!(validator.verify(&map), Ok(()));
    }

    #[test]
    fn verify_rejects_wrong_secret() {
        let signer = SignatureValidator::new("secret");
        let verifier = SignatureValidator::new("other-secret");
        let map = signed(&signer, &[("accountId", "alice")]);
        assert_eq!(verifier.verify(&map), Err(SignatureError::Mismatch));
    }

    #[test]
    fn verify_rejects_tampered_parameter() {
        let validator = SignatureValidator::new("secret");
        let mut map = signed(&validator, &[("accountId", "alice"), ("amount", "300")]);
        map.insert("amount".to_string(), "900".to_string());
        assert_eq!(validator.verify(&map), Err(SignatureError::Mismatch));
    }

    #[test]
    fn verify_rejects_missing_signature() {
        let validator = SignatureValidator::new("secret");
        let map = params(&[("accountId", "alice")]);
        assert_eq!(validator.verify(&map), Err(SignatureError::MissingSignature));
    }

    #[test]
    fn verify_rejects_empty_parameter_set() {
        let validator = SignatureValidator::new("secret");
        let mut map = BTreeMap::new();
        map.insert(SIGNATURE_PARAM.to_string(), "deadbeef".to_string());
        assert_eq!(validator.verify(&map), Err(SignatureError::EmptyParameters));
    }
}
