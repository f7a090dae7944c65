//! Signing schemes used by webhook providers.
//!
//! All final comparisons run in constant time over the full credential so
//! the position of a mismatch is not observable.

use super::VerificationError;
use crate::key_vault::SecretValue;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use sha2::Sha256;
use subtle::{Choice, ConstantTimeEq};

type HmacSha1 = Hmac<Sha1>;
type HmacSha256 = Hmac<Sha256>;

const SHA1_PREFIX: &str = "sha1=";
const V1_PREFIX: &str = "v1=";

/// Closed set of credential verification schemes
///
/// | Strategy             | Expected credential                                   |
/// |----------------------|-------------------------------------------------------|
/// | `HmacSha1Prefixed`   | `sha1=` + lowercase hex HMAC-SHA1(secret, body)       |
/// | `HmacSha256Prefixed` | `v1=` + lowercase hex HMAC-SHA256(secret, body)       |
/// | `SignatureList`      | comma-separated list containing the `v1=` value above |
/// | `SharedToken`        | the secret itself, as UTF-8                           |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStrategy {
    HmacSha1Prefixed,
    HmacSha256Prefixed,
    SignatureList,
    SharedToken,
}

impl VerificationStrategy {
    /// Stable name for logs
    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationStrategy::HmacSha1Prefixed => "hmac_sha1_prefixed",
            VerificationStrategy::HmacSha256Prefixed => "hmac_sha256_prefixed",
            VerificationStrategy::SignatureList => "signature_list",
            VerificationStrategy::SharedToken => "shared_token",
        }
    }

    /// Check a credential against the secret and the raw body.
    ///
    /// # Errors
    ///
    /// - `MalformedCredential` for an empty credential or an empty signature list
    /// - `SecretUnavailable` when a shared-token secret is not UTF-8
    /// - `VerificationMismatch` when the credential does not match. The
    ///   `provider` field carries the strategy name; callers that know the
    ///   provider replace it.
    pub fn verify(
        &self,
        credential: &str,
        secret: &SecretValue,
        body: &[u8],
    ) -> Result<(), VerificationError> {
        if credential.is_empty() {
            return Err(VerificationError::malformed("credential is empty"));
        }

        let matched = match self {
            VerificationStrategy::HmacSha1Prefixed => {
                let expected = format!("{SHA1_PREFIX}{}", hmac_sha1_hex(secret, body)?);
                constant_time_eq(expected.as_bytes(), credential.as_bytes())
            }
            VerificationStrategy::HmacSha256Prefixed => {
                let expected = format!("{V1_PREFIX}{}", hmac_sha256_hex(secret, body)?);
                constant_time_eq(expected.as_bytes(), credential.as_bytes())
            }
            VerificationStrategy::SignatureList => {
                let signatures = parse_signature_list(credential);
                if signatures.is_empty() {
                    return Err(VerificationError::malformed("signature list is empty"));
                }

                let expected = format!("{V1_PREFIX}{}", hmac_sha256_hex(secret, body)?);
                let mut found = Choice::from(0u8);
                for signature in &signatures {
                    found |= expected.as_bytes().ct_eq(signature.as_bytes());
                }
                bool::from(found)
            }
            VerificationStrategy::SharedToken => {
                let token = secret
                    .expose_str()
                    .ok_or_else(|| VerificationError::SecretUnavailable {
                        message: "shared token secret is not valid UTF-8".to_string(),
                    })?;
                constant_time_eq(token.as_bytes(), credential.as_bytes())
            }
        };

        if matched {
            Ok(())
        } else {
            Err(VerificationError::VerificationMismatch {
                provider: self.as_str().to_string(),
            })
        }
    }
}

/// Split a signature list header into its entries, dropping blank ones.
/// Entries are compared exactly, so surrounding whitespace is not removed.
fn parse_signature_list(credential: &str) -> Vec<&str> {
    credential
        .split(',')
        .filter(|entry| !entry.trim().is_empty())
        .collect()
}

fn hmac_sha1_hex(secret: &SecretValue, body: &[u8]) -> Result<String, VerificationError> {
    let mut mac = HmacSha1::new_from_slice(secret.expose_bytes()).map_err(|_| {
        VerificationError::SecretUnavailable {
            message: "failed to initialize HMAC-SHA1".to_string(),
        }
    })?;
    mac.update(body);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

fn hmac_sha256_hex(secret: &SecretValue, body: &[u8]) -> Result<String, VerificationError> {
    let mut mac = HmacSha256::new_from_slice(secret.expose_bytes()).map_err(|_| {
        VerificationError::SecretUnavailable {
            message: "failed to initialize HMAC-SHA256".to_string(),
        }
    })?;
    mac.update(body);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Constant-time equality; slices of different length never match.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    bool::from(a.ct_eq(b))
}

#[cfg(test)]
#[path = "strategy_tests.rs"]
mod tests;
