//! Principal token authentication.
//!
//! Upstream authentication resolves a user to an opaque principal id
//! before requests reach this core. The token scheme here binds that
//! principal id to a signed, expiring credential the push endpoint can
//! verify without a round-trip.
//!
//! ## Token Format
//!
//! - 8 bytes: issue timestamp (Unix millis, big-endian)
//! - N bytes: principal id, UTF-8
//! - 32 bytes: HMAC-SHA256 over the preceding bytes
//!
//! Base64-encode for transport.

use crate::error::{ServerError, ServerResult};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

type HmacSha256 = Hmac<Sha256>;

const TIMESTAMP_LEN: usize = 8;
const TAG_LEN: usize = 32;

/// Authentication configuration.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Secret key for HMAC.
    pub secret: Vec<u8>,
    /// Token expiration duration.
    pub token_expiry: Duration,
}

impl AuthConfig {
    /// Creates a new auth configuration with a 24 hour expiry.
    pub fn new(secret: Vec<u8>) -> Self {
        Self {
            secret,
            token_expiry: Duration::from_secs(24 * 60 * 60),
        }
    }

    /// Sets the token expiration duration.
    pub fn with_expiry(mut self, expiry: Duration) -> Self {
        self.token_expiry = expiry;
        self
    }
}

/// Issues and validates principal tokens.
#[derive(Clone)]
pub struct PrincipalTokens {
    config: AuthConfig,
}

impl PrincipalTokens {
    /// Creates a new token issuer/validator.
    pub fn new(config: AuthConfig) -> Self {
        Self { config }
    }

    /// Creates a token for a principal.
    pub fn create_token(&self, principal: &str) -> Vec<u8> {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;

        let mut data = Vec::with_capacity(TIMESTAMP_LEN + principal.len() + TAG_LEN);
        data.extend_from_slice(&timestamp.to_be_bytes());
        data.extend_from_slice(principal.as_bytes());

        let tag = self.sign(&data);
        data.extend_from_slice(&tag);
        data
    }

    /// Validates a token and returns the principal it names.
    pub fn validate_token(&self, token: &[u8]) -> ServerResult<String> {
        if token.len() < TIMESTAMP_LEN + 1 + TAG_LEN {
            return Err(ServerError::AuthenticationFailed(
                "token too short".into(),
            ));
        }

        let (signed, tag) = token.split_at(token.len() - TAG_LEN);
        if !self.verify(signed, tag) {
            return Err(ServerError::AuthenticationFailed(
                "invalid signature".into(),
            ));
        }

        let (timestamp_bytes, principal_bytes) = signed.split_at(TIMESTAMP_LEN);
        let mut timestamp = [0u8; TIMESTAMP_LEN];
        timestamp.copy_from_slice(timestamp_bytes);
        let issued = u64::from_be_bytes(timestamp);

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;
        let expiry = self.config.token_expiry.as_millis() as u64;
        if now > issued + expiry {
            return Err(ServerError::AuthenticationFailed("token expired".into()));
        }

        String::from_utf8(principal_bytes.to_vec())
            .map_err(|_| ServerError::AuthenticationFailed("principal is not UTF-8".into()))
    }

    /// Signs data with HMAC-SHA256.
    fn sign(&self, data: &[u8]) -> [u8; TAG_LEN] {
        let mut mac = match HmacSha256::new_from_slice(&self.config.secret) {
            Ok(mac) => mac,
            // HMAC accepts keys of any size; unreachable in practice.
            Err(_) => return [0u8; TAG_LEN],
        };
        mac.update(data);
        mac.finalize().into_bytes().into()
    }

    /// Verifies an HMAC-SHA256 tag in constant time.
    fn verify(&self, data: &[u8], tag: &[u8]) -> bool {
        let Ok(mut mac) = HmacSha256::new_from_slice(&self.config.secret) else {
            return false;
        };
        mac.update(data);
        mac.verify_slice(tag).is_ok()
    }
}

/// Shared-secret check for the ingestion feed.
///
/// The crawler presents the secret verbatim with every upsert or
/// retract; there is no per-request signing on this surface.
#[derive(Clone)]
pub struct FeedSecret {
    secret: Vec<u8>,
}

impl FeedSecret {
    /// Creates a validator around a shared secret.
    pub fn new(secret: Vec<u8>) -> Self {
        Self { secret }
    }

    /// Validates a presented secret.
    pub fn validate(&self, presented: &[u8]) -> ServerResult<()> {
        if presented == self.secret.as_slice() {
            Ok(())
        } else {
            Err(ServerError::NotAuthorized("invalid feed secret".into()))
        }
    }
}
