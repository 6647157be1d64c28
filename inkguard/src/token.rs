// inkguard/src/token.rs
//
// Signed, scoped access tokens — compact `header.payload.signature` claims.
//
// Three base64url segments, HMAC-SHA256 over the first two. Any holder of
// the verification key can check integrity and expiry without a database
// round trip. The service holds no revocation state; callers pass their
// revoked set explicitly.

use std::collections::HashSet;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;
use tracing::debug;

use crate::records::{AccessTokenPayload, Permission};

type HmacSha256 = Hmac<Sha256>;

const TOKEN_ALG: &str = "HS256";
const TOKEN_TYP: &str = "IGT"; // inkguard token

// ── Errors ────────────────────────────────────────────────────────────────────

/// Expected, recoverable verification failures. The `Display` strings are
/// partner-facing and must stay distinguishable (signature vs expiry vs
/// shape), so the calling layer can render an accurate message.
#[derive(Debug, Error, PartialEq)]
pub enum TokenError {
    #[error("malformed access token: {0}")]
    Malformed(String),
    #[error("access token signature verification failed")]
    BadSignature,
    #[error("access token expired at {0}")]
    Expired(DateTime<Utc>),
}

/// Deployment bugs — the only hard failures this module produces.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("token signing key must not be empty")]
    EmptySigningKey,
}

// ── Signer ────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
struct TokenHeader {
    alg: String,
    typ: String,
}

/// Fields the caller supplies at issue time; the signer adds the clock.
#[derive(Debug, Clone)]
pub struct AccessClaims {
    pub submission_id: String,
    pub partner_id: String,
    pub user_id: String,
    pub watermark_id: String,
    pub permissions: Vec<Permission>,
}

#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// HMAC-SHA256 token signer/verifier. Immutable key material — safe to
/// clone and share across threads.
#[derive(Clone, Debug)]
pub struct TokenSigner {
    key: Vec<u8>,
}

impl TokenSigner {
    pub fn new(secret: &[u8]) -> Result<Self, ConfigError> {
        if secret.is_empty() {
            return Err(ConfigError::EmptySigningKey);
        }
        Ok(Self { key: secret.to_vec() })
    }

    fn mac(&self) -> HmacSha256 {
        // HMAC accepts keys of any length; emptiness was rejected in new()
        HmacSha256::new_from_slice(&self.key).expect("HMAC accepts any key length")
    }

    /// Issue a token valid for `expiry_days` from `now`. Fractional days are
    /// permitted (short-lived test tokens).
    pub fn generate_access_token(
        &self,
        claims: AccessClaims,
        expiry_days: f64,
        now: DateTime<Utc>,
    ) -> IssuedToken {
        let expires_at = now + Duration::milliseconds((expiry_days * 86_400_000.0).round() as i64);
        let payload = AccessTokenPayload {
            submission_id: claims.submission_id,
            partner_id: claims.partner_id,
            user_id: claims.user_id,
            watermark_id: claims.watermark_id,
            permissions: claims.permissions,
            created_at: now,
            expires_at,
        };

        let header = TokenHeader { alg: TOKEN_ALG.into(), typ: TOKEN_TYP.into() };
        let header_b64 = URL_SAFE_NO_PAD.encode(
            serde_json::to_vec(&header).unwrap_or_default(),
        );
        let payload_b64 = URL_SAFE_NO_PAD.encode(
            serde_json::to_vec(&payload).unwrap_or_default(),
        );

        let signing_input = format!("{header_b64}.{payload_b64}");
        let mut mac = self.mac();
        mac.update(signing_input.as_bytes());
        let sig_b64 = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        debug!(partner_id = %payload.partner_id, %expires_at, "access token issued");
        IssuedToken { token: format!("{signing_input}.{sig_b64}"), expires_at }
    }

    /// Verify shape, signature, then expiry — in that order, so a forged
    /// token never learns anything from the expiry check.
    pub fn verify_access_token(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<AccessTokenPayload, TokenError> {
        let segments: Vec<&str> = token.split('.').collect();
        let &[header_b64, payload_b64, sig_b64] = segments.as_slice() else {
            return Err(TokenError::Malformed("expected three dot-separated segments".into()));
        };

        let header_bytes = URL_SAFE_NO_PAD
            .decode(header_b64)
            .map_err(|_| TokenError::Malformed("header is not valid base64url".into()))?;
        let header: TokenHeader = serde_json::from_slice(&header_bytes)
            .map_err(|_| TokenError::Malformed("header is not valid JSON".into()))?;
        if header.alg != TOKEN_ALG {
            return Err(TokenError::Malformed(format!(
                "unsupported signing algorithm '{}'",
                header.alg
            )));
        }

        let sig = URL_SAFE_NO_PAD
            .decode(sig_b64)
            .map_err(|_| TokenError::Malformed("signature is not valid base64url".into()))?;
        let mut mac = self.mac();
        mac.update(format!("{header_b64}.{payload_b64}").as_bytes());
        mac.verify_slice(&sig).map_err(|_| TokenError::BadSignature)?;

        let payload_bytes = URL_SAFE_NO_PAD
            .decode(payload_b64)
            .map_err(|_| TokenError::Malformed("payload is not valid base64url".into()))?;
        let payload: AccessTokenPayload = serde_json::from_slice(&payload_bytes)
            .map_err(|_| TokenError::Malformed("payload is not valid JSON".into()))?;

        if now > payload.expires_at {
            return Err(TokenError::Expired(payload.expires_at));
        }
        Ok(payload)
    }
}

// ── Permission sets ───────────────────────────────────────────────────────────

/// Membership test against the closed permission enumeration.
pub fn has_permission(permissions: &[Permission], perm: Permission) -> bool {
    permissions.contains(&perm)
}

/// View-only defaults for a fresh partner send.
pub fn default_permissions() -> Vec<Permission> {
    vec![
        Permission::View,
        Permission::ViewQuery,
        Permission::ViewSynopsis,
        Permission::ViewSample,
    ]
}

/// Full-manuscript viewing. Still excludes Download/Print/Copy — the DRM
/// exclusion holds at the permission-set level regardless of rule config.
pub fn full_access_permissions() -> Vec<Permission> {
    let mut perms = default_permissions();
    perms.push(Permission::ViewFull);
    perms
}

/// Revocation is externally owned; this is a pure membership check.
pub fn is_token_revoked(token: &str, revoked: &HashSet<String>) -> bool {
    revoked.contains(token)
}
