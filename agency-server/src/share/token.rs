//! Share-token mint and verify
//!
//! Token layout:
//!
//! ```text
//! payload = booking_id "|" issued_unix "|" expires_unix
//! token   = base64url( payload "." hex(hmac_sha256(secret, payload))[..26] )
//! ```
//!
//! The signature is truncated to 26 hex characters to keep URLs short;
//! that still leaves far more collision resistance than the threat model
//! needs. Earlier deployments emitted colon-separated payloads, two-field
//! payloads without an expiry, and several signature truncations; the
//! verifier accepts all of those, the minter emits only the current form.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Signature length (hex chars) of newly minted tokens.
const SIG_LEN: usize = 26;

/// Signature truncations accepted from legacy tokens.
const LEGACY_SIG_LENS: [usize; 8] = [15, 20, 21, 23, 24, 26, 28, 32];

/// Implied lifetime of legacy two-field tokens that carry no expiry.
const LEGACY_IMPLIED_TTL_SECS: i64 = 30 * 24 * 3600;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    /// Not decodable into a payload and signature of an accepted shape.
    #[error("Malformed share token")]
    Malformed,

    /// Structurally valid but past its expiry, or issued before the
    /// booking's share lock.
    #[error("Expired share token")]
    Expired,

    /// Signature mismatch.
    #[error("Bad share token signature")]
    BadSignature,
}

/// Successfully verified token claims.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifiedToken {
    pub booking_id: i64,
    /// Unix seconds.
    pub issued_at: i64,
    /// Unix seconds.
    pub expires_at: i64,
}

/// Mints and verifies share tokens. Stateless; cloning shares the secret.
#[derive(Clone)]
pub struct TokenCodec {
    secret: Vec<u8>,
}

impl TokenCodec {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            secret: secret.as_ref().to_vec(),
        }
    }

    /// Mint a token for a booking, valid over `[issued_at, expires_at]`
    /// (Unix seconds).
    pub fn mint(&self, booking_id: i64, issued_at: i64, expires_at: i64) -> String {
        let payload = format!("{booking_id}|{issued_at}|{expires_at}");
        let sig = &self.signature_hex(&payload)[..SIG_LEN];
        URL_SAFE_NO_PAD.encode(format!("{payload}.{sig}"))
    }

    /// Verify a token as of `now` (Unix seconds).
    ///
    /// The caller must additionally reject tokens whose `issued_at`
    /// precedes the booking's share lock; the codec has no access to
    /// stored state.
    pub fn verify(&self, token: &str, now: i64) -> Result<VerifiedToken, TokenError> {
        let decoded = URL_SAFE_NO_PAD
            .decode(token.trim_end_matches('='))
            .map_err(|_| TokenError::Malformed)?;
        let decoded = String::from_utf8(decoded).map_err(|_| TokenError::Malformed)?;

        let (payload, sig) = decoded.rsplit_once('.').ok_or(TokenError::Malformed)?;

        // Current form is pipe-separated; colon is the legacy separator.
        let (separator, legacy) = if payload.contains('|') {
            ('|', false)
        } else {
            (':', true)
        };
        let fields: Vec<&str> = payload.split(separator).collect();

        let (booking_id, issued_at, expires_at) = match fields.as_slice() {
            [id, iat, exp] => (
                id.parse().map_err(|_| TokenError::Malformed)?,
                iat.parse().map_err(|_| TokenError::Malformed)?,
                exp.parse().map_err(|_| TokenError::Malformed)?,
            ),
            // Legacy tokens without an expiry field imply a 30-day window.
            [id, iat] if legacy => {
                let iat: i64 = iat.parse().map_err(|_| TokenError::Malformed)?;
                (
                    id.parse().map_err(|_| TokenError::Malformed)?,
                    iat,
                    iat + LEGACY_IMPLIED_TTL_SECS,
                )
            }
            _ => return Err(TokenError::Malformed),
        };

        let sig_ok_len = if legacy || sig.len() != SIG_LEN {
            LEGACY_SIG_LENS.contains(&sig.len())
        } else {
            true
        };
        if !sig_ok_len {
            return Err(TokenError::Malformed);
        }

        if now > expires_at {
            return Err(TokenError::Expired);
        }

        let expected = self.signature_hex(payload);
        let expected = &expected.as_bytes()[..sig.len()];
        if expected.ct_eq(sig.as_bytes()).unwrap_u8() != 1 {
            return Err(TokenError::BadSignature);
        }

        Ok(VerifiedToken {
            booking_id,
            issued_at,
            expires_at,
        })
    }

    fn signature_hex(&self, payload: &str) -> String {
        let mut mac =
            HmacSha256::new_from_slice(&self.secret).expect("HMAC accepts any key length");
        mac.update(payload.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec").finish_non_exhaustive()
    }
}
