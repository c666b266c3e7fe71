/**
 * DOMAIN LAYER - Ticket Token Codec
 *
 * Signs and verifies the self-describing token carried in a ticket's QR
 * code. Tokens verify offline - no database lookup - so gate devices can
 * pre-screen forgeries before the single-use check hits the store.
 *
 * Wire format: base64url( json { tid, eid, iat, sig } ) where
 * sig = first 16 hex chars of HMAC_SHA256(secret, json { tid, eid, iat }).
 * The signed payload's field order is fixed by struct declaration order.
 *
 * The codec does NOT enforce revocation or single-use; that is the gate
 * validator's job.
 */

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

const SIG_HEX_LEN: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    pub tid: String,    // ticket id (opaque here)
    pub eid: String,    // event id (opaque here)
    pub iat: i64,       // issued-at, epoch milliseconds
}

#[derive(Serialize, Deserialize)]
struct SignedToken {
    tid: String,
    eid: String,
    iat: i64,
    sig: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenError {
    /// Not base64url, not JSON, or missing fields.
    Malformed,
    /// Well-formed but the signature does not match.
    Signature,
}

impl TokenError {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenError::Malformed => "malformed",
            TokenError::Signature => "sig",
        }
    }
}

#[derive(Clone)]
pub struct TicketTokenCodec {
    secret: Vec<u8>,
}

impl TicketTokenCodec {
    pub fn new(secret: &str) -> Self {
        Self { secret: secret.as_bytes().to_vec() }
    }

    /**
     * Sign claims into a QR-ready token string
     */
    pub fn sign(&self, tid: &str, eid: &str, iat: i64) -> String {
        let claims = TokenClaims {
            tid: tid.to_string(),
            eid: eid.to_string(),
            iat,
        };
        let sig = self.signature_for(&claims);
        let signed = SignedToken {
            tid: claims.tid,
            eid: claims.eid,
            iat: claims.iat,
            sig,
        };
        // Struct serialization cannot fail here - fields are plain strings/ints
        let json = serde_json::to_vec(&signed).unwrap_or_default();
        URL_SAFE_NO_PAD.encode(json)
    }

    /**
     * Verify a token and return its claims
     *
     * Never panics on hostile input: anything undecodable is Malformed,
     * anything decodable with a bad signature is Signature. The comparison
     * is constant time.
     */
    pub fn verify(&self, token: &str) -> Result<TokenClaims, TokenError> {
        let raw = URL_SAFE_NO_PAD
            .decode(token.as_bytes())
            .map_err(|_| TokenError::Malformed)?;
        let signed: SignedToken =
            serde_json::from_slice(&raw).map_err(|_| TokenError::Malformed)?;

        let claims = TokenClaims {
            tid: signed.tid,
            eid: signed.eid,
            iat: signed.iat,
        };
        let expected = self.signature_for(&claims);
        if !constant_time_eq(expected.as_bytes(), signed.sig.as_bytes()) {
            return Err(TokenError::Signature);
        }
        Ok(claims)
    }

    // HMAC-SHA256 over the canonical claims JSON, hex, truncated.
    fn signature_for(&self, claims: &TokenClaims) -> String {
        let payload = serde_json::to_vec(claims).unwrap_or_default();
        let mut mac = Hmac::<Sha256>::new_from_slice(&self.secret)
            .expect("HMAC can take key of any size");
        mac.update(&payload);
        let mut hex_sig = hex::encode(mac.finalize().into_bytes());
        hex_sig.truncate(SIG_HEX_LEN);
        hex_sig
    }
}

/// Length-checked constant-time byte comparison. The length check itself
/// leaks only the length, which the token format already makes public.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec() -> TicketTokenCodec {
        TicketTokenCodec::new("test-qr-secret")
    }

    #[test]
    fn sign_then_verify_round_trips_claims() {
        let token = codec().sign("ticket-1", "event-1", 1_700_000_000_000);
        let claims = codec().verify(&token).expect("valid token");
        assert_eq!(claims.tid, "ticket-1");
        assert_eq!(claims.eid, "event-1");
        assert_eq!(claims.iat, 1_700_000_000_000);
    }

    #[test]
    fn token_is_base64url_of_json_with_truncated_sig() {
        let token = codec().sign("t", "e", 42);
        let raw = URL_SAFE_NO_PAD.decode(token.as_bytes()).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&raw).unwrap();
        assert_eq!(value["tid"], "t");
        assert_eq!(value["eid"], "e");
        assert_eq!(value["iat"], 42);
        assert_eq!(value["sig"].as_str().unwrap().len(), 16);
    }

    #[test]
    fn different_iat_produces_different_token() {
        let a = codec().sign("t", "e", 1);
        let b = codec().sign("t", "e", 2);
        assert_ne!(a, b);
    }

    #[test]
    fn tampered_payload_fails_with_sig_error() {
        let token = codec().sign("ticket-1", "event-1", 1_700_000_000_000);
        let raw = URL_SAFE_NO_PAD.decode(token.as_bytes()).unwrap();
        let mut value: serde_json::Value = serde_json::from_slice(&raw).unwrap();
        // Re-point the token at a different ticket, keep the old signature
        value["tid"] = serde_json::Value::String("ticket-2".into());
        let forged = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&value).unwrap());
        assert_eq!(codec().verify(&forged), Err(TokenError::Signature));
    }

    #[test]
    fn wrong_secret_fails_with_sig_error() {
        let token = codec().sign("t", "e", 7);
        let other = TicketTokenCodec::new("a-different-secret");
        assert_eq!(other.verify(&token), Err(TokenError::Signature));
    }

    #[test]
    fn garbage_inputs_are_malformed_not_panics() {
        for input in ["", "not-base64!!!", "aGVsbG8", "e30", "%%%%"] {
            assert_eq!(codec().verify(input), Err(TokenError::Malformed), "input: {}", input);
        }
    }

    #[test]
    fn truncated_token_never_verifies() {
        let token = codec().sign("ticket-1", "event-1", 1_700_000_000_000);
        for cut in 1..token.len() {
            assert!(codec().verify(&token[..cut]).is_err(), "cut at {}", cut);
        }
    }

    #[test]
    fn constant_time_eq_basics() {
        assert!(constant_time_eq(b"abcd", b"abcd"));
        assert!(!constant_time_eq(b"abcd", b"abce"));
        assert!(!constant_time_eq(b"abcd", b"abc"));
        assert!(constant_time_eq(b"", b""));
    }
}
