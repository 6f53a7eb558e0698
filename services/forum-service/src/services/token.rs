//! Token issuer/verifier.
//!
//! A token is `base64url(claims_json) "." base64url(hmac_sha256(key, payload))`.
//! Verification checks the signature before looking at the payload, then the
//! expiry. It never consults the session store; see [`crate::services::auth`].

use crate::error::AuthError;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Length of a generated signing key in bytes.
const GENERATED_KEY_BYTES: usize = 32;

/// Signed token contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: i64,
    /// Session identifier the token refers to.
    pub sid: String,
    /// Issued at, unix seconds.
    pub iat: i64,
    /// Expires at, unix seconds. Equal to the session's expiry.
    pub exp: i64,
}

impl Claims {
    /// True once `now` has reached the expiry second.
    #[must_use]
    pub const fn is_expired_at(&self, now: i64) -> bool {
        self.exp <= now
    }
}

/// HMAC-SHA256 token signer. The key is fixed for the life of the value.
#[derive(Clone)]
pub struct TokenService {
    key: Vec<u8>,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("key", &"<redacted>")
            .finish()
    }
}

impl TokenService {
    /// Create a signer from a secret key.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Signing`] for an empty key.
    pub fn new(secret: impl AsRef<[u8]>) -> Result<Self, AuthError> {
        let key = secret.as_ref().to_vec();
        if key.is_empty() {
            return Err(AuthError::Signing("signing key cannot be empty".to_string()));
        }
        Ok(Self { key })
    }

    /// Create a signer with a random per-process key.
    #[must_use]
    pub fn with_random_key() -> Self {
        let mut key = vec![0u8; GENERATED_KEY_BYTES];
        rand::rng().fill(&mut key[..]);
        Self { key }
    }

    /// Mint a token for `user_id` referencing `session_id`, expiring at `expires_at`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Signing`] if the claims cannot be serialized.
    pub fn issue(
        &self,
        user_id: i64,
        session_id: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<String, AuthError> {
        let claims = Claims {
            sub: user_id,
            sid: session_id.to_string(),
            iat: Utc::now().timestamp(),
            exp: expires_at.timestamp(),
        };
        self.encode(&claims)
    }

    /// Sign an arbitrary claims value.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Signing`] if the claims cannot be serialized or signed.
    pub fn encode(&self, claims: &Claims) -> Result<String, AuthError> {
        let json = serde_json::to_vec(claims)
            .map_err(|e| AuthError::Signing(format!("failed to encode claims: {e}")))?;
        let payload = URL_SAFE_NO_PAD.encode(json);
        let signature = self.sign(payload.as_bytes())?;
        Ok(format!("{payload}.{signature}"))
    }

    /// Check signature and expiry, returning the claims.
    ///
    /// # Errors
    ///
    /// [`AuthError::TokenMalformed`], [`AuthError::TokenSignatureInvalid`] or
    /// [`AuthError::TokenExpired`]. [`AuthError::Signing`] if the key is unusable.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        self.verify_at(token, Utc::now().timestamp())
    }

    /// [`Self::verify`] against an explicit clock reading.
    ///
    /// # Errors
    ///
    /// Same as [`Self::verify`].
    pub fn verify_at(&self, token: &str, now: i64) -> Result<Claims, AuthError> {
        let (payload, signature) = token.split_once('.').ok_or(AuthError::TokenMalformed)?;
        if payload.is_empty() || signature.is_empty() || signature.contains('.') {
            return Err(AuthError::TokenMalformed);
        }

        // Compared as encoded text, so any altered character is a signature
        // mismatch, including ones that would not decode
        let expected = self.sign(payload.as_bytes())?;
        if signature.len() != expected.len()
            || !bool::from(signature.as_bytes().ct_eq(expected.as_bytes()))
        {
            return Err(AuthError::TokenSignatureInvalid);
        }

        let json = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|_| AuthError::TokenMalformed)?;
        let claims: Claims =
            serde_json::from_slice(&json).map_err(|_| AuthError::TokenMalformed)?;

        if claims.is_expired_at(now) {
            return Err(AuthError::TokenExpired);
        }

        Ok(claims)
    }

    /// Encoded HMAC of `payload`.
    fn sign(&self, payload: &[u8]) -> Result<String, AuthError> {
        let mut mac = HmacSha256::new_from_slice(&self.key)
            .map_err(|e| AuthError::Signing(format!("invalid signing key: {e}")))?;
        mac.update(payload);
        Ok(URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use proptest::prelude::*;

    fn service() -> TokenService {
        TokenService::new("test-secret-key").unwrap()
    }

    fn in_one_hour() -> DateTime<Utc> {
        Utc::now() + Duration::hours(1)
    }

    #[test]
    fn test_issue_and_verify() {
        let tokens = service();
        let expires = in_one_hour();

        let token = tokens.issue(42, "sess-abc", expires).unwrap();
        let claims = tokens.verify(&token).unwrap();

        assert_eq!(claims.sub, 42);
        assert_eq!(claims.sid, "sess-abc");
        assert_eq!(claims.exp, expires.timestamp());
        assert!(claims.iat <= claims.exp);
    }

    #[test]
    fn test_expired_token_rejected() {
        let tokens = service();
        let token = tokens
            .issue(1, "sess", Utc::now() - Duration::seconds(5))
            .unwrap();

        assert!(matches!(tokens.verify(&token), Err(AuthError::TokenExpired)));
    }

    #[test]
    fn test_expiry_has_no_grace_window() {
        let tokens = service();
        let claims = Claims {
            sub: 1,
            sid: "s".into(),
            iat: 100,
            exp: 200,
        };
        let token = tokens.encode(&claims).unwrap();

        assert!(tokens.verify_at(&token, 199).is_ok());
        assert!(matches!(
            tokens.verify_at(&token, 200),
            Err(AuthError::TokenExpired)
        ));
    }

    #[test]
    fn test_wrong_key_rejected() {
        let token = service().issue(1, "sess", in_one_hour()).unwrap();
        let other = TokenService::new("another-key").unwrap();

        assert!(matches!(
            other.verify(&token),
            Err(AuthError::TokenSignatureInvalid)
        ));
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let tokens = service();
        let token = tokens.issue(1, "sess", in_one_hour()).unwrap();
        let (_, signature) = token.split_once('.').unwrap();

        let forged_claims = Claims {
            sub: 2,
            sid: "sess".into(),
            iat: 0,
            exp: in_one_hour().timestamp(),
        };
        let forged_payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&forged_claims).unwrap());
        let forged = format!("{forged_payload}.{signature}");

        assert!(matches!(
            tokens.verify(&forged),
            Err(AuthError::TokenSignatureInvalid)
        ));
    }

    #[test]
    fn test_malformed_tokens() {
        let tokens = service();
        for bad in ["", "no-dot", ".", "abc.", ".abc", "a.b.c"] {
            assert!(
                matches!(tokens.verify(bad), Err(AuthError::TokenMalformed)),
                "expected malformed for {bad:?}"
            );
        }
    }

    #[test]
    fn test_signed_garbage_payload_is_malformed() {
        let tokens = service();
        let payload = URL_SAFE_NO_PAD.encode(b"not json");
        let signature = tokens.sign(payload.as_bytes()).unwrap();

        assert!(matches!(
            tokens.verify(&format!("{payload}.{signature}")),
            Err(AuthError::TokenMalformed)
        ));
    }

    #[test]
    fn test_undecodable_signature_is_signature_failure() {
        let tokens = service();
        let token = tokens.issue(1, "sess", in_one_hour()).unwrap();
        let (payload, signature) = token.split_once('.').unwrap();

        let mut bang = signature.to_string();
        bang.replace_range(0..1, "!");
        let padded = format!("{signature}=");

        for altered in [bang, padded, "!!!".to_string()] {
            assert!(
                matches!(
                    tokens.verify(&format!("{payload}.{altered}")),
                    Err(AuthError::TokenSignatureInvalid)
                ),
                "expected signature failure for {altered:?}"
            );
        }
    }

    #[test]
    fn test_empty_key_rejected() {
        assert!(matches!(TokenService::new(""), Err(AuthError::Signing(_))));
    }

    #[test]
    fn test_random_keys_differ() {
        let a = TokenService::with_random_key();
        let b = TokenService::with_random_key();
        let token = a.issue(1, "s", in_one_hour()).unwrap();
        assert!(b.verify(&token).is_err());
        assert!(!format!("{a:?}").contains(char::is_numeric));
    }

    proptest! {
        #[test]
        fn prop_altered_signature_byte_rejected(index in any::<prop::sample::Index>(), flip in 1u8..=255) {
            let tokens = service();
            let token = tokens.issue(7, "sess", in_one_hour()).unwrap();
            let (payload, signature) = token.split_once('.').unwrap();

            let mut raw = URL_SAFE_NO_PAD.decode(signature).unwrap();
            let at = index.index(raw.len());
            raw[at] ^= flip;
            let altered = format!("{payload}.{}", URL_SAFE_NO_PAD.encode(raw));

            prop_assert!(matches!(tokens.verify(&altered), Err(AuthError::TokenSignatureInvalid)));
        }

        #[test]
        fn prop_altered_signature_character_rejected(
            index in any::<prop::sample::Index>(),
            replacement in prop::char::range('!', '~'),
        ) {
            let tokens = service();
            let token = tokens.issue(7, "sess", in_one_hour()).unwrap();
            let (payload, signature) = token.split_once('.').unwrap();

            let mut chars: Vec<char> = signature.chars().collect();
            let at = index.index(chars.len());
            prop_assume!(replacement != '.' && replacement != chars[at]);
            chars[at] = replacement;
            let altered = format!("{payload}.{}", chars.into_iter().collect::<String>());

            prop_assert!(matches!(tokens.verify(&altered), Err(AuthError::TokenSignatureInvalid)));
        }
    }
}
