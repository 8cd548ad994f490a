use jsonwebtoken::{DecodingKey, EncodingKey};
use sha2::{Digest, Sha256};

/// HMAC encode/decode pair derived from one shared secret.
#[derive(Clone)]
pub struct SigningKeys {
    pub(crate) encoding: EncodingKey,
    pub(crate) decoding: DecodingKey,
}

impl SigningKeys {
    pub fn from_secret(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }
}

/// SHA-256 fingerprint of a token, hex encoded.
/// Session records store this value, never the token itself.
pub fn fingerprint(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_is_stable_hex() {
        let a = fingerprint("header.payload.signature");
        let b = fingerprint("header.payload.signature");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn different_tokens_different_fingerprints() {
        assert_ne!(fingerprint("token-a"), fingerprint("token-b"));
    }
}
