//! API key digests
//!
//! Keys are persisted only as digests; the plaintext exists in the
//! issuance response and in each request header.

use sha2::{Digest, Sha256};

/// SHA-256 of the key, lowercase hex.
pub fn hash_api_key(key: &str) -> String {
    hex::encode(Sha256::digest(key.as_bytes()))
}

/// Short digest prefix for log fields.
pub fn digest_prefix(digest: &str) -> &str {
    digest.get(..12).unwrap_or(digest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_is_stable_hex() {
        let digest = hash_api_key("2f1c7e9a-5b3d-4c8e-9f0a-1b2c3d4e5f60");
        assert_eq!(digest.len(), 64);
        assert!(digest.bytes().all(|b| b.is_ascii_hexdigit()));
        assert_eq!(digest, hash_api_key("2f1c7e9a-5b3d-4c8e-9f0a-1b2c3d4e5f60"));
        assert_ne!(digest, hash_api_key("2f1c7e9a-5b3d-4c8e-9f0a-1b2c3d4e5f61"));
    }

    #[test]
    fn known_vector() {
        assert_eq!(
            hash_api_key("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn prefix_is_bounded() {
        assert_eq!(digest_prefix("abcdef0123456789"), "abcdef012345");
        assert_eq!(digest_prefix("abc"), "abc");
    }
}
