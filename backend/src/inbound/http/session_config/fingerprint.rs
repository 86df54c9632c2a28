//! Short, non-secret identifier for the active session key.
//!
//! The server logs the fingerprint at startup so operators can tell which key
//! file a node loaded without the key itself reaching the logs.

use actix_web::cookie::Key;
use sha2::{Digest, Sha256};

const FINGERPRINT_LEN: usize = 8;

/// Lower-case hex of the first 8 bytes of SHA-256 over the signing half of
/// `key`.
///
/// ```rust
/// use actix_web::cookie::Key;
/// use crm_backend::inbound::http::session_config::fingerprint::key_fingerprint;
///
/// let fingerprint = key_fingerprint(&Key::derive_from(&[7_u8; 64]));
/// assert_eq!(fingerprint.len(), 16);
/// ```
#[must_use]
pub fn key_fingerprint(key: &Key) -> String {
    let digest = Sha256::digest(key.signing());
    hex::encode(&digest[..FINGERPRINT_LEN])
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn same_material_gives_same_fingerprint() {
        let first = key_fingerprint(&Key::derive_from(&[b'k'; 64]));
        let second = key_fingerprint(&Key::derive_from(&[b'k'; 64]));
        assert_eq!(first, second);
        assert!(first.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[rstest]
    fn distinct_material_gives_distinct_fingerprints() {
        let first = key_fingerprint(&Key::derive_from(&[b'k'; 64]));
        let second = key_fingerprint(&Key::derive_from(&[b'q'; 64]));
        assert_ne!(first, second);
    }
}
