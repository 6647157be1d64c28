// inkguard/src/fingerprint.rs
//
// Content-addressed manuscript fingerprinting.
//
// A fingerprint is the SHA-256 of the exact character sequence — case- and
// whitespace-sensitive. Two manuscripts share a fingerprint iff they are
// byte-identical, which is what integrity checks and dedup need. Pure
// function; the empty manuscript has a fingerprint too.

use sha2::{Digest, Sha256};

/// 64-char lowercase-hex SHA-256 digest over the manuscript text.
pub fn document_fingerprint(content: &str) -> String {
    let mut h = Sha256::new();
    h.update(content.as_bytes());
    hex::encode(h.finalize())
}
