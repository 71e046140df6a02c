//! Challenge-response scramble computation for the MYSQL41 and
//! SHA256_MEMORY mechanisms.

use sha1::{Digest, Sha1};
use sha2::Sha256;

/// MYSQL41 response: `sha1(pass) XOR sha1(nonce || sha1(sha1(pass)))`,
/// sent as `*` followed by the uppercase hex digits.
///
/// An empty password authenticates with an empty response.
pub fn mysql41_scramble(password: &str, nonce: &[u8]) -> String {
    if password.is_empty() {
        return String::new();
    }

    let stage1 = Sha1::digest(password.as_bytes());
    let stage2 = Sha1::digest(stage1);

    let mut hasher = Sha1::new();
    hasher.update(nonce);
    hasher.update(stage2);
    let token = hasher.finalize();

    let mut scramble = [0_u8; 20];
    for i in 0..20 {
        scramble[i] = stage1[i] ^ token[i];
    }

    format!("*{}", hex::encode_upper(scramble))
}

/// SHA256_MEMORY response:
/// `sha256(sha256(sha256(pass)) || nonce) XOR sha256(pass)`, hex-encoded.
pub fn sha256_memory_scramble(password: &str, nonce: &[u8]) -> String {
    let stage1 = Sha256::digest(password.as_bytes());
    let stage2 = Sha256::digest(stage1);

    let mut hasher = Sha256::new();
    hasher.update(stage2);
    hasher.update(nonce);
    let token = hasher.finalize();

    let mut scramble = [0_u8; 32];
    for i in 0..32 {
        scramble[i] = token[i] ^ stage1[i];
    }

    hex::encode_upper(scramble)
}

/// The `AuthenticateContinue` payload: `authz \0 authc \0 response`.
pub fn continue_payload(db: &str, user: &str, response: &str) -> Vec<u8> {
    let mut data = Vec::with_capacity(db.len() + user.len() + response.len() + 2);
    data.extend_from_slice(db.as_bytes());
    data.push(0);
    data.extend_from_slice(user.as_bytes());
    data.push(0);
    data.extend_from_slice(response.as_bytes());
    data
}
