//! Salt generation from the thread-local CSPRNG.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use rand::RngCore;

/// `len` bytes from the operating-system-seeded thread RNG.
#[must_use]
pub fn random_bytes(len: usize) -> Vec<u8> {
    let mut salt = vec![0u8; len];
    rand::rng().fill_bytes(&mut salt);
    salt
}

/// `len` random bytes as padded standard base64, the form salt columns store.
#[must_use]
pub fn random_base64(len: usize) -> String {
    STANDARD.encode(random_bytes(len))
}
