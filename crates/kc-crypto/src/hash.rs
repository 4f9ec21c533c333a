//! Message digest functions.

use sha2::Digest;

use crate::algorithm::DigestAlgorithm;

/// Computes the digest of the input data.
#[must_use]
pub fn digest(algorithm: DigestAlgorithm, data: &[u8]) -> Vec<u8> {
    match algorithm {
        DigestAlgorithm::Md5 => md5::Md5::digest(data).to_vec(),
        DigestAlgorithm::Sha1 => sha1::Sha1::digest(data).to_vec(),
        DigestAlgorithm::Sha224 => sha2::Sha224::digest(data).to_vec(),
        DigestAlgorithm::Sha256 => sha2::Sha256::digest(data).to_vec(),
        DigestAlgorithm::Sha384 => sha2::Sha384::digest(data).to_vec(),
        DigestAlgorithm::Sha512 => sha2::Sha512::digest(data).to_vec(),
        DigestAlgorithm::Sha512_224 => sha2::Sha512_224::digest(data).to_vec(),
        DigestAlgorithm::Sha512_256 => sha2::Sha512_256::digest(data).to_vec(),
        DigestAlgorithm::Sha3_224 => sha3::Sha3_224::digest(data).to_vec(),
        DigestAlgorithm::Sha3_256 => sha3::Sha3_256::digest(data).to_vec(),
        DigestAlgorithm::Sha3_384 => sha3::Sha3_384::digest(data).to_vec(),
        DigestAlgorithm::Sha3_512 => sha3::Sha3_512::digest(data).to_vec(),
    }
}

/// Computes the digest of the input data as uppercase hex.
#[must_use]
pub fn hex_digest_upper(algorithm: DigestAlgorithm, data: &[u8]) -> String {
    hex::encode_upper(digest(algorithm, data))
}
