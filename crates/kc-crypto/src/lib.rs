//! # kc-crypto
//!
//! Cryptographic primitives used by user federation providers.
//!
//! External user stores frequently keep legacy password hashes built from
//! plain message digests. This crate names those digests, computes them,
//! and draws the random salts that go with them.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod algorithm;
pub mod hash;
pub mod random;

pub use algorithm::{AlgorithmError, DigestAlgorithm};
pub use hash::{digest, hex_digest_upper};
pub use random::{random_base64, random_bytes};
