//! # kc-model
//!
//! Domain models shared between the identity server and its user
//! federation providers (User, Realm, credentials).

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod credential;
pub mod realm;
pub mod user;

pub use credential::{CredentialInput, CredentialType};
pub use realm::Realm;
pub use user::User;
