//! # kc-federation
//!
//! User federation framework.
//!
//! This crate provides the traits federation providers implement
//! ([`UserStorageProvider`], [`CredentialValidator`], [`CredentialUpdater`],
//! [`ImportSynchronization`]) and the host collaborators they call back
//! into: the user cache and the local user store.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod cache;
pub mod config;
pub mod error;
pub mod provider;
pub mod storage_id;
pub mod sync;

pub use cache::{CachedUser, InMemoryUserCache, UserCache, UserHandle};
pub use config::FederationConfig;
pub use error::{FederationError, FederationResult};
pub use provider::{
    CredentialUpdater, CredentialValidator, UserStorageProvider, UserStorageProviderFactory,
};
pub use storage_id::StorageId;
pub use sync::{
    ImportSynchronization, InMemoryUserStore, LocalUserStore, LocalUserTransaction, SyncError,
    SyncResult,
};
