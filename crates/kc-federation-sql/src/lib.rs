//! # kc-federation-sql
//!
//! User federation against an operator-owned SQL database.
//!
//! The operator supplies the SQL: one parameterized statement per
//! directory operation (lookup, search, count, credential read and write).
//! This crate runs those statements through a connection pool, pages them
//! in the database's own dialect, maps result rows to users, and verifies
//! passwords stored with a legacy iterated salted digest.
//!
//! ## Layout
//!
//! - [`dialect`] / [`paging`]: per-database connection check and row windowing
//! - [`datasource`] / [`executor`]: pooled execution with parameter binding
//! - [`credential`]: iterated salted digests and Argon2 verification
//! - [`config`]: the query template set and connection settings
//! - [`repository`]: directory operations over the templates
//! - [`provider`] / [`sync`] / [`factory`] / [`listener`]: host integration

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod config;
pub mod credential;
pub mod datasource;
pub mod dialect;
pub mod error;
pub mod executor;
pub mod factory;
pub mod listener;
pub mod mapper;
pub mod paging;
pub mod provider;
pub mod repository;
pub mod sync;

pub use config::{ConnectionSettings, ProviderConfig, QueryConfigurations};
pub use credential::{CredentialRecord, PasswordScheme};
pub use datasource::{DataSource, ResultSet, SqlxDataSource};
pub use dialect::Rdbms;
pub use error::{SqlFederationError, SqlResult};
pub use factory::{SqlUserStorageProviderFactory, PROVIDER_ID};
pub use listener::ProfileUpdateListener;
pub use paging::Pageable;
pub use provider::SqlUserStorageProvider;
pub use repository::UserRepository;
