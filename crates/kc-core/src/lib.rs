//! # kc-core
//!
//! Core types shared across the identity server and its providers.
//!
//! ## NIST 800-53 Rev5 Controls
//!
//! - AU-2: Event logging framework

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod event;

pub use event::{Event, EventBuilder, EventListener, EventOutcome, EventType};
