//! Nexus Market Core - Shared types library.
//!
//! This crate provides common types used across all Nexus Market components:
//! - `client` - Session client, cart store, and commerce API wrappers
//! - `cli` - Command-line storefront front end
//!
//! # Architecture
//!
//! The core crate contains only types and pure helpers - no I/O, no storage
//! access, no HTTP clients. This keeps it lightweight and allows it to be used
//! anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, account roles, order statuses, and money helpers

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
