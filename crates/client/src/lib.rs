//! Nexus Market client library.
//!
//! Client-side core of the Nexus Market multi-vendor storefront: an
//! authenticated session that renews its own credentials, a cart that
//! survives restarts, and checkout coordination between the two.
//!
//! # Modules
//!
//! - [`session`] - Token-holding API client with single-flight renewal
//! - [`cart`] - Persistent cart store
//! - [`checkout`] - Cart to order submission
//! - [`api`] - Typed catalog, shop and order endpoints
//! - [`storage`] - Durable key-value storage with change notifications
//! - [`config`] - Environment configuration

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod cart;
pub mod checkout;
pub mod config;
mod marketplace;
pub mod session;
pub mod storage;

#[cfg(test)]
mod testing;

pub use api::CommerceApi;
pub use cart::{CartLine, CartProduct, CartStore};
pub use checkout::{CheckoutError, checkout};
pub use config::{ClientConfig, ConfigError};
pub use marketplace::{Marketplace, SetupError};
pub use session::{Identity, SessionClient, SessionError};
pub use storage::{FileStorage, MemoryStorage, Storage, StorageError};
