//! Core types for Nexus Market.
//!
//! This module provides type-safe wrappers for common marketplace concepts.

pub mod id;
pub mod price;
pub mod role;
pub mod status;

pub use id::*;
pub use price::{PriceError, format_money, parse_price};
pub use role::{Role, RoleParseError};
pub use status::OrderStatus;
