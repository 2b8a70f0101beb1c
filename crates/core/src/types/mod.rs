//! Core types for Cartify.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod price;
pub mod status;

pub use email::{Email, EmailError};
pub use id::*;
pub use price::{COMMISSION_RATE, CurrencyCode, Money, commission, seller_earnings};
pub use status::*;
