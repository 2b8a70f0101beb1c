//! Cartify Core - Shared domain types.
//!
//! This crate provides the types used across all Cartify components:
//! - `cartify-client` - Session, cart and REST API client library
//! - `cartify-cli` - Command-line front end
//!
//! # Architecture
//!
//! The core crate contains only types, validation and pure business rules -
//! no I/O, no storage, no HTTP clients.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, money and commission, emails, roles and statuses
//! - [`forms`] - User-submitted forms and their validation rules

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod forms;
pub mod types;

pub use forms::{
    ACCOUNT_NUMBER_LENGTH, BVN_LENGTH, BankAccount, MIN_PASSWORD_LENGTH, PasswordChangeForm,
    PayoutRequest, SignupForm, ValidationError, VerificationForm,
};
pub use types::*;
