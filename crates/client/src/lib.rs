//! Cartify Client - session, cart and REST API client.
//!
//! # Overview
//!
//! - [`Cartify`] - the application context; owns everything below
//! - [`AuthStore`] - signed-in user and bearer token, mirrored to storage
//! - [`CartStore`] - the local cart and its totals
//! - [`ApiClient`] - HTTP access to the marketplace API
//! - [`Storage`] - key/value persistence (`MemoryStorage`, `FileStorage`)
//!
//! # Example
//!
//! ```rust,ignore
//! let storage = Arc::new(FileStorage::open("storage.json"));
//! let cartify = Cartify::new(ClientConfig::from_env()?, storage)?;
//! cartify.login("ada@example.com", &password).await?;
//! cartify.add_to_cart(product.to_cart_item()).await?;
//! cartify.pull_cart(ReconcilePolicy::ServerWins).await?;
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod cart;
pub mod config;
mod context;
mod error;
pub mod session;
pub mod storage;

pub use api::{ApiClient, ApiError, HealthStatus, Method, Payload, UnauthorizedHook};
pub use cart::{CartItem, CartStore};
pub use config::{ClientConfig, ConfigError};
pub use context::{Cartify, DeliveryState, OutgoingMessage, ReconcilePolicy};
pub use error::ClientError;
pub use session::{AuthStore, User};
pub use storage::{FileStorage, MemoryStorage, Storage, StorageError};
