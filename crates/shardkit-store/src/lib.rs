//! Store client boundary for shardkit.
//!
//! The builders in `shardkit-builder` never touch memory owned by a store
//! instance. They describe objects as [`ObjectMeta`] attribute trees, hand
//! them to a [`StoreClient`], and keep only the returned [`ObjectId`]s.
//!
//! # Visibility
//!
//! - A freshly created object is *local*: only clients connected to the
//!   creating instance can resolve it.
//! - [`StoreClient::publish`] copies the metadata into the deployment-wide
//!   directory, after which any client on any instance resolves the id.
//! - Names bind to ids in the same directory, last writer wins.
//! - Blob payloads never leave their instance.
//!
//! # Backends
//!
//! - [`InMemoryDeployment`] / [`InMemoryClient`] -- several instances sharing
//!   one directory, for tests and embedding
//!
//! [`ObjectId`]: shardkit_types::ObjectId

pub mod config;
pub mod error;
pub mod hasher;
pub mod memory;
pub mod meta;
pub mod traits;

// Re-export primary types at crate root for ergonomic imports.
pub use config::DeploymentConfig;
pub use error::{StoreError, StoreResult};
pub use hasher::IdHasher;
pub use memory::{FailPoint, InMemoryClient, InMemoryDeployment};
pub use meta::ObjectMeta;
pub use traits::StoreClient;
