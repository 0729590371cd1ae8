//! Foundation types for shardkit.
//!
//! This crate provides the identifier and coordinate types shared by the
//! store collaborator and the builders. Every other shardkit crate depends on
//! `shardkit-types`.
//!
//! # Key Types
//!
//! - [`ObjectId`] -- Opaque identifier of an object held by a store instance
//! - [`InstanceId`] -- Opaque identifier of one store instance in a deployment
//! - [`PartitionIndex`] -- (row, column) coordinate of one partition
//! - [`PartitionShape`] -- (rows, columns) size of a partition grid
//! - [`DataType`] -- Element type of a typed column

pub mod dtype;
pub mod error;
pub mod instance;
pub mod object;
pub mod partition;

pub use dtype::DataType;
pub use error::TypeError;
pub use instance::InstanceId;
pub use object::ObjectId;
pub use partition::{PartitionIndex, PartitionShape};
