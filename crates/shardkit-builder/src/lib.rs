//! Builders for partitioned shardkit objects.
//!
//! A sharded dataframe is assembled in three steps:
//!
//! 1. Each instance fills a [`LocalPartitionBuilder`] with named columns and
//!    builds it into an immutable [`LocalPartition`] held by that instance.
//! 2. Any client collects `(instance, partition id)` pairs into a
//!    [`GlobalObjectBuilder`] together with the partition grid shape.
//! 3. Sealing the global builder publishes one descriptor that every
//!    instance can resolve as a [`GlobalObject`].
//!
//! [`StreamBuilder`] follows the same lifecycle but its seal registers an
//! append channel and returns a [`StreamHandle`].
//!
//! Every builder moves through the states of [`BuildState`] exactly once;
//! see [`lifecycle`] for the transition rules.

pub mod column;
pub mod config;
pub mod error;
pub mod global;
pub mod lifecycle;
pub mod local;
pub mod object;
pub mod partition_set;
pub mod registry;
pub mod stream;

pub use column::{BuiltColumn, ColumnBuilder, ExistingColumn, Tensor, TensorBuilder, TensorValues};
pub use config::BuilderConfig;
pub use error::{BuilderError, Result};
pub use global::GlobalObjectBuilder;
pub use lifecycle::{BuildState, ObjectBuilder};
pub use local::LocalPartitionBuilder;
pub use object::{GlobalObject, LocalPartition, SchemaField};
pub use partition_set::{PartitionEntry, PartitionSet};
pub use registry::ColumnRegistry;
pub use stream::{StreamBuilder, StreamHandle};

// Re-export the types callers need alongside the builders.
pub use shardkit_store::{InMemoryClient, InMemoryDeployment, StoreClient};
pub use shardkit_types::{DataType, InstanceId, ObjectId, PartitionIndex, PartitionShape};
