//! Column builders: the capability a partition delegates column commits to.

use std::fmt;

use serde::{Deserialize, Serialize};
use shardkit_store::{ObjectMeta, StoreClient, StoreError, StoreResult};
use shardkit_types::{DataType, ObjectId};
use tracing::warn;

use crate::error::{BuilderError, Result};

/// Type name of tensor column objects.
pub const TENSOR_TYPE: &str = "shardkit::Tensor";

/// Anything that can commit one column to the store.
///
/// The partition builder only stores these and calls [`build`] in
/// registration order; the encoding of the column is the builder's business.
///
/// [`build`]: ColumnBuilder::build
pub trait ColumnBuilder: fmt::Debug + Send {
    /// Commit the column. On error, the builder must already have released
    /// whatever it created during this call.
    fn build(&self, client: &dyn StoreClient) -> StoreResult<BuiltColumn>;

    /// Number of rows.
    fn len(&self) -> usize;

    fn data_type(&self) -> DataType;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Result of a column build: the column object plus every object and blob
/// the build created, in creation order.
///
/// A failed partition build deletes exactly `created`. Objects the column
/// merely references are never touched.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BuiltColumn {
    pub id: ObjectId,
    pub created: Vec<ObjectId>,
}

impl BuiltColumn {
    /// A column object created by this build, along with its parts.
    pub fn new(id: ObjectId, created: Vec<ObjectId>) -> Self {
        Self { id, created }
    }

    /// A column that already existed; nothing was created.
    pub fn existing(id: ObjectId) -> Self {
        Self {
            id,
            created: Vec::new(),
        }
    }
}

/// Values of a one-dimensional tensor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum TensorValues {
    Int64(Vec<i64>),
    Float64(Vec<f64>),
    Bool(Vec<bool>),
    Utf8(Vec<String>),
}

impl TensorValues {
    pub fn len(&self) -> usize {
        match self {
            Self::Int64(v) => v.len(),
            Self::Float64(v) => v.len(),
            Self::Bool(v) => v.len(),
            Self::Utf8(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn data_type(&self) -> DataType {
        match self {
            Self::Int64(_) => DataType::Int64,
            Self::Float64(_) => DataType::Float64,
            Self::Bool(_) => DataType::Bool,
            Self::Utf8(_) => DataType::Utf8,
        }
    }
}

impl From<Vec<i64>> for TensorValues {
    fn from(v: Vec<i64>) -> Self {
        Self::Int64(v)
    }
}

impl From<Vec<f64>> for TensorValues {
    fn from(v: Vec<f64>) -> Self {
        Self::Float64(v)
    }
}

impl From<Vec<bool>> for TensorValues {
    fn from(v: Vec<bool>) -> Self {
        Self::Bool(v)
    }
}

impl From<Vec<String>> for TensorValues {
    fn from(v: Vec<String>) -> Self {
        Self::Utf8(v)
    }
}

/// Builds a one-dimensional tensor column: a payload blob plus a tensor
/// object referencing it.
#[derive(Clone, Debug, PartialEq)]
pub struct TensorBuilder {
    values: TensorValues,
}

impl TensorBuilder {
    pub fn new(values: impl Into<TensorValues>) -> Self {
        Self {
            values: values.into(),
        }
    }

    pub fn values(&self) -> &TensorValues {
        &self.values
    }
}

impl ColumnBuilder for TensorBuilder {
    fn build(&self, client: &dyn StoreClient) -> StoreResult<BuiltColumn> {
        let payload = bincode::serialize(&self.values)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        let buffer = client.create_blob(payload)?;

        let mut meta = ObjectMeta::new(TENSOR_TYPE);
        meta.set("value_type", &self.values.data_type())?;
        meta.set("shape", &[self.values.len()])?;
        meta.add_member("buffer", buffer)?;

        let id = client.create_object(meta).inspect_err(|_| {
            if let Err(e) = client.delete_object(&buffer) {
                warn!(id = %buffer.short_hex(), error = %e, "failed to release tensor buffer");
            }
        })?;
        Ok(BuiltColumn::new(id, vec![buffer, id]))
    }

    fn len(&self) -> usize {
        self.values.len()
    }

    fn data_type(&self) -> DataType {
        self.values.data_type()
    }
}

/// A column whose object already exists in the store, reused as-is.
#[derive(Clone, Debug, PartialEq)]
pub struct ExistingColumn {
    id: ObjectId,
    len: usize,
    data_type: DataType,
}

impl ExistingColumn {
    /// Reference a tensor the client can already resolve.
    pub fn resolve(client: &dyn StoreClient, id: ObjectId) -> Result<Self> {
        let meta = client.get_meta(&id)?;
        let (data_type, len) = tensor_header(&meta)?;
        Ok(Self { id, len, data_type })
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }
}

impl ColumnBuilder for ExistingColumn {
    fn build(&self, _client: &dyn StoreClient) -> StoreResult<BuiltColumn> {
        Ok(BuiltColumn::existing(self.id))
    }

    fn len(&self) -> usize {
        self.len
    }

    fn data_type(&self) -> DataType {
        self.data_type
    }
}

/// A built tensor column, read back from the store.
#[derive(Clone, Debug, PartialEq)]
pub struct Tensor {
    pub id: ObjectId,
    pub values: TensorValues,
}

impl Tensor {
    /// Resolve a tensor and load its values.
    ///
    /// Payloads are instance-local, so this only succeeds on a client
    /// connected to the instance that built the column.
    pub fn resolve(client: &dyn StoreClient, id: ObjectId) -> Result<Self> {
        let meta = client.get_meta(&id)?;
        let (data_type, len) = tensor_header(&meta)?;
        let buffer = meta.member("buffer").map_err(|e| BuilderError::decode(id, e))?;
        let payload = client.get_blob(&buffer)?;
        let values: TensorValues =
            bincode::deserialize(&payload).map_err(|e| BuilderError::decode(id, e))?;
        if values.data_type() != data_type || values.len() != len {
            return Err(BuilderError::decode(
                id,
                format!(
                    "payload holds {} x {}, metadata says {len} x {data_type}",
                    values.len(),
                    values.data_type()
                ),
            ));
        }
        Ok(Self { id, values })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

fn tensor_header(meta: &ObjectMeta) -> Result<(DataType, usize)> {
    if !meta.has_type(TENSOR_TYPE) {
        return Err(BuilderError::decode(
            meta.id,
            format!("expected {TENSOR_TYPE}, got {}", meta.type_name),
        ));
    }
    let data_type: DataType = meta
        .get("value_type")
        .map_err(|e| BuilderError::decode(meta.id, e))?;
    let shape: Vec<usize> = meta.get("shape").map_err(|e| BuilderError::decode(meta.id, e))?;
    match shape.as_slice() {
        [len] => Ok((data_type, *len)),
        other => Err(BuilderError::decode(
            meta.id,
            format!("expected a 1-d shape, got {other:?}"),
        )),
    }
}
