//! Read-side views of built objects and the metadata layout they share.

use serde::{Deserialize, Serialize};
use shardkit_store::{ObjectMeta, StoreClient};
use shardkit_types::{DataType, InstanceId, ObjectId, PartitionIndex, PartitionShape};

use crate::column::Tensor;
use crate::error::{BuilderError, Result};
use crate::partition_set::{PartitionEntry, PartitionSet};

/// Type name of local partition objects.
pub const DATAFRAME_TYPE: &str = "shardkit::DataFrame";
/// Type name of global object descriptors.
pub const GLOBAL_DATAFRAME_TYPE: &str = "shardkit::GlobalDataFrame";
/// Type name of stream objects.
pub const DATAFRAME_STREAM_TYPE: &str = "shardkit::DataFrameStream";

// ---------------------------------------------------------------------------
// Attribute layout shared by the builders
// ---------------------------------------------------------------------------

/// One entry of a stream schema.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaField {
    pub name: String,
    pub value_type: DataType,
}

pub(crate) fn set_partition_index(meta: &mut ObjectMeta, index: PartitionIndex) -> shardkit_store::StoreResult<()> {
    meta.set("partition_index_row", &index.row)?;
    meta.set("partition_index_column", &index.column)
}

/// `meta` as the store recorded it after committing it under `id`.
pub(crate) fn committed(mut meta: ObjectMeta, id: ObjectId, instance: InstanceId) -> ObjectMeta {
    meta.id = id;
    meta.instance_id = instance;
    meta.published = false;
    meta
}

fn partition_index(meta: &ObjectMeta) -> Result<PartitionIndex> {
    let row = meta.get("partition_index_row").map_err(|e| BuilderError::decode(meta.id, e))?;
    let column = meta
        .get("partition_index_column")
        .map_err(|e| BuilderError::decode(meta.id, e))?;
    Ok(PartitionIndex::new(row, column))
}

fn expect_type(meta: &ObjectMeta, type_name: &str) -> Result<()> {
    if meta.has_type(type_name) {
        Ok(())
    } else {
        Err(BuilderError::decode(
            meta.id,
            format!("expected {type_name}, got {}", meta.type_name),
        ))
    }
}

fn attribute<T: serde::de::DeserializeOwned>(meta: &ObjectMeta, key: &str) -> Result<T> {
    meta.get(key).map_err(|e| BuilderError::decode(meta.id, e))
}

// ---------------------------------------------------------------------------
// LocalPartition
// ---------------------------------------------------------------------------

/// An immutable partition: ordered named columns at one grid coordinate.
#[derive(Clone, Debug, PartialEq)]
pub struct LocalPartition {
    pub id: ObjectId,
    /// Instance holding the column payloads.
    pub instance_id: InstanceId,
    pub index: PartitionIndex,
    pub row_count: u64,
    pub published: bool,
    columns: Vec<(String, ObjectId)>,
}

impl LocalPartition {
    pub fn resolve(client: &dyn StoreClient, id: ObjectId) -> Result<Self> {
        Self::from_meta(&client.get_meta(&id)?)
    }

    pub fn from_meta(meta: &ObjectMeta) -> Result<Self> {
        expect_type(meta, DATAFRAME_TYPE)?;
        let names: Vec<String> = attribute(meta, "columns")?;
        let columns = names
            .into_iter()
            .map(|name| {
                let id = meta.member(&name).map_err(|e| BuilderError::decode(meta.id, e))?;
                Ok((name, id))
            })
            .collect::<Result<Vec<_>>>()?;
        let column_count: usize = attribute(meta, "column_count")?;
        if column_count != columns.len() {
            return Err(BuilderError::decode(
                meta.id,
                format!("column_count {column_count} but {} columns listed", columns.len()),
            ));
        }
        Ok(Self {
            id: meta.id,
            instance_id: meta.instance_id,
            index: partition_index(meta)?,
            row_count: attribute(meta, "row_count")?,
            published: meta.published,
            columns,
        })
    }

    /// Column names in build order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn column_id(&self, name: &str) -> Result<ObjectId> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, id)| *id)
            .ok_or_else(|| BuilderError::NotFound {
                name: name.to_string(),
            })
    }

    /// Load one column's values. Requires a client on the owning instance.
    pub fn column(&self, client: &dyn StoreClient, name: &str) -> Result<Tensor> {
        Tensor::resolve(client, self.column_id(name)?)
    }
}

// ---------------------------------------------------------------------------
// GlobalObject
// ---------------------------------------------------------------------------

/// A global object descriptor: a partition grid shape plus the partitions
/// contributed by each instance.
///
/// The descriptor does not promise that the partitions fill the grid;
/// [`is_complete`](Self::is_complete) lets readers check.
#[derive(Clone, Debug, PartialEq)]
pub struct GlobalObject {
    pub id: ObjectId,
    pub shape: PartitionShape,
    pub published: bool,
    partitions: PartitionSet,
}

impl GlobalObject {
    pub fn resolve(client: &dyn StoreClient, id: ObjectId) -> Result<Self> {
        Self::from_meta(&client.get_meta(&id)?)
    }

    /// Resolve whatever object is currently bound to `name`.
    pub fn resolve_name(client: &dyn StoreClient, name: &str) -> Result<Self> {
        let id = client.get_name(name)?;
        Self::resolve(client, id)
    }

    pub fn from_meta(meta: &ObjectMeta) -> Result<Self> {
        expect_type(meta, GLOBAL_DATAFRAME_TYPE)?;
        let shape = PartitionShape::new(
            attribute(meta, "partition_shape_row")?,
            attribute(meta, "partition_shape_column")?,
        );
        let entries: Vec<PartitionEntry> = attribute(meta, "partitions")?;
        Ok(Self {
            id: meta.id,
            shape,
            published: meta.published,
            partitions: entries.into_iter().collect(),
        })
    }

    pub fn partitions(&self) -> &PartitionSet {
        &self.partitions
    }

    /// `true` when there is exactly one partition per grid cell.
    pub fn is_complete(&self) -> bool {
        self.shape.cell_count() == Some(self.partitions.len() as u64)
    }

    /// Resolve the partitions contributed by the client's own instance.
    pub fn local_partitions(&self, client: &dyn StoreClient) -> Result<Vec<LocalPartition>> {
        let ids = self.partitions.entries_for(client.instance_id());
        client
            .get_metas(ids)?
            .iter()
            .map(LocalPartition::from_meta)
            .collect()
    }
}

/// Schema and coordinate of a stream, decoded from its metadata.
pub(crate) fn stream_layout(meta: &ObjectMeta) -> Result<(Vec<SchemaField>, PartitionIndex)> {
    expect_type(meta, DATAFRAME_STREAM_TYPE)?;
    Ok((attribute(meta, "schema")?, partition_index(meta)?))
}
