use shardkit_store::{ObjectMeta, StoreClient};
use shardkit_types::{InstanceId, ObjectId, PartitionShape};
use tracing::{debug, info};

use crate::config::BuilderConfig;
use crate::error::{BuilderError, Result};
use crate::lifecycle::{BuildState, Lifecycle, ObjectBuilder};
use crate::object::{committed, GlobalObject, GLOBAL_DATAFRAME_TYPE};
use crate::partition_set::PartitionSet;

/// Assembles partitions held by many instances into one global object.
///
/// Each client typically adds only the partitions it produced. `build`
/// commits a descriptor to the local instance; `seal` publishes it, and with
/// [`with_name`](Self::with_name) binds a shared name to it.
///
/// There is no locking across clients. If several clients seal descriptors
/// under the same name, the directory keeps whichever binding lands last.
/// Callers that need one definitive descriptor must agree on a single
/// sealer out of band.
#[derive(Debug)]
pub struct GlobalObjectBuilder {
    shape: Option<PartitionShape>,
    partitions: PartitionSet,
    name: Option<String>,
    lifecycle: Lifecycle,
    config: BuilderConfig,
    committed: Option<ObjectMeta>,
}

impl GlobalObjectBuilder {
    pub fn new() -> Self {
        Self::with_config(BuilderConfig::default())
    }

    pub fn with_config(config: BuilderConfig) -> Self {
        Self {
            shape: None,
            partitions: PartitionSet::new(),
            name: None,
            lifecycle: Lifecycle::new(),
            config,
            committed: None,
        }
    }

    /// Bind `name` to the descriptor when it is sealed.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn partition_shape(&self) -> Option<PartitionShape> {
        self.shape
    }

    pub fn set_partition_shape(&mut self, rows: u64, columns: u64) -> Result<()> {
        self.lifecycle.ensure_mutable()?;
        self.shape = Some(PartitionShape::new(rows, columns));
        Ok(())
    }

    /// Append one partition. The count is not checked against the shape.
    pub fn add_partition(&mut self, instance: InstanceId, partition: ObjectId) -> Result<()> {
        self.lifecycle.ensure_mutable()?;
        self.partitions.add(instance, partition);
        Ok(())
    }

    /// Append several partitions of one instance, keeping their order.
    pub fn add_partitions(
        &mut self,
        instance: InstanceId,
        partitions: impl IntoIterator<Item = ObjectId>,
    ) -> Result<()> {
        self.lifecycle.ensure_mutable()?;
        self.partitions.extend(instance, partitions);
        Ok(())
    }

    pub fn partitions(&self) -> &PartitionSet {
        &self.partitions
    }

    pub fn state(&self) -> BuildState {
        self.lifecycle.state()
    }

    /// Commit the descriptor to the local instance without publishing it.
    pub fn build(&mut self, client: &dyn StoreClient) -> Result<ObjectId> {
        self.lifecycle.ensure_mutable()?;
        let shape = self.shape.ok_or(BuilderError::MissingShape)?;
        if self.config.enforce_partition_count {
            let expected = shape.cell_count().unwrap_or(u64::MAX);
            if expected != self.partitions.len() as u64 {
                return Err(BuilderError::PartitionCountMismatch {
                    shape,
                    expected,
                    actual: self.partitions.len(),
                });
            }
        }

        let meta = self.descriptor(shape).map_err(BuilderError::build)?;
        let id = client
            .create_object(meta.clone())
            .map_err(BuilderError::build)?;
        self.lifecycle.mark_built(id);
        self.committed = Some(committed(meta, id, client.instance_id()));
        debug!(
            id = %id.short_hex(),
            shape = %shape,
            partitions = self.partitions.len(),
            "global descriptor built"
        );
        Ok(id)
    }

    /// Publish the descriptor, then bind the name if one was given.
    ///
    /// On failure the builder stays built and `seal` may be called again;
    /// nothing is retried internally. The returned view is decoded from the
    /// descriptor this builder committed; the store is not read back.
    pub fn seal(&mut self, client: &dyn StoreClient) -> Result<GlobalObject> {
        let id = self.lifecycle.seal_target()?;
        client.publish(&id).map_err(|e| BuilderError::seal(id, e))?;
        if let Some(name) = &self.name {
            client
                .put_name(name, &id)
                .map_err(|e| BuilderError::seal(id, e))?;
        }
        self.lifecycle.mark_sealed();
        info!(
            id = %id.short_hex(),
            name = self.name.as_deref().unwrap_or(""),
            partitions = self.partitions.len(),
            "global object sealed"
        );

        let mut meta = self.committed.clone().ok_or(BuilderError::NotBuilt)?;
        meta.published = true;
        GlobalObject::from_meta(&meta)
    }

    fn descriptor(&self, shape: PartitionShape) -> shardkit_store::StoreResult<ObjectMeta> {
        let mut meta = ObjectMeta::new(GLOBAL_DATAFRAME_TYPE);
        meta.set("partition_shape_row", &shape.rows)?;
        meta.set("partition_shape_column", &shape.columns)?;
        meta.set("partitions", &self.partitions.entries())?;
        meta.set("partition_count", &self.partitions.len())?;
        Ok(meta)
    }
}

impl Default for GlobalObjectBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectBuilder for GlobalObjectBuilder {
    type Output = GlobalObject;

    fn build(&mut self, client: &dyn StoreClient) -> Result<ObjectId> {
        GlobalObjectBuilder::build(self, client)
    }

    fn seal(&mut self, client: &dyn StoreClient) -> Result<GlobalObject> {
        GlobalObjectBuilder::seal(self, client)
    }

    fn state(&self) -> BuildState {
        self.lifecycle.state()
    }
}
