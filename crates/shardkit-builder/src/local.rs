use shardkit_store::{ObjectMeta, StoreClient};
use shardkit_types::{ObjectId, PartitionIndex};
use tracing::{debug, info};

use crate::column::ColumnBuilder;
use crate::config::BuilderConfig;
use crate::error::{BuilderError, Result};
use crate::lifecycle::{discard, BuildState, Lifecycle, ObjectBuilder};
use crate::object::{committed, set_partition_index, LocalPartition, DATAFRAME_TYPE};
use crate::registry::ColumnRegistry;

/// Accumulates named columns for one partition and commits them as a
/// [`LocalPartition`].
///
/// ```no_run
/// # use shardkit_builder::{LocalPartitionBuilder, TensorBuilder};
/// # fn demo(client: &dyn shardkit_store::StoreClient) -> shardkit_builder::Result<()> {
/// let mut builder = LocalPartitionBuilder::new();
/// builder.set_partition_index(0, 0)?;
/// builder.add_column("x", TensorBuilder::new(vec![1i64, 2, 3]))?;
/// let id = builder.build(client)?;
/// # Ok(()) }
/// ```
#[derive(Debug)]
pub struct LocalPartitionBuilder {
    index: PartitionIndex,
    columns: ColumnRegistry<Box<dyn ColumnBuilder>>,
    lifecycle: Lifecycle,
    config: BuilderConfig,
    committed: Option<ObjectMeta>,
}

impl LocalPartitionBuilder {
    pub fn new() -> Self {
        Self::with_config(BuilderConfig::default())
    }

    pub fn with_config(config: BuilderConfig) -> Self {
        Self {
            index: PartitionIndex::default(),
            columns: ColumnRegistry::new(),
            lifecycle: Lifecycle::new(),
            config,
            committed: None,
        }
    }

    pub fn partition_index(&self) -> PartitionIndex {
        self.index
    }

    pub fn set_partition_index(&mut self, row: u64, column: u64) -> Result<()> {
        self.lifecycle.ensure_mutable()?;
        self.index = PartitionIndex::new(row, column);
        Ok(())
    }

    /// Register a column, replacing any column already named `name`.
    pub fn add_column(
        &mut self,
        name: impl Into<String>,
        builder: impl ColumnBuilder + 'static,
    ) -> Result<()> {
        self.lifecycle.ensure_mutable()?;
        self.columns.add(name, Box::new(builder));
        Ok(())
    }

    pub fn column(&self, name: &str) -> Result<&dyn ColumnBuilder> {
        self.columns.get(name).map(|b| b.as_ref())
    }

    pub fn column_mut(&mut self, name: &str) -> Result<&mut (dyn ColumnBuilder + 'static)> {
        self.lifecycle.ensure_mutable()?;
        self.columns.get_mut(name).map(|b| b.as_mut())
    }

    /// Remove a column. Dropping a name that is not registered fails with
    /// `NotFound`.
    pub fn drop_column(&mut self, name: &str) -> Result<()> {
        self.lifecycle.ensure_mutable()?;
        self.columns.remove(name).map(drop)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.names()
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn state(&self) -> BuildState {
        self.lifecycle.state()
    }

    /// Build every column in registration order and commit the partition.
    ///
    /// Either the partition object is created or nothing is: objects the
    /// column builders created before a failure are discarded again (unless
    /// the config turns rollback off) and the builder stays unbuilt.
    pub fn build(&mut self, client: &dyn StoreClient) -> Result<ObjectId> {
        self.lifecycle.ensure_mutable()?;
        let row_count = self.row_count()?;

        let mut built: Vec<(&str, ObjectId)> = Vec::with_capacity(self.columns.len());
        let mut created: Vec<ObjectId> = Vec::new();
        for (name, column) in self.columns.iter() {
            match column.build(client) {
                Ok(column) => {
                    built.push((name, column.id));
                    created.extend(column.created);
                }
                Err(e) => {
                    self.rollback(client, &created);
                    return Err(BuilderError::build(e));
                }
            }
        }

        let commit = self
            .partition_meta(&built, row_count)
            .and_then(|meta| {
                let id = client.create_object(meta.clone())?;
                Ok(committed(meta, id, client.instance_id()))
            })
            .map_err(BuilderError::build);
        let meta = match commit {
            Ok(meta) => meta,
            Err(e) => {
                self.rollback(client, &created);
                return Err(e);
            }
        };

        let id = meta.id;
        let column_count = built.len();
        self.lifecycle.mark_built(id);
        self.committed = Some(meta);
        debug!(
            id = %id.short_hex(),
            index = %self.index,
            columns = column_count,
            rows = row_count,
            "partition built"
        );
        Ok(id)
    }

    /// Publish the built partition and its columns so other instances can
    /// resolve it.
    ///
    /// The returned view is decoded from the metadata this builder
    /// committed; the store is not read back.
    pub fn seal(&mut self, client: &dyn StoreClient) -> Result<LocalPartition> {
        let id = self.lifecycle.seal_target()?;
        client.publish(&id).map_err(|e| BuilderError::seal(id, e))?;
        self.lifecycle.mark_sealed();
        info!(id = %id.short_hex(), index = %self.index, "partition sealed");

        let mut meta = self.committed.clone().ok_or(BuilderError::NotBuilt)?;
        meta.published = true;
        LocalPartition::from_meta(&meta)
    }

    /// Common column length; columns that disagree are refused up front.
    fn row_count(&self) -> Result<usize> {
        let mut columns = self.columns.iter();
        let Some((_, first)) = columns.next() else {
            return Ok(0);
        };
        let expected = first.len();
        for (name, column) in columns {
            if column.len() != expected {
                return Err(BuilderError::LengthMismatch {
                    column: name.to_string(),
                    expected,
                    actual: column.len(),
                });
            }
        }
        Ok(expected)
    }

    fn partition_meta(
        &self,
        columns: &[(&str, ObjectId)],
        row_count: usize,
    ) -> shardkit_store::StoreResult<ObjectMeta> {
        let mut meta = ObjectMeta::new(DATAFRAME_TYPE);
        set_partition_index(&mut meta, self.index)?;
        let names: Vec<&str> = columns.iter().map(|(name, _)| *name).collect();
        meta.set("columns", &names)?;
        meta.set("row_count", &row_count)?;
        meta.set("column_count", &columns.len())?;
        for (name, id) in columns {
            meta.add_member(*name, *id)?;
        }
        Ok(meta)
    }

    fn rollback(&self, client: &dyn StoreClient, created: &[ObjectId]) {
        if self.config.rollback_on_failure && !created.is_empty() {
            debug!(count = created.len(), "discarding columns of failed partition build");
            discard(client, created);
        }
    }
}

impl Default for LocalPartitionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectBuilder for LocalPartitionBuilder {
    type Output = LocalPartition;

    fn build(&mut self, client: &dyn StoreClient) -> Result<ObjectId> {
        LocalPartitionBuilder::build(self, client)
    }

    fn seal(&mut self, client: &dyn StoreClient) -> Result<LocalPartition> {
        LocalPartitionBuilder::seal(self, client)
    }

    fn state(&self) -> BuildState {
        self.lifecycle.state()
    }
}
