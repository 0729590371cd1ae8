use shardkit_store::{ObjectMeta, StoreClient};
use shardkit_types::{DataType, InstanceId, ObjectId, PartitionIndex};
use tracing::{debug, info};

use crate::error::{BuilderError, Result};
use crate::lifecycle::{BuildState, Lifecycle, ObjectBuilder};
use crate::object::{set_partition_index, stream_layout, SchemaField, DATAFRAME_STREAM_TYPE};
use crate::registry::ColumnRegistry;

/// Declares the schema of a stream and registers it with the store.
///
/// The built object carries only the schema; sealing turns it into an
/// append channel instead of freezing a value.
#[derive(Debug, Default)]
pub struct StreamBuilder {
    index: PartitionIndex,
    schema: ColumnRegistry<DataType>,
    lifecycle: Lifecycle,
}

impl StreamBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn partition_index(&self) -> PartitionIndex {
        self.index
    }

    pub fn set_partition_index(&mut self, row: u64, column: u64) -> Result<()> {
        self.lifecycle.ensure_mutable()?;
        self.index = PartitionIndex::new(row, column);
        Ok(())
    }

    /// Declare a column, replacing the type of an existing one.
    pub fn add_column(&mut self, name: impl Into<String>, value_type: DataType) -> Result<()> {
        self.lifecycle.ensure_mutable()?;
        self.schema.add(name, value_type);
        Ok(())
    }

    pub fn column(&self, name: &str) -> Result<DataType> {
        self.schema.get(name).copied()
    }

    pub fn drop_column(&mut self, name: &str) -> Result<()> {
        self.lifecycle.ensure_mutable()?;
        self.schema.remove(name).map(drop)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.schema.names()
    }

    pub fn num_columns(&self) -> usize {
        self.schema.len()
    }

    pub fn state(&self) -> BuildState {
        self.lifecycle.state()
    }

    /// Commit the stream object without registering its channel.
    pub fn build(&mut self, client: &dyn StoreClient) -> Result<ObjectId> {
        self.lifecycle.ensure_mutable()?;
        let meta = self.stream_meta().map_err(BuilderError::build)?;
        let id = client.create_object(meta).map_err(BuilderError::build)?;
        self.lifecycle.mark_built(id);
        debug!(
            id = %id.short_hex(),
            index = %self.index,
            columns = self.schema.len(),
            "stream built"
        );
        Ok(id)
    }

    /// Build if needed, then register the channel.
    ///
    /// Any failure of the registration call, transport errors included, is a
    /// `RegistrationFailure` carrying the store error. It leaves the builder
    /// built; calling `seal` again retries only the registration.
    pub fn seal(&mut self, client: &dyn StoreClient) -> Result<StreamHandle> {
        let id = match self.lifecycle.state() {
            BuildState::Unbuilt => self.build(client)?,
            BuildState::Built(id) => id,
            BuildState::Sealed(id) => return Err(BuilderError::AlreadySealed(id)),
        };
        client
            .create_stream(&id)
            .map_err(|source| BuilderError::RegistrationFailure { id, source })?;
        self.lifecycle.mark_sealed();
        info!(id = %id.short_hex(), index = %self.index, "stream registered");
        Ok(StreamHandle {
            id,
            instance_id: client.instance_id(),
            index: self.index,
            schema: self.schema_fields(),
        })
    }

    fn schema_fields(&self) -> Vec<SchemaField> {
        self.schema
            .iter()
            .map(|(name, value_type)| SchemaField {
                name: name.to_string(),
                value_type: *value_type,
            })
            .collect()
    }

    fn stream_meta(&self) -> shardkit_store::StoreResult<ObjectMeta> {
        let mut meta = ObjectMeta::new(DATAFRAME_STREAM_TYPE);
        meta.set("schema", &self.schema_fields())?;
        set_partition_index(&mut meta, self.index)?;
        Ok(meta)
    }
}

impl ObjectBuilder for StreamBuilder {
    type Output = StreamHandle;

    fn build(&mut self, client: &dyn StoreClient) -> Result<ObjectId> {
        StreamBuilder::build(self, client)
    }

    fn seal(&mut self, client: &dyn StoreClient) -> Result<StreamHandle> {
        StreamBuilder::seal(self, client)
    }

    fn state(&self) -> BuildState {
        self.lifecycle.state()
    }
}

/// A registered stream. Chunks are object ids appended by writers and
/// drained by readers through the store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StreamHandle {
    pub id: ObjectId,
    pub instance_id: InstanceId,
    pub index: PartitionIndex,
    pub schema: Vec<SchemaField>,
}

impl StreamHandle {
    /// Rebuild a handle from a stream object id.
    pub fn resolve(client: &dyn StoreClient, id: ObjectId) -> Result<Self> {
        let meta = client.get_meta(&id)?;
        let (schema, index) = stream_layout(&meta)?;
        Ok(Self {
            id,
            instance_id: meta.instance_id,
            index,
            schema,
        })
    }

    pub fn push(&self, client: &dyn StoreClient, chunk: ObjectId) -> Result<()> {
        client.push_chunk(&self.id, &chunk)?;
        Ok(())
    }

    /// Oldest pending chunk, or `None` if the stream is open but empty.
    pub fn pull(&self, client: &dyn StoreClient) -> Result<Option<ObjectId>> {
        Ok(client.pull_chunk(&self.id)?)
    }

    pub fn stop(&self, client: &dyn StoreClient) -> Result<()> {
        client.stop_stream(&self.id)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use shardkit_store::{FailPoint, InMemoryClient, InMemoryDeployment, StoreError};

    fn client() -> InMemoryClient {
        InMemoryDeployment::with_instances(1)
            .connect(InstanceId::new(0))
            .unwrap()
    }

    // -----------------------------------------------------------------------
    // Schema
    // -----------------------------------------------------------------------

    #[test]
    fn schema_columns_keep_order() {
        let mut builder = StreamBuilder::new();
        builder.add_column("ts", DataType::Int64).unwrap();
        builder.add_column("value", DataType::Float64).unwrap();
        builder.add_column("ts", DataType::Utf8).unwrap();
        assert_eq!(builder.column("ts").unwrap(), DataType::Utf8);
        assert_eq!(builder.column_names().collect::<Vec<_>>(), vec!["ts", "value"]);
    }

    #[test]
    fn drop_unknown_column_is_not_found() {
        let mut builder = StreamBuilder::new();
        assert!(matches!(
            builder.drop_column("ghost"),
            Err(BuilderError::NotFound { .. })
        ));
        builder.add_column("a", DataType::Bool).unwrap();
        builder.drop_column("a").unwrap();
        assert!(builder.column("a").is_err());
    }

    // -----------------------------------------------------------------------
    // Seal
    // -----------------------------------------------------------------------

    #[test]
    fn seal_builds_and_registers_once() {
        let client = client();
        let mut builder = StreamBuilder::new();
        builder.add_column("x", DataType::Int64).unwrap();
        builder.set_partition_index(2, 1).unwrap();
        let handle = builder.seal(&client).unwrap();

        assert_eq!(builder.state(), BuildState::Sealed(handle.id));
        assert_eq!(handle.index, PartitionIndex::new(2, 1));
        assert!(matches!(
            client.create_stream(&handle.id),
            Err(StoreError::StreamExists(_))
        ));
        assert!(matches!(builder.seal(&client), Err(BuilderError::AlreadySealed(_))));
    }

    #[test]
    fn explicit_build_then_seal() {
        let client = client();
        let mut builder = StreamBuilder::new();
        let id = builder.build(&client).unwrap();
        assert!(matches!(builder.add_column("x", DataType::Int64), Err(BuilderError::AlreadyBuilt(_))));
        let handle = builder.seal(&client).unwrap();
        assert_eq!(handle.id, id);
    }

    #[test]
    fn registration_failure_keeps_the_built_object() {
        let client = client();
        client
            .deployment()
            .inject_failure(InstanceId::new(0), FailPoint::CreateStream)
            .unwrap();
        let mut builder = StreamBuilder::new();
        let err = builder.seal(&client).unwrap_err();
        let BuilderError::RegistrationFailure { id, .. } = err else {
            panic!("expected RegistrationFailure, got {err:?}");
        };
        assert_eq!(builder.state(), BuildState::Built(id));
        assert!(matches!(builder.build(&client), Err(BuilderError::AlreadyBuilt(_))));

        let handle = builder.seal(&client).unwrap();
        assert_eq!(handle.id, id);
        assert_eq!(client.deployment().local_count(InstanceId::new(0)).unwrap(), 1);
    }

    #[test]
    fn unreachable_store_at_registration_is_a_registration_failure() {
        let client = client();
        let mut builder = StreamBuilder::new();
        let id = builder.build(&client).unwrap();
        client
            .deployment()
            .set_available(InstanceId::new(0), false)
            .unwrap();

        let err = builder.seal(&client).unwrap_err();
        assert!(matches!(
            err,
            BuilderError::RegistrationFailure { id: failed, source: StoreError::Unavailable(_) } if failed == id
        ));
        assert_eq!(builder.state(), BuildState::Built(id));

        client
            .deployment()
            .set_available(InstanceId::new(0), true)
            .unwrap();
        assert_eq!(builder.seal(&client).unwrap().id, id);
    }

    #[test]
    fn failed_build_leaves_stream_unbuilt() {
        let client = client();
        client
            .deployment()
            .set_available(InstanceId::new(0), false)
            .unwrap();
        let mut builder = StreamBuilder::new();
        assert!(matches!(
            builder.seal(&client),
            Err(BuilderError::StoreUnavailable(_))
        ));
        assert_eq!(builder.state(), BuildState::Unbuilt);
    }

    // -----------------------------------------------------------------------
    // Handle
    // -----------------------------------------------------------------------

    #[test]
    fn handle_resolves_and_moves_chunks() {
        let client = client();
        let mut builder = StreamBuilder::new();
        builder.add_column("x", DataType::Float64).unwrap();
        let handle = builder.seal(&client).unwrap();

        let resolved = StreamHandle::resolve(&client, handle.id).unwrap();
        assert_eq!(resolved, handle);

        let chunk = client.create_object(ObjectMeta::new("test::Chunk")).unwrap();
        assert_eq!(handle.pull(&client).unwrap(), None);
        handle.push(&client, chunk).unwrap();
        handle.stop(&client).unwrap();
        assert_eq!(resolved.pull(&client).unwrap(), Some(chunk));
        assert!(matches!(
            handle.pull(&client),
            Err(BuilderError::Store(StoreError::StreamStopped(_)))
        ));
    }

    proptest! {
        #[test]
        fn partition_index_roundtrips(row in any::<u64>(), column in any::<u64>()) {
            let mut builder = StreamBuilder::new();
            builder.set_partition_index(row, column).unwrap();
            prop_assert_eq!(builder.partition_index(), PartitionIndex::new(row, column));
        }
    }
}
