use shardkit_types::{InstanceId, ObjectId};

use crate::error::StoreResult;
use crate::meta::ObjectMeta;

/// Session with one store instance.
///
/// All calls block until the instance answers. Implementations must be
/// thread-safe, but nothing here serializes callers: two sessions publishing
/// or naming the same object race, and the directory keeps the last write.
/// Errors are returned as-is and never retried.
pub trait StoreClient: Send + Sync {
    /// The instance this session is connected to.
    fn instance_id(&self) -> InstanceId;

    /// Store a raw payload in the local instance and return its id.
    fn create_blob(&self, data: Vec<u8>) -> StoreResult<ObjectId>;

    /// Read a payload. Only blobs held by the local instance are readable.
    fn get_blob(&self, id: &ObjectId) -> StoreResult<Vec<u8>>;

    /// Create an object from its metadata and return the assigned id.
    ///
    /// The object is local until [`publish`](Self::publish) is called.
    fn create_object(&self, meta: ObjectMeta) -> StoreResult<ObjectId>;

    /// Resolve metadata for a local or published object.
    fn get_meta(&self, id: &ObjectId) -> StoreResult<ObjectMeta>;

    /// Delete a local object or blob. Returns `true` if it existed.
    fn delete_object(&self, id: &ObjectId) -> StoreResult<bool>;

    /// Publish a local object's metadata, and that of its local members,
    /// to the deployment-wide directory.
    fn publish(&self, id: &ObjectId) -> StoreResult<()>;

    /// Whether the object's metadata is visible deployment-wide.
    fn is_published(&self, id: &ObjectId) -> StoreResult<bool>;

    /// Bind `name` to `id` in the directory, replacing any previous binding.
    fn put_name(&self, name: &str, id: &ObjectId) -> StoreResult<()>;

    /// Resolve a name bound with [`put_name`](Self::put_name).
    fn get_name(&self, name: &str) -> StoreResult<ObjectId>;

    /// Register an append channel for an existing local object.
    ///
    /// Fails with `StreamExists` if the object already has one.
    fn create_stream(&self, id: &ObjectId) -> StoreResult<()>;

    /// Append a chunk (an object id) to a stream.
    fn push_chunk(&self, stream: &ObjectId, chunk: &ObjectId) -> StoreResult<()>;

    /// Take the oldest chunk from a stream.
    ///
    /// Returns `Ok(None)` when the stream is empty but still open, and
    /// `StreamStopped` once it is stopped and drained.
    fn pull_chunk(&self, stream: &ObjectId) -> StoreResult<Option<ObjectId>>;

    /// Stop a stream: no more pushes, pulls drain what is left.
    fn stop_stream(&self, stream: &ObjectId) -> StoreResult<()>;

    /// Check whether an object resolves from this session.
    fn exists(&self, id: &ObjectId) -> StoreResult<bool> {
        match self.get_meta(id) {
            Ok(_) => Ok(true),
            Err(crate::error::StoreError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Resolve several objects.
    ///
    /// Default implementation calls `get_meta()` for each ID.
    fn get_metas(&self, ids: &[ObjectId]) -> StoreResult<Vec<ObjectMeta>> {
        ids.iter().map(|id| self.get_meta(id)).collect()
    }
}
