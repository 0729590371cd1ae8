use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use shardkit_types::{InstanceId, ObjectId};
use tracing::debug;

use crate::config::DeploymentConfig;
use crate::error::{StoreError, StoreResult};
use crate::hasher::IdHasher;
use crate::meta::ObjectMeta;
use crate::traits::StoreClient;

/// Operations that can be made to fail once, for exercising error paths.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FailPoint {
    CreateBlob,
    CreateObject,
    Publish,
    PutName,
    CreateStream,
}

impl FailPoint {
    fn op(&self) -> &'static str {
        match self {
            Self::CreateBlob => "create_blob",
            Self::CreateObject => "create_object",
            Self::Publish => "publish",
            Self::PutName => "put_name",
            Self::CreateStream => "create_stream",
        }
    }
}

enum LocalEntry {
    Object(ObjectMeta),
    Blob(Vec<u8>),
}

struct Instance {
    entries: HashMap<ObjectId, LocalEntry>,
    available: bool,
    failures: HashSet<FailPoint>,
}

impl Instance {
    fn new() -> Self {
        Self {
            entries: HashMap::new(),
            available: true,
            failures: HashSet::new(),
        }
    }
}

struct StreamChannel {
    chunks: VecDeque<ObjectId>,
    stopped: bool,
}

fn read<T>(lock: &RwLock<T>) -> StoreResult<RwLockReadGuard<'_, T>> {
    lock.read().map_err(|e| StoreError::Poisoned(e.to_string()))
}

fn write<T>(lock: &RwLock<T>) -> StoreResult<RwLockWriteGuard<'_, T>> {
    lock.write().map_err(|e| StoreError::Poisoned(e.to_string()))
}

/// Several in-memory store instances sharing one metadata directory.
///
/// Each instance keeps its own table of local objects and blobs. Published
/// metadata and name bindings live in the shared directory. Intended for
/// tests and embedding; everything is lost on drop.
pub struct InMemoryDeployment {
    config: DeploymentConfig,
    next_seq: AtomicU64,
    instances: RwLock<HashMap<InstanceId, Instance>>,
    directory: RwLock<HashMap<ObjectId, ObjectMeta>>,
    names: RwLock<HashMap<String, ObjectId>>,
    streams: RwLock<HashMap<ObjectId, StreamChannel>>,
}

impl InMemoryDeployment {
    /// Create a deployment with the given instances.
    pub fn new(
        config: DeploymentConfig,
        instances: impl IntoIterator<Item = InstanceId>,
    ) -> Arc<Self> {
        let instances = instances
            .into_iter()
            .map(|id| (id, Instance::new()))
            .collect();
        Arc::new(Self {
            config,
            next_seq: AtomicU64::new(0),
            instances: RwLock::new(instances),
            directory: RwLock::new(HashMap::new()),
            names: RwLock::new(HashMap::new()),
            streams: RwLock::new(HashMap::new()),
        })
    }

    /// A deployment of `count` instances numbered from zero, default config.
    pub fn with_instances(count: u64) -> Arc<Self> {
        Self::new(DeploymentConfig::default(), (0..count).map(InstanceId::new))
    }

    /// Open a session with one instance.
    pub fn connect(self: &Arc<Self>, instance: InstanceId) -> StoreResult<InMemoryClient> {
        if !read(&self.instances)?.contains_key(&instance) {
            return Err(StoreError::UnknownInstance(instance));
        }
        debug!(instance = %instance, "client connected");
        Ok(InMemoryClient {
            deployment: Arc::clone(self),
            instance,
        })
    }

    /// Take an instance down or bring it back. While down, every call from
    /// its sessions fails with `Unavailable`.
    pub fn set_available(&self, instance: InstanceId, available: bool) -> StoreResult<()> {
        let mut instances = write(&self.instances)?;
        let entry = instances
            .get_mut(&instance)
            .ok_or(StoreError::UnknownInstance(instance))?;
        entry.available = available;
        Ok(())
    }

    /// Make the next call of `point` on `instance` fail with `Rejected`.
    pub fn inject_failure(&self, instance: InstanceId, point: FailPoint) -> StoreResult<()> {
        let mut instances = write(&self.instances)?;
        let entry = instances
            .get_mut(&instance)
            .ok_or(StoreError::UnknownInstance(instance))?;
        entry.failures.insert(point);
        Ok(())
    }

    /// Sorted ids of all instances.
    pub fn instance_ids(&self) -> StoreResult<Vec<InstanceId>> {
        let mut ids: Vec<InstanceId> = read(&self.instances)?.keys().copied().collect();
        ids.sort();
        Ok(ids)
    }

    /// Number of objects and blobs held locally by an instance.
    pub fn local_count(&self, instance: InstanceId) -> StoreResult<usize> {
        read(&self.instances)?
            .get(&instance)
            .map(|i| i.entries.len())
            .ok_or(StoreError::UnknownInstance(instance))
    }

    /// Number of objects in the shared directory.
    pub fn published_count(&self) -> StoreResult<usize> {
        Ok(read(&self.directory)?.len())
    }

    pub fn config(&self) -> &DeploymentConfig {
        &self.config
    }

    // -----------------------------------------------------------------------
    // Per-instance operations, called through InMemoryClient
    // -----------------------------------------------------------------------

    fn check(&self, instance: InstanceId, point: Option<FailPoint>) -> StoreResult<()> {
        let mut instances = write(&self.instances)?;
        let entry = instances
            .get_mut(&instance)
            .ok_or(StoreError::UnknownInstance(instance))?;
        if !entry.available {
            return Err(StoreError::Unavailable(format!("instance {instance} is down")));
        }
        if let Some(point) = point {
            if entry.failures.remove(&point) {
                return Err(StoreError::Rejected {
                    op: point.op(),
                    reason: "injected failure".into(),
                });
            }
        }
        Ok(())
    }

    fn next_id(&self, hasher: &IdHasher, instance: InstanceId, type_name: &str) -> ObjectId {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        hasher.allocate(instance, seq, type_name)
    }

    fn local_meta(&self, instance: InstanceId, id: &ObjectId) -> StoreResult<Option<ObjectMeta>> {
        let instances = read(&self.instances)?;
        let entry = instances
            .get(&instance)
            .ok_or(StoreError::UnknownInstance(instance))?;
        Ok(match entry.entries.get(id) {
            Some(LocalEntry::Object(meta)) => Some(meta.clone()),
            _ => None,
        })
    }

    fn resolves(&self, instance: InstanceId, id: &ObjectId) -> StoreResult<bool> {
        let local = read(&self.instances)?
            .get(&instance)
            .map(|i| i.entries.contains_key(id))
            .unwrap_or(false);
        Ok(local || read(&self.directory)?.contains_key(id))
    }

    fn create_blob(&self, instance: InstanceId, data: Vec<u8>) -> StoreResult<ObjectId> {
        self.check(instance, Some(FailPoint::CreateBlob))?;
        if data.len() > self.config.max_blob_bytes {
            return Err(StoreError::Rejected {
                op: "create_blob",
                reason: format!(
                    "{} bytes exceeds the {} byte limit",
                    data.len(),
                    self.config.max_blob_bytes
                ),
            });
        }
        let id = self.next_id(&IdHasher::BLOB, instance, "blob");
        let len = data.len();
        let mut instances = write(&self.instances)?;
        let entry = instances
            .get_mut(&instance)
            .ok_or(StoreError::UnknownInstance(instance))?;
        entry.entries.insert(id, LocalEntry::Blob(data));
        debug!(id = %id.short_hex(), instance = %instance, len, "blob created");
        Ok(id)
    }

    fn get_blob(&self, instance: InstanceId, id: &ObjectId) -> StoreResult<Vec<u8>> {
        self.check(instance, None)?;
        let instances = read(&self.instances)?;
        match instances.get(&instance).and_then(|i| i.entries.get(id)) {
            Some(LocalEntry::Blob(data)) => Ok(data.clone()),
            _ => Err(StoreError::NotFound(*id)),
        }
    }

    fn create_object(&self, instance: InstanceId, mut meta: ObjectMeta) -> StoreResult<ObjectId> {
        self.check(instance, Some(FailPoint::CreateObject))?;
        for member in meta.members.values() {
            if !self.resolves(instance, member)? {
                return Err(StoreError::NotFound(*member));
            }
        }
        let id = self.next_id(&IdHasher::OBJECT, instance, &meta.type_name);
        meta.id = id;
        meta.instance_id = instance;
        meta.published = false;
        debug!(id = %id.short_hex(), instance = %instance, type_name = %meta.type_name, "object created");

        let mut instances = write(&self.instances)?;
        let entry = instances
            .get_mut(&instance)
            .ok_or(StoreError::UnknownInstance(instance))?;
        entry.entries.insert(id, LocalEntry::Object(meta));
        Ok(id)
    }

    fn get_meta(&self, instance: InstanceId, id: &ObjectId) -> StoreResult<ObjectMeta> {
        self.check(instance, None)?;
        if let Some(meta) = self.local_meta(instance, id)? {
            return Ok(meta);
        }
        read(&self.directory)?
            .get(id)
            .cloned()
            .ok_or(StoreError::NotFound(*id))
    }

    fn delete_object(&self, instance: InstanceId, id: &ObjectId) -> StoreResult<bool> {
        self.check(instance, None)?;
        let removed = {
            let mut instances = write(&self.instances)?;
            let entry = instances
                .get_mut(&instance)
                .ok_or(StoreError::UnknownInstance(instance))?;
            entry.entries.remove(id).is_some()
        };
        if removed {
            write(&self.directory)?.remove(id);
            write(&self.streams)?.remove(id);
            debug!(id = %id.short_hex(), instance = %instance, "object deleted");
        }
        Ok(removed)
    }

    fn publish(&self, instance: InstanceId, id: &ObjectId) -> StoreResult<()> {
        self.check(instance, Some(FailPoint::Publish))?;

        // Collect the object and every local object it reaches through
        // members; remote members must already be published by their owner.
        let mut pending = vec![*id];
        let mut seen = HashSet::new();
        let mut metas = Vec::new();
        while let Some(next) = pending.pop() {
            if !seen.insert(next) {
                continue;
            }
            match self.local_meta(instance, &next)? {
                Some(meta) => {
                    pending.extend(meta.members.values().copied());
                    metas.push(meta);
                }
                None if next == *id => {
                    if read(&self.directory)?.contains_key(id) {
                        return Ok(());
                    }
                    return Err(StoreError::NotFound(*id));
                }
                None => {}
            }
        }

        {
            let mut instances = write(&self.instances)?;
            let entry = instances
                .get_mut(&instance)
                .ok_or(StoreError::UnknownInstance(instance))?;
            for meta in &mut metas {
                meta.published = true;
                if let Some(LocalEntry::Object(local)) = entry.entries.get_mut(&meta.id) {
                    local.published = true;
                }
            }
        }
        let count = metas.len();
        let mut directory = write(&self.directory)?;
        for meta in metas {
            directory.insert(meta.id, meta);
        }
        debug!(id = %id.short_hex(), instance = %instance, count, "metadata published");
        Ok(())
    }

    fn is_published(&self, instance: InstanceId, id: &ObjectId) -> StoreResult<bool> {
        self.check(instance, None)?;
        Ok(read(&self.directory)?.contains_key(id))
    }

    fn put_name(&self, instance: InstanceId, name: &str, id: &ObjectId) -> StoreResult<()> {
        self.check(instance, Some(FailPoint::PutName))?;
        if !read(&self.directory)?.contains_key(id) {
            if self.resolves(instance, id)? {
                return Err(StoreError::Rejected {
                    op: "put_name",
                    reason: format!("{id} is not published"),
                });
            }
            return Err(StoreError::NotFound(*id));
        }
        let previous = write(&self.names)?.insert(name.to_string(), *id);
        debug!(binding = name, id = %id.short_hex(), replaced = previous.is_some(), "name bound");
        Ok(())
    }

    fn get_name(&self, instance: InstanceId, name: &str) -> StoreResult<ObjectId> {
        self.check(instance, None)?;
        read(&self.names)?
            .get(name)
            .copied()
            .ok_or_else(|| StoreError::NameNotFound(name.to_string()))
    }

    fn create_stream(&self, instance: InstanceId, id: &ObjectId) -> StoreResult<()> {
        self.check(instance, Some(FailPoint::CreateStream))?;
        if self.local_meta(instance, id)?.is_none() {
            return Err(StoreError::NotFound(*id));
        }
        let mut streams = write(&self.streams)?;
        if streams.contains_key(id) {
            return Err(StoreError::StreamExists(*id));
        }
        streams.insert(
            *id,
            StreamChannel {
                chunks: VecDeque::new(),
                stopped: false,
            },
        );
        debug!(id = %id.short_hex(), instance = %instance, "stream registered");
        Ok(())
    }

    fn push_chunk(&self, instance: InstanceId, stream: &ObjectId, chunk: &ObjectId) -> StoreResult<()> {
        self.check(instance, None)?;
        let mut streams = write(&self.streams)?;
        let channel = streams
            .get_mut(stream)
            .ok_or(StoreError::StreamNotFound(*stream))?;
        if channel.stopped {
            return Err(StoreError::StreamStopped(*stream));
        }
        if channel.chunks.len() >= self.config.max_stream_chunks {
            return Err(StoreError::StreamFull {
                id: *stream,
                capacity: self.config.max_stream_chunks,
            });
        }
        channel.chunks.push_back(*chunk);
        Ok(())
    }

    fn pull_chunk(&self, instance: InstanceId, stream: &ObjectId) -> StoreResult<Option<ObjectId>> {
        self.check(instance, None)?;
        let mut streams = write(&self.streams)?;
        let channel = streams
            .get_mut(stream)
            .ok_or(StoreError::StreamNotFound(*stream))?;
        match channel.chunks.pop_front() {
            Some(chunk) => Ok(Some(chunk)),
            None if channel.stopped => Err(StoreError::StreamStopped(*stream)),
            None => Ok(None),
        }
    }

    fn stop_stream(&self, instance: InstanceId, stream: &ObjectId) -> StoreResult<()> {
        self.check(instance, None)?;
        let mut streams = write(&self.streams)?;
        let channel = streams
            .get_mut(stream)
            .ok_or(StoreError::StreamNotFound(*stream))?;
        channel.stopped = true;
        debug!(id = %stream.short_hex(), "stream stopped");
        Ok(())
    }
}

impl std::fmt::Debug for InMemoryDeployment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let instances = self.instances.read().map(|i| i.len()).unwrap_or(0);
        let published = self.directory.read().map(|d| d.len()).unwrap_or(0);
        f.debug_struct("InMemoryDeployment")
            .field("instance_count", &instances)
            .field("published_count", &published)
            .finish()
    }
}

/// A session connected to one instance of an [`InMemoryDeployment`].
#[derive(Clone)]
pub struct InMemoryClient {
    deployment: Arc<InMemoryDeployment>,
    instance: InstanceId,
}

impl InMemoryClient {
    pub fn deployment(&self) -> &Arc<InMemoryDeployment> {
        &self.deployment
    }
}

impl std::fmt::Debug for InMemoryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryClient")
            .field("instance", &self.instance)
            .finish()
    }
}

impl StoreClient for InMemoryClient {
    fn instance_id(&self) -> InstanceId {
        self.instance
    }

    fn create_blob(&self, data: Vec<u8>) -> StoreResult<ObjectId> {
        self.deployment.create_blob(self.instance, data)
    }

    fn get_blob(&self, id: &ObjectId) -> StoreResult<Vec<u8>> {
        self.deployment.get_blob(self.instance, id)
    }

    fn create_object(&self, meta: ObjectMeta) -> StoreResult<ObjectId> {
        self.deployment.create_object(self.instance, meta)
    }

    fn get_meta(&self, id: &ObjectId) -> StoreResult<ObjectMeta> {
        self.deployment.get_meta(self.instance, id)
    }

    fn delete_object(&self, id: &ObjectId) -> StoreResult<bool> {
        self.deployment.delete_object(self.instance, id)
    }

    fn publish(&self, id: &ObjectId) -> StoreResult<()> {
        self.deployment.publish(self.instance, id)
    }

    fn is_published(&self, id: &ObjectId) -> StoreResult<bool> {
        self.deployment.is_published(self.instance, id)
    }

    fn put_name(&self, name: &str, id: &ObjectId) -> StoreResult<()> {
        self.deployment.put_name(self.instance, name, id)
    }

    fn get_name(&self, name: &str) -> StoreResult<ObjectId> {
        self.deployment.get_name(self.instance, name)
    }

    fn create_stream(&self, id: &ObjectId) -> StoreResult<()> {
        self.deployment.create_stream(self.instance, id)
    }

    fn push_chunk(&self, stream: &ObjectId, chunk: &ObjectId) -> StoreResult<()> {
        self.deployment.push_chunk(self.instance, stream, chunk)
    }

    fn pull_chunk(&self, stream: &ObjectId) -> StoreResult<Option<ObjectId>> {
        self.deployment.pull_chunk(self.instance, stream)
    }

    fn stop_stream(&self, stream: &ObjectId) -> StoreResult<()> {
        self.deployment.stop_stream(self.instance, stream)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_instances() -> (InMemoryClient, InMemoryClient) {
        let deployment = InMemoryDeployment::with_instances(2);
        let a = deployment.connect(InstanceId::new(0)).unwrap();
        let b = deployment.connect(InstanceId::new(1)).unwrap();
        (a, b)
    }

    fn make_meta(type_name: &str) -> ObjectMeta {
        let mut meta = ObjectMeta::new(type_name);
        meta.set("len", &3u64).unwrap();
        meta
    }

    // -----------------------------------------------------------------------
    // Sessions
    // -----------------------------------------------------------------------

    #[test]
    fn connect_to_unknown_instance_fails() {
        let deployment = InMemoryDeployment::with_instances(1);
        let err = deployment.connect(InstanceId::new(9)).unwrap_err();
        assert!(matches!(err, StoreError::UnknownInstance(i) if i == InstanceId::new(9)));
    }

    #[test]
    fn client_reports_its_instance() {
        let (a, b) = two_instances();
        assert_eq!(a.instance_id(), InstanceId::new(0));
        assert_eq!(b.instance_id(), InstanceId::new(1));
        assert_eq!(
            a.deployment().instance_ids().unwrap(),
            vec![InstanceId::new(0), InstanceId::new(1)]
        );
    }

    // -----------------------------------------------------------------------
    // Objects and blobs
    // -----------------------------------------------------------------------

    #[test]
    fn create_and_get_object() {
        let (a, _) = two_instances();
        let id = a.create_object(make_meta("test::A")).unwrap();
        let meta = a.get_meta(&id).unwrap();
        assert_eq!(meta.id, id);
        assert_eq!(meta.instance_id, InstanceId::new(0));
        assert!(!meta.published);
        assert_eq!(meta.get::<u64>("len").unwrap(), 3);
    }

    #[test]
    fn identical_metadata_gets_distinct_ids() {
        let (a, _) = two_instances();
        let id1 = a.create_object(make_meta("test::A")).unwrap();
        let id2 = a.create_object(make_meta("test::A")).unwrap();
        assert_ne!(id1, id2);
        assert_eq!(a.deployment().local_count(InstanceId::new(0)).unwrap(), 2);
    }

    #[test]
    fn blobs_are_instance_local() {
        let (a, b) = two_instances();
        let id = a.create_blob(b"payload".to_vec()).unwrap();
        assert_eq!(a.get_blob(&id).unwrap(), b"payload");
        assert!(matches!(b.get_blob(&id), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn oversized_blob_is_rejected() {
        let config = DeploymentConfig {
            max_blob_bytes: 4,
            ..Default::default()
        };
        let deployment = InMemoryDeployment::new(config, [InstanceId::new(0)]);
        let client = deployment.connect(InstanceId::new(0)).unwrap();
        let err = client.create_blob(vec![0; 5]).unwrap_err();
        assert!(matches!(err, StoreError::Rejected { op: "create_blob", .. }));
    }

    #[test]
    fn members_must_resolve() {
        let (a, _) = two_instances();
        let mut meta = make_meta("test::A");
        let dangling = ObjectId::from_bytes(b"dangling");
        meta.add_member("buffer", dangling).unwrap();
        assert!(matches!(a.create_object(meta), Err(StoreError::NotFound(id)) if id == dangling));
    }

    #[test]
    fn delete_local_object() {
        let (a, _) = two_instances();
        let id = a.create_object(make_meta("test::A")).unwrap();
        assert!(a.delete_object(&id).unwrap());
        assert!(!a.exists(&id).unwrap());
        assert!(!a.delete_object(&id).unwrap());
    }

    // -----------------------------------------------------------------------
    // Visibility and publishing
    // -----------------------------------------------------------------------

    #[test]
    fn unpublished_objects_are_invisible_to_other_instances() {
        let (a, b) = two_instances();
        let id = a.create_object(make_meta("test::A")).unwrap();
        assert!(a.exists(&id).unwrap());
        assert!(!b.exists(&id).unwrap());
        assert!(!a.is_published(&id).unwrap());
    }

    #[test]
    fn publish_makes_object_visible_everywhere() {
        let (a, b) = two_instances();
        let id = a.create_object(make_meta("test::A")).unwrap();
        a.publish(&id).unwrap();

        let remote = b.get_meta(&id).unwrap();
        assert!(remote.published);
        assert_eq!(remote.instance_id, InstanceId::new(0));
        assert!(a.get_meta(&id).unwrap().published);
        assert!(b.is_published(&id).unwrap());
    }

    #[test]
    fn publish_includes_local_members() {
        let (a, b) = two_instances();
        let inner = a.create_object(make_meta("test::Inner")).unwrap();
        let blob = a.create_blob(vec![1, 2, 3]).unwrap();
        let mut outer = make_meta("test::Outer");
        outer.add_member("inner", inner).unwrap();
        outer.add_member("buffer", blob).unwrap();
        let outer = a.create_object(outer).unwrap();

        a.publish(&outer).unwrap();
        assert!(b.exists(&inner).unwrap());
        assert_eq!(a.deployment().published_count().unwrap(), 2);
    }

    #[test]
    fn publish_is_idempotent() {
        let (a, _) = two_instances();
        let id = a.create_object(make_meta("test::A")).unwrap();
        a.publish(&id).unwrap();
        a.publish(&id).unwrap();
        assert_eq!(a.deployment().published_count().unwrap(), 1);
    }

    #[test]
    fn publish_of_remote_object_requires_it_published() {
        let (a, b) = two_instances();
        let id = a.create_object(make_meta("test::A")).unwrap();
        assert!(matches!(b.publish(&id), Err(StoreError::NotFound(_))));
        a.publish(&id).unwrap();
        b.publish(&id).unwrap();
    }

    // -----------------------------------------------------------------------
    // Names
    // -----------------------------------------------------------------------

    #[test]
    fn names_bind_published_objects_last_writer_wins() {
        let (a, b) = two_instances();
        let first = a.create_object(make_meta("test::A")).unwrap();
        let second = b.create_object(make_meta("test::A")).unwrap();
        a.publish(&first).unwrap();
        b.publish(&second).unwrap();

        a.put_name("frame", &first).unwrap();
        b.put_name("frame", &second).unwrap();
        assert_eq!(a.get_name("frame").unwrap(), second);
    }

    #[test]
    fn name_requires_published_object() {
        let (a, _) = two_instances();
        let id = a.create_object(make_meta("test::A")).unwrap();
        assert!(matches!(
            a.put_name("frame", &id),
            Err(StoreError::Rejected { op: "put_name", .. })
        ));
        assert!(matches!(
            a.get_name("frame"),
            Err(StoreError::NameNotFound(_))
        ));
    }

    // -----------------------------------------------------------------------
    // Streams
    // -----------------------------------------------------------------------

    #[test]
    fn stream_registration_happens_once() {
        let (a, _) = two_instances();
        let id = a.create_object(make_meta("test::Stream")).unwrap();
        a.create_stream(&id).unwrap();
        assert!(matches!(a.create_stream(&id), Err(StoreError::StreamExists(_))));
    }

    #[test]
    fn stream_requires_local_object() {
        let (a, b) = two_instances();
        let id = a.create_object(make_meta("test::Stream")).unwrap();
        assert!(matches!(b.create_stream(&id), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn stream_chunks_drain_in_order_then_stop() {
        let (a, b) = two_instances();
        let id = a.create_object(make_meta("test::Stream")).unwrap();
        a.create_stream(&id).unwrap();

        let c1 = ObjectId::from_bytes(b"c1");
        let c2 = ObjectId::from_bytes(b"c2");
        a.push_chunk(&id, &c1).unwrap();
        a.push_chunk(&id, &c2).unwrap();
        a.stop_stream(&id).unwrap();
        assert!(matches!(a.push_chunk(&id, &c1), Err(StoreError::StreamStopped(_))));

        assert_eq!(b.pull_chunk(&id).unwrap(), Some(c1));
        assert_eq!(b.pull_chunk(&id).unwrap(), Some(c2));
        assert!(matches!(b.pull_chunk(&id), Err(StoreError::StreamStopped(_))));
    }

    #[test]
    fn open_empty_stream_pulls_none() {
        let (a, _) = two_instances();
        let id = a.create_object(make_meta("test::Stream")).unwrap();
        a.create_stream(&id).unwrap();
        assert_eq!(a.pull_chunk(&id).unwrap(), None);
    }

    #[test]
    fn full_stream_refuses_pushes() {
        let config = DeploymentConfig {
            max_stream_chunks: 1,
            ..Default::default()
        };
        let deployment = InMemoryDeployment::new(config, [InstanceId::new(0)]);
        let client = deployment.connect(InstanceId::new(0)).unwrap();
        let id = client.create_object(make_meta("test::Stream")).unwrap();
        client.create_stream(&id).unwrap();
        let chunk = ObjectId::from_bytes(b"chunk");
        client.push_chunk(&id, &chunk).unwrap();
        assert!(matches!(
            client.push_chunk(&id, &chunk),
            Err(StoreError::StreamFull { capacity: 1, .. })
        ));
    }

    // -----------------------------------------------------------------------
    // Failure injection
    // -----------------------------------------------------------------------

    #[test]
    fn unavailable_instance_fails_every_call() {
        let (a, b) = two_instances();
        a.deployment().set_available(InstanceId::new(0), false).unwrap();
        let err = a.create_object(make_meta("test::A")).unwrap_err();
        assert!(err.is_transport());
        b.create_object(make_meta("test::A")).unwrap();

        a.deployment().set_available(InstanceId::new(0), true).unwrap();
        a.create_object(make_meta("test::A")).unwrap();
    }

    #[test]
    fn injected_failure_fires_once() {
        let (a, _) = two_instances();
        a.deployment()
            .inject_failure(InstanceId::new(0), FailPoint::CreateObject)
            .unwrap();
        let err = a.create_object(make_meta("test::A")).unwrap_err();
        assert!(matches!(err, StoreError::Rejected { op: "create_object", .. }));
        assert!(!err.is_transport());
        a.create_object(make_meta("test::A")).unwrap();
    }

    #[test]
    fn debug_format() {
        let deployment = InMemoryDeployment::with_instances(3);
        let debug = format!("{deployment:?}");
        assert!(debug.contains("InMemoryDeployment"));
        assert!(debug.contains("instance_count: 3"));
    }
}
