use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use shardkit_types::{InstanceId, ObjectId};

/// One partition of a global object: where it lives and what it is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PartitionEntry {
    pub instance_id: InstanceId,
    pub object_id: ObjectId,
}

impl PartitionEntry {
    pub fn new(instance_id: InstanceId, object_id: ObjectId) -> Self {
        Self {
            instance_id,
            object_id,
        }
    }
}

/// Partitions of a global object, grouped by contributing instance.
///
/// Append-only. Instances keep the order of their first contribution and
/// each instance's ids keep call order. Duplicates are kept.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PartitionSet {
    groups: IndexMap<InstanceId, Vec<ObjectId>>,
    len: usize,
}

impl PartitionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, instance: InstanceId, id: ObjectId) {
        self.groups.entry(instance).or_default().push(id);
        self.len += 1;
    }

    pub fn extend(&mut self, instance: InstanceId, ids: impl IntoIterator<Item = ObjectId>) {
        let ids: Vec<ObjectId> = ids.into_iter().collect();
        if ids.is_empty() {
            return;
        }
        self.len += ids.len();
        self.groups.entry(instance).or_default().extend(ids);
    }

    /// Contributing instances in first-contribution order.
    pub fn instances(&self) -> impl Iterator<Item = InstanceId> + '_ {
        self.groups.keys().copied()
    }

    /// Partitions contributed by one instance; empty if it contributed none.
    pub fn entries_for(&self, instance: InstanceId) -> &[ObjectId] {
        self.groups.get(&instance).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All entries, grouped by instance.
    pub fn entries(&self) -> Vec<PartitionEntry> {
        self.groups
            .iter()
            .flat_map(|(instance, ids)| ids.iter().map(|id| PartitionEntry::new(*instance, *id)))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl FromIterator<PartitionEntry> for PartitionSet {
    fn from_iter<I: IntoIterator<Item = PartitionEntry>>(iter: I) -> Self {
        let mut set = Self::new();
        for entry in iter {
            set.add(entry.instance_id, entry.object_id);
        }
        set
    }
}
