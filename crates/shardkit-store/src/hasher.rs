use shardkit_types::{InstanceId, ObjectId};

/// Domain-separated BLAKE3 id allocator.
///
/// Store ids are not content hashes: two identical partitions built twice
/// are two objects. Each id hashes the creating instance, a deployment-wide
/// sequence number, and the object's type name under a domain tag, so blob
/// ids and object ids never collide.
pub struct IdHasher {
    domain: &'static str,
}

impl IdHasher {
    /// Allocator for metadata objects.
    pub const OBJECT: Self = Self {
        domain: "shardkit-object-v1",
    };
    /// Allocator for raw payload blobs.
    pub const BLOB: Self = Self {
        domain: "shardkit-blob-v1",
    };

    /// Allocate the id for the `seq`-th object created in the deployment.
    pub fn allocate(&self, instance: InstanceId, seq: u64, type_name: &str) -> ObjectId {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.domain.as_bytes());
        hasher.update(b":");
        hasher.update(&instance.get().to_le_bytes());
        hasher.update(&seq.to_le_bytes());
        hasher.update(type_name.as_bytes());
        ObjectId::from_hash(*hasher.finalize().as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocation_is_deterministic() {
        let a = IdHasher::OBJECT.allocate(InstanceId::new(1), 5, "t");
        let b = IdHasher::OBJECT.allocate(InstanceId::new(1), 5, "t");
        assert_eq!(a, b);
    }

    #[test]
    fn sequence_and_instance_separate_ids() {
        let base = IdHasher::OBJECT.allocate(InstanceId::new(1), 5, "t");
        assert_ne!(base, IdHasher::OBJECT.allocate(InstanceId::new(1), 6, "t"));
        assert_ne!(base, IdHasher::OBJECT.allocate(InstanceId::new(2), 5, "t"));
    }

    #[test]
    fn domains_separate_ids() {
        let object = IdHasher::OBJECT.allocate(InstanceId::new(0), 0, "blob");
        let blob = IdHasher::BLOB.allocate(InstanceId::new(0), 0, "blob");
        assert_ne!(object, blob);
    }
}
