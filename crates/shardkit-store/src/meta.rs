use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shardkit_types::{InstanceId, ObjectId};

use crate::error::{StoreError, StoreResult};

/// Metadata attribute tree describing one stored object.
///
/// A type name, a map of JSON attributes, and a map of named references to
/// other objects. The store fills in `id`, `instance_id` and `published`;
/// callers only set the type name, attributes and members.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ObjectMeta {
    /// Assigned by the store on creation; null before that.
    pub id: ObjectId,
    /// Stable type tag readers dispatch on (e.g. `shardkit::DataFrame`).
    pub type_name: String,
    /// Instance that created the object.
    pub instance_id: InstanceId,
    /// Whether the metadata has been published to the directory.
    pub published: bool,
    pub attributes: BTreeMap<String, Value>,
    pub members: BTreeMap<String, ObjectId>,
}

impl ObjectMeta {
    /// Start describing a new object of the given type.
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            id: ObjectId::null(),
            type_name: type_name.into(),
            instance_id: InstanceId::new(0),
            published: false,
            attributes: BTreeMap::new(),
            members: BTreeMap::new(),
        }
    }

    /// Set an attribute, replacing any previous value under `key`.
    pub fn set<T: Serialize + ?Sized>(&mut self, key: impl Into<String>, value: &T) -> StoreResult<()> {
        let value =
            serde_json::to_value(value).map_err(|e| StoreError::Serialization(e.to_string()))?;
        self.attributes.insert(key.into(), value);
        Ok(())
    }

    /// Read and decode an attribute.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> StoreResult<T> {
        let value = self
            .attributes
            .get(key)
            .ok_or_else(|| self.missing(key))?;
        T::deserialize(value).map_err(|e| {
            StoreError::Serialization(format!("{}.{key}: {e}", self.type_name))
        })
    }

    /// Reference another object under `key`.
    pub fn add_member(&mut self, key: impl Into<String>, id: ObjectId) -> StoreResult<()> {
        if id.is_null() {
            return Err(StoreError::NullObjectId);
        }
        self.members.insert(key.into(), id);
        Ok(())
    }

    /// Look up a member reference.
    pub fn member(&self, key: &str) -> StoreResult<ObjectId> {
        self.members
            .get(key)
            .copied()
            .ok_or_else(|| self.missing(key))
    }

    pub fn has_type(&self, type_name: &str) -> bool {
        self.type_name == type_name
    }

    fn missing(&self, key: &str) -> StoreError {
        StoreError::MissingAttribute {
            type_name: self.type_name.clone(),
            key: key.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attributes_decode_to_their_types() {
        let mut meta = ObjectMeta::new("test::Thing");
        meta.set("rows", &3u64).unwrap();
        meta.set("names", &["x", "y"]).unwrap();

        assert_eq!(meta.get::<u64>("rows").unwrap(), 3);
        assert_eq!(meta.get::<Vec<String>>("names").unwrap(), vec!["x", "y"]);
    }

    #[test]
    fn set_replaces_previous_value() {
        let mut meta = ObjectMeta::new("test::Thing");
        meta.set("rows", &3u64).unwrap();
        meta.set("rows", &4u64).unwrap();
        assert_eq!(meta.get::<u64>("rows").unwrap(), 4);
        assert_eq!(meta.attributes.len(), 1);
    }

    #[test]
    fn missing_attribute_names_the_type() {
        let meta = ObjectMeta::new("test::Thing");
        let err = meta.get::<u64>("rows").unwrap_err();
        assert!(matches!(
            err,
            StoreError::MissingAttribute { ref type_name, ref key } if type_name == "test::Thing" && key == "rows"
        ));
        assert!(meta.member("buffer").is_err());
    }

    #[test]
    fn wrong_attribute_type_is_a_serialization_error() {
        let mut meta = ObjectMeta::new("test::Thing");
        meta.set("rows", "three").unwrap();
        assert!(matches!(
            meta.get::<u64>("rows").unwrap_err(),
            StoreError::Serialization(_)
        ));
    }

    #[test]
    fn null_member_is_rejected() {
        let mut meta = ObjectMeta::new("test::Thing");
        assert!(matches!(
            meta.add_member("buffer", ObjectId::null()),
            Err(StoreError::NullObjectId)
        ));
        let id = ObjectId::from_bytes(b"buffer");
        meta.add_member("buffer", id).unwrap();
        assert_eq!(meta.member("buffer").unwrap(), id);
    }

    #[test]
    fn new_meta_is_unassigned() {
        let meta = ObjectMeta::new("test::Thing");
        assert!(meta.id.is_null());
        assert!(!meta.published);
        assert!(meta.has_type("test::Thing"));
    }
}
