//! Error types for builder operations.

use shardkit_store::StoreError;
use shardkit_types::{ObjectId, PartitionShape};
use thiserror::Error;

/// Errors that can occur while building, sealing, or resolving objects.
///
/// State-machine violations (`AlreadyBuilt`, `NotBuilt`, `AlreadySealed`,
/// `MissingShape`, ...) are detected locally without contacting the store.
/// Store failures are returned to the caller unretried.
#[derive(Debug, Error)]
pub enum BuilderError {
    /// No column is registered under this name.
    #[error("column not found: {name}")]
    NotFound { name: String },

    /// The builder already produced an object and cannot change or build again.
    #[error("builder already built {0}")]
    AlreadyBuilt(ObjectId),

    /// `seal` was called before `build`.
    #[error("builder has not been built")]
    NotBuilt,

    /// `seal` was called on a builder that is already sealed.
    #[error("builder already sealed {0}")]
    AlreadySealed(ObjectId),

    /// A global object was built without a partition shape.
    #[error("partition shape has not been set")]
    MissingShape,

    /// Columns of one partition disagree on their length.
    #[error("column {column} has {actual} rows, expected {expected}")]
    LengthMismatch {
        column: String,
        expected: usize,
        actual: usize,
    },

    /// The number of partitions does not fill the declared shape.
    #[error("shape {shape} expects {expected} partitions, got {actual}")]
    PartitionCountMismatch {
        shape: PartitionShape,
        expected: u64,
        actual: usize,
    },

    /// A column build or the object commit was refused by the store.
    #[error("build failed: {0}")]
    BuildFailure(#[source] StoreError),

    /// The object was built but its stream could not be registered, for any
    /// reason including transport failure.
    #[error("stream registration failed for {id}: {source}")]
    RegistrationFailure {
        id: ObjectId,
        #[source]
        source: StoreError,
    },

    /// Publishing a built object was refused by the store.
    #[error("seal failed for {id}: {source}")]
    Seal {
        id: ObjectId,
        #[source]
        source: StoreError,
    },

    /// Transport-level failure from the store client, passed through.
    #[error("store unavailable: {0}")]
    StoreUnavailable(#[source] StoreError),

    /// Any other store error on a read path.
    #[error("store error: {0}")]
    Store(#[source] StoreError),

    /// Resolved metadata does not describe the expected kind of object.
    #[error("cannot decode {id}: {reason}")]
    Decode { id: ObjectId, reason: String },

    /// Configuration could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl BuilderError {
    /// Classify a store error raised while building.
    pub(crate) fn build(err: StoreError) -> Self {
        if err.is_transport() {
            Self::StoreUnavailable(err)
        } else {
            Self::BuildFailure(err)
        }
    }

    /// Classify a store error raised while publishing `id`.
    pub(crate) fn seal(id: ObjectId, err: StoreError) -> Self {
        if err.is_transport() {
            Self::StoreUnavailable(err)
        } else {
            Self::Seal { id, source: err }
        }
    }

    pub(crate) fn decode(id: ObjectId, err: impl std::fmt::Display) -> Self {
        Self::Decode {
            id,
            reason: err.to_string(),
        }
    }
}

impl From<StoreError> for BuilderError {
    fn from(err: StoreError) -> Self {
        if err.is_transport() {
            Self::StoreUnavailable(err)
        } else {
            Self::Store(err)
        }
    }
}

/// Convenience type alias for builder operations.
pub type Result<T> = std::result::Result<T, BuilderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_errors_pass_through_as_unavailable() {
        let err = BuilderError::build(StoreError::Unavailable("down".into()));
        assert!(matches!(err, BuilderError::StoreUnavailable(_)));
        let err = BuilderError::seal(ObjectId::null(), StoreError::Unavailable("down".into()));
        assert!(matches!(err, BuilderError::StoreUnavailable(_)));
        let err: BuilderError = StoreError::Unavailable("down".into()).into();
        assert!(matches!(err, BuilderError::StoreUnavailable(_)));
    }

    #[test]
    fn other_store_errors_are_classified_by_phase() {
        let rejected = || StoreError::Rejected {
            op: "create_object",
            reason: "no".into(),
        };
        assert!(matches!(BuilderError::build(rejected()), BuilderError::BuildFailure(_)));
        assert!(matches!(
            BuilderError::seal(ObjectId::null(), rejected()),
            BuilderError::Seal { .. }
        ));
        let err: BuilderError = rejected().into();
        assert!(matches!(err, BuilderError::Store(_)));
    }

    #[test]
    fn messages_name_the_column() {
        let err = BuilderError::NotFound { name: "x".into() };
        assert_eq!(err.to_string(), "column not found: x");
    }
}
