use shardkit_types::{InstanceId, ObjectId};

/// Errors from store client operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested object is neither local to this instance nor published.
    #[error("object not found: {0}")]
    NotFound(ObjectId),

    /// The instance could not be reached (transport-level failure).
    #[error("store instance unavailable: {0}")]
    Unavailable(String),

    /// The instance is not part of the deployment.
    #[error("unknown store instance: {0}")]
    UnknownInstance(InstanceId),

    /// The instance refused the request.
    #[error("{op} rejected: {reason}")]
    Rejected { op: &'static str, reason: String },

    /// No object is bound to the given name.
    #[error("name not found: {0}")]
    NameNotFound(String),

    /// A stream has already been registered for this object.
    #[error("stream already exists: {0}")]
    StreamExists(ObjectId),

    /// No stream has been registered for this object.
    #[error("stream not found: {0}")]
    StreamNotFound(ObjectId),

    /// The stream was stopped and has no more chunks.
    #[error("stream stopped: {0}")]
    StreamStopped(ObjectId),

    /// The stream holds the maximum number of undrained chunks.
    #[error("stream {id} is full ({capacity} chunks)")]
    StreamFull { id: ObjectId, capacity: usize },

    /// A metadata attribute or member is missing.
    #[error("{type_name} has no attribute {key:?}")]
    MissingAttribute { type_name: String, key: String },

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Configuration could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Attempted to reference the null object ID.
    #[error("cannot reference the null object ID")]
    NullObjectId,

    /// An internal lock was poisoned by a panicking thread.
    #[error("lock poisoned: {0}")]
    Poisoned(String),
}

impl StoreError {
    /// `true` for transport-level failures, which callers may retry against
    /// the same instance.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
