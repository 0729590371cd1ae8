//! The build/seal state machine shared by every builder.
//!
//! ```text
//! Unbuilt --build()--> Built --seal()--> Sealed
//! Unbuilt --build() fails--> Unbuilt
//! Built   --seal() fails--> Built
//! ```
//!
//! Mutators are accepted only while `Unbuilt`. Builders are not internally
//! synchronized; one builder belongs to one task. Concurrent sealers of one
//! logical object on different clients are not coordinated here: the store's
//! publish and name binding are the only serialization point, and the last
//! successful writer wins. Callers needing a deterministic outcome designate
//! a single sealer.

use shardkit_store::StoreClient;
use shardkit_types::ObjectId;
use tracing::warn;

use crate::error::{BuilderError, Result};

/// Where a builder is in its lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BuildState {
    /// Accumulating state; nothing committed yet.
    Unbuilt,
    /// Committed to the local instance, not yet visible elsewhere.
    Built(ObjectId),
    /// Published (or, for streams, registered). Terminal.
    Sealed(ObjectId),
}

impl BuildState {
    /// Id of the produced object, once built.
    pub fn object_id(&self) -> Option<ObjectId> {
        match self {
            Self::Unbuilt => None,
            Self::Built(id) | Self::Sealed(id) => Some(*id),
        }
    }

    pub fn is_built(&self) -> bool {
        !matches!(self, Self::Unbuilt)
    }

    pub fn is_sealed(&self) -> bool {
        matches!(self, Self::Sealed(_))
    }
}

/// Guards for the state transitions; embedded in each builder.
#[derive(Debug)]
pub struct Lifecycle {
    state: BuildState,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self {
            state: BuildState::Unbuilt,
        }
    }

    pub fn state(&self) -> BuildState {
        self.state
    }

    /// Fails with `AlreadyBuilt` once an object has been produced.
    pub fn ensure_mutable(&self) -> Result<()> {
        match self.state.object_id() {
            None => Ok(()),
            Some(id) => Err(BuilderError::AlreadyBuilt(id)),
        }
    }

    pub fn mark_built(&mut self, id: ObjectId) {
        debug_assert_eq!(self.state, BuildState::Unbuilt);
        self.state = BuildState::Built(id);
    }

    /// The id to seal, or the reason sealing is not allowed now.
    pub fn seal_target(&self) -> Result<ObjectId> {
        match self.state {
            BuildState::Unbuilt => Err(BuilderError::NotBuilt),
            BuildState::Built(id) => Ok(id),
            BuildState::Sealed(id) => Err(BuilderError::AlreadySealed(id)),
        }
    }

    pub fn mark_sealed(&mut self) {
        if let BuildState::Built(id) = self.state {
            self.state = BuildState::Sealed(id);
        }
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

/// Common surface of every builder kind.
pub trait ObjectBuilder {
    /// What a successful seal hands back.
    type Output;

    /// Commit the accumulated state to the local instance.
    fn build(&mut self, client: &dyn StoreClient) -> Result<ObjectId>;

    /// Perform the one-way seal side effect.
    fn seal(&mut self, client: &dyn StoreClient) -> Result<Self::Output>;

    fn state(&self) -> BuildState;
}

/// Delete the objects and blobs a build created before it failed, newest
/// first. Only the listed ids are deleted; anything they reference is left
/// to the store. Failures are logged, not returned: the build error is what
/// the caller needs to see.
pub(crate) fn discard(client: &dyn StoreClient, created: &[ObjectId]) {
    for id in created.iter().rev() {
        if let Err(e) = client.delete_object(id) {
            warn!(id = %id.short_hex(), error = %e, "failed to discard object");
        }
    }
}
