use serde::{Serialize, de::DeserializeOwned};

/// Opaque identifier of a stored resource.
pub type ResourceId = String;

/// A domain entity exposed over the CRUD surface.
///
/// The trait binds a type to one backing collection and one id field. The
/// persistence adapters key every operation on `ID_FIELD`, and the cache keys
/// entries as `"<COLLECTION>-<id>"`.
pub trait Resource: Serialize + DeserializeOwned + Clone + Unpin + Send + Sync + 'static {
    /// Backing collection name, also used as the cache key prefix.
    const COLLECTION: &'static str;

    /// Document field holding the identifier.
    const ID_FIELD: &'static str;

    /// Current identifier; empty when the resource has not been assigned one.
    fn id(&self) -> &str;

    fn set_id(&mut self, id: ResourceId);

    /// Fresh identifier for resources created without one.
    ///
    /// Returning `None` means clients must always supply the id themselves.
    fn generate_id() -> Option<ResourceId> {
        None
    }

    fn has_id(&self) -> bool {
        !self.id().trim().is_empty()
    }
}
