use loam_types::{ObjectId, ObjectKind};

use crate::error::{StoreError, StoreResult};
use crate::object::StoredObject;

/// Content-addressed, append-only object store.
///
/// All implementations must satisfy these invariants:
/// - Objects are immutable once written. The same kind and payload always
///   produce the same ID, and writing an existing object is a no-op.
/// - Readers never observe a partially written object.
/// - There is no delete: the store only grows.
/// - All I/O errors are propagated, never silently ignored.
pub trait ObjectStore: Send + Sync {
    /// Read the canonical encoding (`"<kind> <len>\0<payload>"`) of an object.
    ///
    /// Returns `NotFound` if the object does not exist and `CorruptObject` if
    /// the stored bytes cannot be decoded.
    fn get(&self, id: &ObjectId) -> StoreResult<Vec<u8>>;

    /// Write an object and return its content-addressed ID.
    ///
    /// If the object already exists, this is a no-op (idempotent).
    fn put(&self, kind: ObjectKind, payload: &[u8]) -> StoreResult<ObjectId>;

    /// Check whether an object exists in the store.
    fn contains(&self, id: &ObjectId) -> StoreResult<bool>;

    /// Read and decode an object into its kind and payload.
    fn get_content(&self, id: &ObjectId) -> StoreResult<StoredObject> {
        let raw = self.get(id)?;
        StoredObject::decode(&raw).map_err(|e| StoreError::CorruptObject {
            id: *id,
            reason: e.to_string(),
        })
    }

    /// Write a `StoredObject`.
    fn put_object(&self, object: &StoredObject) -> StoreResult<ObjectId> {
        self.put(object.kind, &object.payload)
    }
}
