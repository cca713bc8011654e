use loam_crypto::ContentHasher;
use loam_types::{ObjectId, ObjectKind};

use crate::codec;
use crate::error::{StoreError, StoreResult};

/// A stored object: kind tag + payload bytes + cached size.
///
/// `StoredObject` is the unit of storage. The store never interprets the
/// payload. Blobs, trees and commits all travel through it as bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredObject {
    /// The type of this object.
    pub kind: ObjectKind,
    /// The payload bytes (everything after the canonical header).
    pub payload: Vec<u8>,
    /// The size of `payload` in bytes.
    pub size: u64,
}

impl StoredObject {
    /// Create a new stored object from kind and payload.
    pub fn new(kind: ObjectKind, payload: Vec<u8>) -> Self {
        let size = payload.len() as u64;
        Self {
            kind,
            payload,
            size,
        }
    }

    /// Compute the content-addressed ID for this object.
    pub fn compute_id(&self) -> ObjectId {
        ContentHasher::digest(self.kind, &self.payload)
    }

    /// The canonical encoding (`"<kind> <len>\0<payload>"`).
    pub fn encode(&self) -> Vec<u8> {
        codec::encode(self.kind, &self.payload)
    }

    /// Decode from a canonical encoding.
    pub fn decode(bytes: &[u8]) -> StoreResult<Self> {
        let (kind, payload) = codec::decode(bytes)?;
        Ok(Self::new(kind, payload.to_vec()))
    }

    /// Fail with `CorruptObject` unless this object has the expected kind.
    pub(crate) fn expect_kind(&self, expected: ObjectKind) -> StoreResult<()> {
        if self.kind != expected {
            return Err(StoreError::CorruptObject {
                id: self.compute_id(),
                reason: format!("expected {expected}, got {}", self.kind),
            });
        }
        Ok(())
    }
}

/// Raw content object.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Blob {
    pub data: Vec<u8>,
}

impl Blob {
    /// Create a new blob from raw bytes.
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    /// Content-addressed id of this blob.
    pub fn id(&self) -> ObjectId {
        ContentHasher::BLOB.hash(&self.data)
    }

    /// Convert into a `StoredObject` for storage.
    pub fn into_stored_object(self) -> StoredObject {
        StoredObject::new(ObjectKind::Blob, self.data)
    }

    /// Decode from a `StoredObject`.
    pub fn from_stored_object(obj: &StoredObject) -> StoreResult<Self> {
        obj.expect_kind(ObjectKind::Blob)?;
        Ok(Self {
            data: obj.payload.clone(),
        })
    }
}
