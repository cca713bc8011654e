use loam_types::{ObjectId, ObjectKind, OBJECT_ID_LEN};
use sha1::{Digest, Sha1};

/// Kind-prefixed SHA-1 content hasher.
///
/// Each hasher is bound to one [`ObjectKind`]. The canonical header
/// (`"blob 6\0"`, `"tree 37\0"`, ...) is fed to SHA-1 before the payload, so a
/// blob and a tree with identical bytes produce different ids. The header is
/// streamed into the digest instead of being concatenated with the payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ContentHasher {
    kind: ObjectKind,
}

impl ContentHasher {
    /// Hasher for blob objects.
    pub const BLOB: Self = Self {
        kind: ObjectKind::Blob,
    };
    /// Hasher for tree objects.
    pub const TREE: Self = Self {
        kind: ObjectKind::Tree,
    };
    /// Hasher for commit objects.
    pub const COMMIT: Self = Self {
        kind: ObjectKind::Commit,
    };

    /// The hasher for a given object kind.
    pub const fn for_kind(kind: ObjectKind) -> Self {
        Self { kind }
    }

    /// Compute the id of an object of `kind` with this payload.
    pub fn digest(kind: ObjectKind, payload: &[u8]) -> ObjectId {
        Self::for_kind(kind).hash(payload)
    }

    /// Hash a payload under this hasher's kind.
    pub fn hash(&self, payload: &[u8]) -> ObjectId {
        let mut hasher = Sha1::new();
        hasher.update(self.kind.header(payload.len()));
        hasher.update(payload);
        let mut out = [0u8; OBJECT_ID_LEN];
        out.copy_from_slice(&hasher.finalize());
        ObjectId::from_hash(out)
    }

    /// Verify that a payload produces the expected object ID.
    pub fn verify(&self, payload: &[u8], expected: &ObjectId) -> bool {
        self.hash(payload) == *expected
    }

    /// The object kind this hasher is bound to.
    pub fn kind(&self) -> ObjectKind {
        self.kind
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn hello_blob_matches_known_id() {
        let id = ContentHasher::BLOB.hash(b"hello\n");
        assert_eq!(id.to_hex(), "ce013625030ba8dba906f756967f9e9ca394464a");
    }

    #[test]
    fn empty_blob_and_empty_tree_match_known_ids() {
        assert_eq!(
            ContentHasher::digest(ObjectKind::Blob, b"").to_hex(),
            "e69de29bb2d1d6434b8b29ae775ad8c2e48c5391"
        );
        assert_eq!(
            ContentHasher::digest(ObjectKind::Tree, b"").to_hex(),
            "4b825dc642cb6eb9a060e54bf8d69288fbee4904"
        );
    }

    #[test]
    fn digest_covers_header_not_just_payload() {
        let id = ContentHasher::BLOB.hash(b"hello\n");
        assert_ne!(id.as_bytes()[..], Sha1::digest(b"hello\n")[..]);
        assert_eq!(id.as_bytes()[..], Sha1::digest(b"blob 6\0hello\n")[..]);
    }

    #[test]
    fn different_kinds_produce_different_hashes() {
        let data = b"same content";
        let blob = ContentHasher::BLOB.hash(data);
        let tree = ContentHasher::TREE.hash(data);
        let commit = ContentHasher::COMMIT.hash(data);
        assert_ne!(blob, tree);
        assert_ne!(blob, commit);
        assert_ne!(tree, commit);
    }

    #[test]
    fn verify_correct_and_tampered_data() {
        let id = ContentHasher::BLOB.hash(b"original");
        assert!(ContentHasher::BLOB.verify(b"original", &id));
        assert!(!ContentHasher::BLOB.verify(b"tampered", &id));
        assert!(!ContentHasher::TREE.verify(b"original", &id));
    }

    #[test]
    fn for_kind_matches_constants() {
        assert_eq!(ContentHasher::for_kind(ObjectKind::Commit), ContentHasher::COMMIT);
        assert_eq!(ContentHasher::TREE.kind(), ObjectKind::Tree);
    }

    proptest! {
        #[test]
        fn digest_is_deterministic(payload in proptest::collection::vec(any::<u8>(), 0..512)) {
            let a = ContentHasher::digest(ObjectKind::Blob, &payload);
            let b = ContentHasher::digest(ObjectKind::Blob, &payload);
            prop_assert_eq!(a, b);
        }
    }
}
