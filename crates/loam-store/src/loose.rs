use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use loam_crypto::ContentHasher;
use loam_types::{ObjectId, ObjectKind};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::codec;
use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::traits::ObjectStore;

/// Loose object store: one zlib-compressed file per object.
///
/// Object `ce013625...464a` lives at `<root>/ce/013625...464a`. Each file
/// holds the compressed canonical encoding. Files are written to a temporary
/// file in the fan-out directory and renamed into place, so a reader sees
/// either the whole object or nothing.
pub struct LooseObjectStore {
    root: PathBuf,
    config: StoreConfig,
}

impl LooseObjectStore {
    /// Open a store rooted at `root` (the `objects/` directory) with default
    /// settings. The directory is created lazily on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_config(root, StoreConfig::default())
    }

    pub fn with_config(root: impl Into<PathBuf>, config: StoreConfig) -> Self {
        Self {
            root: root.into(),
            config,
        }
    }

    /// The `objects/` directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Path of the file that holds (or would hold) `id`.
    pub fn object_path(&self, id: &ObjectId) -> PathBuf {
        let (dir, file) = id.fanout();
        self.root.join(dir).join(file)
    }

    fn write_object(&self, path: &Path, kind: ObjectKind, payload: &[u8]) -> StoreResult<()> {
        let dir = path.parent().unwrap_or(&self.root);
        fs::create_dir_all(dir).map_err(|e| StoreError::io(dir, e))?;

        let mut tmp = NamedTempFile::new_in(dir).map_err(|e| StoreError::io(dir, e))?;
        self.compress_into(&mut tmp, kind, payload)
            .map_err(|e| StoreError::io(tmp.path(), e))?;
        if self.config.fsync {
            tmp.as_file()
                .sync_all()
                .map_err(|e| StoreError::io(tmp.path(), e))?;
        }
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tmp.as_file()
                .set_permissions(fs::Permissions::from_mode(0o444))
                .map_err(|e| StoreError::io(tmp.path(), e))?;
        }

        if let Err(err) = tmp.persist(path) {
            // Another writer may have renamed identical bytes into place first.
            if path.exists() {
                debug!(path = %path.display(), "object appeared concurrently; keeping existing file");
                return Ok(());
            }
            return Err(StoreError::io(path, err.error));
        }
        Ok(())
    }

    fn compress_into<W: Write>(&self, writer: W, kind: ObjectKind, payload: &[u8]) -> io::Result<()> {
        let mut encoder = ZlibEncoder::new(writer, self.config.compression());
        encoder.write_all(&kind.header(payload.len()))?;
        encoder.write_all(payload)?;
        encoder.finish()?;
        Ok(())
    }

    fn inflate(id: &ObjectId, compressed: &[u8]) -> StoreResult<Vec<u8>> {
        let mut raw = Vec::new();
        ZlibDecoder::new(compressed)
            .read_to_end(&mut raw)
            .map_err(|e| StoreError::CorruptObject {
                id: *id,
                reason: format!("decompression failed: {e}"),
            })?;
        Ok(raw)
    }
}

impl ObjectStore for LooseObjectStore {
    fn get(&self, id: &ObjectId) -> StoreResult<Vec<u8>> {
        let path = self.object_path(id);
        let compressed = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(StoreError::NotFound(*id)),
            Err(e) => return Err(StoreError::io(path, e)),
        };

        let raw = Self::inflate(id, &compressed)?;
        let (kind, payload) = codec::decode(&raw).map_err(|e| StoreError::CorruptObject {
            id: *id,
            reason: e.to_string(),
        })?;
        if self.config.verify_on_read && !ContentHasher::for_kind(kind).verify(payload, id) {
            return Err(StoreError::CorruptObject {
                id: *id,
                reason: format!("content hashes to {}", ContentHasher::digest(kind, payload)),
            });
        }
        debug!(id = %id.short_hex(), bytes = raw.len(), "object read");
        Ok(raw)
    }

    fn put(&self, kind: ObjectKind, payload: &[u8]) -> StoreResult<ObjectId> {
        let id = ContentHasher::digest(kind, payload);
        let path = self.object_path(&id);
        if path.exists() {
            debug!(id = %id.short_hex(), %kind, "object already stored");
            return Ok(id);
        }
        self.write_object(&path, kind, payload)?;
        debug!(id = %id.short_hex(), %kind, size = payload.len(), "object written");
        Ok(id)
    }

    fn contains(&self, id: &ObjectId) -> StoreResult<bool> {
        let path = self.object_path(id);
        path.try_exists().map_err(|e| StoreError::io(path, e))
    }
}

impl std::fmt::Debug for LooseObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LooseObjectStore")
            .field("root", &self.root)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{EntryMode, Tree, TreeEntry};

    fn temp_store() -> (tempfile::TempDir, LooseObjectStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = LooseObjectStore::new(dir.path().join("objects"));
        (dir, store)
    }

    fn count_files(root: &Path) -> usize {
        fs::read_dir(root)
            .unwrap()
            .map(|d| fs::read_dir(d.unwrap().path()).unwrap().count())
            .sum()
    }

    #[test]
    fn hello_blob_roundtrip() {
        let (_dir, store) = temp_store();
        let id = store.put(ObjectKind::Blob, b"hello\n").unwrap();
        assert_eq!(id.to_hex(), "ce013625030ba8dba906f756967f9e9ca394464a");

        let path = store
            .root()
            .join("ce")
            .join("013625030ba8dba906f756967f9e9ca394464a");
        assert_eq!(store.object_path(&id), path);
        assert!(path.is_file());

        assert_eq!(store.get(&id).unwrap(), b"blob 6\0hello\n".to_vec());
        let obj = store.get_content(&id).unwrap();
        assert_eq!(obj.kind, ObjectKind::Blob);
        assert_eq!(obj.payload, b"hello\n");
    }

    #[test]
    fn file_holds_zlib_of_canonical_encoding() {
        let (_dir, store) = temp_store();
        let id = store.put(ObjectKind::Blob, b"hello\n").unwrap();
        let compressed = fs::read(store.object_path(&id)).unwrap();
        assert_eq!(compressed[0], 0x78, "zlib stream header");
        let mut raw = Vec::new();
        ZlibDecoder::new(compressed.as_slice())
            .read_to_end(&mut raw)
            .unwrap();
        assert_eq!(raw, b"blob 6\0hello\n");
    }

    #[test]
    fn double_put_leaves_one_file() {
        let (_dir, store) = temp_store();
        let id1 = store.put(ObjectKind::Blob, b"same").unwrap();
        let id2 = store.put(ObjectKind::Blob, b"same").unwrap();
        assert_eq!(id1, id2);
        assert_eq!(count_files(store.root()), 1);
    }

    #[test]
    fn missing_object_is_not_found() {
        let (_dir, store) = temp_store();
        let id = ObjectId::from_hash([0xab; 20]);
        assert!(matches!(store.get(&id), Err(StoreError::NotFound(_))));
        assert!(matches!(store.get_content(&id), Err(StoreError::NotFound(_))));
        assert!(!store.contains(&id).unwrap());
    }

    #[test]
    fn garbage_file_is_corrupt() {
        let (_dir, store) = temp_store();
        let id = ObjectId::from_hash([0xcd; 20]);
        let path = store.object_path(&id);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, b"definitely not zlib").unwrap();
        assert!(matches!(store.get(&id), Err(StoreError::CorruptObject { .. })));
    }

    #[test]
    fn headerless_content_is_corrupt() {
        let (_dir, store) = temp_store();
        let id = ObjectId::from_hash([0xef; 20]);
        let path = store.object_path(&id);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        let mut enc = ZlibEncoder::new(Vec::new(), flate2::Compression::default());
        enc.write_all(b"no header here").unwrap();
        fs::write(&path, enc.finish().unwrap()).unwrap();

        let err = store.get(&id).unwrap_err();
        assert!(matches!(err, StoreError::CorruptObject { reason, .. } if reason.contains("NUL")));
    }

    #[test]
    fn misplaced_object_fails_verification() {
        let (_dir, store) = temp_store();
        let real = store.put(ObjectKind::Blob, b"real").unwrap();
        let fake = ObjectId::from_hash([0x01; 20]);
        let fake_path = store.object_path(&fake);
        fs::create_dir_all(fake_path.parent().unwrap()).unwrap();
        fs::copy(store.object_path(&real), &fake_path).unwrap();

        assert!(matches!(store.get(&fake), Err(StoreError::CorruptObject { .. })));

        let lenient = LooseObjectStore::with_config(
            store.root(),
            StoreConfig {
                verify_on_read: false,
                ..Default::default()
            },
        );
        assert_eq!(lenient.get_content(&fake).unwrap().payload, b"real");
    }

    #[test]
    fn tree_roundtrip_through_disk() {
        let (_dir, store) = temp_store();
        let a = store.put(ObjectKind::Blob, b"a").unwrap();
        let tree = Tree::new(vec![
            TreeEntry::new(EntryMode::Regular, "b.txt", a),
            TreeEntry::new(EntryMode::Executable, "a.sh", a),
        ]);
        let id = store.put_object(&tree.to_stored_object().unwrap()).unwrap();
        let back = Tree::from_stored_object(&store.get_content(&id).unwrap()).unwrap();
        assert_eq!(back, tree);
        assert_eq!(back.entries[0].name, b"a.sh");
    }

    #[test]
    fn no_temp_files_left_behind() {
        let (_dir, store) = temp_store();
        for i in 0..20u8 {
            store.put(ObjectKind::Blob, &[i]).unwrap();
        }
        for dir in fs::read_dir(store.root()).unwrap() {
            for file in fs::read_dir(dir.unwrap().path()).unwrap() {
                let name = file.unwrap().file_name();
                assert_eq!(name.len(), 38, "unexpected file {name:?}");
            }
        }
    }

    #[test]
    fn concurrent_writers_of_same_object() {
        use std::sync::Arc;
        use std::thread;

        let (_dir, store) = temp_store();
        let store = Arc::new(store);
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || store.put(ObjectKind::Blob, b"contended").unwrap())
            })
            .collect();
        let ids: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(ids.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(store.get_content(&ids[0]).unwrap().payload, b"contended");
        assert_eq!(count_files(store.root()), 1);
    }

    #[test]
    fn compression_level_zero_still_readable() {
        let dir = tempfile::tempdir().unwrap();
        let store = LooseObjectStore::with_config(
            dir.path(),
            StoreConfig {
                compression_level: 0,
                fsync: true,
                ..Default::default()
            },
        );
        let id = store.put(ObjectKind::Commit, b"payload").unwrap();
        assert_eq!(store.get_content(&id).unwrap().kind, ObjectKind::Commit);
    }
}
