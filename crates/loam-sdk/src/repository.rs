use std::fs;
use std::path::{Path, PathBuf};

use loam_crypto::ContentHasher;
use loam_store::{
    encode_commit, Blob, Commit, CommitFields, Identity, LooseObjectStore, ObjectStore,
    StoredObject, Tree, TreeEntry,
};
use loam_types::{ObjectId, ObjectKind};
use tracing::{debug, info};

use crate::config::RepoConfig;
use crate::error::{SdkError, SdkResult};
use crate::worktree::{self, GIT_DIR};

const OBJECTS_DIR: &str = "objects";
const REFS_DIR: &str = "refs";
const CONFIG_FILE: &str = "loam.toml";

/// A work tree plus its `.git/objects` store.
pub struct Repository {
    worktree: PathBuf,
    git_dir: PathBuf,
    config: RepoConfig,
    store: LooseObjectStore,
}

impl Repository {
    /// Create the `.git/objects` and `.git/refs` directories under `path`,
    /// write a default `loam.toml` if there is none, and open the result.
    /// Running it on an existing repository is harmless.
    pub fn init(path: impl AsRef<Path>) -> SdkResult<Self> {
        let git_dir = path.as_ref().join(GIT_DIR);
        for dir in [git_dir.join(OBJECTS_DIR), git_dir.join(REFS_DIR)] {
            fs::create_dir_all(&dir).map_err(|e| SdkError::io(&dir, e))?;
        }
        let config_path = git_dir.join(CONFIG_FILE);
        if !config_path.exists() {
            RepoConfig::default().save(&config_path)?;
        }
        info!(git_dir = %git_dir.display(), "initialized repository");
        Self::open(path)
    }

    /// Open an existing repository rooted at `path`.
    pub fn open(path: impl AsRef<Path>) -> SdkResult<Self> {
        let worktree = path.as_ref().to_path_buf();
        let git_dir = worktree.join(GIT_DIR);
        let objects = git_dir.join(OBJECTS_DIR);
        if !objects.is_dir() {
            return Err(SdkError::NotInitialized(worktree));
        }
        let config = RepoConfig::load(&git_dir.join(CONFIG_FILE))?;
        let store = LooseObjectStore::with_config(objects, config.store.clone());
        Ok(Self {
            worktree,
            git_dir,
            config,
            store,
        })
    }

    /// Replace the identity used for new commits.
    pub fn with_identity(mut self, identity: Identity) -> Self {
        self.config.user = identity;
        self
    }

    pub fn worktree(&self) -> &Path {
        &self.worktree
    }

    pub fn git_dir(&self) -> &Path {
        &self.git_dir
    }

    pub fn config(&self) -> &RepoConfig {
        &self.config
    }

    pub fn store(&self) -> &LooseObjectStore {
        &self.store
    }

    // ---- Content operations ----

    /// Blob id of `data`, stored only if `write` is set.
    pub fn hash_object(&self, data: &[u8], write: bool) -> SdkResult<ObjectId> {
        if write {
            Ok(self.store.put(ObjectKind::Blob, data)?)
        } else {
            Ok(ContentHasher::BLOB.hash(data))
        }
    }

    /// Blob id of the file at `path`, stored only if `write` is set.
    pub fn hash_file(&self, path: impl AsRef<Path>, write: bool) -> SdkResult<ObjectId> {
        let path = path.as_ref();
        let blob = Blob::new(fs::read(path).map_err(|e| SdkError::io(path, e))?);
        if write {
            Ok(self.store.put_object(&blob.into_stored_object())?)
        } else {
            Ok(blob.id())
        }
    }

    /// Read and decode any object.
    pub fn cat_file(&self, id: &ObjectId) -> SdkResult<StoredObject> {
        Ok(self.store.get_content(id)?)
    }

    /// Kind of a stored object.
    pub fn object_kind(&self, id: &ObjectId) -> SdkResult<ObjectKind> {
        Ok(self.cat_file(id)?.kind)
    }

    /// Payload size of a stored object, in bytes.
    pub fn object_size(&self, id: &ObjectId) -> SdkResult<u64> {
        Ok(self.cat_file(id)?.size)
    }

    pub fn read_blob(&self, id: &ObjectId) -> SdkResult<Vec<u8>> {
        let obj = self.read_kind(id, ObjectKind::Blob)?;
        Ok(Blob::from_stored_object(&obj)?.data)
    }

    /// Entries of a tree object, in stored order.
    pub fn ls_tree(&self, id: &ObjectId) -> SdkResult<Vec<TreeEntry>> {
        Ok(self.read_tree(id)?.entries)
    }

    pub fn read_tree(&self, id: &ObjectId) -> SdkResult<Tree> {
        let obj = self.read_kind(id, ObjectKind::Tree)?;
        Ok(Tree::from_stored_object(&obj)?)
    }

    pub fn read_commit(&self, id: &ObjectId) -> SdkResult<Commit> {
        let obj = self.read_kind(id, ObjectKind::Commit)?;
        Ok(Commit::from_stored_object(&obj)?)
    }

    fn read_kind(&self, id: &ObjectId, expected: ObjectKind) -> SdkResult<StoredObject> {
        let obj = self.store.get_content(id)?;
        if obj.kind != expected {
            return Err(SdkError::WrongKind {
                id: *id,
                expected,
                actual: obj.kind,
            });
        }
        Ok(obj)
    }

    // ---- Snapshot operations ----

    /// Snapshot the whole work tree and return the root tree id.
    pub fn write_tree(&self) -> SdkResult<ObjectId> {
        self.write_tree_from(&self.worktree)
    }

    /// Store every file under `dir` as a blob and every directory as a tree,
    /// bottom-up, returning the id of the tree for `dir`.
    pub fn write_tree_from(&self, dir: &Path) -> SdkResult<ObjectId> {
        let mut entries = Vec::new();
        for entry in worktree::read_level(dir)? {
            let id = match entry.read_content()? {
                Some(content) => self.store.put(ObjectKind::Blob, &content)?,
                None => self.write_tree_from(entry.path())?,
            };
            entries.push(TreeEntry::new(entry.mode, entry.name, id));
        }
        let tree = Tree::new(entries);
        let id = self.store.put_object(&tree.to_stored_object()?)?;
        debug!(dir = %dir.display(), id = %id.short_hex(), entries = tree.len(), "tree written");
        Ok(id)
    }

    /// Create a commit pointing at `tree` with the configured identity as
    /// author and committer.
    pub fn commit_tree(
        &self,
        tree: ObjectId,
        parents: &[ObjectId],
        message: &str,
    ) -> SdkResult<ObjectId> {
        self.read_kind(&tree, ObjectKind::Tree)?;
        for parent in parents {
            self.read_kind(parent, ObjectKind::Commit)?;
        }
        let fields = CommitFields {
            tree_id: tree,
            parent_ids: parents.to_vec(),
            author: self.config.user.clone(),
            committer: self.config.user.clone(),
            message: message.to_string(),
        };
        let payload = encode_commit(&fields)?;
        let id = self.store.put(ObjectKind::Commit, &payload)?;
        info!(id = %id.short_hex(), tree = %tree.short_hex(), parents = parents.len(), "commit created");
        Ok(id)
    }
}

impl std::fmt::Debug for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("worktree", &self.worktree)
            .finish()
    }
}
