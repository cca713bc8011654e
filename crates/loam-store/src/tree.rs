//! Tree objects and their binary payload format.
//!
//! A tree payload is a concatenation of records with no separator:
//!
//! ```text
//! <mode as decimal ascii> SP <name> NUL <20 raw digest bytes>
//! ```
//!
//! Records are written in ascending byte-wise `name` order. Names are raw
//! bytes: anything but NUL and `/` is allowed, UTF-8 or not.

use std::borrow::Cow;
use std::fmt;

use loam_types::{ObjectId, ObjectKind, OBJECT_ID_LEN};
use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};
use crate::object::StoredObject;

const S_IFMT: u32 = 0o170000;
const S_IFREG: u32 = 0o100000;
const S_IFLNK: u32 = 0o120000;
const S_IFDIR: u32 = 0o040000;

/// File mode for a tree entry.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryMode {
    /// Subtree / directory (`40000`).
    Directory,
    /// Normal file (`100644`).
    Regular,
    /// Executable file (`100755`).
    Executable,
    /// Symbolic link (`120000`).
    Symlink,
    /// Any other numeric mode, kept verbatim so it re-encodes byte for byte.
    Unknown(String),
}

impl EntryMode {
    /// The mode token as written in a tree payload.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Directory => "40000",
            Self::Regular => "100644",
            Self::Executable => "100755",
            Self::Symlink => "120000",
            Self::Unknown(token) => token,
        }
    }

    /// Parse a mode token. Returns `None` unless the token is non-empty
    /// decimal digits.
    pub fn parse(token: &[u8]) -> Option<Self> {
        if token.is_empty() || !token.iter().all(u8::is_ascii_digit) {
            return None;
        }
        Some(match token {
            b"40000" => Self::Directory,
            b"100644" => Self::Regular,
            b"100755" => Self::Executable,
            b"120000" => Self::Symlink,
            // Digits only, so this is valid UTF-8.
            other => Self::Unknown(String::from_utf8_lossy(other).into_owned()),
        })
    }

    /// Map a raw `st_mode` to a tree entry mode.
    ///
    /// Regular files become `100755` if any execute bit is set and `100644`
    /// otherwise; other permission bits are ignored. Returns `None` for
    /// sockets, fifos and devices.
    pub fn from_mode_bits(st_mode: u32) -> Option<Self> {
        match st_mode & S_IFMT {
            S_IFREG if st_mode & 0o111 != 0 => Some(Self::Executable),
            S_IFREG => Some(Self::Regular),
            S_IFLNK => Some(Self::Symlink),
            S_IFDIR => Some(Self::Directory),
            _ => None,
        }
    }

    /// The kind of object an entry with this mode refers to.
    pub fn entry_kind(&self) -> EntryKind {
        match self {
            Self::Directory => EntryKind::Tree,
            Self::Regular | Self::Executable | Self::Symlink => EntryKind::Blob,
            Self::Unknown(_) => EntryKind::Unknown,
        }
    }

    fn is_valid(&self) -> bool {
        match self {
            Self::Unknown(token) => Self::parse(token.as_bytes()).is_some(),
            _ => true,
        }
    }
}

impl fmt::Display for EntryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Object kind implied by an entry's mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Blob,
    Tree,
    /// Unrecognized mode; decoded without error.
    Unknown,
}

impl EntryKind {
    /// The concrete object kind, if known.
    pub fn object_kind(&self) -> Option<ObjectKind> {
        match self {
            Self::Blob => Some(ObjectKind::Blob),
            Self::Tree => Some(ObjectKind::Tree),
            Self::Unknown => None,
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Blob => "blob",
            Self::Tree => "tree",
            Self::Unknown => "unknown",
        })
    }
}

/// A single entry in a tree object.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeEntry {
    /// File mode (regular, executable, symlink, directory, or unknown).
    pub mode: EntryMode,
    /// Entry name (filename or directory name) as raw bytes.
    pub name: Vec<u8>,
    /// Content-addressed ID of the referenced object.
    pub object_id: ObjectId,
}

impl TreeEntry {
    /// Create a new tree entry.
    pub fn new(mode: EntryMode, name: impl Into<Vec<u8>>, object_id: ObjectId) -> Self {
        Self {
            mode,
            name: name.into(),
            object_id,
        }
    }

    /// Create a tree entry from a hex id, failing instead of panicking on a
    /// malformed id.
    pub fn from_hex(mode: EntryMode, name: impl Into<Vec<u8>>, hex: &str) -> StoreResult<Self> {
        Ok(Self::new(mode, name, ObjectId::from_hex(hex)?))
    }

    /// The kind of object this entry refers to.
    pub fn kind(&self) -> EntryKind {
        self.mode.entry_kind()
    }

    /// The name for display. Invalid UTF-8 is replaced with U+FFFD.
    pub fn name_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.name)
    }
}

impl PartialOrd for TreeEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TreeEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.name
            .cmp(&other.name)
            .then_with(|| self.object_id.cmp(&other.object_id))
    }
}

/// Encode entries into a tree payload.
///
/// Entries must already be in strictly ascending byte-wise name order; the
/// encoder does not re-sort. Out-of-order or duplicate names, names that are
/// empty or contain NUL or `/`, and non-numeric modes are rejected with
/// `InvalidFields`.
pub fn encode_tree(entries: &[TreeEntry]) -> StoreResult<Vec<u8>> {
    let mut out = Vec::with_capacity(entries.len() * (OBJECT_ID_LEN + 32));
    let mut prev: Option<&[u8]> = None;
    for entry in entries {
        validate_name(&entry.name)?;
        if !entry.mode.is_valid() {
            return Err(StoreError::InvalidFields(format!(
                "tree entry {:?} has non-numeric mode {:?}",
                entry.name_lossy(),
                entry.mode.as_str()
            )));
        }
        if let Some(prev) = prev {
            if prev >= entry.name.as_slice() {
                let reason = if prev == entry.name.as_slice() {
                    "duplicate"
                } else {
                    "out of order"
                };
                return Err(StoreError::InvalidFields(format!(
                    "tree entry {:?} is {reason} after {:?}",
                    entry.name_lossy(),
                    String::from_utf8_lossy(prev)
                )));
            }
        }
        out.extend_from_slice(entry.mode.as_str().as_bytes());
        out.push(b' ');
        out.extend_from_slice(&entry.name);
        out.push(0);
        out.extend_from_slice(entry.object_id.as_bytes());
        prev = Some(entry.name.as_slice());
    }
    Ok(out)
}

/// Decode a tree payload into its entries, in payload order.
///
/// Sort order is not re-checked.
pub fn decode_tree(payload: &[u8]) -> StoreResult<Vec<TreeEntry>> {
    let mut entries = Vec::new();
    let mut offset = 0;
    while offset < payload.len() {
        let rest = &payload[offset..];
        let malformed = |reason: String| StoreError::MalformedTree { offset, reason };

        let space = rest
            .iter()
            .position(|&b| b == b' ')
            .ok_or_else(|| malformed("missing space after mode".into()))?;
        let mode = EntryMode::parse(&rest[..space]).ok_or_else(|| {
            malformed(format!(
                "invalid mode {:?}",
                String::from_utf8_lossy(&rest[..space])
            ))
        })?;

        let name_start = space + 1;
        let nul = rest[name_start..]
            .iter()
            .position(|&b| b == 0)
            .ok_or_else(|| malformed("missing NUL after name".into()))?;
        let name = rest[name_start..name_start + nul].to_vec();

        let id_start = name_start + nul + 1;
        let available = rest.len() - id_start;
        if available < OBJECT_ID_LEN {
            return Err(malformed(format!(
                "truncated object id for {:?}: {available} of {OBJECT_ID_LEN} bytes",
                String::from_utf8_lossy(&name)
            )));
        }
        let object_id = ObjectId::from_slice(&rest[id_start..id_start + OBJECT_ID_LEN])?;

        entries.push(TreeEntry {
            mode,
            name,
            object_id,
        });
        offset += id_start + OBJECT_ID_LEN;
    }
    Ok(entries)
}

fn validate_name(name: &[u8]) -> StoreResult<()> {
    if name.is_empty() {
        return Err(StoreError::InvalidFields("tree entry has an empty name".into()));
    }
    if name.iter().any(|&b| b == 0 || b == b'/') {
        return Err(StoreError::InvalidFields(format!(
            "tree entry name {:?} contains NUL or '/'",
            String::from_utf8_lossy(name)
        )));
    }
    Ok(())
}

/// Directory listing object.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tree {
    /// Entries in ascending name order.
    pub entries: Vec<TreeEntry>,
}

impl Tree {
    /// Create a new tree with the given entries.
    ///
    /// Entries are sorted by name, so callers can pass them in filesystem
    /// order.
    pub fn new(mut entries: Vec<TreeEntry>) -> Self {
        entries.sort();
        Self { entries }
    }

    /// Create a tree whose entries are already sorted. Order is checked when
    /// the tree is encoded.
    pub fn from_sorted(entries: Vec<TreeEntry>) -> Self {
        Self { entries }
    }

    /// Create an empty tree.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Encode the entries into a tree payload.
    pub fn encode(&self) -> StoreResult<Vec<u8>> {
        encode_tree(&self.entries)
    }

    /// Convert into a `StoredObject` for storage.
    pub fn to_stored_object(&self) -> StoreResult<StoredObject> {
        Ok(StoredObject::new(ObjectKind::Tree, self.encode()?))
    }

    /// Decode from a `StoredObject`.
    pub fn from_stored_object(obj: &StoredObject) -> StoreResult<Self> {
        obj.expect_kind(ObjectKind::Tree)?;
        Ok(Self {
            entries: decode_tree(&obj.payload)?,
        })
    }

    /// Look up an entry by name. Decoded trees keep payload order, which
    /// need not be sorted, so this is a linear scan.
    pub fn get(&self, name: impl AsRef<[u8]>) -> Option<&TreeEntry> {
        let name = name.as_ref();
        self.entries.iter().find(|e| e.name == name)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the tree has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
