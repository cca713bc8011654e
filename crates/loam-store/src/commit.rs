//! Commit objects and their text payload format.
//!
//! ```text
//! parent <hex id>            (zero or more, in order)
//! tree <hex id>
//! author <name> <<email>> <unix seconds> <+HHMM>
//! committer <name> <<email>> <unix seconds> <+HHMM>
//!
//! <message>
//! ```

use std::fmt::Write as _;

use chrono::{DateTime, FixedOffset, Local, TimeZone};
use loam_types::{ObjectId, ObjectKind};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::object::StoredObject;

/// Name and email of a commit author or committer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub name: String,
    pub email: String,
}

impl Identity {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }

    fn validate(&self, role: &str) -> StoreResult<()> {
        let bad = |s: &str| s.contains(['<', '>', '\n']);
        if bad(&self.name) || bad(&self.email) {
            return Err(StoreError::InvalidFields(format!(
                "{role} identity may not contain '<', '>' or newlines"
            )));
        }
        Ok(())
    }
}

impl Default for Identity {
    fn default() -> Self {
        Self::new("loam", "loam@localhost")
    }
}

/// An identity stamped with a point in time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Signature {
    pub identity: Identity,
    pub when: DateTime<FixedOffset>,
}

impl Signature {
    pub fn new(identity: Identity, when: DateTime<FixedOffset>) -> Self {
        Self { identity, when }
    }

    fn write_line(&self, out: &mut String, role: &str) {
        // Writing to a String cannot fail.
        let _ = writeln!(
            out,
            "{role} {} <{}> {} {}",
            self.identity.name,
            self.identity.email,
            self.when.timestamp(),
            self.when.format("%z"),
        );
    }

    fn parse(value: &str) -> StoreResult<Self> {
        let malformed = || StoreError::MalformedCommit(format!("bad signature {value:?}"));
        let open = value.find('<').ok_or_else(malformed)?;
        let close = value[open..].find('>').ok_or_else(malformed)? + open;
        let name = value[..open].trim_end().to_string();
        let email = value[open + 1..close].to_string();

        let mut rest = value[close + 1..].split_whitespace();
        let seconds: i64 = rest
            .next()
            .and_then(|s| s.parse().ok())
            .ok_or_else(malformed)?;
        let offset = rest.next().and_then(parse_offset).ok_or_else(malformed)?;
        let when = offset
            .timestamp_opt(seconds, 0)
            .single()
            .ok_or_else(malformed)?;
        Ok(Self::new(Identity { name, email }, when))
    }
}

fn parse_offset(token: &str) -> Option<FixedOffset> {
    let (sign, digits) = match token.as_bytes().first()? {
        b'+' => (1, &token[1..]),
        b'-' => (-1, &token[1..]),
        _ => return None,
    };
    if digits.len() != 4 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let hours: i32 = digits[..2].parse().ok()?;
    let minutes: i32 = digits[2..].parse().ok()?;
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

/// Structured input for building a commit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommitFields {
    pub tree_id: ObjectId,
    pub parent_ids: Vec<ObjectId>,
    pub author: Identity,
    pub committer: Identity,
    pub message: String,
}

impl CommitFields {
    /// Fields with the same identity as author and committer.
    pub fn new(tree_id: ObjectId, identity: Identity, message: impl Into<String>) -> Self {
        Self {
            tree_id,
            parent_ids: Vec::new(),
            author: identity.clone(),
            committer: identity,
            message: message.into(),
        }
    }

    pub fn with_parent(mut self, parent: ObjectId) -> Self {
        self.parent_ids.push(parent);
        self
    }

    fn validate(&self) -> StoreResult<()> {
        if self.tree_id.is_null() {
            return Err(StoreError::InvalidFields("commit tree id is empty".into()));
        }
        if self.message.is_empty() {
            return Err(StoreError::InvalidFields("commit message is empty".into()));
        }
        self.author.validate("author")?;
        self.committer.validate("committer")
    }
}

/// A fully timestamped commit, as stored.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Commit {
    pub tree_id: ObjectId,
    pub parent_ids: Vec<ObjectId>,
    pub author: Signature,
    pub committer: Signature,
    /// Message text including its trailing newline.
    pub message: String,
}

impl Commit {
    /// Serialize into a commit payload.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = String::new();
        for parent in &self.parent_ids {
            let _ = writeln!(out, "parent {parent}");
        }
        let _ = writeln!(out, "tree {}", self.tree_id);
        self.author.write_line(&mut out, "author");
        self.committer.write_line(&mut out, "committer");
        out.push('\n');
        out.push_str(&self.message);
        out.into_bytes()
    }

    /// Convert into a `StoredObject` for storage.
    pub fn to_stored_object(&self) -> StoredObject {
        StoredObject::new(ObjectKind::Commit, self.encode())
    }

    /// Decode from a `StoredObject`.
    pub fn from_stored_object(obj: &StoredObject) -> StoreResult<Self> {
        obj.expect_kind(ObjectKind::Commit)?;
        decode_commit(&obj.payload)
    }
}

/// Build a commit payload, stamping author and committer with the current
/// wall-clock time and local UTC offset.
pub fn encode_commit(fields: &CommitFields) -> StoreResult<Vec<u8>> {
    let now = Local::now();
    encode_commit_at(fields, now.with_timezone(now.offset()))
}

/// Build a commit payload stamped with `when`.
pub fn encode_commit_at(fields: &CommitFields, when: DateTime<FixedOffset>) -> StoreResult<Vec<u8>> {
    Ok(build_commit(fields, when)?.encode())
}

/// Validate fields and assemble a [`Commit`] stamped with `when`.
pub fn build_commit(fields: &CommitFields, when: DateTime<FixedOffset>) -> StoreResult<Commit> {
    fields.validate()?;
    let mut message = fields.message.clone();
    if !message.ends_with('\n') {
        message.push('\n');
    }
    Ok(Commit {
        tree_id: fields.tree_id,
        parent_ids: fields.parent_ids.clone(),
        author: Signature::new(fields.author.clone(), when),
        committer: Signature::new(fields.committer.clone(), when),
        message,
    })
}

/// Parse a commit payload.
///
/// Header lines may appear in any order. Unrecognized headers (and their
/// continuation lines) are skipped.
pub fn decode_commit(payload: &[u8]) -> StoreResult<Commit> {
    let text = std::str::from_utf8(payload)
        .map_err(|_| StoreError::MalformedCommit("payload is not valid UTF-8".into()))?;
    let (headers, message) = match text.find("\n\n") {
        Some(split) => (&text[..split], &text[split + 2..]),
        None => {
            return Err(StoreError::MalformedCommit(
                "missing blank line before message".into(),
            ))
        }
    };

    let mut tree_id = None;
    let mut parent_ids = Vec::new();
    let mut author = None;
    let mut committer = None;

    for line in headers.lines() {
        let Some((key, value)) = line.split_once(' ') else {
            return Err(StoreError::MalformedCommit(format!("bad header line {line:?}")));
        };
        match key {
            "tree" => tree_id = Some(parse_id(value)?),
            "parent" => parent_ids.push(parse_id(value)?),
            "author" => author = Some(Signature::parse(value)?),
            "committer" => committer = Some(Signature::parse(value)?),
            "" => {} // continuation of a multi-line header
            other => debug!(header = other, "skipping unrecognized commit header"),
        }
    }

    let missing = |what: &str| StoreError::MalformedCommit(format!("missing {what} header"));
    Ok(Commit {
        tree_id: tree_id.ok_or_else(|| missing("tree"))?,
        parent_ids,
        author: author.ok_or_else(|| missing("author"))?,
        committer: committer.ok_or_else(|| missing("committer"))?,
        message: message.to_string(),
    })
}

fn parse_id(value: &str) -> StoreResult<ObjectId> {
    ObjectId::from_hex(value)
        .map_err(|e| StoreError::MalformedCommit(format!("bad object id {value:?}: {e}")))
}
