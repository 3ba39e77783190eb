//! Entity and property-key types persisted by a [`crate::core::Store`].
//!
//! See spec §3 DATA MODEL. Identity for each entity kind is documented on
//! the corresponding row type; ids are opaque, store-assigned `u64`s.

use std::fmt;

/// Opaque id of a `String` row, unique by `(text, context)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StringId(pub u64);

/// Opaque id of a `File` row, unique by `(namespace, job_id, relative_path)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileId(pub u64);

/// Opaque id of an `Item` row, unique by `(file_id, string_id)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemId(pub u64);

/// Opaque id of a `Translation` row, unique by `(item_id, language)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TranslationId(pub u64);

/// Opaque id of a `Property` row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PropertyId(pub u64);

/// Logical partition within the store allowing multiple projects to share
/// it. Cloned cheaply and used as part of `File` and job-fingerprint
/// identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Namespace(pub String);

impl Namespace {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A job's own identifier, distinct from its namespace: several jobs can
/// share a namespace (see §9's job-id-qualification open question).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobId(pub String);

impl JobId {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-row monotone update sequence number used as a change oracle for TS
/// regeneration gating (§4.5, §8 invariant 8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Usn(pub u64);

/// A `String` entity: identity is `(text, context)`. Content is immutable
/// once created; only `skip` may change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringRow {
    pub text: String,
    pub context: String,
    pub skip: bool,
}

/// A `File` entity: identity is `(namespace, job_id, relative_path)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRow {
    pub namespace: Namespace,
    pub job_id: JobId,
    pub relative_path: String,
    pub orphaned: bool,
}

/// An `Item` entity: "this string appears in this file". Items persist
/// across runs; only `orphaned` is flipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemRow {
    pub file_id: FileId,
    pub string_id: StringId,
    pub hint: String,
    pub comment: String,
    pub orphaned: bool,
    /// Plural form of the owning string's `text`, if it was extracted as
    /// plural-capable (spec §4.3 `ExtractedString::plural`, used by TS
    /// emission to decide between `msgid`/`msgid_plural` forms).
    pub plural: Option<String>,
}

/// A `Translation` entity: identity is `(item_id, language)`.
///
/// `merge == true` means "pending upstream merge; ignore incoming update
/// once" (§4.4, §9 open question — resolved as: skip the entire incoming
/// block once).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationRow {
    pub item_id: ItemId,
    pub language: String,
    pub string: String,
    pub fuzzy: bool,
    pub comment: String,
    pub merge: bool,
}

/// A typed key-space over the property families used by the engine
/// (§3, §9 design note: "model as a typed key-space enumeration to avoid
/// string-keyed footguns").
///
/// `Display` renders the exact string form a `Store` implementation may
/// choose to persist under, matching the families listed in spec §3/§9.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PropertyKey {
    /// `source:<file_id>` — normalized content hash at last successful parse.
    Source(FileId),
    /// `hash:<file_id>` — content hash used for rename detection.
    Hash(FileId),
    /// `items:<file_id>` — ordered, comma-separated item ids.
    Items(FileId),
    /// `size:<file_id>` — file size in bytes at last successful parse.
    Size(FileId),
    /// `ts:<file_id>:<lang>` — hash of the last-ingested/emitted TS text.
    Ts(FileId, String),
    /// `ts:<file_id>:<lang>:count` — item count written to the TS file.
    TsCount(FileId, String),
    /// `usn:<file_id>:<lang>` — USN as of the last TS emission.
    Usn(FileId, String),
    /// `target:<file_id>:<job_id>:<lang>` — hash of the last-written localized file.
    Target(FileId, JobId, String),
    /// `target:mtime:<file_id>:<job_id>:<lang>` — mtime after the last write.
    TargetMtime(FileId, JobId, String),
    /// `source:<file_id>:<job_id>:<lang>` — source hash as of last localized emission
    /// for this job/lang (job-id qualified; see §9 open question on the
    /// target/source asymmetry).
    SourceForTarget(FileId, JobId, String),
    /// `source:ts:<file_id>:<job_id>:<lang>` — ts hash as of last localized emission.
    SourceTsForTarget(FileId, JobId, String),
    /// `job-hash:<namespace>:<job_id>` — job fingerprint hash.
    JobHash(Namespace, JobId),
    /// `job-engine:<namespace>:<job_id>` — engine version at last successful run.
    JobEngine(Namespace, JobId),
    /// `job-plugin:<namespace>:<job_id>` — parser-plugin version at last successful run.
    JobPlugin(Namespace, JobId),
}

impl fmt::Display for PropertyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyKey::Source(id) => write!(f, "source:{}", id.0),
            PropertyKey::Hash(id) => write!(f, "hash:{}", id.0),
            PropertyKey::Items(id) => write!(f, "items:{}", id.0),
            PropertyKey::Size(id) => write!(f, "size:{}", id.0),
            PropertyKey::Ts(id, lang) => write!(f, "ts:{}:{}", id.0, lang),
            PropertyKey::TsCount(id, lang) => write!(f, "ts:{}:{}:count", id.0, lang),
            PropertyKey::Usn(id, lang) => write!(f, "usn:{}:{}", id.0, lang),
            PropertyKey::Target(id, job, lang) => {
                write!(f, "target:{}:{}:{}", id.0, job, lang)
            }
            PropertyKey::TargetMtime(id, job, lang) => {
                write!(f, "target:mtime:{}:{}:{}", id.0, job, lang)
            }
            PropertyKey::SourceForTarget(id, job, lang) => {
                write!(f, "source:{}:{}:{}", id.0, job, lang)
            }
            PropertyKey::SourceTsForTarget(id, job, lang) => {
                write!(f, "source:ts:{}:{}:{}", id.0, job, lang)
            }
            PropertyKey::JobHash(ns, job) => write!(f, "job-hash:{}:{}", ns, job),
            PropertyKey::JobEngine(ns, job) => write!(f, "job-engine:{}:{}", ns, job),
            PropertyKey::JobPlugin(ns, job) => write!(f, "job-plugin:{}:{}", ns, job),
        }
    }
}
