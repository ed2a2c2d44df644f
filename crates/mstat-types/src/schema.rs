//! The field-name registry: which fields a log's records contain, in
//! which order.
//!
//! The built-in schema is the fixed 21-name list every freshly created
//! log is stamped with. Once written into a file's header the stored
//! order is that file's contract; readers must follow it, not this
//! compiled-in constant.

use std::fmt;

/// Identifier for each built-in field of a record.
///
/// Discriminants match the built-in schema position, so
/// `FieldId::ALL[i] as usize == i`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[repr(u8)]
pub enum FieldId {
    Pid = 0,
    Timestamp,
    Rss,
    Pss,
    PssAnon,
    PssFile,
    PssShmem,
    SharedClean,
    SharedDirty,
    PrivateClean,
    PrivateDirty,
    Referenced,
    Anonymous,
    AnonHugePages,
    ShmemPmdMapped,
    FilePmdMapped,
    SharedHugetlb,
    PrivateHugetlb,
    Swap,
    SwapPss,
    Locked,
}

impl FieldId {
    /// Every built-in field, in schema order.
    pub const ALL: [Self; 21] = [
        Self::Pid,
        Self::Timestamp,
        Self::Rss,
        Self::Pss,
        Self::PssAnon,
        Self::PssFile,
        Self::PssShmem,
        Self::SharedClean,
        Self::SharedDirty,
        Self::PrivateClean,
        Self::PrivateDirty,
        Self::Referenced,
        Self::Anonymous,
        Self::AnonHugePages,
        Self::ShmemPmdMapped,
        Self::FilePmdMapped,
        Self::SharedHugetlb,
        Self::PrivateHugetlb,
        Self::Swap,
        Self::SwapPss,
        Self::Locked,
    ];

    /// The 19 memory metrics (everything except `pid` and `timestamp`).
    pub const METRICS: [Self; 19] = [
        Self::Rss,
        Self::Pss,
        Self::PssAnon,
        Self::PssFile,
        Self::PssShmem,
        Self::SharedClean,
        Self::SharedDirty,
        Self::PrivateClean,
        Self::PrivateDirty,
        Self::Referenced,
        Self::Anonymous,
        Self::AnonHugePages,
        Self::ShmemPmdMapped,
        Self::FilePmdMapped,
        Self::SharedHugetlb,
        Self::PrivateHugetlb,
        Self::Swap,
        Self::SwapPss,
        Self::Locked,
    ];

    /// The field's symbolic name as stored in a log header.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Pid => "pid",
            Self::Timestamp => "timestamp",
            Self::Rss => "rss",
            Self::Pss => "pss",
            Self::PssAnon => "pss_anon",
            Self::PssFile => "pss_file",
            Self::PssShmem => "pss_shmem",
            Self::SharedClean => "shared_clean",
            Self::SharedDirty => "shared_dirty",
            Self::PrivateClean => "private_clean",
            Self::PrivateDirty => "private_dirty",
            Self::Referenced => "referenced",
            Self::Anonymous => "anonymous",
            Self::AnonHugePages => "anon_huge_pages",
            Self::ShmemPmdMapped => "shmem_pmd_mapped",
            Self::FilePmdMapped => "file_pmd_mapped",
            Self::SharedHugetlb => "shared_hugetlb",
            Self::PrivateHugetlb => "private_hugetlb",
            Self::Swap => "swap",
            Self::SwapPss => "swap_pss",
            Self::Locked => "locked",
        }
    }

    /// Exact-match (case-sensitive) name lookup.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|id| id.name() == name)
    }

    /// On-disk width of this field's value in bytes.
    #[must_use]
    pub const fn width(self) -> usize {
        match self {
            Self::Pid => 4,
            _ => 8,
        }
    }
}

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An ordered sequence of unique field names.
///
/// Immutable once constructed; built once per file and passed explicitly
/// to the codecs. There is no process-wide mutable field table.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Schema {
    names: Vec<String>,
}

impl Schema {
    /// Build a schema from stored field names (e.g. read from a header).
    #[must_use]
    pub fn from_names(names: Vec<String>) -> Self {
        Self { names }
    }

    /// The built-in 21-field schema every fresh log is created with.
    #[must_use]
    pub fn builtin() -> Self {
        Self {
            names: FieldId::ALL.iter().map(|id| id.name().to_owned()).collect(),
        }
    }

    /// Number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Field names in schema order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// Whether `name` is present verbatim (case-sensitive, exact match).
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    /// Position of `name` in schema order, if present.
    #[must_use]
    pub fn position(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }
}

impl Default for Schema {
    fn default() -> Self {
        Self::builtin()
    }
}
