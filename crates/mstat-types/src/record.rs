//! One sample: process id, elapsed-time timestamp, and the 19 memory
//! metrics, plus the name/id indirection used by generic consumers.

use tracing::warn;

use crate::schema::FieldId;
use crate::value::FieldValue;

/// A single decoded sample.
///
/// All metric fields are byte counts. `pid` and `timestamp` carry the two
/// distinct semantic types of the format: integer identifier and
/// floating-point elapsed seconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Record {
    pub pid: u32,
    pub timestamp: f64,
    pub rss: u64,
    pub pss: u64,
    pub pss_anon: u64,
    pub pss_file: u64,
    pub pss_shmem: u64,
    pub shared_clean: u64,
    pub shared_dirty: u64,
    pub private_clean: u64,
    pub private_dirty: u64,
    pub referenced: u64,
    pub anonymous: u64,
    pub anon_huge_pages: u64,
    pub shmem_pmd_mapped: u64,
    pub file_pmd_mapped: u64,
    pub shared_hugetlb: u64,
    pub private_hugetlb: u64,
    pub swap: u64,
    pub swap_pss: u64,
    pub locked: u64,
}

impl Record {
    /// Typed field lookup by identifier. Total and panic-free: every
    /// `FieldId` maps to a value.
    #[must_use]
    pub const fn get(&self, id: FieldId) -> FieldValue {
        match id {
            FieldId::Pid => FieldValue::Integer(self.pid as u64),
            FieldId::Timestamp => FieldValue::Real(self.timestamp),
            _ => FieldValue::Integer(self.metric_bits(id)),
        }
    }

    /// Typed field lookup by symbolic name.
    ///
    /// An unrecognized name yields [`FieldValue::Missing`] (with a
    /// diagnostic) rather than failing the whole scan, so batch exporters
    /// can still emit a row when one field is absent.
    #[must_use]
    pub fn get_by_name(&self, name: &str) -> FieldValue {
        match FieldId::from_name(name) {
            Some(id) => self.get(id),
            None => {
                warn!(field = name, "unknown field requested");
                FieldValue::Missing
            }
        }
    }

    /// The field's raw on-disk bit pattern, widened to `u64`.
    #[must_use]
    pub fn raw_bits(&self, id: FieldId) -> u64 {
        match id {
            FieldId::Pid => self.pid as u64,
            FieldId::Timestamp => self.timestamp.to_bits(),
            _ => self.metric_bits(id),
        }
    }

    /// Overwrite a field from its raw on-disk bit pattern.
    #[allow(clippy::cast_possible_truncation)]
    pub fn set_raw_bits(&mut self, id: FieldId, bits: u64) {
        match id {
            FieldId::Pid => self.pid = bits as u32,
            FieldId::Timestamp => self.timestamp = f64::from_bits(bits),
            FieldId::Rss => self.rss = bits,
            FieldId::Pss => self.pss = bits,
            FieldId::PssAnon => self.pss_anon = bits,
            FieldId::PssFile => self.pss_file = bits,
            FieldId::PssShmem => self.pss_shmem = bits,
            FieldId::SharedClean => self.shared_clean = bits,
            FieldId::SharedDirty => self.shared_dirty = bits,
            FieldId::PrivateClean => self.private_clean = bits,
            FieldId::PrivateDirty => self.private_dirty = bits,
            FieldId::Referenced => self.referenced = bits,
            FieldId::Anonymous => self.anonymous = bits,
            FieldId::AnonHugePages => self.anon_huge_pages = bits,
            FieldId::ShmemPmdMapped => self.shmem_pmd_mapped = bits,
            FieldId::FilePmdMapped => self.file_pmd_mapped = bits,
            FieldId::SharedHugetlb => self.shared_hugetlb = bits,
            FieldId::PrivateHugetlb => self.private_hugetlb = bits,
            FieldId::Swap => self.swap = bits,
            FieldId::SwapPss => self.swap_pss = bits,
            FieldId::Locked => self.locked = bits,
        }
    }

    const fn metric_bits(&self, id: FieldId) -> u64 {
        match id {
            FieldId::Rss => self.rss,
            FieldId::Pss => self.pss,
            FieldId::PssAnon => self.pss_anon,
            FieldId::PssFile => self.pss_file,
            FieldId::PssShmem => self.pss_shmem,
            FieldId::SharedClean => self.shared_clean,
            FieldId::SharedDirty => self.shared_dirty,
            FieldId::PrivateClean => self.private_clean,
            FieldId::PrivateDirty => self.private_dirty,
            FieldId::Referenced => self.referenced,
            FieldId::Anonymous => self.anonymous,
            FieldId::AnonHugePages => self.anon_huge_pages,
            FieldId::ShmemPmdMapped => self.shmem_pmd_mapped,
            FieldId::FilePmdMapped => self.file_pmd_mapped,
            FieldId::SharedHugetlb => self.shared_hugetlb,
            FieldId::PrivateHugetlb => self.private_hugetlb,
            FieldId::Swap => self.swap,
            FieldId::SwapPss => self.swap_pss,
            FieldId::Locked => self.locked,
            // pid/timestamp are handled by the callers' outer match.
            FieldId::Pid | FieldId::Timestamp => 0,
        }
    }
}
