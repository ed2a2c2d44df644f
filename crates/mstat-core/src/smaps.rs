//! Sampling collaborator: reads a process's aggregated memory counters
//! from `/proc/<pid>/smaps_rollup` into a [`Record`].
//!
//! The rollup reports sizes in kB lines such as `Pss:  4 kB`; values are
//! converted to byte counts here so everything downstream speaks bytes.

use std::io::BufRead;
use std::path::PathBuf;

use mstat_error::{MstatError, Result};
use mstat_types::{FieldId, Record};
use tracing::debug;

/// Map one rollup key to the metric it feeds. Keys with no counterpart
/// (the leading address-range line, `LazyFree`) yield `None` and are
/// ignored.
#[must_use]
pub fn metric_for_key(key: &str) -> Option<FieldId> {
    match key {
        "Rss" => Some(FieldId::Rss),
        "Pss" => Some(FieldId::Pss),
        "Pss_Anon" => Some(FieldId::PssAnon),
        "Pss_File" => Some(FieldId::PssFile),
        "Pss_Shmem" => Some(FieldId::PssShmem),
        "Shared_Clean" => Some(FieldId::SharedClean),
        "Shared_Dirty" => Some(FieldId::SharedDirty),
        "Private_Clean" => Some(FieldId::PrivateClean),
        "Private_Dirty" => Some(FieldId::PrivateDirty),
        "Referenced" => Some(FieldId::Referenced),
        "Anonymous" => Some(FieldId::Anonymous),
        "AnonHugePages" => Some(FieldId::AnonHugePages),
        "ShmemPmdMapped" => Some(FieldId::ShmemPmdMapped),
        "FilePmdMapped" => Some(FieldId::FilePmdMapped),
        "Shared_Hugetlb" => Some(FieldId::SharedHugetlb),
        "Private_Hugetlb" => Some(FieldId::PrivateHugetlb),
        "Swap" => Some(FieldId::Swap),
        "SwapPss" => Some(FieldId::SwapPss),
        "Locked" => Some(FieldId::Locked),
        _ => None,
    }
}

/// Parse rollup text from `source`, overwriting the metric fields of
/// `record` with byte counts. Unrecognized lines (including the header
/// line naming the address range) are skipped.
pub fn parse_rollup<R: BufRead>(source: R, record: &mut Record) -> Result<()> {
    for line in source.lines() {
        let line = line?;
        let Some((key, rest)) = line.split_once(':') else {
            continue;
        };
        let Some(id) = metric_for_key(key.trim()) else {
            continue;
        };
        let kib = rest
            .trim()
            .trim_end_matches("kB")
            .trim()
            .parse::<u64>()
            .unwrap_or(0);
        record.set_raw_bits(id, kib.saturating_mul(1024));
    }
    Ok(())
}

fn rollup_path(pid: u32) -> PathBuf {
    PathBuf::from(format!("/proc/{pid}/smaps_rollup"))
}

/// Whether a process with this pid currently exists (its procfs entry is
/// present). Existence does not imply the rollup is readable.
#[must_use]
pub fn pid_running(pid: u32) -> bool {
    PathBuf::from(format!("/proc/{pid}")).exists()
}

/// Sample `pid`'s rollup into `record`, setting `record.pid` as well.
///
/// Any failure to open or read the rollup is reported as
/// [`MstatError::PidGone`]: the process exited, or its counters are not
/// accessible to us, and either way sampling it is over.
pub fn attach(record: &mut Record, pid: u32) -> Result<()> {
    let file = std::fs::File::open(rollup_path(pid)).map_err(|e| {
        debug!(pid, error = %e, "rollup unreadable");
        MstatError::PidGone { pid }
    })?;
    record.pid = pid;
    parse_rollup(std::io::BufReader::new(file), record)
        .map_err(|_| MstatError::PidGone { pid })
}
