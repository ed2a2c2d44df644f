//! File session: opens-or-creates a log and owns the stream handle and
//! cursor used by both the appending sampler and the scanning readers.

use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom};
use std::path::{Path, PathBuf};

use mstat_error::{MstatError, Result};
use mstat_types::{Record, Schema};
use tracing::debug;

use crate::header::Header;
use crate::record_io::{read_record, write_record};

/// An open log file: the parsed header snapshot plus the read/write
/// cursor. Single writer, sequential append; readers may scan the same
/// file while it is still being appended to.
#[derive(Debug)]
pub struct Session {
    file: File,
    header: Header,
    path: PathBuf,
}

impl Session {
    /// Open a log at `path`, creating it (with the built-in schema's
    /// header) if it does not exist. An existing file must carry the
    /// magic marker; anything else fails with
    /// [`MstatError::NotAMstatFile`] and leaves the file unmodified.
    /// The cursor ends up at the first data record.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut session = if path.exists() {
            Self::open_existing(path)?
        } else {
            Self::create(path)?
        };
        session.rewind()?;
        Ok(session)
    }

    fn create(path: &Path) -> Result<Self> {
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path)?;
        let header = Header::for_schema(Schema::builtin());
        header.write_to(&mut file)?;
        debug!(path = %path.display(), "log created");
        Ok(Self {
            file,
            header,
            path: path.to_path_buf(),
        })
    }

    fn open_existing(path: &Path) -> Result<Self> {
        let mut file = OpenOptions::new().read(true).write(true).open(path)?;
        if !Header::check_magic(&mut file)? {
            return Err(MstatError::NotAMstatFile {
                path: path.to_path_buf(),
            });
        }
        let header = Header::read_from(&mut file, path)?;
        debug!(
            path = %path.display(),
            fields = header.field_count(),
            "log opened"
        );
        Ok(Self {
            file,
            header,
            path: path.to_path_buf(),
        })
    }

    /// Seek the cursor to the start of the data region (the stored
    /// end-of-header offset). Idempotent: repeated calls always land on
    /// the same recorded offset.
    pub fn rewind(&mut self) -> Result<()> {
        self.file.seek(SeekFrom::Start(self.header.data_offset()))?;
        Ok(())
    }

    /// Decode the next record at the cursor. `Ok(false)` once no further
    /// complete record exists; a short tail left by a still-running
    /// writer is a clean stop, not corruption.
    pub fn iterate(&mut self, record: &mut Record) -> Result<bool> {
        read_record(&mut self.file, self.header.schema(), record)
    }

    /// Append one record at end-of-file, in the file's stored schema
    /// order. No rollback on a partial write.
    pub fn append(&mut self, record: &Record) -> Result<()> {
        self.file.seek(SeekFrom::End(0))?;
        write_record(&mut self.file, self.header.schema(), record)?;
        debug!(pid = record.pid, timestamp = record.timestamp, "record appended");
        Ok(())
    }

    /// Force appended records down to stable storage, so a concurrent
    /// reader sees up-to-date data without waiting for this writer to
    /// terminate. Safe to call any number of times.
    pub fn flush(&mut self) -> Result<()> {
        self.file.sync_data()?;
        Ok(())
    }

    /// Flush and release the handle.
    pub fn close(mut self) -> Result<()> {
        self.flush()?;
        debug!(path = %self.path.display(), "log closed");
        Ok(())
    }

    /// Count records by scanning to end-of-stream, leaving the cursor
    /// rewound to the first record. The format stores no record count.
    pub fn record_count(&mut self) -> Result<u64> {
        self.rewind()?;
        let mut record = Record::default();
        let mut count = 0u64;
        while self.iterate(&mut record)? {
            count += 1;
        }
        self.rewind()?;
        Ok(count)
    }

    /// The file's stored schema; authoritative for what names are legal.
    #[must_use]
    pub fn schema(&self) -> &Schema {
        self.header.schema()
    }

    /// Number of entries in the stored schema.
    #[must_use]
    pub fn field_count(&self) -> u32 {
        self.header.field_count()
    }

    /// Absolute offset of the data region.
    #[must_use]
    pub fn data_offset(&self) -> u64 {
        self.header.data_offset()
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Read, Seek, SeekFrom};

    use mstat_types::FieldValue;

    use super::*;

    fn temp_log(dir: &tempfile::TempDir, name: &str) -> PathBuf {
        dir.path().join(name)
    }

    #[test]
    fn fresh_file_has_builtin_schema() {
        let dir = tempfile::tempdir().expect("tempdir");
        let session = Session::open(temp_log(&dir, "a.dat")).expect("open");
        assert_eq!(session.field_count(), 21);
        assert_eq!(session.schema(), &Schema::builtin());
    }

    #[test]
    fn write_three_records_reopen_and_iterate() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = temp_log(&dir, "a.dat");

        let mut session = Session::open(&path).expect("open");
        for (i, rss) in [(0u64, 10u64), (1, 20), (2, 30)] {
            let mut record = Record::default();
            record.pid = 100;
            record.timestamp = i as f64;
            record.rss = rss;
            session.append(&record).expect("append");
        }
        session.close().expect("close");

        let mut session = Session::open(&path).expect("reopen");
        session.rewind().expect("rewind");
        let mut record = Record::default();
        for (i, rss) in [(0u64, 10u64), (1, 20), (2, 30)] {
            assert!(session.iterate(&mut record).expect("iterate"));
            assert_eq!(record.pid, 100);
            assert_eq!(record.timestamp, i as f64);
            assert_eq!(record.rss, rss);
        }
        assert!(
            !session.iterate(&mut record).expect("fourth iterate"),
            "stream must be exhausted after three records"
        );
    }

    #[test]
    fn open_rejects_foreign_file_without_modifying_it() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = temp_log(&dir, "foreign.bin");
        let junk = b"this is definitely not an mstat database, honest".to_vec();
        std::fs::write(&path, &junk).expect("write junk");

        let err = Session::open(&path).unwrap_err();
        assert!(matches!(err, MstatError::NotAMstatFile { .. }));

        let after = std::fs::read(&path).expect("reread");
        assert_eq!(after, junk, "failed open must not truncate or modify");
    }

    #[test]
    fn rewind_is_idempotent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = temp_log(&dir, "a.dat");
        let mut session = Session::open(&path).expect("open");

        let mut record = Record::default();
        record.pid = 1;
        session.append(&record).expect("append");
        session.append(&record).expect("append");

        session.rewind().expect("rewind");
        let first = session.file.stream_position().expect("pos");
        assert_eq!(first, session.data_offset());

        assert!(session.iterate(&mut record).expect("iterate"));
        session.rewind().expect("rewind again");
        assert_eq!(session.file.stream_position().expect("pos"), first);

        session.rewind().expect("rewind third");
        assert_eq!(session.file.stream_position().expect("pos"), first);
    }

    #[test]
    fn record_count_scans_then_rewinds() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut session = Session::open(temp_log(&dir, "a.dat")).expect("open");
        let mut record = Record::default();
        for _ in 0..5 {
            session.append(&record).expect("append");
        }
        assert_eq!(session.record_count().expect("count"), 5);
        // Cursor is back at the first record.
        assert!(session.iterate(&mut record).expect("iterate after count"));
    }

    #[test]
    fn reader_sees_records_appended_by_a_live_writer() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = temp_log(&dir, "a.dat");
        let mut writer = Session::open(&path).expect("writer open");

        let mut record = Record::default();
        record.rss = 1;
        writer.append(&record).expect("append");
        writer.flush().expect("flush");

        let mut reader = Session::open(&path).expect("reader open");
        let mut seen = Record::default();
        assert!(reader.iterate(&mut seen).expect("first"));
        assert!(!reader.iterate(&mut seen).expect("caught up"));

        // Writer appends more; the same reader picks it up on retry.
        record.rss = 2;
        writer.append(&record).expect("append");
        writer.flush().expect("flush");
        assert!(reader.iterate(&mut seen).expect("second"));
        assert_eq!(seen.rss, 2);
    }

    #[test]
    fn short_tail_record_stops_one_early() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = temp_log(&dir, "a.dat");
        let mut session = Session::open(&path).expect("open");
        let mut record = Record::default();
        record.rss = 42;
        session.append(&record).expect("append");
        session.append(&record).expect("append");
        session.close().expect("close");

        // Truncate mid-way through the second record.
        let file = OpenOptions::new().write(true).open(&path).expect("reopen");
        let len = file.metadata().expect("meta").len();
        file.set_len(len - 9).expect("truncate");

        let mut session = Session::open(&path).expect("open truncated");
        assert_eq!(session.record_count().expect("count"), 1);
    }

    #[test]
    fn same_field_yields_same_value_across_scans() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut session = Session::open(temp_log(&dir, "a.dat")).expect("open");
        let mut record = Record::default();
        record.pss = 4096;
        session.append(&record).expect("append");

        for _ in 0..2 {
            session.rewind().expect("rewind");
            let mut seen = Record::default();
            assert!(session.iterate(&mut seen).expect("iterate"));
            assert_eq!(seen.get_by_name("pss"), FieldValue::Integer(4096));
        }
    }

    #[test]
    fn open_positions_cursor_at_data_region() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = temp_log(&dir, "a.dat");
        {
            let mut session = Session::open(&path).expect("open");
            let mut record = Record::default();
            record.rss = 9;
            session.append(&record).expect("append");
        }
        let mut session = Session::open(&path).expect("reopen");
        // No explicit rewind: open already positioned us at the data.
        let mut record = Record::default();
        assert!(session.iterate(&mut record).expect("iterate"));
        assert_eq!(record.rss, 9);
    }

    #[test]
    fn truncated_header_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = temp_log(&dir, "a.dat");
        Session::open(&path).expect("create").close().expect("close");

        // Chop the file inside the field table.
        let file = OpenOptions::new().write(true).open(&path).expect("reopen");
        file.set_len(40).expect("truncate");

        let err = Session::open(&path).unwrap_err();
        assert!(matches!(err, MstatError::TruncatedHeader { .. }));
    }

    // Keep the raw layout honest: magic at 0, count at 0x08, EOH at 0x0C.
    #[test]
    fn on_disk_prefix_layout() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = temp_log(&dir, "a.dat");
        Session::open(&path).expect("create").close().expect("close");

        let mut file = File::open(&path).expect("open raw");
        let mut prefix = [0u8; 16];
        file.seek(SeekFrom::Start(0)).expect("seek");
        file.read_exact(&mut prefix).expect("read prefix");
        assert_eq!(&prefix[..8], b"MSTAT\0\0\0");
        assert_eq!(u32::from_le_bytes([prefix[8], prefix[9], prefix[10], prefix[11]]), 21);
        let eoh = u32::from_le_bytes([prefix[12], prefix[13], prefix[14], prefix[15]]);
        // First table entry follows the prefix: len("pid") then "pid".
        let mut entry = [0u8; 7];
        file.read_exact(&mut entry).expect("read entry");
        assert_eq!(&entry[..4], &3u32.to_le_bytes());
        assert_eq!(&entry[4..], b"pid");
        assert!(u64::from(eoh) > 16);
    }

    #[test]
    fn flush_and_close_are_safe_in_sequence() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut session = Session::open(temp_log(&dir, "a.dat")).expect("open");
        session.flush().expect("flush");
        session.flush().expect("flush again");
        session.close().expect("close");
    }
}
