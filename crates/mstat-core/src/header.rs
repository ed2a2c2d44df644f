//! Header codec: the fixed prefix plus the field-name table at the start
//! of every log file.
//!
//! Layout (little-endian):
//! - `0x00..0x08` — magic marker, NUL-padded ASCII
//! - `0x08..0x0C` — field count, u32
//! - `0x0C..0x10` — end-of-header offset, u32
//! - `0x10..EOH`  — field table: u32 length + raw name bytes, per field
//!
//! A header is written once at file creation and is immutable afterward.
//! Readers parse it into an immutable [`Header`] snapshot up front, so no
//! later operation needs to save/restore the stream cursor to peek at it.

use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use mstat_error::{MstatError, Result};
use mstat_types::Schema;
use tracing::debug;

/// Magic marker identifying a file as an mstat log.
pub const MAGIC: [u8; 8] = *b"MSTAT\0\0\0";

/// Size of the fixed header prefix (magic + field count + EOH offset).
pub const HEADER_PREFIX_SIZE: usize = 0x10;

/// Upper bound on the stored field count; anything larger is treated as
/// a corrupt table rather than an allocation request.
const MAX_FIELD_COUNT: u32 = 0xFFFF;

/// Upper bound on a single stored field-name length.
const MAX_NAME_LEN: u32 = 0xFFFF;

/// Parsed, immutable header snapshot: the file's schema and where its
/// data region begins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    schema: Schema,
    data_offset: u32,
}

impl Header {
    /// Build the header a fresh file with `schema` would carry, computing
    /// the end-of-header offset from the field table size.
    #[must_use]
    pub fn for_schema(schema: Schema) -> Self {
        let table: usize = schema.names().map(|n| 4 + n.len()).sum();
        #[allow(clippy::cast_possible_truncation)]
        let data_offset = (HEADER_PREFIX_SIZE + table) as u32;
        Self {
            schema,
            data_offset,
        }
    }

    /// The stored field-name table.
    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Number of entries in the stored schema.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn field_count(&self) -> u32 {
        self.schema.len() as u32
    }

    /// Absolute byte offset where the data region begins.
    #[must_use]
    pub fn data_offset(&self) -> u64 {
        u64::from(self.data_offset)
    }

    /// Write the full header (prefix + field table) at offset 0.
    ///
    /// On failure the sink may hold a partial header; the caller must
    /// treat the file as corrupt.
    pub fn write_to<W: Write + Seek>(&self, sink: &mut W) -> Result<()> {
        sink.seek(SeekFrom::Start(0))?;

        let mut prefix = [0u8; HEADER_PREFIX_SIZE];
        prefix[..MAGIC.len()].copy_from_slice(&MAGIC);
        prefix[0x08..0x0C].copy_from_slice(&self.field_count().to_le_bytes());
        prefix[0x0C..0x10].copy_from_slice(&self.data_offset.to_le_bytes());
        sink.write_all(&prefix)?;

        for name in self.schema.names() {
            #[allow(clippy::cast_possible_truncation)]
            let len = name.len() as u32;
            sink.write_all(&len.to_le_bytes())?;
            sink.write_all(name.as_bytes())?;
        }

        debug!(
            fields = self.field_count(),
            data_offset = self.data_offset,
            "header written"
        );
        Ok(())
    }

    /// Check whether `source` starts with the magic marker.
    ///
    /// Reads exactly the fixed prefix at offset 0 and compares the magic
    /// bytes; the field count and table are not validated here. A file
    /// shorter than the prefix is simply not of this format.
    pub fn check_magic<R: Read + Seek>(source: &mut R) -> Result<bool> {
        source.seek(SeekFrom::Start(0))?;
        let mut prefix = [0u8; HEADER_PREFIX_SIZE];
        match source.read_exact(&mut prefix) {
            Ok(()) => Ok(prefix[..MAGIC.len()] == MAGIC),
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Parse the full header from `source` into a snapshot.
    ///
    /// `path` is only used for error reporting. Fails with
    /// [`MstatError::NotAMstatFile`] on a magic mismatch and
    /// [`MstatError::TruncatedHeader`] when the field table is
    /// inconsistent with the declared count or end-of-header offset.
    pub fn read_from<R: Read + Seek>(source: &mut R, path: &Path) -> Result<Self> {
        source.seek(SeekFrom::Start(0))?;
        let mut prefix = [0u8; HEADER_PREFIX_SIZE];
        source.read_exact(&mut prefix).map_err(|e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                MstatError::NotAMstatFile {
                    path: path.to_path_buf(),
                }
            } else {
                e.into()
            }
        })?;
        if prefix[..MAGIC.len()] != MAGIC {
            return Err(MstatError::NotAMstatFile {
                path: path.to_path_buf(),
            });
        }

        let field_count = u32::from_le_bytes([prefix[8], prefix[9], prefix[10], prefix[11]]);
        let data_offset = u32::from_le_bytes([prefix[12], prefix[13], prefix[14], prefix[15]]);
        if field_count > MAX_FIELD_COUNT {
            return Err(MstatError::truncated(format!(
                "implausible field count {field_count}"
            )));
        }
        if u64::from(data_offset) < HEADER_PREFIX_SIZE as u64 {
            return Err(MstatError::truncated(format!(
                "end-of-header offset {data_offset} precedes the field table"
            )));
        }

        let mut names = Vec::with_capacity(field_count as usize);
        let mut pos = HEADER_PREFIX_SIZE as u64;
        for index in 0..field_count {
            let mut len_buf = [0u8; 4];
            source.read_exact(&mut len_buf).map_err(|e| short_entry(index, e))?;
            let len = u32::from_le_bytes(len_buf);
            if len > MAX_NAME_LEN {
                return Err(MstatError::truncated(format!(
                    "field {index}: implausible name length {len}"
                )));
            }
            pos += 4 + u64::from(len);
            if pos > u64::from(data_offset) {
                return Err(MstatError::truncated(format!(
                    "field {index} runs past the declared end-of-header offset"
                )));
            }
            let mut name = vec![0u8; len as usize];
            source.read_exact(&mut name).map_err(|e| short_entry(index, e))?;
            let name = String::from_utf8(name).map_err(|_| {
                MstatError::truncated(format!("field {index}: name is not valid UTF-8"))
            })?;
            names.push(name);
        }
        if pos != u64::from(data_offset) {
            return Err(MstatError::truncated(format!(
                "field table ends at {pos}, header declares {data_offset}"
            )));
        }

        debug!(fields = field_count, data_offset, "header parsed");
        Ok(Self {
            schema: Schema::from_names(names),
            data_offset,
        })
    }
}

fn short_entry(index: u32, e: std::io::Error) -> MstatError {
    if e.kind() == std::io::ErrorKind::UnexpectedEof {
        MstatError::truncated(format!("field table ends early at entry {index}"))
    } else {
        e.into()
    }
}
