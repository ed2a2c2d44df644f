//! Record codec: fixed-width encode/decode of one sample, driven by a
//! file's stored schema order.
//!
//! The stored order is authoritative. Decoding walks the schema the file
//! declares, never a compiled-in field order, so a log written with a
//! permuted or extended schema still reads correctly by name.

use std::io::{Read, Write};

use mstat_error::{MstatError, Result};
use mstat_types::{FieldId, Record, Schema};

/// On-disk width in bytes of the named field's value.
///
/// `pid` is the one 4-byte field; every other value, including names this
/// build does not recognize, occupies 8 bytes.
#[must_use]
pub fn width_of(name: &str) -> usize {
    FieldId::from_name(name).map_or(8, FieldId::width)
}

/// Serialize `record` to `sink`, one write per field, in `schema` order.
///
/// Fails at the first field that cannot be fully written; the sink is
/// then left with a partial record appended (no rollback). A schema name
/// with no known width cannot be encoded and yields
/// [`MstatError::UnknownField`] before anything is written for it.
pub fn write_record<W: Write>(sink: &mut W, schema: &Schema, record: &Record) -> Result<()> {
    for name in schema.names() {
        let Some(id) = FieldId::from_name(name) else {
            return Err(MstatError::unknown_field(name));
        };
        match id {
            FieldId::Pid => sink.write_all(&record.pid.to_le_bytes())?,
            FieldId::Timestamp => sink.write_all(&record.timestamp.to_le_bytes())?,
            _ => sink.write_all(&record.raw_bits(id).to_le_bytes())?,
        }
    }
    Ok(())
}

/// Decode one record from `source` into `record`, in `schema` order.
///
/// Returns `Ok(true)` on a full decode and `Ok(false)` once the stream
/// holds no further complete record — clean end-of-stream, or a short
/// tail partway through a record (a writer may still be appending it).
/// `Err` is reserved for real I/O faults. Values are taken bit-for-bit;
/// no per-field range validation is applied. Fields stored in the file
/// but unknown to this build are skipped over by their width.
pub fn read_record<R: Read>(source: &mut R, schema: &Schema, record: &mut Record) -> Result<bool> {
    for name in schema.names() {
        let width = width_of(name);
        let mut buf = [0u8; 8];
        if read_full(source, &mut buf[..width])? < width {
            return Ok(false);
        }
        match FieldId::from_name(name) {
            Some(FieldId::Pid) => {
                record.pid = u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]);
            }
            Some(id) => record.set_raw_bits(id, u64::from_le_bytes(buf)),
            None => {}
        }
    }
    Ok(true)
}

/// Fill `buf` as far as the stream allows, returning the bytes read.
///
/// Unlike `read_exact`, a short read here is an answer, not an error.
fn read_full<R: Read>(source: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match source.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
