//! Core I/O layer for mstat memory-usage logs.
//!
//! The on-disk layout is:
//! ```text
//! [Header prefix: 16 bytes — magic, field count, end-of-header offset]
//! [Field table: per field, u32 length + name bytes]
//! [Record 0: fixed-width values in stored field order]
//! [Record 1]
//! ...
//! ```
//! All integers are little-endian. Records are back-to-back with no
//! per-record length prefix; the only way to count them is a sequential
//! scan, which is what [`Session::iterate`] provides.

pub mod header;
pub mod record_io;
pub mod session;
pub mod smaps;

pub use header::Header;
pub use session::Session;
