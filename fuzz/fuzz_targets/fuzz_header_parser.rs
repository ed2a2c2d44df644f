#![no_main]

//! Fuzz the header parser.
//!
//! Arbitrary bytes fed to `Header::read_from` must never panic or
//! allocate unboundedly; any outcome other than a clean parse must be a
//! structured error.

use std::io::Cursor;
use std::path::Path;

use libfuzzer_sys::fuzz_target;

use mstat_core::Header;

fuzz_target!(|data: &[u8]| {
    let mut cursor = Cursor::new(data.to_vec());
    let _ = Header::check_magic(&mut cursor);
    let _ = Header::read_from(&mut cursor, Path::new("<fuzz>"));
});
