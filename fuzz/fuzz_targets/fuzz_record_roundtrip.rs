#![no_main]

//! Fuzz the record codec.
//!
//! Two strategies:
//! 1. Arbitrary bytes → `read_record` must not panic (a short or garbled
//!    stream is either a decoded record or a clean stop).
//! 2. Structured records → encode then decode must round-trip bit-exact.

use std::io::Cursor;

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use mstat_core::record_io::{read_record, write_record};
use mstat_types::{FieldId, Record, Schema};

#[derive(Debug, Arbitrary)]
struct FuzzInput {
    /// Raw bytes to feed the decoder (crash detection).
    raw: Vec<u8>,
    /// Raw bit patterns for a structured record.
    pid: u32,
    timestamp_bits: u64,
    metrics: [u64; 19],
}

fuzz_target!(|input: FuzzInput| {
    let schema = Schema::builtin();

    // Strategy 1: raw bytes must not panic the decoder.
    if input.raw.len() <= 65536 {
        let mut record = Record::default();
        let _ = read_record(&mut Cursor::new(&input.raw), &schema, &mut record);
    }

    // Strategy 2: round-trip (encode then decode) is bit-exact, NaN
    // payloads in the timestamp included.
    let mut original = Record::default();
    original.pid = input.pid;
    original.set_raw_bits(FieldId::Timestamp, input.timestamp_bits);
    for (id, bits) in FieldId::METRICS.iter().zip(input.metrics) {
        original.set_raw_bits(*id, bits);
    }

    let mut buf = Cursor::new(Vec::new());
    write_record(&mut buf, &schema, &original).expect("builtin schema always encodes");
    buf.set_position(0);

    let mut decoded = Record::default();
    let ok = read_record(&mut buf, &schema, &mut decoded).expect("in-memory read");
    assert!(ok, "a fully written record must decode");
    for id in FieldId::ALL {
        assert_eq!(
            decoded.raw_bits(id),
            original.raw_bits(id),
            "bit-pattern mismatch in {}",
            id.name()
        );
    }
});
