//! Core data model for mstat memory-usage logs.
//!
//! An mstat log is a self-describing binary file: a header embedding the
//! ordered field-name table (the [`Schema`]), followed by back-to-back
//! fixed-width [`Record`]s. This crate defines that data model plus the
//! name/id indirection ([`FieldId`], [`FieldValue`]) that lets consumers
//! request a field generically instead of hard-coding record offsets.

pub mod record;
pub mod schema;
pub mod value;

pub use record::Record;
pub use schema::{FieldId, Schema};
pub use value::FieldValue;
