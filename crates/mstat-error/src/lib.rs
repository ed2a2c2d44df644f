use std::path::PathBuf;

use thiserror::Error;

/// Primary error type for mstat log operations.
///
/// Structured variants for the cases callers branch on, with `From` for
/// plain I/O faults. End-of-stream is deliberately *not* an error: the
/// record reader reports it as a clean `Ok(false)`.
#[derive(Error, Debug)]
pub enum MstatError {
    /// Magic marker mismatch on open; the file is not of this format.
    #[error("{path}: not an mstat database")]
    NotAMstatFile { path: PathBuf },

    /// Underlying seek/read/write failure. Surfaced as-is; no retry.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The header's field table is inconsistent with its declared
    /// count or end-of-header offset.
    #[error("truncated header: {detail}")]
    TruncatedHeader { detail: String },

    /// A schema name with no known on-disk width was asked to be written.
    #[error("unknown field: {name}")]
    UnknownField { name: String },

    /// The sampled process (or its smaps_rollup file) disappeared.
    #[error("no such process: {pid}")]
    PidGone { pid: u32 },
}

impl MstatError {
    /// Create a truncated-header error.
    pub fn truncated(detail: impl Into<String>) -> Self {
        Self::TruncatedHeader {
            detail: detail.into(),
        }
    }

    /// Create an unknown-field error.
    pub fn unknown_field(name: impl Into<String>) -> Self {
        Self::UnknownField { name: name.into() }
    }

    /// Process exit code for this error (for CLI use).
    ///
    /// Code 2 is reserved for usage errors in the binaries, so no
    /// variant maps to it; a script can tell "bad invocation" apart
    /// from "bad file".
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Io(_) => 1,
            Self::NotAMstatFile { .. } => 3,
            Self::TruncatedHeader { .. } => 4,
            Self::UnknownField { .. } => 5,
            Self::PidGone { .. } => 6,
        }
    }

    /// Whether opening a different file (or a fresh one) could succeed.
    pub const fn is_format_error(&self) -> bool {
        matches!(
            self,
            Self::NotAMstatFile { .. } | Self::TruncatedHeader { .. }
        )
    }
}

/// Result type alias using `MstatError`.
pub type Result<T> = std::result::Result<T, MstatError>;
