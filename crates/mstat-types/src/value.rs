use std::fmt;

/// A value extracted from a record by the field accessor.
///
/// Replaces the untyped union-plus-`u64::MAX` convention: a lookup that
/// fails yields [`FieldValue::Missing`], which cannot be confused with a
/// legitimate maximum-integer reading.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum FieldValue {
    /// An unsigned byte count (every field except the timestamp).
    Integer(u64),
    /// Elapsed seconds (the `timestamp` field).
    Real(f64),
    /// The requested field/id is not part of this record.
    Missing,
}

impl FieldValue {
    /// Returns true for the sentinel "missing" marker.
    #[must_use]
    pub const fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }

    /// Try to extract an integer reading.
    #[must_use]
    pub const fn as_integer(&self) -> Option<u64> {
        match self {
            Self::Integer(v) => Some(*v),
            _ => None,
        }
    }

    /// Try to extract a floating-point reading.
    #[must_use]
    pub const fn as_real(&self) -> Option<f64> {
        match self {
            Self::Real(v) => Some(*v),
            _ => None,
        }
    }

    /// Numeric coercion for plotting: integers widen to `f64`, missing
    /// values read as zero.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn to_f64(&self) -> f64 {
        match self {
            Self::Integer(v) => *v as f64,
            Self::Real(v) => *v,
            Self::Missing => 0.0,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(v) => write!(f, "{v}"),
            Self::Real(v) => write!(f, "{v:.6}"),
            // An absent field renders as an empty CSV cell.
            Self::Missing => Ok(()),
        }
    }
}
