//! Error type shared by every layer of the crate

use thiserror::Error;

/// Errors raised by the matrix algebra, the factorization engine and the
/// surrounding job/config/file plumbing.
#[derive(Debug, Error)]
pub enum QrError {
    /// Malformed or out-of-range parameter, or rows < cols.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Operation invoked on incompatible shapes.
    #[error("dimension mismatch in {op}: {left:?} vs {right:?}")]
    DimensionMismatch {
        op: &'static str,
        left: (usize, usize),
        right: (usize, usize),
    },

    /// Elimination met a pivot below the singular floor.
    #[error("singular matrix: pivot modulus {pivot:e} below floor")]
    SingularMatrix { pivot: f64 },

    /// Numerical fault while building or applying a reflector.
    #[error("factorization failed at column {column}: {reason}")]
    FactorizationFailure { column: usize, reason: String },

    /// A full factorization is already running against this matrix.
    #[error("a factorization job is already in flight for this matrix")]
    JobInFlight,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, QrError>;

impl QrError {
    pub(crate) fn mismatch(op: &'static str, left: (usize, usize), right: (usize, usize)) -> Self {
        QrError::DimensionMismatch { op, left, right }
    }
}
