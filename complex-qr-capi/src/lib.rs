//! C API for complex-qr
//!
//! Matrices cross the boundary as interleaved row-major `double` buffers:
//! element (i, j) of an m×n matrix is at `2·(n·i + j)` (real) and
//! `2·(n·i + j) + 1` (imaginary).
//!
//! Every entry point catches panics; none unwinds into the caller.

use complex_qr::QrError;

mod factor;
mod gemm;

pub use factor::*;
pub use gemm::*;

/// Status code returned by every entry point
pub type StatusCode = libc::c_int;

pub const CQR_SUCCESS: StatusCode = 0;
/// Non-positive sizes, or rows < cols
pub const CQR_INVALID_DIMENSION: StatusCode = -2;
pub const CQR_DIMENSION_MISMATCH: StatusCode = -3;
pub const CQR_FACTORIZATION_FAILURE: StatusCode = -5;
/// Null pointer argument
pub const CQR_INVALID_ARGUMENT: StatusCode = -6;
pub const CQR_INTERNAL_ERROR: StatusCode = -7;

pub(crate) fn status_of(err: &QrError) -> StatusCode {
    match err {
        QrError::Configuration(_) => CQR_INVALID_DIMENSION,
        QrError::DimensionMismatch { .. } => CQR_DIMENSION_MISMATCH,
        QrError::SingularMatrix { .. } | QrError::FactorizationFailure { .. } => {
            CQR_FACTORIZATION_FAILURE
        }
        QrError::JobInFlight | QrError::Io(_) => CQR_INTERNAL_ERROR,
    }
}

/// Validate C dimensions, returning them as `usize`
pub(crate) fn checked_dims(rows: libc::c_int, cols: libc::c_int) -> Option<(usize, usize)> {
    if rows <= 0 || cols <= 0 || rows < cols {
        return None;
    }
    Some((rows as usize, cols as usize))
}
