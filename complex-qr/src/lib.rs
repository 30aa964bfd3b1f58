//! Complex Householder QR factorization
//!
//! Factor a dense complex m×n matrix (m ≥ n) into an m×m unitary `Q` and an
//! m×n upper-trapezoidal `R` with `A = Q R`.
//!
//! ```
//! use complex_qr::{factor, verify, ComplexMatrix};
//! use num_complex::Complex64;
//!
//! let a = ComplexMatrix::from_fn(4, 3, |i, j| {
//!     Complex64::new((i + 1) as f64, (j + 1) as f64)
//! });
//! let f = factor(&a, true)?;
//! let check = verify(&a, &f.r, f.q.as_ref().unwrap())?;
//! assert!(check.passed);
//! # Ok::<(), complex_qr::QrError>(())
//! ```

pub mod config;
pub mod error;
pub mod gemm;
pub mod householder;
pub mod io;
pub mod job;
pub mod matrix;
pub mod verify;

pub use config::Config;
pub use error::{QrError, Result};
pub use householder::{factor, factor_interleaved, flop_count, Factorization};
pub use job::{factor_fast, factor_full, FullJob, FullReport, JobOutcome, MatrixSlot};
pub use matrix::ComplexMatrix;
pub use verify::{verify, verify_with, Tolerances, Verification};
