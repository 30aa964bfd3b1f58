//! Post-hoc checks on a computed factorization

use num_complex::Complex64;

use crate::error::{QrError, Result};
use crate::matrix::ComplexMatrix;

/// Acceptance thresholds for [`verify_with`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tolerances {
    /// Upper bound on `‖Q·R − A‖_F`
    pub reconstruction: f64,
    /// Upper bound on `|Re det(QᴴQ) − 1|` and `|Im det(QᴴQ)|`
    pub determinant: f64,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            reconstruction: 1e-8,
            determinant: 1e-10,
        }
    }
}

/// Residuals of one verification run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Verification {
    /// `‖Q·R − A‖_F`
    pub reconstruction_error: f64,
    /// `‖Qᴴ·Q − I‖_F`
    pub unitarity_error: f64,
    /// `det(Qᴴ·Q)`
    pub determinant: Complex64,
    pub passed: bool,
}

/// Check `A = Q R` and the unitarity of Q against the default tolerances.
pub fn verify(a: &ComplexMatrix, r: &ComplexMatrix, q: &ComplexMatrix) -> Result<Verification> {
    verify_with(a, r, q, &Tolerances::default())
}

/// [`verify`] with caller-supplied thresholds. Inputs are never modified.
pub fn verify_with(
    a: &ComplexMatrix,
    r: &ComplexMatrix,
    q: &ComplexMatrix,
    tol: &Tolerances,
) -> Result<Verification> {
    let (m, _) = a.shape();
    if r.shape() != a.shape() {
        return Err(QrError::mismatch("verify", a.shape(), r.shape()));
    }
    if q.shape() != (m, m) {
        return Err(QrError::mismatch("verify", (m, m), q.shape()));
    }

    let reconstruction_error = q.times(r)?.minus(a)?.norm();

    let qhq = q.adjoint().times(q)?;
    let unitarity_error = qhq.minus(&ComplexMatrix::identity(m))?.norm();
    let determinant = qhq.determinant()?;

    let passed = reconstruction_error < tol.reconstruction
        && (determinant.re - 1.0).abs() < tol.determinant
        && determinant.im.abs() < tol.determinant;

    log::debug!(
        "verify {}x{}: |QR - A| = {:e}, |QhQ - I| = {:e}, det(QhQ) = {}",
        a.rows(),
        a.cols(),
        reconstruction_error,
        unitarity_error,
        determinant
    );

    Ok(Verification {
        reconstruction_error,
        unitarity_error,
        determinant,
        passed,
    })
}
