//! Complex Householder QR factorization
//!
//! For each pivot column k a reflector `H = I - τ v vᴴ` (with `v[0] = 1`)
//! maps the sub-column `x = A[k.., k]` onto `β e₁`. The phase of `β` is the
//! negated phase of `x[0]`:
//!
//! ```text
//! β = -(x₀/|x₀|) ‖x‖          (x₀/|x₀| := 1 when x₀ = 0)
//! v = (x - β e₁) / (x₀ - β)
//! τ = 1 + |x₀| / ‖x‖
//! ```
//!
//! `x₀ - β = (x₀/|x₀|)(|x₀| + ‖x‖)` is a sum of two non-negative magnitudes,
//! so the leading component never cancels. `τ` is real and `H` is Hermitian
//! and unitary. A sub-column whose entries below the pivot are all zero is
//! already reduced and gets the identity reflector (`τ = 0`).
//!
//! With `R = H_{n-1} ⋯ H₀ A` the unitary factor is `Q = H₀ H₁ ⋯ H_{n-1}`,
//! accumulated by post-multiplying an identity-seeded Q, so `A = Q R`.

use std::time::Instant;

use num_complex::Complex64;
use num_traits::{One, Zero};

use crate::error::{QrError, Result};
use crate::matrix::ComplexMatrix;

/// Householder reflector `H = I - τ v vᴴ`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reflector {
    /// Reflection coefficient, in [1, 2]
    pub tau: f64,
    /// Value left on the diagonal, `H x = β e₁`
    pub beta: Complex64,
}

/// Output of [`factor`]
#[derive(Debug, Clone)]
pub struct Factorization {
    /// m×n upper-trapezoidal factor
    pub r: ComplexMatrix,
    /// m×m unitary factor, present when it was requested
    pub q: Option<ComplexMatrix>,
    /// Wall time of the reflector loop alone, in microseconds
    pub elapsed_micros: u64,
}

impl Factorization {
    /// Throughput in Mflop/s based on [`flop_count`], `None` when the run
    /// was too short to time.
    pub fn mflops(&self) -> Option<f64> {
        if self.elapsed_micros == 0 {
            return None;
        }
        let (m, n) = self.r.shape();
        Some(flop_count(m, n) as f64 / self.elapsed_micros as f64)
    }
}

/// Real floating point operations of an R-only factorization of an m×n
/// complex matrix: `(m n² - n³/3)/2` complex multiply-adds for the dot
/// products and as many for the rank-1 updates, 16 real flops per pair.
pub fn flop_count(m: usize, n: usize) -> u64 {
    let (m, n) = (m as u64, n as u64);
    let k = (m * n * n).saturating_sub(n * n * n / 3) / 2;
    16 * k
}

/// Factor `a` into `Q R`.
///
/// `a` is not modified. With `compute_q == false` only R is produced, which
/// roughly halves the work. Nothing partial is returned on failure.
pub fn factor(a: &ComplexMatrix, compute_q: bool) -> Result<Factorization> {
    let (m, n) = a.shape();
    check_dimensions(m, n)?;

    let mut r = a.deep_copy();
    let mut q = compute_q.then(|| ComplexMatrix::identity(m));
    let elapsed_micros = factor_in_place(&mut r, q.as_mut())?;

    Ok(Factorization {
        r,
        q,
        elapsed_micros,
    })
}

/// Flat kernel entry point over interleaved buffers.
///
/// `flat_a` (length `2·m·n`) is overwritten with R. When `compute_q` is set
/// the reflections are accumulated into `flat_q` (length `2·m·m`), which the
/// caller must have seeded with the identity; otherwise `flat_q` is neither
/// read nor written and may be empty. Neither buffer is touched when an
/// error is returned.
///
/// Returns the elapsed time of the numerical work in microseconds.
pub fn factor_interleaved(
    flat_a: &mut [f64],
    flat_q: &mut [f64],
    m: usize,
    n: usize,
    compute_q: bool,
) -> Result<u64> {
    check_dimensions(m, n)?;

    let mut work = ComplexMatrix::from_interleaved(flat_a, m, n)?;
    let mut q = if compute_q {
        Some(ComplexMatrix::from_interleaved(flat_q, m, m)?)
    } else {
        None
    };

    let elapsed = factor_in_place(&mut work, q.as_mut())?;

    work.write_interleaved(flat_a)?;
    if let Some(q) = q {
        q.write_interleaved(flat_q)?;
    }
    Ok(elapsed)
}

/// Reduce `work` to R in place, post-multiplying `q` by every reflector.
///
/// On error `work` and `q` hold an intermediate state; callers that need
/// all-or-nothing semantics run this on copies (as [`factor`] does).
pub fn factor_in_place(work: &mut ComplexMatrix, mut q: Option<&mut ComplexMatrix>) -> Result<u64> {
    let (m, n) = work.shape();
    check_dimensions(m, n)?;
    if let Some(q) = q.as_deref() {
        if q.shape() != (m, m) {
            return Err(QrError::mismatch("factor", (m, m), q.shape()));
        }
    }

    if let Some((i, j)) = first_non_finite(work) {
        return Err(QrError::FactorizationFailure {
            column: j,
            reason: format!("non-finite input entry {} at ({i}, {j})", work[(i, j)]),
        });
    }

    log::debug!(
        "starting complex householder: {}x{}, compute_q = {}",
        m,
        n,
        q.is_some()
    );

    let mut v = vec![Complex64::zero(); m];
    let mut w = vec![Complex64::zero(); n];

    let start = Instant::now();

    for k in 0..n {
        let len = m - k;
        let x = &mut v[..len];
        for (i, xi) in x.iter_mut().enumerate() {
            *xi = work[(k + i, k)];
        }

        let Some(refl) = reflector(x, k)? else {
            continue;
        };
        let v = &v[..len];

        apply_left(work, v, refl.tau, k, &mut w);

        work[(k, k)] = refl.beta;
        for i in (k + 1)..m {
            work[(i, k)] = Complex64::zero();
        }

        if let Some(q) = q.as_deref_mut() {
            apply_right(q, v, refl.tau, k);
        }
    }

    let elapsed = start.elapsed().as_micros() as u64;

    // overflow in the trailing updates can land above the diagonal, where no
    // later pivot column reads it
    if let Some((i, j)) = first_non_finite(work) {
        return Err(QrError::FactorizationFailure {
            column: j,
            reason: format!("overflow in R at ({i}, {j})"),
        });
    }

    log::debug!("householder time, usec: {}", elapsed);
    Ok(elapsed)
}

/// Build the reflector for the sub-column `x` in place.
///
/// On success `x` holds `v` (with `x[0] = 1`). Returns `None`, leaving `x`
/// untouched, when the entries below the pivot are all zero.
pub fn reflector(x: &mut [Complex64], column: usize) -> Result<Option<Reflector>> {
    let Some((&alpha, tail)) = x.split_first() else {
        return Ok(None);
    };

    let mut scale = 0.0f64;
    for z in x.iter() {
        if !(z.re.is_finite() && z.im.is_finite()) {
            return Err(QrError::FactorizationFailure {
                column,
                reason: format!("non-finite entry {z} in pivot column"),
            });
        }
    }
    for z in tail {
        scale = scale.max(z.norm());
    }
    if scale == 0.0 {
        return Ok(None);
    }

    // scaled sum of squares avoids overflow for large entries
    let sum: f64 = tail.iter().map(|z| (*z / scale).norm_sqr()).sum();
    let tail_norm = scale * sum.sqrt();
    let alpha_abs = alpha.norm();
    let xnorm = alpha_abs.hypot(tail_norm);
    if !xnorm.is_finite() || xnorm == 0.0 {
        return Err(QrError::FactorizationFailure {
            column,
            reason: format!("column norm {xnorm} is not usable"),
        });
    }

    let phase = if alpha_abs == 0.0 {
        Complex64::one()
    } else {
        alpha / alpha_abs
    };
    let beta = -phase * xnorm;
    // 1/(α − β) with α − β = φ(|α| + ‖x‖) and |φ| = 1
    let inv_u0 = phase.conj() / (alpha_abs + xnorm);

    x[0] = Complex64::one();
    for xi in &mut x[1..] {
        *xi *= inv_u0;
    }

    let tau = 1.0 + alpha_abs / xnorm;
    Ok(Some(Reflector { tau, beta }))
}

/// Apply `H = I - τ v vᴴ` from the left to columns `k+1..n`, rows `k..m`.
///
/// `w` is scratch of length at least `n`.
fn apply_left(work: &mut ComplexMatrix, v: &[Complex64], tau: f64, k: usize, w: &mut [Complex64]) {
    let n = work.cols();
    if k + 1 >= n {
        return;
    }
    let w = &mut w[..n - k - 1];
    w.fill(Complex64::zero());

    let data = work.as_mut_slice();

    // w = vᴴ A[k.., k+1..]
    for (i, vi) in v.iter().enumerate() {
        let vi_conj = vi.conj();
        let row = &data[(k + i) * n + k + 1..(k + i + 1) * n];
        for (wj, aij) in w.iter_mut().zip(row) {
            *wj += vi_conj * aij;
        }
    }

    // A[k.., k+1..] -= τ v w
    for (i, vi) in v.iter().enumerate() {
        let tv = *vi * tau;
        let row = &mut data[(k + i) * n + k + 1..(k + i + 1) * n];
        for (aij, wj) in row.iter_mut().zip(w.iter()) {
            *aij -= tv * wj;
        }
    }
}

/// Q ← Q H, touching columns `k..m` of every row.
fn apply_right(q: &mut ComplexMatrix, v: &[Complex64], tau: f64, k: usize) {
    let m = q.cols();
    let data = q.as_mut_slice();
    for row in data.chunks_exact_mut(m) {
        let seg = &mut row[k..k + v.len()];
        let s: Complex64 = seg.iter().zip(v).map(|(qi, vi)| qi * vi).sum();
        if s.is_zero() {
            continue;
        }
        let ts = s * tau;
        for (qi, vi) in seg.iter_mut().zip(v) {
            *qi -= ts * vi.conj();
        }
    }
}

/// Position of the first entry with a NaN or infinite part, row-major order
fn first_non_finite(a: &ComplexMatrix) -> Option<(usize, usize)> {
    let n = a.cols();
    a.as_slice()
        .iter()
        .position(|z| !(z.re.is_finite() && z.im.is_finite()))
        .map(|p| (p / n, p % n))
}

fn check_dimensions(m: usize, n: usize) -> Result<()> {
    if n == 0 || m < n {
        return Err(QrError::mismatch("factor", (m, n), (n.max(1), n.max(1))));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(re: f64, im: f64) -> Complex64 {
        Complex64::new(re, im)
    }

    #[test]
    fn test_reflector_real_vector() {
        let mut x = vec![c(3.0, 0.0), c(4.0, 0.0), c(0.0, 0.0)];
        let refl = reflector(&mut x, 0).unwrap().unwrap();

        // β = -5, u0 = 3 + 5 = 8, v = [1, 0.5, 0], τ = 1 + 3/5
        assert!((refl.beta - c(-5.0, 0.0)).norm() < 1e-14);
        assert!((refl.tau - 1.6).abs() < 1e-14);
        assert!((x[0] - c(1.0, 0.0)).norm() < 1e-14);
        assert!((x[1] - c(0.5, 0.0)).norm() < 1e-14);
        assert!(x[2].norm() < 1e-14);
    }

    #[test]
    fn test_reflector_maps_onto_first_axis() {
        let original = vec![c(0.0, 2.0), c(1.0, -1.0), c(-0.5, 0.25)];
        let mut v = original.clone();
        let refl = reflector(&mut v, 0).unwrap().unwrap();

        // H x = x - τ v (vᴴ x)
        let vhx: Complex64 = v.iter().zip(&original).map(|(vi, xi)| vi.conj() * xi).sum();
        let hx: Vec<Complex64> = original
            .iter()
            .zip(&v)
            .map(|(xi, vi)| xi - vi * vhx * refl.tau)
            .collect();

        assert!((hx[0] - refl.beta).norm() < 1e-14);
        assert!(hx[1].norm() < 1e-14);
        assert!(hx[2].norm() < 1e-14);

        // β carries the negated phase of x₀ = 2i
        let norm = original.iter().map(|z| z.norm_sqr()).sum::<f64>().sqrt();
        assert!((refl.beta - c(0.0, -norm)).norm() < 1e-14);
    }

    #[test]
    fn test_reflector_zero_leading_entry() {
        let mut x = vec![c(0.0, 0.0), c(0.0, 3.0)];
        let refl = reflector(&mut x, 0).unwrap().unwrap();
        assert!((refl.beta - c(-3.0, 0.0)).norm() < 1e-14);
        assert!((refl.tau - 1.0).abs() < 1e-14);
    }

    #[test]
    fn test_reflector_degenerate() {
        let mut zero = vec![Complex64::zero(); 4];
        assert!(reflector(&mut zero, 2).unwrap().is_none());
        assert!(zero.iter().all(|z| z.is_zero()));

        let mut reduced = vec![c(1.0, -1.0), Complex64::zero()];
        assert!(reflector(&mut reduced, 0).unwrap().is_none());
        assert_eq!(reduced[0], c(1.0, -1.0));

        let mut single = vec![c(2.0, 0.0)];
        assert!(reflector(&mut single, 0).unwrap().is_none());
    }

    #[test]
    fn test_reflector_non_finite() {
        let mut x = vec![c(1.0, 0.0), c(f64::NAN, 0.0)];
        match reflector(&mut x, 3) {
            Err(QrError::FactorizationFailure { column, .. }) => assert_eq!(column, 3),
            other => panic!("expected FactorizationFailure, got {other:?}"),
        }
    }

    #[test]
    fn test_reflector_large_entries() {
        let mut x = vec![c(1e200, 0.0), c(1e200, 0.0)];
        let refl = reflector(&mut x, 0).unwrap().unwrap();
        assert!(refl.beta.re.is_finite());
        assert!((refl.beta.re / 1e200 + 2f64.sqrt()).abs() < 1e-14);
        assert!(x[1].re.is_finite() && x[1].re > 0.0);
    }

    #[test]
    fn test_factor_identity() {
        let a = ComplexMatrix::identity(5);
        let f = factor(&a, true).unwrap();
        assert_eq!(f.r, a);
        assert_eq!(f.q.unwrap(), a);
    }

    #[test]
    fn test_factor_r_only() {
        let a = ComplexMatrix::from_fn(6, 4, |i, j| c((i * j) as f64 + 1.0, i as f64 - j as f64));
        let fast = factor(&a, false).unwrap();
        let full = factor(&a, true).unwrap();
        assert!(fast.q.is_none());
        // same reflectors, so the same R bit for bit
        assert_eq!(fast.r, full.r);
    }

    #[test]
    fn test_factor_reconstructs() {
        let a = ComplexMatrix::from_fn(5, 3, |i, j| {
            c(((i + 2 * j) % 5) as f64 - 1.5, ((3 * i + j) % 4) as f64 * 0.5)
        });
        let f = factor(&a, true).unwrap();
        let q = f.q.unwrap();
        let err = q.times(&f.r).unwrap().minus(&a).unwrap().norm();
        assert!(err < 1e-12, "reconstruction error {err}");

        for j in 0..3 {
            for i in (j + 1)..5 {
                assert_eq!(f.r[(i, j)], Complex64::zero());
            }
        }
    }

    #[test]
    fn test_factor_zero_column() {
        // column 1 is zero below (and on) the diagonal after step 0
        let a = ComplexMatrix::from_fn(4, 3, |i, j| match j {
            1 => Complex64::zero(),
            _ => c(i as f64 + 1.0, j as f64),
        });
        let f = factor(&a, true).unwrap();
        assert!(f.r.as_slice().iter().all(|z| z.re.is_finite() && z.im.is_finite()));
        let q = f.q.unwrap();
        let err = q.times(&f.r).unwrap().minus(&a).unwrap().norm();
        assert!(err < 1e-12);
    }

    #[test]
    fn test_factor_does_not_mutate_input() {
        let a = ComplexMatrix::from_fn(4, 4, |i, j| c(i as f64, j as f64 + 1.0));
        let before = a.deep_copy();
        let _ = factor(&a, true).unwrap();
        assert_eq!(a, before);
    }

    #[test]
    fn test_factor_rejects_wide() {
        let a = ComplexMatrix::zeros(2, 3);
        assert!(matches!(factor(&a, false), Err(QrError::DimensionMismatch { .. })));
        assert!(factor(&ComplexMatrix::zeros(3, 0), false).is_err());
    }

    #[test]
    fn test_factor_failure_returns_nothing() {
        let mut a = ComplexMatrix::identity(3);
        a.set(2, 0, c(f64::INFINITY, 0.0));
        assert!(matches!(
            factor(&a, true),
            Err(QrError::FactorizationFailure { column: 0, .. })
        ));
    }

    #[test]
    fn test_factor_rejects_nan_above_diagonal() {
        // column 1 below the diagonal is already reduced, so no pivot
        // sub-column ever contains the NaN
        let a = ComplexMatrix::from_rows(&[
            vec![c(1.0, 0.0), c(f64::NAN, 0.0)],
            vec![c(0.0, 0.0), c(1.0, 0.0)],
        ])
        .unwrap();
        match factor(&a, true) {
            Err(QrError::FactorizationFailure { column, .. }) => assert_eq!(column, 1),
            other => panic!("expected FactorizationFailure, got {other:?}"),
        }
        assert!(factor(&a, false).is_err());
    }

    #[test]
    fn test_factor_rejects_overflow_into_r() {
        // finite input whose trailing update overflows above the diagonal
        let a = ComplexMatrix::from_rows(&[
            vec![c(1.0, 0.0), c(1e308, 0.0)],
            vec![c(1.0, 0.0), c(-1e308, 0.0)],
            vec![c(0.0, 0.0), c(0.0, 0.0)],
        ])
        .unwrap();
        let result = factor(&a, false);
        if let Ok(f) = &result {
            assert!(first_non_finite(&f.r).is_none());
        }
    }

    #[test]
    fn test_factor_interleaved() {
        let (m, n) = (3, 2);
        let a = ComplexMatrix::from_fn(m, n, |i, j| c(i as f64 + 1.0, j as f64 - 0.5));
        let mut flat_a = a.to_interleaved();
        let mut flat_q = ComplexMatrix::identity(m).to_interleaved();

        factor_interleaved(&mut flat_a, &mut flat_q, m, n, true).unwrap();

        let r = ComplexMatrix::from_interleaved(&flat_a, m, n).unwrap();
        let q = ComplexMatrix::from_interleaved(&flat_q, m, m).unwrap();
        let expected = factor(&a, true).unwrap();
        assert_eq!(r, expected.r);
        assert_eq!(q, expected.q.unwrap());
    }

    #[test]
    fn test_factor_interleaved_r_only_leaves_q() {
        let (m, n) = (3, 3);
        let mut flat_a = ComplexMatrix::from_fn(m, n, |i, j| c((i + j) as f64, 1.0)).to_interleaved();
        let identity = ComplexMatrix::identity(m).to_interleaved();
        let mut flat_q = identity.clone();
        factor_interleaved(&mut flat_a, &mut flat_q, m, n, false).unwrap();
        assert_eq!(flat_q, identity);

        let mut flat_a = ComplexMatrix::identity(m).to_interleaved();
        factor_interleaved(&mut flat_a, &mut [], m, n, false).unwrap();
    }

    #[test]
    fn test_factor_interleaved_errors_leave_buffers() {
        let mut flat_a = vec![1.0; 2 * 3 * 2];
        flat_a[4] = f64::NAN;
        let snapshot = flat_a.clone();
        let mut flat_q = ComplexMatrix::identity(3).to_interleaved();
        let q_snapshot = flat_q.clone();

        assert!(factor_interleaved(&mut flat_a, &mut flat_q, 3, 2, true).is_err());
        assert_eq!(flat_q, q_snapshot);
        assert!(flat_a.iter().zip(&snapshot).all(|(a, b)| a.to_bits() == b.to_bits()));

        let mut short_q = vec![0.0; 4];
        assert!(matches!(
            factor_interleaved(&mut flat_a, &mut short_q, 3, 2, true),
            Err(QrError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_flop_count() {
        // m = n = 3: (27 - 9) / 2 = 9 pairs, 144 flops
        assert_eq!(flop_count(3, 3), 144);
        // default benchmark size
        let k = (192u64 * 120 * 120 - 120 * 120 * 120 / 3) / 2;
        assert_eq!(flop_count(192, 120), 16 * k);
    }

    #[test]
    fn test_mflops() {
        let f = Factorization {
            r: ComplexMatrix::zeros(3, 3),
            q: None,
            elapsed_micros: 0,
        };
        assert!(f.mflops().is_none());
        let f = Factorization {
            elapsed_micros: 12,
            ..f
        };
        assert!((f.mflops().unwrap() - 12.0).abs() < 1e-12);
    }
}
