//! Dense complex matrix stored row-major
//!
//! `ComplexMatrix` owns an m×n grid of `Complex64`. All algebra returns new
//! matrices and leaves the operands untouched.
//!
//! # Borrowing vs copying
//! - [`ComplexMatrix::as_slice`] / [`ComplexMatrix::as_mut_slice`] borrow the
//!   backing storage (hot paths, no allocation).
//! - [`ComplexMatrix::deep_copy`] (and `Clone`) allocate an independent copy.
//! - [`ComplexMatrix::into_vec`] moves the storage out.
//!
//! # Interleaved layout
//! At the kernel boundary a matrix travels as a flat `f64` array of length
//! `2·m·n` where element (i, j) sits at `2·(n·i + j)` (real part) and
//! `2·(n·i + j) + 1` (imaginary part).

use std::fmt;
use std::ops::{Index, IndexMut};

use mdarray::DTensor;
use num_complex::Complex64;
use num_traits::{One, Zero};
use rand::Rng;

use crate::error::{QrError, Result};
use crate::gemm;

/// Pivots with modulus below this floor are treated as exact zeros during
/// elimination, so the determinant never divides by (almost) zero.
pub const SINGULAR_PIVOT_FLOOR: f64 = 1.0e-100;

/// Dense complex matrix, row-major
#[derive(Clone, Debug, PartialEq)]
pub struct ComplexMatrix {
    rows: usize,
    cols: usize,
    data: Vec<Complex64>,
}

impl ComplexMatrix {
    /// All-zero matrix
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![Complex64::zero(); rows * cols],
        }
    }

    /// Square identity matrix
    pub fn identity(n: usize) -> Self {
        let mut m = Self::zeros(n, n);
        for i in 0..n {
            m.data[i * n + i] = Complex64::one();
        }
        m
    }

    pub fn from_fn<F>(rows: usize, cols: usize, mut f: F) -> Self
    where
        F: FnMut(usize, usize) -> Complex64,
    {
        let mut data = Vec::with_capacity(rows * cols);
        for i in 0..rows {
            for j in 0..cols {
                data.push(f(i, j));
            }
        }
        Self { rows, cols, data }
    }

    /// Take ownership of a row-major buffer
    pub fn from_vec(rows: usize, cols: usize, data: Vec<Complex64>) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(QrError::mismatch("from_vec", (rows, cols), (data.len(), 1)));
        }
        Ok(Self { rows, cols, data })
    }

    /// Build from a slice of rows, all of the same length
    pub fn from_rows(rows: &[Vec<Complex64>]) -> Result<Self> {
        let n_rows = rows.len();
        let n_cols = rows.first().map_or(0, Vec::len);
        let mut data = Vec::with_capacity(n_rows * n_cols);
        for row in rows {
            if row.len() != n_cols {
                return Err(QrError::mismatch("from_rows", (n_rows, n_cols), (1, row.len())));
            }
            data.extend_from_slice(row);
        }
        Ok(Self {
            rows: n_rows,
            cols: n_cols,
            data,
        })
    }

    /// Combine separate real and imaginary grids of identical shape
    pub fn from_parts(re: &[Vec<f64>], im: &[Vec<f64>]) -> Result<Self> {
        let rows = re.len();
        let cols = re.first().map_or(0, Vec::len);
        if im.len() != rows {
            return Err(QrError::mismatch("from_parts", (rows, cols), (im.len(), cols)));
        }
        let mut data = Vec::with_capacity(rows * cols);
        for (r, i) in re.iter().zip(im) {
            if r.len() != cols || i.len() != cols {
                return Err(QrError::mismatch("from_parts", (rows, cols), (r.len(), i.len())));
            }
            data.extend(r.iter().zip(i).map(|(&a, &b)| Complex64::new(a, b)));
        }
        Ok(Self { rows, cols, data })
    }

    /// Decode the interleaved real/imaginary layout
    pub fn from_interleaved(flat: &[f64], rows: usize, cols: usize) -> Result<Self> {
        if flat.len() != 2 * rows * cols {
            return Err(QrError::mismatch(
                "from_interleaved",
                (rows, cols),
                (flat.len(), 1),
            ));
        }
        let data = flat
            .chunks_exact(2)
            .map(|pair| Complex64::new(pair[0], pair[1]))
            .collect();
        Ok(Self { rows, cols, data })
    }

    /// Random matrix with real and imaginary parts uniform in [-1, 1)
    pub fn random<R: Rng>(rows: usize, cols: usize, rng: &mut R) -> Self {
        Self::from_fn(rows, cols, |_, _| {
            Complex64::new(rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0))
        })
    }

    /// Copy out of an mdarray tensor
    pub fn from_tensor(tensor: &DTensor<Complex64, 2>) -> Self {
        let (rows, cols) = *tensor.shape();
        Self::from_fn(rows, cols, |i, j| tensor[[i, j]])
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    #[inline]
    pub fn is_square(&self) -> bool {
        self.rows == self.cols
    }

    /// Element (i, j) by value
    #[inline]
    pub fn get(&self, i: usize, j: usize) -> Complex64 {
        self.data[i * self.cols + j]
    }

    #[inline]
    pub fn set(&mut self, i: usize, j: usize, value: Complex64) {
        self.data[i * self.cols + j] = value;
    }

    /// Borrow row `i`
    #[inline]
    pub fn row(&self, i: usize) -> &[Complex64] {
        &self.data[i * self.cols..(i + 1) * self.cols]
    }

    /// Borrowing read-only view of the row-major storage
    #[inline]
    pub fn as_slice(&self) -> &[Complex64] {
        &self.data
    }

    /// Borrowing mutable view of the row-major storage
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [Complex64] {
        &mut self.data
    }

    /// Independent copy; never shares storage with `self`
    pub fn deep_copy(&self) -> Self {
        self.clone()
    }

    /// Move the row-major storage out
    pub fn into_vec(self) -> Vec<Complex64> {
        self.data
    }

    /// Encode into a freshly allocated interleaved buffer
    pub fn to_interleaved(&self) -> Vec<f64> {
        let mut flat = vec![0.0; 2 * self.data.len()];
        for (pair, z) in flat.chunks_exact_mut(2).zip(&self.data) {
            pair[0] = z.re;
            pair[1] = z.im;
        }
        flat
    }

    /// Encode into a caller-owned interleaved buffer of length `2·m·n`
    pub fn write_interleaved(&self, out: &mut [f64]) -> Result<()> {
        if out.len() != 2 * self.data.len() {
            return Err(QrError::mismatch(
                "write_interleaved",
                self.shape(),
                (out.len(), 1),
            ));
        }
        for (pair, z) in out.chunks_exact_mut(2).zip(&self.data) {
            pair[0] = z.re;
            pair[1] = z.im;
        }
        Ok(())
    }

    /// Copy into an mdarray tensor
    pub fn to_tensor(&self) -> DTensor<Complex64, 2> {
        let cols = self.cols;
        DTensor::<Complex64, 2>::from_fn([self.rows, self.cols], |idx| {
            self.data[idx[0] * cols + idx[1]]
        })
    }

    /// Negate the imaginary part of every element
    pub fn conjugate(&self) -> Self {
        Self {
            rows: self.rows,
            cols: self.cols,
            data: self.data.iter().map(|z| z.conj()).collect(),
        }
    }

    pub fn transpose(&self) -> Self {
        Self::from_fn(self.cols, self.rows, |i, j| self.get(j, i))
    }

    /// Hermitian adjoint (conjugate transpose)
    pub fn adjoint(&self) -> Self {
        Self::from_fn(self.cols, self.rows, |i, j| self.get(j, i).conj())
    }

    /// Matrix product `self · other`
    pub fn times(&self, other: &Self) -> Result<Self> {
        if self.cols != other.rows {
            return Err(QrError::mismatch("times", self.shape(), other.shape()));
        }
        let mut out = Self::zeros(self.rows, other.cols);
        gemm::matmul(
            self.rows,
            other.cols,
            self.cols,
            &self.data,
            &other.data,
            &mut out.data,
        );
        Ok(out)
    }

    /// Element-wise difference `self − other`
    pub fn minus(&self, other: &Self) -> Result<Self> {
        if self.shape() != other.shape() {
            return Err(QrError::mismatch("minus", self.shape(), other.shape()));
        }
        Ok(Self {
            rows: self.rows,
            cols: self.cols,
            data: self
                .data
                .iter()
                .zip(&other.data)
                .map(|(a, b)| a - b)
                .collect(),
        })
    }

    /// Frobenius norm
    pub fn norm(&self) -> f64 {
        self.data.iter().map(|z| z.norm_sqr()).sum::<f64>().sqrt()
    }

    /// Determinant by Gaussian elimination with partial pivoting.
    ///
    /// A pivot below [`SINGULAR_PIVOT_FLOOR`] gives the degenerate value
    /// `0 + 0i`. Use [`ComplexMatrix::try_determinant`] to get an error
    /// instead.
    pub fn determinant(&self) -> Result<Complex64> {
        match self.try_determinant() {
            Err(QrError::SingularMatrix { pivot }) => {
                log::warn!("determinant: pivot {pivot:e} below floor, returning zero");
                Ok(Complex64::zero())
            }
            other => other,
        }
    }

    /// Determinant that reports a singular pivot as [`QrError::SingularMatrix`]
    pub fn try_determinant(&self) -> Result<Complex64> {
        if !self.is_square() {
            return Err(QrError::mismatch("determinant", self.shape(), self.shape()));
        }
        let n = self.rows;
        let mut lu = self.data.clone();
        let mut det = Complex64::one();
        let mut swap_sign = 1.0;

        for k in 0..n {
            let mut pivot_row = k;
            let mut pivot_abs = lu[k * n + k].norm();
            for i in (k + 1)..n {
                let v = lu[i * n + k].norm();
                if v > pivot_abs {
                    pivot_abs = v;
                    pivot_row = i;
                }
            }

            if pivot_abs < SINGULAR_PIVOT_FLOOR {
                return Err(QrError::SingularMatrix { pivot: pivot_abs });
            }

            if pivot_row != k {
                for j in 0..n {
                    lu.swap(k * n + j, pivot_row * n + j);
                }
                swap_sign = -swap_sign;
            }

            let pivot = lu[k * n + k];
            det *= pivot;

            for i in (k + 1)..n {
                let factor = lu[i * n + k] / pivot;
                if factor.is_zero() {
                    continue;
                }
                for j in (k + 1)..n {
                    let upper = lu[k * n + j];
                    lu[i * n + j] -= factor * upper;
                }
            }
        }

        Ok(det * swap_sign)
    }
}

impl Index<(usize, usize)> for ComplexMatrix {
    type Output = Complex64;

    #[inline]
    fn index(&self, (i, j): (usize, usize)) -> &Complex64 {
        &self.data[i * self.cols + j]
    }
}

impl IndexMut<(usize, usize)> for ComplexMatrix {
    #[inline]
    fn index_mut(&mut self, (i, j): (usize, usize)) -> &mut Complex64 {
        &mut self.data[i * self.cols + j]
    }
}

impl fmt::Display for ComplexMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for i in 0..self.rows {
            for (j, z) in self.row(i).iter().enumerate() {
                if j > 0 {
                    f.write_str("  ")?;
                }
                write!(f, "{:+7.2}{:+7.2}i", z.re, z.im)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
