//! Complex matrix multiplication with a pluggable BLAS backend
//!
//! [`ComplexMatrix::times`](crate::ComplexMatrix::times) routes through
//! [`matmul`], which dispatches to the currently registered backend.
//!
//! # Design
//! - **Default**: Faer backend through `mdarray-linalg` (pure Rust)
//! - **Optional**: external Fortran `zgemm` via function pointer injection
//! - **Thread-safe**: global dispatcher protected by RwLock
//!
//! # Example
//! ```ignore
//! use complex_qr::gemm::{set_blas_backend, clear_blas_backend};
//!
//! // Default Faer backend
//! let p = a.times(&b)?;
//!
//! // Or inject zgemm (from the C API)
//! unsafe {
//!     set_blas_backend(zgemm_ as _);
//! }
//! let p = a.times(&b)?;  // now uses the injected zgemm
//! clear_blas_backend();
//! ```

use std::sync::{PoisonError, RwLock};

use mdarray::DTensor;
use num_complex::Complex64;
use num_traits::Zero;
use once_cell::sync::Lazy;

//==============================================================================
// BLAS Function Pointer Type
//==============================================================================

/// BLAS zgemm function pointer type (LP64: 32-bit integers)
///
/// Signature matches Fortran BLAS zgemm:
/// ```c
/// void zgemm_(char *transa, char *transb, int *m, int *n, int *k,
///             void *alpha, void *a, int *lda, void *b, int *ldb,
///             void *beta, void *c, int *ldc);
/// ```
/// Note: All parameters are passed by reference (pointers).
/// Complex numbers are passed as void* (typically complex<double>*).
/// Only 'N' (no transpose) is ever requested.
pub type ZgemmFnPtr = unsafe extern "C" fn(
    transa: *const libc::c_char,
    transb: *const libc::c_char,
    m: *const libc::c_int,
    n: *const libc::c_int,
    k: *const libc::c_int,
    alpha: *const Complex64,
    a: *const Complex64,
    lda: *const libc::c_int,
    b: *const Complex64,
    ldb: *const libc::c_int,
    beta: *const Complex64,
    c: *mut Complex64,
    ldc: *const libc::c_int,
);

//==============================================================================
// GemmBackend Trait
//==============================================================================

/// GEMM backend trait for runtime dispatch
pub trait GemmBackend: Send + Sync {
    /// Matrix multiplication: C = A * B (Complex<f64>)
    ///
    /// # Arguments
    /// * `m`, `n`, `k` - Matrix dimensions (M x K) * (K x N) = (M x N)
    /// * `a` - Pointer to matrix A (row-major, M x K)
    /// * `b` - Pointer to matrix B (row-major, K x N)
    /// * `c` - Pointer to output matrix C (row-major, M x N), overwritten
    ///
    /// Note: Leading dimensions are derived from the row-major shapes.
    ///
    /// # Safety
    /// `a`, `b` and `c` must be valid for `m*k`, `k*n` and `m*n` elements.
    unsafe fn zgemm(
        &self,
        m: usize,
        n: usize,
        k: usize,
        a: *const Complex64,
        b: *const Complex64,
        c: *mut Complex64,
    );

    /// Returns backend name for debugging
    fn name(&self) -> &'static str;
}

//==============================================================================
// Faer Backend (Default, Pure Rust)
//==============================================================================

/// Default Faer backend (Pure Rust, no external dependencies)
struct FaerBackend;

impl GemmBackend for FaerBackend {
    unsafe fn zgemm(
        &self,
        m: usize,
        n: usize,
        k: usize,
        a: *const Complex64,
        b: *const Complex64,
        c: *mut Complex64,
    ) {
        use mdarray_linalg::matmul::MatMulBuilder;
        use mdarray_linalg::prelude::MatMul;
        use mdarray_linalg_faer::Faer;

        // Create tensors from pointers (row-major order)
        let a_slice = unsafe { std::slice::from_raw_parts(a, m * k) };
        let b_slice = unsafe { std::slice::from_raw_parts(b, k * n) };
        let a_tensor = DTensor::<Complex64, 2>::from_fn([m, k], |idx| a_slice[idx[0] * k + idx[1]]);
        let b_tensor = DTensor::<Complex64, 2>::from_fn([k, n], |idx| b_slice[idx[0] * n + idx[1]]);

        let c_tensor = Faer.matmul(&*a_tensor, &*b_tensor).parallelize().eval();

        // Copy back, row-major with ldc = n
        let c_slice = unsafe { std::slice::from_raw_parts_mut(c, m * n) };
        for i in 0..m {
            for j in 0..n {
                c_slice[i * n + j] = c_tensor[[i, j]];
            }
        }
    }

    fn name(&self) -> &'static str {
        "Faer (Pure Rust)"
    }
}

//==============================================================================
// External BLAS Backend (LP64)
//==============================================================================

/// Conversion rules for row-major data to column-major BLAS:
///
/// **Goal**: Compute C = A * B where:
///   - A is m×k (row-major)
///   - B is k×n (row-major)
///   - C is m×n (row-major)
///
/// **Row-major to column-major interpretation**:
///   - Row-major A (m×k) appears as A^T (k×m) in column-major → At
///   - Row-major B (k×n) appears as B^T (n×k) in column-major → Bt
///   - Row-major C (m×n) appears as C^T (n×m) in column-major → Ct
///   - C^T = (A * B)^T = B^T * A^T, so Ct = Bt * At
///   - Plain transposes only: no conjugation enters, so complex data needs
///     no extra handling
///
/// **BLAS call**:
///   - zgemm('N', 'N', n, m, k, 1, B, lda, A, ldb, 0, C, ldc)
///
/// **Dimension conversions**:
///   - m_blas = n (Ct rows = Bt rows)
///   - n_blas = m (Ct cols = At cols)
///   - k_blas = k (common dimension)
///   - lda = n (Bt is n×k column-major)
///   - ldb = k (At is k×m column-major)
///   - ldc = n (Ct is n×m column-major)
pub struct ExternalBlasBackend {
    zgemm: ZgemmFnPtr,
}

impl ExternalBlasBackend {
    pub fn new(zgemm: ZgemmFnPtr) -> Self {
        Self { zgemm }
    }
}

impl GemmBackend for ExternalBlasBackend {
    unsafe fn zgemm(
        &self,
        m: usize,
        n: usize,
        k: usize,
        a: *const Complex64,
        b: *const Complex64,
        c: *mut Complex64,
    ) {
        // Validate dimensions fit in i32
        assert!(
            m <= i32::MAX as usize && n <= i32::MAX as usize && k <= i32::MAX as usize,
            "Matrix dimension too large for LP64 BLAS"
        );

        let transa = b'N' as libc::c_char;
        let transb = b'N' as libc::c_char;
        let m_blas = n as libc::c_int;
        let n_blas = m as libc::c_int;
        let k_blas = k as libc::c_int;
        let alpha = Complex64::new(1.0, 0.0);
        let beta = Complex64::new(0.0, 0.0);
        let lda = n as libc::c_int;
        let ldb = k as libc::c_int;
        let ldc = n as libc::c_int;

        unsafe {
            (self.zgemm)(
                &transa, &transb, &m_blas, &n_blas, &k_blas, &alpha, b, &lda, a, &ldb, &beta, c,
                &ldc,
            );
        }
    }

    fn name(&self) -> &'static str {
        "External BLAS (LP64)"
    }
}

//==============================================================================
// Global Dispatcher
//==============================================================================

/// Global BLAS dispatcher (thread-safe), Faer until a zgemm is injected
static BLAS_DISPATCHER: Lazy<RwLock<Box<dyn GemmBackend>>> =
    Lazy::new(|| RwLock::new(Box::new(FaerBackend)));

/// Register an external zgemm
///
/// # Safety
/// - The function pointer must be valid and thread-safe
/// - It must remain valid for the lifetime of the program
/// - It must follow the Fortran BLAS calling convention
///
/// # Example
/// ```ignore
/// unsafe {
///     set_blas_backend(zgemm_ as _);
/// }
/// ```
pub unsafe fn set_blas_backend(zgemm: ZgemmFnPtr) {
    let backend = ExternalBlasBackend::new(zgemm);
    let mut dispatcher = BLAS_DISPATCHER.write().unwrap_or_else(PoisonError::into_inner);
    log::debug!("gemm backend set to {}", backend.name());
    *dispatcher = Box::new(backend);
}

/// Clear BLAS backend (reset to default Faer)
pub fn clear_blas_backend() {
    let mut dispatcher = BLAS_DISPATCHER.write().unwrap_or_else(PoisonError::into_inner);
    *dispatcher = Box::new(FaerBackend);
}

/// Get current BLAS backend information
///
/// Returns:
/// - `(backend_name, is_external)`
pub fn get_backend_info() -> (&'static str, bool) {
    let dispatcher = BLAS_DISPATCHER.read().unwrap_or_else(PoisonError::into_inner);
    let name = dispatcher.name();
    (name, name.starts_with("External"))
}

//==============================================================================
// Entry Point
//==============================================================================

/// C = A * B on row-major slices
///
/// # Panics
/// Panics if a slice length disagrees with `m`, `n`, `k`.
pub fn matmul(m: usize, n: usize, k: usize, a: &[Complex64], b: &[Complex64], c: &mut [Complex64]) {
    assert_eq!(a.len(), m * k, "A must be {m}x{k}");
    assert_eq!(b.len(), k * n, "B must be {k}x{n}");
    assert_eq!(c.len(), m * n, "C must be {m}x{n}");

    if m == 0 || n == 0 {
        return;
    }
    if k == 0 {
        c.fill(Complex64::zero());
        return;
    }

    let dispatcher = BLAS_DISPATCHER.read().unwrap_or_else(PoisonError::into_inner);
    unsafe {
        dispatcher.zgemm(m, n, k, a.as_ptr(), b.as_ptr(), c.as_mut_ptr());
    }
}
