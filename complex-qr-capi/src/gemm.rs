//! Injection of an external BLAS zgemm
//!
//! Matrix products inside `cqr_verify` use the registered zgemm once one is
//! set. Factorization itself never calls GEMM.

use std::panic::catch_unwind;

use complex_qr::gemm::{clear_blas_backend, set_blas_backend, ZgemmFnPtr};

use crate::{StatusCode, CQR_INTERNAL_ERROR, CQR_INVALID_ARGUMENT, CQR_SUCCESS};

/// Register a Fortran-convention LP64 `zgemm_`
///
/// # Arguments
/// * `zgemm` - Pointer to `zgemm_` (32-bit integer interface)
///
/// # Returns
/// * `CQR_SUCCESS` on success
/// * `CQR_INVALID_ARGUMENT` if `zgemm` is null
///
/// # Safety
/// `zgemm` must point to a thread-safe function with the Fortran BLAS
/// signature that stays valid for the rest of the program.
///
/// # Example (C)
/// ```c
/// extern void zgemm_(const char*, const char*, const int*, const int*,
///                    const int*, const void*, const void*, const int*,
///                    const void*, const int*, const void*, void*, const int*);
/// cqr_set_zgemm((const void*)zgemm_);
/// ```
#[unsafe(no_mangle)]
pub unsafe extern "C" fn cqr_set_zgemm(zgemm: *const libc::c_void) -> StatusCode {
    if zgemm.is_null() {
        return CQR_INVALID_ARGUMENT;
    }

    let zgemm_fn: ZgemmFnPtr = unsafe { std::mem::transmute(zgemm) };

    match catch_unwind(|| unsafe { set_blas_backend(zgemm_fn) }) {
        Ok(()) => CQR_SUCCESS,
        Err(_) => CQR_INTERNAL_ERROR,
    }
}

/// Return to the built-in matrix product
#[unsafe(no_mangle)]
pub extern "C" fn cqr_clear_zgemm() -> StatusCode {
    match catch_unwind(clear_blas_backend) {
        Ok(()) => CQR_SUCCESS,
        Err(_) => CQR_INTERNAL_ERROR,
    }
}
