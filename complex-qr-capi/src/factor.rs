//! Factorization and verification over interleaved buffers

use std::panic::{catch_unwind, AssertUnwindSafe};

use complex_qr::{factor_interleaved, verify, ComplexMatrix};

use crate::{
    checked_dims, status_of, StatusCode, CQR_INTERNAL_ERROR, CQR_INVALID_ARGUMENT,
    CQR_INVALID_DIMENSION, CQR_SUCCESS,
};

/// Factor an interleaved m×n matrix in place
///
/// # Arguments
/// * `a` - `2·rows·cols` doubles; overwritten with R on success
/// * `q` - `2·rows·rows` doubles seeded with the identity (see
///   [`cqr_identity`]); receives Q. May be NULL when `compute_q == 0`
/// * `rows`, `cols` - Dimensions, `rows >= cols >= 1`
/// * `compute_q` - Nonzero to accumulate Q
/// * `status` - Pointer to store the status code
///
/// # Returns
/// * Elapsed kernel time in microseconds, or 0 on failure
///
/// On failure neither buffer is modified.
///
/// # Safety
/// `a` and (when used) `q` must be valid for the stated lengths and must
/// not overlap.
///
/// # Example (C)
/// ```c
/// int status;
/// cqr_identity(q, m);
/// int64_t usec = cqr_factor(a, q, m, n, 1, &status);
/// ```
#[unsafe(no_mangle)]
pub unsafe extern "C" fn cqr_factor(
    a: *mut f64,
    q: *mut f64,
    rows: libc::c_int,
    cols: libc::c_int,
    compute_q: libc::c_int,
    status: *mut StatusCode,
) -> i64 {
    if status.is_null() {
        return 0;
    }
    let compute_q = compute_q != 0;
    if a.is_null() || (compute_q && q.is_null()) {
        unsafe {
            *status = CQR_INVALID_ARGUMENT;
        }
        return 0;
    }
    let Some((m, n)) = checked_dims(rows, cols) else {
        unsafe {
            *status = CQR_INVALID_DIMENSION;
        }
        return 0;
    };

    let result = catch_unwind(AssertUnwindSafe(|| {
        let flat_a = unsafe { std::slice::from_raw_parts_mut(a, 2 * m * n) };
        let flat_q: &mut [f64] = if compute_q {
            unsafe { std::slice::from_raw_parts_mut(q, 2 * m * m) }
        } else {
            &mut []
        };
        factor_interleaved(flat_a, flat_q, m, n, compute_q)
    }));

    let (code, elapsed) = match result {
        Ok(Ok(micros)) => (CQR_SUCCESS, micros as i64),
        Ok(Err(e)) => {
            log::debug!("cqr_factor: {e}");
            (status_of(&e), 0)
        }
        Err(_) => (CQR_INTERNAL_ERROR, 0),
    };
    unsafe {
        *status = code;
    }
    elapsed
}

/// Check `A = Q R` and the unitarity of Q
///
/// # Arguments
/// * `a`, `r` - Interleaved `rows × cols` matrices
/// * `q` - Interleaved `rows × rows` matrix
/// * `reconstruction_error` - Receives `‖Q·R − A‖_F`
/// * `unitarity_error` - Receives `‖Qᴴ·Q − I‖_F`
/// * `det_re`, `det_im` - Receive `det(Qᴴ·Q)`
/// * `passed` - Receives 1 when within the default tolerances, else 0
///
/// # Returns
/// * `CQR_SUCCESS` on success
/// * `CQR_INVALID_ARGUMENT` if any pointer is null
/// * `CQR_INVALID_DIMENSION` for bad sizes
///
/// # Safety
/// All pointers must be valid for the stated lengths.
#[unsafe(no_mangle)]
#[allow(clippy::too_many_arguments)]
pub unsafe extern "C" fn cqr_verify(
    a: *const f64,
    r: *const f64,
    q: *const f64,
    rows: libc::c_int,
    cols: libc::c_int,
    reconstruction_error: *mut f64,
    unitarity_error: *mut f64,
    det_re: *mut f64,
    det_im: *mut f64,
    passed: *mut libc::c_int,
) -> StatusCode {
    if a.is_null()
        || r.is_null()
        || q.is_null()
        || reconstruction_error.is_null()
        || unitarity_error.is_null()
        || det_re.is_null()
        || det_im.is_null()
        || passed.is_null()
    {
        return CQR_INVALID_ARGUMENT;
    }
    let Some((m, n)) = checked_dims(rows, cols) else {
        return CQR_INVALID_DIMENSION;
    };

    let result = catch_unwind(|| {
        let (a, r, q) = unsafe {
            (
                std::slice::from_raw_parts(a, 2 * m * n),
                std::slice::from_raw_parts(r, 2 * m * n),
                std::slice::from_raw_parts(q, 2 * m * m),
            )
        };
        let a = ComplexMatrix::from_interleaved(a, m, n)?;
        let r = ComplexMatrix::from_interleaved(r, m, n)?;
        let q = ComplexMatrix::from_interleaved(q, m, m)?;
        verify(&a, &r, &q)
    });

    match result {
        Ok(Ok(v)) => {
            unsafe {
                *reconstruction_error = v.reconstruction_error;
                *unitarity_error = v.unitarity_error;
                *det_re = v.determinant.re;
                *det_im = v.determinant.im;
                *passed = libc::c_int::from(v.passed);
            }
            CQR_SUCCESS
        }
        Ok(Err(e)) => status_of(&e),
        Err(_) => CQR_INTERNAL_ERROR,
    }
}

/// Fill an interleaved `rows × rows` buffer with the identity
///
/// # Safety
/// `q` must be valid for `2·rows·rows` doubles.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn cqr_identity(q: *mut f64, rows: libc::c_int) -> StatusCode {
    if q.is_null() {
        return CQR_INVALID_ARGUMENT;
    }
    if rows <= 0 {
        return CQR_INVALID_DIMENSION;
    }
    let m = rows as usize;

    let result = catch_unwind(AssertUnwindSafe(|| {
        let out = unsafe { std::slice::from_raw_parts_mut(q, 2 * m * m) };
        ComplexMatrix::identity(m).write_interleaved(out)
    }));

    match result {
        Ok(Ok(())) => CQR_SUCCESS,
        Ok(Err(e)) => status_of(&e),
        Err(_) => CQR_INTERNAL_ERROR,
    }
}
