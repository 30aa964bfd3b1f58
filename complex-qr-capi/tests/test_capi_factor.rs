//! C API round trips: seed Q, factor, verify

use complex_qr_capi::*;
use std::ptr;

fn pattern(m: usize, n: usize) -> Vec<f64> {
    let mut flat = vec![0.0; 2 * m * n];
    for i in 0..m {
        for j in 0..n {
            flat[2 * (n * i + j)] = (i + 1) as f64;
            flat[2 * (n * i + j) + 1] = (j + 1) as f64;
        }
    }
    flat
}

#[test]
fn test_factor_and_verify() {
    unsafe {
        let (m, n) = (4usize, 3usize);
        let a = pattern(m, n);
        let mut r = a.clone();
        let mut q = vec![0.0; 2 * m * m];
        let mut status = -100;

        assert_eq!(cqr_identity(q.as_mut_ptr(), m as i32), CQR_SUCCESS);
        assert_eq!(q[0], 1.0);
        assert_eq!(q[1], 0.0);
        assert_eq!(q[2 * (m + 1)], 1.0);

        let _usec = cqr_factor(r.as_mut_ptr(), q.as_mut_ptr(), m as i32, n as i32, 1, &mut status);
        assert_eq!(status, CQR_SUCCESS);

        // strictly lower part of R is exactly zero
        for i in 0..m {
            for j in 0..n.min(i) {
                assert_eq!(r[2 * (n * i + j)], 0.0);
                assert_eq!(r[2 * (n * i + j) + 1], 0.0);
            }
        }

        let (mut recon, mut unit, mut det_re, mut det_im, mut passed) = (0.0, 0.0, 0.0, 0.0, 0);
        let st = cqr_verify(
            a.as_ptr(),
            r.as_ptr(),
            q.as_ptr(),
            m as i32,
            n as i32,
            &mut recon,
            &mut unit,
            &mut det_re,
            &mut det_im,
            &mut passed,
        );
        assert_eq!(st, CQR_SUCCESS);
        assert_eq!(passed, 1);
        assert!(recon < 1e-8);
        assert!(unit < 1e-10);
        assert!((det_re - 1.0).abs() < 1e-10);
        assert!(det_im.abs() < 1e-10);
    }
}

#[test]
fn test_r_only_accepts_null_q() {
    unsafe {
        let (m, n) = (5usize, 5usize);
        let mut a = pattern(m, n);
        let mut status = -100;
        cqr_factor(a.as_mut_ptr(), ptr::null_mut(), m as i32, n as i32, 0, &mut status);
        assert_eq!(status, CQR_SUCCESS);
        assert!(a.iter().all(|x| x.is_finite()));
    }
}

#[test]
fn test_factor_bad_arguments() {
    unsafe {
        let mut a = pattern(3, 2);
        let original = a.clone();
        let mut q = vec![0.0; 2 * 9];
        let mut status = 0;

        cqr_factor(ptr::null_mut(), q.as_mut_ptr(), 3, 2, 1, &mut status);
        assert_eq!(status, CQR_INVALID_ARGUMENT);

        cqr_factor(a.as_mut_ptr(), ptr::null_mut(), 3, 2, 1, &mut status);
        assert_eq!(status, CQR_INVALID_ARGUMENT);

        // rows < cols
        cqr_factor(a.as_mut_ptr(), q.as_mut_ptr(), 2, 3, 1, &mut status);
        assert_eq!(status, CQR_INVALID_DIMENSION);

        cqr_factor(a.as_mut_ptr(), q.as_mut_ptr(), 3, 0, 1, &mut status);
        assert_eq!(status, CQR_INVALID_DIMENSION);

        assert_eq!(a, original);

        // null status pointer is tolerated
        assert_eq!(cqr_factor(a.as_mut_ptr(), q.as_mut_ptr(), 3, 2, 1, ptr::null_mut()), 0);
    }
}

#[test]
fn test_factor_reports_failure() {
    unsafe {
        let mut a = pattern(3, 2);
        a[2] = f64::INFINITY;
        let original = a.clone();
        let mut q = vec![0.0; 2 * 9];
        assert_eq!(cqr_identity(q.as_mut_ptr(), 3), CQR_SUCCESS);
        let q_before = q.clone();
        let mut status = 0;

        let usec = cqr_factor(a.as_mut_ptr(), q.as_mut_ptr(), 3, 2, 1, &mut status);
        assert_eq!(usec, 0);
        assert_eq!(status, CQR_FACTORIZATION_FAILURE);
        assert_eq!(a, original);
        assert_eq!(q, q_before);
    }
}

#[test]
fn test_verify_bad_arguments() {
    unsafe {
        let a = pattern(2, 2);
        let (mut x, mut y, mut re, mut im, mut passed) = (0.0, 0.0, 0.0, 0.0, 0);
        let st = cqr_verify(
            a.as_ptr(),
            ptr::null(),
            a.as_ptr(),
            2,
            2,
            &mut x,
            &mut y,
            &mut re,
            &mut im,
            &mut passed,
        );
        assert_eq!(st, CQR_INVALID_ARGUMENT);

        let st = cqr_verify(
            a.as_ptr(),
            a.as_ptr(),
            a.as_ptr(),
            1,
            2,
            &mut x,
            &mut y,
            &mut re,
            &mut im,
            &mut passed,
        );
        assert_eq!(st, CQR_INVALID_DIMENSION);

        assert_eq!(cqr_identity(ptr::null_mut(), 2), CQR_INVALID_ARGUMENT);
    }
}
