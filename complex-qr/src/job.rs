//! Synchronous and background entry points around the engine
//!
//! [`factor_fast`] runs an R-only factorization on the calling thread.
//! [`factor_full`] hands a [`MatrixSlot`] to a worker thread that computes
//! R and Q and verifies them; the caller gets a [`FullJob`] handle and
//! consumes the outcome with a continuation that runs on its own thread.
//!
//! At most one full job may be in flight per slot. A second submission is
//! rejected with [`QrError::JobInFlight`], never queued.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::error::{QrError, Result};
use crate::householder::{factor, Factorization};
use crate::matrix::ComplexMatrix;
use crate::verify::{verify, Verification};

/// Name given to background factorization threads
pub const WORKER_THREAD_NAME: &str = "complex-qr-worker";

/// R-only factorization on the calling thread
pub fn factor_fast(a: &ComplexMatrix) -> Result<Factorization> {
    factor(a, false)
}

/// Shared read-only input matrix plus its in-flight flag
///
/// Clones share both the matrix and the flag.
#[derive(Clone, Debug)]
pub struct MatrixSlot {
    matrix: Arc<ComplexMatrix>,
    busy: Arc<AtomicBool>,
}

impl MatrixSlot {
    pub fn new(matrix: ComplexMatrix) -> Self {
        Self {
            matrix: Arc::new(matrix),
            busy: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn matrix(&self) -> &ComplexMatrix {
        &self.matrix
    }

    /// Whether a full job currently holds this slot
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    fn try_acquire(&self) -> Result<SlotGuard> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| QrError::JobInFlight)?;
        Ok(SlotGuard(Arc::clone(&self.busy)))
    }
}

/// Releases the slot when dropped, including during unwinding
struct SlotGuard(Arc<AtomicBool>);

impl Drop for SlotGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Everything a successful full job produces
#[derive(Debug, Clone)]
pub struct FullReport {
    pub r: ComplexMatrix,
    pub q: ComplexMatrix,
    /// Kernel time in microseconds
    pub elapsed_micros: u64,
    pub verification: Verification,
}

/// What the continuation of a full job receives
pub type JobOutcome = Result<FullReport>;

/// Handle to a running full factorization
#[derive(Debug)]
pub struct FullJob {
    rx: Receiver<JobOutcome>,
    handle: Option<JoinHandle<()>>,
}

impl FullJob {
    /// `true` once the worker has finished (successfully or not)
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Run `continuation` on the outcome if it is ready, otherwise hand the
    /// job back.
    pub fn try_complete<T, F>(mut self, continuation: F) -> std::result::Result<T, FullJob>
    where
        F: FnOnce(JobOutcome) -> T,
    {
        let outcome = match self.rx.try_recv() {
            Ok(outcome) => outcome,
            Err(TryRecvError::Empty) => return Err(self),
            Err(TryRecvError::Disconnected) => lost_worker(),
        };
        self.join();
        Ok(continuation(outcome))
    }

    /// Block until the worker is done, then run `continuation` on the
    /// outcome.
    pub fn complete<T, F>(mut self, continuation: F) -> T
    where
        F: FnOnce(JobOutcome) -> T,
    {
        let outcome = self.rx.recv().unwrap_or_else(|_| lost_worker());
        self.join();
        continuation(outcome)
    }

    fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::warn!("{WORKER_THREAD_NAME} terminated abnormally");
            }
        }
    }
}

/// Start a full factorization (R, Q and verification) of the slot's matrix
/// on a worker thread.
///
/// Fails with [`QrError::JobInFlight`] while another job holds the slot.
/// Dropping the returned handle abandons the result; the worker still runs
/// to completion and releases the slot.
pub fn factor_full(slot: &MatrixSlot) -> Result<FullJob> {
    let guard = slot.try_acquire()?;
    let matrix = Arc::clone(&slot.matrix);
    let (tx, rx) = mpsc::channel();

    log::debug!(
        "submitting full factorization of {}x{}",
        matrix.rows(),
        matrix.cols()
    );

    let handle = thread::Builder::new()
        .name(WORKER_THREAD_NAME.to_string())
        .spawn(move || {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| run_full(&matrix)))
                .unwrap_or_else(|payload| {
                    let reason = panic_message(payload.as_ref());
                    log::warn!("{WORKER_THREAD_NAME} panicked: {reason}");
                    Err(QrError::FactorizationFailure {
                        column: 0,
                        reason: format!("worker panicked: {reason}"),
                    })
                });
            // the slot is free before the outcome becomes observable
            drop(guard);
            let _ = tx.send(outcome);
        })?;

    Ok(FullJob {
        rx,
        handle: Some(handle),
    })
}

fn run_full(a: &ComplexMatrix) -> JobOutcome {
    let f = factor(a, true)?;
    let q = f.q.ok_or_else(|| QrError::FactorizationFailure {
        column: 0,
        reason: "Q was not accumulated".to_string(),
    })?;
    let verification = verify(a, &f.r, &q)?;
    Ok(FullReport {
        r: f.r,
        q,
        elapsed_micros: f.elapsed_micros,
        verification,
    })
}

fn lost_worker() -> JobOutcome {
    Err(QrError::FactorizationFailure {
        column: 0,
        reason: "worker exited without reporting".to_string(),
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
