//! Raw matrix files
//!
//! A file is the interleaved layout of the matrix as big-endian IEEE-754
//! doubles, `2·m·n` of them, with no header. The reader must already know
//! the dimensions.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use crate::error::{QrError, Result};
use crate::matrix::ComplexMatrix;

pub const INPUT_FILE_NAME: &str = "A_matrix.dat";
pub const R_FILE_NAME: &str = "R_matrix.dat";
pub const Q_FILE_NAME: &str = "Q_matrix.dat";

const F64_BYTES: usize = std::mem::size_of::<f64>();

/// Write `matrix` to `path`, replacing any existing file
pub fn write_matrix<P: AsRef<Path>>(path: P, matrix: &ComplexMatrix) -> Result<()> {
    let path = path.as_ref();
    let mut out = BufWriter::new(File::create(path)?);
    for x in matrix.to_interleaved() {
        out.write_all(&x.to_be_bytes())?;
    }
    out.flush()?;
    log::debug!(
        "wrote {}x{} matrix to {}",
        matrix.rows(),
        matrix.cols(),
        path.display()
    );
    Ok(())
}

/// Read an m×n matrix from `path`
///
/// The file size must be exactly `16·m·n` bytes.
pub fn read_matrix<P: AsRef<Path>>(path: P, rows: usize, cols: usize) -> Result<ComplexMatrix> {
    let path = path.as_ref();
    let expected = 2 * rows * cols * F64_BYTES;
    let file = File::open(path)?;
    let actual = file.metadata()?.len() as usize;
    if actual != expected {
        return Err(QrError::mismatch(
            "read_matrix",
            (rows, cols),
            (actual / (2 * F64_BYTES), actual % (2 * F64_BYTES)),
        ));
    }

    let mut bytes = Vec::with_capacity(expected);
    BufReader::new(file).read_to_end(&mut bytes)?;
    if bytes.len() != expected {
        return Err(QrError::mismatch(
            "read_matrix",
            (rows, cols),
            (bytes.len() / (2 * F64_BYTES), bytes.len() % (2 * F64_BYTES)),
        ));
    }

    let flat: Vec<f64> = bytes
        .chunks_exact(F64_BYTES)
        .map(|chunk| {
            let mut b = [0u8; F64_BYTES];
            b.copy_from_slice(chunk);
            f64::from_be_bytes(b)
        })
        .collect();
    ComplexMatrix::from_interleaved(&flat, rows, cols)
}
