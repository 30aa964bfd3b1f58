//! Headless benchmark run
//!
//! Reads `params.txt` from the working directory (or the directory given as
//! the first argument), factors a random matrix of that size twice (R only,
//! then R and Q in the background with verification) and writes the input
//! and both factors next to the parameter file.
//!
//! ```text
//! cargo run --release --example benchmark -- /tmp/qr
//! ```

use std::path::PathBuf;
use std::time::Instant;

use complex_qr::config::PARAMETER_FILE_NAME;
use complex_qr::io::{write_matrix, INPUT_FILE_NAME, Q_FILE_NAME, R_FILE_NAME};
use complex_qr::{factor_fast, factor_full, flop_count, ComplexMatrix, Config, MatrixSlot};
use env_logger::Env;
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Simple benchmark timer
struct Benchmark {
    start: Instant,
    name: &'static str,
}

impl Benchmark {
    fn start(name: &'static str) -> Self {
        Self {
            start: Instant::now(),
            name,
        }
    }

    fn end(self) -> f64 {
        let elapsed_ms = self.start.elapsed().as_secs_f64() * 1000.0;
        println!("{:<30}: {:10.3} ms", self.name, elapsed_ms);
        elapsed_ms
    }
}

fn main() -> complex_qr::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let dir = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));

    let config = Config::from_file(dir.join(PARAMETER_FILE_NAME))?;
    println!("matrix: {} x {}", config.rows, config.cols);
    println!("{} flops per R-only factorization", flop_count(config.rows, config.cols));

    let mut rng = StdRng::from_entropy();
    let a = ComplexMatrix::random(config.rows, config.cols, &mut rng);
    write_matrix(dir.join(INPUT_FILE_NAME), &a)?;

    let bench = Benchmark::start("R only (wall)");
    let fast = factor_fast(&a)?;
    bench.end();
    println!("R only kernel: {} usec", fast.elapsed_micros);
    match fast.mflops() {
        Some(rate) => println!("R only rate: {:.1} Mflop/s", rate),
        None => println!("R only rate: too fast to time"),
    }

    println!("\nleading block of R:");
    let (m, n) = fast.r.shape();
    let block = ComplexMatrix::from_fn(m.min(4), n.min(3), |i, j| fast.r[(i, j)]);
    print!("{block}");

    let slot = MatrixSlot::new(a);
    let bench = Benchmark::start("R + Q + verify (wall)");
    let job = factor_full(&slot)?;
    let report = job.complete(|outcome| outcome)?;
    bench.end();

    write_matrix(dir.join(R_FILE_NAME), &report.r)?;
    write_matrix(dir.join(Q_FILE_NAME), &report.q)?;

    let v = &report.verification;
    println!("\nR + Q kernel: {} usec", report.elapsed_micros);
    println!("|QR - A|     = {:e}", v.reconstruction_error);
    println!("|QhQ - I|    = {:e}", v.unitarity_error);
    println!("det(QhQ)     = {}", v.determinant);
    println!("verification: {}", if v.passed { "PASSED" } else { "FAILED" });

    Ok(())
}
