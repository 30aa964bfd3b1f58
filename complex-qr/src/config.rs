//! Matrix dimensions from a `key = value` parameter file
//!
//! ```text
//! // benchmark size
//! rows = 384
//! cols = 200
//! ```
//!
//! Recognised keys are `rows` and `cols`. Blank lines, `//` comments, lines
//! without `=` and unknown keys are skipped.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use crate::error::{QrError, Result};

/// Conventional name of the parameter file
pub const PARAMETER_FILE_NAME: &str = "params.txt";

pub const DEFAULT_ROWS: usize = 192;
pub const DEFAULT_COLS: usize = 120;

/// Smallest accepted value for either dimension
pub const DIM_MIN: usize = 2;
pub const ROWS_MAX: usize = 400;
pub const COLS_MAX: usize = 240;

/// Problem size of a benchmark run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    pub rows: usize,
    pub cols: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rows: DEFAULT_ROWS,
            cols: DEFAULT_COLS,
        }
    }
}

impl Config {
    /// Parse parameter text. Keys that are absent keep their defaults.
    pub fn parse(text: &str) -> Result<Self> {
        let mut config = Self::default();

        for (lineno, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with("//") {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let key = key.trim();
            let value = value.trim();

            match key {
                "rows" => config.rows = parse_dim(key, value, ROWS_MAX, lineno + 1)?,
                "cols" => config.cols = parse_dim(key, value, COLS_MAX, lineno + 1)?,
                _ => {
                    log::debug!("params line {}: ignoring unknown key '{}'", lineno + 1, key);
                    continue;
                }
            }
            log::debug!("params line {}: {} = {}", lineno + 1, key, value);
        }

        config.validate()?;
        Ok(config)
    }

    /// Load from `path`, falling back to the defaults when the file does not
    /// exist.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(text) => Self::parse(&text),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                let config = Self::default();
                log::info!(
                    "{} not found, using defaults {}x{}",
                    path.display(),
                    config.rows,
                    config.cols
                );
                Ok(config)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Bounds on each dimension and `rows >= cols`
    pub fn validate(&self) -> Result<()> {
        check_range("rows", self.rows, ROWS_MAX)?;
        check_range("cols", self.cols, COLS_MAX)?;
        if self.rows < self.cols {
            return Err(QrError::Configuration(format!(
                "rows ({}) must not be less than cols ({})",
                self.rows, self.cols
            )));
        }
        Ok(())
    }
}

fn parse_dim(key: &str, value: &str, max: usize, lineno: usize) -> Result<usize> {
    let n: usize = value.parse().map_err(|_| {
        QrError::Configuration(format!(
            "line {lineno}: {key} must be an integer, got '{value}'"
        ))
    })?;
    check_range(key, n, max)?;
    Ok(n)
}

fn check_range(key: &str, n: usize, max: usize) -> Result<()> {
    if !(DIM_MIN..=max).contains(&n) {
        return Err(QrError::Configuration(format!(
            "{key} = {n} is outside {DIM_MIN}..={max}"
        )));
    }
    Ok(())
}
