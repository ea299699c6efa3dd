//! Plumbing shared by the extract cache and the CLI: blocking downloads,
//! subprocess invocation with captured diagnostics, logging setup, and a few
//! file helpers.

#[macro_use]
extern crate log;

pub mod logger;

mod download;
mod process;

pub use crate::download::{download_bytes, download_to_file};
pub use crate::process::run_cmd;

use std::path::Path;

use anyhow::Result;

/// Reads an entire file into memory.
pub fn slurp_file<P: AsRef<Path>>(path: P) -> Result<Vec<u8>> {
    Ok(fs_err::read(path.as_ref())?)
}

/// Writes a string to a file, creating the parent directory if needed.
pub fn write_file<P: AsRef<Path>>(path: P, contents: &str) -> Result<()> {
    if let Some(parent) = path.as_ref().parent() {
        fs_err::create_dir_all(parent)?;
    }
    fs_err::write(path.as_ref(), contents)?;
    Ok(())
}

/// The size of a file in bytes.
pub fn file_size<P: AsRef<Path>>(path: P) -> Result<u64> {
    Ok(fs_err::metadata(path.as_ref())?.len())
}

pub fn prettyprint_usize(x: usize) -> String {
    let raw = x.to_string();
    let mut result = String::new();
    for (idx, c) in raw.chars().enumerate() {
        if idx > 0 && (raw.len() - idx) % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prettyprint_usize() {
        assert_eq!(prettyprint_usize(0), "0");
        assert_eq!(prettyprint_usize(999), "999");
        assert_eq!(prettyprint_usize(1000), "1,000");
        assert_eq!(prettyprint_usize(500_000_000), "500,000,000");
    }
}
