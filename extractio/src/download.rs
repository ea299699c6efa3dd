use std::io::Write;

use anyhow::{Context, Result};

use crate::prettyprint_usize;

/// Downloads bytes from a URL, blocking until complete.
pub fn download_bytes<I: AsRef<str>>(url: I) -> Result<Vec<u8>> {
    let url = url.as_ref();
    info!("Downloading {}", url);
    let resp = reqwest::blocking::get(url).with_context(|| format!("downloading {}", url))?;
    resp.error_for_status_ref()
        .with_context(|| format!("downloading {}", url))?;
    let bytes = resp
        .bytes()
        .with_context(|| format!("reading the response from {}", url))?;
    info!(
        "Downloaded {} bytes from {}",
        prettyprint_usize(bytes.len()),
        url
    );
    Ok(bytes.to_vec())
}

/// Downloads a URL to a file, creating the parent directory if needed.
pub fn download_to_file<I: AsRef<str>>(url: I, path: &str) -> Result<()> {
    let bytes = download_bytes(url)?;
    if let Some(parent) = std::path::Path::new(path).parent() {
        fs_err::create_dir_all(parent)?;
    }
    let mut file = fs_err::File::create(path)?;
    file.write_all(&bytes)?;
    Ok(())
}
