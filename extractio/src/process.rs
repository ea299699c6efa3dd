use std::process::Command;

use anyhow::{bail, Result};

/// Runs a command, capturing its output. A spawn failure or a non-zero exit
/// becomes an error carrying whatever the tool printed, so callers can
/// surface the diagnostics.
pub fn run_cmd(cmd: &mut Command) -> Result<String> {
    info!("Running {:?}", cmd);
    let out = match cmd.output() {
        Ok(out) => out,
        Err(err) => bail!("failed to run {:?}: {}", cmd, err),
    };
    let stdout = String::from_utf8_lossy(&out.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&out.stderr).into_owned();
    if !out.status.success() {
        bail!(
            "{:?} failed: {}",
            cmd,
            if stderr.is_empty() { stdout } else { stderr }
        );
    }
    Ok(stdout)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_captures_stdout() {
        let out = run_cmd(Command::new("sh").arg("-c").arg("echo hello")).unwrap();
        assert_eq!(out.trim(), "hello");
    }

    #[test]
    fn test_nonzero_exit_carries_stderr() {
        let err = run_cmd(Command::new("sh").arg("-c").arg("echo oops >&2; exit 3")).unwrap_err();
        assert!(err.to_string().contains("oops"), "got: {}", err);
    }

    #[test]
    fn test_missing_binary() {
        assert!(run_cmd(&mut Command::new("definitely-not-a-real-binary")).is_err());
    }
}
