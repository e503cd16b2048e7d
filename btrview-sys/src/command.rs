// SPDX-License-Identifier: GPL-3.0-only

use std::ffi::OsStr;
use std::process::Command;

use crate::{Result, SysError};

/// Fail with [`SysError::ToolMissing`] unless `tool` is on `PATH`.
pub fn require_tool(tool: &str) -> Result<()> {
    which::which(tool)
        .map(|_| ())
        .map_err(|_| SysError::ToolMissing(tool.to_string()))
}

/// Run `command` and return its stdout; a non-zero exit is an error that
/// carries the command line and stderr.
pub fn run_capture<S: AsRef<OsStr>>(command: &str, args: &[S]) -> Result<String> {
    let rendered: Vec<String> = args
        .iter()
        .map(|arg| arg.as_ref().to_string_lossy().into_owned())
        .collect();
    tracing::debug!(command, args = ?rendered, "running");

    let output = Command::new(command).args(args).output()?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(SysError::CommandFailed(format!(
            "{command} {} failed: {}",
            rendered.join(" "),
            stderr.trim()
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

/// Whether the process runs with effective UID 0.
pub fn is_root() -> bool {
    unsafe { libc::geteuid() == 0 }
}
