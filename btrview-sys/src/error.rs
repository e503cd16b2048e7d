// SPDX-License-Identifier: GPL-3.0-only

use thiserror::Error;

/// Error types for enumerating subvolumes and mounts
#[derive(Error, Debug)]
pub enum SysError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Command execution failed: {0}")]
    CommandFailed(String),

    #[error("Required tool not found in PATH: {0}")]
    ToolMissing(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("No mounted BTRFS filesystem found")]
    NoBtrfs,

    #[error("Filesystem not mounted: {0}")]
    NotMounted(String),
}

/// Result type alias for system operations
pub type Result<T> = std::result::Result<T, SysError>;
