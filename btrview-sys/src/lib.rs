// SPDX-License-Identifier: GPL-3.0-only

//! System collaborators for btrview
//!
//! Everything that touches the running system lives here:
//! - subvolume enumeration through `btrfs subvolume list/show/get-default`
//! - mount discovery through `findmnt --json`
//! - the effective-UID check
//!
//! The parsers are exposed separately so captured command output can be
//! turned into records without running anything.

pub mod command;
pub mod error;
pub mod findmnt;
pub mod subvolume;

pub use command::{is_root, require_tool, run_capture};
pub use error::{Result, SysError};
pub use findmnt::{discover_filesystems, parse_findmnt};
pub use subvolume::{
    SubvolumeLister, parse_default_subvolume, parse_subvolume_list, parse_subvolume_show,
};
