// SPDX-License-Identifier: GPL-3.0-only

//! Canonical models for btrview
//!
//! These types are shared by every crate in the workspace:
//!
//! - **btrview-sys**: produces [`SubvolumeRecord`]s and [`FilesystemInfo`]s
//!   from `btrfs` and `findmnt`
//! - **btrview-forest**: consumes them to build containment and lineage forests
//! - **btrview-cli**: loads/dumps them as JSON inventories
//!
//! Nothing here performs I/O.

pub mod inventory;
pub mod mount;
pub mod property;
pub mod subvolume;

pub use inventory::{FilesystemRecords, InventoryDump};
pub use mount::{FilesystemInfo, Mount, MountTable};
pub use property::{ParsePropertyError, Property};
pub use subvolume::{FS_TREE_ID, FS_TREE_NAME, SubvolumeRecord, name_from_path, normalize_path};
