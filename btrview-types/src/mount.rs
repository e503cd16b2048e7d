// SPDX-License-Identifier: GPL-3.0-only

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// One place a BTRFS filesystem is mounted: the subvolume path mounted
/// (`fsroot`, as `findmnt` reports it) and where it appears on the host.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Mount {
    pub fsroot: PathBuf,
    pub target: PathBuf,
}

impl Mount {
    pub fn new(fsroot: impl Into<PathBuf>, target: impl Into<PathBuf>) -> Self {
        Self {
            fsroot: fsroot.into(),
            target: target.into(),
        }
    }

    /// Host path at which the filesystem-internal `path` is visible through
    /// this mount, if `path` lies under the mounted subvolume.
    pub fn resolve(&self, path: &Path) -> Option<PathBuf> {
        let relative = path.strip_prefix(&self.fsroot).ok()?;
        if relative.as_os_str().is_empty() {
            Some(self.target.clone())
        } else {
            Some(self.target.join(relative))
        }
    }
}

impl fmt::Display for Mount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} on {}", self.fsroot.display(), self.target.display())
    }
}

/// All mounts of one filesystem instance, deduplicated and ordered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MountTable {
    mounts: Vec<Mount>,
}

impl MountTable {
    pub fn new(mounts: impl IntoIterator<Item = Mount>) -> Self {
        let mounts: BTreeSet<Mount> = mounts.into_iter().collect();
        Self {
            mounts: mounts.into_iter().collect(),
        }
    }

    pub fn mounts(&self) -> &[Mount] {
        &self.mounts
    }

    pub fn is_empty(&self) -> bool {
        self.mounts.is_empty()
    }

    /// First mount target, used as the handle for enumerating subvolumes.
    pub fn primary_target(&self) -> Option<&Path> {
        self.mounts.first().map(|mount| mount.target.as_path())
    }

    /// Targets at which the subvolume at `path` itself is mounted.
    pub fn mountpoints_of(&self, path: &str) -> Vec<PathBuf> {
        let path = Path::new(path);
        self.mounts
            .iter()
            .filter(|mount| mount.fsroot == path)
            .map(|mount| mount.target.clone())
            .collect()
    }

    /// Every host path through which `path` can be reached.
    pub fn accessible_paths(&self, path: &str) -> Vec<PathBuf> {
        let path = Path::new(path);
        self.mounts
            .iter()
            .filter_map(|mount| mount.resolve(path))
            .collect()
    }
}

/// A mounted BTRFS filesystem instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilesystemInfo {
    pub uuid: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub mounts: MountTable,
}

impl FilesystemInfo {
    /// Label if the filesystem has one, otherwise its UUID.
    pub fn title(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.uuid)
    }
}
