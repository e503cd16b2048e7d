// SPDX-License-Identifier: GPL-3.0-only

use std::path::PathBuf;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Subvolume ID of the top-level tree.
pub const FS_TREE_ID: u64 = 5;

/// Name used for the top-level tree, which has no path component of its own.
pub const FS_TREE_NAME: &str = "<FS_TREE>";

/// Metadata for one subvolume or snapshot on a BTRFS filesystem
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubvolumeRecord {
    // Identity
    pub id: u64,
    #[serde(default)]
    pub parent_id: Option<u64>,
    #[serde(default)]
    pub top_level_id: Option<u64>,

    // UUIDs for tracking relationships
    pub uuid: Uuid,
    #[serde(default)]
    pub parent_uuid: Option<Uuid>, // For snapshot source tracking
    #[serde(default)]
    pub received_uuid: Option<Uuid>, // For send/receive tracking

    /// Path inside the filesystem (`/@home`), `None` once deleted
    #[serde(default)]
    pub path: Option<String>,
    pub name: String,
    #[serde(default)]
    pub deleted: bool,
    #[serde(default)]
    pub mountpoints: Vec<PathBuf>,

    // Transaction IDs
    #[serde(default)]
    pub generation: Option<u64>,
    #[serde(default)]
    pub otransid: Option<u64>,
    #[serde(default)]
    pub ctransid: Option<u64>,
    #[serde(default)]
    pub stransid: Option<u64>,
    #[serde(default)]
    pub rtransid: Option<u64>,

    // Timestamps
    #[serde(default)]
    pub otime: Option<DateTime<FixedOffset>>,
    #[serde(default)]
    pub ctime: Option<DateTime<FixedOffset>>,
    #[serde(default)]
    pub stime: Option<DateTime<FixedOffset>>,
    #[serde(default)]
    pub rtime: Option<DateTime<FixedOffset>>,

    #[serde(default)]
    pub flags: Option<u64>,
}

impl SubvolumeRecord {
    /// A live subvolume at `path` with no parentage and no optional metadata.
    pub fn new(id: u64, uuid: Uuid, path: impl Into<String>) -> Self {
        let path = normalize_path(&path.into());
        Self {
            id,
            parent_id: None,
            top_level_id: None,
            uuid,
            parent_uuid: None,
            received_uuid: None,
            name: name_from_path(&path),
            path: Some(path),
            deleted: false,
            mountpoints: Vec::new(),
            generation: None,
            otransid: None,
            ctransid: None,
            stransid: None,
            rtransid: None,
            otime: None,
            ctime: None,
            stime: None,
            rtime: None,
            flags: None,
        }
    }

    /// A subvolume that is pending cleanup. It keeps its identity but has no path.
    pub fn new_deleted(id: u64, uuid: Uuid) -> Self {
        let mut record = Self::new(id, uuid, "");
        record.path = None;
        record.name = uuid.to_string();
        record.deleted = true;
        record
    }

    pub fn with_parent_id(mut self, parent_id: u64) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    pub fn with_parent_uuid(mut self, parent_uuid: Uuid) -> Self {
        self.parent_uuid = Some(parent_uuid);
        self
    }

    pub fn with_received_uuid(mut self, received_uuid: Uuid) -> Self {
        self.received_uuid = Some(received_uuid);
        self
    }

    pub fn with_otime(mut self, otime: DateTime<FixedOffset>) -> Self {
        self.otime = Some(otime);
        self
    }

    pub fn with_generation(mut self, generation: u64) -> Self {
        self.generation = Some(generation);
        self
    }

    pub fn is_root_subvolume(&self) -> bool {
        self.id == FS_TREE_ID
    }

    pub fn is_snapshot(&self) -> bool {
        self.parent_uuid.is_some()
    }

    /// Name followed by the mount targets it is mounted on, if any.
    pub fn display_name(&self) -> String {
        if self.mountpoints.is_empty() {
            return self.name.clone();
        }

        let targets: Vec<String> = self
            .mountpoints
            .iter()
            .map(|mountpoint| mountpoint.display().to_string())
            .collect();
        format!("{} on: {}", self.name, targets.join(", "))
    }
}

/// Bring a path reported by btrfs-progs into `/`-rooted form.
///
/// `btrfs subvolume list -a` prefixes paths with `<FS_TREE>/`; that prefix
/// names the top-level tree and is dropped.
pub fn normalize_path(path: &str) -> String {
    let path = path.trim();
    let path = path
        .strip_prefix(FS_TREE_NAME)
        .unwrap_or(path)
        .trim_start_matches('/');
    format!("/{path}")
}

/// Last component of a normalized path, or [`FS_TREE_NAME`] for `/`.
pub fn name_from_path(path: &str) -> String {
    path.rsplit('/')
        .find(|component| !component.is_empty())
        .map(ToString::to_string)
        .unwrap_or_else(|| FS_TREE_NAME.to_string())
}
