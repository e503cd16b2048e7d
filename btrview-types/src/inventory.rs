// SPDX-License-Identifier: GPL-3.0-only

use serde::{Deserialize, Serialize};

use crate::mount::FilesystemInfo;
use crate::subvolume::SubvolumeRecord;

/// Every subvolume record enumerated on one filesystem, plus its default ID
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilesystemRecords {
    pub filesystem: FilesystemInfo,
    pub subvolumes: Vec<SubvolumeRecord>,
    #[serde(default)]
    pub default_id: Option<u64>,
}

impl FilesystemRecords {
    pub fn title(&self) -> &str {
        self.filesystem.title()
    }
}

/// JSON document written by `--dump` and read back by `--input`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryDump {
    pub filesystems: Vec<FilesystemRecords>,
}

impl InventoryDump {
    /// Keep only filesystems whose label is in `labels`; an empty list keeps all.
    pub fn select_labels(&mut self, labels: &[String]) {
        if labels.is_empty() {
            return;
        }
        self.filesystems.retain(|fs| {
            fs.filesystem
                .label
                .as_ref()
                .is_some_and(|label| labels.contains(label))
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mount::{Mount, MountTable};
    use uuid::Uuid;

    fn sample_filesystem(label: Option<&str>) -> FilesystemRecords {
        FilesystemRecords {
            filesystem: FilesystemInfo {
                uuid: format!("fs-{}", label.unwrap_or("none")),
                label: label.map(ToString::to_string),
                mounts: MountTable::new([Mount::new("/", "/mnt")]),
            },
            subvolumes: vec![SubvolumeRecord::new(256, Uuid::from_u128(1), "@")],
            default_id: Some(256),
        }
    }

    #[test]
    fn serde_roundtrip_inventory() {
        let dump = InventoryDump {
            filesystems: vec![sample_filesystem(Some("pool"))],
        };

        let json = serde_json::to_string(&dump).expect("serialize inventory");
        let parsed: InventoryDump = serde_json::from_str(&json).expect("deserialize inventory");

        assert_eq!(parsed, dump);
    }

    #[test]
    fn label_selection_keeps_matching_filesystems() {
        let mut dump = InventoryDump {
            filesystems: vec![
                sample_filesystem(Some("pool")),
                sample_filesystem(Some("backup")),
                sample_filesystem(None),
            ],
        };

        dump.select_labels(&[]);
        assert_eq!(dump.filesystems.len(), 3);

        dump.select_labels(&["backup".to_string()]);
        assert_eq!(dump.filesystems.len(), 1);
        assert_eq!(dump.filesystems[0].title(), "backup");
    }
}
