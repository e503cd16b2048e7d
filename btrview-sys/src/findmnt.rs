// SPDX-License-Identifier: GPL-3.0-only

//! Mounted BTRFS filesystems, as reported by `findmnt`.

use btrview_types::{FilesystemInfo, Mount, MountTable};
use serde::Deserialize;

use crate::command::{require_tool, run_capture};
use crate::{Result, SysError};

const FINDMNT_ARGS: [&str; 6] = [
    "--list",
    "--json",
    "--types",
    "btrfs",
    "--output",
    "label,uuid,fsroot,target",
];

#[derive(Debug, Deserialize)]
struct FindmntOutput {
    #[serde(default)]
    filesystems: Vec<FindmntEntry>,
}

#[derive(Debug, Deserialize)]
struct FindmntEntry {
    label: Option<String>,
    uuid: Option<String>,
    fsroot: Option<String>,
    target: String,
}

/// Group `findmnt --json` rows into one [`FilesystemInfo`] per UUID, in
/// order of first appearance.
pub fn parse_findmnt(json: &str) -> Result<Vec<FilesystemInfo>> {
    if json.trim().is_empty() {
        return Ok(Vec::new());
    }

    let output: FindmntOutput = serde_json::from_str(json)
        .map_err(|e| SysError::ParseError(format!("findmnt output: {e}")))?;

    let mut order: Vec<String> = Vec::new();
    let mut labels: Vec<Option<String>> = Vec::new();
    let mut mounts: Vec<Vec<Mount>> = Vec::new();

    for entry in output.filesystems {
        let Some(uuid) = entry.uuid.filter(|uuid| !uuid.is_empty()) else {
            tracing::debug!(mount_target = %entry.target, "skipping btrfs mount without uuid");
            continue;
        };
        let mount = Mount::new(entry.fsroot.unwrap_or_else(|| "/".to_string()), entry.target);

        match order.iter().position(|known| *known == uuid) {
            Some(slot) => {
                mounts[slot].push(mount);
                if labels[slot].is_none() {
                    labels[slot] = entry.label;
                }
            }
            None => {
                order.push(uuid);
                labels.push(entry.label);
                mounts.push(vec![mount]);
            }
        }
    }

    Ok(order
        .into_iter()
        .zip(labels)
        .zip(mounts)
        .map(|((uuid, label), mounts)| FilesystemInfo {
            uuid,
            label,
            mounts: MountTable::new(mounts),
        })
        .collect())
}

/// Every mounted BTRFS filesystem, narrowed to `labels` unless empty.
pub fn discover_filesystems(labels: &[String]) -> Result<Vec<FilesystemInfo>> {
    require_tool("findmnt")?;
    let json = run_capture("findmnt", &FINDMNT_ARGS[..]).or_else(|err| match err {
        // findmnt exits 1 when nothing matches
        SysError::CommandFailed(_) => Ok(String::new()),
        other => Err(other),
    })?;

    let filesystems = parse_findmnt(&json)?;
    if filesystems.is_empty() {
        return Err(SysError::NoBtrfs);
    }
    tracing::info!(count = filesystems.len(), "found mounted btrfs filesystems");

    if labels.is_empty() {
        return Ok(filesystems);
    }

    let selected: Vec<FilesystemInfo> = filesystems
        .into_iter()
        .filter(|fs| fs.label.as_ref().is_some_and(|label| labels.contains(label)))
        .collect();
    for label in labels {
        if !selected.iter().any(|fs| fs.label.as_ref() == Some(label)) {
            tracing::warn!(label = %label, "no mounted btrfs filesystem with this label");
        }
    }
    Ok(selected)
}
