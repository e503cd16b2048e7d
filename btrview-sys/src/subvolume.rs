// SPDX-License-Identifier: GPL-3.0-only

//! Subvolume enumeration through `btrfs subvolume list/show/get-default`.

use std::collections::{HashMap, HashSet};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use btrview_types::{
    FS_TREE_ID, FS_TREE_NAME, FilesystemInfo, FilesystemRecords, Property, SubvolumeRecord,
};
use chrono::{DateTime, FixedOffset};
use uuid::Uuid;

use crate::command::{require_tool, run_capture};
use crate::{Result, SysError};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S %z";

/// `BTRFS_ROOT_SUBVOL_RDONLY`
const FLAG_READONLY: u64 = 1;

/// Value following `keyword` in a whitespace-split line; `-` means unset.
fn field<'a>(parts: &[&'a str], keyword: &str) -> Option<&'a str> {
    parts
        .iter()
        .position(|&part| part == keyword)
        .and_then(|idx| parts.get(idx + 1))
        .copied()
        .filter(|value| *value != "-")
}

fn parse_u64(value: Option<&str>, what: &str, line: &str) -> Result<Option<u64>> {
    value
        .map(|value| {
            value
                .parse::<u64>()
                .map_err(|_| SysError::ParseError(format!("invalid {what} '{value}' in: {line}")))
        })
        .transpose()
}

fn parse_uuid(value: Option<&str>, what: &str, line: &str) -> Result<Option<Uuid>> {
    value
        .map(|value| {
            Uuid::parse_str(value)
                .map_err(|_| SysError::ParseError(format!("invalid {what} '{value}' in: {line}")))
        })
        .transpose()
}

fn parse_time(value: &str) -> Option<DateTime<FixedOffset>> {
    match DateTime::parse_from_str(value, TIME_FORMAT) {
        Ok(time) => Some(time),
        Err(e) => {
            tracing::debug!(value, "unparseable time: {e}");
            None
        }
    }
}

/// IDs of 0 stand for "no parent" in btrfs output.
fn nonzero(id: Option<u64>) -> Option<u64> {
    id.filter(|&id| id != 0)
}

/// Parse `btrfs subvolume list -a -p -c -u -q -R` output.
///
/// With `deleted`, the lines come from `list -d` and describe subvolumes
/// pending cleanup; their paths are meaningless and dropped.
pub fn parse_subvolume_list(output: &str, deleted: bool) -> Result<Vec<SubvolumeRecord>> {
    let mut records = Vec::new();

    // ID 256 gen 89534 cgen 8 parent 5 top level 5 parent_uuid - received_uuid - uuid ... path ...
    for line in output.lines() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.first() != Some(&"ID") {
            continue;
        }

        let path_idx = parts.iter().position(|&part| part == "path");
        let head = &parts[..path_idx.unwrap_or(parts.len())];

        let Some(id) = parse_u64(head.get(1).copied(), "ID", line)? else {
            continue;
        };
        let Some(uuid) = parse_uuid(field(head, "uuid"), "uuid", line)? else {
            tracing::warn!(id, "subvolume listed without uuid, skipping");
            continue;
        };

        let mut record = if deleted {
            SubvolumeRecord::new_deleted(id, uuid)
        } else {
            let Some(idx) = path_idx else {
                tracing::warn!(id, "subvolume listed without path, skipping");
                continue;
            };
            SubvolumeRecord::new(id, uuid, parts[idx + 1..].join(" "))
        };

        record.generation = parse_u64(field(head, "gen"), "gen", line)?;
        record.otransid = parse_u64(field(head, "cgen"), "cgen", line)?;
        record.parent_id = nonzero(parse_u64(field(head, "parent"), "parent", line)?);
        record.top_level_id = nonzero(parse_u64(field(head, "level"), "top level", line)?);
        record.parent_uuid = parse_uuid(field(head, "parent_uuid"), "parent_uuid", line)?;
        record.received_uuid = parse_uuid(field(head, "received_uuid"), "received_uuid", line)?;

        records.push(record);
    }

    Ok(records)
}

/// Parse `btrfs subvolume show` output into a full record.
pub fn parse_subvolume_show(output: &str) -> Result<SubvolumeRecord> {
    let mut lines = output.lines().filter(|line| !line.trim().is_empty());
    let path = lines
        .next()
        .map(str::trim)
        .ok_or_else(|| SysError::ParseError("empty subvolume show output".to_string()))?;

    let mut values: HashMap<Property, &str> = HashMap::new();
    for line in lines {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let Ok(property) = key.parse::<Property>() else {
            continue;
        };
        let value = value.trim();
        if !value.is_empty() && value != "-" {
            values.entry(property).or_insert(value);
        }
    }

    let number = |property: Property| -> Result<Option<u64>> {
        parse_u64(values.get(&property).copied(), property.as_str(), path)
    };
    let uuid_of = |property: Property| -> Result<Option<Uuid>> {
        parse_uuid(values.get(&property).copied(), property.as_str(), path)
    };
    let time = |property: Property| values.get(&property).and_then(|value| parse_time(value));

    let id = number(Property::Id)?.ok_or_else(|| {
        SysError::ParseError(format!("no subvolume ID in show output for {path}"))
    })?;

    let mut record = if id == FS_TREE_ID {
        let mut record = SubvolumeRecord::new(id, Uuid::nil(), "/");
        record.name = FS_TREE_NAME.to_string();
        record
    } else {
        SubvolumeRecord::new(id, Uuid::nil(), path)
    };
    if let Some(uuid) = uuid_of(Property::Uuid)? {
        record.uuid = uuid;
    }
    if id != FS_TREE_ID
        && let Some(name) = values.get(&Property::Name)
    {
        record.name = (*name).to_string();
    }

    record.parent_uuid = uuid_of(Property::ParentUuid)?;
    record.received_uuid = uuid_of(Property::ReceivedUuid)?;
    record.parent_id = nonzero(number(Property::ParentId)?);
    record.top_level_id = nonzero(number(Property::TopLevelId)?);
    record.generation = number(Property::Generation)?;
    record.otransid = number(Property::GenAtCreation)?;
    record.ctransid = number(Property::Ctransid)?;
    record.stransid = number(Property::SendTransid)?;
    record.rtransid = number(Property::ReceiveTransid)?;
    record.otime = time(Property::CreationTime);
    record.ctime = time(Property::ChangeTime);
    record.stime = time(Property::SendTime);
    record.rtime = time(Property::ReceiveTime);
    record.flags = match values.get(&Property::Flags) {
        Some(&"readonly") => Some(FLAG_READONLY),
        Some(other) => {
            tracing::debug!(flags = *other, "unrecognised subvolume flags");
            None
        }
        None => Some(0),
    };

    Ok(record)
}

/// Parse `btrfs subvolume get-default`: `ID 256 gen ... path @` or
/// `ID 5 (FS_TREE)`.
pub fn parse_default_subvolume(output: &str) -> Result<u64> {
    let parts: Vec<&str> = output.split_whitespace().collect();
    parse_u64(field(&parts, "ID"), "default subvolume ID", output.trim())?.ok_or_else(|| {
        SysError::ParseError(format!(
            "no subvolume ID in get-default output: {}",
            output.trim()
        ))
    })
}

/// Enumerates the subvolumes of the filesystem mounted at one path
pub struct SubvolumeLister {
    mount_point: PathBuf,
}

impl SubvolumeLister {
    pub fn new(mount_point: impl Into<PathBuf>) -> Result<Self> {
        let mount_point = mount_point.into();
        if !mount_point.is_dir() {
            return Err(SysError::NotMounted(mount_point.display().to_string()));
        }
        Ok(Self { mount_point })
    }

    /// Lister rooted at the first mount of `fs`.
    pub fn for_filesystem(fs: &FilesystemInfo) -> Result<Self> {
        let target = fs
            .mounts
            .primary_target()
            .ok_or_else(|| SysError::NotMounted(fs.title().to_string()))?;
        Self::new(target)
    }

    pub fn mount_point(&self) -> &Path {
        &self.mount_point
    }

    fn btrfs(&self, args: &[&str]) -> Result<String> {
        require_tool("btrfs")?;
        let mut full: Vec<&OsStr> = args.iter().map(OsStr::new).collect();
        full.push(self.mount_point.as_os_str());
        run_capture("btrfs", &full)
    }

    /// Every live subvolume except the top-level tree.
    pub fn list_all(&self) -> Result<Vec<SubvolumeRecord>> {
        let output = self.btrfs(&["subvolume", "list", "-a", "-p", "-c", "-u", "-q", "-R"])?;
        let records = parse_subvolume_list(&output, false)?;
        if records.is_empty() {
            tracing::debug!(
                mount = %self.mount_point.display(),
                "no subvolumes besides the top level"
            );
        }
        Ok(records)
    }

    /// Subvolumes deleted but not yet cleaned up.
    pub fn list_deleted(&self) -> Result<Vec<SubvolumeRecord>> {
        let output = self.btrfs(&["subvolume", "list", "-d", "-a", "-p", "-u", "-q", "-R"])?;
        parse_subvolume_list(&output, true)
    }

    pub fn show_by_id(&self, id: u64) -> Result<SubvolumeRecord> {
        let id = id.to_string();
        let output = self.btrfs(&["subvolume", "show", "-r", id.as_str()])?;
        parse_subvolume_show(&output)
    }

    #[cfg(not(feature = "native"))]
    pub fn default_id(&self) -> Result<u64> {
        let output = self.btrfs(&["subvolume", "get-default"])?;
        parse_default_subvolume(&output)
    }

    #[cfg(feature = "native")]
    pub fn default_id(&self) -> Result<u64> {
        use btrfsutil::subvolume::Subvolume;

        let root = Subvolume::try_from(self.mount_point.as_path()).map_err(|e| {
            SysError::NotMounted(format!("{}: {}", self.mount_point.display(), e))
        })?;
        let default = Subvolume::get_default(&root).map_err(|e| {
            SysError::CommandFailed(format!("Failed to get default subvolume: {}", e))
        })?;
        Ok(default.id())
    }

    /// All records of `fs`: the top-level tree, live subvolumes, and
    /// deleted ones still pending cleanup.
    ///
    /// Only the live listing is required; the rest degrade to warnings.
    pub fn enumerate(&self, fs: &FilesystemInfo) -> Result<FilesystemRecords> {
        let mut subvolumes = Vec::new();

        match self.show_by_id(FS_TREE_ID) {
            Ok(mut top) => {
                if top.uuid.is_nil()
                    && let Ok(fs_uuid) = Uuid::parse_str(&fs.uuid)
                {
                    top.uuid = fs_uuid;
                }
                subvolumes.push(top);
            }
            Err(err) => tracing::warn!(filesystem = fs.title(), "top-level subvolume: {err}"),
        }

        subvolumes.extend(self.list_all()?);

        match self.list_deleted() {
            Ok(deleted) => {
                let known: HashSet<Uuid> = subvolumes.iter().map(|record| record.uuid).collect();
                let pending: Vec<SubvolumeRecord> = deleted
                    .into_iter()
                    .filter(|record| !known.contains(&record.uuid))
                    .collect();
                tracing::debug!(
                    filesystem = fs.title(),
                    count = pending.len(),
                    "deleted subvolumes"
                );
                subvolumes.extend(pending);
            }
            Err(err) => tracing::warn!(filesystem = fs.title(), "deleted subvolumes: {err}"),
        }

        let default_id = match self.default_id() {
            Ok(id) => Some(id),
            Err(err) => {
                tracing::warn!(filesystem = fs.title(), "default subvolume: {err}");
                None
            }
        };

        tracing::info!(
            filesystem = fs.title(),
            records = subvolumes.len(),
            "enumerated subvolumes"
        );
        Ok(FilesystemRecords {
            filesystem: fs.clone(),
            subvolumes,
            default_id,
        })
    }
}
