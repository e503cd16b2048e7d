// SPDX-License-Identifier: GPL-3.0-only

//! Named subvolume attributes that can stand in for a node label.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::subvolume::SubvolumeRecord;

/// Property name that matched no attribute of [`SubvolumeRecord`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown subvolume property '{0}'")]
pub struct ParsePropertyError(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Property {
    Name,
    Path,
    Id,
    ParentId,
    TopLevelId,
    Uuid,
    ParentUuid,
    ReceivedUuid,
    Generation,
    GenAtCreation,
    Ctransid,
    SendTransid,
    ReceiveTransid,
    CreationTime,
    ChangeTime,
    SendTime,
    ReceiveTime,
    Flags,
    Deleted,
    Mountpoints,
}

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S %z";

impl Property {
    pub const ALL: [Property; 20] = [
        Property::Name,
        Property::Path,
        Property::Id,
        Property::ParentId,
        Property::TopLevelId,
        Property::Uuid,
        Property::ParentUuid,
        Property::ReceivedUuid,
        Property::Generation,
        Property::GenAtCreation,
        Property::Ctransid,
        Property::SendTransid,
        Property::ReceiveTransid,
        Property::CreationTime,
        Property::ChangeTime,
        Property::SendTime,
        Property::ReceiveTime,
        Property::Flags,
        Property::Deleted,
        Property::Mountpoints,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Property::Name => "name",
            Property::Path => "path",
            Property::Id => "id",
            Property::ParentId => "parent_id",
            Property::TopLevelId => "top_level_id",
            Property::Uuid => "uuid",
            Property::ParentUuid => "parent_uuid",
            Property::ReceivedUuid => "received_uuid",
            Property::Generation => "generation",
            Property::GenAtCreation => "gen_at_creation",
            Property::Ctransid => "ctransid",
            Property::SendTransid => "send_transid",
            Property::ReceiveTransid => "receive_transid",
            Property::CreationTime => "creation_time",
            Property::ChangeTime => "change_time",
            Property::SendTime => "send_time",
            Property::ReceiveTime => "receive_time",
            Property::Flags => "flags",
            Property::Deleted => "deleted",
            Property::Mountpoints => "mountpoints",
        }
    }

    /// String form of this attribute on `record`, `None` when the record
    /// does not carry it.
    pub fn value_of(&self, record: &SubvolumeRecord) -> Option<String> {
        match self {
            Property::Name => Some(record.name.clone()),
            Property::Path => record.path.clone(),
            Property::Id => Some(record.id.to_string()),
            Property::ParentId => record.parent_id.map(|id| id.to_string()),
            Property::TopLevelId => record.top_level_id.map(|id| id.to_string()),
            Property::Uuid => Some(record.uuid.to_string()),
            Property::ParentUuid => record.parent_uuid.map(|uuid| uuid.to_string()),
            Property::ReceivedUuid => record.received_uuid.map(|uuid| uuid.to_string()),
            Property::Generation => record.generation.map(|g| g.to_string()),
            Property::GenAtCreation => record.otransid.map(|g| g.to_string()),
            Property::Ctransid => record.ctransid.map(|g| g.to_string()),
            Property::SendTransid => record.stransid.map(|g| g.to_string()),
            Property::ReceiveTransid => record.rtransid.map(|g| g.to_string()),
            Property::CreationTime => record.otime.as_ref().map(format_time),
            Property::ChangeTime => record.ctime.as_ref().map(format_time),
            Property::SendTime => record.stime.as_ref().map(format_time),
            Property::ReceiveTime => record.rtime.as_ref().map(format_time),
            Property::Flags => record.flags.map(|flags| format!("0x{flags:x}")),
            Property::Deleted => Some(record.deleted.to_string()),
            Property::Mountpoints => {
                if record.mountpoints.is_empty() {
                    None
                } else {
                    let targets: Vec<String> = record
                        .mountpoints
                        .iter()
                        .map(|target| target.display().to_string())
                        .collect();
                    Some(targets.join(", "))
                }
            }
        }
    }
}

fn format_time(time: &DateTime<FixedOffset>) -> String {
    time.format(TIME_FORMAT).to_string()
}

/// Lowercase, trim, and join words with underscores so that `Parent UUID`,
/// `parent_uuid` and ` Parent_UUID ` all compare equal.
fn normalize_name(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .split(|c: char| c.is_whitespace() || c == '_' || c == '-')
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

impl FromStr for Property {
    type Err = ParsePropertyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let property = match normalize_name(s).as_str() {
            "name" => Property::Name,
            "path" | "btrfs_path" => Property::Path,
            "id" | "subvolume_id" => Property::Id,
            "parent_id" => Property::ParentId,
            "top_level_id" | "top_level" => Property::TopLevelId,
            "uuid" => Property::Uuid,
            "parent_uuid" => Property::ParentUuid,
            "received_uuid" => Property::ReceivedUuid,
            "generation" | "gen" => Property::Generation,
            "gen_at_creation" | "otransid" => Property::GenAtCreation,
            "ctransid" => Property::Ctransid,
            "send_transid" | "stransid" => Property::SendTransid,
            "receive_transid" | "rtransid" => Property::ReceiveTransid,
            "creation_time" | "otime" => Property::CreationTime,
            "change_time" | "ctime" => Property::ChangeTime,
            "send_time" | "stime" => Property::SendTime,
            "receive_time" | "rtime" => Property::ReceiveTime,
            "flags" => Property::Flags,
            "deleted" => Property::Deleted,
            "mountpoints" | "mount_points" => Property::Mountpoints,
            _ => return Err(ParsePropertyError(s.to_string())),
        };
        Ok(property)
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
