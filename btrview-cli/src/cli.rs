// SPDX-License-Identifier: GPL-3.0-only

use std::path::PathBuf;

use btrview_forest::{Sieve, SortOrder};
use clap::{Parser, ValueEnum};
use serde::Deserialize;

/// Show BTRFS subvolumes and snapshot lineage as trees
#[derive(Debug, Parser)]
#[command(name = "btrview", version)]
#[command(about = "Show BTRFS subvolumes and snapshot lineage as trees", long_about = None)]
pub struct Cli {
    /// Only show filesystems with these labels
    #[arg(short, long, num_args = 1..)]
    pub labels: Vec<String>,

    /// Label nodes with this subvolume property instead of the name
    #[arg(short, long)]
    pub property: Option<String>,

    /// Collapse single-child runs deeper than this many levels
    #[arg(long)]
    pub fold: Option<usize>,

    /// Show at most this many children per node
    #[arg(long)]
    pub max_children: Option<usize>,

    /// Sibling order: creation, generation, name or size
    #[arg(long)]
    pub sort: Option<SortOrder>,

    /// Reverse the sibling order
    #[arg(long)]
    pub reverse: bool,

    /// Hide nodes: deleted, root, snapshot, unreachable, non-mounts
    #[arg(long, num_args = 1.., value_delimiter = ',')]
    pub remove: Vec<Sieve>,

    /// Which forests to show
    #[arg(long, value_enum, default_value_t = ViewKind::Both)]
    pub view: ViewKind,

    /// Build one snapshot forest across all selected filesystems
    #[arg(long)]
    pub cross_fs: bool,

    /// Output format
    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Read subvolume records from a JSON inventory instead of the system
    #[arg(long, value_name = "FILE")]
    pub input: Option<PathBuf>,

    /// Write the subvolume records that were read as a JSON inventory
    #[arg(long, value_name = "FILE")]
    pub dump: Option<PathBuf>,

    /// Configuration file (default: $XDG_CONFIG_HOME/btrview/config.toml)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Log filter, e.g. "info" or "btrview_forest=debug"
    #[arg(long)]
    pub log_level: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ViewKind {
    Subvolumes,
    Snapshots,
    Both,
}

impl ViewKind {
    pub fn subvolumes(self) -> bool {
        matches!(self, ViewKind::Subvolumes | ViewKind::Both)
    }

    pub fn snapshots(self) -> bool {
        matches!(self, ViewKind::Snapshots | ViewKind::Both)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}
