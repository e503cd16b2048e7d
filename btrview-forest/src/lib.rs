// SPDX-License-Identifier: GPL-3.0-only

//! Forest construction for btrview
//!
//! Turns the flat, unordered subvolume records of one filesystem into two
//! hierarchies:
//!
//! - the **containment tree**, linking subvolumes by `id` / `parent_id`
//! - the **lineage forest**, linking snapshots by `uuid` / `parent_uuid`
//!   (with `received_uuid` as a fallback)
//!
//! Both are produced by the same [`build_forest`] over a [`Relation`]
//! strategy. Built forests then flow through the display passes:
//! [`annotate`], [`prune`], [`Forest::sort`], [`fold`], [`limit_children`]
//! and [`project`]. [`FilesystemView`] strings those together per filesystem.

pub mod error;
pub mod fold;
pub mod forest;
pub mod index;
pub mod project;
pub mod reachability;
pub mod relation;
pub mod sieve;
pub mod sort;
pub mod view;

pub use error::{ForestError, Result};
pub use fold::{fold, limit_children};
pub use forest::{AmbiguousParent, Forest, Node, NodeKind, UnresolvedReference, build_forest};
pub use index::{IdentityIndex, IndexScope};
pub use project::{project, project_named};
pub use reachability::{Reachability, annotate, attach_mounts};
pub use relation::{Containment, Lineage, Relation};
pub use sieve::{Sieve, prune, prune_with};
pub use sort::SortOrder;
pub use view::{
    FilesystemView, ViewOptions, build_views, cross_filesystem_lineage, display_forest,
};

// Re-export shared models
pub use btrview_types::*;
