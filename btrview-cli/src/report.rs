// SPDX-License-Identifier: GPL-3.0-only

//! JSON output. Keys are rendered as strings so both forests share one shape.
//! Trees are flattened to a pre-order node list carrying each node's depth,
//! so arbitrarily deep lineages serialize without nesting.

use std::fmt::Display;

use btrview_forest::{FilesystemView, Forest, ForestError, Node, NodeKind, Reachability};
use serde::Serialize;

use crate::cli::ViewKind;

#[derive(Debug, Serialize)]
pub struct Report {
    pub filesystems: Vec<FilesystemReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cross_filesystem: Option<ForestReport>,
}

#[derive(Debug, Serialize)]
pub struct FilesystemReport {
    pub title: String,
    pub uuid: String,
    pub default_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subvolumes: Option<ForestReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshots: Option<ForestReport>,
}

/// Either the nodes of a forest or the error that stopped it.
#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ForestReport {
    Forest {
        nodes: Vec<NodeReport>,
        unresolved: Vec<UnresolvedReport>,
        ambiguous: Vec<AmbiguousReport>,
    },
    Error(String),
}

#[derive(Debug, Serialize)]
pub struct NodeReport {
    /// 1 for roots; a node's parent is the nearest earlier node one level up.
    pub depth: usize,
    pub key: String,
    pub label: String,
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elided: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hidden: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reachability: Option<Reachability>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct UnresolvedReport {
    pub key: String,
    pub referenced_by: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct AmbiguousReport {
    pub child: String,
    pub chosen: String,
    pub alternative: String,
}

impl Report {
    pub fn new<K: Display>(
        views: &[FilesystemView],
        kind: ViewKind,
        cross: Option<&Result<Forest<K>, ForestError>>,
    ) -> Self {
        Self {
            filesystems: views
                .iter()
                .map(|view| FilesystemReport {
                    title: view.title.clone(),
                    uuid: view.uuid.clone(),
                    default_id: view.default_id,
                    subvolumes: kind
                        .subvolumes()
                        .then(|| ForestReport::from_result(&view.subvolumes)),
                    snapshots: kind
                        .snapshots()
                        .then(|| ForestReport::from_result(&view.snapshots)),
                })
                .collect(),
            cross_filesystem: cross.map(ForestReport::from_result),
        }
    }
}

impl ForestReport {
    pub fn from_result<K: Display>(forest: &Result<Forest<K>, ForestError>) -> Self {
        match forest {
            Ok(forest) => ForestReport::Forest {
                nodes: {
                    let mut nodes = Vec::with_capacity(forest.len());
                    forest.visit(|node, depth| nodes.push(NodeReport::from_node(node, depth)));
                    nodes
                },
                unresolved: forest
                    .unresolved
                    .iter()
                    .map(|reference| UnresolvedReport {
                        key: reference.key.to_string(),
                        referenced_by: reference
                            .referenced_by
                            .iter()
                            .map(ToString::to_string)
                            .collect(),
                    })
                    .collect(),
                ambiguous: forest
                    .ambiguous
                    .iter()
                    .map(|entry| AmbiguousReport {
                        child: entry.child.to_string(),
                        chosen: entry.chosen.to_string(),
                        alternative: entry.alternative.to_string(),
                    })
                    .collect(),
            },
            Err(err) => ForestReport::Error(err.to_string()),
        }
    }
}

impl NodeReport {
    pub fn from_node<K: Display>(node: &Node<K>, depth: usize) -> Self {
        let (kind, elided, hidden) = match node.kind {
            NodeKind::Subvolume => ("subvolume", None, None),
            NodeKind::Placeholder => ("placeholder", None, None),
            NodeKind::Folded { elided } => ("folded", Some(elided), None),
            NodeKind::Truncated { hidden } => ("truncated", None, Some(hidden)),
        };
        Self {
            depth,
            key: node.key.to_string(),
            label: node.label.clone(),
            kind,
            elided,
            hidden,
            reachability: node.reachability,
            id: node.record().map(|record| record.id),
        }
    }
}
