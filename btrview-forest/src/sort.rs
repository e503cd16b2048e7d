// SPDX-License-Identifier: GPL-3.0-only

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::forest::{Forest, Node};

/// Sibling ordering. Ties fall back to label, then key, so every order is
/// total and repeatable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortOrder {
    /// Creation time, then creation transid. Nodes without either go last.
    #[default]
    Creation,
    Generation,
    Name,
    /// Subtree size, smallest first.
    Size,
}

impl SortOrder {
    pub const ALL: [SortOrder; 4] = [
        SortOrder::Creation,
        SortOrder::Generation,
        SortOrder::Name,
        SortOrder::Size,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SortOrder::Creation => "creation",
            SortOrder::Generation => "generation",
            SortOrder::Name => "name",
            SortOrder::Size => "size",
        }
    }

    fn compare<K: Ord>(self, a: &Node<K>, b: &Node<K>) -> Ordering {
        let primary = match self {
            SortOrder::Creation => {
                let ra = a.record();
                let rb = b.record();
                let ta = ra.and_then(|r| r.otime);
                let tb = rb.and_then(|r| r.otime);
                let xa = ra.and_then(|r| r.otransid);
                let xb = rb.and_then(|r| r.otransid);
                (ta.is_none(), ta, xa.is_none(), xa).cmp(&(tb.is_none(), tb, xb.is_none(), xb))
            }
            SortOrder::Generation => {
                let ga = a.record().and_then(|r| r.generation);
                let gb = b.record().and_then(|r| r.generation);
                (ga.is_none(), ga).cmp(&(gb.is_none(), gb))
            }
            SortOrder::Name => Ordering::Equal,
            SortOrder::Size => a.size().cmp(&b.size()),
        };

        primary
            .then_with(|| a.label.cmp(&b.label))
            .then_with(|| a.key.cmp(&b.key))
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "creation" | "creation-time" | "creation_time" | "otime" => Ok(SortOrder::Creation),
            "generation" | "gen" => Ok(SortOrder::Generation),
            "name" => Ok(SortOrder::Name),
            "size" => Ok(SortOrder::Size),
            other => Err(format!(
                "unknown sort order '{other}' (expected one of: creation, generation, name, size)"
            )),
        }
    }
}

fn sort_nodes<K: Ord>(nodes: &mut [Node<K>], order: SortOrder, reverse: bool) {
    let mut stack = vec![nodes];
    while let Some(siblings) = stack.pop() {
        siblings.sort_by(|a, b| {
            let ordering = order.compare(a, b);
            if reverse { ordering.reverse() } else { ordering }
        });
        stack.extend(
            siblings
                .iter_mut()
                .map(|node| node.children.as_mut_slice()),
        );
    }
}

impl<K: Ord> Forest<K> {
    /// Reorder roots and every sibling list.
    pub fn sort(&mut self, order: SortOrder, reverse: bool) {
        sort_nodes(&mut self.roots, order, reverse);
    }
}
