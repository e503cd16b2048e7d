// SPDX-License-Identifier: GPL-3.0-only

use std::fmt;

use btrview_types::Property;

use crate::error::Result;
use crate::forest::{Forest, Node, NodeKind};

/// Label written for a record that lacks the projected attribute.
pub const MISSING_VALUE: &str = "None";

/// Relabel every node with `property` read from its record.
///
/// The parent/child structure is unchanged. Placeholders have no record and
/// answer with their key when asked for the key attribute or the name;
/// truncation markers keep their text.
pub fn project<K: fmt::Display>(forest: Forest<K>, property: Property) -> Forest<K> {
    let key_property = forest.key_property;
    let mut forest = forest;
    forest.visit_mut(|node| node.label = label_for(node, property, key_property));
    forest
}

/// [`project`] by attribute name. The name is checked before any node is
/// touched.
pub fn project_named<K: fmt::Display>(forest: Forest<K>, name: &str) -> Result<Forest<K>> {
    let property: Property = name.parse()?;
    Ok(project(forest, property))
}

fn label_for<K: fmt::Display>(node: &Node<K>, property: Property, key_property: Property) -> String {
    if let NodeKind::Truncated { .. } = node.kind {
        return node.label.clone();
    }

    match node.record() {
        Some(record) => property
            .value_of(record)
            .unwrap_or_else(|| MISSING_VALUE.to_string()),
        None if property == key_property || property == Property::Name => node.key.to_string(),
        None => MISSING_VALUE.to_string(),
    }
}
