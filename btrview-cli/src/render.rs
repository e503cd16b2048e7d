// SPDX-License-Identifier: GPL-3.0-only

//! Plain-text tree drawing.

use std::fmt::Display;

use btrview_forest::{FilesystemView, Forest, ForestError, Node, NodeKind, Reachability};

use crate::cli::ViewKind;

const BRANCH: &str = "├── ";
const LAST_BRANCH: &str = "└── ";
const PIPE: &str = "│   ";
const SPACE: &str = "    ";

/// Render every filesystem view, then the combined lineage if present.
pub fn render_text<K: Display>(
    views: &[FilesystemView],
    kind: ViewKind,
    cross: Option<&Result<Forest<K>, ForestError>>,
) -> String {
    let mut out = String::new();

    for (i, view) in views.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        render_header(&mut out, view);
        if kind.subvolumes() {
            render_section(&mut out, "Subvolumes", &view.subvolumes);
        }
        if kind.snapshots() {
            render_section(&mut out, "Snapshots", &view.snapshots);
        }
    }

    if let Some(forest) = cross {
        if !views.is_empty() {
            out.push('\n');
        }
        render_section(&mut out, "Lineage across filesystems", forest);
    }
    out
}

fn render_header(out: &mut String, view: &FilesystemView) {
    out.push_str(&format!("{} ({})\n", view.title, view.uuid));
    if let Some(id) = view.default_id {
        out.push_str(&format!("Default subvolume: {id}\n"));
    }
}

fn render_section<K: Display>(
    out: &mut String,
    heading: &str,
    forest: &Result<Forest<K>, ForestError>,
) {
    out.push_str(&format!("{heading}:\n"));
    match forest {
        Ok(forest) if forest.is_empty() => out.push_str("  (none)\n"),
        Ok(forest) => {
            for root in &forest.roots {
                render_tree(out, root);
            }
        }
        Err(err) => out.push_str(&format!("  error: {err}\n")),
    }
}

fn render_tree<K>(out: &mut String, root: &Node<K>) {
    out.push_str(&node_line(root));
    out.push('\n');

    let mut stack = Vec::new();
    push_children(&mut stack, root, "");
    while let Some((node, prefix, last)) = stack.pop() {
        out.push_str(&prefix);
        out.push_str(if last { LAST_BRANCH } else { BRANCH });
        out.push_str(&node_line(node));
        out.push('\n');

        let nested = format!("{prefix}{}", if last { SPACE } else { PIPE });
        push_children(&mut stack, node, &nested);
    }
}

/// Queue `node`'s children so they pop in display order.
fn push_children<'a, K>(
    stack: &mut Vec<(&'a Node<K>, String, bool)>,
    node: &'a Node<K>,
    prefix: &str,
) {
    let count = node.children.len();
    for (i, child) in node.children.iter().enumerate().rev() {
        stack.push((child, prefix.to_string(), i + 1 == count));
    }
}

/// One node's label with its fold summary and reachability marker.
pub fn node_line<K>(node: &Node<K>) -> String {
    let mut line = match node.kind {
        NodeKind::Folded { elided } => format!("… {elided} elided … {}", node.label),
        _ => node.label.clone(),
    };
    match node.reachability {
        Some(Reachability::Mounted) => line.push_str(" [mounted]"),
        Some(Reachability::Absent) => line.push_str(" [absent]"),
        Some(Reachability::Present) | None => {}
    }
    line
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use btrview_forest::{Property, SubvolumeRecord};
    use uuid::Uuid;

    use super::*;

    fn sample_node(id: u64, name: &str, children: Vec<Node<u64>>) -> Node<u64> {
        let record = SubvolumeRecord::new(id, Uuid::from_u128(u128::from(id)), name);
        let mut node = Node::subvolume(id, Arc::new(record), children);
        node.reachability = Some(Reachability::Present);
        node
    }

    fn sample_view(subvolumes: Result<Forest<u64>, ForestError>) -> FilesystemView {
        FilesystemView {
            title: "pool".to_string(),
            uuid: "8c2a7c2e".to_string(),
            default_id: Some(256),
            subvolumes,
            snapshots: Ok(Forest::new(Vec::new(), Property::Uuid)),
        }
    }

    #[test]
    fn draws_box_tree() {
        let mut top = sample_node(
            5,
            "/",
            vec![
                sample_node(256, "@", vec![sample_node(258, "@/nested", Vec::new())]),
                sample_node(257, "@home", Vec::new()),
            ],
        );
        top.label = "<FS_TREE> on: /mnt/pool".to_string();
        top.reachability = Some(Reachability::Mounted);
        let forest = Forest::new(vec![top], Property::Id);

        let text = render_text::<Uuid>(&[sample_view(Ok(forest))], ViewKind::Both, None);

        let expected = "\
pool (8c2a7c2e)
Default subvolume: 256
Subvolumes:
<FS_TREE> on: /mnt/pool [mounted]
├── @
│   └── nested
└── @home
Snapshots:
  (none)
";
        assert_eq!(text, expected);
    }

    #[test]
    fn draws_deep_chains() {
        let mut node = sample_node(3_255, "leaf", Vec::new());
        for id in (256..3_255).rev() {
            node = sample_node(id, "link", vec![node]);
        }
        let forest = Forest::new(vec![node], Property::Id);

        let text = render_text::<Uuid>(&[sample_view(Ok(forest))], ViewKind::Subvolumes, None);

        assert_eq!(text.lines().count(), 3 + 3_000);
        let last = text.lines().last().expect("leaf line");
        assert!(last.ends_with("└── leaf"));
        assert_eq!(last.len(), 2_998 * SPACE.len() + LAST_BRANCH.len() + "leaf".len());
    }

    #[test]
    fn folded_and_absent_markers() {
        let mut folded = sample_node(260, "n5", Vec::new());
        folded.kind = NodeKind::Folded { elided: 3 };
        assert_eq!(node_line(&folded), "… 3 elided … n5");

        let mut placeholder = Node::placeholder(7u64, Vec::new());
        placeholder.reachability = Some(Reachability::Absent);
        assert_eq!(node_line(&placeholder), "7 [absent]");
    }

    #[test]
    fn failed_forest_renders_error_line() {
        let err = ForestError::CyclicLineage {
            chain: vec!["257".to_string(), "256".to_string(), "257".to_string()],
        };
        let text = render_text::<Uuid>(&[sample_view(Err(err))], ViewKind::Subvolumes, None);

        assert!(text.contains("Subvolumes:\n  error: "));
        assert!(!text.contains("Snapshots:"));
    }
}
