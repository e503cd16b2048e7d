// SPDX-License-Identifier: GPL-3.0-only

//! Per-filesystem pipeline: index, build, annotate, prune, sort, fold,
//! limit and project.

use std::collections::HashMap;
use std::sync::Arc;

use btrview_types::{FilesystemRecords, MountTable, Property, SubvolumeRecord};
use rayon::prelude::*;
use uuid::Uuid;

use crate::error::Result;
use crate::fold::{fold, limit_children};
use crate::forest::{Forest, build_forest};
use crate::index::IdentityIndex;
use crate::project::project;
use crate::reachability::{annotate, attach_mounts};
use crate::relation::{Containment, Lineage, Relation};
use crate::sieve::{Sieve, prune_with};
use crate::sort::SortOrder;

/// Display options applied to every forest after it is built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewOptions {
    /// Fold depth; `None` disables folding.
    pub fold: Option<usize>,
    pub max_children: Option<usize>,
    /// Relabel nodes with this attribute; `None` keeps names.
    pub property: Option<Property>,
    pub sort: SortOrder,
    pub reverse: bool,
    pub remove: Vec<Sieve>,
}

/// Both forests of one filesystem. Each forest fails or succeeds on its
/// own; an error here never affects another filesystem.
#[derive(Debug, Clone)]
pub struct FilesystemView {
    pub title: String,
    pub uuid: String,
    pub default_id: Option<u64>,
    pub subvolumes: Result<Forest<u64>>,
    pub snapshots: Result<Forest<Uuid>>,
}

impl FilesystemView {
    pub fn build(fs: &FilesystemRecords, options: &ViewOptions) -> Self {
        let title = fs.title().to_string();
        let mounts = &fs.filesystem.mounts;
        tracing::info!(
            filesystem = %title,
            records = fs.subvolumes.len(),
            "building forests"
        );

        let records = mounted_records(&fs.subvolumes, mounts);
        let accessible = |record: &SubvolumeRecord| is_accessible(record, mounts);
        let subvolumes = relation_forest(&records, &Containment, &accessible, options);
        let snapshots = relation_forest(&records, &Lineage, &accessible, options);

        if let Err(err) = &subvolumes {
            tracing::error!(filesystem = %title, "subvolume tree failed: {err}");
        }
        if let Err(err) = &snapshots {
            tracing::error!(filesystem = %title, "snapshot forest failed: {err}");
        }

        Self {
            title,
            uuid: fs.filesystem.uuid.clone(),
            default_id: fs.default_id,
            subvolumes,
            snapshots,
        }
    }
}

/// Build the view of every filesystem, in input order.
pub fn build_views(
    filesystems: &[FilesystemRecords],
    options: &ViewOptions,
) -> Vec<FilesystemView> {
    filesystems
        .par_iter()
        .map(|fs| FilesystemView::build(fs, options))
        .collect()
}

/// One lineage forest over the records of several filesystems, so that
/// received subvolumes hang under their sent source.
pub fn cross_filesystem_lineage(
    filesystems: &[FilesystemRecords],
    options: &ViewOptions,
) -> Result<Forest<Uuid>> {
    let mut records = Vec::new();
    let mut owner: HashMap<Uuid, usize> = HashMap::new();
    for (slot, fs) in filesystems.iter().enumerate() {
        let mut subvolumes = fs.subvolumes.clone();
        attach_mounts(&mut subvolumes, &fs.filesystem.mounts);
        for record in &subvolumes {
            owner.entry(record.uuid).or_insert(slot);
        }
        records.extend(subvolumes.into_iter().map(Arc::new));
    }

    tracing::info!(
        filesystems = filesystems.len(),
        records = records.len(),
        "building cross-filesystem lineage"
    );
    let index = IdentityIndex::build(&records, Lineage::SCOPE)?;
    let accessible = |record: &SubvolumeRecord| {
        owner
            .get(&record.uuid)
            .is_some_and(|&slot| is_accessible(record, &filesystems[slot].filesystem.mounts))
    };
    display_forest(&index, &Lineage, &accessible, options)
}

fn mounted_records(records: &[SubvolumeRecord], mounts: &MountTable) -> Vec<Arc<SubvolumeRecord>> {
    let mut records = records.to_vec();
    attach_mounts(&mut records, mounts);
    records.into_iter().map(Arc::new).collect()
}

/// Index `records` with only the uniqueness `relation` relies on, so a
/// clash in one key never takes down the other forest.
fn relation_forest<R: Relation>(
    records: &[Arc<SubvolumeRecord>],
    relation: &R,
    accessible: &dyn Fn(&SubvolumeRecord) -> bool,
    options: &ViewOptions,
) -> Result<Forest<R::Key>> {
    let index = IdentityIndex::build(records, R::SCOPE)?;
    display_forest(&index, relation, accessible, options)
}

fn is_accessible(record: &SubvolumeRecord, mounts: &MountTable) -> bool {
    record
        .path
        .as_deref()
        .is_some_and(|path| !mounts.accessible_paths(path).is_empty())
}

/// Build one forest and run the display passes in order.
pub fn display_forest<R: Relation>(
    index: &IdentityIndex,
    relation: &R,
    accessible: &dyn Fn(&SubvolumeRecord) -> bool,
    options: &ViewOptions,
) -> Result<Forest<R::Key>> {
    let mut forest = build_forest(index, relation)?;
    annotate(&mut forest);

    let mut forest = prune_with(forest, &options.remove, accessible);
    forest.sort(options.sort, options.reverse);

    if let Some(depth) = options.fold {
        forest = fold(forest, depth);
    }
    if let Some(max) = options.max_children {
        forest = limit_children(forest, max);
    }
    if let Some(property) = options.property {
        forest = project(forest, property);
    }
    Ok(forest)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use btrview_types::{FilesystemInfo, Mount};

    use super::*;
    use crate::error::ForestError;
    use crate::forest::NodeKind;
    use crate::reachability::Reachability;

    fn sample_filesystem(
        label: &str,
        uuid_base: u128,
        records: Vec<SubvolumeRecord>,
    ) -> FilesystemRecords {
        FilesystemRecords {
            filesystem: FilesystemInfo {
                uuid: format!("fs-{uuid_base}"),
                label: Some(label.to_string()),
                mounts: MountTable::new([Mount::new("/@", "/"), Mount::new("/", "/mnt/pool")]),
            },
            subvolumes: records,
            default_id: Some(256),
        }
    }

    fn sample_records() -> Vec<SubvolumeRecord> {
        vec![
            SubvolumeRecord::new(5, Uuid::from_u128(100), "/"),
            SubvolumeRecord::new(256, Uuid::from_u128(1), "@").with_parent_id(5),
            SubvolumeRecord::new(257, Uuid::from_u128(2), "@snapshots").with_parent_id(5),
            SubvolumeRecord::new(258, Uuid::from_u128(3), "@snapshots/1")
                .with_parent_id(257)
                .with_parent_uuid(Uuid::from_u128(1)),
            SubvolumeRecord::new(259, Uuid::from_u128(4), "@snapshots/2")
                .with_parent_id(257)
                .with_parent_uuid(Uuid::from_u128(1)),
        ]
    }

    #[test]
    fn builds_both_forests_with_reachability() {
        let fs = sample_filesystem("pool", 1, sample_records());
        let view = FilesystemView::build(&fs, &ViewOptions::default());

        assert_eq!(view.title, "pool");
        assert_eq!(view.default_id, Some(256));

        let subvolumes = view.subvolumes.expect("subvolume tree builds");
        assert_eq!(subvolumes.roots.len(), 1);
        assert_eq!(subvolumes.len(), 5);
        let top = &subvolumes.roots[0];
        assert_eq!(top.label, "<FS_TREE> on: /mnt/pool");
        assert_eq!(top.reachability, Some(Reachability::Mounted));
        assert_eq!(top.children[1].reachability, Some(Reachability::Present));
        assert_eq!(top.children[0].label, "@ on: /");
        assert_eq!(top.children[0].reachability, Some(Reachability::Mounted));

        let snapshots = view.snapshots.expect("snapshot forest builds");
        let origin = snapshots
            .roots
            .iter()
            .find(|root| root.key == Uuid::from_u128(1))
            .expect("origin is a root");
        assert_eq!(origin.children.len(), 2);
    }

    #[test]
    fn duplicate_id_fails_only_the_subvolume_tree() {
        let mut broken = sample_records();
        broken.push(
            SubvolumeRecord::new(256, Uuid::from_u128(50), "@other")
                .with_parent_uuid(Uuid::from_u128(1)),
        );
        let filesystems = vec![
            sample_filesystem("broken", 1, broken),
            sample_filesystem("healthy", 2, sample_records()),
        ];

        let views = build_views(&filesystems, &ViewOptions::default());
        assert_eq!(views.len(), 2);
        assert!(matches!(
            views[0].subvolumes,
            Err(ForestError::DuplicateIdentity { field: "id", .. })
        ));
        let snapshots = views[0].snapshots.as_ref().expect("snapshot forest builds");
        let origin = snapshots
            .roots
            .iter()
            .find(|root| root.key == Uuid::from_u128(1))
            .expect("origin is a root");
        assert_eq!(origin.children.len(), 3);
        assert!(views[1].subvolumes.is_ok());
        assert!(views[1].snapshots.is_ok());
    }

    #[test]
    fn duplicate_uuid_fails_only_the_snapshot_forest() {
        let mut broken = sample_records();
        broken.push(SubvolumeRecord::new(300, Uuid::from_u128(2), "@clash").with_parent_id(5));
        let view = FilesystemView::build(
            &sample_filesystem("broken", 1, broken),
            &ViewOptions::default(),
        );

        assert!(matches!(
            view.snapshots,
            Err(ForestError::DuplicateIdentity { field: "uuid", .. })
        ));
        let subvolumes = view.subvolumes.expect("subvolume tree builds");
        assert_eq!(subvolumes.len(), 6);
    }

    #[test]
    fn containment_cycle_leaves_lineage_and_other_filesystems() {
        let looping = vec![
            SubvolumeRecord::new(256, Uuid::from_u128(1), "@a").with_parent_id(257),
            SubvolumeRecord::new(257, Uuid::from_u128(2), "@b")
                .with_parent_id(256)
                .with_parent_uuid(Uuid::from_u128(1)),
        ];
        let filesystems = vec![
            sample_filesystem("looping", 1, looping),
            sample_filesystem("healthy", 2, sample_records()),
        ];

        let views = build_views(&filesystems, &ViewOptions::default());
        match &views[0].subvolumes {
            Err(ForestError::CyclicLineage { chain }) => {
                assert_eq!(chain.len(), 3);
                assert_eq!(chain.first(), chain.last());
            }
            other => panic!("unexpected subvolume tree: {other:?}"),
        }

        let snapshots = views[0].snapshots.as_ref().expect("snapshot forest builds");
        assert_eq!(snapshots.roots.len(), 1);
        assert_eq!(snapshots.roots[0].key, Uuid::from_u128(1));
        assert_eq!(snapshots.roots[0].children[0].key, Uuid::from_u128(2));

        assert!(views[1].subvolumes.is_ok());
        assert!(views[1].snapshots.is_ok());
    }

    #[test]
    fn deep_chains_do_not_exhaust_worker_stacks() {
        let length = 20_000;
        let records: Vec<SubvolumeRecord> = (0..length)
            .map(|i| {
                let record = SubvolumeRecord::new(
                    256 + i,
                    Uuid::from_u128(u128::from(i) + 1),
                    format!("@snapshots/{i}"),
                );
                if i == 0 {
                    record
                } else {
                    record
                        .with_parent_id(255 + i)
                        .with_parent_uuid(Uuid::from_u128(u128::from(i)))
                }
            })
            .collect();
        let filesystems = vec![sample_filesystem("deep", 1, records)];

        let unfolded = build_views(&filesystems, &ViewOptions::default());
        let subvolumes = unfolded[0].subvolumes.as_ref().expect("subvolume tree builds");
        assert_eq!(subvolumes.max_depth(), length as usize);

        let options = ViewOptions {
            fold: Some(3),
            max_children: Some(2),
            remove: vec![Sieve::Root],
            property: Some(Property::Generation),
            ..ViewOptions::default()
        };
        let folded = build_views(&filesystems, &options);
        let snapshots = folded[0].snapshots.as_ref().expect("snapshot forest builds");
        assert_eq!(snapshots.max_depth(), 4);
        assert_eq!(snapshots.len(), 4);
    }

    #[test]
    fn options_flow_through_pipeline() {
        let options = ViewOptions {
            fold: Some(1),
            max_children: None,
            property: Some(Property::Id),
            sort: SortOrder::Name,
            reverse: false,
            remove: vec![Sieve::Root],
        };
        let view = FilesystemView::build(&sample_filesystem("pool", 1, sample_records()), &options);
        let forest = view.subvolumes.expect("subvolume tree builds");

        let roots: Vec<&str> = forest.roots.iter().map(|n| n.label.as_str()).collect();
        assert_eq!(roots, vec!["256", "257"]);
        assert!(
            forest.roots[1]
                .children
                .iter()
                .all(|n| n.kind == NodeKind::Subvolume)
        );
    }

    #[test]
    fn cross_filesystem_lineage_links_received_subvolumes() {
        let source = sample_filesystem(
            "main",
            1,
            vec![SubvolumeRecord::new(256, Uuid::from_u128(1), "@data")],
        );
        let mut received = SubvolumeRecord::new(256, Uuid::from_u128(9), "@data")
            .with_received_uuid(Uuid::from_u128(1));
        received.mountpoints = vec![PathBuf::from("/stale")];
        let backup = sample_filesystem("backup", 2, vec![received]);

        let forest = cross_filesystem_lineage(&[source, backup], &ViewOptions::default())
            .expect("combined forest builds");

        assert_eq!(forest.roots.len(), 1);
        assert_eq!(forest.roots[0].key, Uuid::from_u128(1));
        assert_eq!(forest.roots[0].children[0].key, Uuid::from_u128(9));
        // Mount state is recomputed from each filesystem's own table.
        assert!(
            forest.roots[0].children[0]
                .record()
                .is_some_and(|r| r.mountpoints.is_empty())
        );
    }
}
