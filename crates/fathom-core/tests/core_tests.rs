use std::path::PathBuf;

use fathom_core::{ChunkTag, Metrics, MetricCache, NodeKind, PeerId, PeerMap, ScanConfig, ScanTree};

fn build_sample_tree() -> (ScanTree, fathom_core::NodeId) {
    let mut tree = ScanTree::new();
    let root = tree.set_root(PathBuf::from("/r"), "/r".into());

    let a = tree
        .add_dir_child(root, "a".into(), PathBuf::from("/r/a"), Some(ChunkTag(1)))
        .unwrap();
    tree.add_leaf_child(
        root,
        "f".into(),
        PathBuf::from("/r/f"),
        NodeKind::File,
        Metrics::file(5),
    )
    .unwrap();
    tree.apply_delta(
        root,
        Metrics {
            size: 5,
            file_count: 1,
            dir_count: 1,
        },
        |_| {},
    );

    for (name, size) in [("x", 10u64), ("y", 10), ("z", 10)] {
        tree.add_leaf_child(
            a,
            name.into(),
            PathBuf::from(format!("/r/a/{name}")),
            NodeKind::File,
            Metrics::file(size),
        )
        .unwrap();
    }
    tree.apply_delta(
        a,
        Metrics {
            size: 30,
            file_count: 3,
            dir_count: 0,
        },
        |_| {},
    );
    tree.mark_scanned(root);
    tree.mark_scanned(a);

    (tree, root)
}

#[test]
fn test_aggregates_sum_over_children() {
    let (tree, root) = build_sample_tree();

    assert_eq!(tree[root].size(), 35);
    assert_eq!(tree[root].file_count(), 4);
    assert_eq!(tree[root].dir_count(), 1);

    // every directory's metrics equal the sum over its children
    let mut stack = vec![root];
    while let Some(id) = stack.pop() {
        let node = &tree[id];
        if !node.is_dir() {
            continue;
        }
        let mut sum = Metrics::ZERO;
        for &child in node.children() {
            sum.add(tree[child].metrics());
            if tree[child].is_dir() {
                sum.dir_count += 1;
            }
        }
        assert_eq!(node.metrics(), sum, "mismatch at {}", node.path().display());
        stack.extend_from_slice(node.children());
    }
}

#[test]
fn test_chunk_tag_survives_until_clear() {
    let (mut tree, root) = build_sample_tree();
    let a = tree.children(root)[0];
    assert_eq!(tree[a].chunk(), Some(ChunkTag(1)));

    tree.clear_subtree(a);
    assert_eq!(tree[a].chunk(), None);
}

#[test]
fn test_peer_links_survive_rebuild_as_dead() {
    let (mut tree, root) = build_sample_tree();
    let a = tree.children(root)[0];
    let mut peers = PeerMap::new();
    peers.link(&mut tree, PeerId(42), a);

    // rebuilding the tree must not leave the peer dangling
    tree.set_root(PathBuf::from("/other"), "/other".into());
    assert!(peers.resolve(&tree, PeerId(42)).is_none());
}

#[test]
fn test_cache_preseed_flow() {
    let (tree, root) = build_sample_tree();
    let mut cache = MetricCache::new();
    cache.record_tree(&tree, root);

    // a later session consults the cache before scanning
    let seed = cache.lookup(std::path::Path::new("/r")).unwrap();
    assert_eq!(seed.size, 35);
    assert_eq!(seed.dir_count, 1);
    let seed = cache.lookup(std::path::Path::new("/r/a")).unwrap();
    assert_eq!(seed.file_count, 3);
}

#[test]
fn test_config_defaults() {
    let config = ScanConfig::default();
    assert!(!config.follow_symlinks);
    assert!(!config.cross_filesystems);
    assert!(config.apparent_size);
    assert!(config.include_hidden);
    assert_eq!(config.max_depth, None);
    assert_eq!(config.quantum_units, 5);
}
