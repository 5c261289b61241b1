use std::fs;
use std::path::Path;

use tempfile::TempDir;

use fathom_core::{Metrics, ScanConfig};
use fathom_scan::ScanManager;

/// 1 + 12 + 12*25 directories, enough to push the estimator through all
/// four phases.
fn create_wide_tree() -> TempDir {
    let temp = TempDir::new().unwrap();
    for i in 0..12 {
        let top = temp.path().join(format!("top{i:02}"));
        fs::create_dir(&top).unwrap();
        fs::write(top.join("data"), vec![b'x'; 100]).unwrap();
        for j in 0..25 {
            let sub = top.join(format!("sub{j:02}"));
            fs::create_dir(&sub).unwrap();
            fs::write(sub.join("leaf"), vec![b'y'; 10]).unwrap();
        }
    }
    temp
}

fn assert_aggregates_consistent(manager: &ScanManager) {
    let tree = manager.tree();
    let root = manager.root().unwrap();
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
        assert_eq!(
            node.metrics(),
            sum,
            "aggregate mismatch at {}",
            node.path().display()
        );
        stack.extend_from_slice(node.children());
    }
}

#[test]
fn test_percent_is_monotone_and_ends_at_100() {
    let temp = create_wide_tree();
    let mut manager = ScanManager::new(ScanConfig::default());
    let root = manager.set_root(temp.path()).unwrap();
    manager.start_scan(root).unwrap();

    let mut last = 0u8;
    let mut saw_estimate = false;
    while manager.scan_running() {
        manager.step();
        if let Some(percent) = manager.percent() {
            assert!(
                percent >= last,
                "percent went backward: {last} -> {percent}"
            );
            last = percent;
            if percent < 100 {
                saw_estimate = true;
            }
        }
    }

    assert!(saw_estimate, "estimator never produced an intermediate value");
    assert_eq!(manager.percent(), Some(100));
    assert_eq!(manager.dirs_finished(), 1 + 12 + 12 * 25);
    assert_eq!(manager.scan_length(), 0);
}

#[test]
fn test_full_session_aggregates() {
    let temp = create_wide_tree();
    let mut manager = ScanManager::new(ScanConfig::default());
    let root = manager.set_root(temp.path()).unwrap();
    manager.start_scan(root).unwrap();
    while manager.scan_running() {
        manager.step();
    }

    let tree = manager.tree();
    assert_eq!(tree[root].dir_count(), 12 + 12 * 25);
    assert_eq!(tree[root].file_count(), 12 + 12 * 25);
    assert_eq!(tree[root].size(), 12 * 100 + 12 * 25 * 10);
    assert_aggregates_consistent(&manager);
}

#[test]
fn test_last_finished_path_tracks_progress() {
    let temp = create_wide_tree();
    let config = ScanConfig::builder().quantum_units(1usize).build().unwrap();
    let mut manager = ScanManager::new(config);
    let root = manager.set_root(temp.path()).unwrap();
    manager.start_scan(root).unwrap();

    assert_eq!(manager.last_finished_path(), None);
    manager.step();
    let canonical = temp.path().canonicalize().unwrap();
    assert_eq!(manager.last_finished_path(), Some(canonical.as_path()));

    manager.step();
    let second = manager.last_finished_path().unwrap().to_path_buf();
    assert_ne!(second, canonical);
    assert!(second.starts_with(&canonical));
}

#[test]
fn test_interrupted_session_resumes_clean() {
    let temp = create_wide_tree();
    let config = ScanConfig::builder().quantum_units(2usize).build().unwrap();
    let mut manager = ScanManager::new(config);
    let root = manager.set_root(temp.path()).unwrap();

    manager.start_scan(root).unwrap();
    for _ in 0..10 {
        manager.step();
    }
    manager.stop_scan();
    let partial = manager.tree()[root].metrics();
    assert!(partial.dir_count > 0, "some work should have landed");

    // a fresh session over the half-populated subtree starts from zero
    manager.start_scan(root).unwrap();
    while manager.scan_running() {
        manager.step();
    }
    assert_eq!(manager.tree()[root].dir_count(), 12 + 12 * 25);
    assert_eq!(manager.tree()[root].size(), 12 * 100 + 12 * 25 * 10);
    assert_aggregates_consistent(&manager);
}

#[cfg(unix)]
#[test]
fn test_symlink_cycle_session_terminates() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    fs::create_dir(root.join("a")).unwrap();
    fs::create_dir(root.join("a/b")).unwrap();
    fs::write(root.join("a/b/file"), "abcde").unwrap();
    // b/up -> a: a loop through two levels
    std::os::unix::fs::symlink(root.join("a"), root.join("a/b/up")).unwrap();

    let config = ScanConfig::builder().follow_symlinks(true).build().unwrap();
    let mut manager = ScanManager::new(config);
    let tree_root = manager.set_root(root).unwrap();
    manager.start_scan(tree_root).unwrap();

    let mut quanta = 0;
    while manager.scan_running() {
        manager.step();
        quanta += 1;
        assert!(quanta < 100, "cycle not detected, scan did not terminate");
    }

    assert_eq!(manager.percent(), Some(100));
    assert_eq!(manager.tree()[tree_root].size(), 5);
    assert!(
        manager
            .warnings()
            .iter()
            .any(|w| w.kind == fathom_scan::WarningKind::SymlinkCycle)
    );
}

#[test]
fn test_unreadable_entries_do_not_abort() {
    let temp = create_wide_tree();
    let mut manager = ScanManager::new(ScanConfig::default());
    let root = manager.set_root(temp.path()).unwrap();
    manager.start_scan(root).unwrap();

    // queue the top-level dirs, then yank one out from under the scan
    manager.step();
    fs::remove_dir_all(temp.path().join("top11")).unwrap();
    while manager.scan_running() {
        manager.step();
    }

    // the vanished directory finishes empty with a warning; the session
    // still drains and reports complete
    assert_eq!(manager.percent(), Some(100));
    assert!(!manager.warnings().is_empty());
    assert!(!manager.scan_running());
}

#[test]
fn test_snapshot_reads_between_quanta() {
    let temp = create_wide_tree();
    let config = ScanConfig::builder().quantum_units(1usize).build().unwrap();
    let mut manager = ScanManager::new(config);
    let root = manager.set_root(temp.path()).unwrap();
    manager.start_scan(root).unwrap();

    // interleave scan steps with display-style reads; observed totals only
    // ever grow
    let mut last_size = 0;
    let mut last_dirs = 0;
    while manager.scan_running() {
        manager.step();
        let node = &manager.tree()[root];
        assert!(node.size() >= last_size);
        assert!(manager.dirs_finished() >= last_dirs);
        last_size = node.size();
        last_dirs = manager.dirs_finished();
    }
    assert_eq!(last_size, 12 * 100 + 12 * 25 * 10);
}

#[test]
fn test_path_lookup_after_session() {
    let temp = create_wide_tree();
    let mut manager = ScanManager::new(ScanConfig::default());
    let root = manager.set_root(temp.path()).unwrap();
    manager.start_scan(root).unwrap();
    while manager.scan_running() {
        manager.step();
    }

    // walk down to a leaf by name
    let tree = manager.tree();
    let top = tree
        .children(root)
        .iter()
        .find(|&&c| tree[c].name() == "top03")
        .copied()
        .unwrap();
    let sub = tree
        .children(top)
        .iter()
        .find(|&&c| tree[c].name() == "sub07")
        .copied()
        .unwrap();
    assert_eq!(tree[sub].size(), 10);
    assert_eq!(tree[sub].depth(), 2);
    assert!(tree[sub].path().ends_with(Path::new("top03/sub07")));
}
