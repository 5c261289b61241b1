//! fathom - incremental disk usage scanner.
//!
//! Usage:
//!   fathom [PATH]             Scan and print a size-sorted tree
//!   fathom scan [PATH]        Same, with display options
//!   fathom export [PATH]      Export the scanned tree as JSON
//!   fathom --help             Show help
//!
//! The scan runs in bounded quanta on a single thread; a progress line
//! (percent estimate, folders read, current directory) updates on its own
//! fixed cadence, independent of scan speed.

use std::cell::RefCell;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Context, Result, eyre};

use fathom_core::{MetricCache, NodeId, NodeKind, ScanConfig, ScanTree};
use fathom_scan::ScanManager;

#[derive(Parser)]
#[command(
    name = "fathom",
    version,
    about = "Incremental disk usage scanner",
    long_about = "fathom shows where your disk space goes without making you wait \
                  for the full answer: the tree fills in incrementally and a \
                  running completion estimate is shown while scanning."
)]
struct Cli {
    /// Path to scan (defaults to current directory)
    #[arg(default_value = ".")]
    path: PathBuf,

    #[command(flatten)]
    options: ScanOptions,

    /// Maximum depth to display
    #[arg(short, long, default_value = "3")]
    depth: u32,

    /// Entries to show per directory
    #[arg(short = 'n', long, default_value = "10")]
    top: usize,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Scan and print a size-sorted tree
    Scan {
        /// Path to scan
        #[arg(default_value = ".")]
        path: PathBuf,

        #[command(flatten)]
        options: ScanOptions,

        /// Maximum depth to display
        #[arg(short, long, default_value = "3")]
        depth: u32,

        /// Show all levels (no display depth limit)
        #[arg(short, long)]
        all: bool,

        /// Entries to show per directory
        #[arg(short = 'n', long, default_value = "10")]
        top: usize,
    },

    /// Export the scanned tree as JSON
    Export {
        /// Path to scan
        #[arg(default_value = ".")]
        path: PathBuf,

        #[command(flatten)]
        options: ScanOptions,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(clap::Args, Clone, Debug)]
struct ScanOptions {
    /// Descend into directory symlinks
    #[arg(long)]
    follow_symlinks: bool,

    /// Cross filesystem boundaries
    #[arg(long)]
    cross_filesystems: bool,

    /// Count allocated disk blocks instead of apparent size
    #[arg(long)]
    disk_usage: bool,

    /// Maximum depth to scan
    #[arg(long, value_name = "N")]
    max_depth: Option<u32>,

    /// Skip entries matching PATTERN (exact, 'prefix*' or '*suffix')
    #[arg(long, value_name = "PATTERN")]
    ignore: Vec<String>,

    /// Skip hidden entries
    #[arg(long)]
    no_hidden: bool,

    /// Directory expansions per scan quantum
    #[arg(long, default_value = "5", value_name = "N")]
    quantum: usize,

    /// Progress update interval in milliseconds
    #[arg(long, default_value = "250", value_name = "MS")]
    interval: u64,

    /// Metric cache file to pre-seed from and update
    #[arg(long, value_name = "FILE")]
    cache: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Some(Command::Scan {
            path,
            options,
            depth,
            all,
            top,
        }) => {
            run_scan(&path, &options, if all { u32::MAX } else { depth }, top).await?;
        }
        Some(Command::Export {
            path,
            options,
            output,
        }) => {
            run_export(&path, &options, output).await?;
        }
        None => {
            run_scan(&cli.path, &cli.options, cli.depth, cli.top).await?;
        }
    }

    Ok(())
}

fn build_config(options: &ScanOptions) -> Result<ScanConfig> {
    ScanConfig::builder()
        .follow_symlinks(options.follow_symlinks)
        .cross_filesystems(options.cross_filesystems)
        .apparent_size(!options.disk_usage)
        .max_depth(options.max_depth)
        .ignore_patterns(options.ignore.clone())
        .include_hidden(!options.no_hidden)
        .quantum_units(options.quantum)
        .build()
        .map_err(|err| eyre!("invalid scan options: {err}"))
}

fn load_cache(options: &ScanOptions) -> Option<MetricCache> {
    let path = options.cache.as_ref()?;
    if !path.exists() {
        return Some(MetricCache::new());
    }
    match MetricCache::load(path) {
        Ok(cache) => Some(cache),
        Err(err) => {
            tracing::warn!(%err, "ignoring unreadable metric cache");
            Some(MetricCache::new())
        }
    }
}

/// Run a scan session to completion.
///
/// Two cooperative tasks on one thread: the scan loop re-invokes a
/// bounded quantum with a yield between calls, and the reporter reads a
/// snapshot on a fixed tick. Neither waits for the other.
async fn drive_scan(manager: Rc<RefCell<ScanManager>>, interval_ms: u64) -> Result<()> {
    let local = tokio::task::LocalSet::new();
    local
        .run_until(async {
            let scan = {
                let manager = Rc::clone(&manager);
                tokio::task::spawn_local(async move {
                    loop {
                        let advanced = manager.borrow_mut().step();
                        if advanced == 0 && !manager.borrow().scan_running() {
                            break;
                        }
                        tokio::task::yield_now().await;
                    }
                })
            };
            let report = {
                let manager = Rc::clone(&manager);
                tokio::task::spawn_local(async move {
                    let mut ticker =
                        tokio::time::interval(Duration::from_millis(interval_ms.max(1)));
                    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
                    loop {
                        ticker.tick().await;
                        let manager = manager.borrow();
                        if !manager.scan_running() {
                            break;
                        }
                        if let (Some(percent), Some(path)) =
                            (manager.percent(), manager.last_finished_path())
                        {
                            eprint!(
                                "\r{:>3}% {:>6} folders, in {:<60}",
                                percent,
                                manager.dirs_finished(),
                                truncate(&path.display().to_string(), 60),
                            );
                            let _ = std::io::stderr().flush();
                        }
                    }
                })
            };
            scan.await?;
            report.await?;
            Ok::<_, color_eyre::eyre::Report>(())
        })
        .await
}

/// Scan a path and display the result.
async fn run_scan(path: &Path, options: &ScanOptions, max_depth: u32, top_n: usize) -> Result<()> {
    let config = build_config(options)?;
    let mut cache = load_cache(options);

    let mut manager = ScanManager::new(config);
    let root = manager.set_root(path).context("cannot scan path")?;
    let root_path = manager.tree()[root].path().to_path_buf();

    if let Some(cache) = &cache {
        if let Some(seed) = cache.lookup(&root_path) {
            eprintln!(
                "previously: {} in {} files, {} folders",
                format_size(seed.size),
                seed.file_count,
                seed.dir_count
            );
        }
    }
    eprintln!("Scanning {}...", root_path.display());

    let started = Instant::now();
    manager.start_scan(root)?;
    let manager = Rc::new(RefCell::new(manager));
    drive_scan(Rc::clone(&manager), options.interval).await?;
    eprintln!();

    let elapsed = started.elapsed();
    let manager = manager.borrow();
    let tree = manager.tree();

    println!();
    println!("{}", "─".repeat(60));
    println!(" {} - {}", root_path.display(), format_size(tree[root].size()));
    println!(
        " {} files, {} directories",
        tree[root].file_count(),
        tree[root].dir_count()
    );
    println!(
        " Read {} folders in {:.2}s",
        manager.dirs_finished(),
        elapsed.as_secs_f64()
    );
    println!("{}", "─".repeat(60));
    println!();

    print_node(tree, root, 0, max_depth, top_n, tree[root].size());

    if !manager.warnings().is_empty() {
        println!();
        println!("{} warning(s) during scan", manager.warnings().len());
    }

    if let (Some(cache), Some(cache_path)) = (&mut cache, &options.cache) {
        cache.record_tree(tree, root);
        cache
            .save(cache_path)
            .context("cannot save metric cache")?;
    }

    Ok(())
}

/// Scan a path and export the tree as JSON.
async fn run_export(path: &Path, options: &ScanOptions, output: Option<PathBuf>) -> Result<()> {
    let config = build_config(options)?;
    let mut manager = ScanManager::new(config);
    let root = manager.set_root(path).context("cannot scan path")?;
    let root_path = manager.tree()[root].path().to_path_buf();

    eprintln!("Scanning {}...", root_path.display());
    let started = Instant::now();
    manager.start_scan(root)?;
    let manager = Rc::new(RefCell::new(manager));
    drive_scan(Rc::clone(&manager), options.interval).await?;
    eprintln!();

    let manager = manager.borrow();
    let document = serde_json::json!({
        "path": root_path.display().to_string(),
        "duration_secs": started.elapsed().as_secs_f64(),
        "folders_read": manager.dirs_finished(),
        "warnings": manager.warnings().len(),
        "tree": export_node(manager.tree(), root),
    });
    let json = serde_json::to_string_pretty(&document)?;

    match output {
        Some(output_path) => {
            std::fs::write(&output_path, json)?;
            eprintln!("Exported to {}", output_path.display());
        }
        None => {
            println!("{json}");
        }
    }

    Ok(())
}

fn export_node(tree: &ScanTree, id: NodeId) -> serde_json::Value {
    let node = &tree[id];
    let children: Vec<serde_json::Value> = node
        .children()
        .iter()
        .filter(|&&child| tree.get(child).is_some())
        .map(|&child| export_node(tree, child))
        .collect();
    serde_json::json!({
        "name": node.name(),
        "kind": kind_label(node.kind()),
        "size": node.size(),
        "files": node.file_count(),
        "dirs": node.dir_count(),
        "children": children,
    })
}

fn kind_label(kind: &NodeKind) -> &'static str {
    match kind {
        NodeKind::Directory => "dir",
        NodeKind::File => "file",
        NodeKind::Symlink { .. } => "symlink",
        NodeKind::Other => "other",
    }
}

/// Print a node and its children, largest first.
fn print_node(
    tree: &ScanTree,
    id: NodeId,
    depth: u32,
    max_depth: u32,
    top_n: usize,
    root_size: u64,
) {
    let node = &tree[id];
    let indent = "  ".repeat(depth as usize);
    let ratio = if root_size > 0 {
        node.size() as f64 / root_size as f64 * 100.0
    } else {
        0.0
    };
    let bar = make_bar(ratio / 100.0, 10);

    let name = if depth == 0 {
        node.path().display().to_string()
    } else {
        node.name().to_string()
    };
    let dir_marker = if node.is_dir() { "/" } else { "" };

    println!(
        "{}{}{:<40} {:>10} {:>5.1}% {}",
        indent,
        if node.is_dir() { "▼ " } else { "  " },
        truncate(&format!("{name}{dir_marker}"), 40),
        format_size(node.size()),
        ratio,
        bar
    );

    if node.is_dir() && depth < max_depth {
        let mut children: Vec<NodeId> = node
            .children()
            .iter()
            .copied()
            .filter(|&child| tree.get(child).is_some())
            .collect();
        children.sort_by(|&a, &b| tree[b].size().cmp(&tree[a].size()));

        let remaining = children.len().saturating_sub(top_n);
        for &child in children.iter().take(top_n) {
            print_node(tree, child, depth + 1, max_depth, top_n, root_size);
        }
        if remaining > 0 {
            let indent = "  ".repeat((depth + 1) as usize);
            println!("{indent}  ... and {remaining} more");
        }
    }
}

/// Create a simple ASCII bar.
fn make_bar(ratio: f64, width: usize) -> String {
    let filled = (ratio * width as f64).round() as usize;
    let empty = width.saturating_sub(filled);
    format!("[{}{}]", "█".repeat(filled), "░".repeat(empty))
}

/// Format size in human-readable form.
fn format_size(bytes: u64) -> String {
    humansize::format_size(bytes, humansize::BINARY)
}

/// Truncate a string to max length.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max_len - 1).collect();
        format!("{cut}…")
    }
}
