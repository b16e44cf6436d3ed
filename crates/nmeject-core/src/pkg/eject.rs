//! Copy/link execution of a resolved graph.
//!
//! Nodes are copied one at a time. Existing destinations are never
//! overwritten, so re-running an eject over the same output is a no-op apart
//! from refreshing `.bin` links.

use super::error::EjectError;
use super::graph::{build_graph, out_alias_dir, GraphOptions, ResolvedNode};
use super::link::link_alias;
use super::locate::{BIN_DIR, NODE_MODULES};
use super::manifest::Manifest;
use crate::config::EjectOptions;
use futures::stream::{self, StreamExt};
use nmeject_util::fs::copy_tree;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::io;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info};

/// Maximum number of nodes being materialized at once.
pub const MAX_CONCURRENT_COPIES: usize = 1;

/// Summary of an `apply` run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EjectReport {
    /// Nodes whose contents were copied.
    pub copied: usize,
    /// Nodes skipped because their destination already existed.
    pub skipped: usize,
    /// Files written while copying.
    pub files: usize,
    /// `.bin` links (re)created.
    pub links: usize,
}

/// Result of a full eject: the graph and what applying it did.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EjectOutcome {
    pub nodes: Vec<ResolvedNode>,
    pub report: EjectReport,
}

#[derive(Debug, Default)]
struct NodeOutcome {
    copied: bool,
    files: usize,
    links: usize,
}

/// Whether `rel` (relative to a package root) is a `node_modules/.bin`
/// directory. Those hold the dependency's own shims and are never copied.
#[must_use]
pub fn is_alias_dir(rel: &Path) -> bool {
    let mut parts = rel.components().rev();
    matches!(
        (parts.next(), parts.next()),
        (Some(Component::Normal(last)), Some(Component::Normal(parent)))
            if last == BIN_DIR && parent == NODE_MODULES
    )
}

/// Materialize `nodes` under `out_root`.
///
/// Nodes are processed with shallower destinations first, so a nested
/// conflicting install never pre-creates the directory of the package that
/// contains it. Work runs on the blocking pool, one node at a time.
///
/// # Errors
/// Stops at the first `CopyFailure` or `LinkFailure`. Destinations copied
/// so far are left in place.
pub async fn apply(nodes: &[ResolvedNode], out_root: &Path) -> Result<EjectReport, EjectError> {
    let mut ordered = claim_aliases(nodes);
    ordered.sort_by_key(|n| n.destination_path.components().count());

    let alias_dir = out_alias_dir(out_root);

    let mut jobs = stream::iter(ordered)
        .map(|node| {
            let alias_dir = alias_dir.clone();
            async move {
                let name = node.name.clone();
                let dest = node.destination_path.clone();
                tokio::task::spawn_blocking(move || apply_node(&node, &alias_dir))
                    .await
                    .map_err(|e| task_failure(&name, &dest, e))?
            }
        })
        .buffered(MAX_CONCURRENT_COPIES);

    let mut report = EjectReport::default();
    while let Some(outcome) = jobs.next().await {
        let outcome = outcome?;
        if outcome.copied {
            report.copied += 1;
        } else {
            report.skipped += 1;
        }
        report.files += outcome.files;
        report.links += outcome.links;
    }

    info!(
        copied = report.copied,
        skipped = report.skipped,
        links = report.links,
        out = %out_root.display(),
        "eject applied"
    );

    Ok(report)
}

/// Copy `nodes`, keeping only the aliases each node owns in the shared
/// `.bin`: the first node in graph order to expose an alias name.
fn claim_aliases(nodes: &[ResolvedNode]) -> Vec<ResolvedNode> {
    let mut owned = HashSet::new();
    nodes
        .iter()
        .map(|node| {
            let mut node = node.clone();
            node.aliases.retain(|alias| {
                let first = owned.insert(alias.name.clone());
                if !first {
                    debug!(name = %node.name, alias = %alias.name, "alias already owned, not linking");
                }
                first
            });
            node
        })
        .collect()
}

/// A blocking task that died before reporting is charged to its node.
fn task_failure(name: &str, dest: &Path, err: tokio::task::JoinError) -> EjectError {
    EjectError::copy_failure(name, dest, io::Error::new(io::ErrorKind::Other, err))
}

/// Copy one node and link its aliases.
fn apply_node(node: &ResolvedNode, alias_dir: &Path) -> Result<NodeOutcome, EjectError> {
    let dest = &node.destination_path;
    let mut outcome = NodeOutcome::default();

    if dest.symlink_metadata().is_ok() {
        debug!(name = %node.name, dest = %dest.display(), "destination exists, skipping copy");
    } else {
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| EjectError::copy_failure(&node.name, parent, e))?;
        }
        let stats = copy_tree(&node.source_path, dest, is_alias_dir)
            .map_err(|e| EjectError::copy_failure(&node.name, dest, e))?;
        debug!(name = %node.name, files = stats.files, dest = %dest.display(), "copied");
        outcome.copied = true;
        outcome.files = stats.files;
    }

    for alias in &node.aliases {
        link_alias(alias_dir, alias)
            .map_err(|e| EjectError::link_failure(&node.name, &alias.name, e))?;
        outcome.links += 1;
    }

    Ok(outcome)
}

/// Load the root manifest, build its graph, and apply it.
///
/// # Errors
/// Any error from manifest loading, graph building, or applying.
pub async fn eject(options: &EjectOptions) -> Result<EjectOutcome, EjectError> {
    let (manifest, root_dir, graph_options) = prepare(options)?;
    let nodes = build_graph(&manifest, &root_dir, &graph_options)?;
    let report = apply(&nodes, &graph_options.out_root).await?;
    Ok(EjectOutcome { nodes, report })
}

/// Load the root manifest and derive graph options from eject options.
///
/// # Errors
/// Manifest errors for the root package.
pub fn prepare(options: &EjectOptions) -> Result<(Manifest, PathBuf, GraphOptions), EjectError> {
    let manifest = Manifest::load_file(&options.manifest)?;
    let root_dir = options.root_dir();
    Ok((manifest, root_dir, options.graph_options()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pkg::bin::AliasEntry;
    use std::collections::HashSet;
    use std::fs;
    use tempfile::tempdir;

    fn write_pkg(dir: &Path, json: &serde_json::Value) {
        fs::create_dir_all(dir).unwrap();
        fs::write(dir.join("package.json"), json.to_string()).unwrap();
    }

    /// app -> a -> b (with a cli), plus a stale .bin shim inside a.
    fn fixture(root: &Path) {
        write_pkg(
            root,
            &serde_json::json!({ "name": "app", "version": "1.0.0", "dependencies": { "a": "^1.0.0" } }),
        );
        let a = root.join("node_modules/a");
        write_pkg(
            &a,
            &serde_json::json!({ "name": "a", "version": "1.0.0", "dependencies": { "b": "*" } }),
        );
        fs::write(a.join("index.js"), "module.exports = 'a';").unwrap();
        fs::create_dir_all(a.join("node_modules/.bin")).unwrap();
        fs::write(a.join("node_modules/.bin/shim"), "shim").unwrap();

        let b = root.join("node_modules/b");
        write_pkg(
            &b,
            &serde_json::json!({ "name": "b", "version": "2.0.0", "bin": { "bee": "bin/cli.js" } }),
        );
        fs::create_dir_all(b.join("bin")).unwrap();
        fs::write(b.join("bin/cli.js"), "#!/usr/bin/env node\n").unwrap();
    }

    fn options(root: &Path) -> EjectOptions {
        EjectOptions::new(root.join("package.json"), root.join("out"))
    }

    #[test]
    fn test_is_alias_dir() {
        assert!(is_alias_dir(Path::new("node_modules/.bin")));
        assert!(is_alias_dir(Path::new("lib/node_modules/.bin")));
        assert!(!is_alias_dir(Path::new(".bin")));
        assert!(!is_alias_dir(Path::new("node_modules/.bin/shim")));
        assert!(!is_alias_dir(Path::new("node_modules/bin")));
    }

    #[tokio::test]
    async fn test_eject_copies_and_links() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fixture(root);

        let outcome = eject(&options(root)).await.unwrap();
        let out = root.join("out");

        assert_eq!(outcome.nodes.len(), 2);
        assert_eq!(outcome.report.copied, 2);
        assert_eq!(outcome.report.skipped, 0);
        assert_eq!(outcome.report.links, 1);

        assert!(out.join("a/index.js").exists());
        assert!(out.join("b/bin/cli.js").exists());
        assert!(!out.join("a/node_modules/.bin").exists());

        let link = out.join(".bin/bee");
        assert_eq!(fs::read_link(&link).unwrap(), PathBuf::from("../b/bin/cli.js"));
        assert!(link.exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_alias_target_is_executable() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let root = dir.path();
        fixture(root);

        eject(&options(root)).await.unwrap();

        let mode = fs::metadata(root.join("out/b/bin/cli.js"))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o111, 0o111);
    }

    #[tokio::test]
    async fn test_apply_is_idempotent() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fixture(root);

        let first = eject(&options(root)).await.unwrap();
        fs::write(root.join("out/a/index.js"), "edited").unwrap();

        let report = apply(&first.nodes, &root.join("out")).await.unwrap();

        assert_eq!(report.copied, 0);
        assert_eq!(report.skipped, 2);
        assert_eq!(report.files, 0);
        assert_eq!(
            fs::read_to_string(root.join("out/a/index.js")).unwrap(),
            "edited"
        );
    }

    #[tokio::test]
    async fn test_graph_has_unique_sources() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fixture(root);

        let outcome = eject(&options(root)).await.unwrap();
        let unique: HashSet<&PathBuf> = outcome.nodes.iter().map(|n| &n.source_path).collect();
        assert_eq!(unique.len(), outcome.nodes.len());
    }

    #[tokio::test]
    async fn test_nested_processed_after_container() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        let src_x = root.join("src/x");
        let src_inner = root.join("src/inner");
        write_pkg(&src_x, &serde_json::json!({ "name": "x", "version": "1.0.0" }));
        fs::write(src_x.join("x.js"), "x").unwrap();
        write_pkg(&src_inner, &serde_json::json!({ "name": "y", "version": "1.0.0" }));

        let out = root.join("out");
        let node = |name: &str, src: &Path, dest: PathBuf| ResolvedNode {
            name: name.to_string(),
            version: "1.0.0".to_string(),
            range: "*".to_string(),
            source_path: src.to_path_buf(),
            destination_path: dest,
            nested: false,
            aliases: Vec::<AliasEntry>::new(),
        };
        // Nested node listed first on purpose.
        let nodes = vec![
            node("y", &src_inner, out.join("x/node_modules/y")),
            node("x", &src_x, out.join("x")),
        ];

        let report = apply(&nodes, &out).await.unwrap();

        assert_eq!(report.copied, 2);
        assert!(out.join("x/x.js").exists());
        assert!(out.join("x/node_modules/y/package.json").exists());
    }

    #[tokio::test]
    async fn test_conflicting_versions_both_materialized() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        write_pkg(
            root,
            &serde_json::json!({ "name": "app", "version": "1.0.0", "dependencies": { "a": "*", "z": "*" } }),
        );
        write_pkg(
            &root.join("node_modules/a"),
            &serde_json::json!({ "name": "a", "version": "1.0.0", "dependencies": { "b": "^1.0.0" } }),
        );
        write_pkg(
            &root.join("node_modules/a/node_modules/b"),
            &serde_json::json!({ "name": "b", "version": "1.0.0" }),
        );
        write_pkg(
            &root.join("node_modules/z"),
            &serde_json::json!({ "name": "z", "version": "1.0.0", "dependencies": { "b": "^2.0.0" } }),
        );
        write_pkg(
            &root.join("node_modules/b"),
            &serde_json::json!({ "name": "b", "version": "2.0.0" }),
        );

        let outcome = eject(&options(root)).await.unwrap();
        let out = root.join("out");

        assert_eq!(outcome.report.copied, 4);
        assert_eq!(outcome.report.skipped, 0);

        let version_at = |rel: &str| -> String {
            let json: serde_json::Value =
                serde_json::from_str(&fs::read_to_string(out.join(rel).join("package.json")).unwrap())
                    .unwrap();
            json["version"].as_str().unwrap().to_string()
        };
        assert_eq!(version_at("b"), "1.0.0");
        assert_eq!(version_at("z/node_modules/b"), "2.0.0");
    }

    #[tokio::test]
    async fn test_task_failure_names_destination() {
        let join_err = tokio::task::spawn_blocking(|| panic!("boom"))
            .await
            .unwrap_err();

        let err = task_failure("ghost", Path::new("/out/ghost"), join_err);
        match &err {
            EjectError::CopyFailure { name, path, .. } => {
                assert_eq!(name, "ghost");
                assert_eq!(path, Path::new("/out/ghost"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(err.to_string().contains("/out/ghost"));
    }

    #[tokio::test]
    async fn test_shared_alias_owned_by_first_node() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("out");
        let tool = |version: &str, src: &str, dest: PathBuf, target: &str| {
            let src = dir.path().join(src);
            write_pkg(&src, &serde_json::json!({ "name": "tool", "version": version }));
            fs::write(src.join("cli.js"), version).unwrap();
            ResolvedNode {
                name: "tool".to_string(),
                version: version.to_string(),
                range: "*".to_string(),
                source_path: src,
                destination_path: dest,
                nested: false,
                aliases: vec![AliasEntry {
                    name: "tool".to_string(),
                    target: PathBuf::from(target),
                }],
            }
        };
        let nodes = vec![
            tool("2.0.0", "src/new", out.join("tool"), "../tool/cli.js"),
            tool("1.0.0", "src/old", out.join("x/node_modules/tool"), "../x/node_modules/tool/cli.js"),
        ];

        let report = apply(&nodes, &out).await.unwrap();

        assert_eq!(report.links, 1);
        assert_eq!(fs::read_link(out.join(".bin/tool")).unwrap(), PathBuf::from("../tool/cli.js"));
        assert_eq!(fs::read_to_string(out.join(".bin/tool")).unwrap(), "2.0.0");
    }

    #[tokio::test]
    async fn test_copy_failure_names_node() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("out");
        let nodes = vec![ResolvedNode {
            name: "ghost".to_string(),
            version: "1.0.0".to_string(),
            range: "*".to_string(),
            source_path: dir.path().join("does-not-exist"),
            destination_path: out.join("ghost"),
            nested: false,
            aliases: Vec::new(),
        }];

        let err = apply(&nodes, &out).await.unwrap_err();
        assert!(matches!(err, EjectError::CopyFailure { .. }));
        assert!(err.to_string().contains("ghost"));
    }

    #[tokio::test]
    async fn test_link_failure_names_node() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("src/tool");
        write_pkg(&src, &serde_json::json!({ "name": "tool", "version": "1.0.0" }));
        let out = dir.path().join("out");
        let nodes = vec![ResolvedNode {
            name: "tool".to_string(),
            version: "1.0.0".to_string(),
            range: "*".to_string(),
            source_path: src,
            destination_path: out.join("tool"),
            nested: false,
            aliases: vec![AliasEntry {
                name: "tool".to_string(),
                target: PathBuf::from("../tool/missing.js"),
            }],
        }];

        let err = apply(&nodes, &out).await.unwrap_err();
        assert!(matches!(err, EjectError::LinkFailure { .. }));
        assert!(err.to_string().contains("tool"));
    }
}
