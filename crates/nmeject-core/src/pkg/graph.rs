//! Flattened dependency graph construction.
//!
//! Walks an existing `node_modules` layout from a root manifest and produces
//! one [`ResolvedNode`] per physical install, deduplicated by real path.

use super::bin::{extract_for_alias_dir, AliasEntry};
use super::error::EjectError;
use super::locate::{package_dir, resolve, BIN_DIR, NODE_MODULES};
use super::manifest::{manifest_path, Manifest};
use nmeject_util::path::relative_to;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Schema version for graph output.
pub const PKG_GRAPH_SCHEMA_VERSION: u32 = 1;

/// Options for graph construction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphOptions {
    /// Installation root the dependencies were installed into. Conflicting
    /// versions are nested in the output at their path relative to this
    /// directory.
    pub source_root: PathBuf,
    /// Root of the output tree.
    pub out_root: PathBuf,
    /// Include the root package's devDependencies.
    pub include_dev: bool,
}

/// One physical install in the flattened graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedNode {
    /// Dependency name as declared by the dependent.
    pub name: String,
    /// Installed version.
    pub version: String,
    /// Range declared by the first dependent that reached this install.
    pub range: String,
    /// Canonical real path of the install. Unique across the graph.
    pub source_path: PathBuf,
    /// Where the install lands in the output tree.
    pub destination_path: PathBuf,
    /// Whether this install was nested because another install of the same
    /// name already holds the flattened slot.
    pub nested: bool,
    /// `.bin` entries, relative to the output alias directory. When several
    /// nodes expose the same alias, the first node in graph order owns it.
    pub aliases: Vec<AliasEntry>,
}

impl ResolvedNode {
    /// Path of this node's package.json relative to `root_dir`.
    #[must_use]
    pub fn location(&self, root_dir: &Path) -> Option<PathBuf> {
        relative_to(root_dir, &manifest_path(&self.source_path))
    }
}

/// The shared alias directory of an output tree.
#[must_use]
pub fn out_alias_dir(out_root: &Path) -> PathBuf {
    out_root.join(BIN_DIR)
}

/// Per-call traversal state.
struct GraphContext<'a> {
    options: &'a GraphOptions,
    source_root: PathBuf,
    alias_dir: PathBuf,
    /// Real paths already turned into nodes.
    visited: HashSet<PathBuf>,
    /// Package name -> real path holding the flattened slot.
    placed: HashMap<String, PathBuf>,
    /// Destinations already handed out.
    claimed: HashSet<PathBuf>,
    nodes: Vec<ResolvedNode>,
}

impl<'a> GraphContext<'a> {
    fn new(options: &'a GraphOptions) -> Self {
        let source_root = dunce::canonicalize(&options.source_root)
            .unwrap_or_else(|_| options.source_root.clone());

        Self {
            options,
            source_root,
            alias_dir: out_alias_dir(&options.out_root),
            visited: HashSet::new(),
            placed: HashMap::new(),
            claimed: HashSet::new(),
            nodes: Vec::new(),
        }
    }

    /// Resolve every edge of one dependent, then descend into each new child.
    ///
    /// All siblings are registered before any grandchild so a package's
    /// direct dependencies claim their flattened slots first.
    fn visit(
        &mut self,
        from_dir: &Path,
        parent_dest: Option<&Path>,
        edges: Vec<(String, String)>,
    ) -> Result<(), EjectError> {
        let mut children = Vec::new();

        for (name, range) in edges {
            let source = resolve(from_dir, &name, Some(&range))?;

            if !self.visited.insert(source.clone()) {
                debug!(name = %name, path = %source.display(), "already visited");
                continue;
            }

            let manifest = Manifest::load(&source)?;
            let (destination, nested) = self.destination(&name, &source, parent_dest);
            let aliases = extract_for_alias_dir(&manifest, &destination, &self.alias_dir);

            debug!(
                name = %name,
                version = %manifest.version,
                nested,
                dest = %destination.display(),
                "node"
            );

            children.push((self.nodes.len(), manifest.edges(false)));
            self.nodes.push(ResolvedNode {
                name,
                version: manifest.version,
                range,
                source_path: source,
                destination_path: destination,
                nested,
                aliases,
            });
        }

        for (index, edges) in children {
            let source = self.nodes[index].source_path.clone();
            let dest = self.nodes[index].destination_path.clone();
            self.visit(&source, Some(&dest), edges)?;
        }

        Ok(())
    }

    /// Flatten to `out/<name>` unless the name is taken by another install.
    ///
    /// A conflicting install keeps its on-disk nesting when that directory is
    /// still free, and otherwise lands under its dependent's destination.
    /// No two installs share a destination.
    fn destination(
        &mut self,
        name: &str,
        source: &Path,
        parent_dest: Option<&Path>,
    ) -> (PathBuf, bool) {
        let flat = package_dir(&self.options.out_root, name);
        if !self.placed.contains_key(name) && !self.claimed.contains(&flat) {
            self.placed.insert(name.to_string(), source.to_path_buf());
            self.claimed.insert(flat.clone());
            return (flat, false);
        }

        let mirrored = match source.strip_prefix(&self.source_root) {
            Ok(rel) if !rel.as_os_str().is_empty() => Some(self.options.out_root.join(rel)),
            _ => None,
        };

        let nested = match mirrored {
            Some(dest) if !self.claimed.contains(&dest) => dest,
            _ => {
                let base = parent_dest.unwrap_or(&self.options.out_root);
                package_dir(&base.join(NODE_MODULES), name)
            }
        };
        self.claimed.insert(nested.clone());
        (nested, true)
    }
}

/// Build the flattened dependency graph of `root_manifest`, whose package
/// directory is `root_dir`.
///
/// Nodes come out in a deterministic order: a dependent's direct
/// dependencies sorted by name, followed by each of their subtrees in the
/// same order. The root package itself is not part of the graph.
///
/// # Errors
/// Propagates `DependencyUnresolved` for the first edge that cannot be
/// resolved and manifest errors for installs without a readable
/// package.json.
pub fn build_graph(
    root_manifest: &Manifest,
    root_dir: &Path,
    options: &GraphOptions,
) -> Result<Vec<ResolvedNode>, EjectError> {
    let root_dir = dunce::canonicalize(root_dir).map_err(|e| EjectError::io(root_dir, e))?;
    let mut ctx = GraphContext::new(options);

    // The root may itself be installed (self-reference through a workspace link).
    ctx.visited.insert(root_dir.clone());

    ctx.visit(&root_dir, None, root_manifest.edges(options.include_dev))?;

    info!(
        root = %root_manifest.name,
        nodes = ctx.nodes.len(),
        "dependency graph resolved"
    );

    Ok(ctx.nodes)
}
