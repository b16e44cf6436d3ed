//! `nmeject graph` command implementation.

use super::{display_path, fail, SourceArgs, DEFAULT_OUT_DIR};
use miette::Result;
use nmeject_core::pkg::{build_graph, prepare, ResolvedNode, PKG_GRAPH_SCHEMA_VERSION};
use nmeject_core::Error;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// One node of the JSON graph output.
#[derive(Serialize)]
struct GraphNodeOutput {
    name: String,
    version: String,
    range: String,
    source: PathBuf,
    destination: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    location: Option<PathBuf>,
    nested: bool,
    bin: BTreeMap<String, PathBuf>,
}

impl GraphNodeOutput {
    fn new(node: &ResolvedNode, root_dir: &Path) -> Self {
        Self {
            name: node.name.clone(),
            version: node.version.clone(),
            range: node.range.clone(),
            source: node.source_path.clone(),
            destination: node.destination_path.clone(),
            location: node.location(root_dir),
            nested: node.nested,
            bin: node
                .aliases
                .iter()
                .map(|a| (a.name.clone(), a.target.clone()))
                .collect(),
        }
    }
}

/// JSON result for `graph`.
#[derive(Serialize)]
struct GraphJsonResult {
    ok: bool,
    schema_version: u32,
    root: PathBuf,
    out: PathBuf,
    nodes: Vec<GraphNodeOutput>,
}

/// Run the graph command.
pub fn run(cwd: &Path, source: &SourceArgs, out: Option<&Path>, json: bool) -> Result<()> {
    let options = match source.options(cwd, out, Some(DEFAULT_OUT_DIR)) {
        Ok(options) => options,
        Err(e) => fail(&e, json),
    };

    let (manifest, root_dir, graph_options) = match prepare(&options) {
        Ok(prepared) => prepared,
        Err(e) => fail(&Error::from(e), json),
    };

    let nodes = match build_graph(&manifest, &root_dir, &graph_options) {
        Ok(nodes) => nodes,
        Err(e) => fail(&Error::from(e), json),
    };

    if json {
        let result = GraphJsonResult {
            ok: true,
            schema_version: PKG_GRAPH_SCHEMA_VERSION,
            root: root_dir.clone(),
            out: graph_options.out_root.clone(),
            nodes: nodes
                .iter()
                .map(|n| GraphNodeOutput::new(n, &root_dir))
                .collect(),
        };
        println!("{}", serde_json::to_string_pretty(&result).unwrap());
    } else {
        print_graph_human(&manifest.name, &nodes, &graph_options.out_root);
    }

    Ok(())
}

/// Print the graph as a flat tree under the root package.
fn print_graph_human(root_name: &str, nodes: &[ResolvedNode], out_root: &Path) {
    let label = if root_name.is_empty() { "(root)" } else { root_name };
    println!("{label}");

    if nodes.is_empty() {
        println!("(no dependencies)");
        return;
    }

    for (i, node) in nodes.iter().enumerate() {
        let is_last = i == nodes.len() - 1;
        let connector = if is_last { "└── " } else { "├── " };
        let next_prefix = if is_last { "    " } else { "│   " };

        let nested = if node.nested { " (nested)" } else { "" };
        println!(
            "{connector}{}@{} [{}] -> {}{nested}",
            node.name,
            node.version,
            node.range,
            display_path(&node.destination_path, out_root)
        );

        for alias in &node.aliases {
            println!("{next_prefix}.bin/{}", alias.name);
        }
    }
}
