//! Dependency tree ejection.
//!
//! Provides utilities for:
//! - Reading package.json descriptors
//! - Matching installed versions against npm ranges
//! - Locating dependencies through ancestor `node_modules` directories
//! - Extracting `.bin` aliases
//! - Building a flattened, deduplicated dependency graph
//! - Copying the graph into an output tree and relinking `.bin`

pub mod bin;
pub mod eject;
pub mod error;
pub mod graph;
pub mod link;
pub mod locate;
pub mod manifest;
pub mod version;

pub use bin::{alias_dir_for, descope, extract, extract_for_alias_dir, AliasEntry};
pub use eject::{
    apply, eject, is_alias_dir, prepare, EjectOutcome, EjectReport, MAX_CONCURRENT_COPIES,
};
pub use error::{codes as eject_codes, EjectError};
pub use graph::{
    build_graph, out_alias_dir, GraphOptions, ResolvedNode, PKG_GRAPH_SCHEMA_VERSION,
};
pub use link::link_alias;
pub use locate::{package_dir, resolve, search_roots, BIN_DIR, NODE_MODULES};
pub use manifest::{BinField, Manifest, PACKAGE_JSON};
pub use version::{version_satisfies, RangeSpec};
