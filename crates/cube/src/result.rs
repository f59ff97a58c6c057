//! The top-level compile result (spec.md §6).

use cube_codegen::{CompiledNode, SourceMapEntry};
use cube_syntax::{CompileError, Warning};
use rustc_hash::{FxHashMap, FxHashSet};

/// Union of every pass's diagnostics, in pass order. `nodes` is empty
/// whenever `errors` is non-empty (spec.md §7's user-visible contract) —
/// a caller must not attempt to load or run a result with errors present.
///
/// The four side tables mirror `nodes` one-for-one: `symbols[i]`,
/// `variables[i]`, `source_map[i]` and `node_coord[i]` all describe
/// `nodes[i]` (spec.md §6's diagnostic side tables, used by a driver that
/// wants to pretty-print addresses or resolve a breakpoint by label
/// without re-walking `CompiledNode`).
#[derive(Debug, Clone, Default)]
pub struct CompileResult {
    pub nodes: Vec<CompiledNode>,
    pub errors: Vec<CompileError>,
    pub warnings: Vec<Warning>,
    pub symbols: Vec<FxHashMap<String, u16>>,
    pub variables: Vec<FxHashSet<String>>,
    pub source_map: Vec<Vec<SourceMapEntry>>,
    pub node_coord: Vec<u16>,
}
