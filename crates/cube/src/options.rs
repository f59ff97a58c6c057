//! Compile-time configuration (spec.md §6). A small `Default`-backed struct
//! rather than a builder, mirroring the teacher's `VmOptions` shape.

use f18a_isa::RomTable;

#[derive(Debug, Clone, Copy)]
pub struct CompileOptions {
    /// Fallback node coordinate when no `__node` directive is present.
    pub default_node_coord: u16,
    /// Whether the `> 56` soft code-budget threshold is reported as a
    /// warning (spec.md §4.5 invariant). The `> 64` hard overflow is always
    /// an error regardless of this flag.
    pub warn_on_code_budget: bool,
    /// Which ROM function table the `rom.*` namespace exposes.
    pub rom_table: RomTable,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            default_node_coord: 408,
            warn_on_code_budget: true,
            rom_table: RomTable::default(),
        }
    }
}
