//! Boot-time failures (spec.md §4.8's "Boot" paragraph). The interpreter
//! itself never returns a `Result` during stepping — every 18-bit word is a
//! valid instruction (spec.md §7, "Runtime (interpreter) — none of the
//! above are runtime errors") — so this enum only covers loading a
//! [`cube_codegen::CompiledNode`] into a node's memory, mirroring the
//! teacher's `VmError` shape (`raya-core::VmError`) scoped down to what can
//! actually go wrong here.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BootError {
    #[error("node image for coord {coord} has {len} words, which exceeds RAM size 0x40")]
    ImageTooLarge { coord: u16, len: u16 },
    #[error("chip coordinate {coord} is out of range for the 18x8 grid")]
    CoordOutOfRange { coord: u16 },
}
