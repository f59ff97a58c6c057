//! F18A node interpreter and 144-node chip composition: the runtime half of
//! this toolchain, consuming [`cube_codegen::CompiledNode`] images produced
//! by the `cube` compiler facade and executing them one slot at a time.

pub mod chip;
pub mod error;
pub mod node;
pub mod port;
pub mod stack;

pub use chip::{coord_to_index, index_to_coord, Chip, GRID_COLUMNS, GRID_ROWS, NODE_COUNT};
pub use error::BootError;
pub use node::{NeighborPorts, NodeInterpreter, StepEvent, COLD_ENTRY, RAM_SIZE, ROM_SIZE};
pub use port::{Port, PortOutcome};
pub use stack::{DataStack, ReturnStack};
