//! Lowers a resolved, type-checked CUBE program into a per-node F18A
//! machine image (spec.md §4.5-§4.7).
//!
//! Pipeline position: `cube-resolve::ResolvedProgram` (symbols collected,
//! types checked) in, [`emitter::CompiledNode`] out. `cube-codegen` never
//! reads source text or tokens — that's `cube-syntax`'s job upstream, and
//! `f18a-vm`'s job downstream is to run what this crate builds.

pub mod alloc;
pub mod builder;
pub mod emitter;
pub mod error;
pub mod varmap;

pub use alloc::AllocationPlan;
pub use builder::{BuiltCode, CodeBuilder, JumpTarget, SourceMapEntry};
pub use emitter::{emit, CompiledNode};
pub use error::EmitError;
pub use varmap::VariableMap;
