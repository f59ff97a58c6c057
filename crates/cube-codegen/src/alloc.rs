//! The placement/allocation pass (spec.md §3's `AllocationPlan`).
//!
//! Deliberately a one-field pass today: the CORE only ever targets a
//! single node per compiled unit. It stays its own type rather than being
//! folded into [`crate::emitter::Emitter`] so a future multi-node
//! placement allocator can replace it without the emitter's interface
//! changing.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocationPlan {
    pub node_coord: u16,
}

impl AllocationPlan {
    pub fn from_resolved(node_coord: u16) -> Self {
        Self { node_coord }
    }
}
