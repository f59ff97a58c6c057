//! Emit-time diagnostics (spec.md §7).

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EmitError {
    #[error("compiled code length {len} exceeds node RAM capacity {limit}")]
    CodeOverflow { len: u16, limit: u16 },
    #[error("unresolved label `{name}`")]
    UnresolvedLabel { name: String },
    #[error("`{op}` requires a literal address, not a variable")]
    LiteralAddressRequired { op: String },
}
