//! The fixed table of built-in predicates (spec.md §4.3 Pass 1).
//!
//! Every built-in has a hard parameter-name list; arity checking and
//! codegen both key off these names, so they live in one place rather
//! than being repeated at each call site.

/// One built-in predicate's declared parameter names, in the canonical
/// order the code-recipe expects them (argument binding itself is by
/// name, not position, per spec.md §3).
#[derive(Debug, Clone, Copy)]
pub struct BuiltinSig {
    pub name: &'static str,
    pub params: &'static [&'static str],
}

pub const BUILTINS: &[BuiltinSig] = &[
    BuiltinSig { name: "plus", params: &["a", "b", "c"] },
    BuiltinSig { name: "minus", params: &["a", "b", "c"] },
    BuiltinSig { name: "times", params: &["a", "b", "c"] },
    BuiltinSig { name: "band", params: &["a", "b", "c"] },
    BuiltinSig { name: "bor", params: &["a", "b", "c"] },
    BuiltinSig { name: "bxor", params: &["a", "b", "c"] },
    BuiltinSig { name: "bnot", params: &["a", "b"] },
    BuiltinSig { name: "shl", params: &["a", "n", "c"] },
    BuiltinSig { name: "shr", params: &["a", "n", "c"] },
    BuiltinSig { name: "greater", params: &["a", "b"] },
    BuiltinSig { name: "not", params: &["goal"] },
    BuiltinSig { name: "equal", params: &["a", "b"] },
    BuiltinSig { name: "send", params: &["port", "value"] },
    BuiltinSig { name: "recv", params: &["port", "value"] },
    BuiltinSig { name: "fill", params: &["value", "count"] },
    BuiltinSig { name: "loop", params: &["n"] },
    BuiltinSig { name: "again", params: &[] },
    // Codegen directives rather than runtime operations: `label` names the
    // current code-builder location, `lit.hex18` drops a raw data word.
    // Registered here so the resolver validates their argument names the
    // same way it does every other call (spec.md §8 scenarios 1 and 4).
    BuiltinSig { name: "label", params: &["name"] },
    BuiltinSig { name: "lit.hex18", params: &["value"] },
];

pub fn lookup(name: &str) -> Option<&'static BuiltinSig> {
    BUILTINS.iter().find(|b| b.name == name)
}

/// Built-ins that always require every listed parameter to be present
/// (spec.md §4.4 layer 1: `greater`, `not`, `equal`). Other built-ins
/// don't get this hard check here because their recipes already fail
/// loudly in the emitter when an operand is missing; the type checker
/// only special-cases the three the spec names.
pub fn has_hard_arity_check(name: &str) -> bool {
    matches!(name, "greater" | "not" | "equal")
}
