//! The resolver's symbol table: a single flat namespace from name to
//! [`ResolvedSymbol`] (spec.md §3, §9). CUBE has no block/function
//! scoping, so unlike the teacher's `raya_parser::checker::symbols`
//! scope tree, this collapses to one global map — still `FxHashMap`-backed
//! for the same reason the teacher uses `rustc_hash` there: symbol lookup
//! is on the hot path of every pass after resolution.

use std::rc::Rc;

use cube_syntax::PredicateDef;
use rustc_hash::FxHashMap;

/// A predicate definition's AST, reachable without cloning it again every
/// time a call site needs to inline or re-walk its body. `Rc` is this
/// crate's realization of the "reference by stable identity, not owned
/// clone" design note (spec.md §9) — see DESIGN.md.
pub type PredicateRef = Rc<PredicateDef>;

#[derive(Debug, Clone)]
pub enum ResolvedSymbol {
    /// A fixed built-in predicate (`plus`, `equal`, `fill`, ...).
    Builtin {
        params: Vec<&'static str>,
    },
    /// One of the 32 fixed F18A opcodes, exposed under `f18a.*`.
    F18aOp {
        opcode: u8,
    },
    /// A ROM entry point, exposed under `rom.*`.
    RomFunc {
        address: u16,
    },
    /// A user-defined predicate.
    UserPred {
        params: Vec<String>,
        def: PredicateRef,
    },
    /// One variant of a user-defined sum type.
    Constructor {
        parent_type: String,
        tag: u32,
        tag_bits: u32,
        fields: Vec<String>,
    },
}

impl ResolvedSymbol {
    /// Declared argument/field names, for named-argument validation. `None`
    /// for kinds that aren't called with named arguments (`f18a.*`,
    /// `rom.*`, which are addressed by positional/opcode semantics in the
    /// emitter instead).
    pub fn arg_names(&self) -> Option<Vec<&str>> {
        match self {
            ResolvedSymbol::Builtin { params } => Some(params.iter().map(|s| *s).collect()),
            ResolvedSymbol::UserPred { params, .. } => {
                Some(params.iter().map(|s| s.as_str()).collect())
            }
            ResolvedSymbol::Constructor { fields, .. } => {
                Some(fields.iter().map(|s| s.as_str()).collect())
            }
            ResolvedSymbol::F18aOp { .. } | ResolvedSymbol::RomFunc { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    symbols: FxHashMap<String, ResolvedSymbol>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `symbol` under `name`. Returns `true` if this replaced an
    /// existing binding (the caller reports that as a redefinition
    /// diagnostic; the new binding still wins, per spec.md §4.3).
    pub fn insert(&mut self, name: impl Into<String>, symbol: ResolvedSymbol) -> bool {
        self.symbols.insert(name.into(), symbol).is_some()
    }

    pub fn get(&self, name: &str) -> Option<&ResolvedSymbol> {
        self.symbols.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.symbols.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ResolvedSymbol)> {
        self.symbols.iter()
    }
}
