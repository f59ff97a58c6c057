//! Symbol resolution and type checking for CUBE programs (spec.md §4.3,
//! §4.4): turns a parsed [`cube_syntax::CubeProgram`] into a
//! [`ResolvedProgram`] with every reference checked and every variable
//! collected, then runs Hindley-Milner inference over it.

pub mod builtins;
pub mod checker;
pub mod resolver;
pub mod symbols;
pub mod types;

pub use builtins::{has_hard_arity_check, lookup as lookup_builtin, BuiltinSig, BUILTINS};
pub use checker::{check, TypeCheckResult};
pub use resolver::{resolve, ResolvedProgram};
pub use symbols::{PredicateRef, ResolvedSymbol, SymbolTable};
pub use types::{InferContext, Ty, TypeError, TypeVarId};
