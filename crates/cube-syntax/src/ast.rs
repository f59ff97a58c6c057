//! Abstract syntax tree for CUBE (spec.md §3).
//!
//! AST nodes are created once by the parser and never mutated by later
//! passes (spec.md §3 Lifecycle); downstream passes build side tables
//! (`SymbolTable`, `VariableMap`, ...) instead of rewriting the tree. The
//! tree is strictly tree-shaped (no cycles), so plain ownership
//! (`Vec`/`Box`) is all that's needed — no arena or index indirection, per
//! spec.md §9's design note.

use crate::token::Span;

/// The whole program: one top-level conjunction.
#[derive(Debug, Clone, PartialEq)]
pub struct CubeProgram {
    pub top: Conjunction,
}

/// An ordered AND of items; order is significant for code emission
/// (spec.md §3).
pub type Conjunction = Vec<Item>;

/// One item in a conjunction, with its source span.
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub span: Span,
    pub kind: ItemKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ItemKind {
    PredicateDef(PredicateDef),
    TypeDef(TypeDef),
    Application(Application),
    Unification(Unification),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParamDecl {
    pub name: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PredicateDef {
    pub name: String,
    pub params: Vec<ParamDecl>,
    /// A disjunction of conjunctions: the predicate body. A single
    /// unparenthesized clause still lives here as a one-element vec.
    pub clauses: Vec<Conjunction>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDecl {
    pub name: String,
    pub ty: TypeExpr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariantDef {
    pub name: String,
    pub span: Span,
    pub fields: Vec<FieldDecl>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeDef {
    pub name: String,
    pub type_params: Vec<String>,
    pub variants: Vec<VariantDef>,
}

/// A named argument to an `Application` or `AppTerm`: `name = term`.
#[derive(Debug, Clone, PartialEq)]
pub struct ArgBinding {
    pub name: String,
    pub name_span: Span,
    pub value: Term,
}

/// `functor { arg, arg, ... }` or bare `functor` (zero-arg). `__node` and
/// `__include` are synthetic functors with special meaning (spec.md §3).
#[derive(Debug, Clone, PartialEq)]
pub struct Application {
    pub functor: String,
    pub functor_span: Span,
    pub args: Vec<ArgBinding>,
}

impl Application {
    pub const NODE_DIRECTIVE: &'static str = "__node";
    pub const INCLUDE_DIRECTIVE: &'static str = "__include";

    pub fn arg(&self, name: &str) -> Option<&ArgBinding> {
        self.args.iter().find(|a| a.name == name)
    }
}

/// `variable = term`.
#[derive(Debug, Clone, PartialEq)]
pub struct Unification {
    pub variable: String,
    pub variable_span: Span,
    pub term: Term,
}

/// One `to <- from` binding inside a rename term `{ to <- from, ... }`.
#[derive(Debug, Clone, PartialEq)]
pub struct RenameBinding {
    pub to: String,
    pub from: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Term {
    pub span: Span,
    pub kind: TermKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TermKind {
    Var(String),
    Literal(i64),
    StringLiteral(String),
    /// A constructor application or nested call: `Ctor { field = term, ... }`.
    AppTerm { functor: String, args: Vec<ArgBinding> },
    Rename(Vec<RenameBinding>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeExpr {
    pub span: Span,
    pub kind: TypeExprKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeExprKind {
    TypeVar(String),
    TypeApp {
        constructor: String,
        args: Vec<(String, TypeExpr)>,
    },
    FuncType {
        params: Vec<(String, TypeExpr)>,
        ret: Box<TypeExpr>,
    },
}
