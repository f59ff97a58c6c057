//! Tokenizer, AST, and recursive-descent parser for the CUBE source
//! language (spec.md §3, §4).
//!
//! Downstream crates (`cube-resolve`, `cube-codegen`) only ever see the
//! `ast` types and the shared `diagnostic` types; `token`/`lexer` are
//! consumed internally by `parser` but are public so a caller can tokenize
//! without parsing (editor tooling, syntax highlighting).

pub mod ast;
pub mod diagnostic;
pub mod lexer;
pub mod parser;
pub mod token;

pub use ast::{
    Application, ArgBinding, CubeProgram, FieldDecl, Item, ItemKind, ParamDecl, PredicateDef,
    RenameBinding, Term, TermKind, TypeDef, TypeExpr, TypeExprKind, Unification, VariantDef,
};
pub use diagnostic::{CompileError, Diagnosed, Pos, Warning};
pub use lexer::{tokenize, LexError};
pub use parser::{parse, ParseError};
pub use token::{Span, Token};
