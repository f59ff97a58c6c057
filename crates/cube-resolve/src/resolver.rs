//! Two-pass resolver (spec.md §4.3): register every definition (built-in,
//! `f18a.*`, `rom.*`, user predicate, constructor) in one shared
//! [`SymbolTable`], then walk the program again to check every reference
//! resolves and to collect the variable set the `VarMapper` needs.

use std::rc::Rc;

use cube_syntax::{
    ArgBinding, Application, CompileError, CubeProgram, Diagnosed, Item, ItemKind, Pos, Span,
    Term, TermKind, Warning,
};
use f18a_isa::{RomTable, OPCODES};
use rustc_hash::FxHashSet;

use crate::builtins::BUILTINS;
use crate::symbols::{ResolvedSymbol, SymbolTable};

#[derive(Debug, Clone)]
pub struct ResolvedProgram {
    pub program: CubeProgram,
    pub symbols: SymbolTable,
    pub variables: FxHashSet<String>,
    pub node_coord: u16,
}

pub fn resolve(
    program: CubeProgram,
    rom_table: RomTable,
    default_node_coord: u16,
) -> Diagnosed<ResolvedProgram> {
    let mut errors = Vec::new();
    let warnings: Vec<Warning> = Vec::new();
    let mut table = SymbolTable::new();

    register_builtins(&mut table);
    register_f18a_ops(&mut table);
    register_rom_funcs(&mut table, rom_table);
    register_program_defs(&mut table, &program.top, &mut errors);

    let mut variables = FxHashSet::default();
    resolve_conjunction(&program.top, &table, &mut variables, &mut errors);

    let node_coord = find_node_coord(&program.top).unwrap_or(default_node_coord);

    Diagnosed {
        value: ResolvedProgram {
            program,
            symbols: table,
            variables,
            node_coord,
        },
        errors,
        warnings,
    }
}

fn register_builtins(table: &mut SymbolTable) {
    for b in BUILTINS {
        table.insert(b.name, ResolvedSymbol::Builtin {
            params: b.params.to_vec(),
        });
    }
}

fn register_f18a_ops(table: &mut SymbolTable) {
    for op in OPCODES.iter() {
        table.insert(format!("f18a.{}", op.clean_name), ResolvedSymbol::F18aOp {
            opcode: op.number,
        });
    }
}

fn register_rom_funcs(table: &mut SymbolTable, rom_table: RomTable) {
    for f in rom_table.functions() {
        table.insert(format!("rom.{}", f.clean_name), ResolvedSymbol::RomFunc {
            address: f.address,
        });
    }
}

/// Pass 1: walk the program recursively (predicate bodies can nest further
/// definitions, per spec.md §4.3) registering every `PredicateDef` and
/// every constructor of every `TypeDef`. A name collision is a diagnostic,
/// but the later binding still wins.
fn register_program_defs(
    table: &mut SymbolTable,
    items: &[Item],
    errors: &mut Vec<CompileError>,
) {
    for item in items {
        match &item.kind {
            ItemKind::PredicateDef(def) => {
                let params = def.params.iter().map(|p| p.name.clone()).collect();
                let symbol = ResolvedSymbol::UserPred {
                    params,
                    def: Rc::new(def.clone()),
                };
                if table.insert(def.name.clone(), symbol) {
                    errors.push(CompileError::new(
                        Pos::new(item.span.line, item.span.col),
                        format!("redefinition of `{}`", def.name),
                    ));
                }
                for clause in &def.clauses {
                    register_program_defs(table, clause, errors);
                }
            }
            ItemKind::TypeDef(def) => {
                let tag_bits = tag_bits_for(def.variants.len());
                for (tag, variant) in def.variants.iter().enumerate() {
                    let fields = variant.fields.iter().map(|f| f.name.clone()).collect();
                    let symbol = ResolvedSymbol::Constructor {
                        parent_type: def.name.clone(),
                        tag: tag as u32,
                        tag_bits,
                        fields,
                    };
                    if table.insert(variant.name.clone(), symbol) {
                        errors.push(CompileError::new(
                            Pos::new(variant.span.line, variant.span.col),
                            format!("redefinition of `{}`", variant.name),
                        ));
                    }
                }
            }
            ItemKind::Application(_) | ItemKind::Unification(_) => {}
        }
    }
}

/// `tagBits = numVariants <= 1 ? 0 : ceil(log2(numVariants))` (spec.md §4.3).
fn tag_bits_for(num_variants: usize) -> u32 {
    if num_variants <= 1 {
        0
    } else {
        usize::BITS - (num_variants - 1).leading_zeros()
    }
}

/// Pass 2: check every call resolves and collect every variable name
/// (spec.md §4.3).
fn resolve_conjunction(
    items: &[Item],
    table: &SymbolTable,
    variables: &mut FxHashSet<String>,
    errors: &mut Vec<CompileError>,
) {
    for item in items {
        match &item.kind {
            ItemKind::Application(app) => {
                if app.functor != Application::NODE_DIRECTIVE
                    && app.functor != Application::INCLUDE_DIRECTIVE
                {
                    resolve_call(&app.functor, app.functor_span, &app.args, table, errors);
                }
                for arg in &app.args {
                    resolve_term(&arg.value, table, variables, errors);
                }
            }
            ItemKind::Unification(u) => {
                variables.insert(u.variable.clone());
                resolve_term(&u.term, table, variables, errors);
            }
            ItemKind::PredicateDef(def) => {
                for p in &def.params {
                    variables.insert(p.name.clone());
                }
                for clause in &def.clauses {
                    resolve_conjunction(clause, table, variables, errors);
                }
            }
            ItemKind::TypeDef(_) => {}
        }
    }
}

fn resolve_term(
    term: &Term,
    table: &SymbolTable,
    variables: &mut FxHashSet<String>,
    errors: &mut Vec<CompileError>,
) {
    match &term.kind {
        TermKind::Var(name) => {
            variables.insert(name.clone());
        }
        TermKind::Literal(_) | TermKind::StringLiteral(_) => {}
        TermKind::AppTerm { functor, args } => {
            resolve_call(functor, term.span, args, table, errors);
            for arg in args {
                resolve_term(&arg.value, table, variables, errors);
            }
        }
        TermKind::Rename(_) => {}
    }
}

fn resolve_call(
    functor: &str,
    span: Span,
    args: &[ArgBinding],
    table: &SymbolTable,
    errors: &mut Vec<CompileError>,
) {
    match table.get(functor) {
        None => {
            errors.push(CompileError::new(
                Pos::new(span.line, span.col),
                format!("undefined symbol `{functor}`"),
            ));
        }
        Some(symbol) => {
            if let Some(declared) = symbol.arg_names() {
                for arg in args {
                    if !declared.contains(&arg.name.as_str()) {
                        errors.push(CompileError::new(
                            Pos::new(arg.name_span.line, arg.name_span.col),
                            format!("`{functor}` has no argument named `{}`", arg.name),
                        ));
                    }
                }
            }
        }
    }
}

fn find_node_coord(top: &[Item]) -> Option<u16> {
    for item in top {
        if let ItemKind::Application(app) = &item.kind {
            if app.functor == Application::NODE_DIRECTIVE {
                if let Some(arg) = app.arg("coord") {
                    if let TermKind::Literal(n) = arg.value.kind {
                        return Some(n as u16);
                    }
                }
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use cube_syntax::{parse, tokenize};
    use f18a_isa::RomTable;

    fn resolve_src(src: &str) -> Diagnosed<ResolvedProgram> {
        let (tokens, _) = tokenize(src);
        let program = parse(tokens).expect("parse should succeed");
        resolve(program, RomTable::default(), 408)
    }

    #[test]
    fn undefined_symbol_is_an_error() {
        let d = resolve_src("frobnicate { a = 1 }");
        assert_eq!(d.errors.len(), 1);
        assert!(d.errors[0].message.contains("undefined symbol"));
    }

    #[test]
    fn unknown_argument_name_is_an_error() {
        let d = resolve_src("plus { a = 1, b = 2, c = 3, extra = 4 }");
        assert_eq!(d.errors.len(), 1);
        assert!(d.errors[0].message.contains("no argument named"));
    }

    #[test]
    fn redefining_a_predicate_is_an_error_but_later_binding_wins() {
        let d = resolve_src(
            "p = lambda { } . again /\\ p = lambda { } . again /\\ p",
        );
        assert_eq!(d.errors.len(), 1);
        assert!(d.errors[0].message.contains("redefinition"));
    }

    #[test]
    fn f18a_and_rom_ops_resolve_without_error() {
        let d = resolve_src("f18a.dup /\\ rom.multiply");
        assert!(d.errors.is_empty(), "unexpected errors: {:?}", d.errors);
    }

    #[test]
    fn constructor_tag_and_tag_bits_match_variant_count() {
        let d = resolve_src("Option = Lambda { t } . None + Some { value : t }");
        assert!(d.errors.is_empty());
        match d.value.symbols.get("Some") {
            Some(ResolvedSymbol::Constructor { tag, tag_bits, .. }) => {
                assert_eq!(*tag, 1);
                assert_eq!(*tag_bits, 1);
            }
            other => panic!("expected constructor symbol, got {other:?}"),
        }
    }

    #[test]
    fn variables_are_collected_from_unifications_and_params() {
        let d = resolve_src("inc = lambda { a, b } . plus { a = a, b = 1, c = b }");
        assert!(d.errors.is_empty());
        assert!(d.value.variables.contains("a"));
        assert!(d.value.variables.contains("b"));
    }

    #[test]
    fn node_coordinate_falls_back_to_default_when_absent() {
        let d = resolve_src("x = 1");
        assert!(d.errors.is_empty());
        assert_eq!(d.value.node_coord, 408);
    }

    #[test]
    fn node_coordinate_is_read_from_directive() {
        let d = resolve_src("node 112 /\\ f18a.dup");
        assert!(d.errors.is_empty());
        assert_eq!(d.value.node_coord, 112);
    }
}
