//! Facade crate wiring `cube-syntax -> cube-resolve -> cube-codegen` into a
//! single [`compile`] entry point (spec.md §6), the way the teacher's
//! `raya-compiler::Compiler::compile` wires `raya-parser` output into
//! `CodeGenerator` — scaled to this toolchain's six passes and its
//! `__node`-directive multi-node splitting.
//!
//! No file I/O, CLI parsing, or pretty-printing lives here; those are
//! explicitly out of scope (spec.md §1) and belong to an external driver.

mod options;
mod result;
mod split;

pub use cube_codegen::CompiledNode;
pub use options::CompileOptions;
pub use result::CompileResult;

use cube_resolve::{check, resolve};
use cube_syntax::{parse, tokenize, CompileError, CubeProgram, Pos, Warning};

/// Runs every pass over `source` and returns the per-node compiled images
/// plus the union of every pass's diagnostics (spec.md §7). A pass refuses
/// to run once an earlier one reports an error, and `nodes` is empty
/// whenever `errors` is non-empty.
pub fn compile(source: &str, options: CompileOptions) -> CompileResult {
    let (tokens, lex_errors) = tokenize(source);
    let mut errors: Vec<CompileError> = lex_errors
        .iter()
        .map(|e| CompileError::new(lex_error_pos(e), e.to_string()))
        .collect();
    let warnings: Vec<Warning> = Vec::new();

    let program = match parse(tokens) {
        Ok(program) => program,
        Err(parse_errors) => {
            errors.extend(
                parse_errors
                    .iter()
                    .map(|e| CompileError::new(parse_error_pos(e), e.to_string())),
            );
            return CompileResult { errors, warnings, ..CompileResult::default() };
        }
    };

    if !errors.is_empty() {
        return CompileResult { errors, warnings, ..CompileResult::default() };
    }

    let mut result = CompileResult { errors, warnings, ..CompileResult::default() };
    for segment in split::split_nodes(&program.top) {
        compile_segment(CubeProgram { top: segment }, &options, &mut result);
    }

    if !result.errors.is_empty() {
        result.nodes.clear();
        result.symbols.clear();
        result.variables.clear();
        result.source_map.clear();
        result.node_coord.clear();
    }
    result
}

fn compile_segment(program: CubeProgram, options: &CompileOptions, result: &mut CompileResult) {
    let resolved = resolve(program, options.rom_table, options.default_node_coord);
    result.errors.extend(resolved.errors);
    result.warnings.extend(resolved.warnings);
    if !result.errors.is_empty() {
        return;
    }

    let checked = check(&resolved.value);
    result.errors.extend(checked.structural_errors);
    result.errors.extend(
        checked
            .type_errors
            .iter()
            .map(|e| CompileError::new(type_error_pos(e), e.to_string())),
    );
    if !result.errors.is_empty() {
        return;
    }

    let variables = resolved.value.variables.clone();
    let emitted = cube_codegen::emit(&resolved.value, options.warn_on_code_budget);
    result.warnings.extend(emitted.warnings);
    if emitted.errors.is_empty() {
        result.symbols.push(emitted.value.symbols.clone());
        result.variables.push(variables);
        result.source_map.push(emitted.value.source_map.clone());
        result.node_coord.push(emitted.value.coord);
        result.nodes.push(emitted.value);
    } else {
        result.errors.extend(emitted.errors);
    }
}

fn lex_error_pos(e: &cube_syntax::LexError) -> Pos {
    use cube_syntax::LexError::*;
    match e {
        UnexpectedCharacter { span, .. } | UnterminatedString { span } | InvalidNumber { span, .. } => {
            Pos::new(span.line, span.col)
        }
    }
}

fn parse_error_pos(e: &cube_syntax::ParseError) -> Pos {
    use cube_syntax::ParseError::*;
    match e {
        Unexpected { span, .. } | TooDeep { span } => Pos::new(span.line, span.col),
    }
}

fn type_error_pos(e: &cube_resolve::TypeError) -> Pos {
    use cube_resolve::TypeError::*;
    match e {
        Mismatch { span, .. } | OccursCheck { span, .. } => Pos::new(span.line, span.col),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a_clean_program_compiles_to_one_node_with_no_diagnostics() {
        let result = compile("node 112 { a = 0x175, b = 0x1D5 } /\\ f18a.dup", CompileOptions::default());
        assert!(result.errors.is_empty(), "unexpected errors: {:?}", result.errors);
        assert_eq!(result.nodes.len(), 1);
        assert_eq!(result.nodes[0].coord, 112);
    }

    #[test]
    fn an_undefined_symbol_yields_no_nodes() {
        let result = compile("frobnicate { a = 1 }", CompileOptions::default());
        assert!(!result.errors.is_empty());
        assert!(result.nodes.is_empty());
    }

    #[test]
    fn two_node_directives_compile_to_two_separate_images() {
        let result = compile(
            "node 100 /\\ f18a.dup /\\ node 200 /\\ f18a.drop",
            CompileOptions::default(),
        );
        assert!(result.errors.is_empty(), "unexpected errors: {:?}", result.errors);
        assert_eq!(result.nodes.len(), 2);
        assert_eq!(result.nodes[0].coord, 100);
        assert_eq!(result.nodes[1].coord, 200);
    }

    #[test]
    fn a_lex_error_prevents_parsing_from_even_starting() {
        let result = compile("x = $", CompileOptions::default());
        assert!(!result.errors.is_empty());
        assert!(result.nodes.is_empty());
    }
}
