//! Type checking (spec.md §4.4): a structural arity layer first, then
//! Hindley-Milner inference over the structurally-clean program.
//!
//! Both layers only ever push diagnostics; neither mutates the AST, so a
//! caller that ignores the returned errors still gets a well-formed
//! (if untyped) program back.

use cube_syntax::{CompileError, Item, ItemKind, Pos, Term, TermKind, TypeExprKind};
use rustc_hash::FxHashMap;

use crate::builtins::has_hard_arity_check;
use crate::resolver::ResolvedProgram;
use crate::symbols::ResolvedSymbol;
use crate::types::{InferContext, Ty, TypeError};

#[derive(Debug, Clone)]
struct CtorInfo {
    parent_type: String,
    type_params: Vec<String>,
    fields: Vec<(String, cube_syntax::TypeExpr)>,
}

pub struct TypeCheckResult {
    pub ctx: InferContext,
    pub structural_errors: Vec<CompileError>,
    pub type_errors: Vec<TypeError>,
}

pub fn check(resolved: &ResolvedProgram) -> TypeCheckResult {
    let structural_errors = structural_check(resolved);

    let mut ctx = InferContext::new();
    let mut var_tys: FxHashMap<String, Ty> = FxHashMap::default();
    for name in &resolved.variables {
        var_tys.insert(name.clone(), ctx.fresh());
    }

    let pred_param_tys = build_pred_param_tys(resolved, &var_tys);
    let ctor_infos = collect_ctor_infos(&resolved.program.top);

    let mut checker = Checker {
        ctx: &mut ctx,
        var_tys: &var_tys,
        pred_param_tys: &pred_param_tys,
        ctor_infos: &ctor_infos,
        errors: Vec::new(),
    };
    checker.check_conjunction(&resolved.program.top);
    let type_errors = checker.errors;

    TypeCheckResult { ctx, structural_errors, type_errors }
}

/// Layer 1: required-parameter presence for the three builtins whose
/// behavior is unsafe to emit code for when an operand is missing
/// (spec.md §4.4).
fn structural_check(resolved: &ResolvedProgram) -> Vec<CompileError> {
    let mut errors = Vec::new();
    walk_structural(&resolved.program.top, resolved, &mut errors);
    errors
}

fn walk_structural(items: &[Item], resolved: &ResolvedProgram, errors: &mut Vec<CompileError>) {
    for item in items {
        match &item.kind {
            ItemKind::Application(app) => {
                if has_hard_arity_check(&app.functor) {
                    if let Some(ResolvedSymbol::Builtin { params }) =
                        resolved.symbols.get(&app.functor)
                    {
                        for required in params.iter() {
                            if app.arg(required).is_none() {
                                errors.push(CompileError::new(
                                    Pos::new(app.functor_span.line, app.functor_span.col),
                                    format!(
                                        "`{}` is missing required argument `{required}`",
                                        app.functor
                                    ),
                                ));
                            }
                        }
                    }
                }
            }
            ItemKind::PredicateDef(def) => {
                for clause in &def.clauses {
                    walk_structural(clause, resolved, errors);
                }
            }
            ItemKind::Unification(_) | ItemKind::TypeDef(_) => {}
        }
    }
}

fn build_pred_param_tys(
    resolved: &ResolvedProgram,
    var_tys: &FxHashMap<String, Ty>,
) -> FxHashMap<String, Vec<(String, Ty)>> {
    let mut out = FxHashMap::default();
    for (name, symbol) in resolved.symbols.iter() {
        if let ResolvedSymbol::UserPred { params, .. } = symbol {
            let tys = params
                .iter()
                .map(|p| {
                    let ty = var_tys.get(p).cloned().unwrap_or(Ty::Int);
                    (p.clone(), ty)
                })
                .collect();
            out.insert(name.clone(), tys);
        }
    }
    out
}

fn collect_ctor_infos(items: &[Item]) -> FxHashMap<String, CtorInfo> {
    let mut out = FxHashMap::default();
    for item in items {
        if let ItemKind::TypeDef(def) = &item.kind {
            for variant in &def.variants {
                out.insert(
                    variant.name.clone(),
                    CtorInfo {
                        parent_type: def.name.clone(),
                        type_params: def.type_params.clone(),
                        fields: variant
                            .fields
                            .iter()
                            .map(|f| (f.name.clone(), f.ty.clone()))
                            .collect(),
                    },
                );
            }
        }
    }
    out
}

struct Checker<'a> {
    ctx: &'a mut InferContext,
    var_tys: &'a FxHashMap<String, Ty>,
    pred_param_tys: &'a FxHashMap<String, Vec<(String, Ty)>>,
    ctor_infos: &'a FxHashMap<String, CtorInfo>,
    errors: Vec<TypeError>,
}

impl<'a> Checker<'a> {
    fn check_conjunction(&mut self, items: &[Item]) {
        for item in items {
            match &item.kind {
                ItemKind::Application(app) => {
                    if app.functor != cube_syntax::Application::NODE_DIRECTIVE
                        && app.functor != cube_syntax::Application::INCLUDE_DIRECTIVE
                    {
                        self.check_call(&app.functor, &app.args, item.span);
                    }
                }
                ItemKind::Unification(u) => {
                    let lhs = self
                        .var_tys
                        .get(&u.variable)
                        .cloned()
                        .unwrap_or_else(|| self.ctx.fresh());
                    let rhs = self.infer_term(&u.term);
                    self.ctx.unify(&lhs, &rhs, u.term.span, &mut self.errors);
                }
                ItemKind::PredicateDef(def) => {
                    for clause in &def.clauses {
                        self.check_conjunction(clause);
                    }
                }
                ItemKind::TypeDef(_) => {}
            }
        }
    }

    fn check_call(&mut self, functor: &str, args: &[cube_syntax::ArgBinding], span: cube_syntax::Span) {
        if let Some(expected) = builtin_expected_tys(self.ctx, functor) {
            for arg in args {
                if let Some(ety) = expected.get(arg.name.as_str()) {
                    let aty = self.infer_term(&arg.value);
                    self.ctx.unify(ety, &aty, span, &mut self.errors);
                } else {
                    self.infer_term(&arg.value);
                }
            }
            return;
        }
        if let Some(params) = self.pred_param_tys.get(functor).cloned() {
            for arg in args {
                let aty = self.infer_term(&arg.value);
                if let Some((_, pty)) = params.iter().find(|(n, _)| n == &arg.name) {
                    self.ctx.unify(pty, &aty, span, &mut self.errors);
                }
            }
            return;
        }
        // f18a.*/rom.* and unresolved functors: no named type scheme, but
        // still walk args for any nested unification they contain.
        for arg in args {
            self.infer_term(&arg.value);
        }
    }

    fn infer_term(&mut self, term: &Term) -> Ty {
        match &term.kind {
            TermKind::Var(name) => self.var_tys.get(name).cloned().unwrap_or(Ty::Int),
            TermKind::Literal(_) => Ty::Int,
            TermKind::StringLiteral(_) => Ty::Str,
            TermKind::AppTerm { functor, args } => {
                if let Some(ctor) = self.ctor_infos.get(functor).cloned() {
                    let inst: FxHashMap<String, Ty> = ctor
                        .type_params
                        .iter()
                        .map(|p| (p.clone(), self.ctx.fresh()))
                        .collect();
                    for arg in args {
                        if let Some((_, fty)) =
                            ctor.fields.iter().find(|(n, _)| n == &arg.name)
                        {
                            let expected = type_expr_to_ty(fty, &inst);
                            let actual = self.infer_term(&arg.value);
                            self.ctx.unify(&expected, &actual, arg.value.span, &mut self.errors);
                        } else {
                            self.infer_term(&arg.value);
                        }
                    }
                    let type_args = ctor.type_params.iter().map(|p| inst[p].clone()).collect();
                    Ty::Con(ctor.parent_type, type_args)
                } else {
                    self.check_call(functor, args, term.span);
                    self.ctx.fresh()
                }
            }
            TermKind::Rename(_) => self.ctx.fresh(),
        }
    }
}

fn builtin_expected_tys(ctx: &mut InferContext, name: &str) -> Option<FxHashMap<&'static str, Ty>> {
    let mut map = FxHashMap::default();
    match name {
        "plus" | "minus" | "times" | "band" | "bor" | "bxor" => {
            map.insert("a", Ty::Int);
            map.insert("b", Ty::Int);
            map.insert("c", Ty::Int);
        }
        "bnot" => {
            map.insert("a", Ty::Int);
            map.insert("b", Ty::Int);
        }
        "shl" | "shr" => {
            map.insert("a", Ty::Int);
            map.insert("n", Ty::Int);
            map.insert("c", Ty::Int);
        }
        "greater" => {
            map.insert("a", Ty::Int);
            map.insert("b", Ty::Int);
        }
        "not" => {
            map.insert("goal", Ty::Prop);
        }
        "equal" => {
            let v = ctx.fresh();
            map.insert("a", v.clone());
            map.insert("b", v);
        }
        "send" | "recv" => {
            map.insert("port", Ty::Int);
            map.insert("value", Ty::Int);
        }
        "fill" => {
            map.insert("value", Ty::Int);
            map.insert("count", Ty::Int);
        }
        "loop" => {
            map.insert("n", Ty::Int);
        }
        "again" => {}
        _ => return None,
    }
    Some(map)
}

fn type_expr_to_ty(expr: &cube_syntax::TypeExpr, inst: &FxHashMap<String, Ty>) -> Ty {
    match &expr.kind {
        TypeExprKind::TypeVar(name) => {
            if name == "int" {
                Ty::Int
            } else if let Some(t) = inst.get(name) {
                t.clone()
            } else {
                Ty::Con(name.clone(), vec![])
            }
        }
        TypeExprKind::TypeApp { constructor, args } => Ty::Con(
            constructor.clone(),
            args.iter().map(|(_, a)| type_expr_to_ty(a, inst)).collect(),
        ),
        TypeExprKind::FuncType { params, ret } => Ty::Func(
            params.iter().map(|(_, p)| type_expr_to_ty(p, inst)).collect(),
            Box::new(type_expr_to_ty(ret, inst)),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cube_syntax::{parse, tokenize};
    use f18a_isa::RomTable;

    fn resolve_source(src: &str) -> ResolvedProgram {
        let (tokens, _) = tokenize(src);
        let parsed = parse(tokens).expect("parse should succeed");
        let diagnosed = crate::resolver::resolve(parsed, RomTable::default(), 408);
        assert!(diagnosed.errors.is_empty(), "resolve errors: {:?}", diagnosed.errors);
        diagnosed.value
    }

    #[test]
    fn equal_unifies_its_two_operands() {
        let resolved = resolve_source("x = 1 /\\ equal { a = x, b = x }");
        let result = check(&resolved);
        assert!(result.structural_errors.is_empty());
        assert!(result.type_errors.is_empty());
    }

    #[test]
    fn greater_missing_operand_is_a_structural_error() {
        let resolved = resolve_source("greater { a = 1 }");
        let result = check(&resolved);
        assert_eq!(result.structural_errors.len(), 1);
    }

    #[test]
    fn not_expects_a_proposition_typed_goal() {
        let resolved = resolve_source("g = lambda { } . equal { a = 1, b = 1 } /\\ not { goal = g }");
        let result = check(&resolved);
        assert!(result.structural_errors.is_empty());
        assert!(result.type_errors.is_empty());
    }

    #[test]
    fn constructor_field_mismatch_is_a_type_error() {
        let resolved = resolve_source(
            "Pair = Lambda { } . Mk { left : int, right : int }\n\
             v = Mk { left = 1, right = \"oops\" }",
        );
        let result = check(&resolved);
        assert!(result.structural_errors.is_empty());
        assert_eq!(result.type_errors.len(), 1);
    }
}
