//! Hindley-Milner types and the union-find substitution backing
//! unification (spec.md §4.4, §9).
//!
//! `InferContext` owns the fresh type-variable counter and substitution
//! map as plain fields, rather than the process-global counter the
//! original used (spec.md §9's open design note asks for exactly this in
//! a systems implementation) — each `cube::compile()` call gets its own
//! context, so concurrent or repeated compilations in one process never
//! share inference state.

use cube_syntax::Span;
use rustc_hash::FxHashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeVarId(pub u32);

#[derive(Debug, Clone, PartialEq)]
pub enum Ty {
    Var(TypeVarId),
    /// The 18-bit machine integer every built-in arithmetic/bitwise op
    /// operates over.
    Int,
    /// `o`, the proposition type `not{goal}` expects.
    Prop,
    /// A string literal's type; no built-in operates on it, but it still
    /// needs a type to participate in unification without special-casing.
    Str,
    /// A user-defined type applied to its (possibly still-unresolved)
    /// type-parameter arguments, e.g. `Option<Int>`.
    Con(String, Vec<Ty>),
    Func(Vec<Ty>, Box<Ty>),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TypeError {
    #[error("type mismatch at {}:{}: expected {expected}, found {found}", span.line, span.col)]
    Mismatch {
        expected: String,
        found: String,
        span: Span,
    },
    #[error("occurs-check failure at {}:{}: type variable occurs in itself via {ty}", span.line, span.col)]
    OccursCheck { ty: String, span: Span },
}

#[derive(Debug, Default)]
pub struct InferContext {
    next_var: u32,
    subst: FxHashMap<TypeVarId, Ty>,
}

impl InferContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fresh(&mut self) -> Ty {
        let id = TypeVarId(self.next_var);
        self.next_var += 1;
        Ty::Var(id)
    }

    /// Follow the substitution chain until it bottoms out at a
    /// non-variable or an unbound variable, rewriting nested `Con`/`Func`
    /// arguments along the way.
    pub fn resolve(&self, ty: &Ty) -> Ty {
        match ty {
            Ty::Var(id) => match self.subst.get(id) {
                Some(bound) => self.resolve(bound),
                None => ty.clone(),
            },
            Ty::Con(name, args) => {
                Ty::Con(name.clone(), args.iter().map(|a| self.resolve(a)).collect())
            }
            Ty::Func(params, ret) => Ty::Func(
                params.iter().map(|p| self.resolve(p)).collect(),
                Box::new(self.resolve(ret)),
            ),
            other => other.clone(),
        }
    }

    fn occurs(&self, var: TypeVarId, ty: &Ty) -> bool {
        match self.resolve(ty) {
            Ty::Var(id) => id == var,
            Ty::Con(_, args) => args.iter().any(|a| self.occurs(var, a)),
            Ty::Func(params, ret) => {
                params.iter().any(|p| self.occurs(var, p)) || self.occurs(var, &ret)
            }
            _ => false,
        }
    }

    /// Unify `a` and `b`, recording a diagnostic (not a panic) on mismatch
    /// or occurs-check failure, so the caller can keep collecting errors
    /// from the rest of the program.
    pub fn unify(&mut self, a: &Ty, b: &Ty, span: Span, errors: &mut Vec<TypeError>) {
        let a = self.resolve(a);
        let b = self.resolve(b);
        match (&a, &b) {
            (Ty::Var(x), Ty::Var(y)) if x == y => {}
            (Ty::Var(x), other) | (other, Ty::Var(x)) => {
                if self.occurs(*x, other) {
                    errors.push(TypeError::OccursCheck {
                        ty: format!("{other:?}"),
                        span,
                    });
                    return;
                }
                self.subst.insert(*x, other.clone());
            }
            (Ty::Int, Ty::Int) | (Ty::Prop, Ty::Prop) | (Ty::Str, Ty::Str) => {}
            (Ty::Con(n1, a1), Ty::Con(n2, a2)) if n1 == n2 && a1.len() == a2.len() => {
                for (x, y) in a1.iter().zip(a2.iter()) {
                    self.unify(x, y, span, errors);
                }
            }
            (Ty::Func(p1, r1), Ty::Func(p2, r2)) if p1.len() == p2.len() => {
                for (x, y) in p1.iter().zip(p2.iter()) {
                    self.unify(x, y, span, errors);
                }
                self.unify(r1, r2, span, errors);
            }
            _ => {
                errors.push(TypeError::Mismatch {
                    expected: format!("{a:?}"),
                    found: format!("{b:?}"),
                    span,
                });
            }
        }
    }
}

/// Only used by tests to assert against a stable textual type shape
/// without exposing `Debug`'s exact formatting as part of the public API.
#[cfg(test)]
pub(crate) fn pretty(ctx: &InferContext, ty: &Ty) -> String {
    match ctx.resolve(ty) {
        Ty::Var(id) => format!("?{}", id.0),
        Ty::Int => "Int".to_string(),
        Ty::Prop => "Prop".to_string(),
        Ty::Str => "Str".to_string(),
        Ty::Con(name, args) if args.is_empty() => name,
        Ty::Con(name, args) => {
            let parts: Vec<String> = args.iter().map(|a| pretty(ctx, a)).collect();
            format!("{name}<{}>", parts.join(","))
        }
        Ty::Func(params, ret) => {
            let parts: Vec<String> = params.iter().map(|p| pretty(ctx, p)).collect();
            format!("({}) -> {}", parts.join(","), pretty(ctx, &ret))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unify_two_fresh_vars_then_pins_to_int() {
        let mut ctx = InferContext::new();
        let mut errors = Vec::new();
        let a = ctx.fresh();
        let b = ctx.fresh();
        let span = Span::default();
        ctx.unify(&a, &b, span, &mut errors);
        ctx.unify(&a, &Ty::Int, span, &mut errors);
        assert!(errors.is_empty());
        assert_eq!(pretty(&ctx, &b), "Int");
    }

    #[test]
    fn mismatch_is_recorded_not_panicked() {
        let mut ctx = InferContext::new();
        let mut errors = Vec::new();
        ctx.unify(&Ty::Int, &Ty::Prop, Span::default(), &mut errors);
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], TypeError::Mismatch { .. }));
    }

    #[test]
    fn occurs_check_rejects_self_referential_binding() {
        let mut ctx = InferContext::new();
        let mut errors = Vec::new();
        let a = ctx.fresh();
        let wrapped = Ty::Con("Box".to_string(), vec![a.clone()]);
        ctx.unify(&a, &wrapped, Span::default(), &mut errors);
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], TypeError::OccursCheck { .. }));
    }

    #[test]
    fn constructor_args_unify_structurally() {
        let mut ctx = InferContext::new();
        let mut errors = Vec::new();
        let a = ctx.fresh();
        let lhs = Ty::Con("Option".to_string(), vec![a]);
        let rhs = Ty::Con("Option".to_string(), vec![Ty::Int]);
        ctx.unify(&lhs, &rhs, Span::default(), &mut errors);
        assert!(errors.is_empty());
    }
}
