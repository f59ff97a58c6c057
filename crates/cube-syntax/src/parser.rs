//! Recursive-descent parser for CUBE (spec.md §4.2).
//!
//! Structured the way the teacher's `raya_parser::parser::Parser` is: a
//! flat token buffer plus a cursor, an `errors` accumulator instead of
//! bailing on the first mistake, and a recursion-depth guard so a
//! pathological input can't blow the stack.
//!
//! Grammar notes:
//! - `ident "=" "lambda" ...` is a predicate definition; `ident "="` not
//!   followed by `lambda` is a unification. The two-token lookahead past
//!   the identifier (`=`, then `lambda` or not) resolves it with no
//!   backtracking.
//! - `TypeIdent "=" ...` is always a type definition; `ident "{" ...`
//!   (braced, no leading `=`) is always an application; a bare `ident`
//!   with neither `=` nor `{` following is a zero-arg application.
//! - A top-level conjunction doesn't require `/\` between items: a new
//!   `node` directive, `TypeIdent =`, or `ident = lambda` can simply
//!   follow the previous item (multi-node programs separate blocks this
//!   way instead of with `/\`). Inside the *unparenthesized* body of a
//!   predicate definition, this cuts the other way: the parser must stop
//!   consuming `/\` as soon as what follows it would start one of those
//!   same three top-level shapes, so a bare single-clause body doesn't
//!   swallow a sibling definition.

use crate::ast::{
    Application, ArgBinding, CubeProgram, FieldDecl, Item, ItemKind, ParamDecl, PredicateDef,
    RenameBinding, Term, TermKind, TypeDef, TypeExpr, TypeExprKind, Unification, VariantDef,
};
use crate::token::{Span, Token};

const MAX_DEPTH: usize = 128;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("unexpected {found} at {}:{}, expected {expected}", span.line, span.col)]
    Unexpected {
        found: String,
        expected: String,
        span: Span,
    },
    #[error("recursion limit exceeded at {}:{}", span.line, span.col)]
    TooDeep { span: Span },
}

pub struct Parser {
    tokens: Vec<(Token, Span)>,
    pos: usize,
    errors: Vec<ParseError>,
    depth: usize,
}

/// Parse a full program out of a token stream (as produced by
/// `crate::lexer::tokenize`). Never panics on malformed input; parse
/// errors accumulate and are returned alongside a best-effort partial
/// program.
pub fn parse(tokens: Vec<(Token, Span)>) -> Result<CubeProgram, Vec<ParseError>> {
    let mut parser = Parser::new(tokens);
    let top = parser.parse_conjunction(false);
    if !parser.check(&Token::Eof) {
        let (found, span) = parser.describe_current();
        parser.errors.push(ParseError::Unexpected {
            found,
            expected: "end of file".to_string(),
            span,
        });
    }
    if parser.errors.is_empty() {
        Ok(CubeProgram { top })
    } else {
        Err(parser.errors)
    }
}

impl Parser {
    fn new(tokens: Vec<(Token, Span)>) -> Self {
        Self {
            tokens,
            pos: 0,
            errors: Vec::new(),
            depth: 0,
        }
    }

    fn current(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)].0
    }

    fn current_span(&self) -> Span {
        self.tokens[self.pos.min(self.tokens.len() - 1)].1
    }

    fn describe_current(&self) -> (String, Span) {
        (self.current().describe(), self.current_span())
    }

    /// Token `offset` positions ahead of the cursor (0 = current).
    fn peek(&self, offset: usize) -> &Token {
        let idx = (self.pos + offset).min(self.tokens.len() - 1);
        &self.tokens[idx].0
    }

    fn advance(&mut self) -> (Token, Span) {
        let item = self.tokens[self.pos.min(self.tokens.len() - 1)].clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        item
    }

    fn check(&self, tok: &Token) -> bool {
        self.current() == tok
    }

    fn error(&mut self, expected: impl Into<String>) {
        let (found, span) = self.describe_current();
        self.errors.push(ParseError::Unexpected {
            found,
            expected: expected.into(),
            span,
        });
    }

    /// Consume `tok` if present, else record an error and leave the
    /// cursor where it is (the caller's recovery loop decides what to
    /// skip).
    fn expect(&mut self, tok: &Token, expected: &str) -> Span {
        if self.check(tok) {
            self.advance().1
        } else {
            self.error(expected);
            self.current_span()
        }
    }

    fn enter_depth(&mut self) -> bool {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            let span = self.current_span();
            self.errors.push(ParseError::TooDeep { span });
            self.depth -= 1;
            return false;
        }
        true
    }

    fn exit_depth(&mut self) {
        self.depth -= 1;
    }

    fn combine_spans(a: Span, b: Span) -> Span {
        Span::new(a.start, b.end, a.line, a.col)
    }

    fn ident_name(&mut self) -> Option<(String, Span)> {
        match self.current().clone() {
            Token::Ident(name) => {
                let span = self.advance().1;
                Some((name, span))
            }
            _ => {
                self.error("identifier");
                None
            }
        }
    }

    fn type_ident_name(&mut self) -> Option<(String, Span)> {
        match self.current().clone() {
            Token::TypeIdent(name) => {
                let span = self.advance().1;
                Some((name, span))
            }
            _ => {
                self.error("type identifier");
                None
            }
        }
    }

    /// Whether the token at `self.pos + offset` could begin a new item —
    /// used both to decide whether to keep looping in a conjunction and,
    /// past a `/\`, whether to stop consuming it.
    fn starts_item_at(&self, offset: usize) -> bool {
        matches!(
            self.peek(offset),
            Token::Node | Token::Include(_) | Token::TypeIdent(_) | Token::Ident(_)
        )
    }

    /// Whether the three tokens starting at `offset` spell `node`,
    /// `TypeIdent =`, or `ident = lambda` — the three top-level shapes a
    /// bare predicate body must not swallow across a `/\`.
    fn starts_toplevel_def_at(&self, offset: usize) -> bool {
        match self.peek(offset) {
            Token::Node => true,
            Token::TypeIdent(_) => matches!(self.peek(offset + 1), Token::Equal),
            Token::Ident(_) => {
                matches!(self.peek(offset + 1), Token::Equal)
                    && matches!(self.peek(offset + 2), Token::Lambda)
            }
            _ => false,
        }
    }

    /// A conjunction of items. Items may be joined by `/\` or simply
    /// juxtaposed (spec.md §4.2). When `truncate` is set (inside an
    /// unparenthesized predicate body), a `/\` is left unconsumed if what
    /// follows it would start a new top-level definition.
    fn parse_conjunction(&mut self, truncate: bool) -> Vec<Item> {
        let mut items = Vec::new();
        if !self.enter_depth() {
            return items;
        }
        loop {
            if !self.starts_item_at(0) {
                break;
            }
            let before = self.pos;
            if let Some(item) = self.parse_item() {
                items.push(item);
            }
            if self.pos == before {
                self.advance();
            }
            if self.check(&Token::Conj) {
                if truncate && self.starts_toplevel_def_at(1) {
                    break;
                }
                self.advance();
                continue;
            }
            if self.starts_item_at(0) {
                continue;
            }
            break;
        }
        self.exit_depth();
        items
    }

    /// A disjunction of conjunctions joined by `\/`, used inside
    /// parenthesized predicate bodies.
    fn parse_disjunction(&mut self) -> Vec<Vec<Item>> {
        let mut clauses = vec![self.parse_conjunction(false)];
        while self.check(&Token::Disj) {
            self.advance();
            clauses.push(self.parse_conjunction(false));
        }
        clauses
    }

    fn parse_item(&mut self) -> Option<Item> {
        match self.current().clone() {
            Token::Node => self.parse_node_directive(),
            Token::Include(name) => {
                let span = self.advance().1;
                Some(Item {
                    span,
                    kind: ItemKind::Application(Application {
                        functor: Application::INCLUDE_DIRECTIVE.to_string(),
                        functor_span: span,
                        args: vec![ArgBinding {
                            name: "module".to_string(),
                            name_span: span,
                            value: Term {
                                span,
                                kind: TermKind::Var(name),
                            },
                        }],
                    }),
                })
            }
            Token::TypeIdent(_) => self.parse_type_def(),
            Token::Ident(_) => self.parse_ident_led_item(),
            _ => {
                self.error("an item (predicate definition, type definition, application, unification, `node`, or `#include`)");
                None
            }
        }
    }

    fn parse_node_directive(&mut self) -> Option<Item> {
        let start = self.advance().1; // `node`
        let coord_span = self.current_span();
        let coord = match self.current().clone() {
            Token::IntLit(n) => {
                self.advance();
                n
            }
            _ => {
                self.error("integer literal (node coordinate)");
                0
            }
        };
        let mut args = vec![ArgBinding {
            name: "coord".to_string(),
            name_span: coord_span,
            value: Term {
                span: coord_span,
                kind: TermKind::Literal(coord),
            },
        }];

        let mut end = coord_span;
        if self.check(&Token::LBrace) {
            self.advance();
            while !self.check(&Token::RBrace) && !self.check(&Token::Eof) {
                if let Some(binding) = self.parse_arg_binding() {
                    args.push(binding);
                }
                if self.check(&Token::Comma) {
                    self.advance();
                } else {
                    break;
                }
            }
            end = self.expect(&Token::RBrace, "`}`");
        }

        Some(Item {
            span: Self::combine_spans(start, end),
            kind: ItemKind::Application(Application {
                functor: Application::NODE_DIRECTIVE.to_string(),
                functor_span: start,
                args,
            }),
        })
    }

    /// Disambiguates `PredicateDef` / `Unification` (both `ident "="`)
    /// from `Application` (`ident "{"` or bare `ident`).
    fn parse_ident_led_item(&mut self) -> Option<Item> {
        if matches!(self.peek(1), Token::Equal) {
            return if matches!(self.peek(2), Token::Lambda) {
                self.parse_predicate_def()
            } else {
                self.parse_unification()
            };
        }
        self.parse_application()
    }

    fn parse_unification(&mut self) -> Option<Item> {
        let (name, name_span) = self.ident_name()?;
        self.expect(&Token::Equal, "`=`");
        let term = self.parse_term()?;
        let span = Self::combine_spans(name_span, term.span);
        Some(Item {
            span,
            kind: ItemKind::Unification(Unification {
                variable: name,
                variable_span: name_span,
                term,
            }),
        })
    }

    /// `name "{" (argBinding ("," argBinding)*)? "}"` or bare `name`
    /// (zero-arg).
    fn parse_application(&mut self) -> Option<Item> {
        let (name, name_span) = self.ident_name()?;
        if !self.check(&Token::LBrace) {
            return Some(Item {
                span: name_span,
                kind: ItemKind::Application(Application {
                    functor: name,
                    functor_span: name_span,
                    args: Vec::new(),
                }),
            });
        }
        self.advance();
        let mut args = Vec::new();
        while !self.check(&Token::RBrace) && !self.check(&Token::Eof) {
            if let Some(binding) = self.parse_arg_binding() {
                args.push(binding);
            }
            if self.check(&Token::Comma) {
                self.advance();
            } else {
                break;
            }
        }
        let end = self.expect(&Token::RBrace, "`}`");
        Some(Item {
            span: Self::combine_spans(name_span, end),
            kind: ItemKind::Application(Application {
                functor: name,
                functor_span: name_span,
                args,
            }),
        })
    }

    /// `name "=" "lambda" "{" paramList "}" "." body`.
    fn parse_predicate_def(&mut self) -> Option<Item> {
        let (name, name_span) = self.ident_name()?;
        self.expect(&Token::Equal, "`=`");
        self.expect(&Token::Lambda, "`lambda`");
        self.expect(&Token::LBrace, "`{`");
        let mut params = Vec::new();
        while !self.check(&Token::RBrace) && !self.check(&Token::Eof) {
            if let Some((p, span)) = self.ident_name() {
                params.push(ParamDecl { name: p, span });
            } else {
                break;
            }
            if self.check(&Token::Comma) {
                self.advance();
            } else {
                break;
            }
        }
        self.expect(&Token::RBrace, "`}`");
        self.expect(&Token::Dot, "`.`");
        let clauses = self.parse_predicate_body();
        let end_span = clauses
            .last()
            .and_then(|c| c.last())
            .map(|i| i.span)
            .unwrap_or(name_span);
        Some(Item {
            span: Self::combine_spans(name_span, end_span),
            kind: ItemKind::PredicateDef(PredicateDef {
                name,
                params,
                clauses,
            }),
        })
    }

    /// A predicate's body: a parenthesized disjunction of clauses, or a
    /// single bare (disjunction-truncated) conjunction.
    fn parse_predicate_body(&mut self) -> Vec<Vec<Item>> {
        if self.check(&Token::LParen) {
            self.advance();
            let clauses = self.parse_disjunction();
            self.expect(&Token::RParen, "`)`");
            clauses
        } else {
            vec![self.parse_conjunction(true)]
        }
    }

    fn parse_arg_binding(&mut self) -> Option<ArgBinding> {
        let (name, name_span) = self.ident_name()?;
        self.expect(&Token::Equal, "`=`");
        let value = self.parse_term()?;
        Some(ArgBinding {
            name,
            name_span,
            value,
        })
    }

    fn parse_term(&mut self) -> Option<Term> {
        if !self.enter_depth() {
            return None;
        }
        let result = match self.current().clone() {
            Token::IntLit(n) => {
                let span = self.advance().1;
                Some(Term {
                    span,
                    kind: TermKind::Literal(n),
                })
            }
            Token::StringLit(s) => {
                let span = self.advance().1;
                Some(Term {
                    span,
                    kind: TermKind::StringLiteral(s),
                })
            }
            Token::LBrace => self.parse_rename_term(),
            Token::Ident(_) if matches!(self.peek(1), Token::LBrace) => self.parse_app_term(),
            Token::TypeIdent(_) if matches!(self.peek(1), Token::LBrace) => self.parse_app_term(),
            Token::Ident(name) => {
                let span = self.advance().1;
                Some(Term {
                    span,
                    kind: TermKind::Var(name),
                })
            }
            Token::TypeIdent(name) => {
                let span = self.advance().1;
                Some(Term {
                    span,
                    kind: TermKind::Var(name),
                })
            }
            _ => {
                self.error("a term (variable, literal, string, constructor application, or rename)");
                None
            }
        };
        self.exit_depth();
        result
    }

    fn parse_app_term(&mut self) -> Option<Term> {
        let (functor, functor_span) = match self.current().clone() {
            Token::Ident(n) => (n, self.advance().1),
            Token::TypeIdent(n) => (n, self.advance().1),
            _ => unreachable!("guarded by caller"),
        };
        self.expect(&Token::LBrace, "`{`");
        let mut args = Vec::new();
        while !self.check(&Token::RBrace) && !self.check(&Token::Eof) {
            if let Some(binding) = self.parse_arg_binding() {
                args.push(binding);
            }
            if self.check(&Token::Comma) {
                self.advance();
            } else {
                break;
            }
        }
        let end = self.expect(&Token::RBrace, "`}`");
        Some(Term {
            span: Self::combine_spans(functor_span, end),
            kind: TermKind::AppTerm { functor, args },
        })
    }

    /// `{ to <- from, to2 <- from2, ... }`. A bare `{` in term position is
    /// always a rename (an `AppTerm` is only reached via the
    /// `ident "{"` / `TypeIdent "{"` arms above, which need a functor
    /// first).
    fn parse_rename_term(&mut self) -> Option<Term> {
        let start = self.expect(&Token::LBrace, "`{`");
        let mut bindings = Vec::new();
        while !self.check(&Token::RBrace) && !self.check(&Token::Eof) {
            let to = match self.ident_name() {
                Some((n, _)) => n,
                None => break,
            };
            self.expect(&Token::LArrow, "`<-`");
            let from = match self.ident_name() {
                Some((n, _)) => n,
                None => break,
            };
            bindings.push(RenameBinding { to, from });
            if self.check(&Token::Comma) {
                self.advance();
            } else {
                break;
            }
        }
        let end = self.expect(&Token::RBrace, "`}`");
        Some(Term {
            span: Self::combine_spans(start, end),
            kind: TermKind::Rename(bindings),
        })
    }

    /// `TypeIdent "=" "Lambda" "{" typeParams "}" "." variant ("+" variant)*`.
    fn parse_type_def(&mut self) -> Option<Item> {
        let (name, name_span) = self.type_ident_name()?;
        self.expect(&Token::Equal, "`=`");
        self.expect(&Token::LambdaUpper, "`Lambda`");
        self.expect(&Token::LBrace, "`{`");
        let mut type_params = Vec::new();
        while !self.check(&Token::RBrace) && !self.check(&Token::Eof) {
            if let Some((p, _)) = self.ident_name() {
                type_params.push(p);
            } else {
                break;
            }
            if self.check(&Token::Comma) {
                self.advance();
            } else {
                break;
            }
        }
        self.expect(&Token::RBrace, "`}`");
        self.expect(&Token::Dot, "`.`");

        let mut variants = Vec::new();
        if let Some(first) = self.parse_variant_def() {
            variants.push(first);
        }
        while self.check(&Token::Plus) {
            self.advance();
            if let Some(v) = self.parse_variant_def() {
                variants.push(v);
            }
        }

        let end_span = variants.last().map(|v| v.span).unwrap_or(name_span);
        Some(Item {
            span: Self::combine_spans(name_span, end_span),
            kind: ItemKind::TypeDef(TypeDef {
                name,
                type_params,
                variants,
            }),
        })
    }

    fn parse_variant_def(&mut self) -> Option<VariantDef> {
        let (name, name_span) = self.type_ident_name()?;
        let mut fields = Vec::new();
        let mut end_span = name_span;
        if self.check(&Token::LBrace) {
            self.advance();
            while !self.check(&Token::RBrace) && !self.check(&Token::Eof) {
                if let Some(field) = self.parse_field_decl() {
                    fields.push(field);
                }
                if self.check(&Token::Comma) {
                    self.advance();
                } else {
                    break;
                }
            }
            end_span = self.expect(&Token::RBrace, "`}`");
        }
        Some(VariantDef {
            name,
            span: Self::combine_spans(name_span, end_span),
            fields,
        })
    }

    fn parse_field_decl(&mut self) -> Option<FieldDecl> {
        let (name, _) = self.ident_name()?;
        self.expect(&Token::Colon, "`:`");
        let ty = self.parse_type_expr()?;
        Some(FieldDecl { name, ty })
    }

    fn parse_type_expr(&mut self) -> Option<TypeExpr> {
        if !self.enter_depth() {
            return None;
        }
        let result = match self.current().clone() {
            Token::LParen => self.parse_func_type(),
            Token::TypeIdent(name) => {
                let span = self.advance().1;
                self.parse_type_app_tail(name, span)
            }
            Token::Ident(name) => {
                let span = self.advance().1;
                Some(TypeExpr {
                    span,
                    kind: TypeExprKind::TypeVar(name),
                })
            }
            _ => {
                self.error("a type (type variable, type constructor, or function type)");
                None
            }
        };
        self.exit_depth();
        result
    }

    fn parse_type_app_tail(&mut self, constructor: String, start: Span) -> Option<TypeExpr> {
        let mut args = Vec::new();
        let mut end = start;
        if self.check(&Token::LBrace) {
            self.advance();
            while !self.check(&Token::RBrace) && !self.check(&Token::Eof) {
                if let Some((name, _)) = self.ident_name() {
                    self.expect(&Token::Equal, "`=`");
                    if let Some(ty) = self.parse_type_expr() {
                        args.push((name, ty));
                    }
                } else {
                    break;
                }
                if self.check(&Token::Comma) {
                    self.advance();
                } else {
                    break;
                }
            }
            end = self.expect(&Token::RBrace, "`}`");
        }
        Some(TypeExpr {
            span: Self::combine_spans(start, end),
            kind: TypeExprKind::TypeApp { constructor, args },
        })
    }

    fn parse_func_type(&mut self) -> Option<TypeExpr> {
        let start = self.expect(&Token::LParen, "`(`");
        let mut params = Vec::new();
        while !self.check(&Token::RParen) && !self.check(&Token::Eof) {
            if let Some((name, _)) = self.ident_name() {
                self.expect(&Token::Colon, "`:`");
                if let Some(ty) = self.parse_type_expr() {
                    params.push((name, ty));
                }
            } else {
                break;
            }
            if self.check(&Token::Comma) {
                self.advance();
            } else {
                break;
            }
        }
        self.expect(&Token::RParen, "`)`");
        self.expect(&Token::Arrow, "`->`");
        let ret = self.parse_type_expr()?;
        let span = Self::combine_spans(start, ret.span);
        Some(TypeExpr {
            span,
            kind: TypeExprKind::FuncType {
                params,
                ret: Box::new(ret),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    fn parse_src(src: &str) -> Result<CubeProgram, Vec<ParseError>> {
        let (tokens, lex_errors) = tokenize(src);
        assert!(lex_errors.is_empty(), "unexpected lex errors: {lex_errors:?}");
        parse(tokens)
    }

    #[test]
    fn unification_item() {
        let prog = parse_src("x = 42").unwrap();
        assert_eq!(prog.top.len(), 1);
        match &prog.top[0].kind {
            ItemKind::Unification(u) => {
                assert_eq!(u.variable, "x");
                assert_eq!(u.term.kind, TermKind::Literal(42));
            }
            other => panic!("expected unification, got {other:?}"),
        }
    }

    #[test]
    fn application_with_args() {
        let prog = parse_src("plus { a = x, b = y, c = z }").unwrap();
        match &prog.top[0].kind {
            ItemKind::Application(app) => {
                assert_eq!(app.functor, "plus");
                assert_eq!(app.args.len(), 3);
                assert_eq!(app.arg("a").unwrap().value.kind, TermKind::Var("x".to_string()));
            }
            other => panic!("expected application, got {other:?}"),
        }
    }

    #[test]
    fn bare_zero_arg_application() {
        let prog = parse_src("again").unwrap();
        match &prog.top[0].kind {
            ItemKind::Application(app) => {
                assert_eq!(app.functor, "again");
                assert!(app.args.is_empty());
            }
            other => panic!("expected application, got {other:?}"),
        }
    }

    #[test]
    fn predicate_def_with_bare_body() {
        let prog = parse_src("inc = lambda { a, b } . plus { a = a, b = 1, c = b }").unwrap();
        match &prog.top[0].kind {
            ItemKind::PredicateDef(def) => {
                assert_eq!(def.name, "inc");
                assert_eq!(def.params.len(), 2);
                assert_eq!(def.clauses.len(), 1);
                assert_eq!(def.clauses[0].len(), 1);
            }
            other => panic!("expected predicate def, got {other:?}"),
        }
    }

    #[test]
    fn predicate_def_with_parenthesized_disjunction() {
        let prog = parse_src("choice = lambda { a } . ( a = 1 \\/ a = 2 \\/ a = 3 )").unwrap();
        match &prog.top[0].kind {
            ItemKind::PredicateDef(def) => {
                assert_eq!(def.clauses.len(), 3);
            }
            other => panic!("expected predicate def, got {other:?}"),
        }
    }

    #[test]
    fn bare_predicate_body_does_not_swallow_sibling_predicate_def() {
        // The bare body is exactly `a = 1`; `/\ other = lambda ...` is a
        // sibling top-level definition, not part of `p`'s body.
        let prog = parse_src("p = lambda { a } . a = 1 /\\ other = lambda { b } . b = 2").unwrap();
        assert_eq!(prog.top.len(), 2);
        match (&prog.top[0].kind, &prog.top[1].kind) {
            (ItemKind::PredicateDef(p), ItemKind::PredicateDef(other)) => {
                assert_eq!(p.name, "p");
                assert_eq!(p.clauses[0].len(), 1);
                assert_eq!(other.name, "other");
            }
            other => panic!("expected two predicate defs, got {other:?}"),
        }
    }

    #[test]
    fn bare_predicate_body_does_not_swallow_sibling_node_directive() {
        let prog = parse_src("p = lambda { a } . a = 1 /\\ node 112").unwrap();
        assert_eq!(prog.top.len(), 2);
        assert!(matches!(prog.top[1].kind, ItemKind::Application(ref app) if app.functor == Application::NODE_DIRECTIVE));
    }

    #[test]
    fn conjunction_of_items() {
        let prog = parse_src("x = 1 /\\ y = 2").unwrap();
        assert_eq!(prog.top.len(), 2);
    }

    #[test]
    fn juxtaposed_node_blocks_without_conjunction_operator() {
        let prog = parse_src("node 112 /\\ f18a.dup node 113 /\\ f18a.drop").unwrap();
        assert_eq!(prog.top.len(), 4);
    }

    #[test]
    fn node_directive_with_boot_descriptors() {
        let prog = parse_src("node 112 { a = 0x175, b = 0x1D5 }").unwrap();
        match &prog.top[0].kind {
            ItemKind::Application(app) => {
                assert_eq!(app.functor, Application::NODE_DIRECTIVE);
                assert_eq!(app.arg("coord").unwrap().value.kind, TermKind::Literal(112));
                assert_eq!(app.arg("a").unwrap().value.kind, TermKind::Literal(0x175));
            }
            other => panic!("expected node directive, got {other:?}"),
        }
    }

    #[test]
    fn include_directive() {
        let prog = parse_src("#include stdlib").unwrap();
        match &prog.top[0].kind {
            ItemKind::Application(app) => {
                assert_eq!(app.functor, Application::INCLUDE_DIRECTIVE);
                assert_eq!(
                    app.arg("module").unwrap().value.kind,
                    TermKind::Var("stdlib".to_string())
                );
            }
            other => panic!("expected include directive, got {other:?}"),
        }
    }

    #[test]
    fn rename_term() {
        let prog = parse_src("x = { a <- b, c <- d }").unwrap();
        match &prog.top[0].kind {
            ItemKind::Unification(u) => match &u.term.kind {
                TermKind::Rename(bindings) => {
                    assert_eq!(bindings.len(), 2);
                    assert_eq!(bindings[0].to, "a");
                    assert_eq!(bindings[0].from, "b");
                }
                other => panic!("expected rename term, got {other:?}"),
            },
            other => panic!("expected unification, got {other:?}"),
        }
    }

    #[test]
    fn constructor_app_term() {
        let prog = parse_src("x = Some { value = 7 }").unwrap();
        match &prog.top[0].kind {
            ItemKind::Unification(u) => match &u.term.kind {
                TermKind::AppTerm { functor, args } => {
                    assert_eq!(functor, "Some");
                    assert_eq!(args.len(), 1);
                }
                other => panic!("expected app term, got {other:?}"),
            },
            other => panic!("expected unification, got {other:?}"),
        }
    }

    #[test]
    fn type_def_with_plus_separated_variants() {
        let prog = parse_src("Option = Lambda { t } . None + Some { value : t }").unwrap();
        match &prog.top[0].kind {
            ItemKind::TypeDef(def) => {
                assert_eq!(def.name, "Option");
                assert_eq!(def.type_params, vec!["t".to_string()]);
                assert_eq!(def.variants.len(), 2);
                assert_eq!(def.variants[0].name, "None");
                assert_eq!(def.variants[1].name, "Some");
                assert_eq!(def.variants[1].fields.len(), 1);
            }
            other => panic!("expected type def, got {other:?}"),
        }
    }

    #[test]
    fn function_type_expr() {
        let prog = parse_src("Adder = Lambda { } . Mk { f : (a: int) -> int }").unwrap();
        match &prog.top[0].kind {
            ItemKind::TypeDef(def) => {
                let field = &def.variants[0].fields[0];
                match &field.ty.kind {
                    TypeExprKind::FuncType { params, ret } => {
                        assert_eq!(params.len(), 1);
                        assert_eq!(params[0].0, "a");
                        assert!(matches!(ret.kind, TypeExprKind::TypeVar(_)));
                    }
                    other => panic!("expected function type, got {other:?}"),
                }
            }
            other => panic!("expected type def, got {other:?}"),
        }
    }

    #[test]
    fn malformed_input_recovers_without_panicking() {
        let (tokens, _) = tokenize("x = ");
        let result = parse(tokens);
        assert!(result.is_err());
    }
}
