//! Walks a resolved, type-checked program and drives the [`CodeBuilder`]
//! (spec.md §4.7). One [`emit`] call lowers one node's worth of program —
//! the same `ResolvedProgram` scope the resolver already narrowed to a
//! single `node_coord`. A caller compiling a multi-node source file invokes
//! this once per `__node` segment.

use cube_resolve::{PredicateRef, ResolvedProgram, ResolvedSymbol, SymbolTable};

use crate::alloc::AllocationPlan;
use cube_syntax::{
    ast::Conjunction, Application, ArgBinding, CompileError, Diagnosed, Item, ItemKind, Pos, Term,
    TermKind, Unification, Warning,
};
use f18a_isa::opcode;
use rustc_hash::FxHashMap;

use crate::builder::{CodeBuilder, JumpTarget, SourceMapEntry};
use crate::error::EmitError;
use crate::varmap::VariableMap;

/// A compiled node image, ready for the interpreter to load (spec.md §3,
/// §6). `mem` entries are already XOR-encoded; `None` marks a trailing
/// unused RAM slot, distinct from a stored zero word.
#[derive(Debug, Clone)]
pub struct CompiledNode {
    pub coord: u16,
    pub mem: [Option<u32>; 64],
    pub len: u16,
    pub a: Option<u32>,
    pub b: Option<u32>,
    pub p: Option<u32>,
    pub io: Option<u32>,
    pub symbols: FxHashMap<String, u16>,
    pub source_map: Vec<SourceMapEntry>,
}

pub fn emit(resolved: &ResolvedProgram, warn_on_code_budget: bool) -> Diagnosed<CompiledNode> {
    let plan = AllocationPlan::from_resolved(resolved.node_coord);
    let mut e = Emitter::new(&resolved.symbols);
    e.varmap.allocate_all(resolved.variables.iter());
    e.builder.label(ENTRY_LABEL);
    e.current_begin = ENTRY_LABEL.to_string();
    e.emit_conjunction(&resolved.program.top);
    e.emit_halt();

    let mut emit_errors = Vec::new();
    e.builder.resolve_forward_refs(&mut emit_errors);
    for err in emit_errors {
        match err {
            EmitError::UnresolvedLabel { name } => e.warnings.push(Warning::new(
                Pos::default(),
                format!("unresolved label `{name}`"),
            )),
            other => e.errors.push(CompileError::new(Pos::default(), other.to_string())),
        }
    }

    let built = e.builder.build();
    let overflow_limit = 64u16;
    let warn_limit = 56u16;
    let used = e.varmap.used() as u16;
    if built.max_addr > overflow_limit {
        e.errors.push(CompileError::new(
            Pos::default(),
            format!("compiled code length {} exceeds node RAM capacity {overflow_limit}", built.max_addr),
        ));
    } else if warn_on_code_budget
        && (built.max_addr > warn_limit || built.len.saturating_add(used) > overflow_limit)
    {
        e.warnings.push(Warning::new(
            Pos::default(),
            format!("compiled code length {} is close to node RAM capacity {overflow_limit}", built.len),
        ));
    }

    let node = CompiledNode {
        coord: plan.node_coord,
        mem: built.mem,
        len: built.len,
        a: e.a,
        b: e.b,
        p: e.p,
        io: e.io,
        symbols: built.labels,
        source_map: built.source_map,
    };

    if e.errors.is_empty() {
        Diagnosed { value: node, errors: e.errors, warnings: e.warnings }
    } else {
        Diagnosed {
            value: CompiledNode {
                coord: plan.node_coord,
                mem: [None; 64],
                len: 0,
                a: None,
                b: None,
                p: None,
                io: None,
                symbols: FxHashMap::default(),
                source_map: Vec::new(),
            },
            errors: e.errors,
            warnings: e.warnings,
        }
    }
}

const ENTRY_LABEL: &str = "__entry";

struct Emitter<'a> {
    symbols: &'a SymbolTable,
    varmap: VariableMap,
    builder: CodeBuilder,
    errors: Vec<CompileError>,
    warnings: Vec<Warning>,
    fail_label: Option<String>,
    current_begin: String,
    label_seq: u32,
    a: Option<u32>,
    b: Option<u32>,
    p: Option<u32>,
    io: Option<u32>,
    last_was_unconditional_jump: bool,
}

impl<'a> Emitter<'a> {
    fn new(symbols: &'a SymbolTable) -> Self {
        Self {
            symbols,
            varmap: VariableMap::new(),
            builder: CodeBuilder::new(),
            errors: Vec::new(),
            warnings: Vec::new(),
            fail_label: None,
            current_begin: ENTRY_LABEL.to_string(),
            label_seq: 0,
            a: None,
            b: None,
            p: None,
            io: None,
            last_was_unconditional_jump: false,
        }
    }

    fn diag(&mut self, message: impl Into<String>) {
        self.errors.push(CompileError::new(Pos::default(), message.into()));
    }

    fn fresh_label(&mut self, prefix: &str) -> String {
        self.label_seq += 1;
        format!("__{prefix}{}", self.label_seq)
    }

    fn op(&self, clean_name: &str) -> u8 {
        opcode::by_clean_name(clean_name)
            .unwrap_or_else(|| panic!("unknown opcode name `{clean_name}`"))
            .number
    }

    fn emit_named_op(&mut self, clean_name: &str) {
        let number = self.op(clean_name);
        self.builder.emit_op(number);
        self.last_was_unconditional_jump = false;
    }

    /// spec.md §4.7's halt discipline: close with a self-jump rather than
    /// letting the final word fall through to an implicit `;`, which would
    /// send P to an uninitialized return-stack value.
    fn emit_halt(&mut self) {
        if self.last_was_unconditional_jump {
            return;
        }
        self.builder.flush_with_jump();
        let here = self.builder.here();
        self.builder.emit_jump(self.op("jump"), JumpTarget::Addr(here));
        self.last_was_unconditional_jump = true;
    }

    fn emit_conjunction(&mut self, items: &Conjunction) {
        for item in items {
            self.emit_item(item);
        }
    }

    fn emit_item(&mut self, item: &Item) {
        match &item.kind {
            ItemKind::Application(app) => self.emit_application(item.span.line, item.span.col, app),
            ItemKind::Unification(u) => {
                self.builder.record_source(item.span.line as u32, item.span.col as u32, None);
                self.emit_unification(u);
            }
            ItemKind::PredicateDef(_) | ItemKind::TypeDef(_) => {
                // Declarations only; the resolver already registered them.
            }
        }
    }

    fn emit_application(&mut self, line: u32, col: u32, app: &Application) {
        if app.functor == Application::NODE_DIRECTIVE {
            self.apply_node_directive(app);
            return;
        }
        if app.functor == Application::INCLUDE_DIRECTIVE {
            return;
        }
        self.builder.record_source(line, col, None);
        match self.symbols.get(&app.functor).cloned() {
            None => self.diag(format!("undefined symbol `{}`", app.functor)),
            Some(ResolvedSymbol::Builtin { .. }) => self.emit_builtin(&app.functor.clone(), app),
            Some(ResolvedSymbol::F18aOp { opcode }) => self.emit_f18a_op(opcode, app),
            Some(ResolvedSymbol::RomFunc { address }) => {
                let call_op = self.op("call");
                self.builder.emit_jump(call_op, JumpTarget::Addr(address));
                self.last_was_unconditional_jump = false;
            }
            Some(ResolvedSymbol::UserPred { params, def }) => {
                self.emit_user_pred_call(&params, &def, &app.args);
            }
            Some(ResolvedSymbol::Constructor { .. }) => {
                // A bare constructor application in statement position has
                // no observable effect (nothing consumes its value); the
                // side-effecting forms are inside a Unification or as a
                // nested call argument.
            }
        }
    }

    fn apply_node_directive(&mut self, app: &Application) {
        for (name, slot) in [("a", 0), ("b", 1), ("p", 2), ("io", 3)] {
            if let Some(arg) = app.arg(name) {
                if let TermKind::Literal(n) = &arg.value.kind {
                    match slot {
                        0 => self.a = Some(*n as u32),
                        1 => self.b = Some(*n as u32),
                        2 => self.p = Some(*n as u32),
                        _ => self.io = Some(*n as u32),
                    }
                }
            }
        }
    }

    // --- operand loading -------------------------------------------------

    fn push_literal(&mut self, n: i64) {
        self.builder.emit_literal(n);
    }

    /// Load the value at `addr` onto the data stack: set `A` to `addr`
    /// (via a literal load and `a!`), then `@` fetches `mem[A]` and pushes.
    fn push_var(&mut self, addr: u16) {
        self.push_literal(addr as i64);
        self.emit_named_op("astore");
        self.emit_named_op("fetch");
    }

    /// Pop the top of the data stack and store it at `addr`. Assumes the
    /// value to store is already pushed; pushes `addr`, moves it into `A`,
    /// then `!` stores the value underneath.
    fn pop_store_var(&mut self, addr: u16) {
        self.push_literal(addr as i64);
        self.emit_named_op("astore");
        self.emit_named_op("store");
    }

    fn push_operand(&mut self, term: &Term) {
        match &term.kind {
            TermKind::Literal(n) => self.push_literal(*n),
            TermKind::StringLiteral(_) => {
                self.diag("string literals cannot be used as a numeric operand");
                self.push_literal(0);
            }
            TermKind::Var(name) => {
                if let Some(ResolvedSymbol::Constructor { tag, .. }) = self.symbols.get(name) {
                    self.push_literal(*tag as i64);
                } else if let Some(addr) = self.varmap.get(name) {
                    self.push_var(addr);
                } else {
                    self.diag(format!("`{name}` is not a known variable"));
                    self.push_literal(0);
                }
            }
            TermKind::AppTerm { functor, args } => {
                match self.symbols.get(functor).cloned() {
                    Some(ResolvedSymbol::Constructor { tag, tag_bits, fields, .. }) => {
                        self.emit_constructor_construct(tag, tag_bits, &fields, args);
                    }
                    _ => {
                        self.diag(format!("`{functor}` cannot be used as a value operand"));
                        self.push_literal(0);
                    }
                }
            }
            TermKind::Rename(_) => {
                self.diag("rename terms cannot be used as a numeric operand");
                self.push_literal(0);
            }
        }
    }

    fn require_var_addr(&mut self, term: &Term, context: &str) -> Option<u16> {
        match &term.kind {
            TermKind::Var(name) => match self.varmap.get(name) {
                Some(addr) => Some(addr),
                None => {
                    self.diag(format!("`{name}` has no allocated RAM slot"));
                    None
                }
            },
            _ => {
                self.diag(format!("{context} requires a variable destination"));
                None
            }
        }
    }

    fn store_into(&mut self, term: &Term, context: &str) {
        match self.require_var_addr(term, context) {
            Some(addr) => self.pop_store_var(addr),
            None => self.emit_named_op("drop"),
        }
    }

    // --- constructors ------------------------------------------------------

    /// Builds a fresh constructor value and leaves it on the stack: nullary
    /// variants are just their tag; others allocate a contiguous field
    /// block and pack `(base << tagBits) | tag` (spec.md §4.7 "Constructor
    /// application"). There's no hardware OR (opcode 22's `or` mnemonic is
    /// actually XOR, per the ISA's quirk), but `base`'s low `tagBits` bits
    /// are always zero right after the shift, so `+` composes it with
    /// `tag` exactly like OR would.
    fn emit_constructor_construct(
        &mut self,
        tag: u32,
        tag_bits: u32,
        field_names: &[String],
        args: &[ArgBinding],
    ) {
        if field_names.is_empty() {
            self.push_literal(tag as i64);
            return;
        }
        let base = self.varmap.allocate_fields(field_names.len() as u16);
        for (i, fname) in field_names.iter().enumerate() {
            if let Some(arg) = args.iter().find(|a| &a.name == fname) {
                self.push_operand(&arg.value);
                self.pop_store_var(base + i as u16);
            }
        }
        self.push_literal(base as i64);
        self.push_literal(tag_bits as i64);
        self.emit_named_op("shl");
        self.push_literal(tag as i64);
        self.emit_named_op("add");
    }

    /// `variable = Ctor{field=...}`: pattern-match rather than construct
    /// (spec.md §4.7 "Unification"). Extracts the stored tag, compares it
    /// against the expected one, and on mismatch jumps to the current fail
    /// label; on match, recovers the field block's base address and loads
    /// each bound field.
    fn emit_pattern_match(
        &mut self,
        dest_addr: u16,
        tag: u32,
        tag_bits: u32,
        field_names: &[String],
        args: &[ArgBinding],
    ) {
        self.push_var(dest_addr);
        if tag_bits > 0 {
            let mask = (1u32 << tag_bits) - 1;
            self.push_literal(mask as i64);
            self.emit_named_op("and");
        }
        self.push_literal(tag as i64);
        self.emit_named_op("xor");

        let ok_label = self.fresh_label("ctor_ok");
        let fail_target = self.fail_label.clone().unwrap_or_else(|| self.current_begin.clone());
        let if_op = self.op("IF");
        let jump_op = self.op("jump");
        self.builder.emit_jump(if_op, JumpTarget::Label(ok_label.clone()));
        self.builder.emit_jump(jump_op, JumpTarget::Label(fail_target));
        self.last_was_unconditional_jump = false;
        self.builder.label(ok_label);

        if tag_bits > 0 {
            self.push_var(dest_addr);
            self.push_literal(tag_bits as i64);
            self.emit_named_op("shr");
            let base_scratch = self.varmap.allocate_fields(1);
            self.pop_store_var(base_scratch);
            for (i, fname) in field_names.iter().enumerate() {
                if let Some(arg) = args.iter().find(|a| &a.name == fname) {
                    if let TermKind::Var(bind_name) = &arg.value.kind {
                        if let Some(field_addr) = self.varmap.get(bind_name) {
                            self.push_var(base_scratch);
                            self.push_literal(i as i64);
                            self.emit_named_op("add");
                            self.emit_named_op("astore");
                            self.emit_named_op("fetch");
                            self.pop_store_var(field_addr);
                        }
                    }
                }
            }
        }
    }

    // --- unification -------------------------------------------------------

    fn emit_unification(&mut self, u: &Unification) {
        let Some(addr) = self.varmap.get(&u.variable) else {
            self.diag(format!("`{}` has no allocated RAM slot", u.variable));
            return;
        };
        match &u.term.kind {
            TermKind::Literal(n) => {
                self.push_literal(*n);
                self.pop_store_var(addr);
            }
            TermKind::Var(name) => {
                if let Some(ResolvedSymbol::Constructor { tag, .. }) = self.symbols.get(name) {
                    self.push_literal(*tag as i64);
                    self.pop_store_var(addr);
                } else if let Some(src_addr) = self.varmap.get(name) {
                    self.push_var(src_addr);
                    self.pop_store_var(addr);
                } else {
                    self.diag(format!("`{name}` is not a known variable"));
                }
            }
            TermKind::AppTerm { functor, args } => match self.symbols.get(functor).cloned() {
                Some(ResolvedSymbol::Constructor { tag, tag_bits, fields, .. }) => {
                    self.emit_pattern_match(addr, tag, tag_bits, &fields, args);
                }
                _ => {
                    self.diag(format!("`{functor}` is not a constructor pattern"));
                }
            },
            TermKind::StringLiteral(_) | TermKind::Rename(_) => {
                self.diag("unsupported right-hand side in unification");
            }
        }
    }

    // --- builtins ------------------------------------------------------------

    fn emit_builtin(&mut self, name: &str, app: &Application) {
        match name {
            "label" => self.emit_label_directive(app),
            "lit.hex18" => self.emit_lit_hex18(app),
            "plus" => self.emit_binary_arith(app, "add"),
            "band" => self.emit_binary_arith(app, "and"),
            "bxor" => self.emit_binary_arith(app, "xor"),
            "bor" => self.emit_bor(app),
            "bnot" => self.emit_bnot(app),
            "shl" => self.emit_shift(app, "shl"),
            "shr" => self.emit_shift(app, "shr"),
            "minus" => self.emit_minus(app),
            "times" => self.emit_times(app),
            "equal" => self.emit_equal(app),
            "greater" => self.emit_greater_recipe(app),
            "not" => {
                // No-op: negation needs suspension semantics this toolchain
                // doesn't implement yet.
            }
            "send" => self.emit_send(app),
            "recv" => self.emit_recv(app),
            "fill" => self.emit_fill(app),
            "loop" => self.emit_loop(app),
            "again" => self.emit_again(),
            other => self.diag(format!("no code recipe for builtin `{other}`")),
        }
    }

    fn emit_label_directive(&mut self, app: &Application) {
        match app.arg("name").map(|a| &a.value.kind) {
            Some(TermKind::Var(n)) => {
                self.builder.label(n.clone());
            }
            _ => self.diag("`label` requires a bare name argument"),
        }
    }

    fn emit_lit_hex18(&mut self, app: &Application) {
        match app.arg("value").map(|a| a.value.kind.clone()) {
            Some(TermKind::Literal(n)) => self.push_literal_raw(n),
            _ => self.diag("`lit.hex18` requires a literal `value`"),
        }
    }

    fn push_literal_raw(&mut self, n: i64) {
        self.builder.emit_literal(n);
    }

    fn emit_binary_arith(&mut self, app: &Application, op_name: &str) {
        let (Some(a), Some(b), Some(c)) = (app.arg("a"), app.arg("b"), app.arg("c")) else {
            self.diag(format!("`{}` is missing an operand", app.functor));
            return;
        };
        self.push_operand(&a.value.clone());
        self.push_operand(&b.value.clone());
        self.emit_named_op(op_name);
        self.store_into(&c.value.clone(), &app.functor);
    }

    /// No hardware OR exists on this ISA (opcode 22's real behavior is
    /// XOR). `a | b == (a xor b) + (a and b)`: xor's set bits and and's set
    /// bits never overlap, so addition reconstructs OR exactly.
    fn emit_bor(&mut self, app: &Application) {
        let (Some(a), Some(b), Some(c)) = (app.arg("a"), app.arg("b"), app.arg("c")) else {
            self.diag("`bor` is missing an operand");
            return;
        };
        let (a, b, c) = (a.value.clone(), b.value.clone(), c.value.clone());
        self.push_operand(&a);
        self.push_operand(&b);
        self.emit_named_op("xor");
        let xor_scratch = self.varmap.allocate_fields(1);
        self.pop_store_var(xor_scratch);
        self.push_operand(&a);
        self.push_operand(&b);
        self.emit_named_op("and");
        self.push_var(xor_scratch);
        self.emit_named_op("add");
        self.store_into(&c, "bor");
    }

    fn emit_bnot(&mut self, app: &Application) {
        let (Some(a), Some(b)) = (app.arg("a"), app.arg("b")) else {
            self.diag("`bnot` is missing an operand");
            return;
        };
        let (a, b) = (a.value.clone(), b.value.clone());
        self.push_operand(&a);
        self.emit_named_op("not");
        self.store_into(&b, "bnot");
    }

    /// `shl`/`shr{a,n,c}`: the ISA only has single-bit `2*`/`2/`, so a
    /// variable shift amount repeats the single-bit op `n` times, counted
    /// down through `R` with `next`.
    fn emit_shift(&mut self, app: &Application, op_name: &str) {
        let (Some(a), Some(n), Some(c)) = (app.arg("a"), app.arg("n"), app.arg("c")) else {
            self.diag(format!("`{}` is missing an operand", app.functor));
            return;
        };
        let (a, n, c) = (a.value.clone(), n.value.clone(), c.value.clone());
        self.push_operand(&a);
        self.push_operand(&n);
        self.emit_named_op("push");
        let loop_label = self.fresh_label("shift_loop");
        self.builder.label(loop_label.clone());
        self.emit_named_op(op_name);
        let next_op = self.op("next");
        self.builder.emit_jump(next_op, JumpTarget::Label(loop_label));
        self.last_was_unconditional_jump = false;
        self.store_into(&c, &app.functor);
    }

    /// `a + (~b + 1)`: two's-complement subtraction built from `not`+`add`
    /// since there is no dedicated subtract opcode.
    fn emit_minus(&mut self, app: &Application) {
        let (Some(a), Some(b), Some(c)) = (app.arg("a"), app.arg("b"), app.arg("c")) else {
            self.diag("`minus` is missing an operand");
            return;
        };
        let (a, b, c) = (a.value.clone(), b.value.clone(), c.value.clone());
        self.push_operand(&a);
        self.push_operand(&b);
        self.emit_named_op("not");
        self.push_literal(1);
        self.emit_named_op("add");
        self.emit_named_op("add");
        self.store_into(&c, "minus");
    }

    /// 17-iteration shift-add multiply (spec.md §4.7): `A` holds the
    /// multiplicand, the accumulator/multiplier pair rides in `T`/`S`
    /// across repeated `+*` steps, `R` counts the iterations down.
    fn emit_times(&mut self, app: &Application) {
        let (Some(a), Some(b), Some(c)) = (app.arg("a"), app.arg("b"), app.arg("c")) else {
            self.diag("`times` is missing an operand");
            return;
        };
        let (a, b, c) = (a.value.clone(), b.value.clone(), c.value.clone());
        self.push_operand(&a);
        self.emit_named_op("astore");
        self.push_literal(0);
        self.push_operand(&b);
        self.push_literal(16);
        self.emit_named_op("push");
        let loop_label = self.fresh_label("times_loop");
        self.builder.label(loop_label.clone());
        self.emit_named_op("mulstep");
        let next_op = self.op("next");
        self.builder.emit_jump(next_op, JumpTarget::Label(loop_label));
        self.last_was_unconditional_jump = false;
        self.emit_named_op("drop");
        self.store_into(&c, "times");
    }

    /// Copies whichever side is resolvable onto the other (spec.md §4.7:
    /// "copy a known side to the unknown side"). When both sides are
    /// already variables, `a` is treated as the destination.
    fn emit_equal(&mut self, app: &Application) {
        let (Some(a), Some(b)) = (app.arg("a"), app.arg("b")) else {
            self.diag("`equal` is missing an operand");
            return;
        };
        let (a, b) = (a.value.clone(), b.value.clone());
        if let TermKind::Var(name) = &a.kind {
            if let Some(addr) = self.varmap.get(name) {
                self.push_operand(&b);
                self.pop_store_var(addr);
                return;
            }
        }
        if let TermKind::Var(name) = &b.kind {
            if let Some(addr) = self.varmap.get(name) {
                self.push_operand(&a);
                self.pop_store_var(addr);
                return;
            }
        }
        // Both sides are already concrete values; nothing to bind at
        // compile time.
    }

    fn emit_greater_recipe(&mut self, app: &Application) {
        let (Some(a), Some(b)) = (app.arg("a"), app.arg("b")) else {
            self.diag("`greater` is missing an operand");
            return;
        };
        let (a, b) = (a.value.clone(), b.value.clone());
        self.emit_greater(&a, &b);
    }

    /// Leaves `a - b`'s sign in `T`; callers discriminate on it externally
    /// with `-if` (spec.md §4.7).
    fn emit_greater(&mut self, a: &Term, b: &Term) {
        self.push_operand(a);
        self.push_operand(b);
        self.emit_named_op("not");
        self.push_literal(1);
        self.emit_named_op("add");
        self.emit_named_op("add");
    }

    fn emit_send(&mut self, app: &Application) {
        let (Some(port), Some(value)) = (app.arg("port"), app.arg("value")) else {
            self.diag("`send` is missing an operand");
            return;
        };
        let (port, value) = (port.value.clone(), value.value.clone());
        self.push_operand(&value);
        self.push_operand(&port);
        self.emit_named_op("astore");
        self.emit_named_op("storeb");
    }

    fn emit_recv(&mut self, app: &Application) {
        let (Some(port), Some(value)) = (app.arg("port"), app.arg("value")) else {
            self.diag("`recv` is missing an operand");
            return;
        };
        let (port, value) = (port.value.clone(), value.value.clone());
        self.push_operand(&port);
        self.emit_named_op("astore");
        self.emit_named_op("fetchb");
        self.store_into(&value, "recv");
    }

    /// Streams `value` into the port addressed by `B` `count` times
    /// (spec.md §4.7: "`@p`/`!b` and a counted `next` loop").
    fn emit_fill(&mut self, app: &Application) {
        let (Some(value), Some(count)) = (app.arg("value"), app.arg("count")) else {
            self.diag("`fill` is missing an operand");
            return;
        };
        let (value, count) = (value.value.clone(), count.value.clone());
        self.push_operand(&count);
        self.emit_named_op("push");
        let loop_label = self.fresh_label("fill_loop");
        self.builder.label(loop_label.clone());
        self.push_operand(&value);
        self.emit_named_op("storeb");
        let next_op = self.op("next");
        self.builder.emit_jump(next_op, JumpTarget::Label(loop_label));
        self.last_was_unconditional_jump = false;
    }

    fn emit_loop(&mut self, app: &Application) {
        let Some(n) = app.arg("n") else {
            self.diag("`loop` is missing its `n` operand");
            return;
        };
        let n = n.value.clone();
        self.push_operand(&n);
        self.emit_named_op("push");
        let loop_label = self.fresh_label("loop");
        self.builder.label(loop_label.clone());
        self.emit_named_op("nop");
        let next_op = self.op("next");
        self.builder.emit_jump(next_op, JumpTarget::Label(loop_label));
        self.last_was_unconditional_jump = false;
    }

    fn emit_again(&mut self) {
        let target = self.current_begin.clone();
        let jump_op = self.op("jump");
        self.builder.emit_jump(jump_op, JumpTarget::Label(target));
        self.last_was_unconditional_jump = true;
    }

    fn emit_f18a_op(&mut self, opcode_num: u8, app: &Application) {
        if let Some(addr_arg) = app.arg("addr") {
            let target = self.resolve_jump_target(&addr_arg.value.clone());
            self.builder.emit_jump(opcode_num, target);
            self.last_was_unconditional_jump = opcode_num == self.op("jump");
        } else {
            self.builder.emit_op(opcode_num);
            self.last_was_unconditional_jump = false;
        }
    }

    fn resolve_jump_target(&mut self, term: &Term) -> JumpTarget {
        match &term.kind {
            TermKind::Literal(n) => JumpTarget::Addr(*n as u16),
            TermKind::Var(name) => JumpTarget::Label(name.clone()),
            _ => {
                self.diag("jump target must be a literal address or a label name");
                JumpTarget::Addr(0)
            }
        }
    }

    // --- user predicates -----------------------------------------------------

    fn emit_user_pred_call(&mut self, params: &[String], def: &PredicateRef, call_args: &[ArgBinding]) {
        let param_addrs: Vec<Option<u16>> = params.iter().map(|p| self.varmap.get(p)).collect();
        for arg in call_args {
            if let Some(idx) = params.iter().position(|p| p == &arg.name) {
                if let Some(addr) = param_addrs[idx] {
                    self.push_operand(&arg.value.clone());
                    self.pop_store_var(addr);
                }
            }
        }
        if def.clauses.len() == 1 {
            let begin = self.fresh_label("pred_begin");
            self.builder.label(begin.clone());
            let saved_begin = std::mem::replace(&mut self.current_begin, begin);
            self.emit_conjunction(&def.clauses[0]);
            self.current_begin = saved_begin;
        } else {
            self.emit_multi_clause(params, &param_addrs, &def.clauses);
        }
    }

    fn emit_multi_clause(&mut self, params: &[String], param_addrs: &[Option<u16>], clauses: &[Conjunction]) {
        let base = self.fresh_label("pred");
        let clause_labels: Vec<String> =
            (0..clauses.len()).map(|i| format!("{base}_clause{i}")).collect();
        let fail_label = format!("{base}_fail");
        let end_label = format!("{base}_end");

        for (i, clause) in clauses.iter().enumerate() {
            self.builder.label(clause_labels[i].clone());
            let next_label = if i + 1 < clauses.len() {
                clause_labels[i + 1].clone()
            } else {
                fail_label.clone()
            };
            if let Some(disc) = find_discriminant(clause, params, self.symbols) {
                self.emit_discriminant_test(&disc, param_addrs, &next_label);
            }
            let saved_fail = self.fail_label.replace(next_label);
            let saved_begin = std::mem::replace(&mut self.current_begin, clause_labels[i].clone());
            self.emit_conjunction(clause);
            self.current_begin = saved_begin;
            self.fail_label = saved_fail;
            if i + 1 < clauses.len() {
                let jump_op = self.op("jump");
                self.builder.emit_jump(jump_op, JumpTarget::Label(end_label.clone()));
                self.last_was_unconditional_jump = true;
            }
        }

        self.builder.label(fail_label.clone());
        let jump_op = self.op("jump");
        self.builder.emit_jump(jump_op, JumpTarget::Label(fail_label));
        self.last_was_unconditional_jump = true;
        self.builder.label(end_label);
    }

    fn emit_discriminant_test(&mut self, disc: &Discriminant, param_addrs: &[Option<u16>], next_label: &str) {
        let ok_label = self.fresh_label("disc_ok");
        match disc {
            Discriminant::ParamEqualsLiteral { param_index, literal } => {
                let Some(addr) = param_addrs[*param_index] else { return };
                self.push_var(addr);
                self.push_literal(*literal);
                self.emit_named_op("xor");
            }
            Discriminant::ParamEqualsCtor { param_index, tag, tag_bits } => {
                let Some(addr) = param_addrs[*param_index] else { return };
                self.push_var(addr);
                if *tag_bits > 0 {
                    let mask = (1u32 << tag_bits) - 1;
                    self.push_literal(mask as i64);
                    self.emit_named_op("and");
                }
                self.push_literal(*tag as i64);
                self.emit_named_op("xor");
            }
            Discriminant::Guard { a, b } => {
                self.emit_greater(a, b);
            }
        }
        let if_op = self.op("IF");
        let jump_op = self.op("jump");
        self.builder.emit_jump(if_op, JumpTarget::Label(ok_label.clone()));
        self.builder.emit_jump(jump_op, JumpTarget::Label(next_label.to_string()));
        self.last_was_unconditional_jump = false;
        self.builder.label(ok_label);
    }
}

enum Discriminant {
    ParamEqualsLiteral { param_index: usize, literal: i64 },
    ParamEqualsCtor { param_index: usize, tag: u32, tag_bits: u32 },
    Guard { a: Term, b: Term },
}

/// spec.md §4.7 "Multi-clause predicates": the first candidate of a
/// parameter-literal unification, a parameter-constructor-pattern
/// unification, a parameter bound to a nullary constructor, or a `greater`
/// guard. Clauses with none of these are catch-alls.
fn find_discriminant(clause: &Conjunction, params: &[String], symbols: &SymbolTable) -> Option<Discriminant> {
    for item in clause {
        match &item.kind {
            ItemKind::Unification(u) => {
                let Some(param_index) = params.iter().position(|p| p == &u.variable) else {
                    continue;
                };
                match &u.term.kind {
                    TermKind::Literal(n) => {
                        return Some(Discriminant::ParamEqualsLiteral { param_index, literal: *n });
                    }
                    TermKind::Var(name) => {
                        if let Some(ResolvedSymbol::Constructor { tag, .. }) = symbols.get(name) {
                            return Some(Discriminant::ParamEqualsLiteral {
                                param_index,
                                literal: *tag as i64,
                            });
                        }
                    }
                    TermKind::AppTerm { functor, .. } => {
                        if let Some(ResolvedSymbol::Constructor { tag, tag_bits, .. }) = symbols.get(functor) {
                            return Some(Discriminant::ParamEqualsCtor {
                                param_index,
                                tag: *tag,
                                tag_bits: *tag_bits,
                            });
                        }
                    }
                    _ => {}
                }
            }
            ItemKind::Application(app) if app.functor == "greater" => {
                if let (Some(a), Some(b)) = (app.arg("a"), app.arg("b")) {
                    return Some(Discriminant::Guard { a: a.value.clone(), b: b.value.clone() });
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use cube_resolve::resolve;
    use cube_syntax::{parse, tokenize};
    use f18a_isa::{xor_load, RomTable, SlotAddr};

    fn compile(src: &str) -> Diagnosed<CompiledNode> {
        let (tokens, _) = tokenize(src);
        let program = parse(tokens).expect("parse should succeed");
        let resolved = resolve(program, RomTable::default(), 408);
        assert!(resolved.errors.is_empty(), "resolve errors: {:?}", resolved.errors);
        emit(&resolved.value, true)
    }

    #[test]
    fn bare_node_directive_sets_boot_registers() {
        let d = compile("node 112 { a = 0x175, b = 0x1D5 } /\\ f18a.dup");
        assert!(d.errors.is_empty(), "unexpected errors: {:?}", d.errors);
        assert_eq!(d.value.coord, 112);
        assert_eq!(d.value.a, Some(0x175));
        assert_eq!(d.value.b, Some(0x1D5));
    }

    #[test]
    fn fetch_storeb_jump_label_packs_into_a_single_word() {
        let d = compile(
            "node 112 { a = 0x175, b = 0x1D5 } /\\ f18a.fetch /\\ f18a.storeb /\\ f18a.jump { addr = go } /\\ label { name = go }",
        );
        assert!(d.errors.is_empty(), "unexpected errors: {:?}", d.errors);
        assert_eq!(d.value.coord, 112);
        assert_eq!(d.value.a, Some(0x175));
        assert_eq!(d.value.b, Some(0x1D5));
        assert_eq!(d.value.len, 1);
    }

    #[test]
    fn lit_hex18_masks_to_eighteen_bits() {
        let d = compile("lit.hex18 { value = 0x40000 }");
        assert!(d.errors.is_empty());
        let second = xor_load(d.value.mem[1].unwrap());
        assert_eq!(second, 0);
    }

    #[test]
    fn addressed_jump_encodes_literal_target() {
        let d = compile("f18a.jump { addr = 0x10 }");
        assert!(d.errors.is_empty());
        let w = xor_load(d.value.mem[0].unwrap());
        let decoded = f18a_isa::decode_slot(w, SlotAddr::Slot0);
        assert_eq!(decoded.opcode, 2);
        assert_eq!(decoded.field, 0x10);
    }

    #[test]
    fn label_then_jump_back_resolves_to_its_own_address() {
        let d = compile("label { name = loop } /\\ f18a.dup /\\ f18a.jump { addr = loop }");
        assert!(d.errors.is_empty(), "unexpected errors: {:?}", d.errors);
        assert_eq!(d.value.symbols.get("loop"), Some(&0));
    }

    #[test]
    fn literal_assignment_to_a_variable_compiles_without_error() {
        let d = compile("x = 42");
        assert!(d.errors.is_empty(), "unexpected errors: {:?}", d.errors);
        assert!(d.value.len > 0);
    }

    #[test]
    fn undefined_functor_in_body_does_not_panic_the_emitter() {
        // Resolution alone would already flag this; the emitter is not
        // expected to run on an already-errored program, but must not
        // panic if handed one directly.
        let (tokens, _) = tokenize("nope { a = 1 }");
        let program = parse(tokens).unwrap();
        let resolved = resolve(program, RomTable::default(), 408);
        let d = emit(&resolved.value, true);
        assert!(!d.errors.is_empty());
    }
}
