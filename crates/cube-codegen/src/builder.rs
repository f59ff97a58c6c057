//! The F18A code builder (spec.md §4.6): packs opcodes into 18-bit words
//! slot by slot, tracks labels, and patches forward references once their
//! targets are known.
//!
//! Structured like the teacher's `raya-compiler::ModuleBuilder` /
//! `FunctionBuilder` pair (`module_builder.rs`): a thin stateful emitter
//! with `emit_*` methods and a `patch_*` step for backward-patching jump
//! targets, just at the bit/slot granularity this ISA demands instead of
//! the teacher's byte-oriented bytecode.

use rustc_hash::FxHashMap;

use f18a_isa::{fits_slot3, opcode, pack_word, patch_slot_field, slot3_legal, xor_store, SlotAddr};

use crate::error::EmitError;

/// `.` doesn't fit slot 3 on real hardware (opcode 28 is odd-width), so the
/// builder pads unused non-terminal slots with it but never slot 3.
const NOP: u8 = opcode::OPCODES[28].number;
/// `;` (return). The only opcode that both fits slot 3 and is a reasonable
/// fallthrough when a word is flushed mid-clause.
const RET: u8 = 0;
/// `unext`. Fits slot 3 and, unlike `;`, doesn't transfer control — the
/// filler [`CodeBuilder::flush_with_jump`] uses so a word finalized right
/// before an explicit jump doesn't silently return instead.
const UNEXT: u8 = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JumpTarget {
    Addr(u16),
    Label(String),
}

impl From<&str> for JumpTarget {
    fn from(s: &str) -> Self {
        JumpTarget::Label(s.to_string())
    }
}

#[derive(Debug, Clone)]
struct ForwardRef {
    name: String,
    host_addr: u16,
    slot: SlotAddr,
}

#[derive(Debug, Clone, Copy)]
pub struct SourceMapEntry {
    pub addr: u16,
    pub line: u32,
    pub col: u32,
    pub label: Option<&'static str>,
}

pub struct CodeBuilder {
    words: Vec<u32>,
    cur_slot: usize,
    cur_ops: [u8; 4],
    pending_forward: Option<String>,
    forward_refs: Vec<ForwardRef>,
    labels: FxHashMap<String, u16>,
    max_addr: usize,
    source_map: Vec<SourceMapEntry>,
}

impl Default for CodeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CodeBuilder {
    pub fn new() -> Self {
        Self {
            words: Vec::new(),
            cur_slot: 0,
            cur_ops: [NOP; 4],
            pending_forward: None,
            forward_refs: Vec::new(),
            labels: FxHashMap::default(),
            max_addr: 0,
            source_map: Vec::new(),
        }
    }

    /// Address the next finalized word will land at.
    pub fn here(&self) -> u16 {
        self.words.len() as u16
    }

    /// Pack a 5-bit opcode into the next free slot, flushing and starting
    /// a new word if the current one is full or can't hold it in slot 3.
    ///
    /// If [`Self::add_forward_ref`] was just called, this emission is
    /// treated as the addressed branch it names: the opcode ends the word
    /// (branches consume the rest of their word's bits) and the resulting
    /// slot is recorded for later patching instead of a literal target.
    pub fn emit_op(&mut self, opcode: u8) {
        if let Some(name) = self.pending_forward.take() {
            self.place_branch(opcode, None, Some(name));
            return;
        }
        self.reserve_slot(opcode);
        self.cur_ops[self.cur_slot] = opcode;
        self.cur_slot += 1;
        if self.cur_slot == 4 {
            self.finalize_word();
        }
    }

    fn reserve_slot(&mut self, opcode: u8) {
        if self.cur_slot == 4 {
            self.finalize_word();
        }
        if self.cur_slot == 3 && !slot3_legal(opcode) {
            self.finalize_word();
        }
    }

    /// `@p`, flush, then a raw data word holding `value` (XOR-encoded on
    /// storage like every other word).
    pub fn emit_literal(&mut self, value: i64) {
        self.emit_op(opcode::by_clean_name("fetchp").unwrap().number);
        self.flush();
        self.emit_data(value as u32);
    }

    /// Emit a branch/call/next/if/-if to an already-known target (a
    /// literal address or an already-defined label).
    pub fn emit_jump(&mut self, op: u8, target: JumpTarget) {
        match target {
            JumpTarget::Addr(addr) => self.place_branch(op, Some(addr as u32), None),
            JumpTarget::Label(name) => {
                if let Some(&addr) = self.labels.get(name.as_str()) {
                    self.place_branch(op, Some(addr as u32), None);
                } else {
                    self.place_branch(op, None, Some(name));
                }
            }
        }
    }

    /// The next `emit_op` call is an addressed branch targeting `name`;
    /// its slot is recorded as a forward reference instead of patched now.
    pub fn add_forward_ref(&mut self, name: impl Into<String>) {
        self.pending_forward = Some(name.into());
    }

    fn place_branch(&mut self, op: u8, known_target: Option<u32>, forward_name: Option<String>) {
        if self.cur_slot >= 3 {
            self.finalize_word();
        }
        let slot_idx = self.cur_slot;
        self.cur_ops[slot_idx] = op;
        for s in (slot_idx + 1)..3 {
            self.cur_ops[s] = NOP;
        }
        // Slot 3 can't hold NOP (opcode 28 doesn't fit its 3-bit field), so
        // the filler there has to be `;` instead even though the other
        // padding slots use NOP.
        self.cur_ops[3] = RET;
        let host_addr = self.here();
        if let Some(name) = forward_name {
            self.forward_refs.push(ForwardRef { name, host_addr, slot: SlotAddr::from_index(slot_idx) });
        }
        self.finalize_word();
        if let Some(addr) = known_target {
            let idx = host_addr as usize;
            let logical = xor_store(self.words[idx]);
            let patched = patch_slot_field(logical, SlotAddr::from_index(slot_idx), addr);
            self.words[idx] = xor_store(patched);
        }
    }

    /// Flush, then write a raw 18-bit data word verbatim (masked to 18
    /// bits, XOR'd on storage like every other word).
    pub fn emit_data(&mut self, word: u32) {
        self.flush();
        self.words.push(xor_store(word & 0x3FFFF));
        self.max_addr = self.max_addr.max(self.words.len());
    }

    /// Flush the current word and record `here()` under `name`.
    pub fn label(&mut self, name: impl Into<String>) {
        self.flush();
        self.labels.insert(name.into(), self.here());
    }

    pub fn record_source(&mut self, line: u32, col: u32, label: Option<&'static str>) {
        self.source_map.push(SourceMapEntry { addr: self.here(), line, col, label });
    }

    /// Finalize the in-progress word, padding unused slots with NOP and
    /// packing `;` into an otherwise-unused slot 3 (the only legal,
    /// fallthrough-safe filler for that slot). No-op if nothing is pending.
    pub fn flush(&mut self) {
        if self.cur_slot == 0 {
            return;
        }
        self.pad_and_finalize(RET);
    }

    /// Finalize the in-progress word the same way `flush()` does, except
    /// the slot-3 filler is `unext` rather than `;` — the caller is about
    /// to jump elsewhere, so falling through into an implicit return would
    /// be wrong. Always finalizes, even with nothing pending, so the
    /// caller is guaranteed a fresh word boundary to jump to.
    pub fn flush_with_jump(&mut self) {
        self.pad_and_finalize(UNEXT);
    }

    fn pad_and_finalize(&mut self, slot3_filler: u8) {
        for s in self.cur_slot..3 {
            self.cur_ops[s] = NOP;
        }
        if self.cur_slot <= 3 {
            self.cur_ops[3] = slot3_filler;
        }
        self.cur_slot = 4;
        self.finalize_word();
    }

    fn finalize_word(&mut self) {
        debug_assert!(fits_slot3(self.cur_ops[3]), "slot 3 opcode {} doesn't fit", self.cur_ops[3]);
        let logical = pack_word(self.cur_ops[0], self.cur_ops[1], self.cur_ops[2], self.cur_ops[3]);
        self.words.push(xor_store(logical));
        self.max_addr = self.max_addr.max(self.words.len());
        self.cur_slot = 0;
        self.cur_ops = [NOP; 4];
    }

    /// Patch every recorded forward reference now that every label should
    /// be known; unresolved names become diagnostics.
    pub fn resolve_forward_refs(&mut self, errors: &mut Vec<EmitError>) {
        let refs = std::mem::take(&mut self.forward_refs);
        for r in refs {
            match self.labels.get(&r.name) {
                Some(&addr) => {
                    let idx = r.host_addr as usize;
                    if idx < self.words.len() {
                        let logical = xor_store(self.words[idx]);
                        let patched = patch_slot_field(logical, r.slot, addr as u32);
                        self.words[idx] = xor_store(patched);
                    }
                }
                None => errors.push(EmitError::UnresolvedLabel { name: r.name }),
            }
        }
    }

    pub fn label_addr(&self, name: &str) -> Option<u16> {
        self.labels.get(name).copied()
    }

    /// `{ mem[64], len, maxAddr, labels }` (spec.md §4.6). Trailing unused
    /// slots are `None`, distinct from a stored zero word.
    pub fn build(mut self) -> BuiltCode {
        self.flush();
        let len = self.words.len();
        let mut mem = [None; 64];
        for (i, slot) in mem.iter_mut().enumerate() {
            if i < self.words.len() {
                *slot = Some(self.words[i]);
            }
        }
        BuiltCode {
            mem,
            len: len as u16,
            max_addr: self.max_addr as u16,
            labels: self.labels,
            source_map: self.source_map,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BuiltCode {
    pub mem: [Option<u32>; 64],
    pub len: u16,
    pub max_addr: u16,
    pub labels: FxHashMap<String, u16>,
    pub source_map: Vec<SourceMapEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use f18a_isa::{decode_slot, xor_load};

    fn op(name: &str) -> u8 {
        opcode::by_clean_name(name).unwrap().number
    }

    #[test]
    fn four_ops_fill_exactly_one_word() {
        let mut b = CodeBuilder::new();
        b.emit_op(op("dup"));
        b.emit_op(op("dup"));
        b.emit_op(op("dup"));
        b.emit_op(op("fetchp"));
        let built = b.build();
        assert_eq!(built.len, 1);
        let logical = xor_load(built.mem[0].unwrap());
        assert_eq!(decode_slot(logical, SlotAddr::Slot0).opcode, op("dup"));
        assert_eq!(decode_slot(logical, SlotAddr::Slot3).opcode, op("fetchp"));
    }

    #[test]
    fn branch_in_slot_zero_consumes_the_word() {
        let mut b = CodeBuilder::new();
        b.emit_jump(op("jump"), JumpTarget::Addr(0x10));
        b.emit_op(op("dup"));
        let built = b.build();
        assert_eq!(built.len, 2);
        let first = xor_load(built.mem[0].unwrap());
        let decoded = decode_slot(first, SlotAddr::Slot0);
        assert_eq!(decoded.opcode, op("jump"));
        assert_eq!(decoded.field, 0x10);
    }

    #[test]
    fn branch_refuses_slot_three_and_flushes_first() {
        let mut b = CodeBuilder::new();
        b.emit_op(op("dup"));
        b.emit_op(op("dup"));
        b.emit_op(op("dup"));
        b.emit_jump(op("jump"), JumpTarget::Addr(0x20));
        let built = b.build();
        assert_eq!(built.len, 2);
        let second = xor_load(built.mem[1].unwrap());
        assert_eq!(decode_slot(second, SlotAddr::Slot0).opcode, op("jump"));
    }

    #[test]
    fn label_records_the_current_address() {
        let mut b = CodeBuilder::new();
        b.emit_op(op("dup"));
        b.label("loop");
        b.emit_op(op("drop"));
        assert_eq!(b.label_addr("loop"), Some(1));
    }

    #[test]
    fn forward_reference_patches_after_label_is_known() {
        let mut b = CodeBuilder::new();
        b.add_forward_ref("target");
        b.emit_op(op("jump"));
        b.emit_op(op("dup"));
        b.label("target");
        let mut errors = Vec::new();
        b.resolve_forward_refs(&mut errors);
        assert!(errors.is_empty());
        let built = b.build();
        let first = xor_load(built.mem[0].unwrap());
        let decoded = decode_slot(first, SlotAddr::Slot0);
        assert_eq!(decoded.opcode, op("jump"));
        assert_eq!(decoded.field, 1);
    }

    #[test]
    fn unresolved_forward_reference_is_a_diagnostic() {
        let mut b = CodeBuilder::new();
        b.add_forward_ref("nowhere");
        b.emit_op(op("jump"));
        let mut errors = Vec::new();
        b.resolve_forward_refs(&mut errors);
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn flush_pads_empty_slot_three_with_return() {
        let mut b = CodeBuilder::new();
        b.emit_op(op("dup"));
        b.flush();
        let built = b.build();
        let w = xor_load(built.mem[0].unwrap());
        assert_eq!(decode_slot(w, SlotAddr::Slot3).opcode, op("ret"));
    }

    #[test]
    fn xor_encoding_round_trips_through_storage() {
        let mut b = CodeBuilder::new();
        b.emit_data(0x3FFFF);
        let built = b.build();
        assert_eq!(xor_load(built.mem[0].unwrap()), 0x3FFFF);
    }
}
