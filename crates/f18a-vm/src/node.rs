//! One F18A node: registers, stacks, local memory, and the slot-stepping
//! instruction cycle (spec.md §4.8). The dispatch shape — decode one small
//! unit of work, `match` on its opcode, delegate to a named `op_*`/`execute_*`
//! method — follows `raya-core::vm::interpreter::Vm::execute_function`'s
//! opcode dispatch, generalized from "one bytecode instruction" to "one
//! F18A slot".

use rustc_hash::FxHashSet;
use tracing::trace;

use cube_codegen::CompiledNode;
use f18a_isa::{
    decode_slot, opcode, ports, xor_load, xor_store, PortAddr, SlotAddr, ADDR_MASKS,
    EXTENDED_ARITH_BIT, MULTIPORT_ADDRS, WORD_MASK, XOR_ENCODING,
};

use crate::error::BootError;
use crate::port::{Port, PortOutcome};
use crate::stack::{DataStack, ReturnStack};

pub const RAM_SIZE: usize = 0x40;
pub const ROM_SIZE: usize = 0x40;
pub const ROM_BASE: u32 = 0x80;
pub const COLD_ENTRY: u32 = 0xAA;

/// RAM's boot fill: the XOR-encoded form of `call warm` (spec.md §4.8).
const FILL_WORD: u32 = 0x134A9;

/// The four neighbor ports a node's directional registers resolve to,
/// lent by the [`Chip`](crate::chip::Chip) for the duration of one
/// [`NodeInterpreter::step_slot`] call.
pub struct NeighborPorts<'a> {
    pub right: &'a mut Port,
    pub down: &'a mut Port,
    pub left: &'a mut Port,
    pub up: &'a mut Port,
}

/// What happened during one call to [`NodeInterpreter::step_slot`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepEvent {
    /// The slot executed and the node is ready for its next step.
    Continued,
    /// A port access (or instruction fetch) found no counterparty; the node
    /// is now suspended and will not make progress until a neighbor wakes it.
    Suspended,
    /// Slot 0 was reached at a breakpointed address; the node is suspended
    /// until the driver calls [`NodeInterpreter::resume_from_breakpoint`].
    Breakpoint,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReadOutcome {
    Value(u32),
    Suspend,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriteOutcome {
    Completed,
    Suspend,
}

enum MemOutcome {
    Done,
    Suspended,
}

/// An in-progress memory transaction that blocked on a port. Kept outside
/// the normal slot/fetch state so a wakeup can resume exactly where the
/// node left off instead of re-running an already-completed side effect.
#[derive(Debug, Clone, Copy)]
enum InFlight {
    None,
    /// Waiting on the next instruction word.
    FetchInst { addr: u32 },
    /// Waiting on a value for a memory-fetch opcode (`@p @+ @b @`).
    FetchData { addr: u32 },
    /// Waiting to deliver `value` for a store opcode (`!p !+ !b !`); the
    /// data stack has already been popped, so the value must live here
    /// rather than be re-read on retry.
    Store { addr: u32, value: u32 },
}

/// One F18A node's complete architectural state.
pub struct NodeInterpreter {
    pub coord: u16,
    pub a: u32,
    pub b: u32,
    pub p: u32,
    pub io: u32,
    pub data: DataStack,
    pub ret: ReturnStack,
    ram: [u32; RAM_SIZE],
    rom: [u32; ROM_SIZE],
    i: u32,
    i_xor: u32,
    slot: usize,
    word_addr: u32,
    extended_arith: bool,
    suspended: bool,
    in_flight: InFlight,
    io_port: Port,
    data_port: Port,
    breakpoints: FxHashSet<u32>,
}

impl NodeInterpreter {
    pub fn new(coord: u16) -> Self {
        let mut node = Self {
            coord,
            a: 0,
            b: PortAddr::Io.addr(),
            p: 0,
            io: XOR_ENCODING,
            data: DataStack::new(),
            ret: ReturnStack::new(),
            ram: [FILL_WORD; RAM_SIZE],
            rom: [xor_store(0); ROM_SIZE],
            i: 0,
            i_xor: 0,
            slot: 0,
            word_addr: 0,
            extended_arith: false,
            suspended: false,
            in_flight: InFlight::None,
            io_port: Port::new(),
            data_port: Port::new(),
            breakpoints: FxHashSet::default(),
        };
        node.data.t = XOR_ENCODING;
        node.data.s = XOR_ENCODING;
        node.ret.r = XOR_ENCODING;
        node
    }

    /// Hardware reset (spec.md §4.8 "Boot"). `rom_image` is overlaid at
    /// `0x80..0xC0`; real GA144 ROM bytecode is not reproduced here, so a
    /// caller supplies whatever arithmetic-ROM image it wants resident.
    pub fn reset(&mut self, rom_image: &[u32; ROM_SIZE]) {
        self.a = 0;
        self.b = PortAddr::Io.addr();
        self.data = DataStack::new();
        self.data.t = XOR_ENCODING;
        self.data.s = XOR_ENCODING;
        self.ret = ReturnStack::new();
        self.ret.r = XOR_ENCODING;
        self.io = XOR_ENCODING;
        self.ram = [FILL_WORD; RAM_SIZE];
        self.rom = *rom_image;
        self.p = 0;
        self.slot = 0;
        self.word_addr = 0;
        self.i = 0;
        self.i_xor = 0;
        self.extended_arith = false;
        self.suspended = false;
        self.in_flight = InFlight::FetchInst { addr: self.p };
    }

    /// Cold-boot entry point (spec.md §4.8, `resetP()`).
    pub fn reset_p(&mut self) {
        self.p = COLD_ENTRY;
        self.in_flight = InFlight::FetchInst { addr: self.p };
    }

    /// Loads a compiled node image's RAM contents and boot descriptors
    /// (spec.md §6) on top of an already-reset node, then primes the first
    /// instruction fetch.
    pub fn load(&mut self, image: &CompiledNode) -> Result<(), BootError> {
        if image.len as usize > RAM_SIZE {
            return Err(BootError::ImageTooLarge { coord: image.coord, len: image.len });
        }
        for (addr, slot) in image.mem.iter().enumerate() {
            if let Some(word) = slot {
                self.ram[addr] = *word;
            }
        }
        if let Some(a) = image.a {
            self.a = a;
        }
        if let Some(b) = image.b {
            self.b = b;
        }
        if let Some(p) = image.p {
            self.p = p;
        }
        if let Some(io) = image.io {
            self.io = io;
        }
        self.in_flight = InFlight::FetchInst { addr: self.p };
        Ok(())
    }

    pub fn add_breakpoint(&mut self, addr: u32) {
        self.breakpoints.insert(addr);
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended
    }

    pub fn resume_from_breakpoint(&mut self) {
        self.suspended = false;
    }

    /// Advances the node by exactly one slot (spec.md §5: "each node
    /// advances by one slot, not one full instruction word"). Does nothing
    /// useful if called while [`Self::is_suspended`] is true for a reason
    /// other than a pending port transfer — callers should check first.
    pub fn step_slot(&mut self, node_index: usize, neighbors: &mut NeighborPorts) -> StepEvent {
        if !matches!(self.in_flight, InFlight::None) {
            return self.resume_in_flight(node_index, neighbors);
        }

        let decode = decode_slot(self.i_xor, SlotAddr::from_index(self.slot));
        if decode.opcode <= 7 {
            let repeat = self.execute_branch(SlotAddr::from_index(self.slot), decode.opcode, decode.field);
            if repeat {
                self.slot = 0;
                StepEvent::Continued
            } else {
                self.fetch_next_word(node_index, neighbors)
            }
        } else if decode.opcode <= 15 {
            match self.execute_memory(decode.opcode, node_index, neighbors) {
                MemOutcome::Done => self.advance_slot(node_index, neighbors),
                MemOutcome::Suspended => {
                    self.suspended = true;
                    trace!(coord = self.coord, p = self.p, "node suspended on port access");
                    StepEvent::Suspended
                }
            }
        } else {
            self.execute_alu(decode.opcode);
            self.advance_slot(node_index, neighbors)
        }
    }

    fn resume_in_flight(&mut self, node_index: usize, neighbors: &mut NeighborPorts) -> StepEvent {
        match self.in_flight {
            InFlight::None => unreachable!("resume_in_flight called with nothing in flight"),
            InFlight::FetchInst { addr } => match self.read_mem(addr, node_index, neighbors) {
                ReadOutcome::Value(word) => {
                    self.in_flight = InFlight::None;
                    self.suspended = false;
                    trace!(coord = self.coord, addr, "node woke on instruction fetch");
                    self.complete_instruction_fetch(addr, word)
                }
                ReadOutcome::Suspend => StepEvent::Suspended,
            },
            InFlight::FetchData { addr } => match self.read_mem(addr, node_index, neighbors) {
                ReadOutcome::Value(v) => {
                    self.in_flight = InFlight::None;
                    self.suspended = false;
                    trace!(coord = self.coord, addr, "node woke on data fetch");
                    self.data.push(v);
                    self.advance_slot(node_index, neighbors)
                }
                ReadOutcome::Suspend => StepEvent::Suspended,
            },
            InFlight::Store { addr, value } => match self.write_mem(addr, value, node_index, neighbors) {
                WriteOutcome::Completed => {
                    self.in_flight = InFlight::None;
                    self.suspended = false;
                    trace!(coord = self.coord, addr, "node woke on store completion");
                    self.advance_slot(node_index, neighbors)
                }
                WriteOutcome::Suspend => StepEvent::Suspended,
            },
        }
    }

    fn advance_slot(&mut self, node_index: usize, neighbors: &mut NeighborPorts) -> StepEvent {
        if self.slot == 3 {
            self.fetch_next_word(node_index, neighbors)
        } else {
            self.slot += 1;
            StepEvent::Continued
        }
    }

    fn fetch_next_word(&mut self, node_index: usize, neighbors: &mut NeighborPorts) -> StepEvent {
        let addr = self.p;
        self.p = incr_p(self.p);
        match self.read_mem(addr, node_index, neighbors) {
            ReadOutcome::Value(word) => self.complete_instruction_fetch(addr, word),
            ReadOutcome::Suspend => {
                self.in_flight = InFlight::FetchInst { addr };
                self.suspended = true;
                trace!(coord = self.coord, addr, "node suspended on instruction fetch");
                StepEvent::Suspended
            }
        }
    }

    fn complete_instruction_fetch(&mut self, addr: u32, raw_word: u32) -> StepEvent {
        self.word_addr = addr;
        self.i = raw_word;
        self.i_xor = xor_load(raw_word);
        self.slot = 0;
        if self.breakpoints.contains(&addr) {
            self.suspended = true;
            trace!(coord = self.coord, addr, "breakpoint hit");
            StepEvent::Breakpoint
        } else {
            StepEvent::Continued
        }
    }

    // ---- control flow (opcodes 0-7) -----------------------------------

    /// Executes a branch-family opcode. Returns `true` when the *same*
    /// instruction word should execute again from slot 0 without a new
    /// fetch (only `unext` with `R != 0` does this); otherwise the caller
    /// fetches the next word regardless of whether the branch was taken,
    /// since a branch opcode always consumes the rest of its word
    /// (spec.md §8, "every jump/call/if/-if/next consumes all slots from
    /// its own to the end of the word").
    fn execute_branch(&mut self, slot: SlotAddr, op: u8, field: u32) -> bool {
        match op {
            0 => {
                // ;
                let target = self.ret.r;
                self.ret.pop();
                self.p = target;
                false
            }
            1 => {
                // ex
                std::mem::swap(&mut self.p, &mut self.ret.r);
                false
            }
            2 => {
                // jump
                self.branch_to(slot, field, true);
                false
            }
            3 => {
                // call
                self.ret.push(self.p);
                self.branch_to(slot, field, true);
                false
            }
            4 => {
                // unext
                if self.ret.r == 0 {
                    self.ret.pop();
                    false
                } else {
                    self.ret.r -= 1;
                    true
                }
            }
            5 => {
                // next
                if self.ret.r == 0 {
                    self.ret.pop();
                } else {
                    self.ret.r -= 1;
                    self.branch_to(slot, field, false);
                }
                false
            }
            6 => {
                // if
                if self.data.t == 0 {
                    self.branch_to(slot, field, false);
                }
                false
            }
            7 => {
                // -if: taken when T is non-negative (bit 17 clear)
                if self.data.t & 0x20000 == 0 {
                    self.branch_to(slot, field, false);
                }
                false
            }
            _ => unreachable!("opcode {op} is not a branch"),
        }
    }

    fn branch_to(&mut self, slot: SlotAddr, field: u32, track_extended_arith: bool) {
        let mask = ADDR_MASKS[slot.index()];
        self.p = field | (self.p & !mask);
        if track_extended_arith {
            self.extended_arith = field & EXTENDED_ARITH_BIT != 0;
        }
    }

    // ---- memory (opcodes 8-15) -----------------------------------------

    fn execute_memory(&mut self, op: u8, node_index: usize, neighbors: &mut NeighborPorts) -> MemOutcome {
        match op {
            8 => {
                // @p
                let addr = self.p;
                self.p = incr_p(self.p);
                self.issue_fetch(addr, node_index, neighbors)
            }
            9 => {
                // @+
                let addr = self.a;
                self.a = (self.a + 1) & WORD_MASK;
                self.issue_fetch(addr, node_index, neighbors)
            }
            10 => self.issue_fetch(self.b, node_index, neighbors), // @b
            11 => self.issue_fetch(self.a, node_index, neighbors), // @
            12 => {
                // !p
                let addr = self.p;
                self.p = incr_p(self.p);
                let value = self.data.pop();
                self.issue_store(addr, value, node_index, neighbors)
            }
            13 => {
                // !+
                let addr = self.a;
                self.a = (self.a + 1) & WORD_MASK;
                let value = self.data.pop();
                self.issue_store(addr, value, node_index, neighbors)
            }
            14 => {
                // !b
                let value = self.data.pop();
                self.issue_store(self.b, value, node_index, neighbors)
            }
            15 => {
                // !
                let value = self.data.pop();
                self.issue_store(self.a, value, node_index, neighbors)
            }
            _ => unreachable!("opcode {op} is not a memory op"),
        }
    }

    fn issue_fetch(&mut self, addr: u32, node_index: usize, neighbors: &mut NeighborPorts) -> MemOutcome {
        match self.read_mem(addr, node_index, neighbors) {
            ReadOutcome::Value(v) => {
                self.data.push(v);
                MemOutcome::Done
            }
            ReadOutcome::Suspend => {
                self.in_flight = InFlight::FetchData { addr };
                MemOutcome::Suspended
            }
        }
    }

    fn issue_store(&mut self, addr: u32, value: u32, node_index: usize, neighbors: &mut NeighborPorts) -> MemOutcome {
        match self.write_mem(addr, value, node_index, neighbors) {
            WriteOutcome::Completed => MemOutcome::Done,
            WriteOutcome::Suspend => {
                self.in_flight = InFlight::Store { addr, value };
                MemOutcome::Suspended
            }
        }
    }

    fn read_mem(&mut self, addr: u32, node_index: usize, neighbors: &mut NeighborPorts) -> ReadOutcome {
        if ports::is_port_addr(addr) {
            self.read_port(addr, node_index, neighbors)
        } else {
            ReadOutcome::Value(self.region_read(addr))
        }
    }

    fn write_mem(&mut self, addr: u32, value: u32, node_index: usize, neighbors: &mut NeighborPorts) -> WriteOutcome {
        if ports::is_port_addr(addr) {
            self.write_port(addr, value, node_index, neighbors)
        } else {
            self.region_write(addr, value);
            WriteOutcome::Completed
        }
    }

    fn read_port(&mut self, addr: u32, node_index: usize, neighbors: &mut NeighborPorts) -> ReadOutcome {
        if let Some(single) = PortAddr::from_addr(addr) {
            let outcome = match single {
                PortAddr::Right => neighbors.right.read(node_index),
                PortAddr::Down => neighbors.down.read(node_index),
                PortAddr::Left => neighbors.left.read(node_index),
                PortAddr::Up => neighbors.up.read(node_index),
                PortAddr::Io => self.io_port.read(node_index),
                PortAddr::Data => self.data_port.read(node_index),
            };
            match outcome {
                PortOutcome::Completed(v) => ReadOutcome::Value(v),
                PortOutcome::Suspended => ReadOutcome::Suspend,
            }
        } else if MULTIPORT_ADDRS.contains(&addr) {
            self.read_multiport(node_index, neighbors)
        } else {
            ReadOutcome::Value(xor_store(0))
        }
    }

    /// Subscribes to all four neighbor ports in fixed `PortAddr` declaration
    /// order (right, down, left, up) and completes on the first one with a
    /// pending write, cancelling the rest (spec.md §4.8/§8, multiport
    /// fairness). `Port::read` itself performs the subscription as a side
    /// effect when it doesn't complete immediately, so a second call after
    /// suspension naturally re-checks every port.
    fn read_multiport(&mut self, node_index: usize, neighbors: &mut NeighborPorts) -> ReadOutcome {
        let mut ports: [&mut Port; 4] = [
            &mut *neighbors.right,
            &mut *neighbors.down,
            &mut *neighbors.left,
            &mut *neighbors.up,
        ];
        let mut winner = None;
        for (i, port) in ports.iter_mut().enumerate() {
            if winner.is_none() {
                if let PortOutcome::Completed(v) = port.read(node_index) {
                    winner = Some((i, v));
                }
            }
        }
        match winner {
            Some((index, value)) => {
                for (i, port) in ports.into_iter().enumerate() {
                    if i != index {
                        port.cancel_reader(node_index);
                    }
                }
                ReadOutcome::Value(value)
            }
            None => ReadOutcome::Suspend,
        }
    }

    fn write_port(&mut self, addr: u32, value: u32, node_index: usize, neighbors: &mut NeighborPorts) -> WriteOutcome {
        if let Some(single) = PortAddr::from_addr(addr) {
            let outcome = match single {
                PortAddr::Right => neighbors.right.write(node_index, value),
                PortAddr::Down => neighbors.down.write(node_index, value),
                PortAddr::Left => neighbors.left.write(node_index, value),
                PortAddr::Up => neighbors.up.write(node_index, value),
                PortAddr::Io => self.io_port.write(node_index, value),
                PortAddr::Data => self.data_port.write(node_index, value),
            };
            match outcome {
                PortOutcome::Completed(_) => WriteOutcome::Completed,
                PortOutcome::Suspended => WriteOutcome::Suspend,
            }
        } else {
            // Multiport addresses have no defined write side on real
            // hardware (they fan in reads from several sources); a write
            // to one is accepted and discarded rather than blocking forever.
            WriteOutcome::Completed
        }
    }

    fn region_read(&self, addr: u32) -> u32 {
        let low = addr & 0xFF;
        if (low as usize) < RAM_SIZE {
            self.ram[low as usize]
        } else if (ROM_BASE..ROM_BASE + ROM_SIZE as u32).contains(&low) {
            self.rom[(low - ROM_BASE) as usize]
        } else {
            xor_store(0)
        }
    }

    fn region_write(&mut self, addr: u32, value: u32) {
        let low = addr & 0xFF;
        if (low as usize) < RAM_SIZE {
            self.ram[low as usize] = value;
        }
        // Addresses mapping into the ROM mirror are read-only on real
        // hardware; the write is silently dropped.
    }

    // ---- ALU / stack (opcodes 16-31) -----------------------------------

    fn execute_alu(&mut self, op: u8) {
        match op {
            16 => self.op_mulstep(),
            17 => self.data.t = (self.data.t << 1) & WORD_MASK, // 2*
            18 => {
                // 2/: arithmetic shift, sign bit preserved
                let sign = self.data.t & 0x20000;
                self.data.t = ((self.data.t >> 1) | sign) & WORD_MASK;
            }
            19 => self.data.t = (!self.data.t) & WORD_MASK, // - (bitwise not)
            20 => self.binary_op(|t, s| t.wrapping_add(s)), // +
            21 => self.binary_op(|t, s| t & s),             // and
            22 => self.binary_op(|t, s| t ^ s),              // or (really xor)
            23 => {
                self.data.pop();
            }
            24 => self.data.dup(),
            25 => {
                let v = self.ret.pop();
                self.data.push(v);
            }
            26 => self.data.over(),
            27 => self.data.push(self.a),
            28 => {} // .  (nop)
            29 => {
                let v = self.data.pop();
                self.ret.push(v);
            }
            30 => self.b = self.data.pop(), // b!
            31 => self.a = self.data.pop(), // a!
            _ => unreachable!("opcode {op} is not an ALU op"),
        }
    }

    fn binary_op(&mut self, f: impl Fn(u32, u32) -> u32) {
        let result = f(self.data.t, self.data.s) & WORD_MASK;
        self.data.pop();
        self.data.t = result;
    }

    /// `+*`: one step of the 17-iteration shift-add multiply (spec.md
    /// §4.8). The running product's low half lives in `S`, the partial
    /// sum/high half in `T`; carry participates only when `extendedArith`
    /// is set, matching the documented carry-gating quirk.
    fn op_mulstep(&mut self) {
        let lsb = self.data.s & 1;
        let partial: u64 = if lsb != 0 {
            self.data.t as u64 + self.a as u64
        } else {
            self.data.t as u64
        };
        let carry = (partial >> 18) & 1;
        let combined: u64 = ((partial & 0x3FFFF) << 18) | self.data.s as u64;
        let shifted = combined >> 1;
        let mut new_t = ((shifted >> 18) & 0x3FFFF) as u32;
        let new_s = (shifted & 0x3FFFF) as u32;
        if self.extended_arith {
            new_t |= (carry as u32) << 17;
        }
        self.data.t = new_t;
        self.data.s = new_s;
    }
}

/// The non-linear P-increment rule (spec.md §4.8): `0x00-0x7E` step `+1`;
/// `0x7F` wraps to `0`; `0x80-0xFE` step `+1`; `0xFF` wraps to `0x80`; bit 9
/// (extended arith) is preserved; addresses with bit 8 set (I/O/port
/// addresses) do not increment at all.
fn incr_p(addr: u32) -> u32 {
    if addr & 0x100 != 0 {
        return addr;
    }
    let extended = addr & EXTENDED_ARITH_BIT;
    let body = addr & 0xFF;
    let next_body = match body {
        0x7F => 0x00,
        0xFF => 0x80,
        _ => body + 1,
    };
    extended | next_body
}

/// True for the branch-family opcodes (0-7), kept here so callers that only
/// have `f18a-isa`'s table (not this crate's dispatch) can still classify
/// an opcode the same way the interpreter does.
pub fn is_branch_opcode(op: u8) -> bool {
    opcode::is_branch(op)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lone_neighbors<'a>(
        right: &'a mut Port,
        down: &'a mut Port,
        left: &'a mut Port,
        up: &'a mut Port,
    ) -> NeighborPorts<'a> {
        NeighborPorts { right, down, left, up }
    }

    #[test]
    fn incr_p_steps_by_one_in_the_low_half() {
        assert_eq!(incr_p(0x00), 0x01);
        assert_eq!(incr_p(0x7E), 0x7F);
    }

    #[test]
    fn incr_p_wraps_at_the_low_half_boundary() {
        assert_eq!(incr_p(0x7F), 0x00);
    }

    #[test]
    fn incr_p_wraps_at_the_high_half_boundary() {
        assert_eq!(incr_p(0xFE), 0xFF);
        assert_eq!(incr_p(0xFF), 0x80);
    }

    #[test]
    fn incr_p_preserves_the_extended_arith_bit() {
        assert_eq!(incr_p(0x200 | 0x10), 0x200 | 0x11);
    }

    #[test]
    fn incr_p_leaves_port_addresses_untouched() {
        assert_eq!(incr_p(PortAddr::Right.addr()), PortAddr::Right.addr());
    }

    #[test]
    fn a_node_boots_with_spec_default_registers() {
        let mut node = NodeInterpreter::new(412);
        node.reset(&[xor_store(0); ROM_SIZE]);
        assert_eq!(node.b, PortAddr::Io.addr());
        assert_eq!(node.data.t, XOR_ENCODING);
        assert_eq!(node.data.s, XOR_ENCODING);
        assert_eq!(node.ret.r, XOR_ENCODING);
        assert_eq!(node.io, XOR_ENCODING);
    }

    #[test]
    fn reset_p_enters_at_the_cold_boot_address() {
        let mut node = NodeInterpreter::new(0);
        node.reset(&[xor_store(0); ROM_SIZE]);
        node.reset_p();
        assert_eq!(node.p, COLD_ENTRY);
    }

    #[test]
    fn dup_then_drop_leaves_the_stack_as_it_was() {
        let mut node = NodeInterpreter::new(0);
        node.reset(&[xor_store(0); ROM_SIZE]);
        node.data.push(7);
        node.execute_alu(24); // dup
        assert_eq!(node.data.t, 7);
        node.execute_alu(23); // drop
        assert_eq!(node.data.t, 7);
    }

    #[test]
    fn add_consumes_both_operands_and_leaves_one_result() {
        let mut node = NodeInterpreter::new(0);
        node.reset(&[xor_store(0); ROM_SIZE]);
        node.data.push(2);
        node.data.push(3);
        node.execute_alu(20); // +
        assert_eq!(node.data.t, 5);
    }

    #[test]
    fn a_write_with_no_reader_suspends_the_node() {
        let mut node = NodeInterpreter::new(0);
        node.reset(&[xor_store(0); ROM_SIZE]);
        node.data.push(99);
        let mut right = Port::new();
        let mut down = Port::new();
        let mut left = Port::new();
        let mut up = Port::new();
        let mut neighbors = lone_neighbors(&mut right, &mut down, &mut left, &mut up);
        let value = node.data.t;
        let outcome = node.issue_store(PortAddr::Right.addr(), value, 0, &mut neighbors);
        assert!(matches!(outcome, MemOutcome::Suspended));
    }

    #[test]
    fn a_read_completes_once_a_writer_is_already_pending() {
        let mut node = NodeInterpreter::new(0);
        node.reset(&[xor_store(0); ROM_SIZE]);
        let mut right = Port::new();
        right.write(9, 123);
        let mut down = Port::new();
        let mut left = Port::new();
        let mut up = Port::new();
        let mut neighbors = lone_neighbors(&mut right, &mut down, &mut left, &mut up);
        let outcome = node.issue_fetch(PortAddr::Right.addr(), 1, &mut neighbors);
        assert!(matches!(outcome, MemOutcome::Done));
        assert_eq!(node.data.t, 123);
    }
}
