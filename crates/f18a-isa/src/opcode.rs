//! The 32-entry F18A opcode table.
//!
//! Position in the array *is* the opcode number (0-31); this mirrors the
//! authoritative table in the spec and the way `raya-bytecode::Opcode` fixes
//! numeric values by declaration order rather than by an external registry.

/// One opcode's metadata: its raw Forth mnemonic (as used in disassembly and
/// by the CodeBuilder) and the identifier-safe name the resolver exposes it
/// under in the `f18a.*` namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Opcode {
    pub number: u8,
    pub mnemonic: &'static str,
    pub clean_name: &'static str,
}

macro_rules! opcode_table {
    ($(($num:expr, $mnemonic:expr, $clean:expr)),* $(,)?) => {
        /// All 32 F18A opcodes, indexed by opcode number.
        pub const OPCODES: [Opcode; 32] = [
            $(Opcode { number: $num, mnemonic: $mnemonic, clean_name: $clean }),*
        ];
    };
}

opcode_table! {
    (0, ";", "ret"),
    (1, "ex", "ex"),
    (2, "jump", "jump"),
    (3, "call", "call"),
    (4, "unext", "unext"),
    (5, "next", "next"),
    (6, "if", "IF"),
    (7, "-if", "nif"),
    (8, "@p", "fetchp"),
    (9, "@+", "fetchplus"),
    (10, "@b", "fetchb"),
    (11, "@", "fetch"),
    (12, "!p", "storep"),
    (13, "!+", "storeplus"),
    (14, "!b", "storeb"),
    (15, "!", "store"),
    (16, "+*", "mulstep"),
    (17, "2*", "shl"),
    (18, "2/", "shr"),
    (19, "-", "not"),
    (20, "+", "add"),
    (21, "and", "and"),
    (22, "or", "xor"),
    (23, "drop", "drop"),
    (24, "dup", "dup"),
    (25, "pop", "pop"),
    (26, "over", "over"),
    (27, "a", "a"),
    (28, ".", "nop"),
    (29, "push", "push"),
    (30, "b!", "bstore"),
    (31, "a!", "astore"),
}

/// Opcodes below this number are control-flow (branch/call/return-family).
pub const CONTROL_FLOW_OPCODES: u8 = 8;
/// Opcodes in `[MEMORY_OPCODES_START, ALU_OPCODES_START)` are memory ops.
pub const MEMORY_OPCODES_START: u8 = 8;
/// Opcodes at or above this number are ALU/stack ops.
pub const ALU_OPCODES_START: u8 = 16;

/// Opcodes whose slot-0/1/2 forms consume the rest of the word as a branch
/// target: `; ex jump call unext next if -if`.
pub fn is_branch(opcode: u8) -> bool {
    opcode <= 7
}

/// `;` (return) and `ex` take no address; the rest of the branch family does.
pub fn branch_takes_address(opcode: u8) -> bool {
    is_branch(opcode) && opcode != 0 && opcode != 1 && opcode != 4
}

/// Look up an opcode's metadata by its numeric value.
pub fn by_number(number: u8) -> Option<&'static Opcode> {
    OPCODES.get(number as usize)
}

/// Look up an opcode by its resolver-facing clean name (`f18a.dup` -> `dup`).
pub fn by_clean_name(name: &str) -> Option<&'static Opcode> {
    OPCODES.iter().find(|op| op.clean_name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_position_indexed() {
        for (i, op) in OPCODES.iter().enumerate() {
            assert_eq!(op.number as usize, i);
        }
    }

    #[test]
    fn known_quirky_names() {
        // Real F18A hardware: opcode 19 ("-") is bitwise NOT, not subtract;
        // opcode 22 ("or") is XOR, not OR. Both are load-bearing quirks, not
        // typos, and callers must not "fix" them.
        assert_eq!(OPCODES[19].clean_name, "not");
        assert_eq!(OPCODES[22].clean_name, "xor");
    }

    #[test]
    fn lookup_roundtrips() {
        let op = by_clean_name("dup").unwrap();
        assert_eq!(op.number, 24);
        assert_eq!(by_number(24).unwrap().clean_name, "dup");
    }
}
