//! F18A instruction set architecture: the 32-entry opcode table, the 18-bit
//! word/slot packing rules, and the XOR storage convention shared by node RAM.
//!
//! This crate is pure data and pure functions. It knows nothing about the
//! CUBE source language or about a running node's registers; `cube-codegen`
//! writes words using the packing functions here, and `f18a-vm` decodes them
//! using the same tables, the way `raya-bytecode` sits between
//! `raya-compiler` and `raya-core` in the teacher pack.

pub mod opcode;
pub mod ports;
pub mod rom;
pub mod word;

pub use opcode::{Opcode, OPCODES};
pub use ports::{PortAddr, MULTIPORT_ADDRS};
pub use rom::{RomFunction, RomTable};
pub use word::{
    decode_slot, fits_slot3, pack_word, patch_slot_field, slot3_legal, xor_load, xor_store,
    SlotAddr, SlotDecode, ADDR_MASKS, EXTENDED_ARITH_BIT, WORD_MASK, XOR_ENCODING,
};
