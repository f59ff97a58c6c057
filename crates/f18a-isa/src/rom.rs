//! ROM function tables, exposed under the resolver's `rom.*` namespace.
//!
//! GA144 nodes boot a small Forth-derived ROM image; its entry points have
//! raw Forth names (`*.`, `--u/mod`, ...) that are not valid CUBE
//! identifiers, so the resolver renames them to safe identifiers before
//! registering them as `ResolvedSymbol::RomFunc`.

/// One ROM entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RomFunction {
    /// Raw Forth-style name as it appears in the ROM's own symbol table.
    pub raw_name: &'static str,
    /// Identifier-safe name exposed as `rom.<clean_name>`.
    pub clean_name: &'static str,
    /// Entry address within the ROM-mirrored region (0x80..0xC0).
    pub address: u16,
}

/// Which ROM image a target node boots. Node coordinates on the real chip
/// determine this; this toolchain only needs to know it in order to pick the
/// right `rom.*` function table for the resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RomTable {
    /// The standard arithmetic ROM present on ordinary compute nodes.
    StandardArith,
}

impl Default for RomTable {
    fn default() -> Self {
        RomTable::StandardArith
    }
}

const STANDARD_ARITH: &[RomFunction] = &[
    RomFunction {
        raw_name: "*.",
        clean_name: "multiply",
        address: 0x80,
    },
    RomFunction {
        raw_name: "--u/mod",
        clean_name: "divmod2",
        address: 0x8D,
    },
    RomFunction {
        raw_name: "u/mod",
        clean_name: "divmod",
        address: 0x9A,
    },
    RomFunction {
        raw_name: "/mod",
        clean_name: "divmod_signed",
        address: 0xA6,
    },
];

impl RomTable {
    pub fn functions(self) -> &'static [RomFunction] {
        match self {
            RomTable::StandardArith => STANDARD_ARITH,
        }
    }

    pub fn by_clean_name(self, name: &str) -> Option<&'static RomFunction> {
        self.functions().iter().find(|f| f.clean_name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multiply_is_renamed_from_raw_forth() {
        let f = RomTable::default().by_clean_name("multiply").unwrap();
        assert_eq!(f.raw_name, "*.");
    }

    #[test]
    fn rom_addresses_fall_in_rom_mirror_region() {
        for f in RomTable::default().functions() {
            assert!((0x80..0xC0).contains(&f.address));
        }
    }
}
