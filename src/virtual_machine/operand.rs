use crate::virtual_machine::errors::VMError;
use crate::virtual_machine::isa::{Register, Symbol};
use std::fmt;

/// Decoded instruction operand.
///
/// Immediates are used as-is; symbols are resolved against live machine state
/// when the operation runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operand {
    Immediate(i8),
    Symbol(Symbol),
}

impl Operand {
    /// Shorthand for a register operand.
    pub const fn reg(register: Register) -> Self {
        Operand::Symbol(Symbol::Register(register))
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Immediate(v) => write!(f, "{v}"),
            Operand::Symbol(s) => write!(f, "{s}"),
        }
    }
}

/// Packs two symbols into one byte, first in the high nibble.
pub const fn pack_symbols(first: Symbol, second: Symbol) -> u8 {
    first.index() << 4 | second.index()
}

/// Splits a packed register-register byte back into its two symbols.
pub fn unpack_symbols(byte: u8) -> Result<(Symbol, Symbol), VMError> {
    Ok((Symbol::from_index(byte >> 4)?, Symbol::from_index(byte & 0x0F)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::virtual_machine::isa::Flag;

    #[test]
    fn pack_puts_first_in_high_nibble() {
        let b = Symbol::Register(Register::B);
        let c = Symbol::Register(Register::C);
        assert_eq!(pack_symbols(b, c), 0x12);
        assert_eq!(pack_symbols(c, b), 0x21);
    }

    #[test]
    fn unpack_reverses_pack() {
        let sp = Symbol::Register(Register::Sp);
        let of = Symbol::Flag(Flag::Overflow);
        assert_eq!(unpack_symbols(pack_symbols(of, sp)).unwrap(), (of, sp));
    }

    #[test]
    fn unpack_rejects_unknown_nibble() {
        assert!(matches!(
            unpack_symbols(0xC0),
            Err(VMError::InvalidRegisterIndex { index: 12 })
        ));
        assert!(matches!(
            unpack_symbols(0x0F),
            Err(VMError::InvalidRegisterIndex { index: 15 })
        ));
    }

    #[test]
    fn operand_display() {
        assert_eq!(Operand::Immediate(-5).to_string(), "-5");
        assert_eq!(Operand::reg(Register::Ip).to_string(), "ip");
    }
}
