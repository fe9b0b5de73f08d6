//! Machine state.
//!
//! A [`Machine`] owns the register file, the flags and memory. The engine and
//! every operation receive it by exclusive reference; nothing is global.
//!
//! All cells hold signed 8-bit values. A value used as an address selects the
//! cell at `value as u8`, so addressing wraps modulo memory size.

use crate::virtual_machine::errors::VMError;
use crate::virtual_machine::isa::{Flag, MEMORY_SIZE, Register, Symbol};
use crate::virtual_machine::operand::Operand;
use crate::virtual_machine::program::Program;
use std::fmt;

/// Registers, flags and memory of one machine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Machine {
    registers: [i8; Register::ALL.len()],
    flags: [bool; Flag::ALL.len()],
    memory: [i8; MEMORY_SIZE],
}

impl Default for Machine {
    fn default() -> Self {
        Self::new()
    }
}

impl Machine {
    /// Creates a machine with every register, flag and memory cell cleared.
    pub const fn new() -> Self {
        Self {
            registers: [0; Register::ALL.len()],
            flags: [false; Flag::ALL.len()],
            memory: [0; MEMORY_SIZE],
        }
    }

    /// Clears all state, including memory.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Copies a program image into memory starting at address 0.
    ///
    /// Cells past the end of the image are left untouched.
    pub fn load(&mut self, program: &Program) {
        for (cell, byte) in self.memory.iter_mut().zip(program.bytes()) {
            *cell = *byte as i8;
        }
    }

    pub fn register(&self, register: Register) -> i8 {
        self.registers[register as usize]
    }

    pub fn set_register(&mut self, register: Register, value: i8) {
        self.registers[register as usize] = value;
    }

    pub fn flag(&self, flag: Flag) -> bool {
        self.flags[flag as usize]
    }

    pub fn set_flag(&mut self, flag: Flag, value: bool) {
        self.flags[flag as usize] = value;
    }

    /// Reads a register, or a flag as `0`/`1`.
    pub fn get(&self, symbol: Symbol) -> i8 {
        match symbol {
            Symbol::Register(r) => self.register(r),
            Symbol::Flag(f) => self.flag(f) as i8,
        }
    }

    /// Writes a register, or sets a flag to `value != 0`.
    pub fn set(&mut self, symbol: Symbol, value: i8) {
        match symbol {
            Symbol::Register(r) => self.set_register(r, value),
            Symbol::Flag(f) => self.set_flag(f, value != 0),
        }
    }

    /// Reads a register or flag by name.
    pub fn get_by_name(&self, name: &str) -> Result<i8, VMError> {
        Ok(self.get(Symbol::from_name(name)?))
    }

    /// Writes a register or flag by name.
    pub fn set_by_name(&mut self, name: &str, value: i8) -> Result<(), VMError> {
        self.set(Symbol::from_name(name)?, value);
        Ok(())
    }

    /// Resolves an operand to its current value.
    pub fn value(&self, operand: Operand) -> i8 {
        match operand {
            Operand::Immediate(v) => v,
            Operand::Symbol(s) => self.get(s),
        }
    }

    pub fn read_memory(&self, address: i8) -> i8 {
        self.memory[address as u8 as usize]
    }

    pub fn write_memory(&mut self, address: i8, value: i8) {
        self.memory[address as u8 as usize] = value;
    }

    pub fn memory(&self) -> &[i8; MEMORY_SIZE] {
        &self.memory
    }

    /// Adds one to a register, wrapping.
    pub fn increment(&mut self, register: Register) {
        self.set_register(register, self.register(register).wrapping_add(1));
    }

    /// Subtracts one from a register, wrapping.
    pub fn decrement(&mut self, register: Register) {
        self.set_register(register, self.register(register).wrapping_sub(1));
    }

    /// Current instruction address.
    pub fn ip(&self) -> u8 {
        self.register(Register::Ip) as u8
    }

    /// Moves `ip` to the next cell, wrapping.
    pub fn advance_ip(&mut self) {
        self.increment(Register::Ip);
    }
}

impl fmt::Display for Machine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registers: Vec<String> = Register::ALL
            .iter()
            .map(|r| format!("{}={}", r.name(), self.register(*r)))
            .collect();
        writeln!(f, "registers: {}", registers.join(" "))?;

        let flags: Vec<String> = Flag::ALL
            .iter()
            .map(|fl| format!("{}={}", fl.name(), self.flag(*fl) as u8))
            .collect();
        writeln!(f, "flags:     {}", flags.join(" "))?;

        writeln!(f, "memory:")?;
        for (address, value) in self.memory.iter().enumerate().filter(|(_, v)| **v != 0) {
            writeln!(f, "  [{address:>3}] = {value}")?;
        }
        Ok(())
    }
}
