//! Octet VM library.
//!
//! Provides the assembler, linker, disassembler and execution engine of an
//! 8-bit register machine.

pub mod utils;
pub mod virtual_machine;
