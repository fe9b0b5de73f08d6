//! An 8-bit register machine with its toolchain.
//!
//! Source goes through the [`assembler`], which emits object code, and the
//! [`linker`], which resolves labels into a flat [`program::Program`] image.
//! The [`vm`] engine copies the image into memory and runs it.
//!
//! # Architecture
//!
//! - **Registers**: `a b c d` general purpose, `ip` instruction pointer, `sb`
//!   stack base, `sp` stack pointer, all signed 8-bit
//! - **Flags**: `cf pf zf sf of`, only `pf zf sf` are computed
//! - **Memory**: 256 signed 8-bit cells, addressed modulo 256
//! - **Instruction format**: opcode byte plus 0-2 operand bytes, no length
//!   prefix; the opcode's shape gives the operand count
//! - **Stack**: grows downward from the top of memory
//!
//! # Modules
//!
//! - [`assembler`]: Tokenizing, diagnostics and object code generation
//! - [`console`]: Character I/O collaborator
//! - [`disassembler`]: Instruction decoding and listings
//! - [`errors`]: Error type shared by every stage
//! - [`isa`]: Registers, flags and the opcode table
//! - [`linker`]: Label resolution
//! - [`operand`]: Decoded operands and register-pair packing
//! - [`ops`]: Operation library
//! - [`program`]: Object code and program images
//! - [`state`]: Machine state
//! - [`vm`]: Execution engine, run configuration and step budget

pub mod assembler;
pub mod console;
pub mod disassembler;
pub mod errors;
pub mod isa;
#[cfg(test)]
mod isa_static_check;
pub mod linker;
pub mod operand;
pub mod ops;
pub mod program;
pub mod state;
pub mod vm;
