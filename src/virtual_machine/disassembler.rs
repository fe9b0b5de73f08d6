//! Bytecode decoding and listing.
//!
//! Decoding is incremental: [`decode_instruction`] is fed a growing byte buffer
//! and reports `None` until the buffer holds a whole instruction. The engine
//! fetches byte by byte with it, and [`disassemble`] walks a full image.

use crate::virtual_machine::errors::VMError;
use crate::virtual_machine::isa::{Opcode, Operation, Shape, Symbol, codec};
use crate::virtual_machine::operand::{Operand, unpack_symbols};
use std::fmt;

/// A fully decoded instruction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodedInstruction {
    pub opcode: Opcode,
    pub operation: Operation,
    pub operands: Vec<Operand>,
}

impl DecodedInstruction {
    /// Encoded size in bytes.
    pub fn encoded_len(&self) -> usize {
        1 + self.opcode.info().operand_len()
    }
}

/// Renders the instruction as assembly text that reassembles to the same bytes.
impl fmt::Display for DecodedInstruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.operation.mnemonic())?;
        for operand in &self.operands {
            write!(f, " {operand}")?;
        }
        Ok(())
    }
}

/// Converts operand bytes into operands according to `shape`.
pub fn decode_operands(bytes: &[u8], shape: Shape) -> Result<Vec<Operand>, VMError> {
    let symbol = |b: u8| Symbol::from_index(b).map(Operand::Symbol);
    let imm = |b: u8| Operand::Immediate(b as i8);

    let expected = shape.operand_len();
    let [first, second] = [bytes.first().copied(), bytes.get(1).copied()];

    let operands = match (shape, first, second) {
        _ if bytes.len() != expected => {
            return Err(VMError::OperandCountMismatch {
                name: shape.as_str(),
                expected,
                actual: bytes.len(),
            });
        }
        (Shape::None, _, _) => Vec::new(),
        (Shape::I, Some(x), _) => vec![imm(x)],
        (Shape::R, Some(x), _) => vec![symbol(x)?],
        (Shape::Ii, Some(x), Some(y)) => vec![imm(x), imm(y)],
        (Shape::Ir, Some(x), Some(y)) => vec![imm(x), symbol(y)?],
        (Shape::Ri, Some(x), Some(y)) => vec![symbol(x)?, imm(y)],
        (Shape::Rr, Some(packed), _) => {
            let (x, y) = unpack_symbols(packed)?;
            vec![Operand::Symbol(x), Operand::Symbol(y)]
        }
        _ => {
            return Err(VMError::OperandCountMismatch {
                name: shape.as_str(),
                expected,
                actual: bytes.len(),
            });
        }
    };

    Ok(operands)
}

/// Decodes one instruction from the start of `bytes`.
///
/// Returns `Ok(None)` while `bytes` is shorter than the instruction its first
/// byte announces, including when `bytes` is empty.
pub fn decode_instruction(bytes: &[u8]) -> Result<Option<DecodedInstruction>, VMError> {
    let Some((&opcode_byte, operand_bytes)) = bytes.split_first() else {
        return Ok(None);
    };
    let opcode = Opcode::try_from(opcode_byte)?;
    let info = opcode.info();

    let expected = info.operand_len();
    if operand_bytes.len() < expected {
        return Ok(None);
    }
    if operand_bytes.len() > expected {
        return Err(VMError::OperandCountMismatch {
            name: info.name,
            expected,
            actual: operand_bytes.len(),
        });
    }

    Ok(Some(DecodedInstruction {
        opcode,
        operation: info.operation,
        operands: decode_operands(operand_bytes, info.shape)?,
    }))
}

/// Decodes a whole image into `(offset, instruction)` pairs.
///
/// A truncated trailing instruction is reported as an invalid instruction at
/// its offset.
pub fn disassemble(bytes: &[u8]) -> Result<Vec<(usize, DecodedInstruction)>, VMError> {
    let mut out = Vec::new();
    let mut offset = 0;

    while offset < bytes.len() {
        let opcode = bytes[offset];
        let info = codec(opcode).ok_or(VMError::InvalidInstruction { opcode, offset })?;
        let end = offset + 1 + info.operand_len();
        let slice = bytes
            .get(offset..end)
            .ok_or(VMError::InvalidInstruction { opcode, offset })?;
        let instruction = decode_instruction(slice)?
            .ok_or(VMError::InvalidInstruction { opcode, offset })?;
        let next = offset + instruction.encoded_len();
        out.push((offset, instruction));
        offset = next;
    }

    Ok(out)
}

/// Renders a listing with one `offset: instruction` line per instruction.
pub fn render_listing(bytes: &[u8]) -> Result<String, VMError> {
    use std::fmt::Write;

    let mut listing = String::new();
    for (offset, instruction) in disassemble(bytes)? {
        let _ = writeln!(listing, "{offset:>3}: {instruction}");
    }
    Ok(listing)
}
