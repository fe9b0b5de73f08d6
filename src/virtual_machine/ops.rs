//! Operation library.
//!
//! [`execute`] applies one decoded operation to a [`Machine`]. Operands arrive
//! already decoded and are resolved against live state here. Missing operands
//! default to the accumulator `a`: with one operand it is the source and `a`
//! the destination, with none `a` is both.
//!
//! Arithmetic is done in `i32` and folded back into `[-128, 127]` with
//! [`normalize`].

use crate::virtual_machine::console::Console;
use crate::virtual_machine::errors::VMError;
use crate::virtual_machine::isa::{Flag, Operation, Register, Symbol};
use crate::virtual_machine::operand::Operand;
use crate::virtual_machine::state::Machine;

const ACCUMULATOR: Operand = Operand::reg(Register::A);

/// Folds values `>= 128` back into the signed range.
pub fn fix_overflow(x: i32) -> i32 {
    if x < 128 { x } else { x.rem_euclid(128) - 128 }
}

/// Folds values `< -128` back into the signed range.
pub fn fix_underflow(x: i32) -> i32 {
    if x >= -128 { x } else { x.rem_euclid(128) }
}

/// Applies underflow then overflow folding.
pub fn normalize(x: i32) -> i8 {
    // Both folds land in [-128, 127].
    fix_overflow(fix_underflow(x)) as i8
}

fn operand(operands: &[Operand], index: usize) -> Operand {
    operands.get(index).copied().unwrap_or(ACCUMULATOR)
}

/// Destination operand, which must name a register.
fn destination(
    operands: &[Operand],
    index: usize,
    mnemonic: &'static str,
) -> Result<Register, VMError> {
    match operand(operands, index) {
        Operand::Symbol(Symbol::Register(r)) => Ok(r),
        _ => Err(VMError::ExpectedRegister { mnemonic }),
    }
}

fn unary(
    machine: &mut Machine,
    operation: Operation,
    operands: &[Operand],
) -> Result<(), VMError> {
    let x = machine.value(operand(operands, 0));
    let result = match operation {
        Operation::Not => !x,
        Operation::Neg => normalize(-(x as i32)),
        Operation::Popcount => (x as u8).count_ones() as i8,
        Operation::Clz => (x as u8).leading_zeros() as i8,
        other => {
            return Err(VMError::Unimplemented {
                mnemonic: other.mnemonic(),
            });
        }
    };
    machine.set_register(Register::A, result);
    Ok(())
}

/// Computes `src OP dest`, except `sub`, which is `dest - src`.
///
/// So `div`, `mod`, `shl` and `shr` take the destination as the divisor or
/// shift count.
fn binary_result(operation: Operation, src: i32, dest: i32) -> Result<i8, VMError> {
    let nonzero = |d: i32| if d == 0 { Err(VMError::DivisionByZero) } else { Ok(d) };
    Ok(match operation {
        Operation::Add => normalize(src + dest),
        Operation::Sub => normalize(dest - src),
        Operation::Mul => normalize(src * dest),
        Operation::Div => normalize(src / nonzero(dest)?),
        Operation::Mod => normalize(src % nonzero(dest)?),
        Operation::Or => (src | dest) as i8,
        Operation::And => (src & dest) as i8,
        Operation::Xor => (src ^ dest) as i8,
        Operation::Shl => src.checked_shl(dest as u8 as u32).unwrap_or(0) as i8,
        Operation::Shr => (src >> (dest as u8).min(31)) as i8,
        other => {
            return Err(VMError::Unimplemented {
                mnemonic: other.mnemonic(),
            });
        }
    })
}

fn binary(
    machine: &mut Machine,
    operation: Operation,
    operands: &[Operand],
) -> Result<(), VMError> {
    let src = machine.value(operand(operands, 0));
    let dest = destination(operands, 1, operation.mnemonic())?;
    let result = binary_result(operation, src as i32, machine.register(dest) as i32)?;
    machine.set_register(dest, result);
    Ok(())
}

/// Sets `zf`, `pf` and `sf` from `x`. Parity looks at the low eight bits.
pub fn test_value(machine: &mut Machine, x: i32) {
    machine.set_flag(Flag::Zero, x == 0);
    machine.set_flag(Flag::Parity, (x as u8).count_ones() % 2 == 0);
    machine.set_flag(Flag::Sign, x < 0);
}

/// Evaluates the condition of a jump operation.
fn jump_taken(machine: &Machine, operation: Operation) -> bool {
    let flag = |f| machine.flag(f);
    match operation {
        Operation::Jmp => true,
        Operation::Jo => flag(Flag::Overflow),
        Operation::Jno => !flag(Flag::Overflow),
        Operation::Jz => flag(Flag::Zero),
        Operation::Jnz => !flag(Flag::Zero),
        Operation::Jl => flag(Flag::Zero) != flag(Flag::Overflow),
        Operation::Jle => flag(Flag::Zero) != flag(Flag::Overflow) || flag(Flag::Zero),
        Operation::Jge => flag(Flag::Sign) == flag(Flag::Overflow),
        Operation::Jpe => flag(Flag::Parity),
        Operation::Jpo => !flag(Flag::Parity),
        Operation::Jaz => machine.register(Register::A) == 0,
        _ => false,
    }
}

/// Executes one operation against `machine`.
///
/// `halt` is a no-op here; stopping is the engine's job.
pub fn execute<C: Console>(
    machine: &mut Machine,
    console: &mut C,
    operation: Operation,
    operands: &[Operand],
) -> Result<(), VMError> {
    let mnemonic = operation.mnemonic();

    match operation {
        Operation::Halt => {}

        Operation::Getc => {
            let dest = destination(operands, 0, mnemonic)?;
            let byte = console.get_char()?;
            machine.set_register(dest, byte as i8);
        }
        Operation::Putc => {
            let value = machine.value(operand(operands, 0));
            console.put_char(value as u8)?;
        }

        Operation::Not | Operation::Neg | Operation::Popcount | Operation::Clz => {
            unary(machine, operation, operands)?;
        }

        Operation::Add
        | Operation::Sub
        | Operation::Mul
        | Operation::Div
        | Operation::Mod
        | Operation::Or
        | Operation::And
        | Operation::Xor
        | Operation::Shl
        | Operation::Shr => binary(machine, operation, operands)?,

        Operation::Store => {
            let address = machine.value(operand(operands, 0));
            let value = machine.value(operand(operands, 1));
            machine.write_memory(address, value);
        }
        Operation::Load => {
            let address = machine.value(operand(operands, 0));
            let dest = destination(operands, 1, mnemonic)?;
            machine.set_register(dest, machine.read_memory(address));
        }
        Operation::Mov => {
            let value = machine.value(operand(operands, 0));
            let dest = destination(operands, 1, mnemonic)?;
            machine.set_register(dest, value);
        }

        Operation::Test => {
            let x = machine.value(operand(operands, 0));
            test_value(machine, x as i32);
        }
        Operation::Cmp => {
            let x = machine.value(operand(operands, 0)) as i32;
            let y = machine.value(operand(operands, 1)) as i32;
            test_value(machine, x - y);
        }

        Operation::Jmp
        | Operation::Jo
        | Operation::Jno
        | Operation::Jz
        | Operation::Jnz
        | Operation::Jl
        | Operation::Jle
        | Operation::Jge
        | Operation::Jpe
        | Operation::Jpo
        | Operation::Jaz => {
            let target = machine.value(operand(operands, 0));
            if jump_taken(machine, operation) {
                machine.set_register(Register::Ip, target);
            }
        }

        Operation::Push => {
            let value = machine.value(operand(operands, 0));
            machine.decrement(Register::Sp);
            machine.write_memory(machine.register(Register::Sp), value);
        }
        Operation::Pop => {
            let dest = destination(operands, 0, mnemonic)?;
            let value = machine.read_memory(machine.register(Register::Sp));
            machine.increment(Register::Sp);
            machine.set_register(dest, value);
        }

        Operation::Call | Operation::Ret => return Err(VMError::Unimplemented { mnemonic }),
    }

    Ok(())
}
