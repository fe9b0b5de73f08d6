//! Execution engine.
//!
//! The engine runs the program in machine memory starting at `ip`. Instructions
//! carry no length prefix, so each step fetches one byte at a time into an
//! instruction buffer until the decoder recognizes a whole instruction:
//!
//! 1. Fetch `memory[ip]` into the buffer.
//! 2. If the buffer is still incomplete, advance `ip` and fetch again.
//! 3. Stop on `halt`.
//! 4. Otherwise execute the operation and clear the buffer.
//! 5. Advance `ip` past the instruction unless the operation changed `ip`.
//!
//! A run ends only at `halt`, on an error, or when the configured step budget
//! runs out. `ip` wraps around memory, and a jump into the middle of an
//! instruction simply decodes from there.
//!
//! With [`VmConfig::trace`] set, the engine logs every instruction it executes
//! and every change of `ip` made by an operation at debug level.

mod budget;
mod config;

pub use budget::StepBudget;
pub use config::{STEP_LIMIT_ENV, TRACE_ENV, VmConfig, parse_step_limit};

use crate::debug;
use crate::utils::log;
use crate::virtual_machine::console::Console;
use crate::virtual_machine::disassembler::decode_instruction;
use crate::virtual_machine::errors::VMError;
use crate::virtual_machine::isa::Operation;
use crate::virtual_machine::ops::execute;
use crate::virtual_machine::program::Program;
use crate::virtual_machine::state::Machine;

/// Longest encoded instruction: opcode plus two operand bytes.
const MAX_INSTRUCTION_LEN: usize = 3;

/// Register machine bound to a console.
pub struct VM<C: Console> {
    machine: Machine,
    console: C,
    config: VmConfig,
    budget: StepBudget,
}

impl<C: Console> VM<C> {
    /// Creates a VM with cleared state.
    ///
    /// A tracing config turns on debug-level logging.
    pub fn new(console: C, config: VmConfig) -> Self {
        if config.trace {
            log::set_debug(true);
        }
        Self {
            machine: Machine::new(),
            console,
            config,
            budget: StepBudget::new(config.step_limit),
        }
    }

    /// Resets the machine and copies `program` into memory at address 0.
    pub fn load(&mut self, program: &Program) {
        self.machine.reset();
        self.machine.load(program);
        self.budget.reset();
    }

    /// Executes from the current `ip` until `halt`.
    pub fn run(&mut self) -> Result<(), VMError> {
        let mut buffer: Vec<u8> = Vec::with_capacity(MAX_INSTRUCTION_LEN);
        let mut start = self.machine.ip();

        loop {
            let ip = self.machine.ip();
            buffer.push(self.machine.read_memory(ip as i8) as u8);

            let instruction = match decode_instruction(&buffer) {
                Ok(Some(instruction)) => instruction,
                Ok(None) => {
                    self.machine.advance_ip();
                    continue;
                }
                Err(VMError::InvalidInstruction { opcode, .. }) => {
                    return Err(VMError::InvalidInstruction {
                        opcode,
                        offset: start as usize,
                    });
                }
                Err(e) => return Err(e),
            };
            buffer.clear();

            if self.config.trace {
                debug!("{start:>3}: {instruction}");
            }

            if instruction.operation == Operation::Halt {
                return Ok(());
            }

            self.budget.charge()?;
            // ip sits on the last byte of the instruction here.
            let before = self.machine.ip();
            execute(
                &mut self.machine,
                &mut self.console,
                instruction.operation,
                &instruction.operands,
            )?;

            let after = self.machine.ip();
            if after == before {
                self.machine.advance_ip();
            } else if self.config.trace {
                debug!("     ip -> {after}");
            }
            start = self.machine.ip();
        }
    }

    /// Loads `program` and runs it to completion.
    pub fn run_program(&mut self, program: &Program) -> Result<(), VMError> {
        self.load(program);
        self.run()
    }

    pub fn machine(&self) -> &Machine {
        &self.machine
    }

    pub fn machine_mut(&mut self) -> &mut Machine {
        &mut self.machine
    }

    pub fn console(&self) -> &C {
        &self.console
    }

    pub fn config(&self) -> &VmConfig {
        &self.config
    }

    /// Instructions executed since the last load, `halt` excluded.
    pub fn steps(&self) -> u64 {
        self.budget.used()
    }
}

#[cfg(test)]
mod tests;
