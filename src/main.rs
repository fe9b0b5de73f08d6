//! Runs a program on the octet machine.
//!
//! # Usage
//! ```text
//! octet-vm <program> [OPTIONS]
//! ```
//!
//! # Arguments
//! - `program`: Assembly source (`.asm`) or linked image (`.bin`)
//!
//! # Options
//! - `--trace`: Log every executed instruction
//! - `--step-limit <n>`: Stop with an error after `n` instructions
//! - `--dump`: Print registers, flags and memory after the run
//!
//! `OCTET_TRACE` and `OCTET_STEP_LIMIT` set the same options from the
//! environment; flags take precedence.

use octet_vm::virtual_machine::assembler::assemble_file;
use octet_vm::virtual_machine::console::StdConsole;
use octet_vm::virtual_machine::errors::VMError;
use octet_vm::virtual_machine::program::Program;
use octet_vm::virtual_machine::vm::{VM, VmConfig, parse_step_limit};
use octet_vm::{error, info};
use std::env;
use std::path::Path;
use std::process;

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        print_usage(&args[0]);
        process::exit(if args.len() < 2 { 1 } else { 0 });
    }

    let input_path = &args[1];
    let mut config = VmConfig::from_env();
    let mut dump = false;

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--trace" => {
                config.trace = true;
                i += 1;
            }
            "--step-limit" => {
                i += 1;
                if i >= args.len() {
                    error!("--step-limit requires an argument");
                    process::exit(1);
                }
                config.step_limit = Some(parse_step_limit(&args[i]).unwrap_or_else(|| {
                    error!("Invalid step limit: '{}' is not a positive integer", args[i]);
                    process::exit(1);
                }));
                i += 1;
            }
            "--dump" => {
                dump = true;
                i += 1;
            }
            other => {
                error!("Unexpected argument: {}\n", other);
                print_usage(&args[0]);
                process::exit(1);
            }
        }
    }

    if !Path::new(input_path).exists() {
        error!("Input file does not exist: {}", input_path);
        process::exit(1);
    }

    let program = load_program(input_path).unwrap_or_else(|e| {
        // Assembly errors were already rendered as a diagnostic.
        if !matches!(e, VMError::AssemblyError { .. }) {
            error!("{e}");
        }
        process::exit(1);
    });

    let mut vm = VM::new(StdConsole::new(), config);
    let result = vm.run_program(&program);
    println!();

    if dump {
        print!("{}", vm.machine());
    }

    match result {
        Ok(()) => info!("Halted after {} instructions", vm.steps()),
        Err(e) => {
            error!("Execution failed at address {}: {}", vm.machine().ip(), e);
            process::exit(1);
        }
    }
}

/// Reads a linked image for `.bin` files, and assembles anything else.
fn load_program(path: &str) -> Result<Program, VMError> {
    match Path::new(path).extension().and_then(|ext| ext.to_str()) {
        Some("bin") => Program::read_file(path),
        _ => assemble_file(path),
    }
}

const USAGE: &str = "\
Octet VM

USAGE:
    {program} <program> [OPTIONS]

ARGS:
    <program>    Assembly source (.asm) or linked image (.bin)

OPTIONS:
    --trace              Log every executed instruction
    --step-limit <n>     Stop with an error after n instructions
    --dump               Print registers, flags and memory after the run
    -h, --help           Print this help message

ENVIRONMENT:
    OCTET_TRACE          1 or true to trace
    OCTET_STEP_LIMIT     Default step limit

EXAMPLES:
    {program} hello.asm
    {program} hello.bin --step-limit 10000 --dump
";

fn print_usage(program: &str) {
    info!("{}", USAGE.replace("{program}", program));
}
