//! `assembler <input.asm> [-o out.bin] [-d]`
//!
//! Assembles and links a source file into a raw image, `<input>.bin` next to
//! the source unless `-o` is given. `-d` also prints a listing of the image.

use octet_vm::virtual_machine::assembler::assemble_file;
use octet_vm::virtual_machine::disassembler::render_listing;
use octet_vm::virtual_machine::isa::MEMORY_SIZE;
use octet_vm::{error, info, warn};
use std::env;
use std::path::Path;
use std::process;

/// Images this close to full memory leave little room for the stack.
const STACK_HEADROOM: usize = 16;

struct Options {
    input: String,
    output: String,
    listing: bool,
}

/// Parses the arguments after the program name.
fn parse_args(args: &[String]) -> Result<Options, String> {
    let mut args = args.iter();
    let input = args.next().ok_or("missing input file")?.clone();
    let mut output = None;
    let mut listing = false;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-o" | "--output" => {
                let value = args.next().ok_or_else(|| format!("{arg} requires an argument"))?;
                output = Some(value.clone());
            }
            "-d" | "--disassemble" => listing = true,
            other => return Err(format!("unexpected argument: {other}")),
        }
    }

    let output = output.unwrap_or_else(|| {
        Path::new(&input)
            .with_extension("bin")
            .to_string_lossy()
            .into_owned()
    });
    Ok(Options {
        input,
        output,
        listing,
    })
}

fn main() {
    let args: Vec<String> = env::args().collect();
    let program = args.first().map_or("assembler", String::as_str);

    if args.iter().skip(1).any(|a| a == "-h" || a == "--help") {
        print_usage(program);
        return;
    }

    let options = parse_args(args.get(1..).unwrap_or_default()).unwrap_or_else(|e| {
        error!("{e}");
        print_usage(program);
        process::exit(1);
    });

    if !Path::new(&options.input).exists() {
        error!("Input file does not exist: {}", options.input);
        process::exit(1);
    }

    // assemble_file logs a diagnostic for assembly errors.
    let image = assemble_file(&options.input).unwrap_or_else(|e| {
        error!("Assembly failed: {e}");
        process::exit(1);
    });

    if let Err(e) = image.write_file(&options.output) {
        error!("Failed to write {}: {e}", options.output);
        process::exit(1);
    }
    info!(
        "{} -> {} ({} bytes)",
        options.input,
        options.output,
        image.len()
    );

    if image.len() + STACK_HEADROOM > MEMORY_SIZE {
        warn!(
            "Image uses {} of {MEMORY_SIZE} bytes; the stack may overwrite code",
            image.len()
        );
    }

    if options.listing {
        match render_listing(image.bytes()) {
            Ok(text) => print!("{text}"),
            Err(e) => {
                error!("Disassembly failed: {e}");
                process::exit(1);
            }
        }
    }
}

const USAGE: &str = "\
usage: {program} <input.asm> [-o <out.bin>] [-d]

    -o, --output <file>   image path, defaults to <input>.bin
    -d, --disassemble     print a listing of the linked image
    -h, --help            show this message
";

fn print_usage(program: &str) {
    info!("{}", USAGE.replace("{program}", program));
}
