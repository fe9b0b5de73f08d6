use super::*;
use crate::utils::test_utils::utils::{
    load_source, run_output, run_source, run_source_expect_err, run_source_with_input,
};
use crate::virtual_machine::console::tests::BufferConsole;
use crate::virtual_machine::isa::{Flag, Opcode, Register};

fn reg(vm: &VM<BufferConsole>, register: Register) -> i8 {
    vm.machine().register(register)
}

fn limited(limit: u64) -> VmConfig {
    VmConfig {
        trace: false,
        step_limit: Some(limit),
    }
}

// ==================== Output ====================

#[test]
fn prints_hi() {
    let source = r#"
        mov 'h'
        putc
        mov 'i'
        putc
        halt
    "#;
    assert_eq!(run_output(source), b"hi");
}

#[test]
fn putc_forms() {
    assert_eq!(run_output("putc '!'\nmov 'b' c\nputc c\nhalt"), b"!b");
}

#[test]
fn trace_config_enables_debug_output() {
    let config = VmConfig {
        trace: true,
        step_limit: None,
    };
    let mut vm = load_source("mov 'o'\njmp 5\nhalt\nputc\nhalt", &[], config);
    assert!(crate::utils::log::debug_enabled());
    assert!(vm.config().trace);
    vm.run().unwrap();
    assert_eq!(vm.console().output, b"o");
    assert_eq!(vm.steps(), 3);
}

// ==================== Input ====================

#[test]
fn echoes_input() {
    let vm = run_source_with_input("getc\nputc\ngetc b\nputc b\nhalt", b"xy");
    assert_eq!(vm.console().output, b"xy");
    assert_eq!(reg(&vm, Register::B), b'y' as i8);
}

#[test]
fn getc_without_input_fails() {
    assert!(matches!(
        run_source_expect_err("getc\nhalt", VmConfig::default()),
        VMError::ConsoleError { .. }
    ));
}

// ==================== Arithmetic ====================

#[test]
fn self_add_wraps() {
    assert_eq!(reg(&run_source("mov 127\nadd\nhalt"), Register::A), -2);
    assert_eq!(reg(&run_source("mov -128\nadd\nhalt"), Register::A), 0);
}

#[test]
fn register_pair_arithmetic() {
    let vm = run_source("mov 6 b\nmov 7 c\nmul b c\nsub 2 c\nhalt");
    assert_eq!(reg(&vm, Register::C), 40);
    assert_eq!(reg(&vm, Register::B), 6);
}

#[test]
fn division_by_zero_stops_run() {
    assert!(matches!(
        run_source_expect_err("mov 0\ndiv 4\nhalt", VmConfig::default()),
        VMError::DivisionByZero
    ));
}

#[test]
fn non_commutative_source_first() {
    assert_eq!(reg(&run_source("mov 2\ndiv 8\nhalt"), Register::A), 4);
    assert_eq!(reg(&run_source("mov 3\nmod 7\nhalt"), Register::A), 1);
    assert_eq!(reg(&run_source("mov 3\nshl 2\nhalt"), Register::A), 16);
    assert_eq!(reg(&run_source("mov 2\nshr 12\nhalt"), Register::A), 3);
    assert_eq!(reg(&run_source("mov 100\nsub 50\nhalt"), Register::A), 50);
}

// ==================== Memory and stack ====================

#[test]
fn store_then_load() {
    let vm = run_source("store 100 'z'\nload 100 c\nputc c\nhalt");
    assert_eq!(vm.console().output, b"z");
    assert_eq!(vm.machine().read_memory(100), b'z' as i8);
}

#[test]
fn stack_reverses_order() {
    let vm = run_source("push 'o'\npush 'k'\npop\nputc\npop\nputc\nhalt");
    assert_eq!(vm.console().output, b"ko");
    assert_eq!(reg(&vm, Register::Sp), 0);
}

#[test]
fn push_uses_top_of_memory() {
    let vm = run_source("push 42\nhalt");
    assert_eq!(reg(&vm, Register::Sp) as u8, 255);
    assert_eq!(vm.machine().memory()[255], 42);
}

// ==================== Control flow ====================

#[test]
fn loop_prints_sequence() {
    let source = r#"
        mov 'a' b
        loop: putc b
        add 1 b
        cmp 'd' b      # zero once b reaches 'd'
        jnz loop
        halt
    "#;
    let vm = run_source(source);
    assert_eq!(vm.console().output, b"abc");
    assert_eq!(vm.steps(), 13);
}

#[test]
fn countdown_with_jaz() {
    let source = r#"
        mov 3
        again: sub 1
        jaz done
        jmp again
        done: halt
    "#;
    let vm = run_source(source);
    assert_eq!(reg(&vm, Register::A), 0);
    assert!(!vm.machine().flag(Flag::Zero));
    assert_eq!(vm.steps(), 9);
}

#[test]
fn forward_jump_skips_code() {
    assert!(run_output("jmp end\nputc 'x'\nend: halt").is_empty());
}

#[test]
fn mov_into_ip_jumps() {
    // movir takes bytes 0..3 and putci bytes 3..5, so halt is at 5.
    assert!(run_output("mov 5 ip\nputc 'x'\nhalt").is_empty());
}

#[test]
fn jump_through_register() {
    // movir 0..3, jmpr 3..5, putci 5..7, halt at 7.
    let vm = run_source("mov 7 d\njmp d\nputc 'x'\nhalt");
    assert!(vm.console().output.is_empty());
    assert_eq!(vm.machine().ip(), 7);
}

#[test]
fn ip_write_with_same_value_advances() {
    assert_eq!(run_output("add 0 ip\nputc 'x'\nhalt"), b"x");
    assert_eq!(run_output("mov ip ip\nputc 'y'\nhalt"), b"y");
    assert_eq!(run_output("or 0 ip\nputc 'z'\nhalt"), b"z");
}

#[test]
fn pop_into_ip_landing_on_itself_advances() {
    // pushi 0..2, popr 2..4, putci 4..6, halt at 6. ip is 3 during popr.
    assert_eq!(run_output("push 3\npop ip\nputc 'p'\nhalt"), b"p");
    // Landing elsewhere jumps: ip becomes 6 and skips the putc.
    assert!(run_output("push 6\npop ip\nputc 'p'\nhalt").is_empty());
}

#[test]
fn jump_to_self_spins() {
    assert!(matches!(
        run_source_expect_err("label: jmp label", limited(50)),
        VMError::StepLimitExceeded { limit: 50 }
    ));
}

#[test]
fn zeroed_memory_halts() {
    // Cells past the image are 0, the halt opcode.
    let vm = run_source("mov 9");
    assert_eq!(reg(&vm, Register::A), 9);
    assert_eq!(vm.machine().ip(), 2);
}

#[test]
fn call_and_ret_are_unimplemented() {
    assert!(matches!(
        run_source_expect_err("call 0\nhalt", VmConfig::default()),
        VMError::Unimplemented { mnemonic: "call" }
    ));
    assert!(matches!(
        run_source_expect_err("ret", VmConfig::default()),
        VMError::Unimplemented { mnemonic: "ret" }
    ));
}

// ==================== Decoding ====================

#[test]
fn invalid_opcode_reports_offset() {
    let program = Program::new(vec![Opcode::MovI as u8, 65, 200]).unwrap();
    let mut vm = VM::new(BufferConsole::new(), VmConfig::default());
    assert!(matches!(
        vm.run_program(&program),
        Err(VMError::InvalidInstruction {
            opcode: 200,
            offset: 2
        })
    ));
}

#[test]
fn instruction_spanning_memory_end_wraps() {
    let mut vm = VM::new(BufferConsole::new(), VmConfig::default());
    vm.load(&Program::new(vec![Opcode::Halt as u8]).unwrap());
    let machine = vm.machine_mut();
    machine.write_memory(-1, Opcode::MovI as u8 as i8);
    machine.write_memory(0, 33);
    machine.write_memory(1, Opcode::Halt as u8 as i8);
    machine.set_register(Register::Ip, -1);
    vm.run().unwrap();
    assert_eq!(reg(&vm, Register::A), 33);
    assert_eq!(vm.machine().ip(), 1);
}

// ==================== Budget ====================

#[test]
fn step_limit_counts_instructions() {
    let mut vm = load_source("mov 1\nmov 2\nmov 3\nhalt", &[], limited(3));
    vm.run().unwrap();
    assert_eq!(vm.steps(), 3);

    let mut vm = load_source("mov 1\nmov 2\nmov 3\nmov 4\nhalt", &[], limited(3));
    assert!(matches!(
        vm.run(),
        Err(VMError::StepLimitExceeded { limit: 3 })
    ));
    assert_eq!(reg(&vm, Register::A), 3);
}

#[test]
fn load_resets_machine_and_steps() {
    let program = crate::virtual_machine::assembler::assemble_source("mov 7 b\nhalt").unwrap();
    let mut vm = VM::new(BufferConsole::new(), VmConfig::default());
    vm.run_program(&program).unwrap();
    vm.machine_mut().set_register(Register::C, 1);
    vm.run_program(&program).unwrap();
    assert_eq!(reg(&vm, Register::B), 7);
    assert_eq!(reg(&vm, Register::C), 0);
    assert_eq!(vm.steps(), 1);
}

// ==================== Demos ====================

#[test]
fn demo_programs() {
    assert_eq!(run_output(include_str!("../../../demos/hello.asm")), b"hi");
    assert_eq!(
        run_output(include_str!("../../../demos/alphabet.asm")),
        b"abcdefghijklmnopqrstuvwxyz"
    );
    let vm = run_source_with_input(include_str!("../../../demos/echo.asm"), b"ok.");
    assert_eq!(vm.console().output, b"ok.");
}
