//! Instruction Set Architecture (ISA) definitions.
//!
//! Defines the machine's registers, flags and instruction set. The
//! [`for_each_opcode!`](crate::for_each_opcode) macro holds the canonical opcode
//! list and invokes a callback macro for code generation, so the table below is
//! the single source of the binary format.
//!
//! This module generates:
//! - The [`Opcode`] enum with its byte values
//! - `TryFrom<u8>` for decoding opcodes
//! - [`CODEC`], the opcode-indexed table of names, shapes and operand lengths
//! - [`Opcode::from_name`], the reverse lookup used by the assembler
//!
//! # Bytecode Format
//!
//! Instructions use variable-length encoding with no length prefix:
//! - Opcode: 1 byte
//! - Immediate operand: 1 byte (signed)
//! - Register/flag operand: 1 byte (symbol index 0-11)
//! - Register-register operands: 1 byte, first index in the high nibble
//!
//! The operand length is only known from the opcode's [`Shape`].

use crate::virtual_machine::errors::VMError;
use std::fmt;

/// Number of cells in machine memory.
pub const MEMORY_SIZE: usize = 256;

/// Number of registers and flags in the combined symbol space.
pub const SYMBOL_COUNT: usize = Register::ALL.len() + Flag::ALL.len();

/// Machine register, in encoding order.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Register {
    /// General purpose accumulator, the default operand of most operations.
    A = 0,
    B = 1,
    C = 2,
    D = 3,
    /// Instruction pointer.
    Ip = 4,
    /// Stack base.
    Sb = 5,
    /// Stack pointer, grows downward.
    Sp = 6,
}

impl Register {
    pub const ALL: [Register; 7] = [
        Register::A,
        Register::B,
        Register::C,
        Register::D,
        Register::Ip,
        Register::Sb,
        Register::Sp,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Register::A => "a",
            Register::B => "b",
            Register::C => "c",
            Register::D => "d",
            Register::Ip => "ip",
            Register::Sb => "sb",
            Register::Sp => "sp",
        }
    }
}

/// Machine status flag, in encoding order (after the registers).
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Flag {
    /// Carry. Reserved, no operation sets it.
    Carry = 0,
    /// Parity, set when the tested value has an even number of one bits.
    Parity = 1,
    Zero = 2,
    Sign = 3,
    /// Overflow. Reserved, no operation sets it.
    Overflow = 4,
}

impl Flag {
    pub const ALL: [Flag; 5] = [
        Flag::Carry,
        Flag::Parity,
        Flag::Zero,
        Flag::Sign,
        Flag::Overflow,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Flag::Carry => "cf",
            Flag::Parity => "pf",
            Flag::Zero => "zf",
            Flag::Sign => "sf",
            Flag::Overflow => "of",
        }
    }
}

/// A register or a flag, as named by an `r` operand.
///
/// Registers occupy symbol indices `0..7` and flags `7..12`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Symbol {
    Register(Register),
    Flag(Flag),
}

impl Symbol {
    /// Resolves a register or flag name.
    pub fn from_name(name: &str) -> Result<Self, VMError> {
        if let Some(reg) = Register::ALL.iter().find(|r| r.name() == name) {
            return Ok(Symbol::Register(*reg));
        }
        if let Some(flag) = Flag::ALL.iter().find(|f| f.name() == name) {
            return Ok(Symbol::Flag(*flag));
        }
        Err(VMError::UnknownSymbol(name.to_string()))
    }

    /// Returns `true` if `name` is a register or flag name.
    pub fn is_name(name: &str) -> bool {
        Self::from_name(name).is_ok()
    }

    /// Decodes a symbol from its operand byte.
    pub fn from_index(index: u8) -> Result<Self, VMError> {
        let i = index as usize;
        let regs = Register::ALL.len();
        if i < regs {
            Ok(Symbol::Register(Register::ALL[i]))
        } else if i < SYMBOL_COUNT {
            Ok(Symbol::Flag(Flag::ALL[i - regs]))
        } else {
            Err(VMError::InvalidRegisterIndex { index })
        }
    }

    /// Returns the operand byte encoding this symbol.
    pub const fn index(self) -> u8 {
        match self {
            Symbol::Register(r) => r as u8,
            Symbol::Flag(f) => Register::ALL.len() as u8 + f as u8,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Symbol::Register(r) => r.name(),
            Symbol::Flag(f) => f.name(),
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Types and order of an instruction's operands (`i` immediate, `r` register).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shape {
    None,
    I,
    R,
    Ii,
    Ir,
    Ri,
    Rr,
}

impl Shape {
    /// Shape suffix as it appears in full operation names (`"ir"` in `"movir"`).
    pub const fn as_str(self) -> &'static str {
        match self {
            Shape::None => "",
            Shape::I => "i",
            Shape::R => "r",
            Shape::Ii => "ii",
            Shape::Ir => "ir",
            Shape::Ri => "ri",
            Shape::Rr => "rr",
        }
    }

    /// Parses a shape suffix built from operand types.
    pub fn from_code(code: &str) -> Option<Self> {
        Some(match code {
            "" => Shape::None,
            "i" => Shape::I,
            "r" => Shape::R,
            "ii" => Shape::Ii,
            "ir" => Shape::Ir,
            "ri" => Shape::Ri,
            "rr" => Shape::Rr,
            _ => return None,
        })
    }

    /// Number of operand tokens in assembly text.
    pub const fn arity(self) -> usize {
        self.as_str().len()
    }

    /// Number of operand bytes after the opcode. Two registers pack into one byte.
    pub const fn operand_len(self) -> usize {
        match self {
            Shape::Rr => 1,
            other => other.arity(),
        }
    }
}

/// Operation kind behind one or more opcodes, independent of operand shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Halt,
    Getc,
    Putc,
    Not,
    Neg,
    Popcount,
    Clz,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Or,
    And,
    Xor,
    Shl,
    Shr,
    Store,
    Load,
    Mov,
    Test,
    Cmp,
    Jmp,
    Jo,
    Jno,
    Jz,
    Jnz,
    Jl,
    Jle,
    Jge,
    Jpe,
    Jpo,
    Jaz,
    Push,
    Pop,
    Call,
    Ret,
}

impl Operation {
    pub const fn mnemonic(self) -> &'static str {
        match self {
            Operation::Halt => "halt",
            Operation::Getc => "getc",
            Operation::Putc => "putc",
            Operation::Not => "not",
            Operation::Neg => "neg",
            Operation::Popcount => "popcount",
            Operation::Clz => "clz",
            Operation::Add => "add",
            Operation::Sub => "sub",
            Operation::Mul => "mul",
            Operation::Div => "div",
            Operation::Mod => "mod",
            Operation::Or => "or",
            Operation::And => "and",
            Operation::Xor => "xor",
            Operation::Shl => "shl",
            Operation::Shr => "shr",
            Operation::Store => "store",
            Operation::Load => "load",
            Operation::Mov => "mov",
            Operation::Test => "test",
            Operation::Cmp => "cmp",
            Operation::Jmp => "jmp",
            Operation::Jo => "jo",
            Operation::Jno => "jno",
            Operation::Jz => "jz",
            Operation::Jnz => "jnz",
            Operation::Jl => "jl",
            Operation::Jle => "jle",
            Operation::Jge => "jge",
            Operation::Jpe => "jpe",
            Operation::Jpo => "jpo",
            Operation::Jaz => "jaz",
            Operation::Push => "push",
            Operation::Pop => "pop",
            Operation::Call => "call",
            Operation::Ret => "ret",
        }
    }
}

/// One row of the opcode codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpcodeInfo {
    /// Mnemonic followed by the shape suffix, e.g. `"addrr"`.
    pub name: &'static str,
    pub operation: Operation,
    pub shape: Shape,
}

impl OpcodeInfo {
    /// Bare mnemonic, the name with its shape suffix removed.
    pub const fn mnemonic(&self) -> &'static str {
        self.operation.mnemonic()
    }

    /// Number of operand bytes following the opcode.
    pub const fn operand_len(&self) -> usize {
        self.shape.operand_len()
    }
}

/// Invokes a callback macro with the complete opcode list.
///
/// Opcodes are positional: the byte value of each entry is its index in this
/// list, which is part of the binary format.
#[macro_export]
macro_rules! for_each_opcode {
    ($callback:ident) => {
        $callback! {
            // =========================
            // Machine / character I/O
            // =========================
            /// halt ; stop execution
            Halt = 0, "halt" => Halt(None),
            /// getc ; a = next input byte
            Getc = 1, "getc" => Getc(None),
            /// putc ; write a
            Putc = 2, "putc" => Putc(None),
            /// getc r ; r = next input byte
            GetcR = 3, "getcr" => Getc(R),
            /// putc r ; write r
            PutcR = 4, "putcr" => Putc(R),
            /// putc i ; write i
            PutcI = 5, "putci" => Putc(I),
            // =========================
            // Unary
            // =========================
            Not = 6, "not" => Not(None),
            Neg = 7, "neg" => Neg(None),
            Popcount = 8, "popcount" => Popcount(None),
            Clz = 9, "clz" => Clz(None),
            NotR = 10, "notr" => Not(R),
            NegR = 11, "negr" => Neg(R),
            PopcountR = 12, "popcountr" => Popcount(R),
            ClzR = 13, "clzr" => Clz(R),
            // =========================
            // Binary arithmetic
            // =========================
            Add = 14, "add" => Add(None),
            Sub = 15, "sub" => Sub(None),
            Mul = 16, "mul" => Mul(None),
            Div = 17, "div" => Div(None),
            Mod = 18, "mod" => Mod(None),
            AddI = 19, "addi" => Add(I),
            SubI = 20, "subi" => Sub(I),
            MulI = 21, "muli" => Mul(I),
            DivI = 22, "divi" => Div(I),
            ModI = 23, "modi" => Mod(I),
            AddR = 24, "addr" => Add(R),
            SubR = 25, "subr" => Sub(R),
            MulR = 26, "mulr" => Mul(R),
            DivR = 27, "divr" => Div(R),
            ModR = 28, "modr" => Mod(R),
            AddRr = 29, "addrr" => Add(Rr),
            SubRr = 30, "subrr" => Sub(Rr),
            MulRr = 31, "mulrr" => Mul(Rr),
            DivRr = 32, "divrr" => Div(Rr),
            ModRr = 33, "modrr" => Mod(Rr),
            AddIr = 34, "addir" => Add(Ir),
            SubIr = 35, "subir" => Sub(Ir),
            MulIr = 36, "mulir" => Mul(Ir),
            DivIr = 37, "divir" => Div(Ir),
            ModIr = 38, "modir" => Mod(Ir),
            // =========================
            // Binary bitwise
            // =========================
            Or = 39, "or" => Or(None),
            And = 40, "and" => And(None),
            Xor = 41, "xor" => Xor(None),
            Shl = 42, "shl" => Shl(None),
            Shr = 43, "shr" => Shr(None),
            OrI = 44, "ori" => Or(I),
            AndI = 45, "andi" => And(I),
            XorI = 46, "xori" => Xor(I),
            ShlI = 47, "shli" => Shl(I),
            ShrI = 48, "shri" => Shr(I),
            OrR = 49, "orr" => Or(R),
            AndR = 50, "andr" => And(R),
            XorR = 51, "xorr" => Xor(R),
            ShlR = 52, "shlr" => Shl(R),
            ShrR = 53, "shrr" => Shr(R),
            OrRr = 54, "orrr" => Or(Rr),
            AndRr = 55, "andrr" => And(Rr),
            XorRr = 56, "xorrr" => Xor(Rr),
            ShlRr = 57, "shlrr" => Shl(Rr),
            ShrRr = 58, "shrrr" => Shr(Rr),
            OrIr = 59, "orir" => Or(Ir),
            AndIr = 60, "andir" => And(Ir),
            XorIr = 61, "xorir" => Xor(Ir),
            ShlIr = 62, "shlir" => Shl(Ir),
            ShrIr = 63, "shrir" => Shr(Ir),
            // =========================
            // Memory and moves
            // =========================
            /// store addr ; mem[addr] = a
            StoreI = 64, "storei" => Store(I),
            StoreR = 65, "storer" => Store(R),
            /// store addr value ; mem[addr] = value
            StoreIi = 66, "storeii" => Store(Ii),
            StoreRi = 67, "storeri" => Store(Ri),
            StoreRr = 68, "storerr" => Store(Rr),
            StoreIr = 69, "storeir" => Store(Ir),
            /// load addr ; a = mem[addr]
            LoadI = 70, "loadi" => Load(I),
            LoadR = 71, "loadr" => Load(R),
            /// load addr r ; r = mem[addr]
            LoadIr = 72, "loadir" => Load(Ir),
            LoadRr = 73, "loadrr" => Load(Rr),
            /// mov value ; a = value
            MovI = 74, "movi" => Mov(I),
            MovR = 75, "movr" => Mov(R),
            /// mov value r ; r = value
            MovRr = 76, "movrr" => Mov(Rr),
            MovIr = 77, "movir" => Mov(Ir),
            // =========================
            // Flags
            // =========================
            /// test r ; set zf, pf, sf from r
            TestR = 78, "testr" => Test(R),
            /// cmp x ; test(x - a)
            CmpI = 79, "cmpi" => Cmp(I),
            CmpR = 80, "cmpr" => Cmp(R),
            /// cmp x r ; test(x - r)
            CmpIr = 81, "cmpir" => Cmp(Ir),
            CmpRr = 82, "cmprr" => Cmp(Rr),
            // =========================
            // Control flow
            // =========================
            /// jmp target ; ip = target
            JmpI = 83, "jmpi" => Jmp(I),
            JmpR = 84, "jmpr" => Jmp(R),
            JoI = 85, "joi" => Jo(I),
            JnoI = 86, "jnoi" => Jno(I),
            JzI = 87, "jzi" => Jz(I),
            JnzI = 88, "jnzi" => Jnz(I),
            JlI = 89, "jli" => Jl(I),
            JleI = 90, "jlei" => Jle(I),
            JgeI = 91, "jgei" => Jge(I),
            JpeI = 92, "jpei" => Jpe(I),
            JpoI = 93, "jpoi" => Jpo(I),
            JazI = 94, "jazi" => Jaz(I),
            // =========================
            // Stack
            // =========================
            /// push ; sp -= 1 ; mem[sp] = a
            Push = 95, "push" => Push(None),
            PushI = 96, "pushi" => Push(I),
            PushR = 97, "pushr" => Push(R),
            /// pop ; a = mem[sp] ; sp += 1
            Pop = 98, "pop" => Pop(None),
            PopR = 99, "popr" => Pop(R),
            // =========================
            // Calls (reserved, no calling convention defined)
            // =========================
            CallI = 100, "calli" => Call(I),
            CallR = 101, "callr" => Call(R),
            Ret = 102, "ret" => Ret(None),
        }
    };
}

#[macro_export]
macro_rules! define_opcodes {
    (
        $(
            $(#[$doc:meta])*
            $name:ident = $opcode:literal, $full:literal => $op:ident ( $shape:ident )
        ),* $(,)?
    ) => {
        // =========================
        // Opcode enum
        // =========================
        #[repr(u8)]
        #[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
        pub enum Opcode {
            $(
                $(#[$doc])*
                $name = $opcode,
            )*
        }

        /// Opcode-indexed table: `CODEC[op as usize]` describes opcode `op`.
        pub static CODEC: [OpcodeInfo; OPCODE_COUNT] = [
            $(
                OpcodeInfo {
                    name: $full,
                    operation: Operation::$op,
                    shape: Shape::$shape,
                },
            )*
        ];

        /// Number of opcodes in the instruction set.
        pub const OPCODE_COUNT: usize = <[()]>::len(&[ $( define_opcodes!(@unit $name) ),* ]);

        impl TryFrom<u8> for Opcode {
            type Error = VMError;

            fn try_from(value: u8) -> Result<Self, Self::Error> {
                match value {
                    $( $opcode => Ok(Opcode::$name), )*
                    _ => Err(VMError::InvalidInstruction {
                        opcode: value,
                        offset: 0,
                    }),
                }
            }
        }

        impl Opcode {
            /// Looks up an opcode by its full name (mnemonic followed by shape suffix).
            pub fn from_name(name: &str) -> Option<Self> {
                match name {
                    $( $full => Some(Opcode::$name), )*
                    _ => None,
                }
            }

            /// Returns this opcode's codec row.
            pub fn info(self) -> &'static OpcodeInfo {
                &CODEC[self as usize]
            }
        }
    };

    (@unit $x:ident) => { () };
}

for_each_opcode!(define_opcodes);

/// Returns the codec row for an opcode byte, if it names one.
pub fn codec(opcode: u8) -> Option<&'static OpcodeInfo> {
    CODEC.get(opcode as usize)
}
