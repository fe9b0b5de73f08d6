use octet_derive::Error;

/// Errors that can occur during assembly, linking, decoding or execution.
#[derive(Debug, Error)]
pub enum VMError {
    // =========================
    // Encoding
    // =========================
    /// Decimal literal outside the signed 8-bit range.
    #[error("immediate {token} out of range [-128, 127]")]
    ImmediateOutOfRange { token: String },
    /// Character literal that is not exactly `'c'` with an ASCII `c`.
    #[error("malformed character literal {token}")]
    InvalidCharLiteral { token: String },
    /// Operand that is neither a literal, a register/flag nor (when allowed) a label.
    #[error("invalid operand {token}")]
    InvalidOperand { token: String },
    /// No opcode exists for this mnemonic with this operand shape.
    #[error("unknown operation {name}")]
    UnknownOperation { name: String },
    /// A `:` with nothing before it.
    #[error("empty label name")]
    EmptyLabel,
    /// A label that is not an identifier or shadows a register/flag name.
    #[error("invalid label name {label}")]
    InvalidLabel { label: String },
    /// Unbalanced quote in a character literal.
    #[error("unterminated character literal")]
    UnterminatedLiteral,
    /// Assembly error with line/column context.
    #[error("line {line}:{offset}: {source}")]
    AssemblyError {
        line: usize,
        offset: usize,
        source: String,
    },

    // =========================
    // Linking
    // =========================
    /// Label defined more than once.
    #[error("duplicate label: {label}")]
    DuplicateLabel { label: String },
    /// Reference to undefined label.
    #[error("undefined label: {label}")]
    UndefinedLabel { label: String },
    /// Label position that does not fit in one address byte.
    #[error("label {label} at position {position} is not addressable")]
    LabelOutOfRange { label: String, position: usize },
    /// Linked image does not fit in memory.
    #[error("program of {size} bytes exceeds memory of {capacity} bytes")]
    ProgramTooLarge { size: usize, capacity: usize },

    // =========================
    // Decoding
    // =========================
    /// Name that is neither a register nor a flag.
    #[error("invalid register or flag name: \"{0}\"")]
    UnknownSymbol(String),
    /// Opcode byte with no entry in the codec.
    #[error("invalid instruction {opcode} at offset {offset}")]
    InvalidInstruction { opcode: u8, offset: usize },
    /// Operand byte that does not index a register or flag.
    #[error("register index {index} out of bounds")]
    InvalidRegisterIndex { index: u8 },
    /// More operand bytes than the opcode declares.
    #[error("{name} takes {expected} operand bytes, got {actual}")]
    OperandCountMismatch {
        name: &'static str,
        expected: usize,
        actual: usize,
    },

    // =========================
    // Execution
    // =========================
    /// Opcode declared in the ISA with no operation behind it.
    #[error("operation {mnemonic} is not implemented")]
    Unimplemented { mnemonic: &'static str },
    /// Division or modulo by zero.
    #[error("division by zero")]
    DivisionByZero,
    /// Result written to an immediate or flag where a register is required.
    #[error("{mnemonic} expects a register destination")]
    ExpectedRegister { mnemonic: &'static str },
    /// Configured step budget ran out before `halt`.
    #[error("step limit of {limit} instructions exceeded")]
    StepLimitExceeded { limit: u64 },
    /// Character input/output failed.
    #[error("console error: {reason}")]
    ConsoleError { reason: String },
    /// File I/O error.
    #[error("io error on {path}: {source}")]
    IoError { path: String, source: String },
}
