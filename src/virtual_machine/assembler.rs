//! Assembly language parser and object code encoder.
//!
//! Converts human-readable assembly source into [`Element`]s, which the
//! [`linker`](super::linker) turns into a loadable [`Program`].
//!
//! # Syntax
//!
//! ```text
//! label: mnemonic operand1 operand2  # optional comment
//! ```
//!
//! - Mnemonics are lowercase (e.g., `mov`, `add`, `jnz`)
//! - Registers and flags are named (`a b c d ip sb sp`, `cf pf zf sf of`)
//! - Immediates are decimal integers in `[-128, 127]` (e.g., `42`, `-1`)
//! - Character literals are single-quoted (e.g., `'h'`, `' '`)
//! - Any other identifier operand is a label reference
//! - Comments start with `#`
//! - Commas between operands are optional
//!
//! The operand types select the opcode: `mov 3 b` assembles as `movir`,
//! `mov b c` as `movrr` with both registers packed into one byte.

use crate::error;
use crate::virtual_machine::errors::VMError;
use crate::virtual_machine::isa::{Opcode, Shape, Symbol};
use crate::virtual_machine::linker::link;
use crate::virtual_machine::operand::pack_symbols;
use crate::virtual_machine::program::{Element, Program};
use std::fmt::Write;
use std::fs;
use std::path::Path;

const COMMENT_CHAR: char = '#';
const LABEL_SUFFIX: char = ':';
const CHAR_QUOTE: char = '\'';

/// Formats a compiler-style diagnostic for assembly failures.
pub fn render_assembly_diagnostic(
    file: &str,
    source: &str,
    line: usize,
    offset: usize,
    message: &str,
) -> String {
    let mut diag = String::new();
    let _ = writeln!(diag, "error: {message}");
    let _ = writeln!(diag, " --> {file}:{line}:{offset}");

    if let Some(raw_line) = source.lines().nth(line.saturating_sub(1)) {
        let line_text = raw_line.trim_end_matches('\r');
        let underline = " ".repeat(offset.saturating_sub(1));
        let _ = writeln!(diag, "     |");
        let _ = writeln!(diag, "{:>4} | {}", line, line_text);
        let _ = writeln!(diag, "     | {}^", underline);
    }

    diag
}

/// Emit a diagnostic through the error log for assembly errors.
fn log_assembly_error(file: &str, source: &str, err: &VMError) {
    if let VMError::AssemblyError {
        line,
        offset,
        source: message,
    } = err
    {
        error!(
            "{}",
            render_assembly_diagnostic(file, source, *line, *offset, message)
        );
    } else {
        error!("{err}");
    }
}

#[derive(Debug, Clone)]
struct Token<'a> {
    text: &'a str,
    /// 1-based column offset in the line.
    offset: usize,
}

/// An error tied to the column of the token that caused it.
struct LineError {
    offset: usize,
    error: VMError,
}

impl LineError {
    fn at(token: &Token, error: VMError) -> Self {
        Self {
            offset: token.offset,
            error,
        }
    }
}

/// Tokenize a single line of assembly.
///
/// Rules:
/// - `#` starts a comment
/// - whitespace and commas separate tokens
/// - `:` is a token on its own
/// - a character literal spans from its opening quote to the next quote at
///   least one character later, so `' '`, `','` and `'''` are single tokens
fn tokenize(line: &str) -> Result<Vec<Token<'_>>, LineError> {
    let mut out = Vec::with_capacity(4);
    let mut start: Option<usize> = None;
    let mut chars = line.char_indices();

    fn flush<'a>(line: &'a str, out: &mut Vec<Token<'a>>, start: &mut Option<usize>, end: usize) {
        if let Some(s) = start.take() {
            out.push(Token {
                text: &line[s..end],
                offset: s + 1,
            });
        }
    }

    while let Some((i, c)) = chars.next() {
        match c {
            COMMENT_CHAR => {
                flush(line, &mut out, &mut start, i);
                return Ok(out);
            }
            ' ' | '\t' | ',' | '\r' => flush(line, &mut out, &mut start, i),
            LABEL_SUFFIX => {
                flush(line, &mut out, &mut start, i);
                out.push(Token {
                    text: &line[i..i + 1],
                    offset: i + 1,
                });
            }
            CHAR_QUOTE => {
                if start.is_none() {
                    start = Some(i);
                }
                // The quoted character itself, whatever it is.
                if chars.next().is_none() {
                    return Err(LineError {
                        offset: i + 1,
                        error: VMError::UnterminatedLiteral,
                    });
                }
                loop {
                    match chars.next() {
                        Some((_, CHAR_QUOTE)) => break,
                        Some(_) => {}
                        None => {
                            return Err(LineError {
                                offset: i + 1,
                                error: VMError::UnterminatedLiteral,
                            });
                        }
                    }
                }
            }
            _ => {
                if start.is_none() {
                    start = Some(i);
                }
            }
        }
    }

    flush(line, &mut out, &mut start, line.len());
    Ok(out)
}

/// Checks if a token is a bare identifier (`[A-Za-z_][A-Za-z0-9_]*`).
fn is_identifier(tok: &str) -> bool {
    let mut chars = tok.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Checks if a token looks like a decimal literal (`42`, `-7`).
fn is_decimal(tok: &str) -> bool {
    let digits = tok.strip_prefix('-').unwrap_or(tok);
    !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
}

/// Parse a decimal immediate in `[-128, 127]`
pub(crate) fn parse_immediate(tok: &str) -> Result<i8, VMError> {
    tok.parse::<i8>()
        .map_err(|_| VMError::ImmediateOutOfRange {
            token: tok.to_string(),
        })
}

/// Parse a character literal `'c'` into its ASCII code.
pub(crate) fn parse_char_literal(tok: &str) -> Result<i8, VMError> {
    let malformed = || VMError::InvalidCharLiteral {
        token: tok.to_string(),
    };
    let inner = tok
        .strip_prefix(CHAR_QUOTE)
        .and_then(|t| t.strip_suffix(CHAR_QUOTE))
        .ok_or_else(malformed)?;
    let mut chars = inner.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii() => Ok(c as u8 as i8),
        _ => Err(malformed()),
    }
}

/// Encodes one operand token.
///
/// Decimal literals and character literals become bytes, register and flag
/// names become their symbol index. Any other identifier becomes a
/// [`Element::Reference`] when `allow_labels` is set, and an unknown-symbol
/// error otherwise.
pub fn encode_operand(token: &str, allow_labels: bool) -> Result<Element, VMError> {
    if is_decimal(token) {
        return Ok(Element::Byte(parse_immediate(token)? as u8));
    }
    if token.starts_with(CHAR_QUOTE) {
        return Ok(Element::Byte(parse_char_literal(token)? as u8));
    }
    if let Ok(symbol) = Symbol::from_name(token) {
        return Ok(Element::Byte(symbol.index()));
    }
    if !is_identifier(token) {
        return Err(VMError::InvalidOperand {
            token: token.to_string(),
        });
    }
    if allow_labels {
        Ok(Element::Reference(token.to_string()))
    } else {
        Err(VMError::UnknownSymbol(token.to_string()))
    }
}

/// Classifies an operand token: `'r'` for register and flag names, `'i'` otherwise.
pub fn operand_type(token: &str) -> char {
    if Symbol::is_name(token) { 'r' } else { 'i' }
}

/// Encodes a tokenized instruction (mnemonic first).
fn encode_instruction_tokens(
    tokens: &[Token],
    allow_labels: bool,
) -> Result<Vec<Element>, LineError> {
    let Some((mnemonic, operands)) = tokens.split_first() else {
        return Ok(Vec::new());
    };

    let shape_code: String = operands.iter().map(|t| operand_type(t.text)).collect();
    let name = format!("{}{}", mnemonic.text, shape_code);
    let unknown = || LineError::at(mnemonic, VMError::UnknownOperation { name: name.clone() });

    let shape = Shape::from_code(&shape_code).ok_or_else(unknown)?;
    let opcode = Opcode::from_name(&name).ok_or_else(unknown)?;

    let mut out = Vec::with_capacity(1 + shape.operand_len());
    out.push(Element::Byte(opcode as u8));

    if shape == Shape::Rr {
        let first = Symbol::from_name(operands[0].text)
            .map_err(|e| LineError::at(&operands[0], e))?;
        let second = Symbol::from_name(operands[1].text)
            .map_err(|e| LineError::at(&operands[1], e))?;
        out.push(Element::Byte(pack_symbols(first, second)));
    } else {
        for token in operands {
            out.push(encode_operand(token.text, allow_labels).map_err(|e| LineError::at(token, e))?);
        }
    }

    Ok(out)
}

/// Encodes a tokenized line: an optional `label:` followed by an optional instruction.
fn encode_line_tokens(tokens: &[Token]) -> Result<Vec<Element>, LineError> {
    let Some(sep) = tokens.iter().position(|t| t.text == ":") else {
        return encode_instruction_tokens(tokens, true);
    };

    let label = match &tokens[..sep] {
        [] => return Err(LineError::at(&tokens[sep], VMError::EmptyLabel)),
        [label] => label,
        [_, extra, ..] => {
            return Err(LineError::at(
                extra,
                VMError::InvalidLabel {
                    label: tokens[..sep]
                        .iter()
                        .map(|t| t.text)
                        .collect::<Vec<_>>()
                        .join(" "),
                },
            ));
        }
    };

    if !is_identifier(label.text) || Symbol::is_name(label.text) {
        return Err(LineError::at(
            label,
            VMError::InvalidLabel {
                label: label.text.to_string(),
            },
        ));
    }

    let mut out = vec![Element::Label(label.text.to_string())];
    out.extend(encode_instruction_tokens(&tokens[sep + 1..], true)?);
    Ok(out)
}

/// Encodes a single instruction line into bytes.
///
/// Label references are rejected: every operand must be a literal, a register
/// or a flag.
pub fn encode_instruction(line: &str) -> Result<Vec<u8>, VMError> {
    let tokens = tokenize(line).map_err(|e| e.error)?;
    encode_instruction_tokens(&tokens, false)
        .map_err(|e| e.error)?
        .into_iter()
        .map(|element| match element {
            Element::Byte(b) => Ok(b),
            other => Err(VMError::InvalidOperand {
                token: other.to_string(),
            }),
        })
        .collect()
}

/// Encodes one source line into object code, with label support.
pub fn encode_line(line: &str) -> Result<Vec<Element>, VMError> {
    let tokens = tokenize(line).map_err(|e| e.error)?;
    encode_line_tokens(&tokens).map_err(|e| e.error)
}

/// Assembles a full source string into object code.
///
/// Blank and comment-only lines are skipped. Errors carry the 1-based line
/// and column of the offending token.
pub fn assemble(source: &str) -> Result<Vec<Element>, VMError> {
    let mut out = Vec::new();

    for (line_no, line) in source.lines().enumerate() {
        let located = |e: LineError| VMError::AssemblyError {
            line: line_no + 1,
            offset: e.offset,
            source: e.error.to_string(),
        };
        let tokens = tokenize(line).map_err(located)?;
        if tokens.is_empty() {
            continue;
        }
        out.extend(encode_line_tokens(&tokens).map_err(located)?);
    }

    Ok(out)
}

/// Assembles and links a source string into a loadable program.
pub fn assemble_source(source: &str) -> Result<Program, VMError> {
    link(&assemble(source)?)
}

/// Convenience: assemble and link directly from a file path.
///
/// Logs a compiler-style diagnostic on assembly failure.
pub fn assemble_file<P: AsRef<Path>>(path: P) -> Result<Program, VMError> {
    let path_ref = path.as_ref();
    let source = fs::read_to_string(path_ref).map_err(|e| VMError::IoError {
        path: path_ref.display().to_string(),
        source: e.to_string(),
    })?;

    let result = assemble_source(&source);
    if let Err(err) = &result {
        log_assembly_error(&path_ref.display().to_string(), &source, err);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::virtual_machine::isa::{Flag, Register};

    fn texts(line: &str) -> Vec<&str> {
        tokenize(line)
            .unwrap_or_else(|_| panic!("tokenize failed"))
            .into_iter()
            .map(|t| t.text)
            .collect()
    }

    #[test]
    fn tokenize_splits_on_spaces_and_commas() {
        assert_eq!(texts("mov 3, b"), vec!["mov", "3", "b"]);
        assert_eq!(texts("  add\ta  b # comment"), vec!["add", "a", "b"]);
        assert!(texts("# only a comment").is_empty());
    }

    #[test]
    fn tokenize_keeps_quoted_separators() {
        assert_eq!(texts("mov ' ' b"), vec!["mov", "' '", "b"]);
        assert_eq!(texts("putc '#'"), vec!["putc", "'#'"]);
        assert_eq!(texts("putc ':'"), vec!["putc", "':'"]);
        assert_eq!(texts("putc '''"), vec!["putc", "'''"]);
    }

    #[test]
    fn tokenize_splits_label_separator() {
        assert_eq!(texts("loop: jmp loop"), vec!["loop", ":", "jmp", "loop"]);
        assert_eq!(texts("end:"), vec!["end", ":"]);
    }

    #[test]
    fn tokenize_offsets_are_one_based() {
        let tokens = tokenize("mov  7").unwrap_or_else(|_| panic!("tokenize failed"));
        assert_eq!(tokens[0].offset, 1);
        assert_eq!(tokens[1].offset, 6);
    }

    #[test]
    fn tokenize_unterminated_literal() {
        assert!(matches!(
            tokenize("putc 'a").map_err(|e| e.error),
            Err(VMError::UnterminatedLiteral)
        ));
        assert!(matches!(
            tokenize("putc '").map_err(|e| e.error),
            Err(VMError::UnterminatedLiteral)
        ));
    }

    #[test]
    fn encode_operand_literals() {
        assert_eq!(encode_operand("42", false).unwrap(), Element::Byte(42));
        assert_eq!(encode_operand("-1", false).unwrap(), Element::Byte(0xFF));
        assert_eq!(encode_operand("'a'", false).unwrap(), Element::Byte(97));
        assert_eq!(encode_operand("a", false).unwrap(), Element::Byte(0));
        assert_eq!(encode_operand("zf", false).unwrap(), Element::Byte(9));
    }

    #[test]
    fn encode_operand_range() {
        assert_eq!(encode_operand("127", false).unwrap(), Element::Byte(127));
        assert_eq!(encode_operand("-128", false).unwrap(), Element::Byte(0x80));
        assert!(matches!(
            encode_operand("128", false),
            Err(VMError::ImmediateOutOfRange { .. })
        ));
        assert!(matches!(
            encode_operand("-129", false),
            Err(VMError::ImmediateOutOfRange { .. })
        ));
        assert!(matches!(
            encode_operand("99999999999999999999", false),
            Err(VMError::ImmediateOutOfRange { .. })
        ));
    }

    #[test]
    fn encode_operand_malformed_char() {
        for tok in ["'ab'", "''", "'a", "'é'"] {
            assert!(
                matches!(encode_operand(tok, false), Err(VMError::InvalidCharLiteral { .. })),
                "{tok}"
            );
        }
    }

    #[test]
    fn encode_operand_labels() {
        assert_eq!(
            encode_operand("loop", true).unwrap(),
            Element::Reference("loop".into())
        );
        assert!(matches!(
            encode_operand("loop", false),
            Err(VMError::UnknownSymbol(ref n)) if n == "loop"
        ));
        assert!(matches!(
            encode_operand("1x", true),
            Err(VMError::InvalidOperand { .. })
        ));
    }

    #[test]
    fn operand_types() {
        assert_eq!(operand_type("b"), 'r');
        assert_eq!(operand_type("pf"), 'r');
        assert_eq!(operand_type("12"), 'i');
        assert_eq!(operand_type("'x'"), 'i');
        assert_eq!(operand_type("somewhere"), 'i');
    }

    #[test]
    fn encode_bare_instruction() {
        assert_eq!(encode_instruction("halt").unwrap(), vec![Opcode::Halt as u8]);
        assert_eq!(encode_instruction("putc").unwrap(), vec![Opcode::Putc as u8]);
    }

    #[test]
    fn encode_selects_opcode_by_operand_types() {
        assert_eq!(
            encode_instruction("mov 2").unwrap(),
            vec![Opcode::MovI as u8, 2]
        );
        assert_eq!(
            encode_instruction("mov 2 b").unwrap(),
            vec![Opcode::MovIr as u8, 2, 1]
        );
        assert_eq!(
            encode_instruction("store 3 b").unwrap(),
            vec![Opcode::StoreIr as u8, 3, 1]
        );
        assert_eq!(
            encode_instruction("store b 3").unwrap(),
            vec![Opcode::StoreRi as u8, 1, 3]
        );
    }

    #[test]
    fn encode_packs_register_pairs() {
        let b = Symbol::Register(Register::B).index();
        let c = Symbol::Register(Register::C).index();
        assert_eq!(
            encode_instruction("mov b c").unwrap(),
            vec![Opcode::MovRr as u8, b << 4 | c]
        );
        let sf = Symbol::Flag(Flag::Sign).index();
        assert_eq!(
            encode_instruction("cmp sf d").unwrap(),
            vec![Opcode::CmpRr as u8, sf << 4 | 3]
        );
    }

    #[test]
    fn encode_unknown_operation() {
        assert!(matches!(
            encode_instruction("fly"),
            Err(VMError::UnknownOperation { ref name }) if name == "fly"
        ));
        // `test` only exists with a register operand.
        assert!(matches!(
            encode_instruction("test 3"),
            Err(VMError::UnknownOperation { ref name }) if name == "testi"
        ));
        assert!(matches!(
            encode_instruction("mov 1 2 3"),
            Err(VMError::UnknownOperation { .. })
        ));
    }

    #[test]
    fn encode_instruction_rejects_labels() {
        assert!(matches!(
            encode_instruction("jmp start"),
            Err(VMError::UnknownSymbol(_))
        ));
    }

    #[test]
    fn encode_line_with_label() {
        assert_eq!(
            encode_line("start: jmp start").unwrap(),
            vec![
                Element::Label("start".into()),
                Element::Byte(Opcode::JmpI as u8),
                Element::Reference("start".into()),
            ]
        );
        assert_eq!(
            encode_line("done:").unwrap(),
            vec![Element::Label("done".into())]
        );
    }

    #[test]
    fn encode_line_label_errors() {
        assert!(matches!(encode_line(": halt"), Err(VMError::EmptyLabel)));
        assert!(matches!(
            encode_line("sp: halt"),
            Err(VMError::InvalidLabel { .. })
        ));
        assert!(matches!(
            encode_line("two words: halt"),
            Err(VMError::InvalidLabel { .. })
        ));
        assert!(matches!(
            encode_line("9lives: halt"),
            Err(VMError::InvalidLabel { .. })
        ));
    }

    #[test]
    fn assemble_empty_source() {
        assert!(assemble("").unwrap().is_empty());
    }

    #[test]
    fn assemble_comments_and_blank_lines() {
        let source = format!(
            r#"
            {COMMENT_CHAR} this is a comment

            {COMMENT_CHAR} another comment
        "#
        );
        assert!(assemble(&source).unwrap().is_empty());
    }

    #[test]
    fn assemble_flattens_in_order() {
        let elements = assemble("mov 'h'\nputc # say h\nhalt").unwrap();
        assert_eq!(
            elements,
            vec![
                Element::Byte(Opcode::MovI as u8),
                Element::Byte(b'h'),
                Element::Byte(Opcode::Putc as u8),
                Element::Byte(Opcode::Halt as u8),
            ]
        );
    }

    #[test]
    fn assemble_error_has_location() {
        let err = assemble("halt\n  mov 300").unwrap_err();
        assert!(matches!(
            err,
            VMError::AssemblyError { line: 2, offset: 7, ref source } if source.contains("out of range")
        ));
    }

    #[test]
    fn assemble_empty_label_is_error() {
        let err = assemble("halt\n: mov 1").unwrap_err();
        assert!(matches!(
            err,
            VMError::AssemblyError { line: 2, offset: 1, ref source } if source.contains("empty label")
        ));
    }

    #[test]
    fn assemble_source_links() {
        let program = assemble_source("start: jmp start").unwrap();
        assert_eq!(program.bytes(), &[Opcode::JmpI as u8, 0]);
    }

    #[test]
    fn diagnostic_points_at_column() {
        let diag = render_assembly_diagnostic("prog.asm", "halt\nmov 300", 2, 5, "bad");
        assert!(diag.starts_with("error: bad\n --> prog.asm:2:5\n"));
        assert!(diag.contains("   2 | mov 300"));
        assert!(diag.contains("     |     ^"));
    }

    #[test]
    fn assemble_file_missing() {
        assert!(matches!(
            assemble_file("/nonexistent/octet-vm/prog.asm"),
            Err(VMError::IoError { .. })
        ));
    }
}
