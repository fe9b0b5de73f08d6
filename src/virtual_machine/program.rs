//! Object code and linked program images.
//!
//! The assembler produces a sequence of [`Element`]s mixing raw bytes with label
//! definitions and label references. The linker resolves those into a
//! [`Program`], a flat byte image loaded into memory at address 0.

use crate::virtual_machine::errors::VMError;
use crate::virtual_machine::isa::MEMORY_SIZE;
use std::fmt;
use std::fs;
use std::path::Path;

/// One item of assembled (not yet linked) object code.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Element {
    /// Resolved byte.
    Byte(u8),
    /// Label definition; occupies no space in the image.
    Label(String),
    /// Operand naming a label, replaced by the label's position at link time.
    Reference(String),
}

impl Element {
    /// Returns `true` if this element occupies a byte of the final image.
    pub const fn occupies_byte(&self) -> bool {
        !matches!(self, Element::Label(_))
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Element::Byte(b) => write!(f, "{b}"),
            Element::Label(name) => write!(f, "{name}:"),
            Element::Reference(name) => write!(f, "@{name}"),
        }
    }
}

/// Linked, loadable program image.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Program {
    bytes: Vec<u8>,
}

impl Program {
    /// Wraps a flat image, rejecting images larger than memory.
    pub fn new(bytes: Vec<u8>) -> Result<Self, VMError> {
        if bytes.len() > MEMORY_SIZE {
            return Err(VMError::ProgramTooLarge {
                size: bytes.len(),
                capacity: MEMORY_SIZE,
            });
        }
        Ok(Self { bytes })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Reads a raw image file written by [`Program::write_file`].
    pub fn read_file<P: AsRef<Path>>(path: P) -> Result<Self, VMError> {
        let path_ref = path.as_ref();
        let bytes = fs::read(path_ref).map_err(|e| VMError::IoError {
            path: path_ref.display().to_string(),
            source: e.to_string(),
        })?;
        Self::new(bytes)
    }

    /// Writes the image verbatim, with no header.
    pub fn write_file<P: AsRef<Path>>(&self, path: P) -> Result<(), VMError> {
        let path_ref = path.as_ref();
        fs::write(path_ref, &self.bytes).map_err(|e| VMError::IoError {
            path: path_ref.display().to_string(),
            source: e.to_string(),
        })
    }
}
