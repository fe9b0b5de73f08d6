//! Character I/O for `getc` and `putc`.

use crate::virtual_machine::errors::VMError;
use std::io::{self, Read, Write};

/// One-byte input and output used by the character operations.
///
/// `get_char` may block; it is the only point where a run waits on the outside
/// world.
pub trait Console {
    /// Reads the next input byte.
    fn get_char(&mut self) -> Result<u8, VMError>;
    /// Writes one byte and makes it visible immediately.
    fn put_char(&mut self, byte: u8) -> Result<(), VMError>;
}

/// Console backed by the process's stdin and stdout.
#[derive(Debug, Default)]
pub struct StdConsole;

impl StdConsole {
    pub fn new() -> Self {
        Self
    }
}

fn console_error(e: io::Error) -> VMError {
    VMError::ConsoleError {
        reason: e.to_string(),
    }
}

impl Console for StdConsole {
    fn get_char(&mut self) -> Result<u8, VMError> {
        let mut byte = [0u8; 1];
        match io::stdin().lock().read(&mut byte).map_err(console_error)? {
            0 => Err(VMError::ConsoleError {
                reason: "end of input".to_string(),
            }),
            _ => Ok(byte[0]),
        }
    }

    fn put_char(&mut self, byte: u8) -> Result<(), VMError> {
        let mut out = io::stdout().lock();
        out.write_all(&[byte]).map_err(console_error)?;
        out.flush().map_err(console_error)
    }
}
