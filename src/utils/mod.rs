//! Shared helpers: logging and test support.

pub mod log;
pub mod test_utils;
