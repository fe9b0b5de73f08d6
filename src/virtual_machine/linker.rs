//! Label resolution.
//!
//! Linking runs two passes over the object code. The first assigns every label
//! the image position of the next byte-producing element. The second drops the
//! label definitions and replaces each reference with its label's position.

use crate::virtual_machine::errors::VMError;
use crate::virtual_machine::program::{Element, Program};
use std::collections::HashMap;

/// Computes the image position of every label.
fn label_positions(elements: &[Element]) -> Result<HashMap<&str, usize>, VMError> {
    let mut labels = HashMap::new();
    let mut position = 0usize;

    for element in elements {
        if let Element::Label(name) = element
            && labels.insert(name.as_str(), position).is_some()
        {
            return Err(VMError::DuplicateLabel {
                label: name.clone(),
            });
        }
        if element.occupies_byte() {
            position += 1;
        }
    }

    Ok(labels)
}

/// Links object code into a program image.
pub fn link(elements: &[Element]) -> Result<Program, VMError> {
    let labels = label_positions(elements)?;
    let mut bytes = Vec::with_capacity(elements.len());

    for element in elements {
        match element {
            Element::Byte(b) => bytes.push(*b),
            Element::Label(_) => {}
            Element::Reference(name) => {
                let position = *labels
                    .get(name.as_str())
                    .ok_or_else(|| VMError::UndefinedLabel {
                        label: name.clone(),
                    })?;
                let byte = u8::try_from(position).map_err(|_| VMError::LabelOutOfRange {
                    label: name.clone(),
                    position,
                })?;
                bytes.push(byte);
            }
        }
    }

    Program::new(bytes)
}
