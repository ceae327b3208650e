//! This module contains the character conditions used as edge labels during NFA construction.
//! A condition describes what a single transition matches and expands to a set of concrete bytes
//! from the 7-bit ASCII alphabet.

use std::collections::BTreeSet;

/// The exclusive upper bound of the alphabet. All expansions are subsets of 0..ALPHABET_SIZE.
pub(crate) const ALPHABET_SIZE: u16 = 128;

/// The kind of a named character class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ClassKind {
    /// `\d`, the decimal digits.
    Digit,
    /// `\w`, letters, digits and underscore.
    Word,
    /// `\s`, the whitespace characters.
    Space,
}

impl ClassKind {
    fn contains(&self, byte: u8) -> bool {
        match self {
            ClassKind::Digit => byte.is_ascii_digit(),
            ClassKind::Word => byte.is_ascii_alphanumeric() || byte == b'_',
            ClassKind::Space => matches!(byte, b' ' | b'\t' | b'\n' | b'\r' | 0x0b | 0x0c),
        }
    }
}

/// A condition on a single input byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum CharCondition {
    /// Matches exactly one byte.
    Literal(u8),
    /// Matches a byte from the set, or from its complement if negated.
    Set {
        /// The bytes of the set.
        bytes: BTreeSet<u8>,
        /// Negate the set against the ASCII universe.
        negated: bool,
    },
    /// `.`, every byte except the newline.
    Wildcard,
    /// A named class (`\d`, `\w`, `\s`).
    Class(ClassKind),
}

impl CharCondition {
    /// Check whether the condition matches the given byte.
    pub(crate) fn test(&self, byte: u8) -> bool {
        if byte as u16 >= ALPHABET_SIZE {
            return false;
        }
        match self {
            CharCondition::Literal(b) => *b == byte,
            CharCondition::Set { bytes, negated } => bytes.contains(&byte) != *negated,
            CharCondition::Wildcard => byte != b'\n',
            CharCondition::Class(kind) => kind.contains(byte),
        }
    }

    /// Expand the condition to the set of matching bytes.
    /// The result is always a subset of the 128-byte ASCII alphabet.
    pub(crate) fn expand(&self) -> BTreeSet<u8> {
        (0..ALPHABET_SIZE as u8).filter(|b| self.test(*b)).collect()
    }
}

impl std::fmt::Display for CharCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CharCondition::Literal(b) => write!(f, "{}", (*b as char).escape_default()),
            CharCondition::Set { bytes, negated } => {
                write!(f, "[{}", if *negated { "^" } else { "" })?;
                for b in bytes {
                    write!(f, "{}", (*b as char).escape_default())?;
                }
                write!(f, "]")
            }
            CharCondition::Wildcard => write!(f, "."),
            CharCondition::Class(ClassKind::Digit) => write!(f, "\\d"),
            CharCondition::Class(ClassKind::Word) => write!(f, "\\w"),
            CharCondition::Class(ClassKind::Space) => write!(f, "\\s"),
        }
    }
}
