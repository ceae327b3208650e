//! Module with the lexer specification types.
//! A lexer specification is an ordered list of token rules plus a whitespace-skipping flag. The
//! order of the rules is significant: lower indices have higher priority when several rules
//! match input of the same length.

use serde::{Deserialize, Serialize};

use crate::Result;

/// A single token rule: a token name and the regex pattern that matches it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRule {
    /// The token name. It becomes the `TOKEN_<NAME>` enumerator in the emitted C code.
    pub name: String,
    /// The regex pattern of the rule.
    pub pattern: String,
}

impl TokenRule {
    /// Create a new token rule.
    pub fn new<S: Into<String>>(name: S, pattern: S) -> Self {
        Self {
            name: name.into(),
            pattern: pattern.into(),
        }
    }
}

/// The lexer specification consumed by the generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LexerSpec {
    /// The token rules in declaration order.
    pub rules: Vec<TokenRule>,
    /// Whether the generated lexer skips blanks and tabs between tokens.
    #[serde(default = "default_skip_whitespace")]
    pub skip_whitespace: bool,
}

fn default_skip_whitespace() -> bool {
    true
}

impl LexerSpec {
    /// Create a new lexer specification from rules.
    pub fn new(rules: Vec<TokenRule>) -> Self {
        Self {
            rules,
            skip_whitespace: true,
        }
    }

    /// Read a lexer specification from a JSON reader.
    pub fn from_reader<R: std::io::Read>(reader: R) -> Result<Self> {
        serde_json::from_reader(reader).map_err(|e| {
            crate::LlgenError::new(crate::LlgenErrorKind::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("malformed lexer specification: {}", e),
            )))
        })
    }

    /// The token names in declaration order with duplicates removed.
    /// Rules sharing a name share one emitted enumerator.
    pub fn token_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for rule in &self.rules {
            if !names.contains(&rule.name.as_str()) {
                names.push(&rule.name);
            }
        }
        names
    }
}
