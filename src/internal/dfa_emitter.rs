//! This module emits the C artifacts for the tokenizer DFA: a header with the token type
//! enumeration and the `match_pattern` declaration, and a source file containing the
//! goto-threaded state machine with longest-match backtracking.
//!
//! The artifacts are rendered through [std::fmt::Display] so the generator can stream them
//! straight into the output files.

use std::collections::BTreeMap;

use super::{dfa::Dfa, DfaStateID};

/// Renders `regex_dfa.h`: the token enumeration plus the matcher declaration.
pub(crate) struct DfaHeader<'a> {
    token_names: &'a [&'a str],
}

impl<'a> DfaHeader<'a> {
    /// Token names must be deduplicated and in declaration order.
    pub(crate) fn new(token_names: &'a [&'a str]) -> Self {
        Self { token_names }
    }
}

impl std::fmt::Display for DfaHeader<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "#ifndef REGEX_DFA_H")?;
        writeln!(f, "#define REGEX_DFA_H")?;
        writeln!(f)?;
        writeln!(f, "// Token type definitions")?;
        writeln!(f, "typedef enum {{")?;
        for name in self.token_names {
            writeln!(f, "    TOKEN_{},", name.to_uppercase())?;
        }
        writeln!(f, "    TOKEN_EOF,")?;
        writeln!(f, "    TOKEN_ERROR,")?;
        writeln!(f, "}} TokenType;")?;
        writeln!(f)?;
        writeln!(f, "// DFA matching function")?;
        writeln!(
            f,
            "const char* match_pattern(const char* input, TokenType* token_type);"
        )?;
        writeln!(f)?;
        writeln!(f, "#endif // REGEX_DFA_H")
    }
}

/// Renders `regex_dfa.c`: one labeled block per DFA state, dispatching on the current byte with
/// range-compressed predicates. Accepting states cache the position and token so the `DEAD`
/// label can backtrack to the longest accepted prefix.
pub(crate) struct DfaSource<'a> {
    dfa: &'a Dfa,
}

impl<'a> DfaSource<'a> {
    pub(crate) fn new(dfa: &'a Dfa) -> Self {
        Self { dfa }
    }
}

impl std::fmt::Display for DfaSource<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "#include \"regex_dfa.h\"")?;
        writeln!(f, "#include <stdio.h>")?;
        writeln!(f)?;
        writeln!(
            f,
            "const char* match_pattern(const char* input, TokenType* token_type) {{"
        )?;
        writeln!(f, "    const char* current = input;")?;
        writeln!(f, "    const char* last_accept = NULL;")?;
        writeln!(f, "    TokenType last_token = TOKEN_ERROR;")?;
        writeln!(f, "    char c;")?;
        writeln!(f)?;
        writeln!(f, "    goto STATE_{};", self.dfa.start())?;
        writeln!(f)?;

        for state in self.dfa.states() {
            writeln!(f, "STATE_{}:", state.id())?;
            if let Some(token) = state.token_type() {
                writeln!(f, "    last_accept = current;")?;
                writeln!(f, "    last_token = TOKEN_{};", token.to_uppercase())?;
            }
            writeln!(f, "    if (*current == '\\0') {{")?;
            writeln!(f, "        if (last_accept != NULL) {{")?;
            writeln!(f, "            *token_type = last_token;")?;
            writeln!(f, "            return current;")?;
            writeln!(f, "        }}")?;
            writeln!(f, "        *token_type = TOKEN_ERROR;")?;
            writeln!(f, "        return current;")?;
            writeln!(f, "    }}")?;
            writeln!(f, "    c = *current++;")?;

            // Group the outgoing bytes by target state.
            let mut groups: BTreeMap<DfaStateID, Vec<u8>> = BTreeMap::new();
            for (byte, target) in self.dfa.transitions_of(state.id()) {
                groups.entry(*target).or_default().push(*byte);
            }

            for (target, bytes) in &groups {
                let predicate = ranges(bytes)
                    .iter()
                    .map(|(lo, hi)| {
                        if lo == hi {
                            format!("c == {}", c_escape_char(*lo))
                        } else {
                            format!(
                                "(c >= {} && c <= {})",
                                c_escape_char(*lo),
                                c_escape_char(*hi)
                            )
                        }
                    })
                    .collect::<Vec<_>>()
                    .join(" || ");
                writeln!(f, "    if ({}) goto STATE_{};", predicate, target)?;
            }
            if groups.is_empty() {
                writeln!(f, "    goto DEAD;")?;
            } else {
                writeln!(f, "    else goto DEAD;")?;
            }
            writeln!(f)?;
        }

        writeln!(f, "DEAD:")?;
        writeln!(f, "    if (last_accept != NULL) {{")?;
        writeln!(f, "        *token_type = last_token;")?;
        writeln!(f, "        return last_accept;")?;
        writeln!(f, "    }}")?;
        writeln!(f, "    *token_type = TOKEN_ERROR;")?;
        writeln!(f, "    return NULL;")?;
        writeln!(f, "}}")
    }
}

/// Merge sorted bytes into maximal inclusive ranges.
fn ranges(bytes: &[u8]) -> Vec<(u8, u8)> {
    debug_assert!(bytes.windows(2).all(|w| w[0] < w[1]));
    let mut ranges: Vec<(u8, u8)> = Vec::new();
    for byte in bytes {
        match ranges.last_mut() {
            Some((_, end)) if *end + 1 == *byte => *end = *byte,
            _ => ranges.push((*byte, *byte)),
        }
    }
    ranges
}

/// Render a byte as an escaped C character literal.
fn c_escape_char(byte: u8) -> String {
    match byte {
        b'\\' => r"'\\'".to_string(),
        b'\'' => r"'\''".to_string(),
        b'"' => r#"'\"'"#.to_string(),
        0 => r"'\0'".to_string(),
        b'\n' => r"'\n'".to_string(),
        b'\t' => r"'\t'".to_string(),
        b'\r' => r"'\r'".to_string(),
        32..=126 => format!("'{}'", byte as char),
        _ => format!("'\\x{:02x}'", byte),
    }
}
