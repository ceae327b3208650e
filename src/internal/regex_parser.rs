//! This module contains the regex parser.
//! It turns a pattern of the supported dialect into an NFA fragment via the Thompson
//! constructions, using recursive descent with one token of lookahead.
//!
//! The dialect is 7-bit ASCII only: literals, `.`, escapes (`\n`, `\t`, `\r`, the classes `\d`,
//! `\w`, `\s`, any other escape is the literal of its second character), bracketed classes with
//! ranges and negation, grouping, alternation and the `*`, `+`, `?` operators.

use std::collections::BTreeSet;

use crate::{LlgenError, LlgenErrorKind, Result};

use super::{
    char_condition::{CharCondition, ClassKind},
    nfa::{Nfa, NfaFragment},
};

/// A token of the regex surface syntax.
#[derive(Debug, Clone, PartialEq, Eq)]
enum RegexToken {
    Char(u8),
    Escape(u8),
    Class { negated: bool, body: Vec<u8> },
    LParen,
    RParen,
    Star,
    Plus,
    Question,
    Alt,
    Dot,
}

/// Recursive descent parser for the regex dialect. One instance parses one pattern.
pub(crate) struct RegexParser<'a> {
    pattern: &'a str,
    tokens: Vec<(RegexToken, usize)>,
    pos: usize,
}

impl<'a> RegexParser<'a> {
    /// Parse the pattern into a fragment of the given NFA arena.
    /// The fragment's end state is its single accepting state.
    pub(crate) fn parse(pattern: &'a str, nfa: &mut Nfa) -> Result<NfaFragment> {
        let mut parser = RegexParser {
            pattern,
            tokens: Vec::new(),
            pos: 0,
        };
        parser.tokenize()?;
        if parser.tokens.is_empty() {
            return Err(parser.error(0, "unexpected end of pattern"));
        }
        let fragment = parser.regex(nfa)?;
        if let Some((token, position)) = parser.peek_spanned() {
            debug_assert_eq!(*token, RegexToken::RParen);
            return Err(parser.error(*position, "unbalanced parenthesis"));
        }
        Ok(fragment)
    }

    fn error(&self, position: usize, message: &str) -> LlgenError {
        LlgenError::new(LlgenErrorKind::RegexSyntax {
            pattern: self.pattern.to_string(),
            position,
            message: message.to_string(),
        })
    }

    /// Split the pattern into tokens. Escapes and bracketed classes are scanned here so that the
    /// parser proper only ever needs one token of lookahead.
    fn tokenize(&mut self) -> Result<()> {
        let bytes = self.pattern.as_bytes();
        let mut i = 0;
        while i < bytes.len() {
            let byte = bytes[i];
            if byte >= 0x80 {
                return Err(self.error(i, "non-ASCII byte in pattern"));
            }
            let token = match byte {
                b'\\' => {
                    i += 1;
                    if i >= bytes.len() {
                        return Err(self.error(i - 1, "trailing backslash"));
                    }
                    RegexToken::Escape(bytes[i])
                }
                b'*' => RegexToken::Star,
                b'+' => RegexToken::Plus,
                b'?' => RegexToken::Question,
                b'|' => RegexToken::Alt,
                b'(' => RegexToken::LParen,
                b')' => RegexToken::RParen,
                b'.' => RegexToken::Dot,
                b'[' => {
                    let open = i;
                    let mut j = i + 1;
                    let negated = j < bytes.len() && bytes[j] == b'^';
                    if negated {
                        j += 1;
                    }
                    let mut body = Vec::new();
                    while j < bytes.len() && bytes[j] != b']' {
                        if bytes[j] >= 0x80 {
                            return Err(self.error(j, "non-ASCII byte in pattern"));
                        }
                        if bytes[j] == b'\\' {
                            j += 1;
                            if j < bytes.len() {
                                body.push(b'\\');
                                body.push(bytes[j]);
                            }
                        } else {
                            body.push(bytes[j]);
                        }
                        j += 1;
                    }
                    if j >= bytes.len() {
                        return Err(self.error(open, "unclosed character class"));
                    }
                    i = j;
                    RegexToken::Class { negated, body }
                }
                _ => RegexToken::Char(byte),
            };
            self.tokens.push((token, i));
            i += 1;
        }
        Ok(())
    }

    fn peek_spanned(&self) -> Option<&(RegexToken, usize)> {
        self.tokens.get(self.pos)
    }

    fn peek(&self) -> Option<&RegexToken> {
        self.peek_spanned().map(|(token, _)| token)
    }

    fn consume(&mut self) -> Option<(RegexToken, usize)> {
        let spanned = self.tokens.get(self.pos).cloned();
        if spanned.is_some() {
            self.pos += 1;
        }
        spanned
    }

    /// regex := term ('|' term)*
    fn regex(&mut self, nfa: &mut Nfa) -> Result<NfaFragment> {
        let mut alternatives = vec![self.term(nfa)?];
        while self.peek() == Some(&RegexToken::Alt) {
            self.consume();
            alternatives.push(self.term(nfa)?);
        }
        if alternatives.len() == 1 {
            Ok(alternatives[0])
        } else {
            Ok(nfa.union(&alternatives))
        }
    }

    /// term := factor*
    /// An empty term (directly before '|' or ')') matches the empty string.
    fn term(&mut self, nfa: &mut Nfa) -> Result<NfaFragment> {
        let mut fragment: Option<NfaFragment> = None;
        while let Some(token) = self.peek() {
            if matches!(token, RegexToken::Alt | RegexToken::RParen) {
                break;
            }
            let factor = self.factor(nfa)?;
            fragment = Some(match fragment {
                Some(prev) => nfa.concat(prev, factor),
                None => factor,
            });
        }
        Ok(fragment.unwrap_or_else(|| nfa.epsilon_fragment()))
    }

    /// factor := atom ('*' | '+' | '?')?
    fn factor(&mut self, nfa: &mut Nfa) -> Result<NfaFragment> {
        let atom = self.atom(nfa)?;
        match self.peek() {
            Some(RegexToken::Star) => {
                self.consume();
                Ok(nfa.star(atom))
            }
            Some(RegexToken::Plus) => {
                self.consume();
                Ok(nfa.plus(atom))
            }
            Some(RegexToken::Question) => {
                self.consume();
                Ok(nfa.optional(atom))
            }
            _ => Ok(atom),
        }
    }

    /// atom := '(' regex ')' | '.' | escape | class | literalChar
    fn atom(&mut self, nfa: &mut Nfa) -> Result<NfaFragment> {
        let end = self.pattern.len();
        let (token, position) = self
            .consume()
            .ok_or_else(|| self.error(end, "unexpected end of pattern"))?;
        match token {
            RegexToken::LParen => {
                let fragment = self.regex(nfa)?;
                match self.consume() {
                    Some((RegexToken::RParen, _)) => Ok(fragment),
                    _ => Err(self.error(position, "unbalanced parenthesis")),
                }
            }
            RegexToken::Dot => Ok(nfa.from_condition(&CharCondition::Wildcard)),
            RegexToken::Escape(byte) => Ok(nfa.from_condition(&Self::escape_condition(byte))),
            RegexToken::Class { negated, body } => {
                Ok(nfa.from_condition(&Self::class_condition(negated, &body)))
            }
            RegexToken::Char(byte) => Ok(nfa.from_condition(&CharCondition::Literal(byte))),
            // A quantifier with nothing to repeat is taken literally.
            RegexToken::Star => Ok(nfa.from_condition(&CharCondition::Literal(b'*'))),
            RegexToken::Plus => Ok(nfa.from_condition(&CharCondition::Literal(b'+'))),
            RegexToken::Question => Ok(nfa.from_condition(&CharCondition::Literal(b'?'))),
            RegexToken::Alt | RegexToken::RParen => {
                unreachable!("term never dispatches '|' or ')' to atom")
            }
        }
    }

    fn escape_condition(byte: u8) -> CharCondition {
        match byte {
            b'n' => CharCondition::Literal(b'\n'),
            b't' => CharCondition::Literal(b'\t'),
            b'r' => CharCondition::Literal(b'\r'),
            b'd' => CharCondition::Class(ClassKind::Digit),
            b'w' => CharCondition::Class(ClassKind::Word),
            b's' => CharCondition::Class(ClassKind::Space),
            _ => CharCondition::Literal(byte),
        }
    }

    /// Expand a class body into a byte set. Ranges are inclusive by byte value; embedded class
    /// escapes union their expansion; other escapes contribute their second character.
    fn class_condition(negated: bool, body: &[u8]) -> CharCondition {
        let mut bytes = BTreeSet::new();
        let mut i = 0;
        while i < body.len() {
            let byte = body[i];
            if byte == b'\\' {
                i += 1;
                if i < body.len() {
                    match body[i] {
                        b'd' => bytes.extend(CharCondition::Class(ClassKind::Digit).expand()),
                        b'w' => bytes.extend(CharCondition::Class(ClassKind::Word).expand()),
                        b's' => bytes.extend(CharCondition::Class(ClassKind::Space).expand()),
                        b'n' => {
                            bytes.insert(b'\n');
                        }
                        b't' => {
                            bytes.insert(b'\t');
                        }
                        b'r' => {
                            bytes.insert(b'\r');
                        }
                        other => {
                            bytes.insert(other);
                        }
                    }
                }
            } else if i + 2 < body.len() && body[i + 1] == b'-' {
                bytes.extend(byte..=body[i + 2]);
                i += 2;
            } else {
                bytes.insert(byte);
            }
            i += 1;
        }
        CharCondition::Set { bytes, negated }
    }
}
