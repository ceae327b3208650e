//! Module with the grammar model and its DSL parser.
//! A grammar maps non-terminal names to ordered production lists; the first rule added is the
//! start symbol. Alternatives can carry action code that the parser emitter injects verbatim
//! into the generated C functions.
//!
//! The DSL syntax:
//! - `@` terminates a rule,
//! - `#` begins a line comment,
//! - `LHS : alt1 | alt2 | ...` defines a rule,
//! - `symbols $ action-text` binds action text to an alternative,
//! - `ε` or `epsilon` denotes the empty production.

use std::collections::BTreeSet;

use log::trace;
use rustc_hash::FxHashMap;

use crate::{LlgenError, LlgenErrorKind, Result};

/// The symbol denoting the empty production.
pub const EPSILON: &str = "ε";

/// The end-of-input marker used in FOLLOW sets and the emitted parser.
pub const END_MARKER: &str = "EOF";

/// A context-free grammar with per-alternative semantic actions.
#[derive(Debug, Clone, Default)]
pub struct Grammar {
    /// Non-terminals in declaration order. The first one is the start symbol.
    non_terminals: Vec<String>,
    /// Ordered productions per non-terminal.
    productions: FxHashMap<String, Vec<Vec<String>>>,
    /// Action lines keyed by (non-terminal, production).
    actions: FxHashMap<(String, Vec<String>), Vec<String>>,
}

impl Grammar {
    /// Parse the grammar DSL into a grammar.
    pub fn parse_dsl(text: &str) -> Result<Self> {
        let mut grammar = Grammar::default();

        // Strip comment lines first so a comment between two rules cannot swallow the rule
        // that follows it inside the same '@' chunk.
        let without_comments = text
            .lines()
            .filter(|line| !line.trim_start().starts_with('#'))
            .collect::<Vec<_>>()
            .join("\n");

        for chunk in without_comments.split('@') {
            let chunk = chunk.trim();
            if chunk.is_empty() {
                continue;
            }
            let (lhs, rhs) = chunk.split_once(':').ok_or_else(|| {
                grammar_error(format!("rule without ':' separator: '{}'", chunk))
            })?;
            let lhs = lhs.trim();
            if lhs.is_empty() || lhs.split_whitespace().count() != 1 {
                return Err(grammar_error(format!(
                    "left-hand side must be a single symbol: '{}'",
                    chunk
                )));
            }
            if !grammar.productions.contains_key(lhs) {
                grammar.non_terminals.push(lhs.to_string());
                grammar.productions.insert(lhs.to_string(), Vec::new());
            }

            for alternative in rhs.split('|') {
                let (symbols_text, action_text) = match alternative.split_once('$') {
                    Some((symbols, action)) => (symbols, Some(action)),
                    None => (alternative, None),
                };
                let symbols_text = symbols_text.trim();
                let production: Vec<String> =
                    if symbols_text.is_empty() || symbols_text == EPSILON || symbols_text == "epsilon" {
                        vec![EPSILON.to_string()]
                    } else {
                        symbols_text.split_whitespace().map(String::from).collect()
                    };
                trace!("{} -> {}", lhs, production.join(" "));
                if let Some(action_text) = action_text {
                    let lines = split_action_lines(action_text);
                    if !lines.is_empty() {
                        grammar
                            .actions
                            .insert((lhs.to_string(), production.clone()), lines);
                    }
                }
                grammar
                    .productions
                    .get_mut(lhs)
                    .expect("rule was just inserted")
                    .push(production);
            }
        }

        if grammar.non_terminals.is_empty() {
            return Err(grammar_error("no rules found".to_string()));
        }
        Ok(grammar)
    }

    /// The start symbol, i.e. the first non-terminal added.
    pub fn start_symbol(&self) -> &str {
        &self.non_terminals[0]
    }

    /// The non-terminals in declaration order.
    pub fn non_terminals(&self) -> &[String] {
        &self.non_terminals
    }

    /// The ordered productions of the given non-terminal.
    pub fn productions_of(&self, non_terminal: &str) -> &[Vec<String>] {
        self.productions
            .get(non_terminal)
            .map(|p| p.as_slice())
            .unwrap_or(&[])
    }

    /// Check whether the symbol is a non-terminal of this grammar.
    pub fn is_non_terminal(&self, symbol: &str) -> bool {
        self.productions.contains_key(symbol)
    }

    /// The terminals: every production symbol that is neither a non-terminal nor ε.
    pub fn terminals(&self) -> BTreeSet<&str> {
        let mut terminals = BTreeSet::new();
        for non_terminal in &self.non_terminals {
            for production in &self.productions[non_terminal] {
                for symbol in production {
                    if symbol != EPSILON && !self.is_non_terminal(symbol) {
                        terminals.insert(symbol.as_str());
                    }
                }
            }
        }
        terminals
    }

    /// The action lines bound to (non-terminal, production), if any.
    pub fn action(&self, non_terminal: &str, production: &[String]) -> Option<&[String]> {
        self.actions
            .get(&(non_terminal.to_string(), production.to_vec()))
            .map(|lines| lines.as_slice())
    }

    /// Eliminate left recursion using the standard algorithm: for non-terminals in declaration
    /// order, inline earlier non-terminals appearing as leftmost symbols, then remove immediate
    /// left recursion by introducing a fresh tail non-terminal.
    ///
    /// This is offered as a tool and is not applied by the generation pipeline, since action
    /// bindings are keyed by the original production tuples.
    pub fn eliminate_left_recursion(&mut self) {
        let ordered = self.non_terminals.clone();
        let mut new_grammar: FxHashMap<String, Vec<Vec<String>>> = FxHashMap::default();

        for (i, a) in ordered.iter().enumerate() {
            // Substitute productions starting with an earlier non-terminal.
            let mut new_productions: Vec<Vec<String>> = Vec::new();
            for production in &self.productions[a] {
                let leftmost_is_earlier = production
                    .first()
                    .map_or(false, |first| ordered[..i].contains(first));
                if leftmost_is_earlier {
                    let b = &production[0];
                    let b_productions = new_grammar.get(b).unwrap_or(&self.productions[b]);
                    for b_production in b_productions {
                        if b_production == &[EPSILON.to_string()] {
                            new_productions.push(production[1..].to_vec());
                        } else {
                            let mut substituted = b_production.clone();
                            substituted.extend(production[1..].iter().cloned());
                            new_productions.push(substituted);
                        }
                    }
                } else {
                    new_productions.push(production.clone());
                }
            }

            // Remove immediate left recursion.
            let mut alpha: Vec<Vec<String>> = Vec::new();
            let mut beta: Vec<Vec<String>> = Vec::new();
            for production in &new_productions {
                if production.first() == Some(a) {
                    alpha.push(production[1..].to_vec());
                } else {
                    beta.push(production.clone());
                }
            }

            if alpha.is_empty() {
                new_grammar.insert(a.clone(), new_productions);
            } else {
                let tail = self.fresh_tail_name(a);
                self.non_terminals.push(tail.clone());
                new_grammar.insert(
                    a.clone(),
                    beta.into_iter()
                        .map(|mut p| {
                            p.push(tail.clone());
                            p
                        })
                        .collect(),
                );
                let mut tail_productions: Vec<Vec<String>> = alpha
                    .into_iter()
                    .map(|mut p| {
                        p.push(tail.clone());
                        p
                    })
                    .collect();
                tail_productions.push(vec![EPSILON.to_string()]);
                new_grammar.insert(tail.clone(), tail_productions);
            }
        }

        for (non_terminal, productions) in new_grammar {
            self.productions.insert(non_terminal, productions);
        }
    }

    /// Left-factor the grammar: group each non-terminal's productions by leading symbol and
    /// extract every group of two or more into a fresh tail non-terminal holding the suffixes.
    /// Iterates until no group can be factored; a second application is a no-op.
    pub fn left_factor(&mut self) {
        loop {
            let mut changed = false;
            for a in self.non_terminals.clone() {
                // Group productions by their leading symbol, keeping first-occurrence order.
                let mut groups: Vec<(Option<String>, Vec<Vec<String>>)> = Vec::new();
                for production in self.productions[&a].clone() {
                    let key = if production == [EPSILON.to_string()] {
                        None
                    } else {
                        production.first().cloned()
                    };
                    match groups.iter_mut().find(|(k, _)| *k == key) {
                        Some((_, group)) => group.push(production),
                        None => groups.push((key, vec![production])),
                    }
                }

                let mut new_productions: Vec<Vec<String>> = Vec::new();
                for (key, group) in groups {
                    match key {
                        Some(prefix) if group.len() > 1 => {
                            changed = true;
                            let suffixes: Vec<Vec<String>> = group
                                .iter()
                                .map(|production| {
                                    if production.len() > 1 {
                                        production[1..].to_vec()
                                    } else {
                                        vec![EPSILON.to_string()]
                                    }
                                })
                                .collect();
                            let tail = self.fresh_tail_name(&a);
                            self.non_terminals.push(tail.clone());
                            self.productions.insert(tail.clone(), suffixes);
                            new_productions.push(vec![prefix, tail]);
                        }
                        _ => new_productions.extend(group),
                    }
                }
                self.productions.insert(a, new_productions);
            }
            if !changed {
                break;
            }
        }
    }

    /// A fresh non-terminal name derived from `base` by appending "Tail" until unique.
    fn fresh_tail_name(&self, base: &str) -> String {
        let mut name = format!("{}Tail", base);
        while self.non_terminals.contains(&name) || self.productions.contains_key(&name) {
            name.push_str("Tail");
        }
        name
    }
}

fn grammar_error(message: String) -> LlgenError {
    LlgenError::new(LlgenErrorKind::GrammarSyntax(message))
}

/// Dedent the action text and split it into lines, dropping leading and trailing blank lines.
fn split_action_lines(action_text: &str) -> Vec<String> {
    let lines: Vec<&str> = action_text.lines().collect();
    let indent = lines
        .iter()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.len() - line.trim_start().len())
        .min()
        .unwrap_or(0);
    let mut dedented: Vec<String> = lines
        .iter()
        .map(|line| {
            if line.len() >= indent {
                line[indent..].trim_end().to_string()
            } else {
                line.trim_end().to_string()
            }
        })
        .collect();
    while dedented.first().is_some_and(|line| line.is_empty()) {
        dedented.remove(0);
    }
    while dedented.last().is_some_and(|line| line.is_empty()) {
        dedented.pop();
    }
    dedented
}

#[cfg(test)]
mod tests {
    use super::*;

    const ARITH_DSL: &str = "
    Expr: Term ExprTail @
    ExprTail: PLUS Term ExprTail | MINUS Term ExprTail | epsilon @
    Term: Factor TermTail @
    TermTail: MUL Factor TermTail | DIV Factor TermTail | epsilon @
    Factor: NUM | ID | LPAREN Expr RPAREN @
    ";

    #[test]
    fn test_parse_dsl() {
        let grammar = Grammar::parse_dsl(ARITH_DSL).unwrap();
        assert_eq!(grammar.start_symbol(), "Expr");
        assert_eq!(
            grammar.non_terminals(),
            &["Expr", "ExprTail", "Term", "TermTail", "Factor"]
        );
        assert_eq!(
            grammar.productions_of("Factor"),
            &[
                vec!["NUM".to_string()],
                vec!["ID".to_string()],
                vec!["LPAREN".to_string(), "Expr".to_string(), "RPAREN".to_string()],
            ]
        );
        assert_eq!(
            grammar.productions_of("ExprTail")[2],
            vec![EPSILON.to_string()]
        );
        assert_eq!(
            grammar.terminals(),
            BTreeSet::from(["PLUS", "MINUS", "MUL", "DIV", "NUM", "ID", "LPAREN", "RPAREN"])
        );
    }

    #[test]
    fn test_parse_dsl_actions() {
        let dsl = "
        S : A B $
            node = make_node();
            node->kind = SEQ;
          | epsilon $ node = NULL; @
        A : a @
        B : b @
        ";
        let grammar = Grammar::parse_dsl(dsl).unwrap();
        let production = vec!["A".to_string(), "B".to_string()];
        assert_eq!(
            grammar.action("S", &production).unwrap(),
            &["node = make_node();", "node->kind = SEQ;"]
        );
        let epsilon_production = vec![EPSILON.to_string()];
        assert_eq!(
            grammar.action("S", &epsilon_production).unwrap(),
            &["node = NULL;"]
        );
    }

    #[test]
    fn test_comment_between_rules_does_not_swallow_rule() {
        let dsl = "
        S : a @
        # a comment
        T : b @
        ";
        let grammar = Grammar::parse_dsl(dsl).unwrap();
        assert_eq!(grammar.non_terminals(), &["S", "T"]);
    }

    #[test]
    fn test_parse_dsl_errors() {
        assert!(Grammar::parse_dsl("").is_err());
        assert!(Grammar::parse_dsl("no separator @").is_err());
        assert!(Grammar::parse_dsl("A B : c @").is_err());
    }

    #[test]
    fn test_eliminate_left_recursion() {
        let mut grammar = Grammar::parse_dsl("A : A a | b @").unwrap();
        grammar.eliminate_left_recursion();
        assert_eq!(
            grammar.productions_of("A"),
            &[vec!["b".to_string(), "ATail".to_string()]]
        );
        assert_eq!(
            grammar.productions_of("ATail"),
            &[
                vec!["a".to_string(), "ATail".to_string()],
                vec![EPSILON.to_string()],
            ]
        );
    }

    #[test]
    fn test_eliminate_left_recursion_noop_on_clean_grammar() {
        let mut grammar = Grammar::parse_dsl(ARITH_DSL).unwrap();
        let before: Vec<_> = grammar
            .non_terminals()
            .iter()
            .map(|nt| (nt.clone(), grammar.productions_of(nt).to_vec()))
            .collect();
        grammar.eliminate_left_recursion();
        for (non_terminal, productions) in before {
            assert_eq!(grammar.productions_of(&non_terminal), productions.as_slice());
        }
    }

    #[test]
    fn test_left_factor() {
        let mut grammar = Grammar::parse_dsl("A : a B | a C @ B : b @ C : c @").unwrap();
        grammar.left_factor();
        assert_eq!(
            grammar.productions_of("A"),
            &[vec!["a".to_string(), "ATail".to_string()]]
        );
        assert_eq!(
            grammar.productions_of("ATail"),
            &[vec!["B".to_string()], vec!["C".to_string()]]
        );
    }

    #[test]
    fn test_left_factor_is_idempotent() {
        let mut grammar = Grammar::parse_dsl("A : a B | a C | d @ B : b @ C : c @").unwrap();
        grammar.left_factor();
        let once: Vec<_> = grammar
            .non_terminals()
            .iter()
            .map(|nt| (nt.clone(), grammar.productions_of(nt).to_vec()))
            .collect();
        grammar.left_factor();
        let twice: Vec<_> = grammar
            .non_terminals()
            .iter()
            .map(|nt| (nt.clone(), grammar.productions_of(nt).to_vec()))
            .collect();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_fresh_tail_names_are_unique() {
        let mut grammar =
            Grammar::parse_dsl("A : a B | a C @ ATail : x @ B : b @ C : c @").unwrap();
        grammar.left_factor();
        assert!(grammar.is_non_terminal("ATailTail"));
        assert_eq!(grammar.productions_of("ATail"), &[vec!["x".to_string()]]);
    }

    #[test]
    fn test_split_action_lines() {
        assert_eq!(
            split_action_lines("\n    a();\n      b();\n"),
            vec!["a();", "  b();"]
        );
        assert!(split_action_lines("   \n").is_empty());
    }
}
