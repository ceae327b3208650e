//! This module contains the LL(1) table builder.
//! FIRST and FOLLOW sets are computed as monotone fixpoints over set union; the parsing table
//! maps (non-terminal, lookahead terminal) to exactly one production. A double write to a table
//! cell rejects the grammar as non-LL(1).

use std::collections::BTreeSet;

use log::{debug, trace};
use rustc_hash::FxHashMap;

use crate::{
    grammar::{Grammar, END_MARKER, EPSILON},
    LlgenError, LlgenErrorKind, Result,
};

/// FIRST/FOLLOW sets and the parsing table of an LL(1) grammar.
#[derive(Debug, Clone, Default)]
pub(crate) struct Ll1Tables {
    first: FxHashMap<String, BTreeSet<String>>,
    follow: FxHashMap<String, BTreeSet<String>>,
    table: FxHashMap<(String, String), Vec<String>>,
}

impl Ll1Tables {
    /// Compute FIRST, FOLLOW and the parsing table for the grammar.
    /// Fails with an [LlgenErrorKind::Ll1Conflict] if the grammar is not LL(1).
    pub(crate) fn try_from_grammar(grammar: &Grammar) -> Result<Self> {
        let first = compute_first(grammar);
        let follow = compute_follow(grammar, &first);
        let table = build_parsing_table(grammar, &first, &follow)?;
        let tables = Self {
            first,
            follow,
            table,
        };
        debug!("LL(1) table construction finished:\n{}", tables);
        Ok(tables)
    }

    /// FIRST of a single symbol.
    #[allow(dead_code)]
    pub(crate) fn first_of(&self, symbol: &str) -> Option<&BTreeSet<String>> {
        self.first.get(symbol)
    }

    /// FOLLOW of a non-terminal.
    pub(crate) fn follow_of(&self, non_terminal: &str) -> Option<&BTreeSet<String>> {
        self.follow.get(non_terminal)
    }

    /// The production selected for (non-terminal, lookahead), if any.
    pub(crate) fn production(&self, non_terminal: &str, terminal: &str) -> Option<&Vec<String>> {
        self.table
            .get(&(non_terminal.to_string(), terminal.to_string()))
    }

    /// The lookahead terminals that select the given production of the non-terminal,
    /// sorted by terminal name.
    pub(crate) fn lookaheads_for(
        &self,
        non_terminal: &str,
        production: &[String],
    ) -> Vec<&str> {
        let mut lookaheads: Vec<&str> = self
            .table
            .iter()
            .filter(|((nt, _), prod)| nt == non_terminal && prod.as_slice() == production)
            .map(|((_, terminal), _)| terminal.as_str())
            .collect();
        lookaheads.sort_unstable();
        lookaheads
    }
}

impl std::fmt::Display for Ll1Tables {
    /// Render the parsing table for debugging, one cell per line.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut cells: Vec<(&(String, String), &Vec<String>)> = self.table.iter().collect();
        cells.sort_unstable();
        for ((non_terminal, terminal), production) in cells {
            writeln!(
                f,
                "M[{}, {}] = {}",
                non_terminal,
                terminal,
                production.join(" ")
            )?;
        }
        Ok(())
    }
}

/// Compute FIRST for every grammar symbol by fixpoint iteration.
/// The sets only grow, so the result is independent of iteration order.
fn compute_first(grammar: &Grammar) -> FxHashMap<String, BTreeSet<String>> {
    let mut first: FxHashMap<String, BTreeSet<String>> = FxHashMap::default();
    for terminal in grammar.terminals() {
        first.insert(terminal.to_string(), BTreeSet::from([terminal.to_string()]));
    }
    first.insert(EPSILON.to_string(), BTreeSet::from([EPSILON.to_string()]));
    for non_terminal in grammar.non_terminals() {
        first.entry(non_terminal.clone()).or_default();
    }

    let mut changed = true;
    while changed {
        changed = false;
        for non_terminal in grammar.non_terminals() {
            for production in grammar.productions_of(non_terminal) {
                let addition = first_of_sequence(production, &first);
                let known = &first[non_terminal];
                if !addition.is_subset(known) {
                    trace!("FIRST({}) grows by {:?}", non_terminal, addition);
                    first.get_mut(non_terminal).expect("initialized above").extend(addition);
                    changed = true;
                }
            }
        }
    }
    first
}

/// FIRST of a sequence of symbols. Contains ε iff every symbol derives ε (an empty sequence
/// trivially does).
fn first_of_sequence(
    sequence: &[String],
    first: &FxHashMap<String, BTreeSet<String>>,
) -> BTreeSet<String> {
    let mut result = BTreeSet::new();
    let mut all_epsilon = true;
    for symbol in sequence {
        let symbol_first = first.get(symbol).cloned().unwrap_or_default();
        result.extend(
            symbol_first
                .iter()
                .filter(|s| s.as_str() != EPSILON)
                .cloned(),
        );
        if !symbol_first.contains(EPSILON) {
            all_epsilon = false;
            break;
        }
    }
    if all_epsilon {
        result.insert(EPSILON.to_string());
    }
    result
}

/// Compute FOLLOW for every non-terminal by fixpoint iteration.
fn compute_follow(
    grammar: &Grammar,
    first: &FxHashMap<String, BTreeSet<String>>,
) -> FxHashMap<String, BTreeSet<String>> {
    let mut follow: FxHashMap<String, BTreeSet<String>> = FxHashMap::default();
    for non_terminal in grammar.non_terminals() {
        follow.entry(non_terminal.clone()).or_default();
    }
    follow
        .get_mut(grammar.start_symbol())
        .expect("start symbol is a non-terminal")
        .insert(END_MARKER.to_string());

    let mut changed = true;
    while changed {
        changed = false;
        for non_terminal in grammar.non_terminals() {
            for production in grammar.productions_of(non_terminal) {
                for (index, symbol) in production.iter().enumerate() {
                    if !grammar.is_non_terminal(symbol) {
                        continue;
                    }
                    let mut addition: BTreeSet<String>;
                    if index < production.len() - 1 {
                        let suffix_first = first_of_sequence(&production[index + 1..], first);
                        addition = suffix_first
                            .iter()
                            .filter(|s| s.as_str() != EPSILON)
                            .cloned()
                            .collect();
                        if suffix_first.contains(EPSILON) {
                            addition.extend(follow[non_terminal].iter().cloned());
                        }
                    } else {
                        addition = follow[non_terminal].clone();
                    }
                    if !addition.is_subset(&follow[symbol]) {
                        trace!("FOLLOW({}) grows by {:?}", symbol, addition);
                        follow
                            .get_mut(symbol)
                            .expect("initialized above")
                            .extend(addition);
                        changed = true;
                    }
                }
            }
        }
    }
    follow
}

/// Build the parsing table. Every cell write checks for a previous occupant; a collision is an
/// LL(1) conflict and rejects the grammar.
fn build_parsing_table(
    grammar: &Grammar,
    first: &FxHashMap<String, BTreeSet<String>>,
    follow: &FxHashMap<String, BTreeSet<String>>,
) -> Result<FxHashMap<(String, String), Vec<String>>> {
    let mut table: FxHashMap<(String, String), Vec<String>> = FxHashMap::default();
    let mut insert = |non_terminal: &str, terminal: &str, production: &[String]| -> Result<()> {
        let key = (non_terminal.to_string(), terminal.to_string());
        if let Some(existing) = table.get(&key) {
            return Err(LlgenError::new(LlgenErrorKind::Ll1Conflict {
                non_terminal: non_terminal.to_string(),
                terminal: terminal.to_string(),
                existing: existing.join(" "),
                new: production.join(" "),
            }));
        }
        table.insert(key, production.to_vec());
        Ok(())
    };

    for non_terminal in grammar.non_terminals() {
        for production in grammar.productions_of(non_terminal) {
            let production_first = first_of_sequence(production, first);
            for terminal in &production_first {
                if terminal == EPSILON {
                    continue;
                }
                insert(non_terminal, terminal, production)?;
            }
            if production_first.contains(EPSILON) {
                for terminal in &follow[non_terminal] {
                    insert(non_terminal, terminal, production)?;
                }
            }
        }
    }
    Ok(table)
}
