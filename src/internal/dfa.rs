//! This module contains the DFA implementation.
//! The DFA is generated from the combined NFA using the subset construction algorithm. A DFA
//! state is a frozen set of NFA states, canonicalized as a sorted id vector. Accepting states
//! carry the token type of the highest-priority rule among their accepting NFA states.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use log::{debug, trace};
use rustc_hash::FxHashMap;

use crate::{LlgenError, LlgenErrorKind, Result};

use super::{
    char_condition::ALPHABET_SIZE, ids::DfaStateIDBase, DfaStateID, MultiPatternNfa, StateID,
};

/// A DFA state: a frozen set of NFA states plus the accept annotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DfaState {
    id: DfaStateID,
    /// The sorted ids of the NFA states that constitute this DFA state.
    nfa_states: Vec<StateID>,
    /// The winning token type if the state is accepting.
    token_type: Option<String>,
}

impl DfaState {
    pub(crate) fn id(&self) -> DfaStateID {
        self.id
    }

    #[allow(dead_code)]
    pub(crate) fn nfa_states(&self) -> &[StateID] {
        &self.nfa_states
    }

    pub(crate) fn is_accepting(&self) -> bool {
        self.token_type.is_some()
    }

    pub(crate) fn token_type(&self) -> Option<&str> {
        self.token_type.as_deref()
    }
}

/// The DFA created from a multi-pattern NFA.
/// After construction every retained state is reachable from the start state and the transition
/// relation is a function of (state, byte).
#[derive(Debug, Clone, Default)]
pub(crate) struct Dfa {
    states: Vec<DfaState>,
    start: DfaStateID,
    /// Per-state byte transitions, indexed by the owning state's id.
    transitions: Vec<BTreeMap<u8, DfaStateID>>,
}

impl Dfa {
    pub(crate) fn states(&self) -> &[DfaState] {
        &self.states
    }

    pub(crate) fn start(&self) -> DfaStateID {
        self.start
    }

    pub(crate) fn transitions_of(&self, state: DfaStateID) -> &BTreeMap<u8, DfaStateID> {
        &self.transitions[state]
    }

    /// Create a DFA from the combined NFA using the subset construction algorithm.
    /// The worklist is FIFO, so states are numbered in breadth-first discovery order, which
    /// makes the construction deterministic run-to-run.
    pub(crate) fn try_from_nfa(multi: &MultiPatternNfa) -> Result<Self> {
        let nfa = multi.nfa();
        let mut dfa = Dfa::default();
        let mut canonical: FxHashMap<Vec<StateID>, DfaStateID> = FxHashMap::default();

        let start_set: Vec<StateID> =
            nfa.epsilon_closure([multi.start()]).into_iter().collect();
        let start = dfa.add_state(multi, start_set, &mut canonical)?;
        dfa.start = start;

        let mut work_list = VecDeque::from([start]);
        while let Some(current) = work_list.pop_front() {
            let nfa_states: BTreeSet<StateID> =
                dfa.states[current].nfa_states.iter().copied().collect();
            for byte in 0..ALPHABET_SIZE as u8 {
                let moved = nfa.move_set(&nfa_states, byte);
                if moved.is_empty() {
                    continue;
                }
                let target_set: Vec<StateID> =
                    nfa.epsilon_closure(moved).into_iter().collect();
                let (target, new) = match canonical.get(&target_set).copied() {
                    Some(id) => (id, false),
                    None => (dfa.add_state(multi, target_set, &mut canonical)?, true),
                };
                dfa.transitions[current].insert(byte, target);
                if new {
                    work_list.push_back(target);
                }
            }
        }

        dfa.prune_unreachable()?;
        debug!("DFA construction finished:\n{}", dfa);
        Ok(dfa)
    }

    /// Add a new DFA state for the given frozen set of NFA states.
    /// The accept annotation is decided here: the token type of the accepting NFA state with
    /// the minimal pattern index wins and is never overwritten later.
    fn add_state(
        &mut self,
        multi: &MultiPatternNfa,
        nfa_states: Vec<StateID>,
        canonical: &mut FxHashMap<Vec<StateID>, DfaStateID>,
    ) -> Result<DfaStateID> {
        debug_assert!(nfa_states.windows(2).all(|w| w[0] < w[1]));

        let nfa = multi.nfa();
        let mut winner: Option<(&str, usize)> = None;
        for state_id in &nfa_states {
            let state = &nfa.states()[state_id.as_usize()];
            if !state.is_accepting() {
                continue;
            }
            let pattern_index = state
                .pattern_index()
                .ok_or_else(|| internal(format!("accepting state {} has no rule index", state_id)))?
                .as_usize();
            let token_type = state
                .token_type()
                .ok_or_else(|| internal(format!("accepting state {} has no token tag", state_id)))?;
            if winner.map_or(true, |(_, best)| pattern_index < best) {
                winner = Some((token_type, pattern_index));
            }
        }

        let id = DfaStateID::new(self.states.len() as DfaStateIDBase);
        trace!(
            "new DFA state {} for {{{}}} accepting {:?}",
            id,
            nfa_states
                .iter()
                .map(|s| s.to_string())
                .collect::<Vec<_>>()
                .join(","),
            winner
        );
        canonical.insert(nfa_states.clone(), id);
        self.states.push(DfaState {
            id,
            nfa_states,
            token_type: winner.map(|(token, _)| token.to_string()),
        });
        self.transitions.push(BTreeMap::new());
        Ok(id)
    }

    /// Drop every state not reachable from the start state and renumber the rest in
    /// breadth-first discovery order.
    fn prune_unreachable(&mut self) -> Result<()> {
        let mut order: Vec<DfaStateID> = Vec::new();
        let mut seen: BTreeSet<DfaStateID> = BTreeSet::new();
        let mut queue = VecDeque::from([self.start]);
        seen.insert(self.start);
        while let Some(state) = queue.pop_front() {
            order.push(state);
            for target in self.transitions[state].values() {
                if seen.insert(*target) {
                    queue.push_back(*target);
                }
            }
        }

        if order.len() == self.states.len() {
            return Ok(());
        }
        debug!(
            "pruning {} unreachable DFA states",
            self.states.len() - order.len()
        );

        let mut renumbering: FxHashMap<DfaStateID, DfaStateID> = FxHashMap::default();
        for (new_id, old_id) in order.iter().enumerate() {
            renumbering.insert(*old_id, DfaStateID::new(new_id as DfaStateIDBase));
        }

        let mut states = Vec::with_capacity(order.len());
        let mut transitions = Vec::with_capacity(order.len());
        for old_id in &order {
            let mut state = self.states[*old_id].clone();
            state.id = renumbering[old_id];
            states.push(state);
            let renumbered: BTreeMap<u8, DfaStateID> = self.transitions[*old_id]
                .iter()
                .map(|(byte, target)| {
                    renumbering
                        .get(target)
                        .map(|t| (*byte, *t))
                        .ok_or_else(|| {
                            internal(format!("transition into pruned DFA state {}", target))
                        })
                })
                .collect::<Result<_>>()?;
            transitions.push(renumbered);
        }

        self.start = renumbering[&self.start];
        self.states = states;
        self.transitions = transitions;
        Ok(())
    }

    /// Run the DFA over a prefix of the input with maximal-munch semantics, mirroring the
    /// emitted C machine. Returns the length of the longest accepted prefix and its token type.
    /// Used to validate the DFA against the NFA and the scenario tests.
    #[allow(dead_code)]
    pub(crate) fn longest_match<'a>(&'a self, input: &[u8]) -> Option<(usize, &'a str)> {
        let mut current = self.start;
        let mut last_accept: Option<(usize, &str)> = None;
        let mut consumed = 0;
        loop {
            if let Some(token) = self.states[current].token_type() {
                last_accept = Some((consumed, token));
            }
            if consumed >= input.len() {
                break;
            }
            match self.transitions[current].get(&input[consumed]) {
                Some(target) => {
                    current = *target;
                    consumed += 1;
                }
                None => break,
            }
        }
        last_accept
    }
}

fn internal(message: String) -> LlgenError {
    LlgenError::new(LlgenErrorKind::InternalInvariant(message))
}

impl std::fmt::Display for Dfa {
    /// Render the transition table for debugging.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{:<15} | {:<8} | {:<6} | Transitions", "State", "Token", "Accept")?;
        writeln!(f, "{}", "-".repeat(60))?;
        for state in &self.states {
            let label = format!(
                "{{{}}}",
                state
                    .nfa_states
                    .iter()
                    .map(|s| s.to_string())
                    .collect::<Vec<_>>()
                    .join(",")
            );
            let transitions = self.transitions[state.id]
                .iter()
                .map(|(byte, target)| {
                    format!("{}->{}", (*byte as char).escape_default(), target)
                })
                .collect::<Vec<_>>()
                .join(", ");
            writeln!(
                f,
                "{:<15} | {:<8} | {:<6} | {}",
                label,
                state.token_type().unwrap_or(""),
                if state.is_accepting() { "Yes" } else { "No" },
                transitions
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer_spec::TokenRule;

    fn build(rules: &[TokenRule]) -> Dfa {
        let multi = MultiPatternNfa::try_from_rules(rules).unwrap();
        Dfa::try_from_nfa(&multi).unwrap()
    }

    #[test]
    fn test_wildcard_does_not_match_newline() {
        let dfa = build(&[TokenRule::new("DOT", ".")]);
        assert_eq!(dfa.longest_match(b"\n"), None);
        assert_eq!(dfa.longest_match(b"x"), Some((1, "DOT")));
    }

    #[test]
    fn test_longest_match_wins() {
        let dfa = build(&[
            TokenRule::new("INT", r"\d+"),
            TokenRule::new("FLOAT", r"\d+\.\d+"),
        ]);
        assert_eq!(dfa.longest_match(b"123.45 "), Some((6, "FLOAT")));
        assert_eq!(dfa.longest_match(b"123 "), Some((3, "INT")));
        assert_eq!(dfa.longest_match(b"123."), Some((3, "INT")));
    }

    #[test]
    fn test_priority_breaks_ties() {
        let dfa = build(&[
            TokenRule::new("IF", "if"),
            TokenRule::new("ID", "[a-zA-Z_][a-zA-Z0-9_]*"),
        ]);
        assert_eq!(dfa.longest_match(b"if"), Some((2, "IF")));
        assert_eq!(dfa.longest_match(b"ifx"), Some((3, "ID")));
        assert_eq!(dfa.longest_match(b"i"), Some((1, "ID")));
    }

    #[test]
    fn test_duplicate_pattern_earliest_rule_wins() {
        let dfa = build(&[TokenRule::new("FIRST", "ab"), TokenRule::new("SECOND", "ab")]);
        assert_eq!(dfa.longest_match(b"ab"), Some((2, "FIRST")));
    }

    #[test]
    fn test_empty_matching_regex_accepts_at_start() {
        let dfa = build(&[TokenRule::new("STARS", r"\**")]);
        assert!(dfa.states()[dfa.start()].is_accepting());
        assert_eq!(dfa.longest_match(b""), Some((0, "STARS")));
        assert_eq!(dfa.longest_match(b"x"), Some((0, "STARS")));
        assert_eq!(dfa.longest_match(b"***x"), Some((3, "STARS")));
    }

    #[test]
    fn test_no_char_transitions_yields_single_state() {
        // A pattern matching only the empty string collapses to the start state.
        let dfa = build(&[TokenRule::new("EMPTY", "a?")]);
        assert!(dfa.states().len() <= 2);
        assert!(dfa.states()[dfa.start()].is_accepting());
    }

    #[test]
    fn test_all_states_reachable_after_prune() {
        let dfa = build(&[
            TokenRule::new("ID", "[a-z]+"),
            TokenRule::new("NUM", r"\d+"),
            TokenRule::new("OP", r"[+*/-]"),
        ]);
        let mut seen = std::collections::BTreeSet::from([dfa.start()]);
        let mut queue = std::collections::VecDeque::from([dfa.start()]);
        while let Some(state) = queue.pop_front() {
            for target in dfa.transitions_of(state).values() {
                if seen.insert(*target) {
                    queue.push_back(*target);
                }
            }
        }
        assert_eq!(seen.len(), dfa.states().len());
    }

    #[test]
    fn test_construction_is_deterministic() {
        let rules = vec![
            TokenRule::new("ID", "[a-zA-Z_][a-zA-Z0-9_]*"),
            TokenRule::new("NUM", r"\d+"),
            TokenRule::new("WS", r"\s+"),
        ];
        let first = build(&rules);
        let second = build(&rules);
        assert_eq!(first.states(), second.states());
        assert_eq!(first.transitions, second.transitions);
    }

    #[test]
    fn test_dfa_agrees_with_nfa() {
        let patterns = ["(a|b)*abb", r"\d+\.\d+", "a?b+c*", "[^x]y"];
        let corpus: Vec<String> = {
            let mut corpus = vec![String::new()];
            for len in 1..=4 {
                let alphabet = ["a", "b", "c", "x", "y", "1", "."];
                let mut words = vec![String::new()];
                for _ in 0..len {
                    words = words
                        .iter()
                        .flat_map(|w| alphabet.iter().map(move |c| format!("{}{}", w, c)))
                        .collect();
                }
                corpus.extend(words);
            }
            corpus
        };
        for pattern in patterns {
            let rules = vec![TokenRule::new("T", pattern)];
            let multi = MultiPatternNfa::try_from_rules(&rules).unwrap();
            let dfa = Dfa::try_from_nfa(&multi).unwrap();
            for word in &corpus {
                let nfa_accepts = multi.nfa().accepts(multi.start(), word.as_bytes());
                let dfa_accepts =
                    dfa.longest_match(word.as_bytes()) == Some((word.len(), "T"));
                assert_eq!(
                    nfa_accepts,
                    dfa_accepts,
                    "NFA and DFA disagree on pattern '{}' over '{}'",
                    pattern,
                    word
                );
            }
        }
    }
}
