//! This module contains the multi-pattern NFA.
//! The NFAs of the individual token rules are unioned under a fresh start state whose epsilon
//! transitions fan out to the per-rule fragments. Each rule's end state carries the token type
//! and the rule's declaration index so that the DFA conversion can break ties by priority.

use log::trace;

use crate::{lexer_spec::TokenRule, Result};

use super::{
    ids::PatternID,
    nfa::Nfa,
    regex_parser::RegexParser,
    StateID,
};

#[derive(Debug, Clone, Default)]
pub(crate) struct MultiPatternNfa {
    nfa: Nfa,
    start: StateID,
    patterns: Vec<(String, String)>,
}

impl MultiPatternNfa {
    /// Build the combined NFA from the token rules in declaration order.
    pub(crate) fn try_from_rules(rules: &[TokenRule]) -> Result<Self> {
        let mut nfa = Nfa::new();
        let start = nfa.new_state();
        let mut patterns = Vec::with_capacity(rules.len());
        for (index, rule) in rules.iter().enumerate() {
            let fragment = RegexParser::parse(&rule.pattern, &mut nfa)?;
            nfa.tag_accepting_state(fragment.end, &rule.name, PatternID::new(index));
            nfa.add_epsilon_transition(start, fragment.start);
            trace!(
                "rule #{} '{}' ('{}') -> fragment ({}, {})",
                index,
                rule.name,
                rule.pattern.escape_default(),
                fragment.start,
                fragment.end
            );
            patterns.push((rule.name.clone(), rule.pattern.clone()));
        }
        Ok(Self {
            nfa,
            start,
            patterns,
        })
    }

    /// The underlying NFA arena.
    pub(crate) fn nfa(&self) -> &Nfa {
        &self.nfa
    }

    /// The start state of the combined NFA.
    pub(crate) fn start(&self) -> StateID {
        self.start
    }

    /// The (token name, pattern) pairs in declaration order.
    #[allow(dead_code)]
    pub(crate) fn patterns(&self) -> &[(String, String)] {
        &self.patterns
    }
}
