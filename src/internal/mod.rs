/// Module that provides the character conditions labeling NFA edges.
pub(crate) mod char_condition;

/// Module with the subset construction from NFA to DFA.
pub(crate) mod dfa;

/// Module that emits the C code of the tokenizer DFA.
pub(crate) mod dfa_emitter;

/// Module for several ID types.
mod ids;
pub(crate) use ids::{DfaStateID, PatternID, StateID};

/// Module with the LL(1) table builder.
pub(crate) mod ll1;

/// Module that provides the multi pattern NFA.
pub(crate) mod multi_pattern_nfa;
pub(crate) use multi_pattern_nfa::MultiPatternNfa;

/// The nfa module contains the NFA implementation.
pub(crate) mod nfa;

/// Module that emits the C code of the LL(1) parser.
pub(crate) mod parser_emitter;

/// The regex parser module turns patterns into NFA fragments.
pub(crate) mod regex_parser;

/// The C runtime templates injected into the emitted artifacts.
pub(crate) mod templates;
