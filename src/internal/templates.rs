//! The C runtime templates injected verbatim into the emitted artifacts: the stream-level
//! lexer shell and the parser's header, globals, helper functions and `parse` entry point.
//! Placeholders of the form `{name}` are substituted by the emitters.

pub(crate) const LEXER_HEADER: &str = include_str!("../../templates/lexer_h.txt");
pub(crate) const LEXER_SOURCE: &str = include_str!("../../templates/lexer_c.txt");
pub(crate) const PARSER_HEADER: &str = include_str!("../../templates/parser_header.txt");
pub(crate) const PARSER_SOURCE_HEADER: &str = include_str!("../../templates/parser_source_header.txt");
pub(crate) const PARSER_HELPERS: &str = include_str!("../../templates/parser_helpers.txt");
pub(crate) const PARSER_MAIN: &str = include_str!("../../templates/parser_main.txt");
