//! This module emits the C artifacts for the LL(1) parser: a header declaring the AST node type
//! and the `parse` entry point, and a source file with one function per non-terminal.
//!
//! Each function declares a sync set for panic-mode recovery, locals for every right-hand-side
//! symbol, and a `switch` over the lookahead token whose cases are grouped by the selected
//! production. User action lines are injected verbatim after the matching calls.

use std::collections::BTreeSet;

use crate::{
    grammar::{Grammar, END_MARKER, EPSILON},
    internal::ll1::Ll1Tables,
};

use super::templates;

/// The C type name of the AST node produced by the generated parser.
const AST_NAME: &str = "ASTNode";

/// Map a grammar symbol to a valid C identifier fragment.
fn c_identifier(symbol: &str) -> String {
    symbol.replace('-', "_").replace('+', "plus")
}

fn token_enum(terminal: &str) -> String {
    format!("TOKEN_{}", terminal.to_uppercase())
}

/// Renders `parser.h` from the header template.
pub(crate) struct ParserHeader;

impl std::fmt::Display for ParserHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", templates::PARSER_HEADER.replace("{ast_name}", AST_NAME))
    }
}

/// Renders `parser.c`: runtime globals and helpers from the templates, then one function per
/// non-terminal, then the `parse` entry point dispatching to the start symbol.
pub(crate) struct ParserSource<'a> {
    grammar: &'a Grammar,
    tables: &'a Ll1Tables,
}

impl<'a> ParserSource<'a> {
    pub(crate) fn new(grammar: &'a Grammar, tables: &'a Ll1Tables) -> Self {
        Self { grammar, tables }
    }

    fn write_non_terminal_function(
        &self,
        f: &mut std::fmt::Formatter<'_>,
        non_terminal: &str,
    ) -> std::fmt::Result {
        writeln!(f, "{}* {}(void) {{", AST_NAME, c_identifier(non_terminal))?;

        // The sync set drives panic-mode recovery: FOLLOW plus the end marker.
        let mut sync_set: BTreeSet<String> = self
            .tables
            .follow_of(non_terminal)
            .map(|follow| follow.iter().map(|t| token_enum(t)).collect())
            .unwrap_or_default();
        sync_set.insert(token_enum(END_MARKER));
        writeln!(
            f,
            "    TokenType sync_set[] = {{{}}};",
            sync_set.into_iter().collect::<Vec<_>>().join(", ")
        )?;
        writeln!(f, "    int sync_size = sizeof(sync_set)/sizeof(sync_set[0]);")?;
        writeln!(f)?;
        writeln!(f, "    {}* node = NULL;", AST_NAME)?;
        writeln!(f)?;

        // One local per distinct right-hand-side symbol.
        let mut declared: BTreeSet<&str> = BTreeSet::new();
        for production in self.grammar.productions_of(non_terminal) {
            for symbol in production {
                if symbol == EPSILON || !declared.insert(symbol) {
                    continue;
                }
                let c_type = if self.grammar.is_non_terminal(symbol) {
                    format!("{}*", AST_NAME)
                } else {
                    "Token".to_string()
                };
                writeln!(f, "    {} _{};", c_type, c_identifier(symbol))?;
            }
        }
        writeln!(f)?;
        writeln!(f, "    switch (current_tok) {{")?;

        for production in self.grammar.productions_of(non_terminal) {
            let lookaheads = self.tables.lookaheads_for(non_terminal, production);
            if lookaheads.is_empty() {
                continue;
            }
            for lookahead in lookaheads {
                writeln!(f, "        case {}:", token_enum(lookahead))?;
            }
            writeln!(f, "            // Production: {}", production.join(" "))?;

            if production.len() == 1 && production[0] == EPSILON {
                writeln!(f, "            /* epsilon */")?;
            } else {
                for symbol in production {
                    let local = c_identifier(symbol);
                    if self.grammar.is_non_terminal(symbol) {
                        writeln!(f, "            _{} = {}();", local, c_identifier(symbol))?;
                    } else {
                        writeln!(
                            f,
                            "            _{} = match_token({});",
                            local,
                            token_enum(symbol)
                        )?;
                    }
                }
            }
            if let Some(action) = self.grammar.action(non_terminal, production) {
                for line in action {
                    writeln!(f, "            {}", line)?;
                }
            }
            writeln!(f, "            break;")?;
            writeln!(f)?;
        }

        writeln!(f, "        default:")?;
        writeln!(f, "            syntax_error(\"Unexpected token\");")?;
        writeln!(f, "            recover_from_error(sync_set, sync_size);")?;
        writeln!(f, "            break;")?;
        writeln!(f, "    }}")?;
        writeln!(
            f,
            "    if ((node != NULL) && (current_index > 0) && (current_tok != TOKEN_EOF)) {{"
        )?;
        writeln!(f, "        Token token = _current_token();")?;
        writeln!(f, "        node->line = token.line;")?;
        writeln!(f, "        node->column = token.column;")?;
        writeln!(f, "    }}")?;
        writeln!(f, "    return node;")?;
        writeln!(f, "}}")?;
        writeln!(f)
    }
}

impl std::fmt::Display for ParserSource<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", templates::PARSER_SOURCE_HEADER)?;

        for non_terminal in self.grammar.non_terminals() {
            writeln!(f, "{}* {}(void);", AST_NAME, c_identifier(non_terminal))?;
        }
        writeln!(f)?;

        write!(f, "{}", templates::PARSER_HELPERS)?;

        for non_terminal in self.grammar.non_terminals() {
            self.write_non_terminal_function(f, non_terminal)?;
        }

        let main = templates::PARSER_MAIN
            .replace("{ast_name}", AST_NAME)
            .replace("{start_func}", &c_identifier(self.grammar.start_symbol()));
        write!(f, "{}", main)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ARITH_DSL: &str = "
    E : T EPrime $ node = _T; @
    EPrime : PLUS T EPrime | epsilon @
    T : F TPrime @
    TPrime : MUL F TPrime | epsilon @
    F : LPAREN E RPAREN | NUMBER $ node = new_node(1); @
    ";

    fn emit() -> String {
        let grammar = Grammar::parse_dsl(ARITH_DSL).unwrap();
        let tables = Ll1Tables::try_from_grammar(&grammar).unwrap();
        ParserSource::new(&grammar, &tables).to_string()
    }

    #[test]
    fn test_header_declares_parse() {
        let header = ParserHeader.to_string();
        assert!(header.contains("typedef struct ASTNode"));
        assert!(header.contains("ASTNode* parse(Token* input_tokens, int input_count);"));
    }

    #[test]
    fn test_prototypes_and_functions() {
        let source = emit();
        for name in ["E", "EPrime", "T", "TPrime", "F"] {
            assert!(source.contains(&format!("ASTNode* {}(void);", name)));
            assert!(source.contains(&format!("ASTNode* {}(void) {{", name)));
        }
    }

    #[test]
    fn test_sync_set_is_follow_plus_eof() {
        let source = emit();
        // FOLLOW(EPrime) = { RPAREN, EOF }
        let function = source
            .split("ASTNode* EPrime(void) {")
            .nth(1)
            .unwrap();
        assert!(
            function.starts_with("\n    TokenType sync_set[] = {TOKEN_EOF, TOKEN_RPAREN};"),
            "unexpected sync set: {}",
            function.lines().nth(1).unwrap_or("")
        );
    }

    #[test]
    fn test_case_labels_grouped_by_production() {
        let source = emit();
        let function = source.split("ASTNode* EPrime(void) {").nth(1).unwrap();
        assert!(function.contains(
            "        case TOKEN_PLUS:\n            // Production: PLUS T EPrime"
        ));
        assert!(function.contains(
            "        case TOKEN_EOF:\n        case TOKEN_RPAREN:\n            // Production: ε"
        ));
        assert!(function.contains("            /* epsilon */"));
    }

    #[test]
    fn test_production_bodies_in_order() {
        let source = emit();
        let function = source.split("ASTNode* E(void) {").nth(1).unwrap();
        let t_call = function.find("_T = T();").unwrap();
        let eprime_call = function.find("_EPrime = EPrime();").unwrap();
        assert!(t_call < eprime_call);
    }

    #[test]
    fn test_actions_injected_verbatim() {
        let source = emit();
        assert!(source.contains("            node = _T;"));
        assert!(source.contains("            node = new_node(1);"));
    }

    #[test]
    fn test_default_case_recovers() {
        let source = emit();
        assert!(source.contains("        default:"));
        assert!(source.contains("            syntax_error(\"Unexpected token\");"));
        assert!(source.contains("            recover_from_error(sync_set, sync_size);"));
    }

    #[test]
    fn test_locals_declared_per_symbol() {
        let source = emit();
        let function = source.split("ASTNode* F(void) {").nth(1).unwrap();
        assert!(function.contains("    Token _LPAREN;"));
        assert!(function.contains("    Token _NUMBER;"));
        assert!(function.contains("    ASTNode* _E;"));
    }

    #[test]
    fn test_main_parser_calls_start_symbol() {
        let source = emit();
        assert!(source.contains("ASTNode* root = E();"));
        assert!(source.contains("if (current_tok != TOKEN_EOF) {"));
    }

    #[test]
    fn test_non_terminal_names_are_sanitized() {
        let grammar = Grammar::parse_dsl("expr-list : NUM @").unwrap();
        let tables = Ll1Tables::try_from_grammar(&grammar).unwrap();
        let source = ParserSource::new(&grammar, &tables).to_string();
        assert!(source.contains("ASTNode* expr_list(void) {"));
    }
}
