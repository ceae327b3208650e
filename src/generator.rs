//! Module with the one-shot generation pipeline.
//! A generator invocation consumes a lexer specification and a grammar and writes the C
//! artifacts: the tokenizer DFA (`regex_dfa.h`/`regex_dfa.c`), the stream-level lexer shell
//! (`lexer.h`/`lexer.c`) and the LL(1) parser (`parser.h`/`parser.c`).

use std::fs::File;
use std::io::Write;
use std::path::Path;

use log::info;

use crate::{
    grammar::Grammar,
    internal::{
        dfa::Dfa,
        dfa_emitter::{DfaHeader, DfaSource},
        ll1::Ll1Tables,
        parser_emitter::{ParserHeader, ParserSource},
        templates, MultiPatternNfa,
    },
    lexer_spec::LexerSpec,
    Result,
};

/// The code generator. All failures are fatal: any regex error, grammar error or LL(1)
/// conflict aborts generation before the first artifact is written.
#[derive(Debug, Clone)]
pub struct CodeGenerator {
    lexer_spec: LexerSpec,
    grammar: Grammar,
}

impl CodeGenerator {
    /// Create a generator for the given lexer specification and grammar.
    pub fn new(lexer_spec: LexerSpec, grammar: Grammar) -> Self {
        Self {
            lexer_spec,
            grammar,
        }
    }

    /// Generate all C artifacts into the output directory.
    /// Each file is written under a truncating create and closed before the next one opens.
    pub fn generate(&self, out_dir: &Path) -> Result<()> {
        let multi = MultiPatternNfa::try_from_rules(&self.lexer_spec.rules)?;
        let dfa = Dfa::try_from_nfa(&multi)?;
        let tables = Ll1Tables::try_from_grammar(&self.grammar)?;

        let token_names = self.lexer_spec.token_names();
        write_artifact(
            out_dir,
            "regex_dfa.h",
            &DfaHeader::new(&token_names).to_string(),
        )?;
        write_artifact(out_dir, "regex_dfa.c", &DfaSource::new(&dfa).to_string())?;
        write_artifact(
            out_dir,
            "lexer.h",
            &templates::LEXER_HEADER.replace("{token_enums}", &token_enums(&token_names)),
        )?;
        write_artifact(
            out_dir,
            "lexer.c",
            &templates::LEXER_SOURCE.replace(
                "{skip_whitespace}",
                if self.lexer_spec.skip_whitespace {
                    "1"
                } else {
                    "0"
                },
            ),
        )?;
        write_artifact(out_dir, "parser.h", &ParserHeader.to_string())?;
        write_artifact(
            out_dir,
            "parser.c",
            &ParserSource::new(&self.grammar, &tables).to_string(),
        )?;
        Ok(())
    }
}

/// The enumerator list injected into the lexer header template.
fn token_enums(token_names: &[&str]) -> String {
    token_names
        .iter()
        .map(|name| format!("TOKEN_{}", name.to_uppercase()))
        .chain(["TOKEN_EOF".to_string(), "TOKEN_ERROR".to_string()])
        .collect::<Vec<_>>()
        .join(",\n    ")
}

fn write_artifact(out_dir: &Path, name: &str, content: &str) -> Result<()> {
    let path = out_dir.join(name);
    let mut file = File::create(&path)?;
    file.write_all(content.as_bytes())?;
    info!("wrote {}", path.display());
    Ok(())
}
