//! Driver binary: reads a lexer specification and a grammar file and emits the C artifacts
//! into an output directory.

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use llgen::{CodeGenerator, Grammar, LexerSpec};

#[derive(Parser, Debug)]
#[command(version, about = "Lexer and LL(1) parser generator emitting C code")]
struct Cli {
    /// Path to the lexer specification (JSON)
    lexer_spec: PathBuf,
    /// Path to the grammar DSL file
    grammar: PathBuf,
    /// Output directory for the emitted C files
    #[arg(short, long, default_value = ".")]
    out_dir: PathBuf,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("llgen: {}", error);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let spec_file = fs::File::open(&cli.lexer_spec)?;
    let lexer_spec = LexerSpec::from_reader(spec_file)?;
    let grammar_text = fs::read_to_string(&cli.grammar)?;
    let grammar = Grammar::parse_dsl(&grammar_text)?;
    fs::create_dir_all(&cli.out_dir)?;
    CodeGenerator::new(lexer_spec, grammar).generate(&cli.out_dir)?;
    Ok(())
}
