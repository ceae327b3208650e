//! End-to-end tests of the generation pipeline: build a lexer specification and a grammar,
//! run the generator into a temporary directory and inspect the emitted C artifacts.

use std::fs;

use llgen::{CodeGenerator, Grammar, LexerSpec, TokenRule};

const ARTIFACTS: [&str; 6] = [
    "regex_dfa.h",
    "regex_dfa.c",
    "lexer.h",
    "lexer.c",
    "parser.h",
    "parser.c",
];

fn arith_spec() -> LexerSpec {
    LexerSpec::new(vec![
        TokenRule::new("NUMBER", r"\d+"),
        TokenRule::new("PLUS", r"\+"),
        TokenRule::new("MUL", r"\*"),
        TokenRule::new("LPAREN", r"\("),
        TokenRule::new("RPAREN", r"\)"),
    ])
}

fn arith_grammar() -> Grammar {
    Grammar::parse_dsl(
        "
        # expression grammar, already LL(1)
        E : T EPrime $ node = _T; @
        EPrime : PLUS T EPrime | epsilon @
        T : F TPrime @
        TPrime : MUL F TPrime | epsilon @
        F : LPAREN E RPAREN | NUMBER $ node = new_node(1); @
        ",
    )
    .unwrap()
}

#[test]
fn test_generate_all_artifacts() {
    let out_dir = tempfile::tempdir().unwrap();
    CodeGenerator::new(arith_spec(), arith_grammar())
        .generate(out_dir.path())
        .unwrap();

    for name in ARTIFACTS {
        let content = fs::read_to_string(out_dir.path().join(name))
            .unwrap_or_else(|e| panic!("missing artifact {}: {}", name, e));
        assert!(!content.is_empty(), "artifact {} is empty", name);
    }

    let regex_dfa_h = fs::read_to_string(out_dir.path().join("regex_dfa.h")).unwrap();
    assert!(regex_dfa_h.contains("TOKEN_NUMBER,"));
    assert!(regex_dfa_h.contains("const char* match_pattern"));

    let regex_dfa_c = fs::read_to_string(out_dir.path().join("regex_dfa.c")).unwrap();
    assert!(regex_dfa_c.contains("STATE_0:"));
    assert!(regex_dfa_c.contains("last_token = TOKEN_NUMBER;"));
    assert!(regex_dfa_c.contains("DEAD:"));

    let lexer_h = fs::read_to_string(out_dir.path().join("lexer.h")).unwrap();
    assert!(lexer_h.contains("TOKEN_NUMBER,"));
    assert!(lexer_h.contains("TOKEN_ERROR"));
    assert!(lexer_h.contains("int tokenize(const char* input, Token* out_tokens, int max_tokens);"));

    let lexer_c = fs::read_to_string(out_dir.path().join("lexer.c")).unwrap();
    assert!(lexer_c.contains("#define SKIP_WHITESPACE 1"));

    let parser_c = fs::read_to_string(out_dir.path().join("parser.c")).unwrap();
    assert!(parser_c.contains("ASTNode* E(void) {"));
    assert!(parser_c.contains("case TOKEN_NUMBER:"));
    assert!(parser_c.contains("node = new_node(1);"));
    assert!(parser_c.contains("ASTNode* root = E();"));
}

#[test]
fn test_generation_is_deterministic() {
    let first_dir = tempfile::tempdir().unwrap();
    let second_dir = tempfile::tempdir().unwrap();
    CodeGenerator::new(arith_spec(), arith_grammar())
        .generate(first_dir.path())
        .unwrap();
    CodeGenerator::new(arith_spec(), arith_grammar())
        .generate(second_dir.path())
        .unwrap();

    for name in ARTIFACTS {
        let first = fs::read_to_string(first_dir.path().join(name)).unwrap();
        let second = fs::read_to_string(second_dir.path().join(name)).unwrap();
        assert_eq!(first, second, "artifact {} differs between runs", name);
    }
}

#[test]
fn test_conflicting_grammar_aborts_before_writing() {
    let grammar = Grammar::parse_dsl("A : NUMBER B | NUMBER C @ B : PLUS @ C : MUL @").unwrap();
    let out_dir = tempfile::tempdir().unwrap();
    let error = CodeGenerator::new(arith_spec(), grammar)
        .generate(out_dir.path())
        .unwrap_err();
    assert!(error.to_string().contains("LL(1) conflict"));
    assert_eq!(fs::read_dir(out_dir.path()).unwrap().count(), 0);
}

#[test]
fn test_bad_regex_aborts_before_writing() {
    let spec = LexerSpec::new(vec![TokenRule::new("BROKEN", "(ab")]);
    let out_dir = tempfile::tempdir().unwrap();
    let error = CodeGenerator::new(spec, arith_grammar())
        .generate(out_dir.path())
        .unwrap_err();
    assert!(error.to_string().contains("unbalanced parenthesis"));
    assert_eq!(fs::read_dir(out_dir.path()).unwrap().count(), 0);
}

#[test]
fn test_json_spec_round_trip() {
    let json = r#"{
        "rules": [
            { "name": "IF", "pattern": "if" },
            { "name": "ID", "pattern": "[a-zA-Z_][a-zA-Z0-9_]*" }
        ],
        "skip_whitespace": false
    }"#;
    let spec = LexerSpec::from_reader(json.as_bytes()).unwrap();
    let grammar = Grammar::parse_dsl("S : IF ID @").unwrap();
    let out_dir = tempfile::tempdir().unwrap();
    CodeGenerator::new(spec, grammar).generate(out_dir.path()).unwrap();

    let lexer_c = fs::read_to_string(out_dir.path().join("lexer.c")).unwrap();
    assert!(lexer_c.contains("#define SKIP_WHITESPACE 0"));

    let regex_dfa_c = fs::read_to_string(out_dir.path().join("regex_dfa.c")).unwrap();
    assert!(regex_dfa_c.contains("last_token = TOKEN_IF;"));
    assert!(regex_dfa_c.contains("last_token = TOKEN_ID;"));
}
