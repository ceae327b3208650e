use thiserror::Error;

/// The result type for the `llgen` crate.
pub type Result<T> = std::result::Result<T, LlgenError>;

/// The error type for the `llgen` crate.
#[derive(Error, Debug)]
pub struct LlgenError {
    /// The source of the error.
    pub source: Box<LlgenErrorKind>,
}

impl LlgenError {
    /// Create a new `LlgenError`.
    pub fn new(kind: LlgenErrorKind) -> Self {
        LlgenError {
            source: Box::new(kind),
        }
    }
}

impl std::fmt::Display for LlgenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.source)
    }
}

/// The error kind type.
#[derive(Error, Debug)]
pub enum LlgenErrorKind {
    /// A malformed regular expression in the lexer specification.
    #[error("regex syntax error in '{pattern}' at position {position}: {message}")]
    RegexSyntax {
        /// The offending pattern.
        pattern: String,
        /// Byte position inside the pattern where parsing failed.
        position: usize,
        /// What went wrong.
        message: String,
    },

    /// The grammar DSL could not be parsed.
    #[error("grammar syntax error: {0}")]
    GrammarSyntax(String),

    /// A parsing table cell was written twice, i.e. the grammar is not LL(1).
    #[error(
        "LL(1) conflict at ({non_terminal}, {terminal}): existing production '{existing}', \
         new production '{new}'"
    )]
    Ll1Conflict {
        /// The non-terminal of the conflicting cell.
        non_terminal: String,
        /// The lookahead terminal of the conflicting cell.
        terminal: String,
        /// The production already stored in the cell.
        existing: String,
        /// The production whose insertion caused the conflict.
        new: String,
    },

    /// A std::io error occurred while emitting an artifact.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A generator bug, e.g. an accepting DFA state without a token tag.
    #[error("internal invariant violated: {0}")]
    InternalInvariant(String),
}

impl From<std::io::Error> for LlgenError {
    fn from(error: std::io::Error) -> Self {
        LlgenError::new(LlgenErrorKind::Io(error))
    }
}
