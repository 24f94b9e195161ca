use crate::{
    compiler::compiled::ModeId,
    emitter::{html::escape, Emitter, TokenTree},
    errors::errors::Error,
};

/// Where and why a run hit an illegal lexeme.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IllegalBy {
    pub message: String,
    /// Byte offset of the illegal match.
    pub index: usize,
    /// Up to 100 bytes of input on either side of `index`.
    pub context: String,
    /// Scope of the mode the lexeme was illegal in, or `<unnamed>`.
    pub mode: String,
    pub line: usize,
    pub column: usize,
}

/// Outcome of a highlight run.
#[derive(Debug, Clone)]
pub struct HighlightResult<E = TokenTree> {
    /// Canonical name of the language used; `None` for the plain-text
    /// fallback of auto-detection.
    pub language: Option<String>,
    /// Rendered output, or the escaped input for illegal, failed and
    /// plain-text results.
    pub value: String,
    pub relevance: u32,
    pub illegal: bool,
    pub illegal_by: Option<IllegalBy>,
    /// The failure a safe-mode run recovered from.
    pub error_raised: Option<Error>,
    pub emitter: E,
    /// Mode stack at the end of the run, root first. Pass it back as a
    /// continuation to resume highlighting where this run stopped.
    pub top: Vec<ModeId>,
    /// Runner-up of auto-detection.
    pub second_best: Option<Box<HighlightResult<E>>>,
}

impl<E: Emitter> HighlightResult<E> {
    /// The input as one unhighlighted text run.
    pub fn plaintext(code: &str) -> Self {
        let mut emitter = E::default();
        emitter.add_text(code);
        emitter.finalize();

        HighlightResult {
            language: None,
            value: escape(code),
            relevance: 0,
            illegal: false,
            illegal_by: None,
            error_raised: None,
            emitter,
            top: vec![],
            second_best: None,
        }
    }
}
