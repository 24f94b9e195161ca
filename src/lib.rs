#![allow(clippy::module_inception)]

//! A regex-driven syntax highlighting engine.
//!
//! Grammars are trees of [`Mode`]s (begin/end patterns, keyword tables,
//! nested modes, sub-language delegation). Registering a [`Language`]
//! compiles it once into an arena of compiled modes, each carrying a rule
//! matcher that folds all of its child patterns into one alternation. The
//! lexer walks the input with a stack of active modes and drives an
//! [`Emitter`] with balanced open/close/text events.
//!
//! ```ignore
//! let mut hl = Highlighter::new();
//! hl.register_language("ini", ini_grammar)?;
//! let result = hl.highlight("key = 1", &HighlightOptions::new("ini"))?;
//! println!("{}", result.value);
//! ```

use std::sync::Arc;

pub mod compiler;
pub mod emitter;
pub mod errors;
pub mod grammar;
pub mod highlighter;
pub mod keywords;
pub mod lexer;
pub mod macros;
pub mod patterns;

extern crate regex;

pub use compiler::compiled::{CompiledLanguage, CompiledMode, ModeId};
pub use emitter::{emitter::Emitter, token_tree::TokenTree};
pub use errors::errors::{Error, ErrorImpl, ErrorTip};
pub use grammar::{
    hooks::{HookAction, MatchContext, ModeData},
    language::Language,
    mode::{Contained, Keywords, Mode, Pattern, Scope, SubLanguage},
};
pub use highlighter::{
    highlighter::{HighlightOptions, Highlighter},
    options::Options,
    result::{HighlightResult, IllegalBy},
};

/// A byte offset into highlighted text, tagged with the language that was
/// being processed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Position(pub usize, pub Arc<str>);

impl Position {
    pub fn null() -> Self {
        Position(0, Arc::from("<null>"))
    }

    pub fn in_language(offset: usize, language: &str) -> Self {
        Position(offset, Arc::from(language))
    }
}

/// Finds the line containing `position` and returns its 1-based number, its
/// text (including the trailing newline) and the offset of `position`
/// within it.
pub fn get_line_at_position(content: &str, position: usize) -> Option<(usize, &str, usize)> {
    if position >= content.len() {
        return None;
    }

    let mut start = 0;

    for (index, line) in content.split_inclusive('\n').enumerate() {
        let end = start + line.len();

        if (start..end).contains(&position) {
            return Some((index + 1, line, position - start));
        }

        start = end;
    }

    None
}
