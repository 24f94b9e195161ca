//! Public highlighting API.
//!
//! [`highlighter::Highlighter`] owns the language registry and the
//! options, and exposes highlighting with a known language as well as
//! auto-detection over a set of candidates. Results carry the rendered
//! value, relevance, illegal-lexeme diagnostics and the mode stack needed
//! to resume highlighting later.

pub mod highlighter;
pub mod options;
pub mod result;

pub use highlighter::{HighlightOptions, Highlighter, LanguageFactory};
pub use options::Options;
pub use result::{HighlightResult, IllegalBy};

#[cfg(test)]
mod tests;
