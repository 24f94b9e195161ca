//! Grammar compilation.
//!
//! This module turns raw grammars into the form the lexer runs on. It
//! handles:
//!
//! - Normalization of grammar sugar (`className`, `match`, `beginKeywords`,
//!   `beforeMatch`, list-valued delimiters with per-group scopes)
//! - Resolution of `self`, named repository modes and variants
//! - Terminator propagation for `endsWithParent` chains
//! - Per-mode rule matchers that fold every child begin pattern, the end
//!   terminator and the illegal pattern into one alternation

pub mod compiled;
pub mod compiler;
pub mod matcher;

pub use compiled::{CompiledLanguage, CompiledMode, ModeId, ScopeEmit};
pub use compiler::compile_language;
pub use matcher::{RuleKind, RuleMatch, RuleMatcher};

#[cfg(test)]
mod tests;
