//! Emitters.
//!
//! The lexer never builds output itself; it drives an [`emitter::Emitter`]
//! with text and balanced open/close events. [`token_tree::TokenTree`] is
//! the default emitter and renders to HTML spans.

pub mod emitter;
pub mod html;
pub mod token_tree;

pub use emitter::Emitter;
pub use token_tree::{Node, ScopeNode, TokenTree};

#[cfg(test)]
mod tests;
