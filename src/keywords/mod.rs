//! Keyword tables.
//!
//! Turns a grammar's keyword declaration (space separated words, a list,
//! or a map of category to words, each word optionally suffixed `|N` for an
//! explicit relevance) into an O(1) lookup table used while scanning plain
//! text.

pub mod keywords;

pub use keywords::{KeywordEntry, KeywordTable, DEFAULT_KEYWORD_PATTERN};
