//! Pattern source composition.
//!
//! Grammars build their regexes out of strings, so composing them is string
//! work too: concatenation, lookahead, optional and alternation wrappers,
//! and the capture-group renumbering needed when several independent
//! patterns are merged into one alternation.

pub mod patterns;

pub use patterns::{
    any_number_of_times, compile_pattern, concat, count_match_groups, either, escape, lookahead,
    optional, rewrite_backreferences, starts_with,
};
