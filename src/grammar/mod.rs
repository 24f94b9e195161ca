//! Raw grammar definitions.
//!
//! A grammar is a tree of [`mode::Mode`]s rooted in a
//! [`language::Language`]. This is the authoring format: every field is
//! optional, modes may be shared between parents (by `Arc`) or referenced
//! by name from the language repository, and `variants` describe several
//! modes at once. The compiler turns this into an immutable arena of
//! compiled modes.
//!
//! Grammars can be written in Rust with the builder methods or loaded as
//! JSON data; hooks and compiler extensions are Rust-only.

pub mod common;
pub mod hooks;
pub mod language;
pub mod mode;
