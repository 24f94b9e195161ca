//! Error types and error handling for the highlighter.
//!
//! This module defines the error types used throughout grammar compilation
//! and highlighting. It includes:
//!
//! - Error structures with an offset and the language they were raised for
//! - Specific error variants for configuration errors, illegal input and
//!   pathological grammars
//! - Error formatting and display functionality
//! - Helpful error messages and suggestions

pub mod errors;
