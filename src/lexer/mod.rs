//! The tokenization state machine.
//!
//! A [`lexer::Lexer`] runs one compiled language over one input. It keeps
//! the stack of active modes and drives their rule matchers across the
//! input, turning every match into emitter events:
//!
//! - Begin matches open a child mode (subject to hooks and the `.` guard)
//! - End matches close one or more modes, cascading through
//!   `endsWithParent` and `endsParent`
//! - Text between matches is split into keywords or handed to a
//!   sub-language
//! - Illegal lexemes, zero-width loops and runaway iteration are detected
//!   and reported as errors

pub mod lexer;
