//! Utility macros for writing grammars.
//!
//! - `MK_CONCAT!` - Joins pattern sources back to back
//! - `MK_EITHER!` - Builds an alternation of pattern sources
//!
//! Both accept any mix of `&str` and `String` arguments, which keeps
//! grammar definitions free of `.as_str()` noise.

/// Joins pattern sources with no separator.
///
/// # Example
///
/// ```ignore
/// let call = MK_CONCAT!(IDENT_RE, "\\s*", lookahead("\\("));
/// ```
#[macro_export]
macro_rules! MK_CONCAT {
    ($($part:expr),+ $(,)?) => {
        $crate::patterns::concat::<&str>(&[$(::std::convert::AsRef::<str>::as_ref(&$part)),+])
    };
}

/// Alternation of pattern sources; `capture:` in front makes it a capturing
/// group.
///
/// # Example
///
/// ```ignore
/// let word = MK_EITHER!("if", "else", "while");
/// let keyword = MK_EITHER!(capture: "let", "const");
/// ```
#[macro_export]
macro_rules! MK_EITHER {
    (capture: $($pattern:expr),+ $(,)?) => {
        $crate::patterns::either::<&str>(
            &[$(::std::convert::AsRef::<str>::as_ref(&$pattern)),+],
            true,
        )
    };
    ($($pattern:expr),+ $(,)?) => {
        $crate::patterns::either::<&str>(
            &[$(::std::convert::AsRef::<str>::as_ref(&$pattern)),+],
            false,
        )
    };
}
