use std::fmt::Display;

use thiserror::Error;

use crate::{get_line_at_position, Position};

#[derive(Debug, Clone)]
pub struct Error {
    internal_error: ErrorImpl,
    position: Position,
}

impl Error {
    pub fn new(error_impl: ErrorImpl, position: Position) -> Self {
        Error {
            internal_error: error_impl,
            position,
        }
    }

    /// Shorthand for errors that have no meaningful source offset,
    /// such as grammar configuration errors.
    pub fn config(error_impl: ErrorImpl, language: &str) -> Self {
        Error::new(error_impl, Position::in_language(0, language))
    }

    pub fn get_position(&self) -> &Position {
        &self.position
    }

    pub fn get_impl(&self) -> &ErrorImpl {
        &self.internal_error
    }

    pub fn get_error_name(&self) -> &str {
        match &self.internal_error {
            ErrorImpl::UnknownLanguage { .. } => "UnknownLanguage",
            ErrorImpl::SelfAtTopLevel { .. } => "SelfAtTopLevel",
            ErrorImpl::UnknownModeReference { .. } => "UnknownModeReference",
            ErrorImpl::MatchWithBeginOrEnd => "MatchWithBeginOrEnd",
            ErrorImpl::MultiClassIncompatible { .. } => "MultiClassIncompatible",
            ErrorImpl::MalformedScope { .. } => "MalformedScope",
            ErrorImpl::BeforeMatchWithStarts => "BeforeMatchWithStarts",
            ErrorImpl::NestedVariants => "NestedVariants",
            ErrorImpl::ModeNestingTooDeep { .. } => "ModeNestingTooDeep",
            ErrorImpl::InvalidPattern { .. } => "InvalidPattern",
            ErrorImpl::InvalidKeywordRelevance { .. } => "InvalidKeywordRelevance",
            ErrorImpl::InvalidGrammarData { .. } => "InvalidGrammarData",
            ErrorImpl::InvalidOptions { .. } => "InvalidOptions",
            ErrorImpl::IllegalLexeme { .. } => "IllegalLexeme",
            ErrorImpl::ZeroWidthMatch { .. } => "ZeroWidthMatch",
            ErrorImpl::InfiniteLoop { .. } => "InfiniteLoop",
            ErrorImpl::HookPanicked { .. } => "HookPanicked",
        }
    }

    pub fn get_tip(&self) -> ErrorTip {
        match &self.internal_error {
            ErrorImpl::UnknownLanguage { language } => ErrorTip::Suggestion(format!(
                "Language `{}` is not registered, did you register it under another name?",
                language
            )),
            ErrorImpl::SelfAtTopLevel { .. } => ErrorTip::Suggestion(String::from(
                "`self` may only appear inside a nested mode's `contains`",
            )),
            ErrorImpl::UnknownModeReference { name } => {
                ErrorTip::Suggestion(format!("Add `{}` to the language repository", name))
            }
            ErrorImpl::MatchWithBeginOrEnd => ErrorTip::Suggestion(String::from(
                "Use either `match` or `begin`/`end`, not both",
            )),
            ErrorImpl::MultiClassIncompatible { flag, .. } => ErrorTip::Suggestion(format!(
                "`{}` cannot be combined with a multi-pattern delimiter",
                flag
            )),
            ErrorImpl::MalformedScope { key } => ErrorTip::Suggestion(format!(
                "`{}` must map capture indexes to scopes when the pattern is a list",
                key
            )),
            ErrorImpl::BeforeMatchWithStarts => ErrorTip::Suggestion(String::from(
                "`beforeMatch` already uses `starts`, move the chained mode elsewhere",
            )),
            ErrorImpl::NestedVariants => ErrorTip::Suggestion(String::from(
                "Flatten the inner `variants` into the outer list",
            )),
            ErrorImpl::ModeNestingTooDeep { .. } => ErrorTip::Suggestion(String::from(
                "An `endsWithParent` mode with its own `end` cannot contain itself",
            )),
            ErrorImpl::InvalidPattern { pattern, .. } => {
                ErrorTip::Suggestion(format!("Check the pattern `{}`", pattern))
            }
            ErrorImpl::InvalidKeywordRelevance { keyword, .. } => ErrorTip::Suggestion(format!(
                "Keyword `{}` must use an integer relevance after `|`",
                keyword
            )),
            ErrorImpl::InvalidGrammarData { .. } => ErrorTip::None,
            ErrorImpl::InvalidOptions { .. } => ErrorTip::None,
            ErrorImpl::IllegalLexeme { .. } => ErrorTip::Suggestion(String::from(
                "Enable safe mode or ignore illegals to highlight malformed input",
            )),
            ErrorImpl::ZeroWidthMatch { .. } => ErrorTip::Suggestion(String::from(
                "A begin pattern and the following end pattern both matched nothing",
            )),
            ErrorImpl::InfiniteLoop { .. } => ErrorTip::Suggestion(String::from(
                "The grammar keeps matching without consuming input",
            )),
            ErrorImpl::HookPanicked { .. } => ErrorTip::None,
        }
    }

    /// Errors raised by a malformed grammar or an unknown language.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self.internal_error,
            ErrorImpl::UnknownLanguage { .. }
                | ErrorImpl::SelfAtTopLevel { .. }
                | ErrorImpl::UnknownModeReference { .. }
                | ErrorImpl::MatchWithBeginOrEnd
                | ErrorImpl::MultiClassIncompatible { .. }
                | ErrorImpl::MalformedScope { .. }
                | ErrorImpl::BeforeMatchWithStarts
                | ErrorImpl::NestedVariants
                | ErrorImpl::ModeNestingTooDeep { .. }
                | ErrorImpl::InvalidPattern { .. }
                | ErrorImpl::InvalidKeywordRelevance { .. }
                | ErrorImpl::InvalidGrammarData { .. }
                | ErrorImpl::InvalidOptions { .. }
        )
    }

    pub fn is_illegal(&self) -> bool {
        matches!(self.internal_error, ErrorImpl::IllegalLexeme { .. })
    }

    pub fn is_infinite_loop(&self) -> bool {
        matches!(self.internal_error, ErrorImpl::InfiniteLoop { .. })
    }

    /// Renders the error against the text it was raised for.
    ///
    /// ```text
    /// Error: IllegalLexeme (Enable safe mode or ignore illegals to highlight malformed input)
    /// -> json
    ///   |
    /// 2 | "a": x
    ///   | -----^
    /// ```
    pub fn render(&self, code: &str) -> String {
        let mut out = String::new();

        if let ErrorTip::None = self.get_tip() {
            out.push_str(&format!("Error: {}\n", self.get_error_name()));
        } else {
            out.push_str(&format!("Error: {} ({})\n", self.get_error_name(), self.get_tip()));
        }
        out.push_str(&format!("-> {}\n", self.position.1));

        let Some((line, line_text, line_pos)) = get_line_at_position(code, self.position.0) else {
            return out;
        };

        let line_string = line.to_string();
        let padding = line_string.len() + 2;
        let (line_text_removed, removed_whitespace) = remove_starting_whitespace(line_text);
        let arrows = line_pos.saturating_sub(removed_whitespace) + 1;

        out.push_str(&format!("{:>padding$}\n", "|"));
        out.push_str(&format!("{} | {}\n", line_string, line_text_removed.trim_end()));
        out.push_str(&format!("{:>padding$} {:->arrows$}\n", "|", "^"));
        out
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.internal_error)
    }
}

impl std::error::Error for Error {}

fn remove_starting_whitespace(string: &str) -> (&str, usize) {
    let trimmed = string.trim_start_matches(' ');
    (trimmed, string.len() - trimmed.len())
}

pub enum ErrorTip {
    None,
    Suggestion(String),
}

impl Display for ErrorTip {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorTip::None => write!(f, ""),
            ErrorTip::Suggestion(suggestion) => write!(f, "{}", suggestion),
        }
    }
}

#[derive(Error, Debug, Clone)]
pub enum ErrorImpl {
    #[error("unknown language: {language:?}")]
    UnknownLanguage { language: String },
    #[error("contains `self` is not supported at the top-level of language {language:?}")]
    SelfAtTopLevel { language: String },
    #[error("unknown mode reference {name:?}")]
    UnknownModeReference { name: String },
    #[error("begin & end are not supported with match")]
    MatchWithBeginOrEnd,
    #[error("{flag} is not compatible with a multi-pattern {key}")]
    MultiClassIncompatible { flag: String, key: String },
    #[error("{key} must be a capture-index map")]
    MalformedScope { key: String },
    #[error("beforeMatch cannot be used with starts")]
    BeforeMatchWithStarts,
    #[error("a variant cannot declare variants of its own")]
    NestedVariants,
    #[error("modes nest deeper than {limit} levels while compiling")]
    ModeNestingTooDeep { limit: usize },
    #[error("invalid pattern {pattern:?}: {message}")]
    InvalidPattern { pattern: String, message: String },
    #[error("invalid relevance {value:?} for keyword {keyword:?}")]
    InvalidKeywordRelevance { keyword: String, value: String },
    #[error("invalid grammar data: {message}")]
    InvalidGrammarData { message: String },
    #[error("invalid options: {message}")]
    InvalidOptions { message: String },
    #[error("Illegal lexeme {lexeme:?} for mode {mode:?}")]
    IllegalLexeme { lexeme: String, mode: String },
    #[error("0 width match regex ({language})")]
    ZeroWidthMatch { language: String },
    #[error("potential infinite loop, way more iterations than matches ({iterations} iterations)")]
    InfiniteLoop { iterations: usize },
    #[error("match hook panicked: {message}")]
    HookPanicked { message: String },
}
