use lazy_static::lazy_static;
use onig::{Regex as OnigRegex, RegexOptions, SearchOptions, Syntax};
use regex::Regex;

use crate::errors::errors::{Error, ErrorImpl};
use crate::Position;

lazy_static! {
    /// Walks a pattern source one significant unit at a time: a whole
    /// character class, a group opener (`(` or `(?`), a numbered
    /// backreference, or any other escape.
    static ref BACKREF_RE: Regex =
        Regex::new(r"\[(?:[^\\\]]|\\.)*\]|\(\??|\\([1-9][0-9]*)|\\.").unwrap();

    static ref SPECIAL_RE: Regex = Regex::new(r"[-/\\^$*+?.()|\[\]{}]").unwrap();
}

/// Joins pattern sources with no separator.
pub fn concat<S: AsRef<str>>(parts: &[S]) -> String {
    parts.iter().map(|part| part.as_ref()).collect()
}

pub fn lookahead(pattern: &str) -> String {
    format!("(?={})", pattern)
}

pub fn any_number_of_times(pattern: &str) -> String {
    format!("(?:{})*", pattern)
}

pub fn optional(pattern: &str) -> String {
    format!("(?:{})?", pattern)
}

/// Alternation of `patterns`, as a capturing group when `capture` is set.
pub fn either<S: AsRef<str>>(patterns: &[S], capture: bool) -> String {
    let body = patterns
        .iter()
        .map(|pattern| pattern.as_ref())
        .collect::<Vec<_>>()
        .join("|");

    if capture {
        format!("({})", body)
    } else {
        format!("(?:{})", body)
    }
}

/// Escapes `value` so it matches literally.
pub fn escape(value: &str) -> String {
    SPECIAL_RE.replace_all(value, "\\$0").into_owned()
}

/// Compiles a grammar pattern with the flags every grammar regex shares:
/// `^`/`$` match at line boundaries, plain groups always capture, and
/// case folding when the language asks for it.
pub fn compile_pattern(pattern: &str, case_insensitive: bool) -> Result<OnigRegex, Error> {
    let mut options = RegexOptions::REGEX_OPTION_CAPTURE_GROUP;
    if case_insensitive {
        options |= RegexOptions::REGEX_OPTION_IGNORECASE;
    }

    OnigRegex::with_options(pattern, options, Syntax::ruby())
        .map_err(|err| invalid_pattern(pattern, &err))
}

/// Number of capture groups the regex engine sees in `pattern`.
pub fn count_match_groups(pattern: &str) -> Result<usize, Error> {
    Ok(compile_pattern(pattern, false)?.captures_len())
}

/// Does `regex` match `text` exactly at byte offset `at`?
pub fn starts_with(regex: &OnigRegex, text: &str, at: usize) -> bool {
    at <= text.len()
        && regex
            .match_with_options(text, at, SearchOptions::SEARCH_OPTION_NONE, None)
            .is_some()
}

/// Wraps every pattern in a capture group and joins them with `join_with`,
/// shifting each pattern's numbered backreferences past the groups opened
/// by the patterns before it.
///
/// `["(a)\\1", "(b)(c)\\2"]` joined with `|` becomes
/// `((a)\\2)|((b)(c)\\5)`.
pub fn rewrite_backreferences<S: AsRef<str>>(patterns: &[S], join_with: &str) -> String {
    let mut num_captures = 0;

    patterns
        .iter()
        .map(|pattern| {
            num_captures += 1;
            let offset = num_captures;
            let mut re = pattern.as_ref();
            let mut out = String::with_capacity(re.len() + 2);

            while !re.is_empty() {
                let Some(captures) = BACKREF_RE.captures(re) else {
                    out.push_str(re);
                    break;
                };
                let whole = captures.get(0).map_or(0..0, |m| m.range());

                out.push_str(&re[..whole.start]);

                match captures.get(1) {
                    Some(number) => {
                        let shifted = number.as_str().parse::<usize>().unwrap_or(0) + offset;
                        out.push('\\');
                        out.push_str(&shifted.to_string());
                    }
                    None => {
                        let token = &re[whole.clone()];
                        out.push_str(token);
                        if token == "(" {
                            num_captures += 1;
                        }
                    }
                }

                re = &re[whole.end..];
            }

            format!("({})", out)
        })
        .collect::<Vec<_>>()
        .join(join_with)
}

pub(crate) fn invalid_pattern(pattern: &str, err: &onig::Error) -> Error {
    Error::new(
        ErrorImpl::InvalidPattern {
            pattern: pattern.to_string(),
            message: err.to_string(),
        },
        Position::null(),
    )
}
