//! Mode fragments shared between grammars.
//!
//! The shared modes live in statics so that every grammar referencing, say,
//! [`struct@QUOTE_STRING_MODE`] hands the compiler the same `Arc`; the
//! compiler memoizes by identity and compiles each of them once per
//! language.

use lazy_static::lazy_static;
use std::sync::Arc;

use super::{
    hooks::HookAction,
    mode::{Contained, Mode},
};

pub const MATCH_NOTHING_RE: &str = "\\b\\B";
pub const IDENT_RE: &str = "[a-zA-Z]\\w*";
pub const UNDERSCORE_IDENT_RE: &str = "[a-zA-Z_]\\w*";
pub const NUMBER_RE: &str = "\\b\\d+(\\.\\d+)?";
pub const C_NUMBER_RE: &str =
    "(-?)(\\b0[xX][a-fA-F0-9]+|(\\b\\d+(\\.\\d*)?|\\.\\d+)([eE][-+]?\\d+)?)";
pub const BINARY_NUMBER_RE: &str = "\\b(0b[01]+)";
pub const RE_STARTERS_RE: &str = "!|!=|!==|%|%=|&|&&|&=|\\*|\\*=|\\+|\\+=|,|-|-=|/=|/|:|;|<<|<<=|<=|<|===|==|=|>>>=|>>=|>=|>>>|>>|>|\\?|\\[|\\{|\\(|\\^|\\^=|\\||\\|=|\\|\\||~";

lazy_static! {
    pub static ref BACKSLASH_ESCAPE: Arc<Mode> =
        Arc::new(Mode::new().begin("\\\\[\\s\\S]").relevance(0));

    pub static ref APOS_STRING_MODE: Arc<Mode> = Arc::new(
        Mode::new()
            .scope("string")
            .begin("'")
            .end("'")
            .illegal("\\n")
            .contains([&*BACKSLASH_ESCAPE])
    );

    pub static ref QUOTE_STRING_MODE: Arc<Mode> = Arc::new(
        Mode::new()
            .scope("string")
            .begin("\"")
            .end("\"")
            .illegal("\\n")
            .contains([&*BACKSLASH_ESCAPE])
    );

    pub static ref PHRASAL_WORDS_MODE: Arc<Mode> = Arc::new(Mode::new().begin(
        "\\b(a|an|the|are|I'm|isn't|don't|doesn't|won't|but|just|should|pretty|simply|enough|gonna|going|wtf|so|such|will|you|your|they|like|more)\\b"
    ));

    pub static ref C_LINE_COMMENT_MODE: Arc<Mode> = Arc::new(comment("//", "$", Mode::new()));
    pub static ref C_BLOCK_COMMENT_MODE: Arc<Mode> =
        Arc::new(comment("/\\*", "\\*/", Mode::new()));
    pub static ref HASH_COMMENT_MODE: Arc<Mode> = Arc::new(comment("#", "$", Mode::new()));

    pub static ref NUMBER_MODE: Arc<Mode> =
        Arc::new(Mode::new().scope("number").begin(NUMBER_RE).relevance(0));
    pub static ref C_NUMBER_MODE: Arc<Mode> =
        Arc::new(Mode::new().scope("number").begin(C_NUMBER_RE).relevance(0));
    pub static ref BINARY_NUMBER_MODE: Arc<Mode> =
        Arc::new(Mode::new().scope("number").begin(BINARY_NUMBER_RE).relevance(0));

    pub static ref REGEXP_MODE: Arc<Mode> = Arc::new(
        Mode::new()
            .scope("regexp")
            .begin("\\/(?=[^/\\n]*\\/)")
            .end("\\/[gimuy]*")
            .contains([
                Contained::from(&*BACKSLASH_ESCAPE),
                Contained::from(
                    Mode::new()
                        .begin("\\[")
                        .end("\\]")
                        .relevance(0)
                        .contains([&*BACKSLASH_ESCAPE])
                ),
            ])
    );

    pub static ref TITLE_MODE: Arc<Mode> =
        Arc::new(Mode::new().scope("title").begin(IDENT_RE).relevance(0));
    pub static ref UNDERSCORE_TITLE_MODE: Arc<Mode> =
        Arc::new(Mode::new().scope("title").begin(UNDERSCORE_IDENT_RE).relevance(0));

    /// Swallows `.method` so the method name is not read as a keyword.
    pub static ref METHOD_GUARD: Arc<Mode> = Arc::new(
        Mode::new()
            .begin(format!("\\.\\s*{}", UNDERSCORE_IDENT_RE))
            .relevance(0)
    );
}

/// A comment mode running from `begin` to `end`, recognising `TODO:`-style
/// doc tags and, to score prose, runs of ordinary English words. Fields set
/// on `extra` override the defaults.
pub fn comment(begin: &str, end: &str, extra: Mode) -> Mode {
    let english_word = crate::MK_EITHER!(
        "I",
        "a",
        "is",
        "so",
        "us",
        "to",
        "at",
        "if",
        "in",
        "it",
        "on",
        "[A-Za-z]+['](d|ve|re|ll|t|s|n)",
        "[A-Za-z]+[-][a-z]+",
        "[A-Za-z][a-z]{2,}",
    );

    let doctag = Mode::new()
        .scope("doctag")
        .begin("[ ]*(?=(TODO|FIXME|NOTE|BUG|OPTIMIZE|HACK|XXX):)")
        .end("(TODO|FIXME|NOTE|BUG|OPTIMIZE|HACK|XXX):")
        .exclude_begin()
        .relevance(0);

    let prose = Mode::new().begin(crate::MK_CONCAT!(
        "[ ]+",
        "(",
        english_word,
        "[.]?[:]?([.][ ]|[ ])",
        "){3}",
    ));

    let base = Mode::new()
        .scope("comment")
        .begin(begin)
        .end(end)
        .contains(Vec::<Contained>::new());
    let mut mode = base.inherit(&extra);

    let contains = mode.contains.get_or_insert_with(Vec::new);
    contains.push(Contained::from(doctag));
    contains.push(Contained::from(prose));
    mode
}

/// A `#!` interpreter line, only honoured at the very start of the text.
/// With `binary`, only lines naming that interpreter match.
pub fn shebang(binary: Option<&str>) -> Mode {
    let begin_shebang = "^#![ ]*\\/";
    let begin = match binary {
        Some(binary) => crate::MK_CONCAT!(begin_shebang, ".*\\b", binary, "\\b.*"),
        None => begin_shebang.to_string(),
    };

    Mode::new()
        .scope("meta")
        .begin(begin)
        .end("$")
        .relevance(0)
        .on_begin(|m, _| {
            if m.index() != 0 {
                HookAction::IgnoreMatch
            } else {
                HookAction::Continue
            }
        })
}

/// Makes `mode` end only where its end pattern's first group repeats the
/// begin pattern's first group (heredocs and the like).
pub fn end_same_as_begin(mode: Mode) -> Mode {
    mode.on_begin(|m, data| {
        if let Some(delimiter) = m.group(1) {
            data.insert("_beginMatch".to_string(), delimiter.to_string());
        }
        HookAction::Continue
    })
    .on_end(|m, data| {
        if data.get("_beginMatch").map(String::as_str) != m.group(1) {
            HookAction::IgnoreMatch
        } else {
            HookAction::Continue
        }
    })
}
