//! Compiled grammar representation.
//!
//! A compiled language owns every compiled mode in a flat arena; modes
//! refer to their children, their `starts` continuation and (through the
//! lexer's stack) their parents by [`ModeId`]. Nothing in here is mutated
//! after compilation, so one compiled language can serve any number of
//! concurrent highlight runs.

use std::{
    collections::{BTreeMap, HashMap},
    fmt,
};

use onig::Regex as OnigRegex;

use crate::{
    grammar::{hooks::Hook, mode::SubLanguage},
    keywords::KeywordTable,
};

use super::matcher::RuleMatcher;

/// Index of a compiled mode inside its [`CompiledLanguage`].
pub type ModeId = usize;

/// How the text of a begin or end match is emitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeEmit {
    /// The whole match as one span.
    Wrap(String),
    /// One span per capture group of the joined delimiter pattern. Groups
    /// without a label are keyword-scanned as plain text.
    Multi(BTreeMap<usize, Option<String>>),
}

/// Keyword table of a mode together with the identifier pattern used to cut
/// candidate words out of its plain text.
pub struct CompiledKeywords {
    pub table: KeywordTable,
    pub pattern: String,
    pub(crate) pattern_re: OnigRegex,
}

impl fmt::Debug for CompiledKeywords {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledKeywords")
            .field("table", &self.table)
            .field("pattern", &self.pattern)
            .finish()
    }
}

pub struct CompiledMode {
    pub scope: Option<String>,
    pub begin_scope: Option<ScopeEmit>,
    pub end_scope: Option<ScopeEmit>,
    /// Begin pattern source; empty for the root mode.
    pub begin: String,
    pub end: Option<String>,
    pub(crate) end_re: Option<OnigRegex>,
    /// Everything that ends this mode: its own end pattern plus, for
    /// `endsWithParent` modes, the terminators of the ancestors it closes
    /// with.
    pub terminator_end: String,
    pub illegal: Option<String>,
    pub keywords: Option<CompiledKeywords>,
    pub relevance: u32,
    pub contains: Vec<ModeId>,
    pub starts: Option<ModeId>,
    pub ends_with_parent: bool,
    pub ends_parent: bool,
    pub exclude_begin: bool,
    pub exclude_end: bool,
    pub return_begin: bool,
    pub return_end: bool,
    pub skip: bool,
    pub sub_language: Option<SubLanguage>,
    /// Reject begin matches directly preceded by `.` (set for modes built
    /// from `beginKeywords`, so `foo.class` is not the `class` keyword).
    pub(crate) skip_if_preceded_by_dot: bool,
    pub(crate) on_begin: Option<Hook>,
    pub(crate) on_end: Option<Hook>,
    pub(crate) matcher: RuleMatcher,
}

impl CompiledMode {
    pub fn matcher(&self) -> &RuleMatcher {
        &self.matcher
    }
}

impl fmt::Debug for CompiledMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledMode")
            .field("scope", &self.scope)
            .field("begin_scope", &self.begin_scope)
            .field("end_scope", &self.end_scope)
            .field("begin", &self.begin)
            .field("end", &self.end)
            .field("terminator_end", &self.terminator_end)
            .field("illegal", &self.illegal)
            .field("keywords", &self.keywords)
            .field("relevance", &self.relevance)
            .field("contains", &self.contains)
            .field("starts", &self.starts)
            .field("ends_with_parent", &self.ends_with_parent)
            .field("ends_parent", &self.ends_parent)
            .field("exclude_begin", &self.exclude_begin)
            .field("exclude_end", &self.exclude_end)
            .field("return_begin", &self.return_begin)
            .field("return_end", &self.return_end)
            .field("skip", &self.skip)
            .field("sub_language", &self.sub_language)
            .field("matcher", &self.matcher)
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
pub struct CompiledLanguage {
    pub name: String,
    pub aliases: Vec<String>,
    pub case_insensitive: bool,
    pub disable_autodetect: bool,
    pub superset_of: Option<String>,
    pub class_name_aliases: HashMap<String, String>,
    pub(crate) modes: Vec<CompiledMode>,
    pub root: ModeId,
}

impl CompiledLanguage {
    pub fn mode(&self, id: ModeId) -> &CompiledMode {
        &self.modes[id]
    }

    pub fn get_mode(&self, id: ModeId) -> Option<&CompiledMode> {
        self.modes.get(id)
    }

    pub fn modes(&self) -> &[CompiledMode] {
        &self.modes
    }

    pub fn root_mode(&self) -> &CompiledMode {
        self.mode(self.root)
    }

    /// The name a scope is emitted under, after `classNameAliases`.
    pub fn scope_alias<'s>(&'s self, scope: &'s str) -> &'s str {
        self.class_name_aliases
            .get(scope)
            .map(String::as_str)
            .unwrap_or(scope)
    }

    /// Whether `stack` is a mode stack this language could have produced:
    /// non-empty, rooted at this language's root, with every id in range.
    pub fn is_valid_stack(&self, stack: &[ModeId]) -> bool {
        stack.first() == Some(&self.root) && stack.iter().all(|id| *id < self.modes.len())
    }
}
