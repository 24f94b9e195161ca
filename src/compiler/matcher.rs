use std::{fmt, sync::OnceLock};

use onig::{Regex as OnigRegex, Region, SearchOptions};

use crate::{
    errors::errors::Error,
    patterns::{compile_pattern, count_match_groups, rewrite_backreferences},
};

use super::compiled::ModeId;

/// What a rule of a mode's matcher stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    /// The begin pattern of a child mode.
    Begin(ModeId),
    /// The mode's terminator.
    End,
    Illegal,
}

/// A successful matcher execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleMatch {
    pub kind: RuleKind,
    /// Index of the rule that fired, in declaration order.
    pub rule: usize,
    pub start: usize,
    pub end: usize,
    /// `groups[0]` is the whole match; the rest are the rule's own capture
    /// groups, numbered as if the rule had matched on its own.
    pub groups: Vec<Option<(usize, usize)>>,
}

impl RuleMatch {
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn as_str<'t>(&self, text: &'t str) -> &'t str {
        &text[self.start..self.end]
    }
}

struct Rule {
    kind: RuleKind,
    source: String,
}

struct Slot {
    /// Group that wraps the rule in the merged alternation.
    group: usize,
    rule: usize,
    inner_groups: usize,
    kind: RuleKind,
}

/// One alternation over a suffix of the rules.
struct MergedRegex {
    regex: OnigRegex,
    slots: Vec<Slot>,
}

impl MergedRegex {
    fn build(rules: &[Rule], first: usize, case_insensitive: bool) -> Result<MergedRegex, Error> {
        let mut slots = Vec::with_capacity(rules.len());
        let mut group = 1;

        for (offset, rule) in rules.iter().enumerate() {
            let inner_groups = count_match_groups(&rule.source)?;
            slots.push(Slot {
                group,
                rule: first + offset,
                inner_groups,
                kind: rule.kind,
            });
            group += inner_groups + 1;
        }

        let sources = rules
            .iter()
            .map(|rule| rule.source.as_str())
            .collect::<Vec<_>>();
        let regex = compile_pattern(&rewrite_backreferences(&sources, "|"), case_insensitive)?;

        Ok(MergedRegex { regex, slots })
    }

    fn search(&self, text: &str, from: usize) -> Option<RuleMatch> {
        if from > text.len() {
            return None;
        }

        let mut region = Region::new();
        self.regex.search_with_options(
            text,
            from,
            text.len(),
            SearchOptions::SEARCH_OPTION_NONE,
            Some(&mut region),
        )?;

        let (start, end) = region.pos(0)?;
        let slot = self
            .slots
            .iter()
            .find(|slot| region.pos(slot.group).is_some())?;
        let groups = (0..=slot.inner_groups)
            .map(|index| region.pos(slot.group + index))
            .collect();

        Some(RuleMatch {
            kind: slot.kind,
            rule: slot.rule,
            start,
            end,
            groups,
        })
    }
}

/// Finds, in one regex execution, the earliest point where any rule of a
/// mode matches; at equal positions the rule declared first wins.
///
/// Narrowed alternations that skip the first `k` rules are built lazily and
/// cached. They let the lexer retry the same position after a begin match
/// was rejected by a hook without firing the rejected rule again.
pub struct RuleMatcher {
    rules: Vec<Rule>,
    case_insensitive: bool,
    merged: Vec<OnceLock<Result<MergedRegex, Error>>>,
}

impl RuleMatcher {
    /// Builds the matcher and eagerly compiles the full alternation, so
    /// that bad patterns surface at grammar compilation time.
    pub fn new(rules: Vec<(RuleKind, String)>, case_insensitive: bool) -> Result<RuleMatcher, Error> {
        let rules = rules
            .into_iter()
            .map(|(kind, source)| Rule { kind, source })
            .collect::<Vec<_>>();
        let merged = rules.iter().map(|_| OnceLock::new()).collect();

        let matcher = RuleMatcher {
            rules,
            case_insensitive,
            merged,
        };

        if !matcher.is_empty() {
            matcher.merged(0)?;
        }

        Ok(matcher)
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn kinds(&self) -> impl Iterator<Item = RuleKind> + '_ {
        self.rules.iter().map(|rule| rule.kind)
    }

    fn merged(&self, from: usize) -> Result<&MergedRegex, Error> {
        self.merged[from]
            .get_or_init(|| MergedRegex::build(&self.rules[from..], from, self.case_insensitive))
            .as_ref()
            .map_err(Clone::clone)
    }

    /// Searches `text` from `last_index`.
    ///
    /// `regex_index` is the first rule to consider. A narrowed search only
    /// counts if it matches exactly at `last_index`; otherwise the full rule
    /// set is searched again from the next character. On a match,
    /// `regex_index` moves past the rule that fired (back to 0 after the
    /// last rule).
    pub fn exec(
        &self,
        text: &str,
        last_index: usize,
        regex_index: &mut usize,
    ) -> Result<Option<RuleMatch>, Error> {
        if self.is_empty() {
            return Ok(None);
        }

        let from = if *regex_index < self.rules.len() {
            *regex_index
        } else {
            0
        };
        let mut found = self.merged(from)?.search(text, last_index);

        if from != 0 && !found.as_ref().is_some_and(|m| m.start == last_index) {
            found = self
                .merged(0)?
                .search(text, next_char_boundary(text, last_index));
        }

        if let Some(m) = &found {
            *regex_index = m.rule + 1;
            if *regex_index == self.rules.len() {
                *regex_index = 0;
            }
        }

        Ok(found)
    }
}

impl fmt::Debug for RuleMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.rules.iter().map(|rule| (rule.kind, &rule.source)))
            .finish()
    }
}

/// Offset of the character after the one at `at`, or `at + 1` past the end.
pub(crate) fn next_char_boundary(text: &str, at: usize) -> usize {
    text.get(at..)
        .and_then(|rest| rest.chars().next())
        .map_or(at + 1, |c| at + c.len_utf8())
}
