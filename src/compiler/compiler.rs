//! Grammar compiler.
//!
//! Turns a raw [`Language`] into a [`CompiledLanguage`]. Each raw mode is
//! first normalized on a private copy (sugar fields rewritten, compiler
//! extensions applied, defaults filled in), then compiled into an arena
//! slot. Shared modes are memoized by `Arc` identity, so a fragment used by
//! several parents, a named repository entry, or a cycle through `self`
//! compiles to one slot. Modes whose compiled form depends on their parent
//! (`endsWithParent`) are memoized per parent terminator instead, so a
//! repository entry that contains itself still compiles to a finite arena.

use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use tracing::debug;

use crate::{
    errors::errors::{Error, ErrorImpl},
    grammar::{
        language::Language,
        mode::{flag, Contained, Keywords, Mode, Pattern, Scope},
    },
    keywords::{keywords::keyword_pattern, KeywordTable, DEFAULT_KEYWORD_PATTERN},
    patterns::{compile_pattern, count_match_groups, either, lookahead, rewrite_backreferences},
};

use super::{
    compiled::{CompiledKeywords, CompiledLanguage, CompiledMode, ModeId, ScopeEmit},
    matcher::{RuleKind, RuleMatcher},
};

/// Pattern used for a missing begin or end of a nested mode: matches the
/// empty string anywhere.
pub const MATCH_EMPTY: &str = "\\B|\\b";

/// How many not yet compiled modes may be open on the compiler's stack at
/// once. Only an `endsWithParent` mode with its own end that contains
/// itself reaches it, since its terminator grows at every level.
pub const MAX_MODE_NESTING: usize = 32;

/// Memo key: the `Arc` address, plus the parent terminator for modes that
/// depend on their parent.
type MemoKey = (usize, Option<String>);

/// Compiles `language` under the canonical `name`.
pub fn compile_language(name: &str, language: &Language) -> Result<CompiledLanguage, Error> {
    let has_self = language
        .mode
        .contains
        .iter()
        .flatten()
        .any(|entry| matches!(entry, Contained::SelfRef));
    if has_self {
        return Err(Error::config(
            ErrorImpl::SelfAtTopLevel {
                language: name.to_string(),
            },
            name,
        ));
    }

    let mut compiler = ModeCompiler::new(name, language);
    let root = compiler.compile_mode(&language.mode, None, None)?;
    let modes = compiler.finish()?;

    debug!(language = name, modes = modes.len(), "compiled language");

    Ok(CompiledLanguage {
        name: name.to_string(),
        aliases: language.aliases.clone(),
        case_insensitive: language.case_insensitive,
        disable_autodetect: language.disable_autodetect,
        superset_of: language.superset_of.as_ref().map(|name| name.to_lowercase()),
        class_name_aliases: language.class_name_aliases.clone(),
        modes,
        root,
    })
}

/// What a child needs to know about the mode it is compiled under.
struct Parent<'p> {
    id: ModeId,
    mode: &'p Mode,
    terminator_end: &'p str,
}

/// A raw mode after sugar rewriting, ready to be compiled.
struct Normalized {
    mode: Mode,
    begin_scope: Option<ScopeEmit>,
    end_scope: Option<ScopeEmit>,
    skip_if_preceded_by_dot: bool,
}

struct ModeCompiler<'l> {
    name: &'l str,
    language: &'l Language,
    case_insensitive: bool,
    slots: Vec<Option<CompiledMode>>,
    /// Begin source of every reserved slot, known before its children are
    /// compiled so that cycles can still build their matchers.
    begins: Vec<String>,
    memo: HashMap<MemoKey, ModeId>,
    variants: HashMap<usize, Vec<Arc<Mode>>>,
    /// Keeps every memoized mode alive so its address stays unique.
    retained: Vec<Arc<Mode>>,
    nesting: usize,
}

impl<'l> ModeCompiler<'l> {
    fn new(name: &'l str, language: &'l Language) -> Self {
        ModeCompiler {
            name,
            language,
            case_insensitive: language.case_insensitive,
            slots: vec![],
            begins: vec![],
            memo: HashMap::new(),
            variants: HashMap::new(),
            retained: vec![],
            nesting: 0,
        }
    }

    fn finish(self) -> Result<Vec<CompiledMode>, Error> {
        let name = self.name;
        self.slots
            .into_iter()
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| {
                Error::config(
                    ErrorImpl::InvalidGrammarData {
                        message: String::from("a mode was reserved but never compiled"),
                    },
                    name,
                )
            })
    }

    fn error(&self, error_impl: ErrorImpl) -> Error {
        Error::config(error_impl, self.name)
    }

    fn compile_pattern(&self, pattern: &str) -> Result<onig::Regex, Error> {
        compile_pattern(pattern, self.case_insensitive).map_err(|err| self.locate(err))
    }

    fn locate(&self, err: Error) -> Error {
        Error::config(err.get_impl().clone(), self.name)
    }

    /// Compiles one entry of a `contains` list, expanding variants.
    fn compile_contained(&mut self, mode: &Arc<Mode>, parent: &Parent) -> Result<Vec<ModeId>, Error> {
        if mode.variants.is_none() {
            return Ok(vec![self.compile_shared(mode, Some(parent))?]);
        }

        let key = Arc::as_ptr(mode) as usize;
        let expanded = match self.variants.get(&key) {
            Some(expanded) => expanded.clone(),
            None => {
                let expanded = expand_variants(mode).map_err(|err| self.error(err))?;
                self.retained.push(Arc::clone(mode));
                self.variants.insert(key, expanded.clone());
                expanded
            }
        };

        expanded
            .iter()
            .map(|variant| self.compile_shared(variant, Some(parent)))
            .collect()
    }

    /// Compiles a mode that may be referenced from several places.
    fn compile_shared(&mut self, mode: &Arc<Mode>, parent: Option<&Parent>) -> Result<ModeId, Error> {
        let terminator = mode
            .depends_on_parent()
            .then(|| parent.map(|parent| parent.terminator_end.to_string()).unwrap_or_default());
        let key = (Arc::as_ptr(mode) as usize, terminator);
        if let Some(id) = self.memo.get(&key) {
            return Ok(*id);
        }

        self.retained.push(Arc::clone(mode));
        self.compile_mode(mode, parent, Some(key))
    }

    fn compile_mode(
        &mut self,
        raw: &Mode,
        parent: Option<&Parent>,
        memo_key: Option<MemoKey>,
    ) -> Result<ModeId, Error> {
        if self.nesting >= MAX_MODE_NESTING {
            return Err(self.error(ErrorImpl::ModeNestingTooDeep {
                limit: MAX_MODE_NESTING,
            }));
        }

        self.nesting += 1;
        let compiled = self.compile_slot(raw, parent, memo_key);
        self.nesting -= 1;
        compiled
    }

    fn compile_slot(
        &mut self,
        raw: &Mode,
        parent: Option<&Parent>,
        memo_key: Option<MemoKey>,
    ) -> Result<ModeId, Error> {
        let Normalized {
            mode,
            begin_scope,
            end_scope,
            skip_if_preceded_by_dot,
        } = self.normalize(raw, parent)?;

        let nested = parent.is_some();

        let begin = match (&mode.begin, nested) {
            (Some(begin), _) => pattern_source(begin),
            (None, true) => MATCH_EMPTY.to_string(),
            (None, false) => String::new(),
        };

        let mut end = None;
        let mut end_re = None;
        let mut terminator_end = String::new();

        if let Some(parent) = parent {
            self.compile_pattern(&begin)?;

            end = match &mode.end {
                Some(end) => Some(pattern_source(end)),
                None if !flag(mode.ends_with_parent) => Some(MATCH_EMPTY.to_string()),
                None => None,
            };
            if let Some(end) = &end {
                end_re = Some(self.compile_pattern(end)?);
                terminator_end.push_str(end);
            }
            if flag(mode.ends_with_parent) && !parent.terminator_end.is_empty() {
                if end.is_some() {
                    terminator_end.push('|');
                }
                terminator_end.push_str(parent.terminator_end);
            }
        }

        let illegal = mode.illegal.as_ref().map(pattern_source);
        if let Some(illegal) = &illegal {
            self.compile_pattern(illegal)?;
        }

        let keywords = match &mode.keywords {
            Some(keywords) => Some(self.compile_keywords(keywords)?),
            None => None,
        };

        let id = self.slots.len();
        self.slots.push(None);
        self.begins.push(begin.clone());
        if let Some(key) = memo_key {
            self.memo.insert(key, id);
        }

        let this = Parent {
            id,
            mode: &mode,
            terminator_end: &terminator_end,
        };

        let mut contains = vec![];
        let language = self.language;
        for entry in mode.contains.iter().flatten() {
            match entry {
                Contained::SelfRef => contains.push(this.id),
                Contained::Named(name) => {
                    let named = language.repository.get(name).ok_or_else(|| {
                        self.error(ErrorImpl::UnknownModeReference { name: name.clone() })
                    })?;
                    contains.extend(self.compile_contained(named, &this)?);
                }
                Contained::Mode(child) => contains.extend(self.compile_contained(child, &this)?),
            }
        }

        let starts = match &mode.starts {
            Some(starts) => Some(self.compile_shared(starts, parent)?),
            None => None,
        };

        let mut rules = contains
            .iter()
            .map(|child| (RuleKind::Begin(*child), self.begins[*child].clone()))
            .collect::<Vec<_>>();
        if !terminator_end.is_empty() {
            rules.push((RuleKind::End, terminator_end.clone()));
        }
        if let Some(illegal) = &illegal {
            rules.push((RuleKind::Illegal, illegal.clone()));
        }
        let matcher =
            RuleMatcher::new(rules, self.case_insensitive).map_err(|err| self.locate(err))?;

        let scope = match &mode.scope {
            Some(Scope::Single(scope)) => Some(scope.clone()),
            _ => None,
        };

        self.slots[id] = Some(CompiledMode {
            scope,
            begin_scope,
            end_scope,
            begin,
            end,
            end_re,
            terminator_end,
            illegal,
            keywords,
            relevance: mode.relevance.unwrap_or(1),
            contains,
            starts,
            ends_with_parent: flag(mode.ends_with_parent),
            ends_parent: flag(mode.ends_parent),
            exclude_begin: flag(mode.exclude_begin),
            exclude_end: flag(mode.exclude_end),
            return_begin: flag(mode.return_begin),
            return_end: flag(mode.return_end),
            skip: flag(mode.skip),
            sub_language: mode.sub_language.clone(),
            skip_if_preceded_by_dot,
            on_begin: mode.on_begin.clone(),
            on_end: mode.on_end.clone(),
            matcher,
        });

        Ok(id)
    }

    fn compile_keywords(&self, keywords: &Keywords) -> Result<CompiledKeywords, Error> {
        let table = KeywordTable::compile(keywords, self.case_insensitive)
            .map_err(|err| self.locate(err))?;
        let pattern = keyword_pattern(keywords)
            .unwrap_or(DEFAULT_KEYWORD_PATTERN)
            .to_string();
        let pattern_re = self.compile_pattern(&pattern)?;

        Ok(CompiledKeywords {
            table,
            pattern,
            pattern_re,
        })
    }

    /// Rewrites the sugar of a raw mode into the plain form the compiler
    /// works on. Order matters: `className` and `match` are resolved
    /// before `beforeMatch` wraps the mode, multi-scope delimiters are
    /// joined before extensions see the mode, and `beginKeywords` runs
    /// after extensions so they can set it.
    fn normalize(&self, raw: &Mode, parent: Option<&Parent>) -> Result<Normalized, Error> {
        let mut mode = raw.clone();

        if let Some(class_name) = mode.class_name.take() {
            mode.scope = Some(Scope::Single(class_name));
        }

        if let Some(pattern) = mode.match_.take() {
            if mode.begin.is_some() || mode.end.is_some() {
                return Err(self.error(ErrorImpl::MatchWithBeginOrEnd));
            }
            mode.begin = Some(pattern);
        }

        if let Some(before) = mode.before_match.take() {
            if mode.starts.is_some() {
                return Err(self.error(ErrorImpl::BeforeMatchWithStarts));
            }
            mode = wrap_before_match(mode, &before);
        }

        if let Some(Scope::Multi(_)) = &mode.scope {
            mode.begin_scope = mode.scope.take();
        }

        let begin_scope = self.multi_class(
            &mut mode.begin,
            mode.begin_scope.take(),
            "beginScope",
            [
                ("skip", flag(mode.skip)),
                ("excludeBegin", flag(mode.exclude_begin)),
                ("returnBegin", flag(mode.return_begin)),
            ],
        )?;
        let end_scope = self.multi_class(
            &mut mode.end,
            mode.end_scope.take(),
            "endScope",
            [
                ("skip", flag(mode.skip)),
                ("excludeEnd", flag(mode.exclude_end)),
                ("returnEnd", flag(mode.return_end)),
            ],
        )?;

        for extension in &self.language.compiler_extensions {
            extension.apply(&mut mode, parent.map(|parent| parent.mode));
        }

        let mut skip_if_preceded_by_dot = false;
        if parent.is_some() {
            if let Some(words) = mode.begin_keywords.take() {
                let alternation = words.split_whitespace().collect::<Vec<_>>().join("|");
                mode.begin = Some(Pattern::Single(format!(
                    "\\b({})(?!\\.)(?=\\b|\\s)",
                    alternation
                )));
                skip_if_preceded_by_dot = true;
                if mode.keywords.is_none() {
                    mode.keywords = Some(Keywords::Words(words));
                }
                if mode.relevance.is_none() {
                    mode.relevance = Some(0);
                }
            }
        }

        if let Some(Pattern::Sequence(patterns)) = &mode.illegal {
            let joined = either(patterns.as_slice(), false);
            mode.illegal = Some(Pattern::Single(joined));
        }

        if mode.relevance.is_none() {
            mode.relevance = Some(1);
        }

        Ok(Normalized {
            mode,
            begin_scope,
            end_scope,
            skip_if_preceded_by_dot,
        })
    }

    /// Resolves the scope of a begin or end delimiter. A list-valued
    /// delimiter needs a capture-index scope map; its parts are joined into
    /// one pattern and the map is re-keyed to the group wrapping each part.
    fn multi_class(
        &self,
        pattern: &mut Option<Pattern>,
        scope: Option<Scope>,
        key: &str,
        incompatible: [(&str, bool); 3],
    ) -> Result<Option<ScopeEmit>, Error> {
        let Some(Pattern::Sequence(parts)) = pattern else {
            return Ok(match scope {
                Some(Scope::Single(scope)) => Some(ScopeEmit::Wrap(scope)),
                _ => None,
            });
        };

        if let Some((flag, _)) = incompatible.iter().find(|(_, set)| *set) {
            return Err(self.error(ErrorImpl::MultiClassIncompatible {
                flag: flag.to_string(),
                key: key.to_string(),
            }));
        }

        let Some(Scope::Multi(names)) = scope else {
            return Err(self.error(ErrorImpl::MalformedScope {
                key: key.to_string(),
            }));
        };

        let mut positions = BTreeMap::new();
        let mut offset = 0;
        for (index, part) in parts.iter().enumerate() {
            positions.insert(index + 1 + offset, names.get(&(index + 1)).cloned().flatten());
            offset += count_match_groups(part).map_err(|err| self.locate(err))?;
        }

        let joined = rewrite_backreferences(parts.as_slice(), "");
        *pattern = Some(Pattern::Single(joined));
        Ok(Some(ScopeEmit::Multi(positions)))
    }
}

/// Source of a pattern; a sequence is joined back to back.
fn pattern_source(pattern: &Pattern) -> String {
    match pattern {
        Pattern::Single(source) => source.clone(),
        Pattern::Sequence(parts) => rewrite_backreferences(parts.as_slice(), ""),
    }
}

/// One mode per variant, each the base mode with the variant's fields
/// laid over it.
fn expand_variants(mode: &Arc<Mode>) -> Result<Vec<Arc<Mode>>, ErrorImpl> {
    let mut base = Mode::clone(mode);
    let variants = base.variants.take().unwrap_or_default();

    variants
        .iter()
        .map(|variant| {
            if variant.variants.is_some() {
                return Err(ErrorImpl::NestedVariants);
            }
            Ok(Arc::new(base.inherit(variant)))
        })
        .collect()
}

/// `beforeMatch` support: the mode becomes a scope-less wrapper that
/// matches the prefix (with the original begin as lookahead) and then
/// starts the original mode, which closes the wrapper when it ends.
fn wrap_before_match(mut original: Mode, before: &str) -> Mode {
    let begin = original
        .begin
        .as_ref()
        .map(pattern_source)
        .unwrap_or_default();
    original.ends_parent = Some(true);

    Mode {
        keywords: original.keywords.clone(),
        begin: Some(Pattern::Single(crate::MK_CONCAT!(before, lookahead(&begin)))),
        relevance: Some(0),
        starts: Some(Arc::new(Mode::new().relevance(0).contains([original]))),
        ..Mode::default()
    }
}
