use std::{collections::BTreeMap, sync::Arc};

use serde::Deserialize;

use super::hooks::{Hook, HookAction, MatchContext, ModeData};

/// A pattern source, or a sequence of sources matched back to back (only
/// valid for `begin`/`end`/`match` together with a capture-index scope map,
/// and for `illegal`, where it means "any of these").
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Pattern {
    Single(String),
    Sequence(Vec<String>),
}

impl Pattern {
    pub fn as_single(&self) -> Option<&str> {
        match self {
            Pattern::Single(source) => Some(source),
            Pattern::Sequence(_) => None,
        }
    }
}

impl From<&str> for Pattern {
    fn from(source: &str) -> Self {
        Pattern::Single(source.to_string())
    }
}

impl From<String> for Pattern {
    fn from(source: String) -> Self {
        Pattern::Single(source)
    }
}

impl From<Vec<&str>> for Pattern {
    fn from(sources: Vec<&str>) -> Self {
        Pattern::Sequence(sources.into_iter().map(String::from).collect())
    }
}

impl From<Vec<String>> for Pattern {
    fn from(sources: Vec<String>) -> Self {
        Pattern::Sequence(sources)
    }
}

/// Category label for a span: one label, or one label per capture group
/// (a `None` label still emits the group, as keyword-scanned text).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "ScopeRepr")]
pub enum Scope {
    Single(String),
    Multi(BTreeMap<usize, Option<String>>),
}

// Grammar data reaches this through buffered (untagged/flattened) content,
// where map keys stay strings.
#[derive(Deserialize)]
#[serde(untagged)]
enum ScopeRepr {
    Single(String),
    Multi(BTreeMap<String, Option<String>>),
}

impl TryFrom<ScopeRepr> for Scope {
    type Error = String;

    fn try_from(repr: ScopeRepr) -> Result<Self, Self::Error> {
        match repr {
            ScopeRepr::Single(label) => Ok(Scope::Single(label)),
            ScopeRepr::Multi(labels) => labels
                .into_iter()
                .map(|(index, label)| {
                    index
                        .parse::<usize>()
                        .map(|index| (index, label))
                        .map_err(|_| format!("invalid capture index {:?}", index))
                })
                .collect::<Result<_, _>>()
                .map(Scope::Multi),
        }
    }
}

impl Scope {
    pub fn multi<'a>(labels: impl IntoIterator<Item = (usize, &'a str)>) -> Self {
        Scope::Multi(
            labels
                .into_iter()
                .map(|(index, label)| (index, Some(label.to_string())))
                .collect(),
        )
    }
}

impl From<&str> for Scope {
    fn from(label: &str) -> Self {
        Scope::Single(label.to_string())
    }
}

impl From<String> for Scope {
    fn from(label: String) -> Self {
        Scope::Single(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum KeywordList {
    Words(String),
    List(Vec<String>),
}

/// A keyword declaration as written in a grammar.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Keywords {
    /// Space separated words, all in the `keyword` category.
    Words(String),
    List(Vec<String>),
    /// Category name to words. The `$pattern` entry, when present, is the
    /// identifier pattern rather than a category.
    Map(BTreeMap<String, KeywordList>),
}

impl Keywords {
    pub fn map<'a>(categories: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        Keywords::Map(
            categories
                .into_iter()
                .map(|(scope, words)| (scope.to_string(), KeywordList::Words(words.to_string())))
                .collect(),
        )
    }

    /// Sets the identifier pattern used to find candidate words.
    pub fn with_pattern(self, pattern: &str) -> Self {
        let mut categories = match self {
            Keywords::Words(words) => {
                BTreeMap::from([("keyword".to_string(), KeywordList::Words(words))])
            }
            Keywords::List(words) => BTreeMap::from([("keyword".to_string(), KeywordList::List(words))]),
            Keywords::Map(categories) => categories,
        };
        categories.insert("$pattern".to_string(), KeywordList::Words(pattern.to_string()));
        Keywords::Map(categories)
    }
}

impl From<&str> for Keywords {
    fn from(words: &str) -> Self {
        Keywords::Words(words.to_string())
    }
}

impl From<Vec<&str>> for Keywords {
    fn from(words: Vec<&str>) -> Self {
        Keywords::List(words.into_iter().map(String::from).collect())
    }
}

/// Which grammar(s) the content of a mode is handed to.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "SubLanguageRepr")]
pub enum SubLanguage {
    Single(String),
    /// Auto-detect among these; an empty list means every registered language.
    List(Vec<String>),
    Any,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SubLanguageRepr {
    Flag(bool),
    Name(String),
    Names(Vec<String>),
}

impl From<SubLanguageRepr> for SubLanguage {
    fn from(repr: SubLanguageRepr) -> Self {
        match repr {
            SubLanguageRepr::Flag(_) => SubLanguage::Any,
            SubLanguageRepr::Name(name) => SubLanguage::Single(name),
            SubLanguageRepr::Names(names) => SubLanguage::List(names),
        }
    }
}

impl From<&str> for SubLanguage {
    fn from(name: &str) -> Self {
        SubLanguage::Single(name.to_string())
    }
}

impl From<Vec<&str>> for SubLanguage {
    fn from(names: Vec<&str>) -> Self {
        SubLanguage::List(names.into_iter().map(String::from).collect())
    }
}

/// An entry of a mode's `contains` list.
#[derive(Debug, Clone, Deserialize)]
#[serde(from = "ContainedRepr")]
pub enum Contained {
    /// The enclosing mode itself.
    SelfRef,
    /// A mode from the language's repository.
    Named(String),
    Mode(Arc<Mode>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ContainedRepr {
    Name(String),
    Mode(Arc<Mode>),
}

impl From<ContainedRepr> for Contained {
    fn from(repr: ContainedRepr) -> Self {
        match repr {
            ContainedRepr::Name(name) => Contained::from(name.as_str()),
            ContainedRepr::Mode(mode) => Contained::Mode(mode),
        }
    }
}

impl From<&str> for Contained {
    fn from(name: &str) -> Self {
        if name == "self" {
            Contained::SelfRef
        } else {
            Contained::Named(name.to_string())
        }
    }
}

impl From<Mode> for Contained {
    fn from(mode: Mode) -> Self {
        Contained::Mode(Arc::new(mode))
    }
}

impl From<Arc<Mode>> for Contained {
    fn from(mode: Arc<Mode>) -> Self {
        Contained::Mode(mode)
    }
}

impl From<&Arc<Mode>> for Contained {
    fn from(mode: &Arc<Mode>) -> Self {
        Contained::Mode(Arc::clone(mode))
    }
}

/// A grammar rule as written by a grammar author. Every field is optional
/// so that variants can override just what they change; the compiler
/// resolves the defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Mode {
    pub scope: Option<Scope>,
    /// Older spelling of `scope`.
    pub class_name: Option<String>,
    pub begin: Option<Pattern>,
    /// Shorthand for a `begin` with no `end`.
    #[serde(rename = "match")]
    pub match_: Option<Pattern>,
    pub end: Option<Pattern>,
    pub begin_scope: Option<Scope>,
    pub end_scope: Option<Scope>,
    pub begin_keywords: Option<String>,
    pub before_match: Option<String>,
    pub keywords: Option<Keywords>,
    pub contains: Option<Vec<Contained>>,
    pub variants: Option<Vec<Arc<Mode>>>,
    pub starts: Option<Arc<Mode>>,
    pub relevance: Option<u32>,
    pub illegal: Option<Pattern>,
    pub ends_with_parent: Option<bool>,
    pub ends_parent: Option<bool>,
    pub exclude_begin: Option<bool>,
    pub exclude_end: Option<bool>,
    pub return_begin: Option<bool>,
    pub return_end: Option<bool>,
    pub skip: Option<bool>,
    pub sub_language: Option<SubLanguage>,
    #[serde(skip)]
    pub on_begin: Option<Hook>,
    #[serde(skip)]
    pub on_end: Option<Hook>,
}

macro_rules! mode_setters {
    ($($name:ident: $ty:ty),* $(,)?) => {
        $(
            pub fn $name(mut self, value: impl Into<$ty>) -> Self {
                self.$name = Some(value.into());
                self
            }
        )*
    };
}

macro_rules! mode_flags {
    ($($name:ident),* $(,)?) => {
        $(
            pub fn $name(mut self) -> Self {
                self.$name = Some(true);
                self
            }
        )*
    };
}

macro_rules! inherit_fields {
    ($base:expr, $overrides:expr, [$($field:ident),* $(,)?]) => {
        Mode {
            $($field: $overrides.$field.clone().or_else(|| $base.$field.clone()),)*
        }
    };
}

impl Mode {
    pub fn new() -> Self {
        Mode::default()
    }

    mode_setters! {
        scope: Scope,
        begin: Pattern,
        match_: Pattern,
        end: Pattern,
        begin_scope: Scope,
        end_scope: Scope,
        keywords: Keywords,
        illegal: Pattern,
        sub_language: SubLanguage,
        starts: Arc<Mode>,
    }

    mode_flags! {
        ends_with_parent,
        ends_parent,
        exclude_begin,
        exclude_end,
        return_begin,
        return_end,
        skip,
    }

    pub fn class_name(mut self, name: &str) -> Self {
        self.class_name = Some(name.to_string());
        self
    }

    pub fn begin_keywords(mut self, words: &str) -> Self {
        self.begin_keywords = Some(words.to_string());
        self
    }

    pub fn before_match(mut self, pattern: &str) -> Self {
        self.before_match = Some(pattern.to_string());
        self
    }

    pub fn relevance(mut self, relevance: u32) -> Self {
        self.relevance = Some(relevance);
        self
    }

    pub fn contains<I, C>(mut self, items: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Contained>,
    {
        self.contains = Some(items.into_iter().map(Into::into).collect());
        self
    }

    pub fn variants(mut self, variants: Vec<Mode>) -> Self {
        self.variants = Some(variants.into_iter().map(Arc::new).collect());
        self
    }

    pub fn on_begin(
        mut self,
        hook: impl Fn(&MatchContext<'_>, &mut ModeData) -> HookAction + Send + Sync + 'static,
    ) -> Self {
        self.on_begin = Some(Hook::new(hook));
        self
    }

    pub fn on_end(
        mut self,
        hook: impl Fn(&MatchContext<'_>, &mut ModeData) -> HookAction + Send + Sync + 'static,
    ) -> Self {
        self.on_end = Some(Hook::new(hook));
        self
    }

    /// A copy of `self` with every field `overrides` sets replaced.
    pub fn inherit(&self, overrides: &Mode) -> Mode {
        inherit_fields!(
            self,
            overrides,
            [
                scope,
                class_name,
                begin,
                match_,
                end,
                begin_scope,
                end_scope,
                begin_keywords,
                before_match,
                keywords,
                contains,
                variants,
                starts,
                relevance,
                illegal,
                ends_with_parent,
                ends_parent,
                exclude_begin,
                exclude_end,
                return_begin,
                return_end,
                skip,
                sub_language,
                on_begin,
                on_end,
            ]
        )
    }

    /// Whether compiling this mode needs to know its parent, in which case
    /// it compiles once per distinct parent terminator.
    pub fn depends_on_parent(&self) -> bool {
        flag(self.ends_with_parent)
            || self
                .starts
                .as_ref()
                .is_some_and(|starts| starts.depends_on_parent())
    }
}

pub(crate) fn flag(value: Option<bool>) -> bool {
    value.unwrap_or(false)
}
