use lazy_static::lazy_static;
use std::collections::{HashMap, HashSet};

use crate::{
    errors::errors::{Error, ErrorImpl},
    grammar::mode::{KeywordList, Keywords},
    Position,
};

pub const DEFAULT_KEYWORD_SCOPE: &str = "keyword";

/// Identifier pattern used to pull candidate words out of plain text when a
/// keyword table does not declare its own `$pattern`.
pub const DEFAULT_KEYWORD_PATTERN: &str = "\\w+";

/// Key of the keyword map entry that overrides the identifier pattern.
pub const PATTERN_KEY: &str = "$pattern";

lazy_static! {
    /// Filler words that commonly show up in prose and comments; they score
    /// nothing unless a grammar gives them an explicit relevance.
    pub static ref COMMON_KEYWORDS: HashSet<&'static str> = {
        let mut set = HashSet::new();
        set.insert("of");
        set.insert("and");
        set.insert("for");
        set.insert("in");
        set.insert("not");
        set.insert("or");
        set.insert("if");
        set.insert("then");
        set.insert("parent");
        set.insert("list");
        set.insert("value");
        set
    };
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordEntry {
    pub scope: String,
    pub relevance: u32,
}

/// Flat lookup from keyword text to its scope and relevance.
#[derive(Debug, Clone, Default)]
pub struct KeywordTable {
    entries: HashMap<String, KeywordEntry>,
    case_insensitive: bool,
}

impl KeywordTable {
    /// Builds the table. Later categories overwrite earlier ones when the
    /// same word is declared twice.
    pub fn compile(keywords: &Keywords, case_insensitive: bool) -> Result<KeywordTable, Error> {
        let mut table = KeywordTable {
            entries: HashMap::new(),
            case_insensitive,
        };

        match keywords {
            Keywords::Words(words) => table.add_list(DEFAULT_KEYWORD_SCOPE, words.split_whitespace())?,
            Keywords::List(words) => {
                table.add_list(DEFAULT_KEYWORD_SCOPE, words.iter().map(String::as_str))?
            }
            Keywords::Map(categories) => {
                for (scope, list) in categories {
                    if scope == PATTERN_KEY {
                        continue;
                    }
                    match list {
                        KeywordList::Words(words) => table.add_list(scope, words.split_whitespace())?,
                        KeywordList::List(words) => {
                            table.add_list(scope, words.iter().map(String::as_str))?
                        }
                    }
                }
            }
        }

        Ok(table)
    }

    fn add_list<'a>(
        &mut self,
        scope: &str,
        keywords: impl Iterator<Item = &'a str>,
    ) -> Result<(), Error> {
        for keyword in keywords {
            let keyword = if self.case_insensitive {
                keyword.to_lowercase()
            } else {
                keyword.to_string()
            };

            let (word, provided) = match keyword.split_once('|') {
                Some((word, score)) => (word, Some(score)),
                None => (keyword.as_str(), None),
            };

            let relevance = score_for_keyword(word, provided)?;
            self.entries.insert(
                word.to_string(),
                KeywordEntry {
                    scope: scope.to_string(),
                    relevance,
                },
            );
        }

        Ok(())
    }

    /// Looks up a candidate token, folding case first when the language is
    /// case insensitive.
    pub fn get(&self, word: &str) -> Option<&KeywordEntry> {
        if self.case_insensitive {
            self.entries.get(&word.to_lowercase())
        } else {
            self.entries.get(word)
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_case_insensitive(&self) -> bool {
        self.case_insensitive
    }
}

fn score_for_keyword(keyword: &str, provided: Option<&str>) -> Result<u32, Error> {
    match provided {
        Some(score) => score.parse::<u32>().map_err(|_| {
            Error::new(
                ErrorImpl::InvalidKeywordRelevance {
                    keyword: keyword.to_string(),
                    value: score.to_string(),
                },
                Position::null(),
            )
        }),
        None if common_keyword(keyword) => Ok(0),
        None => Ok(1),
    }
}

pub fn common_keyword(keyword: &str) -> bool {
    COMMON_KEYWORDS.contains(keyword.to_lowercase().as_str())
}

/// The identifier pattern a keyword declaration asks for, if any.
pub fn keyword_pattern(keywords: &Keywords) -> Option<&str> {
    match keywords {
        Keywords::Map(categories) => match categories.get(PATTERN_KEY) {
            Some(KeywordList::Words(pattern)) => Some(pattern.as_str()),
            Some(KeywordList::List(patterns)) => patterns.first().map(String::as_str),
            None => None,
        },
        _ => None,
    }
}
