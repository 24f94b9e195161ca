use std::{collections::HashMap, sync::Arc};

use serde::Deserialize;

use crate::errors::errors::{Error, ErrorImpl};
use crate::Position;

use super::{hooks::CompilerExtension, mode::Mode};

/// A language grammar: the root mode plus language-wide settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Language {
    pub name: Option<String>,
    pub aliases: Vec<String>,
    #[serde(rename = "case_insensitive")]
    pub case_insensitive: bool,
    pub disable_autodetect: bool,
    /// Name of a language this one strictly extends.
    pub superset_of: Option<String>,
    /// Renames scopes at emission time.
    pub class_name_aliases: HashMap<String, String>,
    /// Named modes that `contains` lists can refer to by name, which also
    /// lets modes refer to each other in cycles.
    pub repository: HashMap<String, Arc<Mode>>,
    #[serde(skip)]
    pub compiler_extensions: Vec<CompilerExtension>,
    #[serde(flatten)]
    pub mode: Mode,
}

impl Language {
    pub fn new(name: &str, mode: Mode) -> Self {
        Language {
            name: Some(name.to_string()),
            mode,
            ..Language::default()
        }
    }

    pub fn from_json(source: &str) -> Result<Language, Error> {
        serde_json::from_str(source).map_err(|err| {
            Error::new(
                ErrorImpl::InvalidGrammarData {
                    message: err.to_string(),
                },
                Position::null(),
            )
        })
    }

    pub fn aliases(mut self, aliases: &[&str]) -> Self {
        self.aliases = aliases.iter().map(|alias| alias.to_string()).collect();
        self
    }

    pub fn case_insensitive(mut self) -> Self {
        self.case_insensitive = true;
        self
    }

    pub fn disable_autodetect(mut self) -> Self {
        self.disable_autodetect = true;
        self
    }

    pub fn superset_of(mut self, name: &str) -> Self {
        self.superset_of = Some(name.to_string());
        self
    }

    pub fn class_name_alias(mut self, scope: &str, alias: &str) -> Self {
        self.class_name_aliases
            .insert(scope.to_string(), alias.to_string());
        self
    }

    pub fn define(mut self, name: &str, mode: impl Into<Arc<Mode>>) -> Self {
        self.repository.insert(name.to_string(), mode.into());
        self
    }

    pub fn compiler_extension(
        mut self,
        extension: impl Fn(&mut Mode, Option<&Mode>) + Send + Sync + 'static,
    ) -> Self {
        self.compiler_extensions
            .push(CompilerExtension::new(extension));
        self
    }
}
