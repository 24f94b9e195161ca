//! The highlighter: a registry of compiled languages plus the public
//! highlighting entry points.
//!
//! The registry is an ordinary value rather than process-wide state, so
//! independent highlighters (and tests) never see each other's languages.
//! Registration needs `&mut self`; highlighting only needs `&self`, so a
//! populated highlighter can be shared between threads.

use std::{
    cmp::Ordering,
    collections::{BTreeMap, HashMap, HashSet},
    fmt,
    sync::Arc,
};

use tracing::{debug, error, trace, warn};

use crate::{
    compiler::{compile_language, CompiledLanguage, ModeId},
    emitter::{html::escape, Emitter, TokenTree},
    errors::errors::{Error, ErrorImpl},
    grammar::language::Language,
    lexer::lexer::Lexer,
    Position,
};

use super::{
    options::Options,
    result::{HighlightResult, IllegalBy},
};

/// Builds the raw grammar of a language. Kept after registration so the
/// language can be recompiled. Factories take no arguments: shared
/// fragments live in [`crate::grammar::common`] and [`crate::patterns`].
pub type LanguageFactory = Arc<dyn Fn() -> Language + Send + Sync>;

struct Registration {
    factory: LanguageFactory,
    compiled: Arc<CompiledLanguage>,
}

/// Per-call settings of [`Highlighter::highlight`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HighlightOptions {
    pub language: String,
    /// Treat illegal lexemes as plain text instead of failing the run.
    pub ignore_illegals: bool,
    /// Mode stack of an earlier result to resume from.
    pub continuation: Option<Vec<ModeId>>,
}

impl HighlightOptions {
    pub fn new(language: &str) -> Self {
        HighlightOptions {
            language: language.to_string(),
            ..HighlightOptions::default()
        }
    }

    pub fn ignore_illegals(mut self) -> Self {
        self.ignore_illegals = true;
        self
    }

    pub fn continuation(mut self, top: Vec<ModeId>) -> Self {
        self.continuation = Some(top);
        self
    }
}

#[derive(Default)]
pub struct Highlighter {
    languages: BTreeMap<String, Registration>,
    aliases: HashMap<String, String>,
    options: Options,
}

impl fmt::Debug for Highlighter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Highlighter")
            .field("languages", &self.languages.keys().collect::<Vec<_>>())
            .field("aliases", &self.aliases)
            .field("options", &self.options)
            .finish()
    }
}

impl Highlighter {
    pub fn new() -> Self {
        Highlighter::default()
    }

    pub fn with_options(options: Options) -> Self {
        Highlighter {
            options,
            ..Highlighter::default()
        }
    }

    pub fn configure(&mut self, options: Options) {
        self.options = options;
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn safe_mode(&mut self) {
        self.options.safe_mode = true;
    }

    /// Strict mode for grammar development: illegal lexemes and unexpected
    /// failures become errors instead of degraded results.
    pub fn debug_mode(&mut self) {
        self.options.safe_mode = false;
    }

    /// Compiles the grammar built by `factory` and registers it, with its
    /// declared aliases, under `name`. A grammar that fails to compile is
    /// not registered.
    pub fn register_language<F>(&mut self, name: &str, factory: F) -> Result<(), Error>
    where
        F: Fn() -> Language + Send + Sync + 'static,
    {
        let name = name.to_lowercase();
        let factory: LanguageFactory = Arc::new(factory);

        let compiled = build(&name, &factory).map_err(|err| {
            error!(language = %name, error = %err, "language definition could not be compiled");
            err
        })?;
        let aliases = compiled.aliases.clone();

        self.languages.insert(
            name.clone(),
            Registration {
                factory,
                compiled: Arc::new(compiled),
            },
        );
        self.register_aliases(&aliases, &name);

        debug!(language = %name, aliases = ?aliases, "registered language");
        Ok(())
    }

    /// Registers a grammar given as JSON data.
    pub fn register_language_json(&mut self, name: &str, source: &str) -> Result<(), Error> {
        let language = Language::from_json(source)?;
        self.register_language(name, move || language.clone())
    }

    /// Removes a language and every alias pointing at it.
    pub fn unregister_language(&mut self, name: &str) -> bool {
        let name = name.to_lowercase();
        let removed = self.languages.remove(&name).is_some();
        self.aliases.retain(|_, target| *target != name);
        removed
    }

    pub fn register_aliases<S: AsRef<str>>(&mut self, aliases: &[S], language: &str) {
        for alias in aliases {
            self.aliases
                .insert(alias.as_ref().to_lowercase(), language.to_lowercase());
        }
    }

    pub fn list_languages(&self) -> Vec<String> {
        self.languages.keys().cloned().collect()
    }

    /// Canonical name of a language, looked up by name or alias.
    pub fn canonical_name(&self, name: &str) -> Option<String> {
        let name = name.to_lowercase();
        if self.languages.contains_key(&name) {
            return Some(name);
        }
        self.aliases
            .get(&name)
            .filter(|target| self.languages.contains_key(*target))
            .cloned()
    }

    pub fn get_language(&self, name: &str) -> Option<Arc<CompiledLanguage>> {
        let name = self.canonical_name(name)?;
        self.languages
            .get(&name)
            .map(|registration| Arc::clone(&registration.compiled))
    }

    /// Whether a language takes part in auto-detection.
    pub fn auto_detection(&self, name: &str) -> bool {
        self.get_language(name)
            .is_some_and(|language| !language.disable_autodetect)
    }

    /// Rebuilds a language from its retained factory and recompiles it.
    pub fn reload_language(&mut self, name: &str) -> Result<(), Error> {
        let canonical = self
            .canonical_name(name)
            .ok_or_else(|| unknown_language(name))?;
        let registration = self
            .languages
            .get_mut(&canonical)
            .ok_or_else(|| unknown_language(name))?;

        registration.compiled = Arc::new(build(&canonical, &registration.factory)?);

        debug!(language = %canonical, "reloaded language");
        Ok(())
    }

    fn lookup(&self, name: &str) -> Result<Arc<CompiledLanguage>, Error> {
        self.get_language(name).ok_or_else(|| {
            error!(language = name, "could not find the language, did you forget to load/include a language module?");
            unknown_language(name)
        })
    }

    pub fn highlight(
        &self,
        code: &str,
        options: &HighlightOptions,
    ) -> Result<HighlightResult, Error> {
        self.highlight_with::<TokenTree>(code, options)
    }

    /// [`Highlighter::highlight`] with a caller-chosen emitter.
    pub fn highlight_with<E: Emitter>(
        &self,
        code: &str,
        options: &HighlightOptions,
    ) -> Result<HighlightResult<E>, Error> {
        self.highlight_language(
            &options.language,
            code,
            options.ignore_illegals,
            options.continuation.as_deref(),
        )
    }

    pub(crate) fn highlight_language<E: Emitter>(
        &self,
        name: &str,
        code: &str,
        ignore_illegals: bool,
        continuation: Option<&[ModeId]>,
    ) -> Result<HighlightResult<E>, Error> {
        let language = self.lookup(name)?;
        let mut lexer = Lexer::<E>::new(self, &language, code, ignore_illegals, continuation);

        match lexer.run() {
            Ok(()) => Ok(lexer.finish()),
            Err(err) => self.recover(lexer, code, err),
        }
    }

    /// Turns a failed run into a result when safe mode allows it.
    fn recover<E: Emitter>(
        &self,
        lexer: Lexer<'_, E>,
        code: &str,
        err: Error,
    ) -> Result<HighlightResult<E>, Error> {
        if err.is_infinite_loop() || !self.options.safe_mode {
            return Err(err);
        }

        let (language, top, mut emitter) = lexer.into_parts();
        emitter.finalize();

        let mut result = HighlightResult {
            language: Some(language),
            value: escape(code),
            relevance: 0,
            illegal: false,
            illegal_by: None,
            error_raised: None,
            emitter,
            top,
            second_best: None,
        };

        if err.is_illegal() {
            trace!(error = %err, "illegal lexeme, returning unhighlighted input");
            result.illegal = true;
            result.illegal_by = Some(illegal_by(&err, code));
        } else {
            warn!(error = %err, "highlighting failed, returning unhighlighted input");
            result.error_raised = Some(err);
        }

        Ok(result)
    }

    /// Highlights `code` with every auto-detectable candidate language and
    /// returns the most relevant result.
    pub fn highlight_auto(&self, code: &str) -> Result<HighlightResult, Error> {
        self.highlight_auto_with::<TokenTree>(code, None)
    }

    /// [`Highlighter::highlight_auto`] restricted to `subset`.
    pub fn highlight_auto_in<S: AsRef<str>>(
        &self,
        code: &str,
        subset: &[S],
    ) -> Result<HighlightResult, Error> {
        let subset = subset
            .iter()
            .map(|name| name.as_ref().to_string())
            .collect::<Vec<_>>();
        self.highlight_auto_with::<TokenTree>(code, Some(&subset))
    }

    /// Auto-detection with a caller-chosen emitter. Candidates are `subset`,
    /// else the configured `languages`, else every registered language.
    /// The plain-text result takes part with relevance 0 and wins unless a
    /// language scores higher.
    pub fn highlight_auto_with<E: Emitter>(
        &self,
        code: &str,
        subset: Option<&[String]>,
    ) -> Result<HighlightResult<E>, Error> {
        let candidates = match subset {
            Some(subset) => subset.to_vec(),
            None => self
                .options
                .languages
                .clone()
                .unwrap_or_else(|| self.list_languages()),
        };

        let mut results = vec![HighlightResult::<E>::plaintext(code)];
        let mut seen = HashSet::new();

        for candidate in &candidates {
            let Some(name) = self.canonical_name(candidate) else {
                warn!(language = %candidate, "skipping unknown auto-detection candidate");
                continue;
            };
            if !seen.insert(name.clone()) || !self.auto_detection(&name) {
                continue;
            }

            match self.highlight_language::<E>(&name, code, false, None) {
                Ok(result) => results.push(result),
                Err(err) if err.is_illegal() => {
                    trace!(language = %name, error = %err, "candidate rejected");
                }
                Err(err) => return Err(err),
            }
        }

        results.sort_by(|a, b| self.rank(a, b));

        let mut ranked = results.into_iter();
        let Some(mut best) = ranked.next() else {
            return Ok(HighlightResult::plaintext(code));
        };
        best.second_best = ranked.next().map(Box::new);

        Ok(best)
    }

    /// Higher relevance first; on a tie, a language declared as a superset
    /// of the other goes first.
    fn rank<E>(&self, a: &HighlightResult<E>, b: &HighlightResult<E>) -> Ordering {
        b.relevance.cmp(&a.relevance).then_with(|| {
            let (Some(a), Some(b)) = (&a.language, &b.language) else {
                return Ordering::Equal;
            };

            if self.superset_of(a).as_deref() == Some(b.as_str()) {
                Ordering::Less
            } else if self.superset_of(b).as_deref() == Some(a.as_str()) {
                Ordering::Greater
            } else {
                Ordering::Equal
            }
        })
    }

    fn superset_of(&self, name: &str) -> Option<String> {
        let superset_of = self.get_language(name)?.superset_of.clone()?;
        Some(self.canonical_name(&superset_of).unwrap_or(superset_of))
    }
}

fn build(name: &str, factory: &LanguageFactory) -> Result<CompiledLanguage, Error> {
    let language = factory();
    compile_language(name, &language)
}

fn unknown_language(name: &str) -> Error {
    Error::new(
        ErrorImpl::UnknownLanguage {
            language: name.to_string(),
        },
        Position::null(),
    )
}

fn illegal_by(err: &Error, code: &str) -> IllegalBy {
    let index = err.get_position().0.min(code.len());
    let mode = match err.get_impl() {
        ErrorImpl::IllegalLexeme { mode, .. } => mode.clone(),
        _ => String::from("<unnamed>"),
    };

    let mut start = index.saturating_sub(100);
    while !code.is_char_boundary(start) {
        start -= 1;
    }
    let mut end = (index + 100).min(code.len());
    while !code.is_char_boundary(end) {
        end += 1;
    }

    let before = &code[..index];
    let line = before.matches('\n').count() + 1;
    let column = index - before.rfind('\n').map_or(0, |newline| newline + 1) + 1;

    IllegalBy {
        message: err.to_string(),
        index,
        context: code[start..end].to_string(),
        mode,
        line,
        column,
    }
}
