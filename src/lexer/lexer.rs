use std::{
    collections::{BTreeMap, HashMap},
    mem,
    panic::{self, AssertUnwindSafe},
};

use onig::{Region, SearchOptions};
use tracing::{trace, warn};

use crate::{
    compiler::{
        compiled::{CompiledLanguage, CompiledMode, ModeId, ScopeEmit},
        matcher::{next_char_boundary, RuleKind, RuleMatch},
    },
    emitter::Emitter,
    errors::errors::{Error, ErrorImpl},
    grammar::{
        hooks::{Hook, HookAction, MatchContext, ModeData},
        mode::SubLanguage,
    },
    highlighter::{highlighter::Highlighter, result::HighlightResult},
    Position,
};

/// An active mode on the lexer's stack.
#[derive(Debug, Clone)]
struct Frame {
    mode: ModeId,
    data: ModeData,
}

/// One highlight run of one language over one input.
///
/// The stack holds the active modes, root first. Text is collected in
/// `mode_buffer` until something ends the current run of plain text, then
/// flushed through keyword scanning (or a sub-language) into the emitter.
pub struct Lexer<'a, E: Emitter> {
    highlighter: &'a Highlighter,
    language: &'a CompiledLanguage,
    code: &'a str,
    ignore_illegals: bool,
    emitter: E,
    stack: Vec<Frame>,
    mode_buffer: String,
    relevance: u32,
    keyword_hits: HashMap<String, usize>,
    /// Final mode stack of the last run of each sub-language, so later
    /// blocks of the same sub-language pick up where it stopped.
    continuations: HashMap<String, Vec<ModeId>>,
    index: usize,
    iterations: usize,
    resume_at_same_position: bool,
    regex_index: usize,
    last_match: Option<(RuleKind, usize)>,
}

impl<'a, E: Emitter> Lexer<'a, E> {
    pub fn new(
        highlighter: &'a Highlighter,
        language: &'a CompiledLanguage,
        code: &'a str,
        ignore_illegals: bool,
        continuation: Option<&[ModeId]>,
    ) -> Self {
        let stack = match continuation {
            Some(stack) if language.is_valid_stack(stack) => stack.to_vec(),
            Some(_) => {
                warn!(language = %language.name, "ignoring continuation from another language");
                vec![language.root]
            }
            None => vec![language.root],
        };

        Lexer {
            highlighter,
            language,
            code,
            ignore_illegals,
            emitter: E::default(),
            stack: stack
                .into_iter()
                .map(|mode| Frame {
                    mode,
                    data: ModeData::new(),
                })
                .collect(),
            mode_buffer: String::new(),
            relevance: 0,
            keyword_hits: HashMap::new(),
            continuations: HashMap::new(),
            index: 0,
            iterations: 0,
            resume_at_same_position: false,
            regex_index: 0,
            last_match: None,
        }
    }

    pub fn run(&mut self) -> Result<(), Error> {
        self.open_continuation();

        loop {
            self.iterations += 1;
            if self.resume_at_same_position {
                self.resume_at_same_position = false;
            } else {
                self.regex_index = 0;
            }

            let mode = self.top_mode();
            let Some(found) = mode
                .matcher
                .exec(self.code, self.index, &mut self.regex_index)?
            else {
                break;
            };

            self.check_progress(found.start)?;

            let code = self.code;
            let before = &code[self.index..found.start];
            let processed = self.process_lexeme(before, &found)?;
            self.index = found.start + processed;

            if self.index > self.code.len() {
                break;
            }
        }

        if let Some(rest) = self.code.get(self.index..) {
            self.mode_buffer.push_str(rest);
        }
        self.process_buffer()?;
        self.emitter.finalize();

        Ok(())
    }

    /// Result of a completed run.
    pub fn finish(self) -> HighlightResult<E> {
        let value = self.emitter.to_html(self.highlighter.options());

        HighlightResult {
            language: Some(self.language.name.clone()),
            value,
            relevance: self.relevance,
            illegal: false,
            illegal_by: None,
            error_raised: None,
            top: self.stack.iter().map(|frame| frame.mode).collect(),
            emitter: self.emitter,
            second_best: None,
        }
    }

    /// Language name, mode stack and emitter of a run that was cut short.
    pub fn into_parts(self) -> (String, Vec<ModeId>, E) {
        (
            self.language.name.clone(),
            self.stack.iter().map(|frame| frame.mode).collect(),
            self.emitter,
        )
    }

    fn top_mode(&self) -> &'a CompiledMode {
        let language = self.language;
        match self.stack.last() {
            Some(frame) => language.mode(frame.mode),
            None => language.root_mode(),
        }
    }

    fn position(&self, offset: usize) -> Position {
        Position::in_language(offset, &self.language.name)
    }

    fn check_progress(&self, offset: usize) -> Result<(), Error> {
        let options = self.highlighter.options();
        if self.iterations > options.loop_iteration_floor
            && self.iterations > offset.saturating_mul(options.loop_iteration_ratio)
        {
            return Err(Error::new(
                ErrorImpl::InfiniteLoop {
                    iterations: self.iterations,
                },
                self.position(offset),
            ));
        }
        Ok(())
    }

    /// Handles one matcher hit. Returns how far past the match start the
    /// scan moves on; 0 re-scans from the match start (for `returnBegin`,
    /// `returnEnd` and hook rejections that retry the remaining rules).
    fn process_lexeme(&mut self, before: &str, found: &RuleMatch) -> Result<usize, Error> {
        self.mode_buffer.push_str(before);
        let lexeme = found.as_str(self.code);

        // A zero-width begin immediately followed by a zero-width end of
        // the same mode would loop forever.
        if let Some((RuleKind::Begin(_), at)) = self.last_match {
            if found.kind == RuleKind::End && at == found.start && lexeme.is_empty() {
                let consumed = self.consume_char(found.start);
                if !self.highlighter.options().safe_mode {
                    return Err(Error::new(
                        ErrorImpl::ZeroWidthMatch {
                            language: self.language.name.clone(),
                        },
                        self.position(found.start),
                    ));
                }
                return Ok(consumed);
            }
        }
        self.last_match = Some((found.kind, found.start));

        match found.kind {
            RuleKind::Begin(mode) => return self.do_begin_match(mode, found),
            RuleKind::Illegal if !self.ignore_illegals => {
                let mode = self.top_mode().scope.as_deref().unwrap_or("<unnamed>");
                return Err(Error::new(
                    ErrorImpl::IllegalLexeme {
                        lexeme: lexeme.to_string(),
                        mode: mode.to_string(),
                    },
                    self.position(found.start),
                ));
            }
            RuleKind::End => {
                if let Some(processed) = self.do_end_match(found)? {
                    return Ok(processed);
                }
                // Rejected end: step over one character and keep scanning.
                return Ok(self.consume_char(found.start));
            }
            RuleKind::Illegal => {}
        }

        if lexeme.is_empty() {
            return Ok(self.consume_char(found.start));
        }
        self.mode_buffer.push_str(lexeme);
        Ok(lexeme.len())
    }

    /// Moves the character at `at` into the buffer and returns its length
    /// (1 at the end of input, which ends the scan).
    fn consume_char(&mut self, at: usize) -> usize {
        let next = next_char_boundary(self.code, at);
        if let Some(c) = self.code.get(at..next) {
            self.mode_buffer.push_str(c);
        }
        next - at
    }

    fn do_begin_match(&mut self, id: ModeId, found: &RuleMatch) -> Result<usize, Error> {
        let mode = self.language.mode(id);
        let lexeme = found.as_str(self.code);
        let mut data = ModeData::new();

        let code = self.code;
        if mode.skip_if_preceded_by_dot && code[..found.start].ends_with('.') {
            return Ok(self.do_ignore(found));
        }
        if let Some(hook) = &mode.on_begin {
            if self.run_hook(hook, found, &mut data)? == HookAction::IgnoreMatch {
                return Ok(self.do_ignore(found));
            }
        }

        if mode.skip {
            self.mode_buffer.push_str(lexeme);
        } else {
            if mode.exclude_begin {
                self.mode_buffer.push_str(lexeme);
            }
            self.process_buffer()?;
            if !mode.return_begin && !mode.exclude_begin {
                self.mode_buffer = lexeme.to_string();
            }
        }

        self.start_new_mode(id, found, data);

        Ok(if mode.return_begin { 0 } else { lexeme.len() })
    }

    /// A begin match was rejected: retry the rules after it at the same
    /// position, or step over one character when none are left.
    fn do_ignore(&mut self, found: &RuleMatch) -> usize {
        if self.regex_index == 0 {
            self.consume_char(found.start)
        } else {
            self.resume_at_same_position = true;
            0
        }
    }

    fn start_new_mode(&mut self, id: ModeId, found: &RuleMatch, data: ModeData) {
        let language = self.language;
        let mode = language.mode(id);

        if let Some(scope) = &mode.scope {
            self.emitter.open_node(language.scope_alias(scope));
        }

        match &mode.begin_scope {
            Some(ScopeEmit::Wrap(scope)) => {
                let text = mem::take(&mut self.mode_buffer);
                self.emit_keyword(&text, scope);
            }
            Some(ScopeEmit::Multi(scopes)) => {
                self.emit_multi_class(scopes, found);
                self.mode_buffer.clear();
            }
            None => {}
        }

        self.stack.push(Frame { mode: id, data });
    }

    fn do_end_match(&mut self, found: &RuleMatch) -> Result<Option<usize>, Error> {
        let top = self.stack.len() - 1;
        let Some(end_depth) = self.end_of_mode(top, found)? else {
            return Ok(None);
        };

        let language = self.language;
        let origin = self.top_mode();
        let lexeme = found.as_str(self.code);

        match &origin.end_scope {
            Some(ScopeEmit::Wrap(scope)) => {
                self.process_buffer()?;
                self.emit_keyword(lexeme, scope);
            }
            Some(ScopeEmit::Multi(scopes)) => {
                self.process_buffer()?;
                self.emit_multi_class(scopes, found);
            }
            None if origin.skip => self.mode_buffer.push_str(lexeme),
            None => {
                if !(origin.return_end || origin.exclude_end) {
                    self.mode_buffer.push_str(lexeme);
                }
                self.process_buffer()?;
                if origin.exclude_end {
                    self.mode_buffer = lexeme.to_string();
                }
            }
        }

        let ended = language.mode(self.stack[end_depth].mode);
        while self.stack.len() > end_depth {
            let Some(frame) = self.stack.pop() else {
                break;
            };
            let mode = language.mode(frame.mode);
            if mode.scope.is_some() {
                self.emitter.close_node();
            }
            if !mode.skip && mode.sub_language.is_none() {
                self.relevance += mode.relevance;
            }
        }

        if let Some(starts) = ended.starts {
            self.start_new_mode(starts, found, ModeData::new());
        }

        Ok(Some(if origin.return_end { 0 } else { lexeme.len() }))
    }

    /// Depth of the outermost frame closed by an end match seen while the
    /// frame at `depth` is on top, if any. `endsWithParent` passes the
    /// match on to the parent; `endsParent` widens the close to the parent
    /// but never to the root.
    fn end_of_mode(&mut self, depth: usize, found: &RuleMatch) -> Result<Option<usize>, Error> {
        let mode = self.language.mode(self.stack[depth].mode);

        let mut matched = mode
            .end_re
            .as_ref()
            .is_some_and(|end| crate::patterns::starts_with(end, self.code, found.start));

        if matched {
            if let Some(hook) = &mode.on_end {
                let mut data = mem::take(&mut self.stack[depth].data);
                let action = self.run_hook(hook, found, &mut data);
                self.stack[depth].data = data;
                if action? == HookAction::IgnoreMatch {
                    matched = false;
                }
            }
        }

        if matched {
            let mut depth = depth;
            while depth > 1 && self.language.mode(self.stack[depth].mode).ends_parent {
                depth -= 1;
            }
            return Ok(Some(depth));
        }

        if mode.ends_with_parent && depth > 0 {
            return self.end_of_mode(depth - 1, found);
        }

        Ok(None)
    }

    fn run_hook(
        &self,
        hook: &Hook,
        found: &RuleMatch,
        data: &mut ModeData,
    ) -> Result<HookAction, Error> {
        let context = MatchContext::new(self.code, found.start, &found.groups);

        panic::catch_unwind(AssertUnwindSafe(|| hook.call(&context, data))).map_err(|payload| {
            let message = payload
                .downcast_ref::<&str>()
                .map(|message| message.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| String::from("unknown panic"));

            Error::new(ErrorImpl::HookPanicked { message }, self.position(found.start))
        })
    }

    fn process_buffer(&mut self) -> Result<(), Error> {
        if self.top_mode().sub_language.is_some() {
            self.process_sub_language()?;
        } else {
            self.process_keywords();
        }
        self.mode_buffer.clear();
        Ok(())
    }

    /// Emits the buffer, splitting out keywords of the current mode.
    fn process_keywords(&mut self) {
        let buffer = mem::take(&mut self.mode_buffer);
        let Some(keywords) = &self.top_mode().keywords else {
            self.emitter.add_text(&buffer);
            return;
        };

        let max_hits = self.highlighter.options().max_keyword_hits;
        let mut region = Region::new();
        let mut pending = String::new();
        let mut last = 0;
        let mut at = 0;

        while at <= buffer.len() {
            let found = keywords.pattern_re.search_with_options(
                &buffer,
                at,
                buffer.len(),
                SearchOptions::SEARCH_OPTION_NONE,
                Some(&mut region),
            );
            let Some((start, end)) = found.and_then(|_| region.pos(0)) else {
                break;
            };
            if start == end {
                at = next_char_boundary(&buffer, end);
                continue;
            }

            pending.push_str(&buffer[last..start]);
            let word = &buffer[start..end];

            match keywords.table.get(word) {
                Some(entry) => {
                    self.emitter.add_text(&pending);
                    pending.clear();

                    let key = if keywords.table.is_case_insensitive() {
                        word.to_lowercase()
                    } else {
                        word.to_string()
                    };
                    let hits = self.keyword_hits.entry(key).or_insert(0);
                    *hits += 1;
                    if *hits <= max_hits {
                        self.relevance += entry.relevance;
                    }

                    if entry.scope.starts_with('_') {
                        pending.push_str(word);
                    } else {
                        self.emit_keyword(word, &entry.scope);
                    }
                }
                None => pending.push_str(word),
            }

            last = end;
            at = end;
        }

        pending.push_str(&buffer[last..]);
        self.emitter.add_text(&pending);
    }

    fn process_sub_language(&mut self) -> Result<(), Error> {
        if self.mode_buffer.is_empty() {
            return Ok(());
        }

        let mode = self.top_mode();
        let Some(sub_language) = &mode.sub_language else {
            return Ok(());
        };
        let buffer = mem::take(&mut self.mode_buffer);
        let highlighter = self.highlighter;

        let result = match sub_language {
            SubLanguage::Single(name) => {
                if highlighter.get_language(name).is_none() {
                    warn!(language = %name, "sub-language is not registered, emitting plain text");
                    self.emitter.add_text(&buffer);
                    return Ok(());
                }
                let continuation = self.continuations.get(name).cloned();
                let result = highlighter.highlight_language::<E>(
                    name,
                    &buffer,
                    true,
                    continuation.as_deref(),
                )?;
                self.continuations.insert(name.clone(), result.top.clone());
                result
            }
            SubLanguage::List(names) if !names.is_empty() => {
                highlighter.highlight_auto_with::<E>(&buffer, Some(names.as_slice()))?
            }
            SubLanguage::List(_) | SubLanguage::Any => {
                highlighter.highlight_auto_with::<E>(&buffer, None)?
            }
        };

        trace!(
            language = ?result.language,
            relevance = result.relevance,
            "highlighted sub-language block"
        );

        if mode.relevance > 0 {
            self.relevance += result.relevance;
        }
        self.emitter
            .add_sublanguage(result.emitter, result.language.as_deref());

        Ok(())
    }

    fn emit_keyword(&mut self, text: &str, scope: &str) {
        if text.is_empty() {
            return;
        }
        self.emitter.open_node(self.language.scope_alias(scope));
        self.emitter.add_text(text);
        self.emitter.close_node();
    }

    /// Emits each scoped capture group of a multi-part delimiter. Groups
    /// without a scope go through keyword scanning of the current mode.
    fn emit_multi_class(&mut self, scopes: &BTreeMap<usize, Option<String>>, found: &RuleMatch) {
        let code = self.code;
        for (group, scope) in scopes {
            let Some(Some((start, end))) = found.groups.get(*group) else {
                continue;
            };
            let text = &code[*start..*end];

            match scope {
                Some(scope) => self.emit_keyword(text, scope),
                None => {
                    self.mode_buffer = text.to_string();
                    self.process_keywords();
                    self.mode_buffer.clear();
                }
            }
        }
    }

    /// Reopens the scopes of a resumed mode stack.
    fn open_continuation(&mut self) {
        let language = self.language;
        for frame in self.stack.iter().skip(1) {
            if let Some(scope) = &language.mode(frame.mode).scope {
                self.emitter.open_node(language.scope_alias(scope));
            }
        }
    }
}
