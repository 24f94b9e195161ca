use std::{collections::HashMap, fmt, sync::Arc};

use super::mode::Mode;

/// Scratch storage a match hook can use to carry state from a mode's begin
/// to its end (for example the delimiter of a heredoc). Each activation of
/// a mode gets its own.
pub type ModeData = HashMap<String, String>;

/// What a match hook decided about the match it was shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookAction {
    Continue,
    IgnoreMatch,
}

/// A begin or end match as seen by hooks.
#[derive(Debug, Clone, Copy)]
pub struct MatchContext<'t> {
    input: &'t str,
    index: usize,
    groups: &'t [Option<(usize, usize)>],
}

impl<'t> MatchContext<'t> {
    /// `groups[0]` is the whole match, the rest are the rule's own capture
    /// groups in order.
    pub fn new(input: &'t str, index: usize, groups: &'t [Option<(usize, usize)>]) -> Self {
        MatchContext {
            input,
            index,
            groups,
        }
    }

    pub fn input(&self) -> &'t str {
        self.input
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn as_str(&self) -> &'t str {
        self.group(0).unwrap_or("")
    }

    pub fn group(&self, index: usize) -> Option<&'t str> {
        self.groups
            .get(index)
            .copied()
            .flatten()
            .map(|(start, end)| &self.input[start..end])
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn preceding_char(&self) -> Option<char> {
        self.input[..self.index].chars().next_back()
    }
}

type HookFn = dyn Fn(&MatchContext<'_>, &mut ModeData) -> HookAction + Send + Sync;

/// `on:begin` / `on:end` callback attached to a mode.
#[derive(Clone)]
pub struct Hook(Arc<HookFn>);

impl Hook {
    pub fn new(
        f: impl Fn(&MatchContext<'_>, &mut ModeData) -> HookAction + Send + Sync + 'static,
    ) -> Self {
        Hook(Arc::new(f))
    }

    pub fn call(&self, context: &MatchContext<'_>, data: &mut ModeData) -> HookAction {
        (self.0)(context, data)
    }
}

impl fmt::Debug for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Hook(..)")
    }
}

type ExtensionFn = dyn Fn(&mut Mode, Option<&Mode>) + Send + Sync;

/// Grammar-supplied preprocessing step, run on every mode before the
/// compiler applies its own structural defaults. Receives the mode and its
/// parent.
#[derive(Clone)]
pub struct CompilerExtension(Arc<ExtensionFn>);

impl CompilerExtension {
    pub fn new(f: impl Fn(&mut Mode, Option<&Mode>) + Send + Sync + 'static) -> Self {
        CompilerExtension(Arc::new(f))
    }

    pub fn apply(&self, mode: &mut Mode, parent: Option<&Mode>) {
        (self.0)(mode, parent)
    }
}

impl fmt::Debug for CompilerExtension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CompilerExtension(..)")
    }
}
