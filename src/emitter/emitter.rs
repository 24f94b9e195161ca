use crate::highlighter::options::Options;

/// Sink for the events of a highlight run.
///
/// The lexer calls `open_node`/`close_node` in strictly balanced order
/// following its mode stack; nodes still open when the input runs out are
/// closed by `finalize`. A fresh emitter is created per run with
/// `Default`, and a sub-language run's emitter is handed to its parent
/// through `add_sublanguage`.
pub trait Emitter: Default {
    fn add_text(&mut self, text: &str);

    fn open_node(&mut self, scope: &str);

    fn close_node(&mut self);

    /// Splices the finished output of a nested run in as one node, tagged
    /// with the language it was highlighted as.
    fn add_sublanguage(&mut self, other: Self, language: Option<&str>);

    /// Closes every node that is still open.
    fn finalize(&mut self);

    /// Serialized form of everything emitted so far.
    fn to_html(&self, options: &Options) -> String;
}
