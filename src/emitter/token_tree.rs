use crate::highlighter::options::Options;

use super::{emitter::Emitter, html};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Text(String),
    Scope(ScopeNode),
}

/// A span of highlighted text. The root node, and sub-language nodes whose
/// language is unknown, have no scope.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScopeNode {
    pub scope: Option<String>,
    pub children: Vec<Node>,
}

impl ScopeNode {
    pub fn new(scope: &str) -> Self {
        ScopeNode {
            scope: Some(scope.to_string()),
            children: vec![],
        }
    }

    /// Concatenated text of every descendant.
    pub fn text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        for child in &self.children {
            match child {
                Node::Text(text) => out.push_str(text),
                Node::Scope(node) => node.collect_text(out),
            }
        }
    }

    fn push(&mut self, node: Node) {
        if let (Node::Text(text), Some(Node::Text(last))) = (&node, self.children.last_mut()) {
            last.push_str(text);
            return;
        }
        self.children.push(node);
    }
}

/// Emitter that builds a tree of scoped nodes. Adjacent text is merged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenTree {
    /// Open nodes, outermost first; `stack[0]` is the root and is never
    /// closed.
    stack: Vec<ScopeNode>,
}

impl Default for TokenTree {
    fn default() -> Self {
        TokenTree {
            stack: vec![ScopeNode::default()],
        }
    }
}

impl TokenTree {
    pub fn new() -> Self {
        TokenTree::default()
    }

    /// The root node. Complete once the tree has been finalized.
    pub fn root(&self) -> &ScopeNode {
        &self.stack[0]
    }

    pub fn into_root(mut self) -> ScopeNode {
        self.finalize();
        self.stack.swap_remove(0)
    }

    /// Number of nodes currently open below the root.
    pub fn depth(&self) -> usize {
        self.stack.len() - 1
    }

    fn top(&mut self) -> &mut ScopeNode {
        let last = self.stack.len() - 1;
        &mut self.stack[last]
    }
}

impl Emitter for TokenTree {
    fn add_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        self.top().push(Node::Text(text.to_string()));
    }

    fn open_node(&mut self, scope: &str) {
        self.stack.push(ScopeNode::new(scope));
    }

    fn close_node(&mut self) {
        if self.stack.len() > 1 {
            if let Some(node) = self.stack.pop() {
                self.top().push(Node::Scope(node));
            }
        }
    }

    fn add_sublanguage(&mut self, other: Self, language: Option<&str>) {
        let mut node = other.into_root();
        node.scope = language.map(|language| format!("language:{}", language));
        self.top().push(Node::Scope(node));
    }

    fn finalize(&mut self) {
        while self.stack.len() > 1 {
            self.close_node();
        }
    }

    fn to_html(&self, options: &Options) -> String {
        let mut out = String::new();
        html::render_node(&mut out, self.root(), &options.class_prefix);
        out
    }
}
