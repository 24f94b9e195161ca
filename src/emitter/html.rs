//! HTML rendering of token trees.

use super::token_tree::{Node, ScopeNode};

/// Escapes text for use in HTML content and attribute values.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            c => out.push(c),
        }
    }
    out
}

/// CSS classes for a scope.
///
/// `title.class.inherited` becomes `hljs-title class_ inherited__`, and a
/// sub-language scope `language:xml` becomes `language-xml`.
pub fn scope_to_css_class(scope: &str, prefix: &str) -> String {
    if let Some(language) = scope.strip_prefix("language:") {
        return format!("language-{}", language);
    }

    let mut pieces = scope.split('.');
    let mut classes = vec![format!("{}{}", prefix, pieces.next().unwrap_or_default())];
    classes.extend(
        pieces
            .enumerate()
            .map(|(depth, piece)| format!("{}{}", piece, "_".repeat(depth + 1))),
    );
    classes.join(" ")
}

pub(crate) fn render_node(out: &mut String, node: &ScopeNode, prefix: &str) {
    if let Some(scope) = &node.scope {
        out.push_str("<span class=\"");
        out.push_str(&scope_to_css_class(scope, prefix));
        out.push_str("\">");
    }

    for child in &node.children {
        match child {
            Node::Text(text) => out.push_str(&escape(text)),
            Node::Scope(child) => render_node(out, child, prefix),
        }
    }

    if node.scope.is_some() {
        out.push_str("</span>");
    }
}
