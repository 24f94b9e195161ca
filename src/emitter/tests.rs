//! Unit tests for the token tree emitter and HTML rendering.

use super::{
    emitter::Emitter,
    html::{escape, scope_to_css_class},
    token_tree::{Node, ScopeNode, TokenTree},
};
use crate::highlighter::options::Options;

#[test]
fn test_escape() {
    assert_eq!(escape("a < b && c > \"d\" 'e'"), "a &lt; b &amp;&amp; c &gt; &quot;d&quot; &#x27;e&#x27;");
    assert_eq!(escape("plain"), "plain");
}

#[test]
fn test_scope_to_css_class() {
    assert_eq!(scope_to_css_class("keyword", "hljs-"), "hljs-keyword");
    assert_eq!(
        scope_to_css_class("title.class.inherited", "hljs-"),
        "hljs-title class_ inherited__"
    );
    assert_eq!(scope_to_css_class("language:xml", "hljs-"), "language-xml");
    assert_eq!(scope_to_css_class("string", ""), "string");
}

#[test]
fn test_adjacent_text_is_merged() {
    let mut tree = TokenTree::new();
    tree.add_text("a");
    tree.add_text("");
    tree.add_text("b");
    tree.finalize();

    assert_eq!(tree.root().children, vec![Node::Text("ab".to_string())]);
}

#[test]
fn test_nodes_nest() {
    let mut tree = TokenTree::new();
    tree.add_text("x = ");
    tree.open_node("string");
    tree.add_text("\"");
    tree.open_node("subst");
    tree.add_text("y");
    tree.close_node();
    tree.add_text("\"");
    tree.close_node();
    tree.finalize();

    let string = match &tree.root().children[1] {
        Node::Scope(node) => node,
        other => panic!("unexpected node {:?}", other),
    };
    assert_eq!(string.scope.as_deref(), Some("string"));
    assert_eq!(string.children.len(), 3);
    assert_eq!(tree.root().text(), "x = \"y\"");
}

#[test]
fn test_close_never_pops_root() {
    let mut tree = TokenTree::new();
    tree.close_node();
    tree.close_node();
    tree.add_text("still here");

    assert_eq!(tree.depth(), 0);
    assert_eq!(tree.root().text(), "still here");
}

#[test]
fn test_finalize_closes_open_nodes() {
    let mut tree = TokenTree::new();
    tree.open_node("comment");
    tree.open_node("doctag");
    tree.add_text("TODO");
    assert_eq!(tree.depth(), 2);

    tree.finalize();

    assert_eq!(tree.depth(), 0);
    assert_eq!(
        tree.to_html(&Options::default()),
        "<span class=\"hljs-comment\"><span class=\"hljs-doctag\">TODO</span></span>"
    );
}

#[test]
fn test_add_sublanguage() {
    let mut inner = TokenTree::new();
    inner.open_node("keyword");
    inner.add_text("let");

    let mut outer = TokenTree::new();
    outer.add_text("<script>");
    outer.add_sublanguage(inner, Some("javascript"));
    outer.add_text("</script>");
    outer.finalize();

    let expected = ScopeNode {
        scope: Some("language:javascript".to_string()),
        children: vec![Node::Scope(ScopeNode {
            scope: Some("keyword".to_string()),
            children: vec![Node::Text("let".to_string())],
        })],
    };
    assert_eq!(outer.root().children[1], Node::Scope(expected));
    assert_eq!(
        outer.to_html(&Options::default()),
        "&lt;script&gt;<span class=\"language-javascript\"><span class=\"hljs-keyword\">let</span></span>&lt;/script&gt;"
    );
}

#[test]
fn test_unnamed_sublanguage_renders_children_only() {
    let mut inner = TokenTree::new();
    inner.add_text("raw");

    let mut outer = TokenTree::new();
    outer.add_sublanguage(inner, None);
    outer.finalize();

    assert_eq!(outer.to_html(&Options::default()), "raw");
}

#[test]
fn test_custom_class_prefix() {
    let mut tree = TokenTree::new();
    tree.open_node("number");
    tree.add_text("1");
    tree.finalize();

    let options = Options {
        class_prefix: "hl-".to_string(),
        ..Options::default()
    };
    assert_eq!(tree.to_html(&options), "<span class=\"hl-number\">1</span>");
}
