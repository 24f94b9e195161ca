//! Unit tests for the language registry, options and auto-detection.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use super::{
    highlighter::{HighlightOptions, Highlighter},
    options::Options,
};
use crate::grammar::{language::Language, mode::Mode};

fn keywords(name: &str, words: &str) -> Language {
    Language::new(name, Mode::new().keywords(words))
}

fn registry() -> Highlighter {
    let mut highlighter = Highlighter::new();
    highlighter
        .register_language("alpha", || keywords("alpha", "foo bar").aliases(&["al", "A1"]))
        .unwrap();
    highlighter
        .register_language("beta", || keywords("beta", "baz"))
        .unwrap();
    highlighter
}

#[test]
fn test_lookup_by_name_and_alias() {
    let highlighter = registry();

    assert_eq!(highlighter.canonical_name("ALPHA").as_deref(), Some("alpha"));
    assert_eq!(highlighter.canonical_name("a1").as_deref(), Some("alpha"));
    assert_eq!(highlighter.canonical_name("al").as_deref(), Some("alpha"));
    assert!(highlighter.get_language("gamma").is_none());

    let result = highlighter
        .highlight("foo", &HighlightOptions::new("Al"))
        .unwrap();
    assert_eq!(result.language.as_deref(), Some("alpha"));
    assert_eq!(result.value, "<span class=\"hljs-keyword\">foo</span>");
}

#[test]
fn test_names_are_lowercased() {
    let mut highlighter = Highlighter::new();
    highlighter
        .register_language("Gamma", || keywords("Gamma", "x"))
        .unwrap();

    assert_eq!(highlighter.list_languages(), vec!["gamma".to_string()]);
    let result = highlighter
        .highlight("x", &HighlightOptions::new("GAMMA"))
        .unwrap();
    assert_eq!(result.language.as_deref(), Some("gamma"));
}

#[test]
fn test_unknown_language() {
    let highlighter = registry();
    let error = highlighter
        .highlight("foo", &HighlightOptions::new("gamma"))
        .unwrap_err();

    assert_eq!(error.get_error_name(), "UnknownLanguage");
}

#[test]
fn test_list_languages_is_sorted() {
    let highlighter = registry();
    assert_eq!(highlighter.list_languages(), vec!["alpha".to_string(), "beta".to_string()]);
}

#[test]
fn test_unregister_drops_aliases() {
    let mut highlighter = registry();

    assert!(highlighter.unregister_language("alpha"));
    assert!(!highlighter.unregister_language("alpha"));
    assert!(highlighter.canonical_name("al").is_none());
    assert_eq!(highlighter.list_languages(), vec!["beta".to_string()]);
}

#[test]
fn test_register_aliases_later() {
    let mut highlighter = registry();
    highlighter.register_aliases(&["b", "BB"], "beta");

    assert_eq!(highlighter.canonical_name("bb").as_deref(), Some("beta"));
    assert_eq!(highlighter.canonical_name("b").as_deref(), Some("beta"));
}

#[test]
fn test_broken_grammar_is_not_registered() {
    let mut highlighter = Highlighter::new();
    let error = highlighter
        .register_language("broken", || Language::new("broken", Mode::new().contains([Mode::new().begin("(")])))
        .unwrap_err();

    assert_eq!(error.get_error_name(), "InvalidPattern");
    assert!(highlighter.list_languages().is_empty());
}

#[test]
fn test_register_language_json() {
    let mut highlighter = Highlighter::new();
    highlighter
        .register_language_json(
            "ini",
            r#"{ "aliases": ["toml-ish"], "contains": [{ "scope": "section", "begin": "\\[", "end": "\\]" }] }"#,
        )
        .unwrap();

    let result = highlighter
        .highlight("[a]", &HighlightOptions::new("toml-ish"))
        .unwrap();
    assert_eq!(result.value, "<span class=\"hljs-section\">[a]</span>");

    let error = highlighter.register_language_json("bad", "{ nope").unwrap_err();
    assert_eq!(error.get_error_name(), "InvalidGrammarData");
}

#[test]
fn test_reload_language_calls_the_factory_again() {
    let builds = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&builds);

    let mut highlighter = Highlighter::new();
    highlighter
        .register_language("counted", move || {
            counter.fetch_add(1, Ordering::SeqCst);
            keywords("counted", "x")
        })
        .unwrap();
    assert_eq!(builds.load(Ordering::SeqCst), 1);

    highlighter.reload_language("counted").unwrap();
    assert_eq!(builds.load(Ordering::SeqCst), 2);

    let error = highlighter.reload_language("missing").unwrap_err();
    assert_eq!(error.get_error_name(), "UnknownLanguage");
}

#[test]
fn test_auto_detect_picks_highest_relevance() {
    let highlighter = registry();
    let result = highlighter.highlight_auto("foo bar baz").unwrap();

    assert_eq!(result.language.as_deref(), Some("alpha"));
    assert_eq!(result.relevance, 2);
    let second = result.second_best.unwrap();
    assert_eq!(second.language.as_deref(), Some("beta"));
    assert_eq!(second.relevance, 1);
}

#[test]
fn test_auto_detect_falls_back_to_plain_text() {
    let highlighter = registry();
    let result = highlighter.highlight_auto("<nothing>").unwrap();

    assert_eq!(result.language, None);
    assert_eq!(result.value, "&lt;nothing&gt;");
    assert_eq!(result.relevance, 0);
}

#[test]
fn test_auto_detect_subset_and_aliases() {
    let highlighter = registry();
    let result = highlighter
        .highlight_auto_in("foo bar baz", &["beta", "al", "alpha", "unknown"])
        .unwrap();

    assert_eq!(result.language.as_deref(), Some("alpha"));
    assert_eq!(result.second_best.unwrap().language.as_deref(), Some("beta"));

    let result = highlighter.highlight_auto_in("foo bar baz", &["beta"]).unwrap();
    assert_eq!(result.language.as_deref(), Some("beta"));
}

#[test]
fn test_auto_detect_uses_configured_languages() {
    let mut highlighter = registry();
    highlighter.configure(Options {
        languages: Some(vec!["beta".to_string()]),
        ..Options::default()
    });

    let result = highlighter.highlight_auto("foo bar baz").unwrap();
    assert_eq!(result.language.as_deref(), Some("beta"));
}

#[test]
fn test_disabled_language_is_not_detected() {
    let mut highlighter = registry();
    highlighter
        .register_language("quiet", || keywords("quiet", "foo bar baz qux").disable_autodetect())
        .unwrap();

    assert!(!highlighter.auto_detection("quiet"));
    assert!(highlighter.auto_detection("alpha"));
    let result = highlighter.highlight_auto("foo bar baz qux").unwrap();
    assert_eq!(result.language.as_deref(), Some("alpha"));
}

#[test]
fn test_superset_wins_ties() {
    let mut highlighter = Highlighter::new();
    highlighter
        .register_language("base", || keywords("base", "foo"))
        .unwrap();
    highlighter
        .register_language("extended", || keywords("extended", "foo").superset_of("base"))
        .unwrap();

    let result = highlighter.highlight_auto("foo").unwrap();
    assert_eq!(result.language.as_deref(), Some("extended"));
    assert_eq!(result.second_best.unwrap().language.as_deref(), Some("base"));
}

#[test]
fn test_illegal_candidates_are_dropped_in_debug_mode() {
    let mut highlighter = Highlighter::new();
    highlighter
        .register_language("strict", || {
            Language::new("strict", Mode::new().keywords("foo").illegal("!"))
        })
        .unwrap();
    highlighter.debug_mode();

    let result = highlighter.highlight_auto("foo !").unwrap();
    assert_eq!(result.language, None);
    assert!(result.second_best.is_none());

    highlighter.safe_mode();
    let result = highlighter.highlight_auto("foo !").unwrap();
    assert_eq!(result.language, None);
    let second = result.second_best.unwrap();
    assert!(second.illegal);
    assert_eq!(second.relevance, 0);
}

#[test]
fn test_options_from_json() {
    let options = Options::from_json(
        r#"{ "classPrefix": "hl-", "safeMode": false, "maxKeywordHits": 3, "languages": ["alpha"] }"#,
    )
    .unwrap();

    assert_eq!(options.class_prefix, "hl-");
    assert!(!options.safe_mode);
    assert_eq!(options.max_keyword_hits, 3);
    assert_eq!(options.languages, Some(vec!["alpha".to_string()]));
    assert_eq!(options.loop_iteration_floor, Options::default().loop_iteration_floor);

    let error = Options::from_json("{ \"safeMode\": 1 }").unwrap_err();
    assert_eq!(error.get_error_name(), "InvalidOptions");
}

#[test]
fn test_safe_and_debug_mode_switch() {
    let mut highlighter = Highlighter::new();
    assert!(highlighter.options().safe_mode);

    highlighter.debug_mode();
    assert!(!highlighter.options().safe_mode);

    highlighter.safe_mode();
    assert!(highlighter.options().safe_mode);
}

#[test]
fn test_class_prefix_option() {
    let mut highlighter = registry();
    highlighter.configure(Options {
        class_prefix: String::new(),
        ..Options::default()
    });

    let result = highlighter
        .highlight("foo", &HighlightOptions::new("alpha"))
        .unwrap();
    assert_eq!(result.value, "<span class=\"keyword\">foo</span>");
}
