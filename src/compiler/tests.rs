//! Unit tests for grammar compilation and rule matching.

use std::{collections::BTreeMap, sync::Arc};

use super::{
    compiled::ScopeEmit,
    compiler::{compile_language, MATCH_EMPTY},
    matcher::{RuleKind, RuleMatcher},
};
use crate::grammar::{
    common::{BACKSLASH_ESCAPE, QUOTE_STRING_MODE},
    language::Language,
    mode::{Contained, Mode, Scope},
};

fn language(mode: Mode) -> Language {
    Language::new("test", mode)
}

#[test]
fn test_compile_twice_is_identical() {
    let grammar = language(Mode::new().contains([
        Contained::from(&*QUOTE_STRING_MODE),
        Contained::from(Mode::new().scope("number").begin("\\d+")),
    ]));

    let first = compile_language("test", &grammar).unwrap();
    let second = compile_language("test", &grammar).unwrap();

    assert_eq!(format!("{:?}", first), format!("{:?}", second));
}

#[test]
fn test_shared_mode_compiles_once() {
    let grammar = language(Mode::new().contains([&*QUOTE_STRING_MODE, &*QUOTE_STRING_MODE]));
    let compiled = compile_language("test", &grammar).unwrap();

    let root = compiled.root_mode();
    assert_eq!(root.contains, vec![1, 1]);
    assert_eq!(compiled.modes().len(), 3);
    assert_eq!(compiled.mode(1).scope.as_deref(), Some("string"));
    assert_eq!(compiled.mode(1).contains, vec![2]);
    assert_eq!(compiled.mode(2).begin, BACKSLASH_ESCAPE.begin.as_ref().unwrap().as_single().unwrap());
}

#[test]
fn test_root_and_nested_defaults() {
    let grammar = language(Mode::new().contains([Mode::new().scope("anything")]));
    let compiled = compile_language("test", &grammar).unwrap();

    let root = compiled.root_mode();
    assert_eq!(root.begin, "");
    assert!(root.end.is_none());
    assert_eq!(root.terminator_end, "");
    assert_eq!(root.relevance, 1);

    let child = compiled.mode(root.contains[0]);
    assert_eq!(child.begin, MATCH_EMPTY);
    assert_eq!(child.end.as_deref(), Some(MATCH_EMPTY));
    assert_eq!(child.terminator_end, MATCH_EMPTY);
}

#[test]
fn test_self_at_top_level_is_rejected() {
    let grammar = language(Mode::new().contains([Contained::SelfRef]));
    let error = compile_language("test", &grammar).unwrap_err();

    assert_eq!(error.get_error_name(), "SelfAtTopLevel");
    assert!(error.is_configuration());
    assert_eq!(&*error.get_position().1, "test");
}

#[test]
fn test_nested_self_reference() {
    let parens = Mode::new()
        .begin("\\(")
        .end("\\)")
        .contains([Contained::SelfRef]);
    let compiled = compile_language("test", &language(Mode::new().contains([parens]))).unwrap();

    let id = compiled.root_mode().contains[0];
    assert_eq!(compiled.mode(id).contains, vec![id]);
}

#[test]
fn test_named_references_and_cycles() {
    let grammar = Language::new("test", Mode::new().contains(["block"])).define(
        "block",
        Mode::new()
            .scope("block")
            .begin("\\{")
            .end("\\}")
            .contains(["block"]),
    );
    let compiled = compile_language("test", &grammar).unwrap();

    let block = compiled.root_mode().contains[0];
    assert_eq!(compiled.mode(block).contains, vec![block]);
    assert_eq!(compiled.modes().len(), 2);
}

#[test]
fn test_unknown_reference_is_rejected() {
    let grammar = language(Mode::new().contains(["missing"]));
    let error = compile_language("test", &grammar).unwrap_err();

    assert_eq!(error.get_error_name(), "UnknownModeReference");
}

#[test]
fn test_match_with_begin_is_rejected() {
    let grammar = language(Mode::new().contains([Mode::new().match_("a").begin("b")]));
    let error = compile_language("test", &grammar).unwrap_err();

    assert_eq!(error.get_error_name(), "MatchWithBeginOrEnd");
}

#[test]
fn test_match_becomes_begin_with_default_end() {
    let grammar = language(Mode::new().contains([Mode::new().scope("number").match_("\\d+")]));
    let compiled = compile_language("test", &grammar).unwrap();

    let number = compiled.mode(1);
    assert_eq!(number.begin, "\\d+");
    assert_eq!(number.end.as_deref(), Some(MATCH_EMPTY));
}

#[test]
fn test_class_name_becomes_scope() {
    let grammar = language(Mode::new().contains([Mode::new().class_name("string").begin("'")]));
    let compiled = compile_language("test", &grammar).unwrap();

    assert_eq!(compiled.mode(1).scope.as_deref(), Some("string"));
}

#[test]
fn test_multi_class_positions() {
    let mode = Mode::new()
        .match_(vec!["(a)", "b", "c"])
        .begin_scope(Scope::Multi(BTreeMap::from([
            (1, Some("x".to_string())),
            (3, Some("z".to_string())),
        ])));
    let compiled = compile_language("test", &language(Mode::new().contains([mode]))).unwrap();

    let multi = compiled.mode(1);
    assert_eq!(multi.begin, "((a))(b)(c)");
    assert_eq!(
        multi.begin_scope,
        Some(ScopeEmit::Multi(BTreeMap::from([
            (1, Some("x".to_string())),
            (3, None),
            (4, Some("z".to_string())),
        ])))
    );
}

#[test]
fn test_multi_scope_given_as_scope() {
    let mode = Mode::new()
        .match_(vec!["fn", "\\s+", "\\w+"])
        .scope(Scope::multi([(1, "keyword"), (3, "title")]));
    let compiled = compile_language("test", &language(Mode::new().contains([mode]))).unwrap();

    let multi = compiled.mode(1);
    assert!(multi.scope.is_none());
    assert!(matches!(multi.begin_scope, Some(ScopeEmit::Multi(_))));
}

#[test]
fn test_multi_class_rejects_incompatible_flags() {
    let mode = Mode::new()
        .begin(vec!["a", "b"])
        .end("c")
        .begin_scope(Scope::multi([(1, "x")]))
        .exclude_begin();
    let error = compile_language("test", &language(Mode::new().contains([mode]))).unwrap_err();

    assert_eq!(error.get_error_name(), "MultiClassIncompatible");
}

#[test]
fn test_multi_class_requires_scope_map() {
    let mode = Mode::new().begin(vec!["a", "b"]).begin_scope("x");
    let error = compile_language("test", &language(Mode::new().contains([mode]))).unwrap_err();

    assert_eq!(error.get_error_name(), "MalformedScope");
}

#[test]
fn test_single_scope_wraps() {
    let mode = Mode::new().begin("<").end(">").begin_scope("punctuation").end_scope("punctuation");
    let compiled = compile_language("test", &language(Mode::new().contains([mode]))).unwrap();

    assert_eq!(
        compiled.mode(1).begin_scope,
        Some(ScopeEmit::Wrap("punctuation".to_string()))
    );
    assert_eq!(
        compiled.mode(1).end_scope,
        Some(ScopeEmit::Wrap("punctuation".to_string()))
    );
}

#[test]
fn test_variants_expand_in_place() {
    let string = Mode::new().scope("string").variants(vec![
        Mode::new().begin("'").end("'"),
        Mode::new().begin("\"").end("\"").relevance(3),
    ]);
    let grammar = language(Mode::new().contains([
        Contained::from(string),
        Contained::from(Mode::new().scope("number").begin("\\d")),
    ]));
    let compiled = compile_language("test", &grammar).unwrap();

    let contains = &compiled.root_mode().contains;
    assert_eq!(contains.len(), 3);
    assert_eq!(compiled.mode(contains[0]).begin, "'");
    assert_eq!(compiled.mode(contains[0]).scope.as_deref(), Some("string"));
    assert_eq!(compiled.mode(contains[0]).relevance, 1);
    assert_eq!(compiled.mode(contains[1]).begin, "\"");
    assert_eq!(compiled.mode(contains[1]).relevance, 3);
    assert_eq!(compiled.mode(contains[2]).scope.as_deref(), Some("number"));
}

#[test]
fn test_shared_variants_are_expanded_once() {
    let string = Arc::new(
        Mode::new()
            .scope("string")
            .variants(vec![Mode::new().begin("'").end("'"), Mode::new().begin("\"").end("\"")]),
    );
    let block = Mode::new().begin("\\{").end("\\}").contains([&string]);
    let grammar = language(Mode::new().contains([Contained::from(&string), Contained::from(block)]));
    let compiled = compile_language("test", &grammar).unwrap();

    let root = compiled.root_mode();
    let block = compiled.mode(root.contains[2]);
    assert_eq!(block.contains, root.contains[..2].to_vec());
}

#[test]
fn test_nested_variants_are_rejected() {
    let string = Mode::new().scope("string").variants(vec![
        Mode::new().begin("'").end("'"),
        Mode::new().variants(vec![Mode::new().begin("\"").end("\"")]),
    ]);
    let error = compile_language("test", &language(Mode::new().contains([string]))).unwrap_err();

    assert_eq!(error.get_error_name(), "NestedVariants");
    assert!(error.is_configuration());
}

#[test]
fn test_ends_with_parent_terminator() {
    let child = Mode::new().scope("value").begin("=").ends_with_parent();
    let with_end = Mode::new().scope("flag").begin("-").end("\\s").ends_with_parent();
    let parent = Mode::new()
        .scope("line")
        .begin("\\w")
        .end("\\n")
        .contains([child, with_end]);
    let compiled = compile_language("test", &language(Mode::new().contains([parent]))).unwrap();

    let line = compiled.mode(1);
    let value = compiled.mode(line.contains[0]);
    let flag = compiled.mode(line.contains[1]);

    assert!(value.end.is_none());
    assert_eq!(value.terminator_end, "\\n");
    assert_eq!(flag.terminator_end, "\\s|\\n");
}

#[test]
fn test_ends_with_parent_at_top_level_never_ends() {
    let grammar = language(Mode::new().contains([Mode::new().begin("x").ends_with_parent()]));
    let compiled = compile_language("test", &grammar).unwrap();

    let child = compiled.mode(1);
    assert_eq!(child.terminator_end, "");
    assert!(child.matcher().is_empty());
}

#[test]
fn test_parent_dependent_modes_are_copied_per_parent() {
    let value = Arc::new(Mode::new().scope("value").begin("=").ends_with_parent());
    let a = Mode::new().begin("a").end("\\n").contains([&value]);
    let b = Mode::new().begin("b").end(";").contains([&value]);
    let compiled = compile_language("test", &language(Mode::new().contains([a, b]))).unwrap();

    let root = compiled.root_mode();
    let in_a = compiled.mode(root.contains[0]).contains[0];
    let in_b = compiled.mode(root.contains[1]).contains[0];

    assert_ne!(in_a, in_b);
    assert_eq!(compiled.mode(in_a).terminator_end, "\\n");
    assert_eq!(compiled.mode(in_b).terminator_end, ";");
}

#[test]
fn test_parent_dependent_modes_share_a_terminator() {
    let value = Arc::new(Mode::new().scope("value").begin("=").ends_with_parent());
    let a = Mode::new().begin("a").end("\\n").contains([&value]);
    let b = Mode::new().begin("b").end("\\n").contains([&value]);
    let compiled = compile_language("test", &language(Mode::new().contains([a, b]))).unwrap();

    let root = compiled.root_mode();
    let in_a = compiled.mode(root.contains[0]).contains[0];
    let in_b = compiled.mode(root.contains[1]).contains[0];

    assert_eq!(in_a, in_b);
    assert_eq!(compiled.modes().len(), 4);
}

#[test]
fn test_self_containing_ends_with_parent_compiles_once() {
    let tag = Mode::new().scope("tag").begin("<").end(">").contains(["attr"]);
    let grammar = Language::new("test", Mode::new().contains([tag])).define(
        "attr",
        Mode::new()
            .scope("attr")
            .begin("\\w+=")
            .ends_with_parent()
            .contains(["attr"]),
    );
    let compiled = compile_language("test", &grammar).unwrap();

    let tag = compiled.root_mode().contains[0];
    let attr = compiled.mode(tag).contains[0];
    assert_eq!(compiled.mode(attr).contains, vec![attr]);
    assert_eq!(compiled.mode(attr).terminator_end, ">");
    assert_eq!(compiled.modes().len(), 3);
    assert!(compiled.get_mode(attr).is_some());
    assert!(compiled.get_mode(compiled.modes().len()).is_none());
}

#[test]
fn test_self_containing_mode_with_growing_terminator_is_rejected() {
    let tag = Mode::new().begin("<").end(">").contains(["attr"]);
    let grammar = Language::new("test", Mode::new().contains([tag])).define(
        "attr",
        Mode::new()
            .scope("attr")
            .begin("\\w+=")
            .end("\\s")
            .ends_with_parent()
            .contains(["attr"]),
    );
    let error = compile_language("test", &grammar).unwrap_err();

    assert_eq!(error.get_error_name(), "ModeNestingTooDeep");
    assert!(error.is_configuration());
}

#[test]
fn test_begin_keywords() {
    let mode = Mode::new().scope("class").begin_keywords("class struct").end("\\{");
    let compiled = compile_language("test", &language(Mode::new().contains([mode]))).unwrap();

    let class = compiled.mode(1);
    assert_eq!(class.begin, "\\b(class|struct)(?!\\.)(?=\\b|\\s)");
    assert_eq!(class.relevance, 0);
    assert!(class.skip_if_preceded_by_dot);
    let keywords = class.keywords.as_ref().unwrap();
    assert_eq!(keywords.table.get("struct").unwrap().scope, "keyword");
    assert_eq!(keywords.pattern, "\\w+");
}

#[test]
fn test_begin_keywords_keeps_explicit_relevance() {
    let mode = Mode::new().begin_keywords("def").relevance(4);
    let compiled = compile_language("test", &language(Mode::new().contains([mode]))).unwrap();

    assert_eq!(compiled.mode(1).relevance, 4);
}

#[test]
fn test_before_match_wraps_mode() {
    let mode = Mode::new().scope("title").begin("\\w+").before_match("\\.\\s*");
    let compiled = compile_language("test", &language(Mode::new().contains([mode]))).unwrap();

    let wrapper = compiled.mode(1);
    assert!(wrapper.scope.is_none());
    assert_eq!(wrapper.begin, "\\.\\s*(?=\\w+)");
    assert_eq!(wrapper.relevance, 0);

    let starts = compiled.mode(wrapper.starts.unwrap());
    let original = compiled.mode(starts.contains[0]);
    assert_eq!(original.scope.as_deref(), Some("title"));
    assert!(original.ends_parent);
}

#[test]
fn test_before_match_with_starts_is_rejected() {
    let mode = Mode::new()
        .begin("a")
        .before_match("b")
        .starts(Mode::new().end("c"));
    let error = compile_language("test", &language(Mode::new().contains([mode]))).unwrap_err();

    assert_eq!(error.get_error_name(), "BeforeMatchWithStarts");
}

#[test]
fn test_illegal_list_becomes_alternation() {
    let grammar = language(Mode::new().illegal(vec!["<", ">"]));
    let compiled = compile_language("test", &grammar).unwrap();

    assert_eq!(compiled.root_mode().illegal.as_deref(), Some("(?:<|>)"));
    assert_eq!(
        compiled.root_mode().matcher().kinds().collect::<Vec<_>>(),
        vec![RuleKind::Illegal]
    );
}

#[test]
fn test_invalid_pattern_is_reported() {
    let grammar = language(Mode::new().contains([Mode::new().begin("(unclosed")]));
    let error = compile_language("test", &grammar).unwrap_err();

    assert_eq!(error.get_error_name(), "InvalidPattern");
    assert_eq!(&*error.get_position().1, "test");
}

#[test]
fn test_compiler_extensions_run_with_parent() {
    let grammar = language(Mode::new().scope("root").contains([Mode::new().begin("x")]))
        .compiler_extension(|mode, parent| {
            if parent.is_some() {
                mode.relevance = Some(9);
            }
        });
    let compiled = compile_language("test", &grammar).unwrap();

    assert_eq!(compiled.root_mode().relevance, 1);
    assert_eq!(compiled.mode(1).relevance, 9);
}

#[test]
fn test_matcher_rule_order() {
    let grammar = language(
        Mode::new().contains([Mode::new().begin("a").end("b").illegal("!").contains([
            Mode::new().begin("c"),
        ])]),
    );
    let compiled = compile_language("test", &grammar).unwrap();

    let kinds = compiled.mode(1).matcher().kinds().collect::<Vec<_>>();
    assert_eq!(kinds, vec![RuleKind::Begin(2), RuleKind::End, RuleKind::Illegal]);
}

#[test]
fn test_matcher_reports_rule_groups() {
    let matcher = RuleMatcher::new(
        vec![
            (RuleKind::Begin(1), "a".to_string()),
            (RuleKind::Begin(2), "(b)\\1".to_string()),
            (RuleKind::End, "c".to_string()),
        ],
        false,
    )
    .unwrap();
    let mut regex_index = 0;

    let found = matcher.exec("xxbb", 0, &mut regex_index).unwrap().unwrap();

    assert_eq!(found.kind, RuleKind::Begin(2));
    assert_eq!(found.rule, 1);
    assert_eq!((found.start, found.end), (2, 4));
    assert_eq!(found.groups, vec![Some((2, 4)), Some((2, 3))]);
    assert_eq!(regex_index, 2);
}

#[test]
fn test_matcher_resumes_after_rejected_rule() {
    let matcher = RuleMatcher::new(
        vec![
            (RuleKind::Begin(1), "a".to_string()),
            (RuleKind::Begin(2), "a+".to_string()),
        ],
        false,
    )
    .unwrap();

    let mut regex_index = 0;
    let first = matcher.exec("aa", 0, &mut regex_index).unwrap().unwrap();
    assert_eq!(first.kind, RuleKind::Begin(1));
    assert_eq!(regex_index, 1);

    let second = matcher.exec("aa", 0, &mut regex_index).unwrap().unwrap();
    assert_eq!(second.kind, RuleKind::Begin(2));
    assert_eq!((second.start, second.end), (0, 2));
    assert_eq!(regex_index, 0);
}

#[test]
fn test_matcher_falls_back_when_narrowed_search_moves_on() {
    let matcher = RuleMatcher::new(
        vec![
            (RuleKind::Begin(1), "x".to_string()),
            (RuleKind::Begin(2), "y".to_string()),
        ],
        false,
    )
    .unwrap();

    let mut regex_index = 1;
    let found = matcher.exec("xxy", 0, &mut regex_index).unwrap().unwrap();

    assert_eq!(found.kind, RuleKind::Begin(1));
    assert_eq!(found.start, 1);
    assert_eq!(regex_index, 1);
}

#[test]
fn test_empty_matcher_never_matches() {
    let matcher = RuleMatcher::new(vec![], false).unwrap();
    let mut regex_index = 0;

    assert!(matcher.is_empty());
    assert!(matcher.exec("anything", 0, &mut regex_index).unwrap().is_none());
}

#[test]
fn test_case_insensitive_language_matcher() {
    let grammar = language(Mode::new().contains([Mode::new().scope("kw").begin("select")]))
        .case_insensitive();
    let compiled = compile_language("test", &grammar).unwrap();
    let mut regex_index = 0;

    let found = compiled
        .root_mode()
        .matcher()
        .exec("SeLeCt 1", 0, &mut regex_index)
        .unwrap();
    assert!(found.is_some());
}
