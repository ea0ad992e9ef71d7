//! Integration tests for rule-set files
//!
//! Loading, validation errors, and evaluation against snapshots.

use node_locator::config::{load_from_path, load_from_str, ConfigError, Mode, RuleSet};
use node_locator::tree::load_snapshot_str;
use std::fs;
use tempfile::TempDir;

const PAGE: &str = r#"{
    "root": { "tag": "html", "children": [
        { "tag": "body", "children": [
            { "tag": "div", "attributes": { "id": "sidebar" }, "children": [
                { "tag": "iframe", "attributes": { "class": "ad" },
                  "frame": { "root": { "tag": "html", "children": [
                      { "tag": "body", "children": [
                          { "tag": "div", "attributes": { "class": "ad" } }
                      ] }
                  ] } } }
            ] },
            { "tag": "div", "attributes": { "class": "ad" }, "children": [
                { "tag": "div", "attributes": { "class": "ad" } }
            ] }
        ] }
    ] }
}"#;

const RULES: &str = r#"
[meta]
name = "ad-slots"
description = "Known ad containers"

[[rules]]
name = "sidebar-frames"
predicates = [
    { property = "ppid", value = "sidebar" },
    { property = "tag", value = "iframe" },
]

[[rules]]
name = "ad-boxes"
rule = "cl=ad;tag=div"
mode = "all"

[[rules]]
name = "ad-roots"
rule = "cl=ad"
mode = "roots"
"#;

#[test]
fn load_and_run_rule_set() {
    let config = load_from_str(RULES).unwrap();
    assert_eq!(config.meta.name, "ad-slots");
    assert_eq!(config.meta.description.as_deref(), Some("Known ad containers"));
    assert!(!config.meta.include_frames);
    assert_eq!(config.rules[0].mode, Mode::First);

    let rule_set = RuleSet::compile(&config).unwrap();
    assert_eq!(rule_set.len(), 3);
    assert_eq!(rule_set.rules()[0].rule.encode(), "ppid=sidebar;tag=iframe");

    let (tree, doc) = load_snapshot_str(PAGE).unwrap();
    let outcomes = rule_set.run(&tree, doc);
    let names: Vec<_> = outcomes.iter().map(|o| o.name.as_str()).collect();
    assert_eq!(names, vec!["sidebar-frames", "ad-boxes", "ad-roots"]);

    let frames: Vec<_> = outcomes[0].nodes.iter().map(|n| tree.describe(*n)).collect();
    assert_eq!(frames, vec!["iframe.ad"]);

    let boxes: Vec<_> = outcomes[1].nodes.iter().map(|n| tree.path(*n)).collect();
    assert_eq!(boxes, vec!["html > body > div.ad", "html > body > div.ad > div.ad"]);

    let roots: Vec<_> = outcomes[2].nodes.iter().map(|n| tree.describe(*n)).collect();
    assert_eq!(roots, vec!["iframe.ad", "div.ad"]);
}

#[test]
fn include_frames_searches_nested_documents() {
    let text = RULES.replace(
        "description = \"Known ad containers\"",
        "description = \"Known ad containers\"\ninclude_frames = true",
    );
    let rule_set = RuleSet::compile(&load_from_str(&text).unwrap()).unwrap();
    let (tree, doc) = load_snapshot_str(PAGE).unwrap();
    let outcomes = rule_set.run(&tree, doc);

    let boxes: Vec<_> = outcomes[1].nodes.iter().map(|n| tree.path(*n)).collect();
    assert_eq!(
        boxes,
        vec![
            "html > body > div.ad",
            "html > body > div.ad > div.ad",
            "html > body > div#sidebar > iframe.ad | html > body > div.ad",
        ]
    );
}

#[test]
fn validation_reports_every_issue() {
    let err = load_from_str(
        r#"
[[rules]]
name = "dup"
rule = "id=a"

[[rules]]
name = "dup"
rule = "not a rule"

[[rules]]
rule = "id=b"
"#,
    )
    .unwrap_err();

    match &err {
        ConfigError::Validation { path, source } => {
            assert!(path.is_none());
            assert_eq!(source.issues.len(), 3);
        }
        other => panic!("expected validation error, got {other:?}"),
    }
    let message = err.to_string();
    assert!(message.contains("rule name 'dup' is used more than once"));
    assert!(message.contains("rule 'dup' does not compile"));
    assert!(message.contains("missing required field 'name'"));
}

#[test]
fn empty_rule_set_is_rejected() {
    let err = load_from_str("[meta]\nname = \"nothing\"\n").unwrap_err();
    assert!(err.to_string().contains("rule set contains no rules"));
}

#[test]
fn invalid_predicate_property_is_reported() {
    let err = load_from_str(
        r#"
[[rules]]
name = "broken"
predicates = [{ property = "", value = "x" }]
"#,
    )
    .unwrap_err();
    assert!(err
        .to_string()
        .contains("invalid property passed to Identifier"));
}

#[test]
fn unknown_mode_is_a_toml_error() {
    let err = load_from_str(
        r#"
[[rules]]
name = "x"
rule = "id=x"
mode = "sometimes"
"#,
    )
    .unwrap_err();
    assert!(matches!(err, ConfigError::Toml { path: None, .. }));
}

#[test]
fn errors_from_files_carry_the_path() {
    let dir = TempDir::new().unwrap();
    let bad = dir.path().join("bad.toml");
    fs::write(&bad, "[[rules]]\nname = \"x\"\n").unwrap();

    let err = load_from_path(&bad).unwrap_err();
    assert!(matches!(&err, ConfigError::Validation { path: Some(p), .. } if p == &bad));
    assert!(err.to_string().contains("bad.toml"));

    let missing = dir.path().join("missing.toml");
    let err = load_from_path(&missing).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
}

#[test]
fn loads_from_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("rules.toml");
    fs::write(&path, RULES).unwrap();
    let config = load_from_path(&path).unwrap();
    assert_eq!(config.rules.len(), 3);
}
