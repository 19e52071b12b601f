use playbook_lsp::parser::{self, LoadError, Stage};
use playbook_lsp::types::{Cursor, Key, Value};
use playbook_lsp::util::default_cursor;

fn load(source: &str) -> Result<playbook_lsp::Document, LoadError> {
    parser::load(source, default_cursor(source), 64)
}

fn load_at(source: &str, line: usize, column: usize) -> playbook_lsp::Document {
    parser::load(source, Cursor::new(line, column), 64).expect("document should load")
}

fn map(pairs: &[(&str, Value)]) -> Value {
    Value::Map(
        pairs
            .iter()
            .map(|(k, v)| (Key::from(*k), v.clone()))
            .collect(),
    )
}

// ─── Healing ────────────────────────────────────────────────────────────────

#[test]
fn test_colon_absence() {
    let document = load("---\n- name: name\n  hosts\n").unwrap();
    assert_eq!(
        document.root,
        Value::Seq(vec![map(&[
            ("name", Value::from("name")),
            ("hosts", Value::Null)
        ])])
    );
}

#[test]
fn test_unquoted() {
    let document = load("---\n- name: \"hoge\n    fuga\n").unwrap();
    assert_eq!(
        document.root,
        Value::Seq(vec![map(&[("name", Value::from("hoge fuga"))])])
    );
}

#[test]
fn test_unquoted_single() {
    let document = load("---\n- name: 'hoge\n").unwrap();
    assert_eq!(
        document.root,
        Value::Seq(vec![map(&[("name", Value::from("hoge"))])])
    );
}

#[test]
fn test_unallowed_map() {
    let document = load("---\n- name\n  hosts: all\n").unwrap();
    assert_eq!(
        document.root,
        Value::Seq(vec![map(&[
            ("name", Value::Null),
            ("hosts", Value::from("all"))
        ])])
    );
}

#[test]
fn test_unallowed_map_with_repeated_key() {
    let document = load("- hosts\n  hosts: all\n").unwrap();
    assert_eq!(
        document.root,
        Value::Seq(vec![map(&[("hosts", Value::from("all"))])])
    );
}

#[test]
fn test_unhandled_error() {
    let err = load("---\n- hosts\nhoge\n").unwrap_err();
    assert!(
        matches!(err, LoadError::Syntax(_)),
        "dedent should surface the raw diagnostic, got {err:?}"
    );
    assert_eq!(err.syntax().stage, Stage::Parser);
}

#[test]
fn test_blank_list() {
    let document = load("---\n- hosts\n- ").unwrap();
    assert_eq!(
        document.trail,
        vec![
            Value::Seq(vec![Value::from("hosts"), Value::Null]),
            Value::Null
        ]
    );
}

#[test]
fn test_heal_limit_reports_last_error() {
    let source = "---\n- a: b\n  k0\n  k1\n  k2\n  k3\n";
    let err = parser::load(source, default_cursor(source), 2).unwrap_err();
    let LoadError::HealLimitExceeded { attempts, last } = err else {
        panic!("expected the repair limit to trip");
    };
    assert_eq!(attempts, 2);
    assert_eq!(last.stage, Stage::Scanner);
}

// ─── Trail ──────────────────────────────────────────────────────────────────

#[test]
fn test_trail_records_key_before_value() {
    let document = load_at("---\n- name: play\n  hosts: all\n", 2, 10);
    assert_eq!(document.trail.len(), 4);
    assert!(matches!(document.trail[0], Value::Seq(_)));
    assert!(matches!(document.trail[1], Value::Map(_)));
    assert_eq!(document.trail[2], Value::from("hosts"));
    assert_eq!(document.trail[3], Value::from("all"));
}

#[test]
fn test_trail_keeps_raw_scalar_text() {
    let document = load_at("---\n- retries: 3\n", 1, 12);
    assert_eq!(document.root, Value::Seq(vec![map(&[("retries", Value::Int(3))])]));
    assert_eq!(document.trail.last(), Some(&Value::from("3")));
}

#[test]
fn test_trail_is_empty_outside_the_document() {
    let document = load_at("---\n- hosts: all\n", 20, 0);
    assert!(document.trail.is_empty());
}

#[test]
fn test_empty_document_is_null() {
    let document = load("").unwrap();
    assert_eq!(document.root, Value::Null);
    assert!(document.trail.is_empty());
}

// ─── Construction ───────────────────────────────────────────────────────────

#[test]
fn test_scalar_resolution() {
    let document = load(
        "---\nflag: yes\ncount: 0x10\nratio: 1.5\nnothing: ~\nword: hello\nquoted: \"true\"\n",
    )
    .unwrap();
    assert_eq!(
        document.root,
        map(&[
            ("flag", Value::Bool(true)),
            ("count", Value::Int(16)),
            ("ratio", Value::Float(1.5)),
            ("nothing", Value::Null),
            ("word", Value::from("hello")),
            ("quoted", Value::from("true")),
        ])
    );
}

#[test]
fn test_playbook_tags_are_strings() {
    let document = load("---\npassword: !vault secret\nraw: !unsafe '{{ x }}'\n").unwrap();
    assert_eq!(
        document.root,
        map(&[
            ("password", Value::from("secret")),
            ("raw", Value::from("{{ x }}")),
        ])
    );
}

#[test]
fn test_unknown_tag_is_fatal() {
    let err = load("---\nvalue: !custom thing\n").unwrap_err();
    assert_eq!(err.syntax().stage, Stage::Constructor);
    assert_eq!(
        err.syntax().problem,
        "could not determine a constructor for the tag '!custom'"
    );
}

#[test]
fn test_anchors_and_merge_keys() {
    let source = "---\nbase: &base\n  become: true\n  user: root\ntask:\n  <<: *base\n  user: admin\n";
    let document = load(source).unwrap();
    assert_eq!(
        document.root.as_map().and_then(|m| m.get(&Key::from("task"))),
        Some(&map(&[
            ("become", Value::Bool(true)),
            ("user", Value::from("admin")),
        ]))
    );
}

#[test]
fn test_flow_collections() {
    let document = load("---\n- {name: a, tags: [one, two]}\n").unwrap();
    assert_eq!(
        document.root,
        Value::Seq(vec![map(&[
            ("name", Value::from("a")),
            (
                "tags",
                Value::Seq(vec![Value::from("one"), Value::from("two")])
            ),
        ])])
    );
}

#[test]
fn test_unhashable_key_is_fatal() {
    let err = load("---\n? [a, b]\n: value\n").unwrap_err();
    let syntax = err.syntax();
    assert_eq!(syntax.stage, Stage::Constructor);
    assert_eq!(syntax.context.as_deref(), Some("while constructing a mapping"));
    assert_eq!(
        syntax.problem,
        "found unacceptable key (unhashable type: 'list')"
    );
}

#[test]
fn test_second_document_is_fatal() {
    let err = load("---\n- a\n---\n- b\n").unwrap_err();
    assert_eq!(err.syntax().stage, Stage::Composer);
}
