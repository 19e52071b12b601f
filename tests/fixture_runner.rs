//! Runs every `tests/fixtures/*.yml` playbook through the completion
//! pipeline.
//!
//! A fixture opens with `# key: value` header lines, followed by the
//! playbook itself with the cursor marked by `<|>` (end of text when
//! absent):
//!
//! ```text
//! # expect: module,task
//! # include: shell, register
//! # exclude: hosts
//! ---
//! - block:
//!     -<|>
//! ```
//!
//! - `expect`: the enabled context flags, `module_arg=<name>` included
//! - `include` / `exclude`: candidate names that must / must not be offered
//! - `error`: the load must fail with a message containing this text

mod common;

use std::path::Path;

use playbook_lsp::CompletionRequest;

const CURSOR_MARKER: &str = "<|>";

#[derive(Debug, Default)]
struct Fixture {
    expect: Option<Vec<String>>,
    include: Vec<String>,
    exclude: Vec<String>,
    error: Option<String>,
    source: String,
    cursor: Option<(usize, usize)>,
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_fixture(text: &str) -> Result<Fixture, String> {
    let mut fixture = Fixture::default();
    let mut lines = text.lines().peekable();

    while let Some(line) = lines.peek() {
        let Some((key, value)) = line.strip_prefix("# ").and_then(|l| l.split_once(':')) else {
            break;
        };
        match key.trim() {
            "expect" => fixture.expect = Some(split_list(value)),
            "include" => fixture.include = split_list(value),
            "exclude" => fixture.exclude = split_list(value),
            "error" => fixture.error = Some(value.trim().to_string()),
            _ => break,
        }
        lines.next();
    }

    let body: Vec<&str> = lines.collect();
    let mut source = String::new();
    for (i, line) in body.iter().enumerate() {
        let line = match line.find(CURSOR_MARKER) {
            Some(byte) => {
                if fixture.cursor.is_some() {
                    return Err("more than one cursor marker".to_string());
                }
                fixture.cursor = Some((i, line[..byte].chars().count()));
                line.replacen(CURSOR_MARKER, "", 1)
            }
            None => line.to_string(),
        };
        source.push_str(&line);
        source.push('\n');
    }
    fixture.source = source;
    Ok(fixture)
}

fn run_fixture(path: &Path) -> datatest_stable::Result<()> {
    let text = std::fs::read_to_string(path)?;
    let fixture = parse_fixture(&text)?;
    let backend = common::create_test_backend();

    let mut request = CompletionRequest::new(fixture.source.clone())
        .labelled(path.display().to_string());
    if let Some((line, column)) = fixture.cursor {
        request = request.at(line, column);
    }

    if let Some(expected) = &fixture.error {
        return match backend.complete(&request) {
            Ok(candidates) => Err(format!("expected an error, got {:?}", candidates).into()),
            Err(err) if err.to_string().contains(expected.as_str()) => Ok(()),
            Err(err) => Err(format!("expected an error containing {expected:?}, got:\n{err}").into()),
        };
    }

    if let Some(expected) = &fixture.expect {
        let context = backend.classify(&request)?;
        let mut expected = expected.clone();
        expected.sort();
        let actual = common::enabled(&context);
        if actual != expected {
            return Err(format!("context: expected {expected:?}, got {actual:?}").into());
        }
    }

    let candidates = backend.complete(&request)?;
    let names: Vec<&str> = candidates.iter().map(|c| c.name()).collect();
    for name in &fixture.include {
        if !names.contains(&name.as_str()) {
            return Err(format!("{name} missing from {names:?}").into());
        }
    }
    for name in &fixture.exclude {
        if names.contains(&name.as_str()) {
            return Err(format!("{name} should not be offered, got {names:?}").into());
        }
    }
    Ok(())
}

datatest_stable::harness! {
    { test = run_fixture, root = "tests/fixtures", pattern = r"\.yml$" },
}
