#![allow(dead_code)]

use std::fs;

use playbook_lsp::catalog::{DirectiveCatalog, ModuleCatalog, StaticParameters};
use playbook_lsp::{Backend, Catalogs, CompletionContext, CompletionRequest};
use tower_lsp::LanguageServer;
use tower_lsp::lsp_types::*;

/// Modules every test backend knows about.
pub const MODULES: &[&str] = &[
    "add_host",
    "command",
    "copy",
    "debug",
    "shell",
    "win_command",
    "win_shell",
    "yum",
];

pub fn test_catalogs() -> Catalogs {
    Catalogs::new(
        DirectiveCatalog::builtin().expect("built-in directive table should parse"),
        ModuleCatalog::from_names(MODULES.iter().copied()),
        StaticParameters::new([
            ("yum", vec!["name", "state", "enablerepo", "security"]),
            ("command", vec!["chdir", "creates", "removes", "free_form"]),
            ("debug", vec!["msg", "var", "verbosity"]),
        ]),
    )
}

pub fn create_test_backend() -> Backend {
    Backend::new_test_with_catalogs(test_catalogs())
}

/// Names of the enabled context flags, sorted, with `module_arg` shown as
/// `module_arg=<name>`.
pub fn enabled(context: &CompletionContext) -> Vec<String> {
    let mut flags = Vec::new();
    for (name, on) in [
        ("block", context.block),
        ("module", context.module),
        ("play", context.play),
        ("role", context.role),
        ("task", context.task),
    ] {
        if on {
            flags.push(name.to_string());
        }
    }
    if let Some(module) = &context.module_arg {
        flags.push(format!("module_arg={}", module.name));
    }
    flags
}

/// Classify a position, panicking on load failure.
pub fn classify_at(source: &str, line: usize, column: usize) -> CompletionContext {
    create_test_backend()
        .classify(&CompletionRequest::new(source).at(line, column))
        .expect("document should load")
}

/// Open `text` as `uri` and request completion at `line`/`character`.
pub async fn complete_lsp(
    backend: &Backend,
    uri: &str,
    text: &str,
    line: u32,
    character: u32,
) -> Option<CompletionResponse> {
    let uri = Url::parse(uri).unwrap();
    backend
        .did_open(DidOpenTextDocumentParams {
            text_document: TextDocumentItem {
                uri: uri.clone(),
                language_id: "yaml".to_string(),
                version: 1,
                text: text.to_string(),
            },
        })
        .await;

    backend
        .completion(CompletionParams {
            text_document_position: TextDocumentPositionParams {
                text_document: TextDocumentIdentifier { uri },
                position: Position { line, character },
            },
            work_done_progress_params: WorkDoneProgressParams::default(),
            partial_result_params: PartialResultParams::default(),
            context: None,
        })
        .await
        .unwrap()
}

pub fn labels(response: Option<CompletionResponse>) -> Vec<String> {
    match response {
        Some(CompletionResponse::Array(items)) => items.into_iter().map(|i| i.label).collect(),
        Some(CompletionResponse::List(list)) => list.items.into_iter().map(|i| i.label).collect(),
        None => Vec::new(),
    }
}

/// Create a temp module directory containing `files` (relative path,
/// content).
pub fn create_module_dir(files: &[(&str, &str)]) -> tempfile::TempDir {
    // Temp dirs default to a hidden `.tmp` prefix, which the scan would skip.
    let dir = tempfile::Builder::new()
        .prefix("modules")
        .tempdir()
        .expect("failed to create temp dir");
    for (rel_path, content) in files {
        let full = dir.path().join(rel_path);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).expect("failed to create dirs");
        }
        fs::write(&full, content).expect("failed to write module file");
    }
    dir
}
