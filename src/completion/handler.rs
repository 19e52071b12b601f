/// Completion request orchestration.
///
/// One request runs the whole pipeline: load the document (repairing it
/// as needed), classify the cursor position, collect candidates.  The
/// language server runs this on the blocking pool under a deadline, since
/// a pathological document can take many repair rounds.
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;

use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::*;
use tracing::{debug, error, warn};

use crate::Backend;
use crate::catalog::Catalogs;
use crate::completion::builder::{collect_candidates, completion_items, pattern};
use crate::completion::context::classify;
use crate::parser::{self, Document, LoadError};
use crate::types::{Candidate, CompletionContext, Cursor};
use crate::util::{cursor_from_position, default_cursor};

/// A completion request against a piece of playbook text.
#[derive(Debug, Clone, Default)]
pub struct CompletionRequest {
    pub source: String,
    /// Defaults to the end of the text.
    pub cursor: Option<Cursor>,
    /// Name of the document, for diagnostics only.
    pub label: Option<String>,
}

impl CompletionRequest {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            ..Self::default()
        }
    }

    pub fn at(mut self, line: usize, column: usize) -> Self {
        self.cursor = Some(Cursor::new(line, column));
        self
    }

    pub fn labelled(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor.unwrap_or_else(|| default_cursor(&self.source))
    }
}

/// Result of running the pipeline once.
#[derive(Debug, Clone)]
pub struct Completion {
    pub document: Document,
    pub context: CompletionContext,
    pub candidates: BTreeSet<Candidate>,
}

/// Run the full pipeline for one request.
///
/// Repairs stop once `deadline` has passed, so the call always returns.
pub fn run_completion(
    catalogs: &Catalogs,
    source: &str,
    cursor: Cursor,
    max_heal_attempts: usize,
    deadline: Option<Instant>,
) -> std::result::Result<Completion, LoadError> {
    let document = parser::load_until(source, cursor, max_heal_attempts, deadline)?;
    let context = classify(&document.trail, &catalogs.directives, &catalogs.modules);
    let candidates = collect_candidates(&context, catalogs, pattern(&document.trail));
    Ok(Completion {
        document,
        context,
        candidates,
    })
}

impl Backend {
    /// Candidates for a request, in their canonical order.
    pub fn complete(&self, request: &CompletionRequest) -> std::result::Result<Vec<Candidate>, LoadError> {
        Ok(self.run(request)?.candidates.into_iter().collect())
    }

    /// Load the document of a request, repairing it as needed.
    pub fn load_document(&self, request: &CompletionRequest) -> std::result::Result<Document, LoadError> {
        parser::load(&request.source, request.cursor(), self.max_heal_attempts)
    }

    /// Classify the cursor position of a request.
    pub fn classify(&self, request: &CompletionRequest) -> std::result::Result<CompletionContext, LoadError> {
        Ok(self.run(request)?.context)
    }

    fn run(&self, request: &CompletionRequest) -> std::result::Result<Completion, LoadError> {
        let cursor = request.cursor();
        let result = run_completion(
            &self.catalogs,
            &request.source,
            cursor,
            self.max_heal_attempts,
            None,
        );
        if let Err(err) = &result {
            debug!(
                label = request.label.as_deref().unwrap_or("<string>"),
                line = cursor.line,
                column = cursor.column,
                error = %err,
                "Completion failed"
            );
        }
        result
    }

    /// Main completion handler, called by `LanguageServer::completion`.
    ///
    /// Any failure (unrepairable syntax, deadline, panicked worker) is
    /// logged and answered with no items.
    pub(crate) async fn handle_completion(
        &self,
        params: CompletionParams,
    ) -> Result<Option<CompletionResponse>> {
        let uri = params.text_document_position.text_document.uri.to_string();
        let position = params.text_document_position.position;

        let Some(content) = self.open_files.lock().get(&uri).cloned() else {
            return Ok(None);
        };
        let cursor = cursor_from_position(&content, position);

        let catalogs = Arc::clone(&self.catalogs);
        let max_heal_attempts = self.max_heal_attempts;
        // The worker gets the same deadline as the request, so it never
        // outlives an abandoned request by more than one parse.
        let deadline = Instant::now() + self.completion_timeout;
        let work = tokio::task::spawn_blocking(move || {
            run_completion(&catalogs, &content, cursor, max_heal_attempts, Some(deadline))
        });

        let candidates = match tokio::time::timeout(self.completion_timeout, work).await {
            Ok(Ok(Ok(completion))) => completion.candidates,
            Ok(Ok(Err(err))) => {
                debug!(uri = %uri, error = %err, "No completion possible");
                self.log(MessageType::LOG, format!("{}: {}", uri, err)).await;
                return Ok(None);
            }
            Ok(Err(join_error)) => {
                error!(uri = %uri, error = %join_error, "Completion worker failed");
                return Ok(None);
            }
            Err(_) => {
                warn!(
                    uri = %uri,
                    timeout_ms = self.completion_timeout.as_millis() as u64,
                    "Completion timed out"
                );
                return Ok(None);
            }
        };

        if candidates.is_empty() {
            return Ok(None);
        }
        Ok(Some(CompletionResponse::Array(completion_items(&candidates))))
    }
}
