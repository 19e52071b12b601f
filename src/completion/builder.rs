/// Candidate collection and completion item building.
///
/// Each enabled flag of a [`CompletionContext`] maps to one catalog query
/// through [`CompletionKind`].  The results are filtered by the text being
/// typed at the cursor and merged into one ordered set, to which the
/// parameters of the resolved module are added.
use std::collections::BTreeSet;

use tower_lsp::lsp_types::*;
use tracing::warn;

use crate::catalog::Catalogs;
use crate::types::{Candidate, CompletionContext, EntityKind, Value};

/// One kind of completion, one per context flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionKind {
    Play,
    Task,
    Block,
    Role,
    Module,
}

impl CompletionKind {
    pub const ALL: [CompletionKind; 5] = [
        CompletionKind::Play,
        CompletionKind::Task,
        CompletionKind::Block,
        CompletionKind::Role,
        CompletionKind::Module,
    ];

    pub fn is_enabled(self, context: &CompletionContext) -> bool {
        match self {
            CompletionKind::Play => context.play,
            CompletionKind::Task => context.task,
            CompletionKind::Block => context.block,
            CompletionKind::Role => context.role,
            CompletionKind::Module => context.module,
        }
    }

    /// Catalog entries of this kind whose name contains `pattern`.
    pub fn query(self, catalogs: &Catalogs, pattern: &str) -> Vec<Candidate> {
        let directives = |kind: EntityKind| -> Vec<Candidate> {
            catalogs
                .directives
                .for_kind(kind)
                .filter(|d| d.name.contains(pattern))
                .cloned()
                .map(Candidate::Directive)
                .collect()
        };
        match self {
            CompletionKind::Play => directives(EntityKind::Play),
            CompletionKind::Task => directives(EntityKind::Task),
            CompletionKind::Block => directives(EntityKind::Block),
            CompletionKind::Role => directives(EntityKind::Role),
            CompletionKind::Module => catalogs
                .modules
                .iter()
                .filter(|m| m.name.contains(pattern))
                .cloned()
                .map(Candidate::Module)
                .collect(),
        }
    }
}

/// The text being typed at the cursor: the last trail entry if it is a
/// string, otherwise nothing.
pub fn pattern(trail: &[Value]) -> &str {
    trail.last().and_then(Value::as_str).unwrap_or("")
}

/// Everything worth offering for `context`.
pub fn collect_candidates(
    context: &CompletionContext,
    catalogs: &Catalogs,
    pattern: &str,
) -> BTreeSet<Candidate> {
    let mut candidates: BTreeSet<Candidate> = CompletionKind::ALL
        .into_iter()
        .filter(|kind| kind.is_enabled(context))
        .flat_map(|kind| kind.query(catalogs, pattern))
        .collect();

    if let Some(module) = &context.module_arg {
        match catalogs.parameters.parameters(module) {
            Ok(Some(names)) => {
                candidates.extend(names.iter().filter(|n| n.contains(pattern)).map(|name| {
                    Candidate::Parameter {
                        module: module.name.clone(),
                        name: name.clone(),
                    }
                }));
            }
            Ok(None) => {}
            Err(err) => warn!(module = %module.name, error = %err, "Failed to load module parameters"),
        }
    }

    candidates
}

/// Build the LSP item for a candidate.  `index` keeps the editor in the
/// order of the candidate set.
pub fn completion_item(candidate: &Candidate, index: usize) -> CompletionItem {
    let (kind, detail) = match candidate {
        Candidate::Directive(directive) => {
            let kinds: Vec<String> = directive.kinds.iter().map(ToString::to_string).collect();
            (CompletionItemKind::KEYWORD, format!("directive ({})", kinds.join(", ")))
        }
        Candidate::Module(module) => {
            let detail = match &module.path {
                Some(path) => format!("module ({})", path.display()),
                None => "module".to_string(),
            };
            (CompletionItemKind::MODULE, detail)
        }
        Candidate::Parameter { module, .. } => {
            (CompletionItemKind::FIELD, format!("{} parameter", module))
        }
    };

    CompletionItem {
        label: candidate.name().to_string(),
        kind: Some(kind),
        detail: Some(detail),
        insert_text: Some(candidate.name().to_string()),
        filter_text: Some(candidate.name().to_string()),
        sort_text: Some(format!("{:04}", index)),
        ..CompletionItem::default()
    }
}

pub fn completion_items(candidates: &BTreeSet<Candidate>) -> Vec<CompletionItem> {
    candidates
        .iter()
        .enumerate()
        .map(|(i, candidate)| completion_item(candidate, i))
        .collect()
}
