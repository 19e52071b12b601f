//! Repairing the text of a playbook that is still being typed.
//!
//! A handful of scanner failures are typical of half-written input: a key
//! whose `:` has not been typed yet, an open quote, a key written below a
//! bare list item.  For these the loader inserts a single character and
//! parses the whole text again.  Every other failure is returned unchanged.

use std::time::Instant;

use tracing::debug;

use super::error::{LoadError, Stage, SyntaxError};
use super::{Document, parse_document};
use crate::types::Cursor;

const MISSING_COLON: &str = "could not find expected ':'";
const QUOTED_SCALAR: &str = "while scanning a quoted scalar";
const UNEXPECTED_END: &str = "found unexpected end of stream";
const MAPPING_VALUES: [&str; 2] = [
    "mapping values are not allowed here",
    "mapping values are not allowed in this context",
];

/// A one-character insertion, positioned in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Patch {
    pub index: usize,
    pub insert: char,
}

impl Patch {
    /// Work out the patch for a failure, or `None` if it is not one we know
    /// how to repair.
    pub fn for_error(text: &str, err: &SyntaxError) -> Option<Patch> {
        if err.stage != Stage::Scanner {
            return None;
        }
        let chars: Vec<char> = text.chars().collect();
        let pi = err.problem_mark.index.min(chars.len());
        let ci = err.context_mark.map_or(0, |m| m.index).min(chars.len());

        if err.problem.contains(MISSING_COLON) {
            let window = chars.get(ci..pi).unwrap_or_default();
            let index = window
                .iter()
                .position(|c| c.is_whitespace())
                .map_or(pi, |offset| ci + offset);
            return Some(Patch { index, insert: ':' });
        }

        if err.context.as_deref() == Some(QUOTED_SCALAR) && err.problem == UNEXPECTED_END {
            let quote = *chars.get(ci)?;
            // End of the last line, before its line break if it has one.
            let index = if pi > ci && chars[pi - 1] == '\n' {
                pi - 1
            } else {
                pi
            };
            return Some(Patch {
                index,
                insert: quote,
            });
        }

        if MAPPING_VALUES.contains(&err.problem.as_str()) {
            let line_start = match err.problem_mark.line {
                0 => 0,
                line => line_offset(&chars, line - 1),
            };
            let end = pi.max(line_start);
            let index = chars[line_start..end]
                .iter()
                .position(|&c| c == '\n')
                .map_or(end, |offset| line_start + offset);
            return Some(Patch { index, insert: ':' });
        }

        None
    }

    pub fn apply(&self, text: &mut String) {
        let byte = text
            .char_indices()
            .nth(self.index)
            .map_or(text.len(), |(b, _)| b);
        text.insert(byte, self.insert);
    }
}

/// Character offset at which `line` (0-based) starts.
fn line_offset(chars: &[char], line: usize) -> usize {
    if line == 0 {
        return 0;
    }
    let mut seen = 0;
    for (i, &c) in chars.iter().enumerate() {
        if c == '\n' {
            seen += 1;
            if seen == line {
                return i + 1;
            }
        }
    }
    chars.len()
}

/// Parse `source`, repairing recognised failures until it parses or fails
/// in a way that cannot be repaired.
///
/// `max_attempts` bounds the number of repairs; `0` lifts the bound.
pub fn load(source: &str, cursor: Cursor, max_attempts: usize) -> Result<Document, LoadError> {
    load_until(source, cursor, max_attempts, None)
}

/// Like [`load`], but gives up once `deadline` has passed.
///
/// The deadline is checked before every repair, so a document that keeps
/// needing repairs stops even when `max_attempts` is `0`.
pub fn load_until(
    source: &str,
    cursor: Cursor,
    max_attempts: usize,
    deadline: Option<Instant>,
) -> Result<Document, LoadError> {
    let mut text = source.to_string();
    let mut attempts = 0;
    loop {
        let err = match parse_document(&text, cursor) {
            Ok(document) => return Ok(document),
            Err(err) => err,
        };
        let Some(patch) = Patch::for_error(&text, &err) else {
            return Err(LoadError::Syntax(err));
        };
        if max_attempts != 0 && attempts >= max_attempts {
            return Err(LoadError::HealLimitExceeded {
                attempts,
                last: err,
            });
        }
        if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            return Err(LoadError::DeadlineExceeded {
                attempts,
                last: err,
            });
        }
        attempts += 1;
        debug!(
            attempt = attempts,
            index = patch.index,
            insert = %patch.insert,
            problem = %err.problem,
            "Repairing document"
        );
        patch.apply(&mut text);
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
