/// Playbook loading.
///
/// This module turns playbook text into a [`Document`]: the constructed
/// value tree plus the trail of values that sit under the cursor.  The
/// work is split across explicit stages, each consuming the previous one:
///
/// - [`scanner`]: characters to tokens
/// - [`events`]: tokens to events
/// - [`composer`]: events to a node tree with source spans
/// - [`constructor`]: nodes to values, recording the trail
/// - [`heal`]: the repair-and-reparse loop wrapped around all of the above
pub mod composer;
pub mod constructor;
pub mod error;
pub mod events;
pub mod heal;
pub mod resolver;
pub mod scanner;
pub mod token;

pub use error::{LoadError, Stage, SyntaxError};
pub use heal::{load, load_until};

use composer::Composer;
use constructor::Constructor;
use events::Parser;

use crate::types::{Cursor, Value};

/// A parsed playbook, as seen from the cursor.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub root: Value,
    /// Values whose source span contains the cursor, outermost first.
    pub trail: Vec<Value>,
}

/// Run one parse of `source` without any repair.
pub fn parse_document(source: &str, cursor: Cursor) -> Result<Document, SyntaxError> {
    let Some(node) = Composer::new(Parser::new(source)).compose_single()? else {
        return Ok(Document {
            root: Value::Null,
            trail: Vec::new(),
        });
    };

    let mut constructor = Constructor::new(cursor);
    let root = constructor.construct_document(&node)?;
    let mut trail = constructor.into_trail();

    // The cursor sits in a container but on none of its items: it is
    // waiting for a new item or key.
    if trail.last().is_some_and(Value::is_container) {
        trail.push(Value::Null);
    }

    Ok(Document { root, trail })
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_stream_yields_null_root() {
        let document = parse_document("", Cursor::default()).unwrap();
        assert_eq!(document.root, Value::Null);
        assert!(document.trail.is_empty());
    }

    #[test]
    fn trail_ending_in_container_gets_terminal_null() {
        let document = parse_document("---\n- hosts: all\n", Cursor::new(2, 0)).unwrap();
        assert!(matches!(document.trail.first(), Some(Value::Seq(_))));
        assert_eq!(document.trail.last(), Some(&Value::Null));
    }

    #[test]
    fn cursor_outside_document_leaves_trail_empty() {
        let document = parse_document("---\n- hosts: all\n", Cursor::new(40, 0)).unwrap();
        assert!(document.trail.is_empty());
    }
}
