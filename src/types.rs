//! Data types used throughout the playbook completion engine.
//!
//! This module contains the positional primitives (marks, spans, cursors),
//! the constructed value tree handed to the classifier, and the
//! completion-related types (entity kinds, directives, module descriptors,
//! completion contexts and candidates).

use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A position in the source text.
///
/// All three coordinates are 0-based and counted in characters, not bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Mark {
    pub index: usize,
    pub line: usize,
    pub column: usize,
}

/// The position completion was requested at (0-based line and column).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Cursor {
    pub line: usize,
    pub column: usize,
}

impl Cursor {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

/// The source extent of a node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Span {
    pub start: Mark,
    pub end: Mark,
}

impl Span {
    pub fn new(start: Mark, end: Mark) -> Self {
        Self { start, end }
    }

    /// Whether the cursor sits inside this span.
    ///
    /// Multi-line spans only compare lines.  A single-line span also requires
    /// the column to fall within `start.column..=end.column`.
    pub fn contains(&self, cursor: Cursor) -> bool {
        if cursor.line < self.start.line || cursor.line > self.end.line {
            return false;
        }
        if self.start.line != self.end.line {
            return true;
        }
        cursor.column >= self.start.column && cursor.column <= self.end.column
    }
}

/// Insertion-ordered mapping produced by the constructor.
pub type Mapping = IndexMap<Key, Value>;

/// A constructed document value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Seq(Vec<Value>),
    Map(Mapping),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Mapping> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_seq(&self) -> Option<&[Value]> {
        match self {
            Value::Seq(items) => Some(items),
            _ => None,
        }
    }

    pub fn is_container(&self) -> bool {
        matches!(self, Value::Seq(_) | Value::Map(_))
    }

    /// Name of the value's type, as used in "unhashable type" diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::Seq(_) => "list",
            Value::Map(_) => "dict",
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<Key> for Value {
    fn from(key: Key) -> Self {
        match key {
            Key::Null => Value::Null,
            Key::Bool(b) => Value::Bool(b),
            Key::Int(i) => Value::Int(i),
            Key::Float(bits) => Value::Float(f64::from_bits(bits)),
            Key::Str(s) => Value::Str(s),
        }
    }
}

/// A hashable mapping key.
///
/// Floats are stored by their bit pattern so that keys stay `Eq + Hash`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    Null,
    Bool(bool),
    Int(i64),
    Float(u64),
    Str(String),
}

impl Key {
    /// Convert a constructed value into a key, or `None` for containers.
    pub fn from_value(value: &Value) -> Option<Key> {
        match value {
            Value::Null => Some(Key::Null),
            Value::Bool(b) => Some(Key::Bool(*b)),
            Value::Int(i) => Some(Key::Int(*i)),
            Value::Float(f) => Some(Key::Float(f.to_bits())),
            Value::Str(s) => Some(Key::Str(s.clone())),
            Value::Seq(_) | Value::Map(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Key::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key::Str(s.to_string())
    }
}

/// The kinds of playbook entity a directive can belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Play,
    Role,
    Block,
    Task,
}

impl EntityKind {
    pub const ALL: [EntityKind; 4] = [
        EntityKind::Play,
        EntityKind::Role,
        EntityKind::Block,
        EntityKind::Task,
    ];
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::Play => "play",
            EntityKind::Role => "role",
            EntityKind::Block => "block",
            EntityKind::Task => "task",
        };
        f.write_str(name)
    }
}

/// A key accepted by one or more entity kinds (e.g. `hosts` for plays).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Directive {
    pub name: String,
    pub kinds: BTreeSet<EntityKind>,
}

/// A named operation that a task can invoke.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ModuleDescriptor {
    pub name: String,
    /// Source file the module was discovered at, used to look up its
    /// parameter documentation.  `None` for modules registered by name only.
    pub path: Option<PathBuf>,
}

impl ModuleDescriptor {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: None,
        }
    }
}

/// What the author is expected to type at the cursor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompletionContext {
    pub play: bool,
    pub task: bool,
    pub block: bool,
    pub role: bool,
    pub module: bool,
    /// Set when the cursor sits among the arguments of a known module.
    pub module_arg: Option<ModuleDescriptor>,
}

/// A single completion result.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Candidate {
    Directive(Directive),
    Module(ModuleDescriptor),
    Parameter { module: String, name: String },
}

impl Candidate {
    pub fn name(&self) -> &str {
        match self {
            Candidate::Directive(d) => &d.name,
            Candidate::Module(m) => &m.name,
            Candidate::Parameter { name, .. } => name,
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn mark(line: usize, column: usize) -> Mark {
        Mark {
            index: 0,
            line,
            column,
        }
    }

    #[test]
    fn single_line_span_requires_column_containment() {
        let span = Span::new(mark(2, 4), mark(2, 8));
        assert!(span.contains(Cursor::new(2, 4)));
        assert!(span.contains(Cursor::new(2, 8)));
        assert!(!span.contains(Cursor::new(2, 9)));
        assert!(!span.contains(Cursor::new(2, 3)));
        assert!(!span.contains(Cursor::new(1, 5)));
    }

    #[test]
    fn multi_line_span_ignores_columns() {
        let span = Span::new(mark(1, 10), mark(3, 0));
        assert!(span.contains(Cursor::new(1, 0)));
        assert!(span.contains(Cursor::new(2, 99)));
        assert!(span.contains(Cursor::new(3, 42)));
        assert!(!span.contains(Cursor::new(4, 0)));
    }

    #[test]
    fn containers_are_not_keys() {
        assert_eq!(Key::from_value(&Value::from("a")), Some(Key::from("a")));
        assert_eq!(Key::from_value(&Value::Seq(vec![])), None);
        assert_eq!(Key::from_value(&Value::Map(Mapping::new())), None);
    }
}
