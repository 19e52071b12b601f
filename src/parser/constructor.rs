//! Node tree to value tree, recording the trail of nodes under the cursor.
//!
//! Construction walks the tree depth first.  Every node whose span contains
//! the cursor leaves one entry on the trail, outermost first:
//!
//! - scalars contribute their raw text, whatever their resolved type;
//! - sequences and mappings push a `Null` placeholder before their children
//!   and overwrite it with the finished container afterwards;
//! - a mapping key is pushed right before its value whenever the value's
//!   span contains the cursor.
//!
//! Nodes reached more than once (aliases, merge keys) are built once and
//! never contribute a second trail entry.

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use super::composer::{Node, NodeKind};
use super::error::{Stage, SyntaxError};
use super::resolver;
use crate::types::{Cursor, Key, Mapping, Value};

type Result<T> = std::result::Result<T, SyntaxError>;

type Pairs = Vec<(Rc<Node>, Rc<Node>)>;

/// Tags the playbook dialect adds on top of the core schema.  All of them
/// construct plain strings.
const STRING_TAGS: &[&str] = &["!unsafe", "!vault", "!vault-encrypted"];

pub struct Constructor {
    cursor: Cursor,
    trail: Vec<Value>,
    /// Finished values of shared nodes, keyed by node address.
    constructed: HashMap<*const Node, Value>,
    /// Nodes that already have a trail entry.
    seen: HashSet<*const Node>,
}

impl Constructor {
    pub fn new(cursor: Cursor) -> Self {
        Self {
            cursor,
            trail: Vec::new(),
            constructed: HashMap::new(),
            seen: HashSet::new(),
        }
    }

    pub fn into_trail(self) -> Vec<Value> {
        self.trail
    }

    fn error(problem: impl Into<String>, node: &Node) -> SyntaxError {
        SyntaxError::new(Stage::Constructor, problem, node.start())
    }

    /// Claim a trail slot for `node` if it sits under the cursor and has not
    /// been recorded yet.
    fn claim(&mut self, node: &Rc<Node>) -> bool {
        node.span.contains(self.cursor) && self.seen.insert(Rc::as_ptr(node))
    }

    fn wants(&self, node: &Rc<Node>) -> bool {
        node.span.contains(self.cursor) && !self.seen.contains(&Rc::as_ptr(node))
    }

    pub fn construct_document(&mut self, node: &Rc<Node>) -> Result<Value> {
        self.construct_object(node)
    }

    fn construct_object(&mut self, node: &Rc<Node>) -> Result<Value> {
        let shared = Rc::strong_count(node) > 1;
        if shared && let Some(value) = self.constructed.get(&Rc::as_ptr(node)) {
            return Ok(value.clone());
        }

        let value = match node.tag.as_str() {
            resolver::NULL => {
                self.construct_scalar(node)?;
                Value::Null
            }
            resolver::BOOL => {
                let raw = self.construct_scalar(node)?;
                match raw.to_ascii_lowercase().as_str() {
                    "yes" | "true" | "on" => Value::Bool(true),
                    "no" | "false" | "off" => Value::Bool(false),
                    _ => Value::Str(raw),
                }
            }
            resolver::INT => {
                let raw = self.construct_scalar(node)?;
                match parse_int(&raw) {
                    Some(i) => Value::Int(i),
                    None => Value::Str(raw),
                }
            }
            resolver::FLOAT => {
                let raw = self.construct_scalar(node)?;
                match parse_float(&raw) {
                    Some(f) => Value::Float(f),
                    None => Value::Str(raw),
                }
            }
            resolver::STR => Value::Str(self.construct_scalar(node)?),
            tag if STRING_TAGS.contains(&tag) => Value::Str(self.construct_scalar(node)?),
            resolver::SEQ => self.construct_sequence(node)?,
            resolver::MAP => self.construct_mapping(node)?,
            tag => {
                return Err(Self::error(
                    format!("could not determine a constructor for the tag '{}'", tag),
                    node,
                ));
            }
        };

        if shared {
            self.constructed.insert(Rc::as_ptr(node), value.clone());
        }
        Ok(value)
    }

    fn construct_scalar(&mut self, node: &Rc<Node>) -> Result<String> {
        let NodeKind::Scalar { value, .. } = &node.kind else {
            return Err(Self::error(
                format!("expected a scalar node, but found {}", node.id()),
                node,
            ));
        };
        if self.claim(node) {
            self.trail.push(Value::Str(value.clone()));
        }
        Ok(value.clone())
    }

    fn construct_sequence(&mut self, node: &Rc<Node>) -> Result<Value> {
        let NodeKind::Sequence(children) = &node.kind else {
            return Err(Self::error(
                format!("expected a sequence node, but found {}", node.id()),
                node,
            ));
        };

        let slot = self.claim(node).then(|| {
            self.trail.push(Value::Null);
            self.trail.len() - 1
        });

        let items = children
            .iter()
            .map(|child| self.construct_object(child))
            .collect::<Result<Vec<_>>>()?;
        let seq = Value::Seq(items);

        if let Some(slot) = slot {
            self.trail[slot] = seq.clone();
        }
        Ok(seq)
    }

    fn construct_mapping(&mut self, node: &Rc<Node>) -> Result<Value> {
        if !matches!(node.kind, NodeKind::Mapping(_)) {
            return Err(Self::error(
                format!("expected a mapping node, but found {}", node.id()),
                node,
            ));
        }
        let pairs = flatten_mapping(node)?;

        let slot = self.claim(node).then(|| {
            self.trail.push(Value::Null);
            self.trail.len() - 1
        });

        let mut mapping = Mapping::new();
        for (key_node, value_node) in &pairs {
            let key = self.construct_object(key_node)?;
            let Some(key) = Key::from_value(&key) else {
                return Err(SyntaxError::new(
                    Stage::Constructor,
                    format!(
                        "found unacceptable key (unhashable type: '{}')",
                        key.type_name()
                    ),
                    key_node.start(),
                )
                .with_context("while constructing a mapping", node.start()));
            };
            if self.wants(value_node) {
                self.trail.push(Value::from(key.clone()));
            }
            let value = self.construct_object(value_node)?;
            mapping.insert(key, value);
        }

        let map = Value::Map(mapping);
        if let Some(slot) = slot {
            self.trail[slot] = map.clone();
        }
        Ok(map)
    }
}

/// The pairs of a mapping node with `<<` merge keys expanded.
///
/// Merged pairs come first so that explicit keys override them.  When a
/// list of mappings is merged, earlier mappings win over later ones.
fn flatten_mapping(node: &Rc<Node>) -> Result<Pairs> {
    let NodeKind::Mapping(pairs) = &node.kind else {
        return Ok(Vec::new());
    };

    let merge_error = |found: &Node, what: &str| {
        SyntaxError::new(
            Stage::Constructor,
            format!("expected {}, but found {}", what, found.id()),
            found.start(),
        )
        .with_context("while constructing a mapping", node.start())
    };

    let mut merged = Vec::new();
    let mut own = Vec::new();
    for (key, value) in pairs {
        if key.tag != resolver::MERGE {
            own.push((Rc::clone(key), Rc::clone(value)));
            continue;
        }
        match &value.kind {
            NodeKind::Mapping(_) => merged.extend(flatten_mapping(value)?),
            NodeKind::Sequence(items) => {
                let mut groups = Vec::with_capacity(items.len());
                for item in items {
                    if !matches!(item.kind, NodeKind::Mapping(_)) {
                        return Err(merge_error(item, "a mapping for merging"));
                    }
                    groups.push(flatten_mapping(item)?);
                }
                for group in groups.into_iter().rev() {
                    merged.extend(group);
                }
            }
            NodeKind::Scalar { .. } => {
                return Err(merge_error(value, "a mapping or list of mappings for merging"));
            }
        }
    }

    merged.extend(own);
    Ok(merged)
}

fn parse_int(raw: &str) -> Option<i64> {
    let cleaned: String = raw.chars().filter(|&c| c != '_').collect();
    let (negative, digits) = match cleaned.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, cleaned.strip_prefix('+').unwrap_or(&cleaned)),
    };

    let magnitude = if digits == "0" {
        0
    } else if let Some(bin) = digits.strip_prefix("0b") {
        i64::from_str_radix(bin, 2).ok()?
    } else if let Some(hex) = digits.strip_prefix("0x") {
        i64::from_str_radix(hex, 16).ok()?
    } else if let Some(oct) = digits.strip_prefix('0') {
        i64::from_str_radix(oct, 8).ok()?
    } else {
        digits.parse::<i64>().ok()?
    };
    Some(if negative { -magnitude } else { magnitude })
}

fn parse_float(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|&c| c != '_')
        .collect::<String>()
        .to_ascii_lowercase();
    let (sign, body) = match cleaned.strip_prefix('-') {
        Some(rest) => (-1.0, rest),
        None => (1.0, cleaned.strip_prefix('+').unwrap_or(&cleaned)),
    };
    match body {
        ".inf" => Some(sign * f64::INFINITY),
        ".nan" => Some(f64::NAN),
        _ => body.parse::<f64>().ok().map(|f| sign * f),
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
