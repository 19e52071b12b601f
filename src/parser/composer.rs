//! Event stream to node tree.
//!
//! The composer resolves aliases against the anchors seen so far in the
//! document, gives every node a fully resolved tag and records the span of
//! source text each node covers.  Aliased nodes are shared through `Rc`, so
//! the constructor can recognise them and build them only once.

use std::collections::HashMap;
use std::rc::Rc;

use super::error::{Stage, SyntaxError};
use super::events::{Event, EventKind, EventSource};
use super::resolver;
use super::token::ScalarStyle;
use crate::types::{Mark, Span};

type Result<T> = std::result::Result<T, SyntaxError>;

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Scalar { value: String, style: ScalarStyle },
    Sequence(Vec<Rc<Node>>),
    Mapping(Vec<(Rc<Node>, Rc<Node>)>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub tag: String,
    pub kind: NodeKind,
    pub span: Span,
}

impl Node {
    /// Node kind as it appears in diagnostics.
    pub fn id(&self) -> &'static str {
        match self.kind {
            NodeKind::Scalar { .. } => "scalar",
            NodeKind::Sequence(_) => "sequence",
            NodeKind::Mapping(_) => "mapping",
        }
    }

    pub fn start(&self) -> Mark {
        self.span.start
    }
}

pub struct Composer<S> {
    events: S,
    anchors: HashMap<String, Rc<Node>>,
    /// Anchors of collections still being composed, by start mark.
    open_anchors: HashMap<String, Mark>,
}

impl<S: EventSource> Composer<S> {
    pub fn new(events: S) -> Self {
        Self {
            events,
            anchors: HashMap::new(),
            open_anchors: HashMap::new(),
        }
    }

    fn error(problem: impl Into<String>, mark: Mark) -> SyntaxError {
        SyntaxError::new(Stage::Composer, problem, mark)
    }

    /// Pull the next event; running out early means the parser stopped
    /// without a stream end, which it never does on success.
    fn next(&mut self) -> Result<Event> {
        match self.events.next_event()? {
            Some(event) => Ok(event),
            None => Err(Self::error("unexpected end of event stream", Mark::default())),
        }
    }

    fn peek_kind(&mut self) -> Result<Option<&EventKind>> {
        Ok(self.events.peek_event()?.map(|event| &event.kind))
    }

    fn at_stream_end(&mut self) -> Result<bool> {
        Ok(matches!(self.peek_kind()?, None | Some(EventKind::StreamEnd)))
    }

    /// Compose the only document of the stream.
    ///
    /// Returns `None` for an empty stream and fails if a second document
    /// follows the first.
    pub fn compose_single(&mut self) -> Result<Option<Rc<Node>>> {
        // Stream start.
        self.next()?;

        let mut document = None;
        if !self.at_stream_end()? {
            document = Some(self.compose_document()?);
        }

        if !self.at_stream_end()? {
            let event = self.next()?;
            let first = document.as_ref().map(|n: &Rc<Node>| n.start()).unwrap_or_default();
            return Err(Self::error("but found another document", event.start)
                .with_context("expected a single document in the stream", first));
        }

        // Stream end.
        self.events.next_event()?;
        Ok(document)
    }

    fn compose_document(&mut self) -> Result<Rc<Node>> {
        self.next()?;
        let node = self.compose_node()?;
        self.next()?;
        self.anchors.clear();
        self.open_anchors.clear();
        Ok(node)
    }

    fn compose_node(&mut self) -> Result<Rc<Node>> {
        let event = self.next()?;
        if let EventKind::Alias { anchor } = &event.kind {
            return match self.anchors.get(anchor) {
                Some(node) => Ok(Rc::clone(node)),
                None => Err(Self::error(
                    format!("found undefined alias '{}'", anchor),
                    event.start,
                )),
            };
        }

        let anchor = match &event.kind {
            EventKind::Scalar { anchor, .. }
            | EventKind::SequenceStart { anchor, .. }
            | EventKind::MappingStart { anchor, .. } => anchor.clone(),
            _ => None,
        };
        if let Some(name) = &anchor {
            let first = self
                .anchors
                .get(name)
                .map(|node| node.start())
                .or_else(|| self.open_anchors.get(name).copied());
            if let Some(first) = first {
                return Err(Self::error("second occurrence", event.start).with_context(
                    format!("found duplicate anchor '{}'; first occurrence", name),
                    first,
                ));
            }
            if !matches!(event.kind, EventKind::Scalar { .. }) {
                self.open_anchors.insert(name.clone(), event.start);
            }
        }

        let node = match event.kind {
            EventKind::Scalar {
                tag,
                plain_implicit,
                value,
                style,
                ..
            } => {
                let tag = match tag {
                    Some(tag) if tag != "!" => tag,
                    _ => resolver::resolve_scalar(&value, plain_implicit),
                };
                Rc::new(Node {
                    tag,
                    kind: NodeKind::Scalar { value, style },
                    span: Span::new(event.start, event.end),
                })
            }
            EventKind::SequenceStart { tag, .. } => {
                let mut items = Vec::new();
                while !matches!(self.peek_kind()?, Some(EventKind::SequenceEnd) | None) {
                    items.push(self.compose_node()?);
                }
                let end = self.next()?;
                Rc::new(Node {
                    tag: collection_tag(tag, resolver::SEQ),
                    kind: NodeKind::Sequence(items),
                    span: Span::new(event.start, end.end),
                })
            }
            EventKind::MappingStart { tag, .. } => {
                let mut pairs = Vec::new();
                while !matches!(self.peek_kind()?, Some(EventKind::MappingEnd) | None) {
                    let key = self.compose_node()?;
                    let value = self.compose_node()?;
                    pairs.push((key, value));
                }
                let end = self.next()?;
                Rc::new(Node {
                    tag: collection_tag(tag, resolver::MAP),
                    kind: NodeKind::Mapping(pairs),
                    span: Span::new(event.start, end.end),
                })
            }
            other => {
                return Err(Self::error(
                    format!("unexpected event {:?}", other),
                    event.start,
                ));
            }
        };

        if let Some(name) = anchor {
            self.open_anchors.remove(&name);
            self.anchors.insert(name, Rc::clone(&node));
        }
        Ok(node)
    }
}

fn collection_tag(tag: Option<String>, default: &str) -> String {
    match tag {
        Some(tag) if tag != "!" => tag,
        _ => default.to_string(),
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
