//! Token stream to event stream.
//!
//! A pull parser: each call to [`EventSource::next_event`] runs the state
//! machine until it has produced exactly one event.  Pending states are kept
//! on an explicit stack rather than the call stack, so deeply nested
//! documents do not recurse here.

use std::collections::HashMap;

use super::error::{Stage, SyntaxError};
use super::scanner::Scanner;
use super::token::{ScalarStyle, Token, TokenKind};
use crate::types::Mark;

type Result<T> = std::result::Result<T, SyntaxError>;

/// Prefix of the standard `!!` tag handle.
pub const CORE_TAG_PREFIX: &str = "tag:yaml.org,2002:";

#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    StreamStart,
    StreamEnd,
    DocumentStart { explicit: bool },
    DocumentEnd,
    Alias { anchor: String },
    Scalar {
        anchor: Option<String>,
        tag: Option<String>,
        /// Whether the implicit resolvers may pick the tag.
        plain_implicit: bool,
        value: String,
        style: ScalarStyle,
    },
    SequenceStart {
        anchor: Option<String>,
        tag: Option<String>,
        flow: bool,
    },
    SequenceEnd,
    MappingStart {
        anchor: Option<String>,
        tag: Option<String>,
        flow: bool,
    },
    MappingEnd,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub kind: EventKind,
    pub start: Mark,
    pub end: Mark,
}

impl Event {
    fn new(kind: EventKind, start: Mark, end: Mark) -> Self {
        Self { kind, start, end }
    }

    fn empty_scalar(mark: Mark) -> Self {
        Self::new(
            EventKind::Scalar {
                anchor: None,
                tag: None,
                plain_implicit: true,
                value: String::new(),
                style: ScalarStyle::Plain,
            },
            mark,
            mark,
        )
    }
}

/// Anything that can feed the composer.
pub trait EventSource {
    /// Look at the next event.  `None` once the stream end has been taken.
    fn peek_event(&mut self) -> Result<Option<&Event>>;
    fn next_event(&mut self) -> Result<Option<Event>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    StreamStart,
    ImplicitDocumentStart,
    DocumentStart,
    DocumentContent,
    DocumentEnd,
    BlockNode,
    BlockSequenceFirstEntry,
    BlockSequenceEntry,
    IndentlessSequenceEntry,
    BlockMappingFirstKey,
    BlockMappingKey,
    BlockMappingValue,
    FlowSequenceFirstEntry,
    FlowSequenceEntry,
    FlowSequenceEntryMappingKey,
    FlowSequenceEntryMappingValue,
    FlowSequenceEntryMappingEnd,
    FlowMappingFirstKey,
    FlowMappingKey,
    FlowMappingValue,
    FlowMappingEmptyValue,
}

pub struct Parser {
    scanner: Scanner,
    current: Option<Event>,
    state: Option<State>,
    states: Vec<State>,
    /// Start marks of the open collections, for "while parsing" contexts.
    marks: Vec<Mark>,
    tag_handles: HashMap<String, String>,
}

fn default_tag_handles() -> HashMap<String, String> {
    HashMap::from([
        ("!".to_string(), "!".to_string()),
        ("!!".to_string(), CORE_TAG_PREFIX.to_string()),
    ])
}

impl Parser {
    pub fn new(source: &str) -> Self {
        Self {
            scanner: Scanner::new(source),
            current: None,
            state: Some(State::StreamStart),
            states: Vec::new(),
            marks: Vec::new(),
            tag_handles: default_tag_handles(),
        }
    }

    fn error(&self, problem: impl Into<String>, mark: Mark) -> SyntaxError {
        SyntaxError::new(Stage::Parser, problem, mark)
    }

    fn peek_token(&mut self) -> Result<&Token> {
        let mark = self.scanner.mark();
        self.scanner.peek_token()?.ok_or_else(|| {
            SyntaxError::new(Stage::Parser, "unexpected end of the token stream", mark)
        })
    }

    fn next_token(&mut self) -> Result<Token> {
        let mark = self.scanner.mark();
        self.scanner.next_token()?.ok_or_else(|| {
            SyntaxError::new(Stage::Parser, "unexpected end of the token stream", mark)
        })
    }

    fn pop_state(&mut self) -> Option<State> {
        self.states.pop()
    }

    fn dispatch(&mut self, state: State) -> Result<Event> {
        match state {
            State::StreamStart => self.parse_stream_start(),
            State::ImplicitDocumentStart => self.parse_implicit_document_start(),
            State::DocumentStart => self.parse_document_start(),
            State::DocumentContent => self.parse_document_content(),
            State::DocumentEnd => self.parse_document_end(),
            State::BlockNode => self.parse_node(true, false),
            State::BlockSequenceFirstEntry => {
                let token = self.next_token()?;
                self.marks.push(token.start);
                self.parse_block_sequence_entry()
            }
            State::BlockSequenceEntry => self.parse_block_sequence_entry(),
            State::IndentlessSequenceEntry => self.parse_indentless_sequence_entry(),
            State::BlockMappingFirstKey => {
                let token = self.next_token()?;
                self.marks.push(token.start);
                self.parse_block_mapping_key()
            }
            State::BlockMappingKey => self.parse_block_mapping_key(),
            State::BlockMappingValue => self.parse_block_mapping_value(),
            State::FlowSequenceFirstEntry => {
                let token = self.next_token()?;
                self.marks.push(token.start);
                self.parse_flow_sequence_entry(true)
            }
            State::FlowSequenceEntry => self.parse_flow_sequence_entry(false),
            State::FlowSequenceEntryMappingKey => self.parse_flow_sequence_entry_mapping_key(),
            State::FlowSequenceEntryMappingValue => self.parse_flow_sequence_entry_mapping_value(),
            State::FlowSequenceEntryMappingEnd => {
                self.state = Some(State::FlowSequenceEntry);
                let mark = self.peek_token()?.start;
                Ok(Event::new(EventKind::MappingEnd, mark, mark))
            }
            State::FlowMappingFirstKey => {
                let token = self.next_token()?;
                self.marks.push(token.start);
                self.parse_flow_mapping_key(true)
            }
            State::FlowMappingKey => self.parse_flow_mapping_key(false),
            State::FlowMappingValue => self.parse_flow_mapping_value(),
            State::FlowMappingEmptyValue => {
                self.state = Some(State::FlowMappingKey);
                let mark = self.peek_token()?.start;
                Ok(Event::empty_scalar(mark))
            }
        }
    }

    // ─── Stream and documents ───────────────────────────────────────────

    fn parse_stream_start(&mut self) -> Result<Event> {
        let token = self.next_token()?;
        self.state = Some(State::ImplicitDocumentStart);
        Ok(Event::new(EventKind::StreamStart, token.start, token.end))
    }

    fn parse_implicit_document_start(&mut self) -> Result<Event> {
        let token = self.peek_token()?;
        if matches!(
            token.kind,
            TokenKind::Directive { .. } | TokenKind::DocumentStart | TokenKind::StreamEnd
        ) {
            return self.parse_document_start();
        }
        let mark = token.start;
        self.tag_handles = default_tag_handles();
        self.states.push(State::DocumentEnd);
        self.state = Some(State::BlockNode);
        Ok(Event::new(
            EventKind::DocumentStart { explicit: false },
            mark,
            mark,
        ))
    }

    fn parse_document_start(&mut self) -> Result<Event> {
        while matches!(self.peek_token()?.kind, TokenKind::DocumentEnd) {
            self.next_token()?;
        }

        if matches!(self.peek_token()?.kind, TokenKind::StreamEnd) {
            let token = self.next_token()?;
            self.state = None;
            return Ok(Event::new(EventKind::StreamEnd, token.start, token.end));
        }

        let start = self.peek_token()?.start;
        self.process_directives()?;
        let token = self.peek_token()?;
        if !matches!(token.kind, TokenKind::DocumentStart) {
            let (found, mark) = (token.kind.id(), token.start);
            return Err(self.error(
                format!("expected '<document start>', but found '{}'", found),
                mark,
            ));
        }
        let token = self.next_token()?;
        self.states.push(State::DocumentEnd);
        self.state = Some(State::DocumentContent);
        Ok(Event::new(
            EventKind::DocumentStart { explicit: true },
            start,
            token.end,
        ))
    }

    fn parse_document_end(&mut self) -> Result<Event> {
        let token = self.peek_token()?;
        let start = token.start;
        let mut end = token.start;
        if matches!(token.kind, TokenKind::DocumentEnd) {
            end = self.next_token()?.end;
        }
        self.state = Some(State::DocumentStart);
        Ok(Event::new(EventKind::DocumentEnd, start, end))
    }

    fn parse_document_content(&mut self) -> Result<Event> {
        let token = self.peek_token()?;
        if matches!(
            token.kind,
            TokenKind::Directive { .. }
                | TokenKind::DocumentStart
                | TokenKind::DocumentEnd
                | TokenKind::StreamEnd
        ) {
            let mark = token.start;
            self.state = self.pop_state();
            return Ok(Event::empty_scalar(mark));
        }
        self.parse_node(true, false)
    }

    fn process_directives(&mut self) -> Result<()> {
        let mut version_seen = false;
        let mut handles = HashMap::new();

        while matches!(self.peek_token()?.kind, TokenKind::Directive { .. }) {
            let token = self.next_token()?;
            let TokenKind::Directive { name, params } = token.kind else {
                continue;
            };
            match name.as_str() {
                "YAML" => {
                    if version_seen {
                        return Err(self.error("found duplicate YAML directive", token.start));
                    }
                    version_seen = true;
                    let major = params
                        .first()
                        .and_then(|v| v.split('.').next())
                        .and_then(|m| m.parse::<u32>().ok());
                    if major != Some(1) {
                        return Err(self.error(
                            "found incompatible YAML document (version 1.* is required)",
                            token.start,
                        ));
                    }
                }
                "TAG" => {
                    let [handle, prefix] = params.as_slice() else {
                        return Err(self.error(
                            "expected a tag handle and a tag prefix",
                            token.start,
                        ));
                    };
                    if handles.contains_key(handle) {
                        return Err(
                            self.error(format!("duplicate tag handle '{}'", handle), token.start)
                        );
                    }
                    handles.insert(handle.clone(), prefix.clone());
                }
                _ => {}
            }
        }

        for (handle, prefix) in default_tag_handles() {
            handles.entry(handle).or_insert(prefix);
        }
        self.tag_handles = handles;
        Ok(())
    }

    // ─── Nodes ──────────────────────────────────────────────────────────

    fn parse_node(&mut self, block: bool, indentless_sequence: bool) -> Result<Event> {
        if matches!(self.peek_token()?.kind, TokenKind::Alias(_)) {
            let token = self.next_token()?;
            let TokenKind::Alias(anchor) = token.kind else {
                unreachable!("peeked an alias token");
            };
            self.state = self.pop_state();
            return Ok(Event::new(
                EventKind::Alias { anchor },
                token.start,
                token.end,
            ));
        }

        let mut anchor = None;
        let mut raw_tag = None;
        let mut start = None;
        let mut end = None;
        let mut tag_mark = None;

        // Properties come in either order: `&a !t` or `!t &a`.
        for _ in 0..2 {
            let kind = &self.peek_token()?.kind;
            let is_anchor = matches!(kind, TokenKind::Anchor(_)) && anchor.is_none();
            let is_tag = matches!(kind, TokenKind::Tag { .. }) && raw_tag.is_none();
            if !is_anchor && !is_tag {
                break;
            }
            let token = self.next_token()?;
            start.get_or_insert(token.start);
            end = Some(token.end);
            match token.kind {
                TokenKind::Anchor(name) => anchor = Some(name),
                TokenKind::Tag { handle, suffix } => {
                    tag_mark = Some(token.start);
                    raw_tag = Some((handle, suffix));
                }
                _ => {}
            }
        }

        let tag = match raw_tag {
            Some((Some(handle), suffix)) => match self.tag_handles.get(&handle) {
                Some(prefix) => Some(format!("{}{}", prefix, suffix)),
                None => {
                    let mark = tag_mark.unwrap_or_default();
                    let mut err =
                        self.error(format!("found undefined tag handle '{}'", handle), mark);
                    if let Some(start) = start {
                        err = err.with_context("while parsing a node", start);
                    }
                    return Err(err);
                }
            },
            Some((None, suffix)) => Some(suffix),
            None => None,
        };

        let next_start = self.peek_token()?.start;
        let start = start.unwrap_or(next_start);
        let end = end.unwrap_or(next_start);
        let non_specific = tag.is_none() || tag.as_deref() == Some("!");

        let token = self.peek_token()?;
        let token_start = token.start;
        let token_end = token.end;

        if indentless_sequence && matches!(token.kind, TokenKind::BlockEntry) {
            self.state = Some(State::IndentlessSequenceEntry);
            return Ok(Event::new(
                EventKind::SequenceStart {
                    anchor,
                    tag,
                    flow: false,
                },
                start,
                token_end,
            ));
        }

        match token.kind {
            TokenKind::Scalar { .. } => {
                let token = self.next_token()?;
                let TokenKind::Scalar { value, style } = token.kind else {
                    unreachable!("peeked a scalar token");
                };
                let plain_implicit = (style == ScalarStyle::Plain && tag.is_none())
                    || tag.as_deref() == Some("!");
                self.state = self.pop_state();
                Ok(Event::new(
                    EventKind::Scalar {
                        anchor,
                        tag,
                        plain_implicit,
                        value,
                        style,
                    },
                    start,
                    token.end,
                ))
            }
            TokenKind::FlowSequenceStart => {
                self.state = Some(State::FlowSequenceFirstEntry);
                Ok(Event::new(
                    EventKind::SequenceStart {
                        anchor,
                        tag,
                        flow: true,
                    },
                    start,
                    token_end,
                ))
            }
            TokenKind::FlowMappingStart => {
                self.state = Some(State::FlowMappingFirstKey);
                Ok(Event::new(
                    EventKind::MappingStart {
                        anchor,
                        tag,
                        flow: true,
                    },
                    start,
                    token_end,
                ))
            }
            TokenKind::BlockSequenceStart if block => {
                self.state = Some(State::BlockSequenceFirstEntry);
                Ok(Event::new(
                    EventKind::SequenceStart {
                        anchor,
                        tag,
                        flow: false,
                    },
                    start,
                    token_start,
                ))
            }
            TokenKind::BlockMappingStart if block => {
                self.state = Some(State::BlockMappingFirstKey);
                Ok(Event::new(
                    EventKind::MappingStart {
                        anchor,
                        tag,
                        flow: false,
                    },
                    start,
                    token_start,
                ))
            }
            _ if anchor.is_some() || tag.is_some() => {
                // A tag or anchor with no content stands for an empty scalar.
                self.state = self.pop_state();
                Ok(Event::new(
                    EventKind::Scalar {
                        anchor,
                        tag,
                        plain_implicit: non_specific,
                        value: String::new(),
                        style: ScalarStyle::Plain,
                    },
                    start,
                    end,
                ))
            }
            _ => {
                let context = if block {
                    "while parsing a block node"
                } else {
                    "while parsing a flow node"
                };
                let found = token.kind.id();
                Err(self
                    .error(
                        format!("expected the node content, but found '{}'", found),
                        token_start,
                    )
                    .with_context(context, start))
            }
        }
    }

    // ─── Block collections ──────────────────────────────────────────────

    fn parse_block_sequence_entry(&mut self) -> Result<Event> {
        if matches!(self.peek_token()?.kind, TokenKind::BlockEntry) {
            let token = self.next_token()?;
            if !matches!(
                self.peek_token()?.kind,
                TokenKind::BlockEntry | TokenKind::BlockEnd
            ) {
                self.states.push(State::BlockSequenceEntry);
                return self.parse_node(true, false);
            }
            self.state = Some(State::BlockSequenceEntry);
            return Ok(Event::empty_scalar(token.end));
        }

        let token = self.peek_token()?;
        if !matches!(token.kind, TokenKind::BlockEnd) {
            let (found, mark) = (token.kind.id(), token.start);
            return Err(self.unexpected_in_collection(
                "while parsing a block collection",
                format!("expected <block end>, but found '{}'", found),
                mark,
            ));
        }
        let token = self.next_token()?;
        self.state = self.pop_state();
        self.marks.pop();
        Ok(Event::new(EventKind::SequenceEnd, token.start, token.end))
    }

    fn parse_indentless_sequence_entry(&mut self) -> Result<Event> {
        if matches!(self.peek_token()?.kind, TokenKind::BlockEntry) {
            let token = self.next_token()?;
            if !matches!(
                self.peek_token()?.kind,
                TokenKind::BlockEntry | TokenKind::Key | TokenKind::Value | TokenKind::BlockEnd
            ) {
                self.states.push(State::IndentlessSequenceEntry);
                return self.parse_node(true, false);
            }
            self.state = Some(State::IndentlessSequenceEntry);
            return Ok(Event::empty_scalar(token.end));
        }
        let mark = self.peek_token()?.start;
        self.state = self.pop_state();
        Ok(Event::new(EventKind::SequenceEnd, mark, mark))
    }

    fn parse_block_mapping_key(&mut self) -> Result<Event> {
        if matches!(self.peek_token()?.kind, TokenKind::Key) {
            let token = self.next_token()?;
            if !matches!(
                self.peek_token()?.kind,
                TokenKind::Key | TokenKind::Value | TokenKind::BlockEnd
            ) {
                self.states.push(State::BlockMappingValue);
                return self.parse_node(true, true);
            }
            self.state = Some(State::BlockMappingValue);
            return Ok(Event::empty_scalar(token.end));
        }

        let token = self.peek_token()?;
        if !matches!(token.kind, TokenKind::BlockEnd) {
            let (found, mark) = (token.kind.id(), token.start);
            return Err(self.unexpected_in_collection(
                "while parsing a block mapping",
                format!("expected <block end>, but found '{}'", found),
                mark,
            ));
        }
        let token = self.next_token()?;
        self.state = self.pop_state();
        self.marks.pop();
        Ok(Event::new(EventKind::MappingEnd, token.start, token.end))
    }

    fn parse_block_mapping_value(&mut self) -> Result<Event> {
        if matches!(self.peek_token()?.kind, TokenKind::Value) {
            let token = self.next_token()?;
            if !matches!(
                self.peek_token()?.kind,
                TokenKind::Key | TokenKind::Value | TokenKind::BlockEnd
            ) {
                self.states.push(State::BlockMappingKey);
                return self.parse_node(true, true);
            }
            self.state = Some(State::BlockMappingKey);
            return Ok(Event::empty_scalar(token.end));
        }
        self.state = Some(State::BlockMappingKey);
        let mark = self.peek_token()?.start;
        Ok(Event::empty_scalar(mark))
    }

    fn unexpected_in_collection(&self, context: &str, problem: String, mark: Mark) -> SyntaxError {
        let err = self.error(problem, mark);
        match self.marks.last() {
            Some(open) => err.with_context(context, *open),
            None => err,
        }
    }

    // ─── Flow collections ───────────────────────────────────────────────

    fn parse_flow_sequence_entry(&mut self, first: bool) -> Result<Event> {
        if !matches!(self.peek_token()?.kind, TokenKind::FlowSequenceEnd) {
            if !first {
                let token = self.peek_token()?;
                if matches!(token.kind, TokenKind::FlowEntry) {
                    self.next_token()?;
                } else {
                    let (found, mark) = (token.kind.id(), token.start);
                    return Err(self.unexpected_in_collection(
                        "while parsing a flow sequence",
                        format!("expected ',' or ']', but got '{}'", found),
                        mark,
                    ));
                }
            }

            let token = self.peek_token()?;
            if matches!(token.kind, TokenKind::Key) {
                let (start, end) = (token.start, token.end);
                self.state = Some(State::FlowSequenceEntryMappingKey);
                return Ok(Event::new(
                    EventKind::MappingStart {
                        anchor: None,
                        tag: None,
                        flow: true,
                    },
                    start,
                    end,
                ));
            }
            if !matches!(token.kind, TokenKind::FlowSequenceEnd) {
                self.states.push(State::FlowSequenceEntry);
                return self.parse_node(false, false);
            }
        }

        let token = self.next_token()?;
        self.state = self.pop_state();
        self.marks.pop();
        Ok(Event::new(EventKind::SequenceEnd, token.start, token.end))
    }

    fn parse_flow_sequence_entry_mapping_key(&mut self) -> Result<Event> {
        let token = self.next_token()?;
        if !matches!(
            self.peek_token()?.kind,
            TokenKind::Value | TokenKind::FlowEntry | TokenKind::FlowSequenceEnd
        ) {
            self.states.push(State::FlowSequenceEntryMappingValue);
            return self.parse_node(false, false);
        }
        self.state = Some(State::FlowSequenceEntryMappingValue);
        Ok(Event::empty_scalar(token.end))
    }

    fn parse_flow_sequence_entry_mapping_value(&mut self) -> Result<Event> {
        if matches!(self.peek_token()?.kind, TokenKind::Value) {
            let token = self.next_token()?;
            if !matches!(
                self.peek_token()?.kind,
                TokenKind::FlowEntry | TokenKind::FlowSequenceEnd
            ) {
                self.states.push(State::FlowSequenceEntryMappingEnd);
                return self.parse_node(false, false);
            }
            self.state = Some(State::FlowSequenceEntryMappingEnd);
            return Ok(Event::empty_scalar(token.end));
        }
        self.state = Some(State::FlowSequenceEntryMappingEnd);
        let mark = self.peek_token()?.start;
        Ok(Event::empty_scalar(mark))
    }

    fn parse_flow_mapping_key(&mut self, first: bool) -> Result<Event> {
        if !matches!(self.peek_token()?.kind, TokenKind::FlowMappingEnd) {
            if !first {
                let token = self.peek_token()?;
                if matches!(token.kind, TokenKind::FlowEntry) {
                    self.next_token()?;
                } else {
                    let (found, mark) = (token.kind.id(), token.start);
                    return Err(self.unexpected_in_collection(
                        "while parsing a flow mapping",
                        format!("expected ',' or '}}', but got '{}'", found),
                        mark,
                    ));
                }
            }

            if matches!(self.peek_token()?.kind, TokenKind::Key) {
                let token = self.next_token()?;
                if !matches!(
                    self.peek_token()?.kind,
                    TokenKind::Value | TokenKind::FlowEntry | TokenKind::FlowMappingEnd
                ) {
                    self.states.push(State::FlowMappingValue);
                    return self.parse_node(false, false);
                }
                self.state = Some(State::FlowMappingValue);
                return Ok(Event::empty_scalar(token.end));
            }
            if !matches!(self.peek_token()?.kind, TokenKind::FlowMappingEnd) {
                self.states.push(State::FlowMappingEmptyValue);
                return self.parse_node(false, false);
            }
        }

        let token = self.next_token()?;
        self.state = self.pop_state();
        self.marks.pop();
        Ok(Event::new(EventKind::MappingEnd, token.start, token.end))
    }

    fn parse_flow_mapping_value(&mut self) -> Result<Event> {
        if matches!(self.peek_token()?.kind, TokenKind::Value) {
            let token = self.next_token()?;
            if !matches!(
                self.peek_token()?.kind,
                TokenKind::FlowEntry | TokenKind::FlowMappingEnd
            ) {
                self.states.push(State::FlowMappingKey);
                return self.parse_node(false, false);
            }
            self.state = Some(State::FlowMappingKey);
            return Ok(Event::empty_scalar(token.end));
        }
        self.state = Some(State::FlowMappingKey);
        let mark = self.peek_token()?.start;
        Ok(Event::empty_scalar(mark))
    }
}

impl EventSource for Parser {
    fn peek_event(&mut self) -> Result<Option<&Event>> {
        if self.current.is_none()
            && let Some(state) = self.state
        {
            self.current = Some(self.dispatch(state)?);
        }
        Ok(self.current.as_ref())
    }

    fn next_event(&mut self) -> Result<Option<Event>> {
        self.peek_event()?;
        Ok(self.current.take())
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn events(source: &str) -> Result<Vec<Event>> {
        let mut parser = Parser::new(source);
        let mut out = Vec::new();
        while let Some(event) = parser.next_event()? {
            out.push(event);
        }
        Ok(out)
    }

    fn names(source: &str) -> Vec<&'static str> {
        events(source)
            .expect("parse failed")
            .iter()
            .map(|e| match e.kind {
                EventKind::StreamStart => "stream-start",
                EventKind::StreamEnd => "stream-end",
                EventKind::DocumentStart { .. } => "doc-start",
                EventKind::DocumentEnd => "doc-end",
                EventKind::Alias { .. } => "alias",
                EventKind::Scalar { .. } => "scalar",
                EventKind::SequenceStart { .. } => "seq-start",
                EventKind::SequenceEnd => "seq-end",
                EventKind::MappingStart { .. } => "map-start",
                EventKind::MappingEnd => "map-end",
            })
            .collect()
    }

    #[test]
    fn block_sequence_of_mappings() {
        assert_eq!(
            names("- a: 1\n- b\n"),
            vec![
                "stream-start",
                "doc-start",
                "seq-start",
                "map-start",
                "scalar",
                "scalar",
                "map-end",
                "scalar",
                "seq-end",
                "doc-end",
                "stream-end",
            ]
        );
    }

    #[test]
    fn bare_entry_yields_empty_scalar_at_entry_end() {
        let evs = events("- \n").unwrap();
        let scalar = evs
            .iter()
            .find(|e| matches!(e.kind, EventKind::Scalar { .. }))
            .expect("empty scalar");
        assert_eq!((scalar.start.line, scalar.start.column), (0, 1));
    }

    #[test]
    fn indentless_sequence_under_key() {
        assert_eq!(
            names("tasks:\n- a\n"),
            vec![
                "stream-start",
                "doc-start",
                "map-start",
                "scalar",
                "seq-start",
                "scalar",
                "seq-end",
                "map-end",
                "doc-end",
                "stream-end",
            ]
        );
    }

    #[test]
    fn flow_collections() {
        assert_eq!(
            names("{a: [1, 2]}"),
            vec![
                "stream-start",
                "doc-start",
                "map-start",
                "scalar",
                "seq-start",
                "scalar",
                "scalar",
                "seq-end",
                "map-end",
                "doc-end",
                "stream-end",
            ]
        );
    }

    #[test]
    fn core_tag_handle_is_expanded() {
        let evs = events("!!str 1").unwrap();
        let tag = evs.iter().find_map(|e| match &e.kind {
            EventKind::Scalar { tag, .. } => tag.clone(),
            _ => None,
        });
        assert_eq!(tag.as_deref(), Some("tag:yaml.org,2002:str"));
    }

    #[test]
    fn mapping_key_inside_sequence_is_a_parser_error() {
        let err = events("- hosts\nhoge:\n").unwrap_err();
        assert_eq!(err.stage, Stage::Parser);
        assert_eq!(err.context.as_deref(), Some("while parsing a block collection"));
        assert_eq!(err.problem, "expected <block end>, but found '?'");
    }

    #[test]
    fn unclosed_flow_sequence_is_a_parser_error() {
        let err = events("[a, b").unwrap_err();
        assert_eq!(err.stage, Stage::Parser);
        assert_eq!(err.context.as_deref(), Some("while parsing a flow sequence"));
        assert_eq!(err.problem, "expected ',' or ']', but got '<stream end>'");
    }

    #[test]
    fn undefined_tag_handle() {
        let err = events("!x!y 1").unwrap_err();
        assert!(err.problem.contains("undefined tag handle"), "{}", err);
    }
}
