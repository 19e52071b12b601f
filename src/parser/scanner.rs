//! Character reader and tokenizer.
//!
//! The scanner works on a `Vec<char>` so that marks can be expressed in
//! characters, which is what editors report cursor columns in.  Tokens are
//! queued lazily: the parser asks for the next token, and the scanner fetches
//! just enough input to be sure no earlier simple key is still pending (a
//! plain scalar only becomes a mapping key once the following `:` is seen, at
//! which point `KEY` and possibly `BLOCK-MAPPING-START` are inserted *before*
//! it in the queue).
//!
//! Diagnostic wording matters here: the healing loop recognises specific
//! failures by their context and problem text.

use std::collections::{BTreeMap, VecDeque};

use super::error::{Stage, SyntaxError};
use super::token::{ScalarStyle, Token, TokenKind};
use crate::types::Mark;

type Result<T> = std::result::Result<T, SyntaxError>;

/// Simple keys may not span more than this many characters.
const MAX_SIMPLE_KEY_LENGTH: usize = 1024;

fn is_break(ch: char) -> bool {
    matches!(ch, '\r' | '\n' | '\u{85}' | '\u{2028}' | '\u{2029}')
}

fn is_break_or_end(ch: char) -> bool {
    ch == '\0' || is_break(ch)
}

fn is_blank_or_end(ch: char) -> bool {
    ch == ' ' || ch == '\t' || is_break_or_end(ch)
}

/// Like [`is_blank_or_end`] but without the tab, as used around tags.
fn is_space_or_end(ch: char) -> bool {
    ch == ' ' || is_break_or_end(ch)
}

fn is_word(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '-' || ch == '_'
}

fn is_uri_char(ch: char) -> bool {
    is_word(ch) || "-;/?:@&=+$,_.!~*'()[]%".contains(ch)
}

/// Quote a character the way the classic diagnostics print it.
fn repr(ch: char) -> String {
    match ch {
        '\'' => "\"'\"".to_string(),
        '\\' => "'\\\\'".to_string(),
        '\t' => "'\\t'".to_string(),
        '\n' => "'\\n'".to_string(),
        '\r' => "'\\r'".to_string(),
        c if c.is_control() && (c as u32) <= 0xff => format!("'\\x{:02x}'", c as u32),
        c if c.is_control() || matches!(c, '\u{2028}' | '\u{2029}' | '\u{feff}') => {
            format!("'\\u{:04x}'", c as u32)
        }
        c => format!("'{}'", c),
    }
}

/// Escapes recognised after a backslash in double-quoted scalars.
fn escape_replacement(ch: char) -> Option<char> {
    Some(match ch {
        '0' => '\0',
        'a' => '\u{07}',
        'b' => '\u{08}',
        't' | '\t' => '\t',
        'n' => '\n',
        'v' => '\u{0B}',
        'f' => '\u{0C}',
        'r' => '\r',
        'e' => '\u{1B}',
        ' ' => ' ',
        '"' => '"',
        '/' => '/',
        '\\' => '\\',
        'N' => '\u{85}',
        '_' => '\u{A0}',
        'L' => '\u{2028}',
        'P' => '\u{2029}',
        _ => return None,
    })
}

fn escape_code_length(ch: char) -> Option<usize> {
    match ch {
        'x' => Some(2),
        'u' => Some(4),
        'U' => Some(8),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy)]
struct SimpleKey {
    token_number: usize,
    required: bool,
    mark: Mark,
}

pub struct Scanner {
    chars: Vec<char>,
    index: usize,
    line: usize,
    column: usize,

    done: bool,
    flow_level: usize,
    tokens: VecDeque<Token>,
    tokens_taken: usize,

    indent: isize,
    indents: Vec<isize>,

    allow_simple_key: bool,
    /// Pending simple key candidates, one per flow level at most.
    possible_simple_keys: BTreeMap<usize, SimpleKey>,
}

impl Scanner {
    pub fn new(source: &str) -> Self {
        let mut scanner = Self {
            chars: source.chars().collect(),
            index: 0,
            line: 0,
            column: 0,
            done: false,
            flow_level: 0,
            tokens: VecDeque::new(),
            tokens_taken: 0,
            indent: -1,
            indents: Vec::new(),
            allow_simple_key: true,
            possible_simple_keys: BTreeMap::new(),
        };
        let mark = scanner.mark();
        scanner
            .tokens
            .push_back(Token::new(TokenKind::StreamStart, mark, mark));
        scanner
    }

    pub fn mark(&self) -> Mark {
        Mark {
            index: self.index,
            line: self.line,
            column: self.column,
        }
    }

    /// Look at the next token without consuming it.  `None` once the stream
    /// end token has been taken.
    pub fn peek_token(&mut self) -> Result<Option<&Token>> {
        self.more_tokens()?;
        Ok(self.tokens.front())
    }

    pub fn next_token(&mut self) -> Result<Option<Token>> {
        self.more_tokens()?;
        let token = self.tokens.pop_front();
        if token.is_some() {
            self.tokens_taken += 1;
        }
        Ok(token)
    }

    // ─── Reader ─────────────────────────────────────────────────────────

    fn at_end(&self) -> bool {
        self.index >= self.chars.len()
    }

    fn peek_at(&self, offset: usize) -> char {
        self.chars.get(self.index + offset).copied().unwrap_or('\0')
    }

    fn peek(&self) -> char {
        self.peek_at(0)
    }

    fn prefix(&self, length: usize) -> String {
        let end = (self.index + length).min(self.chars.len());
        self.chars[self.index..end].iter().collect()
    }

    fn prefix_is(&self, s: &str) -> bool {
        s.chars().enumerate().all(|(i, ch)| self.peek_at(i) == ch)
    }

    fn forward(&mut self, length: usize) {
        for _ in 0..length {
            if self.at_end() {
                break;
            }
            let ch = self.chars[self.index];
            self.index += 1;
            if matches!(ch, '\n' | '\u{85}' | '\u{2028}' | '\u{2029}')
                || (ch == '\r' && self.peek() != '\n')
            {
                self.line += 1;
                self.column = 0;
            } else if ch != '\u{FEFF}' {
                self.column += 1;
            }
        }
    }

    fn error(&self, problem: impl Into<String>) -> SyntaxError {
        SyntaxError::new(Stage::Scanner, problem, self.mark())
    }

    // ─── Token queue ────────────────────────────────────────────────────

    fn more_tokens(&mut self) -> Result<()> {
        while self.need_more_tokens()? {
            self.fetch_more_tokens()?;
        }
        Ok(())
    }

    fn need_more_tokens(&mut self) -> Result<bool> {
        if self.done {
            return Ok(false);
        }
        if self.tokens.is_empty() {
            return Ok(true);
        }
        // The front token may still turn out to be a simple key.
        self.stale_possible_simple_keys()?;
        Ok(self.next_possible_simple_key() == Some(self.tokens_taken))
    }

    fn fetch_more_tokens(&mut self) -> Result<()> {
        self.scan_to_next_token();
        self.stale_possible_simple_keys()?;
        self.unwind_indent(self.column as isize);

        if self.at_end() {
            return self.fetch_stream_end();
        }

        let ch = self.peek();
        if ch == '%' && self.column == 0 {
            return self.fetch_directive();
        }
        if ch == '-' && self.check_document_indicator("---") {
            self.fetch_document_indicator(TokenKind::DocumentStart);
            return Ok(());
        }
        if ch == '.' && self.check_document_indicator("...") {
            self.fetch_document_indicator(TokenKind::DocumentEnd);
            return Ok(());
        }

        match ch {
            '[' => return self.fetch_flow_collection_start(TokenKind::FlowSequenceStart),
            '{' => return self.fetch_flow_collection_start(TokenKind::FlowMappingStart),
            ']' => return self.fetch_flow_collection_end(TokenKind::FlowSequenceEnd),
            '}' => return self.fetch_flow_collection_end(TokenKind::FlowMappingEnd),
            ',' => return self.fetch_flow_entry(),
            _ => {}
        }

        if ch == '-' && is_blank_or_end(self.peek_at(1)) {
            return self.fetch_block_entry();
        }
        if ch == '?' && (self.flow_level > 0 || is_blank_or_end(self.peek_at(1))) {
            return self.fetch_key();
        }
        if ch == ':' && (self.flow_level > 0 || is_blank_or_end(self.peek_at(1))) {
            return self.fetch_value();
        }

        match ch {
            '*' => return self.fetch_anchor_like(true),
            '&' => return self.fetch_anchor_like(false),
            '!' => return self.fetch_tag(),
            '|' if self.flow_level == 0 => return self.fetch_block_scalar(ScalarStyle::Literal),
            '>' if self.flow_level == 0 => return self.fetch_block_scalar(ScalarStyle::Folded),
            '\'' => return self.fetch_flow_scalar(ScalarStyle::SingleQuoted),
            '"' => return self.fetch_flow_scalar(ScalarStyle::DoubleQuoted),
            _ => {}
        }

        if self.check_plain() {
            return self.fetch_plain();
        }

        let mut err = self.error(format!(
            "found character {} that cannot start any token",
            repr(ch)
        ));
        err.context = Some("while scanning for the next token".to_string());
        Err(err)
    }

    // ─── Simple keys ────────────────────────────────────────────────────

    fn next_possible_simple_key(&self) -> Option<usize> {
        self.possible_simple_keys
            .values()
            .map(|key| key.token_number)
            .min()
    }

    /// Drop candidates that can no longer be keys: a simple key must fit on
    /// one line and within [`MAX_SIMPLE_KEY_LENGTH`] characters.
    fn stale_possible_simple_keys(&mut self) -> Result<()> {
        let (line, index) = (self.line, self.index);
        let stale: Vec<usize> = self
            .possible_simple_keys
            .iter()
            .filter(|(_, key)| key.mark.line != line || index - key.mark.index > MAX_SIMPLE_KEY_LENGTH)
            .map(|(level, _)| *level)
            .collect();

        for level in stale {
            if let Some(key) = self.possible_simple_keys.remove(&level)
                && key.required
            {
                return Err(self
                    .error("could not find expected ':'")
                    .with_context("while scanning a simple key", key.mark));
            }
        }
        Ok(())
    }

    fn save_possible_simple_key(&mut self) -> Result<()> {
        // A key at the current block indentation must be followed by ':'.
        let required = self.flow_level == 0 && self.indent == self.column as isize;
        if self.allow_simple_key {
            self.remove_possible_simple_key()?;
            let key = SimpleKey {
                token_number: self.tokens_taken + self.tokens.len(),
                required,
                mark: self.mark(),
            };
            self.possible_simple_keys.insert(self.flow_level, key);
        }
        Ok(())
    }

    fn remove_possible_simple_key(&mut self) -> Result<()> {
        if let Some(key) = self.possible_simple_keys.remove(&self.flow_level)
            && key.required
        {
            return Err(self
                .error("could not find expected ':'")
                .with_context("while scanning a simple key", key.mark));
        }
        Ok(())
    }

    // ─── Indentation ────────────────────────────────────────────────────

    fn unwind_indent(&mut self, column: isize) {
        if self.flow_level > 0 {
            return;
        }
        while self.indent > column {
            let mark = self.mark();
            self.indent = self.indents.pop().unwrap_or(-1);
            self.tokens
                .push_back(Token::new(TokenKind::BlockEnd, mark, mark));
        }
    }

    fn add_indent(&mut self, column: usize) -> bool {
        let column = column as isize;
        if self.indent < column {
            self.indents.push(self.indent);
            self.indent = column;
            true
        } else {
            false
        }
    }

    // ─── Fetchers ───────────────────────────────────────────────────────

    fn push_single(&mut self, kind: TokenKind, length: usize) {
        let start = self.mark();
        self.forward(length);
        let end = self.mark();
        self.tokens.push_back(Token::new(kind, start, end));
    }

    fn fetch_stream_end(&mut self) -> Result<()> {
        self.unwind_indent(-1);
        // A required key on the last line is only caught here.
        self.remove_possible_simple_key()?;
        self.allow_simple_key = false;
        self.possible_simple_keys.clear();
        let mark = self.mark();
        self.tokens
            .push_back(Token::new(TokenKind::StreamEnd, mark, mark));
        self.done = true;
        Ok(())
    }

    fn fetch_directive(&mut self) -> Result<()> {
        self.unwind_indent(-1);
        self.remove_possible_simple_key()?;
        self.allow_simple_key = false;
        let token = self.scan_directive()?;
        self.tokens.push_back(token);
        Ok(())
    }

    fn check_document_indicator(&self, indicator: &str) -> bool {
        self.column == 0 && self.prefix_is(indicator) && is_blank_or_end(self.peek_at(3))
    }

    fn fetch_document_indicator(&mut self, kind: TokenKind) {
        self.unwind_indent(-1);
        // Document indicators close every block, so nothing can be pending.
        self.possible_simple_keys.remove(&self.flow_level);
        self.allow_simple_key = false;
        self.push_single(kind, 3);
    }

    fn fetch_flow_collection_start(&mut self, kind: TokenKind) -> Result<()> {
        // '[' and '{' may start a simple key.
        self.save_possible_simple_key()?;
        self.flow_level += 1;
        self.allow_simple_key = true;
        self.push_single(kind, 1);
        Ok(())
    }

    fn fetch_flow_collection_end(&mut self, kind: TokenKind) -> Result<()> {
        self.remove_possible_simple_key()?;
        self.flow_level = self.flow_level.saturating_sub(1);
        self.allow_simple_key = false;
        self.push_single(kind, 1);
        Ok(())
    }

    fn fetch_flow_entry(&mut self) -> Result<()> {
        self.allow_simple_key = true;
        self.remove_possible_simple_key()?;
        self.push_single(TokenKind::FlowEntry, 1);
        Ok(())
    }

    fn fetch_block_entry(&mut self) -> Result<()> {
        if self.flow_level == 0 {
            if !self.allow_simple_key {
                return Err(self.error("sequence entries are not allowed here"));
            }
            if self.add_indent(self.column) {
                let mark = self.mark();
                self.tokens
                    .push_back(Token::new(TokenKind::BlockSequenceStart, mark, mark));
            }
        }
        self.allow_simple_key = true;
        self.remove_possible_simple_key()?;
        self.push_single(TokenKind::BlockEntry, 1);
        Ok(())
    }

    fn fetch_key(&mut self) -> Result<()> {
        if self.flow_level == 0 {
            if !self.allow_simple_key {
                return Err(self.error("mapping keys are not allowed here"));
            }
            if self.add_indent(self.column) {
                let mark = self.mark();
                self.tokens
                    .push_back(Token::new(TokenKind::BlockMappingStart, mark, mark));
            }
        }
        self.allow_simple_key = self.flow_level == 0;
        self.remove_possible_simple_key()?;
        self.push_single(TokenKind::Key, 1);
        Ok(())
    }

    fn fetch_value(&mut self) -> Result<()> {
        if let Some(key) = self.possible_simple_keys.remove(&self.flow_level) {
            // Retroactively turn the saved candidate into a key.
            let position = key.token_number - self.tokens_taken;
            self.tokens
                .insert(position, Token::new(TokenKind::Key, key.mark, key.mark));
            if self.flow_level == 0 && self.add_indent(key.mark.column) {
                self.tokens.insert(
                    position,
                    Token::new(TokenKind::BlockMappingStart, key.mark, key.mark),
                );
            }
            self.allow_simple_key = false;
        } else {
            if self.flow_level == 0 {
                if !self.allow_simple_key {
                    return Err(self.error("mapping values are not allowed here"));
                }
                if self.add_indent(self.column) {
                    let mark = self.mark();
                    self.tokens
                        .push_back(Token::new(TokenKind::BlockMappingStart, mark, mark));
                }
            }
            self.allow_simple_key = self.flow_level == 0;
            self.remove_possible_simple_key()?;
        }
        self.push_single(TokenKind::Value, 1);
        Ok(())
    }

    fn fetch_anchor_like(&mut self, alias: bool) -> Result<()> {
        self.save_possible_simple_key()?;
        self.allow_simple_key = false;
        let token = self.scan_anchor(alias)?;
        self.tokens.push_back(token);
        Ok(())
    }

    fn fetch_tag(&mut self) -> Result<()> {
        self.save_possible_simple_key()?;
        self.allow_simple_key = false;
        let token = self.scan_tag()?;
        self.tokens.push_back(token);
        Ok(())
    }

    fn fetch_block_scalar(&mut self, style: ScalarStyle) -> Result<()> {
        self.allow_simple_key = true;
        self.remove_possible_simple_key()?;
        let token = self.scan_block_scalar(style)?;
        self.tokens.push_back(token);
        Ok(())
    }

    fn fetch_flow_scalar(&mut self, style: ScalarStyle) -> Result<()> {
        self.save_possible_simple_key()?;
        self.allow_simple_key = false;
        let token = self.scan_flow_scalar(style)?;
        self.tokens.push_back(token);
        Ok(())
    }

    fn fetch_plain(&mut self) -> Result<()> {
        self.save_possible_simple_key()?;
        self.allow_simple_key = false;
        let token = self.scan_plain();
        self.tokens.push_back(token);
        Ok(())
    }

    fn check_plain(&self) -> bool {
        let ch = self.peek();
        let indicator = is_blank_or_end(ch) || "-?:,[]{}#&*!|>'\"%@`".contains(ch);
        !indicator
            || (!is_blank_or_end(self.peek_at(1))
                && (ch == '-' || (self.flow_level == 0 && (ch == '?' || ch == ':'))))
    }

    // ─── Scanners ───────────────────────────────────────────────────────

    /// Skip spaces, comments and line breaks up to the next token.
    fn scan_to_next_token(&mut self) {
        if self.index == 0 && self.peek() == '\u{FEFF}' {
            self.forward(1);
        }
        loop {
            while self.peek() == ' ' {
                self.forward(1);
            }
            if self.peek() == '#' {
                while !is_break_or_end(self.peek()) {
                    self.forward(1);
                }
            }
            if self.scan_line_break().is_some() {
                if self.flow_level == 0 {
                    self.allow_simple_key = true;
                }
            } else {
                break;
            }
        }
    }

    /// Consume one line break, normalising `\r\n`, `\r` and NEL to `\n`.
    fn scan_line_break(&mut self) -> Option<char> {
        let ch = self.peek();
        if matches!(ch, '\r' | '\n' | '\u{85}') {
            if self.prefix_is("\r\n") {
                self.forward(2);
            } else {
                self.forward(1);
            }
            Some('\n')
        } else if matches!(ch, '\u{2028}' | '\u{2029}') {
            self.forward(1);
            Some(ch)
        } else {
            None
        }
    }

    fn scan_directive(&mut self) -> Result<Token> {
        let start = self.mark();
        self.forward(1);

        let mut length = 0;
        while is_word(self.peek_at(length)) {
            length += 1;
        }
        if length == 0 || !is_blank_or_end(self.peek_at(length)) {
            self.forward(length);
            return Err(self
                .error(format!(
                    "expected alphabetic or numeric character, but found {}",
                    repr(self.peek())
                ))
                .with_context("while scanning a directive", start));
        }
        let name = self.prefix(length);
        self.forward(length);

        let mut params = Vec::new();
        loop {
            while matches!(self.peek(), ' ' | '\t') {
                self.forward(1);
            }
            let ch = self.peek();
            if ch == '#' || is_break_or_end(ch) {
                break;
            }
            let mut length = 0;
            while !is_blank_or_end(self.peek_at(length)) {
                length += 1;
            }
            params.push(self.prefix(length));
            self.forward(length);
        }
        let end = self.mark();

        if self.peek() == '#' {
            while !is_break_or_end(self.peek()) {
                self.forward(1);
            }
        }
        self.scan_line_break();

        Ok(Token::new(TokenKind::Directive { name, params }, start, end))
    }

    fn scan_anchor(&mut self, alias: bool) -> Result<Token> {
        let start = self.mark();
        let context = if alias {
            "while scanning an alias"
        } else {
            "while scanning an anchor"
        };
        self.forward(1);

        let mut length = 0;
        while is_word(self.peek_at(length)) {
            length += 1;
        }
        if length == 0 {
            return Err(self
                .error(format!(
                    "expected alphabetic or numeric character, but found {}",
                    repr(self.peek())
                ))
                .with_context(context, start));
        }
        let value = self.prefix(length);
        self.forward(length);

        let ch = self.peek();
        if !(is_blank_or_end(ch) || "?:,]}%@`".contains(ch)) {
            return Err(self
                .error(format!(
                    "expected alphabetic or numeric character, but found {}",
                    repr(ch)
                ))
                .with_context(context, start));
        }

        let kind = if alias {
            TokenKind::Alias(value)
        } else {
            TokenKind::Anchor(value)
        };
        Ok(Token::new(kind, start, self.mark()))
    }

    fn scan_tag(&mut self) -> Result<Token> {
        let start = self.mark();
        let ch = self.peek_at(1);

        let (handle, suffix) = if ch == '<' {
            self.forward(2);
            let suffix = self.scan_tag_uri(start)?;
            if self.peek() != '>' {
                return Err(self
                    .error(format!("expected '>', but found {}", repr(self.peek())))
                    .with_context("while parsing a tag", start));
            }
            self.forward(1);
            (None, suffix)
        } else if is_blank_or_end(ch) {
            self.forward(1);
            (None, "!".to_string())
        } else {
            // `!!suffix` and `!handle!suffix` use a named handle; a lone
            // `!suffix` uses the primary handle.
            let mut length = 1;
            let mut use_handle = false;
            let mut ch = ch;
            while !is_space_or_end(ch) {
                if ch == '!' {
                    use_handle = true;
                    break;
                }
                length += 1;
                ch = self.peek_at(length);
            }
            let handle = if use_handle {
                self.scan_tag_handle(start)?
            } else {
                self.forward(1);
                "!".to_string()
            };
            (Some(handle), self.scan_tag_uri(start)?)
        };

        if !is_space_or_end(self.peek()) {
            return Err(self
                .error(format!("expected ' ', but found {}", repr(self.peek())))
                .with_context("while scanning a tag", start));
        }
        Ok(Token::new(
            TokenKind::Tag { handle, suffix },
            start,
            self.mark(),
        ))
    }

    fn scan_tag_handle(&mut self, start: Mark) -> Result<String> {
        let mut length = 1;
        if self.peek_at(length) != ' ' {
            while is_word(self.peek_at(length)) {
                length += 1;
            }
            if self.peek_at(length) != '!' {
                self.forward(length);
                return Err(self
                    .error(format!("expected '!', but found {}", repr(self.peek())))
                    .with_context("while scanning a tag", start));
            }
            length += 1;
        }
        let handle = self.prefix(length);
        self.forward(length);
        Ok(handle)
    }

    fn scan_tag_uri(&mut self, start: Mark) -> Result<String> {
        let mut length = 0;
        while is_uri_char(self.peek_at(length)) {
            length += 1;
        }
        if length == 0 {
            return Err(self
                .error(format!("expected URI, but found {}", repr(self.peek())))
                .with_context("while parsing a tag", start));
        }
        let uri = self.prefix(length);
        self.forward(length);
        Ok(uri)
    }

    fn scan_block_scalar(&mut self, style: ScalarStyle) -> Result<Token> {
        let folded = style == ScalarStyle::Folded;
        let start = self.mark();
        self.forward(1);

        let (chomping, increment) = self.scan_block_scalar_indicators(start)?;
        self.scan_block_scalar_ignored_line(start)?;

        let min_indent = (self.indent + 1).max(1) as usize;
        let (mut breaks, mut end, indent) = match increment {
            None => {
                let (breaks, max_indent, end) = self.scan_block_scalar_indentation();
                (breaks, end, min_indent.max(max_indent))
            }
            Some(increment) => {
                let indent = min_indent + increment - 1;
                let (breaks, end) = self.scan_block_scalar_breaks(indent);
                (breaks, end, indent)
            }
        };

        let mut chunks = String::new();
        let mut line_break: Option<char> = None;

        while self.column == indent && !self.at_end() {
            chunks.push_str(&breaks);
            let leading_non_space = !matches!(self.peek(), ' ' | '\t');
            let mut length = 0;
            while !is_break_or_end(self.peek_at(length)) {
                length += 1;
            }
            chunks.push_str(&self.prefix(length));
            self.forward(length);
            line_break = self.scan_line_break();
            let (next_breaks, next_end) = self.scan_block_scalar_breaks(indent);
            breaks = next_breaks;
            end = next_end;

            if self.column == indent && !self.at_end() {
                // Folding turns a single line break between two
                // non-indented lines into a space.
                if folded
                    && line_break == Some('\n')
                    && leading_non_space
                    && !matches!(self.peek(), ' ' | '\t')
                {
                    if breaks.is_empty() {
                        chunks.push(' ');
                    }
                } else if let Some(lb) = line_break {
                    chunks.push(lb);
                }
            } else {
                break;
            }
        }

        // `chomping`: None is clip, Some(true) keep, Some(false) strip.
        if chomping != Some(false)
            && let Some(lb) = line_break
        {
            chunks.push(lb);
        }
        if chomping == Some(true) {
            chunks.push_str(&breaks);
        }

        Ok(Token::new(
            TokenKind::Scalar {
                value: chunks,
                style,
            },
            start,
            end,
        ))
    }

    fn scan_block_scalar_indicators(&mut self, start: Mark) -> Result<(Option<bool>, Option<usize>)> {
        let mut chomping = None;
        let mut increment = None;

        let mut ch = self.peek();
        if ch == '+' || ch == '-' {
            chomping = Some(ch == '+');
            self.forward(1);
            ch = self.peek();
            if let Some(digit) = ch.to_digit(10) {
                increment = Some(self.indentation_indicator(digit, start)?);
            }
        } else if let Some(digit) = ch.to_digit(10) {
            increment = Some(self.indentation_indicator(digit, start)?);
            ch = self.peek();
            if ch == '+' || ch == '-' {
                chomping = Some(ch == '+');
                self.forward(1);
            }
        }

        if !is_space_or_end(self.peek()) {
            return Err(self
                .error(format!(
                    "expected chomping or indentation indicators, but found {}",
                    repr(self.peek())
                ))
                .with_context("while scanning a block scalar", start));
        }
        Ok((chomping, increment))
    }

    fn indentation_indicator(&mut self, digit: u32, start: Mark) -> Result<usize> {
        if digit == 0 {
            return Err(self
                .error("expected indentation indicator in the range 1-9, but found 0")
                .with_context("while scanning a block scalar", start));
        }
        self.forward(1);
        Ok(digit as usize)
    }

    fn scan_block_scalar_ignored_line(&mut self, start: Mark) -> Result<()> {
        while self.peek() == ' ' {
            self.forward(1);
        }
        if self.peek() == '#' {
            while !is_break_or_end(self.peek()) {
                self.forward(1);
            }
        }
        if !is_break_or_end(self.peek()) {
            return Err(self
                .error(format!(
                    "expected a comment or a line break, but found {}",
                    repr(self.peek())
                ))
                .with_context("while scanning a block scalar", start));
        }
        self.scan_line_break();
        Ok(())
    }

    fn scan_block_scalar_indentation(&mut self) -> (String, usize, Mark) {
        let mut chunks = String::new();
        let mut max_indent = 0;
        let mut end = self.mark();
        while self.peek() == ' ' || is_break(self.peek()) {
            if self.peek() != ' ' {
                if let Some(lb) = self.scan_line_break() {
                    chunks.push(lb);
                }
                end = self.mark();
            } else {
                self.forward(1);
                max_indent = max_indent.max(self.column);
            }
        }
        (chunks, max_indent, end)
    }

    fn scan_block_scalar_breaks(&mut self, indent: usize) -> (String, Mark) {
        let mut chunks = String::new();
        let mut end = self.mark();
        while self.column < indent && self.peek() == ' ' {
            self.forward(1);
        }
        while is_break(self.peek()) {
            if let Some(lb) = self.scan_line_break() {
                chunks.push(lb);
            }
            end = self.mark();
            while self.column < indent && self.peek() == ' ' {
                self.forward(1);
            }
        }
        (chunks, end)
    }

    fn scan_flow_scalar(&mut self, style: ScalarStyle) -> Result<Token> {
        let double = style == ScalarStyle::DoubleQuoted;
        let start = self.mark();
        let quote = self.peek();
        self.forward(1);

        let mut chunks = String::new();
        self.scan_flow_scalar_non_spaces(double, start, &mut chunks)?;
        while self.peek() != quote {
            self.scan_flow_scalar_spaces(start, &mut chunks)?;
            self.scan_flow_scalar_non_spaces(double, start, &mut chunks)?;
        }
        self.forward(1);

        Ok(Token::new(
            TokenKind::Scalar {
                value: chunks,
                style,
            },
            start,
            self.mark(),
        ))
    }

    fn scan_flow_scalar_non_spaces(&mut self, double: bool, start: Mark, chunks: &mut String) -> Result<()> {
        loop {
            let mut length = 0;
            while !(matches!(self.peek_at(length), '\'' | '"' | '\\') || is_blank_or_end(self.peek_at(length))) {
                length += 1;
            }
            if length > 0 {
                chunks.push_str(&self.prefix(length));
                self.forward(length);
            }

            let ch = self.peek();
            if !double && ch == '\'' && self.peek_at(1) == '\'' {
                chunks.push('\'');
                self.forward(2);
            } else if (double && ch == '\'') || (!double && (ch == '"' || ch == '\\')) {
                chunks.push(ch);
                self.forward(1);
            } else if double && ch == '\\' {
                self.forward(1);
                let ch = self.peek();
                if let Some(replacement) = escape_replacement(ch) {
                    chunks.push(replacement);
                    self.forward(1);
                } else if let Some(length) = escape_code_length(ch) {
                    self.forward(1);
                    let code = self.prefix(length);
                    let decoded = if code.chars().count() == length {
                        u32::from_str_radix(&code, 16).ok().and_then(char::from_u32)
                    } else {
                        None
                    };
                    let Some(decoded) = decoded else {
                        return Err(self
                            .error(format!(
                                "expected escape sequence of {} hexdecimal numbers, but found {}",
                                length,
                                repr(self.peek())
                            ))
                            .with_context("while scanning a double-quoted scalar", start));
                    };
                    chunks.push(decoded);
                    self.forward(length);
                } else if is_break(ch) {
                    self.scan_line_break();
                    self.scan_flow_scalar_breaks(start, chunks)?;
                } else {
                    return Err(self
                        .error(format!("found unknown escape character {}", repr(ch)))
                        .with_context("while scanning a double-quoted scalar", start));
                }
            } else {
                return Ok(());
            }
        }
    }

    fn scan_flow_scalar_spaces(&mut self, start: Mark, chunks: &mut String) -> Result<()> {
        let mut length = 0;
        while matches!(self.peek_at(length), ' ' | '\t') {
            length += 1;
        }
        let whitespaces = self.prefix(length);
        self.forward(length);

        if self.at_end() {
            return Err(self
                .error("found unexpected end of stream")
                .with_context("while scanning a quoted scalar", start));
        }
        if is_break(self.peek()) {
            let line_break = self.scan_line_break();
            let mut breaks = String::new();
            self.scan_flow_scalar_breaks(start, &mut breaks)?;
            match line_break {
                Some('\n') if breaks.is_empty() => chunks.push(' '),
                Some('\n') => {}
                Some(lb) => chunks.push(lb),
                None => {}
            }
            chunks.push_str(&breaks);
        } else {
            chunks.push_str(&whitespaces);
        }
        Ok(())
    }

    fn scan_flow_scalar_breaks(&mut self, start: Mark, chunks: &mut String) -> Result<()> {
        loop {
            if (self.prefix_is("---") || self.prefix_is("...")) && is_blank_or_end(self.peek_at(3)) {
                return Err(self
                    .error("found unexpected document separator")
                    .with_context("while scanning a quoted scalar", start));
            }
            while matches!(self.peek(), ' ' | '\t') {
                self.forward(1);
            }
            if is_break(self.peek()) {
                if let Some(lb) = self.scan_line_break() {
                    chunks.push(lb);
                }
            } else {
                return Ok(());
            }
        }
    }

    fn scan_plain(&mut self) -> Token {
        let start = self.mark();
        let mut end = start;
        let indent = self.indent + 1;
        let mut chunks = String::new();
        let mut spaces = String::new();

        loop {
            if self.peek() == '#' {
                break;
            }
            let mut length = 0;
            loop {
                let ch = self.peek_at(length);
                let next = self.peek_at(length + 1);
                let ends_at_colon = ch == ':'
                    && (is_blank_or_end(next) || (self.flow_level > 0 && ",[]{}".contains(next)));
                if is_blank_or_end(ch)
                    || ends_at_colon
                    || (self.flow_level > 0 && ",?[]{}".contains(ch))
                {
                    break;
                }
                length += 1;
            }
            if length == 0 {
                break;
            }

            self.allow_simple_key = false;
            chunks.push_str(&spaces);
            chunks.push_str(&self.prefix(length));
            self.forward(length);
            end = self.mark();

            match self.scan_plain_spaces() {
                Some(next) if !next.is_empty() => spaces = next,
                _ => break,
            }
            if self.peek() == '#' || (self.flow_level == 0 && (self.column as isize) < indent) {
                break;
            }
        }

        Token::new(
            TokenKind::Scalar {
                value: chunks,
                style: ScalarStyle::Plain,
            },
            start,
            end,
        )
    }

    /// Whitespace between two chunks of a plain scalar.  `None` when a
    /// document separator ends the scalar.
    fn scan_plain_spaces(&mut self) -> Option<String> {
        let mut length = 0;
        while self.peek_at(length) == ' ' {
            length += 1;
        }
        let whitespaces = self.prefix(length);
        self.forward(length);

        let mut chunks = String::new();
        if is_break(self.peek()) {
            let line_break = self.scan_line_break();
            self.allow_simple_key = true;
            if self.at_document_separator() {
                return None;
            }
            let mut breaks = String::new();
            while self.peek() == ' ' || is_break(self.peek()) {
                if self.peek() == ' ' {
                    self.forward(1);
                } else {
                    if let Some(lb) = self.scan_line_break() {
                        breaks.push(lb);
                    }
                    if self.at_document_separator() {
                        return None;
                    }
                }
            }
            match line_break {
                Some('\n') if breaks.is_empty() => chunks.push(' '),
                Some('\n') | None => {}
                Some(lb) => chunks.push(lb),
            }
            chunks.push_str(&breaks);
        } else {
            chunks.push_str(&whitespaces);
        }
        Some(chunks)
    }

    fn at_document_separator(&self) -> bool {
        (self.prefix_is("---") || self.prefix_is("...")) && is_blank_or_end(self.peek_at(3))
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        let mut scanner = Scanner::new(source);
        let mut out = Vec::new();
        while let Some(token) = scanner.next_token().expect("scan failed") {
            out.push(token.kind);
        }
        out
    }

    fn scan_error(source: &str) -> SyntaxError {
        let mut scanner = Scanner::new(source);
        loop {
            match scanner.next_token() {
                Ok(Some(_)) => continue,
                Ok(None) => panic!("expected a scanner error for {:?}", source),
                Err(err) => return err,
            }
        }
    }

    fn scalar(value: &str) -> TokenKind {
        TokenKind::Scalar {
            value: value.to_string(),
            style: ScalarStyle::Plain,
        }
    }

    #[test]
    fn diagnostics_quote_characters_classically() {
        let err = scan_error("- &'x\n");
        assert_eq!(
            err.problem,
            "expected alphabetic or numeric character, but found \"'\""
        );
        assert_eq!(err.context.as_deref(), Some("while scanning an anchor"));

        let err = scan_error("- *");
        assert_eq!(
            err.problem,
            "expected alphabetic or numeric character, but found '\\x00'"
        );

        assert_eq!(repr('a'), "'a'");
        assert_eq!(repr('\t'), "'\\t'");
        assert_eq!(repr('\u{2028}'), "'\\u2028'");
    }

    #[test]
    fn simple_key_inserts_mapping_start_before_scalar() {
        assert_eq!(
            kinds("a: b\n"),
            vec![
                TokenKind::StreamStart,
                TokenKind::BlockMappingStart,
                TokenKind::Key,
                scalar("a"),
                TokenKind::Value,
                scalar("b"),
                TokenKind::BlockEnd,
                TokenKind::StreamEnd,
            ]
        );
    }

    #[test]
    fn block_sequence_tokens() {
        assert_eq!(
            kinds("- x\n- y"),
            vec![
                TokenKind::StreamStart,
                TokenKind::BlockSequenceStart,
                TokenKind::BlockEntry,
                scalar("x"),
                TokenKind::BlockEntry,
                scalar("y"),
                TokenKind::BlockEnd,
                TokenKind::StreamEnd,
            ]
        );
    }

    #[test]
    fn multi_line_plain_scalar_is_folded() {
        let tokens = kinds("- hosts\n  all\n");
        assert!(tokens.contains(&scalar("hosts all")), "got {:?}", tokens);
    }

    #[test]
    fn required_key_without_colon_is_reported() {
        let err = scan_error("- a: 1\n  b\n");
        assert_eq!(err.problem, "could not find expected ':'");
        assert_eq!(err.context.as_deref(), Some("while scanning a simple key"));
        let context = err.context_mark.expect("context mark");
        assert_eq!((context.line, context.column), (1, 2));
    }

    #[test]
    fn mapping_value_after_multi_line_scalar_is_rejected() {
        let err = scan_error("- hosts\n  hosts: all\n");
        assert_eq!(err.problem, "mapping values are not allowed here");
        assert_eq!(err.context, None);
        assert_eq!(err.problem_mark.line, 1);
    }

    #[test]
    fn unterminated_quote_reports_end_of_stream() {
        let source = "- name: \"hoge\n    fuga\n";
        let err = scan_error(source);
        assert_eq!(err.problem, "found unexpected end of stream");
        assert_eq!(err.context.as_deref(), Some("while scanning a quoted scalar"));
        assert_eq!(err.context_mark.map(|m| m.index), Some(8));
        assert_eq!(err.problem_mark.index, source.chars().count());
    }

    #[test]
    fn double_quoted_escapes() {
        let tokens = kinds(r#""a\tb\u0041""#);
        assert!(tokens.contains(&TokenKind::Scalar {
            value: "a\tbA".to_string(),
            style: ScalarStyle::DoubleQuoted,
        }));
    }

    #[test]
    fn literal_block_scalar_keeps_newlines() {
        let tokens = kinds("x: |\n  one\n  two\n");
        assert!(tokens.contains(&TokenKind::Scalar {
            value: "one\ntwo\n".to_string(),
            style: ScalarStyle::Literal,
        }));
    }

    #[test]
    fn folded_block_scalar_joins_lines() {
        let tokens = kinds("x: >-\n  one\n  two\n");
        assert!(tokens.contains(&TokenKind::Scalar {
            value: "one two".to_string(),
            style: ScalarStyle::Folded,
        }));
    }

    #[test]
    fn tags_and_anchors() {
        let tokens = kinds("- !!str &a 1\n- *a\n");
        assert!(tokens.contains(&TokenKind::Tag {
            handle: Some("!!".to_string()),
            suffix: "str".to_string(),
        }));
        assert!(tokens.contains(&TokenKind::Anchor("a".to_string())));
        assert!(tokens.contains(&TokenKind::Alias("a".to_string())));
    }

    #[test]
    fn tab_cannot_start_a_token() {
        let err = scan_error("a:\n\tb: c\n");
        assert!(err.problem.contains("cannot start any token"), "{}", err);
    }

    #[test]
    fn marks_count_characters_not_bytes() {
        let mut scanner = Scanner::new("é: ü\n");
        let mut last = None;
        while let Some(token) = scanner.next_token().unwrap() {
            if let TokenKind::Scalar { value, .. } = &token.kind
                && value == "ü"
            {
                last = Some(token.start);
            }
        }
        let mark = last.expect("scalar token");
        assert_eq!((mark.index, mark.line, mark.column), (3, 0, 3));
    }
}
