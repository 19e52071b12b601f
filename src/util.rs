/// Position helpers shared by the server and the CLI.
use tower_lsp::lsp_types::{MessageType, Position};

use crate::Backend;
use crate::types::Cursor;

/// The cursor used when a request does not give one: the end of the last
/// line of `text`.
pub fn default_cursor(text: &str) -> Cursor {
    match text.lines().enumerate().last() {
        Some((line, content)) => Cursor::new(line, content.chars().count()),
        None => Cursor::default(),
    }
}

/// Convert an LSP position (UTF-16 code units) into a character cursor.
pub fn cursor_from_position(text: &str, position: Position) -> Cursor {
    let line = position.line as usize;
    let Some(content) = text.lines().nth(line) else {
        return Cursor::new(line, position.character as usize);
    };

    let target = position.character as usize;
    let mut units = 0;
    let mut column = 0;
    for c in content.chars() {
        if units >= target {
            break;
        }
        units += c.len_utf16();
        column += 1;
    }
    Cursor::new(line, column)
}

impl Backend {
    pub(crate) async fn log(&self, typ: MessageType, message: String) {
        if let Some(client) = &self.client {
            client.log_message(typ, message).await;
        }
    }
}
