//! Splits a document into top-level commands
//!
//! Editor queries only parse and bind the command under the cursor (plus the
//! commands before it for variable types), so the document is cut at every
//! `NewCommand` dash first.

use serde::Serialize;
use tracing::debug;

use super::lexer::lex;
use super::token::{Token, TokenKind};
use crate::position::{LinePosition, SourcePos};

/// One top-level statement and where it sits in the document
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Command {
    pub text: String,
    pub start_position: LinePosition,
    #[serde(skip)]
    pub start: SourcePos,
}

/// Split `text` at every `NewCommand` token. Never fails.
pub fn split_commands(text: &str) -> Vec<Command> {
    let tokens = lex(text);
    let mut commands = Vec::new();
    let mut buffer: Vec<&Token> = Vec::new();

    for token in &tokens {
        match token.kind {
            TokenKind::NewCommand => {
                flush(text, &buffer, &mut commands);
                buffer.clear();
                buffer.push(token);
            }
            TokenKind::EndOfInput => flush(text, &buffer, &mut commands),
            _ => buffer.push(token),
        }
    }

    debug!(count = commands.len(), "split document into commands");
    commands
}

fn flush(source: &str, buffer: &[&Token], commands: &mut Vec<Command>) {
    let content: Vec<&Token> = buffer
        .iter()
        .copied()
        .skip_while(|t| t.kind == TokenKind::Newline)
        .collect();

    let blank = content
        .iter()
        .all(|t| matches!(t.kind, TokenKind::Newline | TokenKind::Whitespace));
    if blank {
        return;
    }

    let (Some(first), Some(last)) = (content.first(), content.last()) else {
        return;
    };
    let text = source
        .get(first.start.index..last.stop.index)
        .unwrap_or_default()
        .to_string();
    commands.push(Command {
        text,
        start_position: first.start.to_line_position(),
        start: first.start,
    });
}
