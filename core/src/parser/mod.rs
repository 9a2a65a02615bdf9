//! SCL parser
//!
//! Text is tokenized by a pest grammar (`scl.pest`), then a hand-written
//! recursive-descent grammar builds a concrete syntax tree that survives
//! syntax errors. Editor queries rely on those partial trees; the compile
//! path rejects any tree with errors.

pub mod cst;
pub mod error_matchers;
pub mod grammar;
pub mod lexer;
pub mod splitter;
pub mod token;

#[cfg(test)]
mod tests;

use tracing::debug;

pub use cst::{Node, NodeKind};
pub use grammar::SyntaxErrorRecord;
pub use lexer::{lex, lex_at, partial_variable};
pub use splitter::{split_commands, Command};
pub use token::{Token, TokenKind};

use crate::position::SourcePos;

/// Everything a parse produces, successful or not
#[derive(Debug, Clone)]
pub struct ParseOutput {
    /// All tokens including hidden ones, closed by `EndOfInput`
    pub tokens: Vec<Token>,
    /// Root `Document` node; partial nodes mark where errors occurred
    pub root: Node,
    pub errors: Vec<SyntaxErrorRecord>,
}

impl ParseOutput {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Parse a whole document
pub fn parse(text: &str) -> ParseOutput {
    parse_at(text, SourcePos::START)
}

/// Parse `text` as though it started at `origin` in a larger document
pub fn parse_at(text: &str, origin: SourcePos) -> ParseOutput {
    let tokens = lex_at(text, origin);
    let (root, errors) = grammar::Grammar::new(text, origin, &tokens).document();
    if !errors.is_empty() {
        debug!(count = errors.len(), line = origin.line, "parse finished with syntax errors");
    }
    ParseOutput {
        tokens,
        root,
        errors,
    }
}

/// Parse one command in document coordinates
pub fn parse_command(command: &Command) -> ParseOutput {
    parse_at(&command.text, command.start)
}
