//! Matcher: Unclosed Parentheses
//!
//! Reports a `(` that the grammar was still inside when it gave up.
//!
//! # Matches
//!
//! ```text
//! Foo (1, 2          # bracketed step never closed
//! Foo(1, 2           # call form never closed
//! ```

use crate::errors::{ErrorKind, SingleError};
use crate::parser::cst::{Node, NodeKind};
use crate::parser::token::{Token, TokenKind};

use super::super::{ErrorMatcher, LazyPartialIr};

pub struct UnclosedParenthesesMatcher;

impl ErrorMatcher for UnclosedParenthesesMatcher {
    fn id(&self) -> &'static str {
        "unclosed-parentheses"
    }

    fn try_match(
        &self,
        context: &Node,
        offending: &Token,
        _partial_ir: &LazyPartialIr<'_>,
    ) -> Option<SingleError> {
        let open = opening_paren(context, offending)?;
        Some(SingleError::at(ErrorKind::UnclosedParentheses, &open.location()))
    }
}

fn opening_paren<'a>(context: &'a Node, offending: &'a Token) -> Option<&'a Token> {
    if offending.kind == TokenKind::OpenParen {
        return Some(offending);
    }
    if !context.is_partial() {
        return None;
    }
    if context.starts_with(TokenKind::OpenParen) {
        return Some(&context.start);
    }

    // The call form only counts when the input ran out inside it
    let ran_out = matches!(offending.kind, TokenKind::EndOfInput | TokenKind::NewCommand);
    match &context.kind {
        NodeKind::Function(call) if ran_out => call.open.as_ref(),
        _ => None,
    }
}
