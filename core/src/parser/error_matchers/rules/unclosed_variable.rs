//! Matcher: Unclosed Variable
//!
//! ```text
//! Print <name
//! ```

use crate::errors::{ErrorKind, SingleError};
use crate::parser::cst::Node;
use crate::parser::token::{Token, TokenKind};

use super::super::{ErrorMatcher, LazyPartialIr};

pub struct UnclosedVariableMatcher;

impl ErrorMatcher for UnclosedVariableMatcher {
    fn id(&self) -> &'static str {
        "unclosed-variable"
    }

    fn try_match(
        &self,
        _context: &Node,
        offending: &Token,
        _partial_ir: &LazyPartialIr<'_>,
    ) -> Option<SingleError> {
        if offending.kind != TokenKind::UnclosedVariable {
            return None;
        }
        let name = offending.text.trim_start_matches('<').to_string();
        Some(SingleError::at(
            ErrorKind::UnclosedVariable(name),
            &offending.location(),
        ))
    }
}
