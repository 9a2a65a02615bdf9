//! Matcher: Ordered After Named
//!
//! Positional arguments must come before named ones.
//!
//! # Matches
//!
//! ```text
//! Foo a: 1 2
//! Foo(a: 1, 2)
//! ```

use crate::errors::{ErrorKind, SingleError};
use crate::ir::{FreezableStep, FreezableStepProperty, ParameterRef};
use crate::parser::cst::Node;
use crate::parser::token::Token;

use super::super::{ErrorMatcher, LazyPartialIr};

pub struct OrderedAfterNamedMatcher;

impl ErrorMatcher for OrderedAfterNamedMatcher {
    fn id(&self) -> &'static str {
        "ordered-after-named"
    }

    fn try_match(
        &self,
        _context: &Node,
        offending: &Token,
        partial_ir: &LazyPartialIr<'_>,
    ) -> Option<SingleError> {
        if !offending.kind.starts_term() {
            return None;
        }
        let Some(FreezableStepProperty::Step(FreezableStep::Compound { arguments, .. })) =
            partial_ir.get()
        else {
            return None;
        };
        arguments
            .keys()
            .any(|key| matches!(key, ParameterRef::Named(_)))
            .then(|| SingleError::at(ErrorKind::OrderedAfterNamed, &offending.location()))
    }
}
