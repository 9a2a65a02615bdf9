//! Syntax Error Matchers
//!
//! The grammar only knows which token it could not accept. Matchers look at
//! the error context (the innermost partial node), the offending token and a
//! best-effort IR of the context, and turn common mistakes into specific
//! messages.
//!
//! # Architecture
//!
//! 1. **ErrorMatcher trait** - Each matcher implements this trait
//! 2. **MatcherChain** - Tries matchers in order; the first match wins
//! 3. **Fallback** - Unmatched errors become `Syntax error: {message}`
//!
//! # Adding a New Matcher
//!
//! 1. Create a new file in `error_matchers/rules/`
//! 2. Implement `ErrorMatcher` for your struct
//! 3. Add it to `MatcherChain::new()` at the position it should be tried

pub mod rules;

use std::cell::OnceCell;

use tracing::trace;

use super::cst::Node;
use super::grammar::SyntaxErrorRecord;
use super::token::Token;
use crate::errors::{ErrorKind, ErrorList, SingleError};
use crate::ir::{visit_lenient, FreezableStepProperty};

// ============================================================================
// Lazy partial IR
// ============================================================================

/// IR of an error context, visited leniently at most once
pub struct LazyPartialIr<'a> {
    context: &'a Node,
    ir: OnceCell<Option<FreezableStepProperty>>,
}

impl<'a> LazyPartialIr<'a> {
    pub fn new(context: &'a Node) -> Self {
        Self {
            context,
            ir: OnceCell::new(),
        }
    }

    pub fn get(&self) -> Option<&FreezableStepProperty> {
        self.ir.get_or_init(|| visit_lenient(self.context)).as_ref()
    }

    pub fn is_computed(&self) -> bool {
        self.ir.get().is_some()
    }
}

// ============================================================================
// ErrorMatcher Trait
// ============================================================================

/// Trait that all error matchers must implement.
pub trait ErrorMatcher: Send + Sync {
    /// Unique identifier for this matcher (e.g., "unclosed-parentheses")
    fn id(&self) -> &'static str;

    /// Return a specific error when this matcher recognises the mistake
    fn try_match(
        &self,
        context: &Node,
        offending: &Token,
        partial_ir: &LazyPartialIr<'_>,
    ) -> Option<SingleError>;
}

// ============================================================================
// MatcherChain
// ============================================================================

pub struct MatcherChain {
    matchers: Vec<Box<dyn ErrorMatcher>>,
}

impl MatcherChain {
    /// Create a chain with every built-in matcher, in priority order.
    pub fn new() -> Self {
        Self {
            matchers: vec![
                Box::new(rules::UnclosedParenthesesMatcher),
                Box::new(rules::OrderedAfterNamedMatcher),
                Box::new(rules::UnclosedVariableMatcher),
            ],
        }
    }

    /// The error to report for one syntax error record
    pub fn classify(&self, record: &SyntaxErrorRecord) -> SingleError {
        let partial_ir = LazyPartialIr::new(&record.context);
        for matcher in &self.matchers {
            if let Some(error) = matcher.try_match(&record.context, &record.offending, &partial_ir) {
                trace!(matcher = matcher.id(), "syntax error matched");
                return error;
            }
        }
        SingleError::at(
            ErrorKind::Syntax(record.message.clone()),
            &record.offending.location(),
        )
    }

    pub fn matchers(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.matchers.iter().map(|m| m.id())
    }
}

impl Default for MatcherChain {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Public API
// ============================================================================

/// Turn every syntax error record into a user-facing error
pub fn syntax_errors(records: &[SyntaxErrorRecord]) -> ErrorList {
    let chain = MatcherChain::new();
    records.iter().map(|r| chain.classify(r)).collect()
}

#[cfg(test)]
mod tests;
