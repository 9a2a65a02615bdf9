//! Error Matchers
//!
//! Each file in this module contains one matcher:
//!
//! - `unclosed_parentheses.rs` - A `(` that is never closed
//! - `ordered_after_named.rs` - A positional argument after a named one
//! - `unclosed_variable.rs` - A `<name` without its closing `>`

mod ordered_after_named;
mod unclosed_parentheses;
mod unclosed_variable;

pub use ordered_after_named::OrderedAfterNamedMatcher;
pub use unclosed_parentheses::UnclosedParenthesesMatcher;
pub use unclosed_variable::UnclosedVariableMatcher;
