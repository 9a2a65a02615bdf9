//! Whole-document compilation: parse, visit and freeze

use tracing::debug;

use crate::errors::ErrorList;
use crate::freeze::{freeze_property, BoundStep, TypeResolver};
use crate::ir::visit;
use crate::parser::error_matchers::syntax_errors;
use crate::parser::parse;
use crate::steps::StepFactoryStore;

/// Compile a document into a bound step graph
///
/// Syntax errors are reported through the error matchers, so a failed parse
/// yields the same messages the editor shows.
pub fn compile(text: &str, store: &StepFactoryStore) -> Result<BoundStep, ErrorList> {
    let output = parse(text);
    if !output.is_ok() {
        debug!(errors = output.errors.len(), "document did not parse");
        return Err(syntax_errors(&output.errors));
    }

    let property = visit(&output.root)?;
    let mut resolver = TypeResolver::new();
    let step = freeze_property(&property, store, &mut resolver)?;
    debug!(output_type = %step.output_type, "document compiled");
    Ok(step)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use crate::steps::core_store;
    use crate::types::TypeReference;

    #[test]
    fn test_compile_sequence() {
        let store = core_store();
        let step = compile("- <x> = 1\n- Print <x>\n", &store).unwrap();
        assert_eq!(step.name(), Some("Sequence"));
        assert_eq!(step.output_type, TypeReference::UNIT);
    }

    #[test]
    fn test_compile_empty_document() {
        let store = core_store();
        let step = compile("", &store).unwrap();
        assert_eq!(step.name(), Some("Sequence"));
    }

    #[test]
    fn test_syntax_errors_go_through_matchers() {
        let store = core_store();
        let errors = compile("Foo (1, 2", &store).unwrap_err();
        assert_eq!(errors.kinds(), vec![&ErrorKind::UnclosedParentheses]);
    }

    #[test]
    fn test_freeze_errors_are_returned() {
        let store = core_store();
        let errors = compile("- Print 1\n- Nope 2", &store).unwrap_err();
        assert_eq!(errors.kinds(), vec![&ErrorKind::UnknownStep("Nope".to_string())]);
    }
}
