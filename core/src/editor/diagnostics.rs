//! Diagnostics for a whole document

use tracing::{debug, trace};

use super::{Diagnostic, SEVERITY_ERROR};
use crate::compiler::compile;
use crate::errors::{ErrorList, SingleError};
use crate::freeze::{freeze_property, TypeResolver};
use crate::ir::{visit, visit_lenient};
use crate::parser::error_matchers::syntax_errors;
use crate::parser::{parse_command, split_commands, Command};
use crate::steps::StepFactoryStore;

/// Every error in the document, or nothing when it compiles
///
/// Each command is checked on its own, with the variables of the commands
/// before it in scope, so one broken command does not hide the errors of
/// the others.
pub fn get_diagnostics(text: &str, store: &StepFactoryStore) -> Vec<Diagnostic> {
    if compile(text, store).is_ok() {
        return Vec::new();
    }

    let mut resolver = TypeResolver::new();
    let mut diagnostics = Vec::new();
    for command in split_commands(text) {
        let errors = command_errors(&command, store, &mut resolver);
        diagnostics.extend(errors.iter().map(|e| diagnostic(e, &command)));
    }
    debug!(count = diagnostics.len(), "diagnostics computed");
    diagnostics
}

fn command_errors(
    command: &Command,
    store: &StepFactoryStore,
    resolver: &mut TypeResolver,
) -> ErrorList {
    let output = parse_command(command);
    if !output.is_ok() {
        // Keep whatever variables the broken command still binds
        if let Some(property) = visit_lenient(&output.root) {
            if let Err(errors) = freeze_property(&property, store, resolver) {
                trace!(
                    line = command.start.line,
                    errors = errors.len(),
                    "partial command did not freeze"
                );
            }
        }
        return syntax_errors(&output.errors);
    }
    match visit(&output.root) {
        Ok(property) => freeze_property(&property, store, resolver)
            .err()
            .unwrap_or_default(),
        Err(errors) => errors,
    }
}

fn diagnostic(error: &SingleError, command: &Command) -> Diagnostic {
    let (start, end) = match &error.location {
        Some(location) => (
            location.start.to_line_position(),
            location.stop.to_line_position(),
        ),
        None => (
            command.start_position,
            command.start.advance(&command.text).to_line_position(),
        ),
    };
    Diagnostic {
        start,
        end,
        message: error.message(),
        severity_code: SEVERITY_ERROR,
    }
}
