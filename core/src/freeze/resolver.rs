//! Variable types for editor queries

use std::cell::OnceCell;
use std::collections::BTreeMap;

use tracing::debug;

use super::freeze_property;
use crate::ir::{visit, visit_lenient, VariableName};
use crate::parser::{parse_command, Command};
use crate::position::{LinePosition, TextLocation};
use crate::steps::StepFactoryStore;
use crate::types::TypeReference;

/// One place a variable is given a value
#[derive(Debug, Clone, PartialEq)]
pub struct VariableDefinition {
    pub location: TextLocation,
    pub type_reference: TypeReference,
}

/// Variable name to every definition seen so far, in textual order
#[derive(Debug, Clone, Default)]
pub struct TypeResolver {
    variables: BTreeMap<VariableName, Vec<VariableDefinition>>,
}

impl TypeResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Freeze `commands` in order and keep the variables they bind.
    ///
    /// A command that does not parse is visited leniently; one that does not
    /// freeze still contributes the variables bound before its failure.
    pub fn for_commands(commands: &[Command], store: &StepFactoryStore) -> Self {
        let mut resolver = TypeResolver::new();
        for command in commands {
            let output = parse_command(command);
            let property = if output.is_ok() {
                visit(&output.root).ok()
            } else {
                visit_lenient(&output.root)
            };
            let Some(property) = property else {
                continue;
            };
            if let Err(errors) = freeze_property(&property, store, &mut resolver) {
                debug!(
                    line = command.start.line,
                    errors = errors.len(),
                    "command did not freeze while resolving variables"
                );
            }
        }
        resolver
    }

    pub fn record(&mut self, name: VariableName, location: TextLocation, type_reference: TypeReference) {
        let definitions = self.variables.entry(name).or_default();
        let at = definitions.partition_point(|d| d.location.start <= location.start);
        definitions.insert(
            at,
            VariableDefinition {
                location,
                type_reference,
            },
        );
    }

    /// Type of the textually last definition
    pub fn latest(&self, name: &VariableName) -> Option<&TypeReference> {
        self.variables
            .get(name)
            .and_then(|defs| defs.last())
            .map(|d| &d.type_reference)
    }

    /// Type of the last definition starting at or before `position`, or of
    /// the last definition when none does
    pub fn type_at(&self, name: &VariableName, position: LinePosition) -> Option<&TypeReference> {
        let definitions = self.variables.get(name)?;
        definitions
            .iter()
            .rev()
            .find(|d| d.location.starts_at_or_before(position))
            .or_else(|| definitions.last())
            .map(|d| &d.type_reference)
    }

    pub fn definitions(&self, name: &VariableName) -> &[VariableDefinition] {
        self.variables.get(name).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn names(&self) -> impl Iterator<Item = &VariableName> {
        self.variables.keys()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }
}

/// Builds a [`TypeResolver`] for the commands up to and including one
/// command, the first time it is asked for
pub struct LazyTypeResolver<'a> {
    commands: &'a [Command],
    store: &'a StepFactoryStore,
    resolver: OnceCell<TypeResolver>,
}

impl<'a> LazyTypeResolver<'a> {
    /// `commands` should end with the command of interest
    pub fn new(commands: &'a [Command], store: &'a StepFactoryStore) -> Self {
        Self {
            commands,
            store,
            resolver: OnceCell::new(),
        }
    }

    pub fn get(&self) -> &TypeResolver {
        self.resolver
            .get_or_init(|| TypeResolver::for_commands(self.commands, self.store))
    }

    pub fn is_resolved(&self) -> bool {
        self.resolver.get().is_some()
    }
}
