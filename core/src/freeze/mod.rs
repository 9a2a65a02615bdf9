//! Binding IR to step factories
//!
//! Freezing turns a [`FreezableStep`] into a [`BoundStep`]: step names are
//! looked up in the [`StepFactoryStore`], argument keys are matched to
//! parameters, every argument is frozen against the type its parameter
//! expects and the output type is inferred by the factory.
//!
//! Errors from independent arguments are collected together. A step only
//! gives up early when its name is unknown, since nothing else about it can
//! be checked without a factory.

pub mod resolver;

#[cfg(test)]
mod tests;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use tracing::trace;

use crate::errors::{collect_all, ErrorKind, ErrorList, SingleError};
use crate::ir::{
    ConstantValue, FreezableStep, FreezableStepProperty, ParameterRef, StepMetadata, VariableName,
};
use crate::position::TextLocation;
use crate::steps::{ParameterDescriptor, ParameterKind, StepFactory, StepFactoryStore};
use crate::types::TypeReference;

pub use resolver::{LazyTypeResolver, TypeResolver, VariableDefinition};

// ============================================================================
// Bound graph
// ============================================================================

/// Bound arguments keyed by canonical parameter name
pub type BoundArguments = BTreeMap<String, BoundArgument>;

#[derive(Debug, Clone)]
pub enum BoundArgument {
    Step(BoundStep),
    StepList(Vec<BoundStep>),
    Lambda {
        variable: VariableName,
        /// Written as a plain step and bound over `<item>`
        implicit: bool,
        body: Box<BoundStep>,
        location: TextLocation,
    },
    Variable {
        name: VariableName,
        location: TextLocation,
    },
}

impl BoundArgument {
    /// Type of the value this argument supplies
    pub fn output_type(&self) -> TypeReference {
        match self {
            BoundArgument::Step(step) => step.output_type.clone(),
            BoundArgument::StepList(steps) => {
                let types: Vec<TypeReference> =
                    steps.iter().map(|s| s.output_type.clone()).collect();
                TypeReference::array_of(TypeReference::combine(&types))
            }
            BoundArgument::Lambda { body, .. } => body.output_type.clone(),
            BoundArgument::Variable { .. } => TypeReference::Any,
        }
    }

    pub fn location(&self) -> Option<&TextLocation> {
        match self {
            BoundArgument::Step(step) => Some(&step.location),
            BoundArgument::StepList(steps) => steps.first().map(|s| &s.location),
            BoundArgument::Lambda { location, .. } | BoundArgument::Variable { location, .. } => {
                Some(location)
            }
        }
    }

    pub fn as_step(&self) -> Option<&BoundStep> {
        match self {
            BoundArgument::Step(step) => Some(step),
            _ => None,
        }
    }
}

#[derive(Clone)]
pub enum BoundStepKind {
    Constant(ConstantValue),
    Compound {
        factory: Arc<dyn StepFactory>,
        arguments: BoundArguments,
    },
}

impl fmt::Debug for BoundStepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoundStepKind::Constant(value) => f.debug_tuple("Constant").field(value).finish(),
            BoundStepKind::Compound { factory, arguments } => f
                .debug_struct("Compound")
                .field("step", &factory.type_name())
                .field("arguments", arguments)
                .finish(),
        }
    }
}

/// A step whose name, arguments and output type have been checked
#[derive(Debug, Clone)]
pub struct BoundStep {
    pub kind: BoundStepKind,
    pub output_type: TypeReference,
    pub location: TextLocation,
    pub metadata: StepMetadata,
}

impl BoundStep {
    /// Canonical step name, `None` for constants
    pub fn name(&self) -> Option<&str> {
        self.factory().map(|f| f.type_name())
    }

    pub fn factory(&self) -> Option<&Arc<dyn StepFactory>> {
        match &self.kind {
            BoundStepKind::Compound { factory, .. } => Some(factory),
            BoundStepKind::Constant(_) => None,
        }
    }

    pub fn arguments(&self) -> Option<&BoundArguments> {
        match &self.kind {
            BoundStepKind::Compound { arguments, .. } => Some(arguments),
            BoundStepKind::Constant(_) => None,
        }
    }

    pub fn argument(&self, name: &str) -> Option<&BoundArgument> {
        self.arguments().and_then(|a| a.get(name))
    }

    pub fn constant(&self) -> Option<&ConstantValue> {
        match &self.kind {
            BoundStepKind::Constant(value) => Some(value),
            BoundStepKind::Compound { .. } => None,
        }
    }
}

// ============================================================================
// Freezing
// ============================================================================

/// Where a step is being frozen: the parameter it fills and what that
/// parameter expects
#[derive(Debug, Clone, Copy)]
pub struct CallerContext<'a> {
    pub step: &'a str,
    pub parameter: &'a str,
    pub expected: &'a TypeReference,
}

/// Freeze a top-level step, recording variable bindings on `resolver`
pub fn freeze(
    step: &FreezableStep,
    store: &StepFactoryStore,
    resolver: &mut TypeResolver,
) -> Result<BoundStep, ErrorList> {
    Freezer::new(store, resolver).freeze_step(step, None)
}

/// Freeze the property a visit produced
pub fn freeze_property(
    property: &FreezableStepProperty,
    store: &StepFactoryStore,
    resolver: &mut TypeResolver,
) -> Result<BoundStep, ErrorList> {
    let step = property
        .clone()
        .into_step()
        .map_err(|lambda| ErrorList::at(ErrorKind::UnboundLambda, lambda.location()))?;
    freeze(&step, store, resolver)
}

pub struct Freezer<'a> {
    store: &'a StepFactoryStore,
    resolver: &'a mut TypeResolver,
}

impl<'a> Freezer<'a> {
    pub fn new(store: &'a StepFactoryStore, resolver: &'a mut TypeResolver) -> Self {
        Self { store, resolver }
    }

    pub fn freeze_step(
        &mut self,
        step: &FreezableStep,
        caller: Option<CallerContext<'_>>,
    ) -> Result<BoundStep, ErrorList> {
        let bound = match step {
            FreezableStep::Constant {
                value,
                location,
                metadata,
            } => {
                let value = self.check_enum(value, location)?;
                BoundStep {
                    output_type: value.type_reference(),
                    kind: BoundStepKind::Constant(value),
                    location: location.clone(),
                    metadata: *metadata,
                }
            }
            FreezableStep::Compound {
                name,
                arguments,
                location,
                metadata,
            } => self.freeze_compound(name, arguments, location, *metadata)?,
        };

        match caller {
            Some(caller) => check_caller(bound, caller),
            None => Ok(bound),
        }
    }

    /// Enum constants must name a registered enum and one of its members.
    /// The member is rewritten to its declared spelling.
    fn check_enum(
        &self,
        value: &ConstantValue,
        location: &TextLocation,
    ) -> Result<ConstantValue, ErrorList> {
        let ConstantValue::Enum { enum_type, member } = value else {
            return Ok(value.clone());
        };
        let Some(descriptor) = self.store.get_enum(enum_type) else {
            return Err(ErrorList::at(ErrorKind::UnknownEnum(enum_type.clone()), location));
        };
        match descriptor.member(member) {
            Some(found) => Ok(ConstantValue::Enum {
                enum_type: descriptor.name.clone(),
                member: found.to_string(),
            }),
            None => Err(ErrorList::at(
                ErrorKind::UnknownEnumMember {
                    enum_type: descriptor.name.clone(),
                    member: member.clone(),
                },
                location,
            )),
        }
    }

    fn freeze_compound(
        &mut self,
        name: &str,
        arguments: &BTreeMap<ParameterRef, FreezableStepProperty>,
        location: &TextLocation,
        metadata: StepMetadata,
    ) -> Result<BoundStep, ErrorList> {
        let Some(factory) = self.store.get(name).cloned() else {
            return Err(ErrorList::at(ErrorKind::UnknownStep(name.to_string()), location));
        };
        let step_name = factory.type_name().to_string();
        let mut errors = ErrorList::empty();

        // Match every key to a parameter
        let mut supplied: Vec<(ParameterDescriptor, &FreezableStepProperty)> = Vec::new();
        for (key, property) in arguments {
            let parameter = match factory.find_parameter(key) {
                Some(parameter) => parameter.clone(),
                None => match key {
                    ParameterRef::Named(extra) if factory.accepts_extra_named_arguments() => {
                        ParameterDescriptor::step(extra.clone(), TypeReference::Any)
                    }
                    _ => {
                        errors.push(SingleError::at(
                            ErrorKind::UnknownParameter {
                                step: step_name.clone(),
                                parameter: key.to_string(),
                            },
                            property.location(),
                        ));
                        continue;
                    }
                },
            };
            if supplied.iter().any(|(p, _)| p.name == parameter.name) {
                errors.push(SingleError::at(
                    ErrorKind::DuplicateParameter {
                        step: step_name.clone(),
                        parameter: parameter.name.clone(),
                    },
                    property.location(),
                ));
                continue;
            }
            supplied.push((parameter, property));
        }

        for parameter in factory.parameters() {
            if parameter.required && !supplied.iter().any(|(p, _)| p.name == parameter.name) {
                errors.push(SingleError::at(
                    ErrorKind::MissingRequiredParameter {
                        step: step_name.clone(),
                        parameter: parameter.name.clone(),
                    },
                    location,
                ));
            }
        }

        // Lambdas last, so their variable can be typed from the other arguments
        let mut bound = BoundArguments::new();
        let (lambdas, others): (Vec<_>, Vec<_>) = supplied
            .into_iter()
            .partition(|(p, _)| p.kind == ParameterKind::Lambda);

        for (parameter, property) in others {
            match self.bind_argument(&step_name, &parameter, property) {
                Ok(argument) => {
                    bound.insert(parameter.name.clone(), argument);
                }
                Err(e) => errors.extend(e),
            }
        }
        for (parameter, property) in lambdas {
            match self.bind_lambda(factory.as_ref(), &parameter, property, &bound) {
                Ok(argument) => {
                    bound.insert(parameter.name.clone(), argument);
                }
                Err(e) => errors.extend(e),
            }
        }

        if !errors.is_empty() {
            trace!(step = %step_name, errors = errors.len(), "step failed to freeze");
            return Err(errors);
        }

        let output_type = factory.infer_output_type(&bound, &*self.resolver)?;
        for (variable, type_reference) in factory.bound_variables(&bound) {
            self.resolver.record(variable, location.clone(), type_reference);
        }

        Ok(BoundStep {
            kind: BoundStepKind::Compound {
                factory,
                arguments: bound,
            },
            output_type,
            location: location.clone(),
            metadata,
        })
    }

    fn bind_argument(
        &mut self,
        step: &str,
        parameter: &ParameterDescriptor,
        property: &FreezableStepProperty,
    ) -> Result<BoundArgument, ErrorList> {
        let caller = CallerContext {
            step,
            parameter: &parameter.name,
            expected: &parameter.expected_type,
        };
        let wrong = |kind: ErrorKind| Err(ErrorList::at(kind, property.location()));

        match parameter.kind {
            ParameterKind::Variable => match property {
                FreezableStepProperty::Variable { name, location } => Ok(BoundArgument::Variable {
                    name: name.clone(),
                    location: location.clone(),
                }),
                _ => wrong(ErrorKind::ExpectedVariable {
                    step: step.to_string(),
                    parameter: parameter.name.clone(),
                }),
            },
            ParameterKind::StepList => match property {
                FreezableStepProperty::StepList { steps, .. } => {
                    let results: Vec<_> = steps
                        .iter()
                        .map(|s| self.freeze_step(s, Some(caller)))
                        .collect();
                    collect_all(results).map(BoundArgument::StepList)
                }
                _ => wrong(ErrorKind::ExpectedStepList {
                    step: step.to_string(),
                    parameter: parameter.name.clone(),
                }),
            },
            ParameterKind::Step | ParameterKind::Lambda => match property.clone().into_step() {
                Ok(inner) => self.freeze_step(&inner, Some(caller)).map(BoundArgument::Step),
                Err(_) => wrong(ErrorKind::UnexpectedLambda {
                    step: step.to_string(),
                    parameter: parameter.name.clone(),
                }),
            },
        }
    }

    /// Bind a lambda argument; a plain step becomes a lambda over `<item>`
    fn bind_lambda(
        &mut self,
        factory: &dyn StepFactory,
        parameter: &ParameterDescriptor,
        property: &FreezableStepProperty,
        bound: &BoundArguments,
    ) -> Result<BoundArgument, ErrorList> {
        let (variable, implicit, body, location) = match property {
            FreezableStepProperty::Lambda {
                variable,
                body,
                location,
            } => (
                variable.clone().unwrap_or_else(VariableName::item),
                variable.is_none(),
                body.as_ref().clone(),
                location.clone(),
            ),
            other => {
                let location = other.location().clone();
                let body = other.clone().into_step().map_err(|lambda| {
                    ErrorList::at(ErrorKind::UnboundLambda, lambda.location())
                })?;
                (VariableName::item(), true, body, location)
            }
        };

        let variable_type = factory.lambda_variable_type(parameter, bound);
        self.resolver
            .record(variable.clone(), location.clone(), variable_type);
        let body = self.freeze_step(&body, None)?;

        Ok(BoundArgument::Lambda {
            variable,
            implicit,
            body: Box::new(body),
            location,
        })
    }
}

/// Check a frozen step against the type its parameter expects
fn check_caller(step: BoundStep, caller: CallerContext<'_>) -> Result<BoundStep, ErrorList> {
    if matches!(caller.expected, TypeReference::Any | TypeReference::Variable(_)) {
        return Ok(step);
    }
    if let TypeReference::Multiple(candidates) = &step.output_type {
        let candidates: Vec<String> = candidates.iter().map(|c| c.to_string()).collect();
        return Err(ErrorList::at(
            ErrorKind::AmbiguousType {
                step: caller.step.to_string(),
                parameter: caller.parameter.to_string(),
                candidates: candidates.join(", "),
            },
            &step.location,
        ));
    }
    if !step.output_type.is_assignable_to(caller.expected) {
        return Err(ErrorList::at(
            ErrorKind::TypeMismatch {
                step: caller.step.to_string(),
                parameter: caller.parameter.to_string(),
                expected: caller.expected.to_string(),
                actual: step.output_type.to_string(),
            },
            &step.location,
        ));
    }
    Ok(step)
}
