//! Step factories and the store they are registered in
//!
//! A [`StepFactory`] describes one step: its names, its parameters and how its
//! output type follows from its bound arguments. The binder looks factories
//! up by name in a [`StepFactoryStore`], which is built once and shared
//! read-only between requests.
//!
//! # Adding a Step
//!
//! 1. Implement [`StepFactory`] (or describe it with [`stdlib::CoreStep`])
//! 2. Register it with [`StepFactoryStoreBuilder::register`]

pub mod stdlib;

#[cfg(test)]
mod tests;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::warn;

use crate::freeze::{BoundArguments, TypeResolver};
use crate::errors::ErrorList;
use crate::ir::{ParameterRef, VariableName};
use crate::types::TypeReference;

pub use stdlib::{core_store, register_core_steps};

// ============================================================================
// Parameters
// ============================================================================

/// What an argument slot accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterKind {
    /// A single step (constants, variables and arrays are converted to steps)
    Step,
    /// A list of steps kept as a list
    StepList,
    /// A lambda; a plain step is accepted as a lambda over `<item>`
    Lambda,
    /// A variable name
    Variable,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParameterDescriptor {
    pub name: String,
    pub aliases: Vec<String>,
    /// Position when supplied without a name (1-based)
    pub order: Option<usize>,
    pub required: bool,
    pub kind: ParameterKind,
    /// For step lists, the type of each element
    pub expected_type: TypeReference,
    pub summary: String,
}

impl ParameterDescriptor {
    pub fn new(name: impl Into<String>, kind: ParameterKind, expected_type: TypeReference) -> Self {
        Self {
            name: name.into(),
            aliases: Vec::new(),
            order: None,
            required: false,
            kind,
            expected_type,
            summary: String::new(),
        }
    }

    pub fn step(name: impl Into<String>, expected_type: TypeReference) -> Self {
        Self::new(name, ParameterKind::Step, expected_type)
    }

    pub fn step_list(name: impl Into<String>, element_type: TypeReference) -> Self {
        Self::new(name, ParameterKind::StepList, element_type)
    }

    pub fn lambda(name: impl Into<String>) -> Self {
        Self::new(name, ParameterKind::Lambda, TypeReference::Any)
    }

    pub fn variable(name: impl Into<String>) -> Self {
        Self::new(name, ParameterKind::Variable, TypeReference::Any)
    }

    pub fn ordered(mut self, order: usize) -> Self {
        self.order = Some(order);
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = summary.into();
        self
    }

    /// Case-insensitive match on the name or any alias
    pub fn matches_name(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name) || self.aliases.iter().any(|a| a.eq_ignore_ascii_case(name))
    }

    /// Type shown to users: step lists read as arrays of their element type
    pub fn display_type(&self) -> String {
        match self.kind {
            ParameterKind::StepList => TypeReference::array_of(self.expected_type.clone()).to_string(),
            ParameterKind::Lambda => "Lambda".to_string(),
            ParameterKind::Variable => "VariableName".to_string(),
            ParameterKind::Step => self.expected_type.to_string(),
        }
    }
}

// ============================================================================
// Factories
// ============================================================================

/// How the formatter writes a step back as text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SerializationForm {
    /// `Name Arg: value`
    Function,
    /// `a + b + c` over the `Terms` argument
    Infix(&'static str),
    Sequence,
    SetVariable,
    GetVariable,
    Array,
    Entity,
    ElementAtIndex,
    EntityGetValue,
    Interpolation,
}

pub trait StepFactory: Send + Sync + fmt::Debug {
    /// Canonical name
    fn type_name(&self) -> &str;

    /// Every name the step answers to, canonical name first
    fn names(&self) -> Vec<&str> {
        vec![self.type_name()]
    }

    fn parameters(&self) -> &[ParameterDescriptor];

    fn summary(&self) -> &str;

    /// Output type before looking at any argument
    fn declared_output_type(&self) -> TypeReference;

    fn infer_output_type(
        &self,
        _arguments: &BoundArguments,
        _resolver: &TypeResolver,
    ) -> Result<TypeReference, ErrorList> {
        Ok(self.declared_output_type())
    }

    /// Type of the variable a lambda parameter binds, given the arguments
    /// bound so far
    fn lambda_variable_type(
        &self,
        _parameter: &ParameterDescriptor,
        _arguments: &BoundArguments,
    ) -> TypeReference {
        TypeReference::Any
    }

    /// Variables this step defines once bound
    fn bound_variables(&self, _arguments: &BoundArguments) -> Vec<(VariableName, TypeReference)> {
        Vec::new()
    }

    /// Whether named arguments outside `parameters()` are allowed
    fn accepts_extra_named_arguments(&self) -> bool {
        false
    }

    fn serialization_form(&self) -> SerializationForm {
        SerializationForm::Function
    }

    fn find_parameter(&self, reference: &ParameterRef) -> Option<&ParameterDescriptor> {
        match reference {
            ParameterRef::Index(n) => self.parameters().iter().find(|p| p.order == Some(*n)),
            ParameterRef::Named(name) => self.parameters().iter().find(|p| p.matches_name(name)),
        }
    }
}

// ============================================================================
// Enums
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumDescriptor {
    pub name: String,
    pub members: Vec<String>,
    pub summary: String,
}

impl EnumDescriptor {
    pub fn new(name: impl Into<String>, members: &[&str], summary: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            members: members.iter().map(|m| m.to_string()).collect(),
            summary: summary.into(),
        }
    }

    pub fn member(&self, name: &str) -> Option<&str> {
        self.members
            .iter()
            .find(|m| m.eq_ignore_ascii_case(name))
            .map(|m| m.as_str())
    }
}

// ============================================================================
// Store
// ============================================================================

/// Step factories by every name they answer to (case-insensitive)
#[derive(Debug, Default)]
pub struct StepFactoryStore {
    factories: Vec<Arc<dyn StepFactory>>,
    by_name: HashMap<String, Arc<dyn StepFactory>>,
    enums: HashMap<String, EnumDescriptor>,
}

impl StepFactoryStore {
    pub fn builder() -> StepFactoryStoreBuilder {
        StepFactoryStoreBuilder::default()
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn StepFactory>> {
        self.by_name.get(&name.to_lowercase())
    }

    pub fn get_enum(&self, name: &str) -> Option<&EnumDescriptor> {
        self.enums.get(&name.to_lowercase())
    }

    /// Factories in registration order
    pub fn factories(&self) -> impl Iterator<Item = &Arc<dyn StepFactory>> {
        self.factories.iter()
    }

    pub fn enums(&self) -> impl Iterator<Item = &EnumDescriptor> {
        self.enums.values()
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

#[derive(Default)]
pub struct StepFactoryStoreBuilder {
    factories: Vec<Arc<dyn StepFactory>>,
    enums: Vec<EnumDescriptor>,
}

impl StepFactoryStoreBuilder {
    pub fn register(self, factory: impl StepFactory + 'static) -> Self {
        self.register_arc(Arc::new(factory))
    }

    pub fn register_arc(mut self, factory: Arc<dyn StepFactory>) -> Self {
        self.factories.push(factory);
        self
    }

    pub fn register_enum(mut self, descriptor: EnumDescriptor) -> Self {
        self.enums.push(descriptor);
        self
    }

    pub fn build(self) -> StepFactoryStore {
        let mut by_name: HashMap<String, Arc<dyn StepFactory>> = HashMap::new();
        for factory in &self.factories {
            for name in factory.names() {
                let key = name.to_lowercase();
                if by_name.contains_key(&key) {
                    warn!(name, "step name registered twice, keeping the later factory");
                }
                by_name.insert(key, Arc::clone(factory));
            }
        }

        let enums = self
            .enums
            .into_iter()
            .map(|e| (e.name.to_lowercase(), e))
            .collect();

        StepFactoryStore {
            factories: self.factories,
            by_name,
            enums,
        }
    }
}
